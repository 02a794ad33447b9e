use std::fmt;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;
use uuid::Uuid;

use crate::client::ComputeHordeClient;
use crate::error::{ComputeHordeError, Result};
use crate::models::{FacilitatorJob, JobFeedback, JobResult, JobStatus};

/// A job running on the Compute Horde.
///
/// The handle is a snapshot: `status` and `result` only change on
/// [`refresh`](Self::refresh) or [`wait`](Self::wait).
#[derive(Clone)]
pub struct ComputeHordeJob {
    client: ComputeHordeClient,
    pub uuid: Uuid,
    pub status: JobStatus,
    pub result: Option<JobResult>,
    details: FacilitatorJob,
}

impl fmt::Debug for ComputeHordeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeHordeJob")
            .field("uuid", &self.uuid)
            .field("status", &self.status)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl ComputeHordeJob {
    pub(crate) fn from_response(client: ComputeHordeClient, response: FacilitatorJob) -> Self {
        Self {
            client,
            uuid: response.uuid,
            status: response.status,
            result: response.result(),
            details: response,
        }
    }

    /// Everything the facilitator reported on the last fetch.
    pub fn details(&self) -> &FacilitatorJob {
        &self.details
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let latest = self.client.get_job(self.uuid).await?;
        self.status = latest.status;
        self.result = latest.result;
        self.details = latest.details;
        Ok(())
    }

    /// Poll until the job completes, fails or is rejected.
    ///
    /// With a `timeout`, gives up with [`ComputeHordeError::Timeout`] once it
    /// has elapsed. Refreshes are spaced by the client's poll interval.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> Result<()> {
        let started = Instant::now();

        while self.status.is_in_progress() {
            if let Some(timeout) = timeout
                && started.elapsed() >= timeout
            {
                return Err(ComputeHordeError::Timeout {
                    uuid: self.uuid,
                    timeout,
                    last_status: self.status,
                });
            }

            self.refresh().await?;
            debug!(uuid = %self.uuid, status = %self.status, "polled job");

            if self.status.is_in_progress() {
                sleep(self.next_delay(timeout, started.elapsed())).await;
            }
        }

        Ok(())
    }

    // Poll interval, cut short so the timeout check runs on time.
    fn next_delay(&self, timeout: Option<Duration>, elapsed: Duration) -> Duration {
        let interval = self.client.poll_interval();
        match timeout {
            Some(timeout) => interval.min(timeout.saturating_sub(elapsed)),
            None => interval,
        }
    }

    pub async fn submit_feedback(
        &self,
        result_correctness: f64,
        expected_duration: Option<f64>,
    ) -> Result<()> {
        let feedback = JobFeedback {
            result_correctness,
            expected_duration,
        };
        self.client.submit_feedback(self.uuid, &feedback).await
    }
}
