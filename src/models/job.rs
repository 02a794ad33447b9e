use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{ExecutorClass, JobStatus};
use super::upload::{OutputUpload, OutputVolume};
use super::volume::{InputVolume, Volume};
use crate::error::Result;

/// A job as returned by the facilitator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorJob {
    pub uuid: Uuid,
    pub executor_class: ExecutorClass,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    #[serde(default)]
    pub docker_image: String,
    /// Container arguments, space separated.
    #[serde(default)]
    pub args: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub use_gpu: bool,
    /// Output captured so far. Empty until the job prints something.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stdout: String,
    /// Input volumes in wire form. A `null` from the API reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub volumes: Vec<Volume>,
    /// Output uploads in wire form. A `null` from the API reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub uploads: Vec<OutputUpload>,
    /// Validator the job was routed to, when one was requested.
    #[serde(default)]
    pub target_validator_hotkey: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FacilitatorJob {
    /// Captured output, present only when the job printed something.
    pub fn result(&self) -> Option<JobResult> {
        (!self.stdout.is_empty()).then(|| JobResult {
            stdout: self.stdout.clone(),
        })
    }
}

/// One page of the paginated `jobs/` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsPage<T = FacilitatorJob> {
    /// Total number of jobs across all pages.
    pub count: u64,
    /// URL of the following page, `None` on the last one.
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> JobsPage<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> JobsPage<U> {
        JobsPage {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Result of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub stdout: String,
}

/// Description of a job to create.
///
/// Loadable from TOML or JSON so job definitions can live in files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub executor_class: ExecutorClass,
    pub docker_image: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Keyed by absolute mount path under `/volume/`.
    #[serde(default)]
    pub input_volumes: BTreeMap<String, InputVolume>,
    /// Keyed by absolute mount path under `/output/`.
    #[serde(default)]
    pub output_volumes: BTreeMap<String, OutputVolume>,
}

impl JobSpec {
    pub fn new(executor_class: ExecutorClass, docker_image: impl Into<String>) -> Self {
        Self {
            executor_class,
            docker_image: docker_image.into(),
            ..Default::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn input_volume(mut self, mount_path: impl Into<String>, volume: impl Into<InputVolume>) -> Self {
        self.input_volumes.insert(mount_path.into(), volume.into());
        self
    }

    pub fn output_volume(mut self, mount_path: impl Into<String>, volume: OutputVolume) -> Self {
        self.output_volumes.insert(mount_path.into(), volume);
        self
    }

    /// Build the `job-docker/` payload.
    pub fn to_request(&self, target_validator_hotkey: Option<String>) -> Result<CreateJobRequest> {
        let volumes = if self.input_volumes.is_empty() {
            None
        } else {
            Some(
                self.input_volumes
                    .iter()
                    .map(|(mount_path, volume)| volume.to_volume(mount_path))
                    .collect::<Result<Vec<_>>>()?,
            )
        };
        let uploads = if self.output_volumes.is_empty() {
            None
        } else {
            Some(
                self.output_volumes
                    .iter()
                    .map(|(mount_path, volume)| volume.to_output_upload(mount_path))
                    .collect::<Result<Vec<_>>>()?,
            )
        };

        Ok(CreateJobRequest {
            target_validator_hotkey,
            executor_class: self.executor_class.clone(),
            docker_image: self.docker_image.clone(),
            args: self.args.join(" "),
            env: self.env.clone(),
            use_gpu: true,
            volumes,
            uploads,
        })
    }
}

/// Wire payload for `POST job-docker/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub target_validator_hotkey: Option<String>,
    pub executor_class: ExecutorClass,
    pub docker_image: String,
    pub args: String,
    pub env: BTreeMap<String, String>,
    pub use_gpu: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<Volume>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads: Option<Vec<OutputUpload>>,
}

/// Feedback on the correctness of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobFeedback {
    /// 0.0 is completely incorrect, 1.0 completely correct.
    pub result_correctness: f64,
    /// Seconds the job was expected to take.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_duration: Option<f64>,
}
