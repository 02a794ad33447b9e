//! Error type returned by every fallible SDK operation.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::models::JobStatus;

#[derive(Debug, Error)]
pub enum ComputeHordeError {
    /// The facilitator answered 404 for the requested resource.
    #[error("Not found: {0}")]
    NotFound(String),

    /// `wait` gave up before the job reached a terminal status.
    #[error("Job {uuid} did not complete within {secs}s, last status: {last_status}", secs = .timeout.as_secs_f64())]
    Timeout {
        uuid: Uuid,
        timeout: Duration,
        last_status: JobStatus,
    },

    #[error("Compute Horde responded with status code {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Compute Horde returned malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Invalid mount path {path:?}: must start with {expected_prefix:?}")]
    InvalidMountPath {
        path: String,
        expected_prefix: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ComputeHordeError>;
