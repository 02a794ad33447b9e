//! Client SDK for the Compute Horde.
//!
//! Jobs are submitted and monitored through the Facilitator HTTP API:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use compute_horde_sdk::{ClientConfig, ComputeHordeClient, ExecutorClass, InputVolume, JobSpec};
//!
//! async fn run() -> compute_horde_sdk::Result<()> {
//!     let client = ComputeHordeClient::new(&ClientConfig::new("my-facilitator-token"))?;
//!
//!     let spec = JobSpec::new(ExecutorClass::SpinUp4MinGpu24Gb, "backenddevelopersltd/compute-horde-job-echo:v0-latest")
//!         .args(["--block", "10"])
//!         .input_volume("/volume/payload.txt", InputVolume::http("https://example.com/payload.txt"));
//!
//!     let mut job = client.create_job(&spec).await?;
//!     job.wait(Some(Duration::from_secs(300))).await?;
//!
//!     if let Some(result) = &job.result {
//!         println!("{}", result.stdout);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod models;

pub use client::ComputeHordeClient;
pub use config::ClientConfig;
pub use error::{ComputeHordeError, Result};
pub use job::ComputeHordeJob;
pub use models::{
    ExecutorClass, HttpMethod, HttpOutputVolume, HuggingfaceInputVolume, InputVolume, JobFeedback,
    JobResult, JobSpec, JobStatus, JobsPage, OutputVolume,
};
