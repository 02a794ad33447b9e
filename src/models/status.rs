use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job as reported by the facilitator.
///
/// Transitions are owned by the remote service; the SDK only observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Sent,
    Accepted,
    Rejected,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Sent,
        JobStatus::Accepted,
        JobStatus::Rejected,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    /// The remote side may still move the job to another status.
    pub fn is_in_progress(self) -> bool {
        matches!(self, JobStatus::Sent | JobStatus::Accepted)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_in_progress()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Sent => "Sent",
            JobStatus::Accepted => "Accepted",
            JobStatus::Rejected => "Rejected",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown job status: {s}"))
    }
}

/// Category of executor machine a job is scheduled on.
///
/// The facilitator owns the set of classes, so values this crate does not
/// know about are kept verbatim in [`ExecutorClass::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecutorClass {
    /// `spin_up-4min.gpu-24gb`: started on demand, 24 GB GPU.
    #[default]
    SpinUp4MinGpu24Gb,
    /// `always_on.gpu-24gb`: kept warm, 24 GB GPU.
    AlwaysOnGpu24Gb,
    /// `always_on.llm.a6000`: kept warm, A6000 for LLM workloads.
    AlwaysOnLlmA6000,
    /// Any class reported by the facilitator that is not listed above.
    Other(String),
}

impl ExecutorClass {
    /// The classes known to this crate.
    pub const KNOWN: [ExecutorClass; 3] = [
        ExecutorClass::SpinUp4MinGpu24Gb,
        ExecutorClass::AlwaysOnGpu24Gb,
        ExecutorClass::AlwaysOnLlmA6000,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ExecutorClass::SpinUp4MinGpu24Gb => "spin_up-4min.gpu-24gb",
            ExecutorClass::AlwaysOnGpu24Gb => "always_on.gpu-24gb",
            ExecutorClass::AlwaysOnLlmA6000 => "always_on.llm.a6000",
            ExecutorClass::Other(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ExecutorClass::Other(_))
    }
}

impl From<String> for ExecutorClass {
    fn from(label: String) -> Self {
        ExecutorClass::KNOWN
            .into_iter()
            .find(|class| class.as_str() == label)
            .unwrap_or(ExecutorClass::Other(label))
    }
}

impl From<ExecutorClass> for String {
    fn from(class: ExecutorClass) -> Self {
        match class {
            ExecutorClass::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ExecutorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutorClass {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ExecutorClass::from(s.to_string()))
    }
}
