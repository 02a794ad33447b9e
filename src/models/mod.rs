mod job;
mod status;
mod upload;
mod volume;

pub use job::{CreateJobRequest, FacilitatorJob, JobFeedback, JobResult, JobSpec, JobsPage};
pub use status::{ExecutorClass, JobStatus};
pub use upload::{HttpMethod, HttpOutputVolume, OUTPUT_MOUNT_PREFIX, OutputUpload, OutputVolume};
pub use volume::{HuggingfaceInputVolume, InputVolume, VOLUME_MOUNT_PREFIX, Volume};

use crate::error::{ComputeHordeError, Result};

/// Strip `prefix` from an absolute mount path. An empty remainder means the
/// volume sits at the root of the mount.
fn relative_path(mount_path: &str, prefix: &'static str) -> Result<Option<String>> {
    let rest = mount_path
        .strip_prefix(prefix)
        .ok_or_else(|| ComputeHordeError::InvalidMountPath {
            path: mount_path.to_string(),
            expected_prefix: prefix,
        })?;
    let rest = rest.trim_matches('/');
    Ok((!rest.is_empty()).then(|| rest.to_string()))
}

fn join_relative(parent: Option<&str>, child: &str) -> Option<String> {
    let child = child.trim_matches('/');
    match (parent, child.is_empty()) {
        (Some(parent), true) => Some(parent.to_string()),
        (Some(parent), false) => Some(format!("{parent}/{child}")),
        (None, true) => None,
        (None, false) => Some(child.to_string()),
    }
}
