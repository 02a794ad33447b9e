//! Input volumes: data made available to a job before it starts.
//!
//! [`InputVolume`] is what callers describe; [`Volume`] is the descriptor the
//! facilitator expects in the `volumes` list of a job request. Conversion
//! happens per mount path, see [`InputVolume::to_volume`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{join_relative, relative_path};
use crate::error::Result;

/// Root every input volume mount path must live under.
pub const VOLUME_MOUNT_PREFIX: &str = "/volume/";

/// How to obtain the data for one input volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputVolume {
    /// Base64-encoded zip archive shipped inside the request.
    Inline { contents: String },
    /// Zip archive downloaded from a URL and unpacked at the mount path.
    ZipUrl { url: String },
    /// Single file downloaded over HTTP to the mount path.
    Http { url: String },
    Huggingface(HuggingfaceInputVolume),
    /// Several volumes mounted relative to the parent mount path.
    Multi { volumes: BTreeMap<String, InputVolume> },
}

/// A Huggingface Hub repository snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HuggingfaceInputVolume {
    pub repo_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl HuggingfaceInputVolume {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            ..Default::default()
        }
    }

    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn repo_type(mut self, repo_type: impl Into<String>) -> Self {
        self.repo_type = Some(repo_type.into());
        self
    }

    pub fn allow_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }
}

impl From<HuggingfaceInputVolume> for InputVolume {
    fn from(volume: HuggingfaceInputVolume) -> Self {
        InputVolume::Huggingface(volume)
    }
}

/// Volume descriptor as understood by the facilitator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "volume_type", rename_all = "snake_case")]
pub enum Volume {
    Inline {
        contents: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_path: Option<String>,
    },
    ZipUrl {
        contents: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_path: Option<String>,
    },
    SingleFile {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_path: Option<String>,
    },
    #[serde(rename = "huggingface_volume")]
    Huggingface {
        repo_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repo_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revision: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allow_patterns: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    #[serde(rename = "multi_volume")]
    Multi { volumes: Vec<Volume> },
}

impl InputVolume {
    pub fn inline(contents: impl Into<String>) -> Self {
        InputVolume::Inline {
            contents: contents.into(),
        }
    }

    pub fn zip_url(url: impl Into<String>) -> Self {
        InputVolume::ZipUrl { url: url.into() }
    }

    pub fn http(url: impl Into<String>) -> Self {
        InputVolume::Http { url: url.into() }
    }

    /// Build the facilitator descriptor for this volume mounted at `mount_path`.
    ///
    /// `mount_path` must start with [`VOLUME_MOUNT_PREFIX`]. Nested
    /// [`InputVolume::Multi`] volumes are flattened into a single
    /// `multi_volume` descriptor.
    pub fn to_volume(&self, mount_path: &str) -> Result<Volume> {
        let relative = relative_path(mount_path, VOLUME_MOUNT_PREFIX)?;
        Ok(self.volume_at(relative))
    }

    fn volume_at(&self, relative_path: Option<String>) -> Volume {
        match self {
            InputVolume::Inline { contents } => Volume::Inline {
                contents: contents.clone(),
                relative_path,
            },
            InputVolume::ZipUrl { url } => Volume::ZipUrl {
                contents: url.clone(),
                relative_path,
            },
            InputVolume::Http { url } => Volume::SingleFile {
                url: url.clone(),
                relative_path,
            },
            InputVolume::Huggingface(hf) => Volume::Huggingface {
                repo_id: hf.repo_id.clone(),
                repo_type: hf.repo_type.clone(),
                revision: hf.revision.clone(),
                relative_path,
                allow_patterns: hf.allow_patterns.clone(),
                token: hf.token.clone(),
            },
            InputVolume::Multi { .. } => {
                let mut volumes = Vec::new();
                self.flatten_into(relative_path, &mut volumes);
                Volume::Multi { volumes }
            }
        }
    }

    fn flatten_into(&self, relative: Option<String>, out: &mut Vec<Volume>) {
        match self {
            InputVolume::Multi { volumes } => {
                for (child_path, child) in volumes {
                    child.flatten_into(join_relative(relative.as_deref(), child_path), out);
                }
            }
            single => out.push(single.volume_at(relative)),
        }
    }
}
