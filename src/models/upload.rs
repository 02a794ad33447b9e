//! Output volumes: where job output is uploaded once the job finishes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{join_relative, relative_path};
use crate::error::Result;

/// Root every output volume mount path must live under.
pub const OUTPUT_MOUNT_PREFIX: &str = "/output/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Multipart form upload; `form_fields` travel with the file.
    #[default]
    Post,
    /// Raw body upload, usually to a presigned URL.
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
        }
    }
}

/// An HTTP destination for job output.
///
/// `form_fields` are only sent with `POST` uploads, the facilitator has no
/// place for them on `PUT`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HttpOutputVolume {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub form_fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signed_headers: BTreeMap<String, String>,
}

impl HttpOutputVolume {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Put,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields.insert(name.into(), value.into());
        self
    }

    fn single_file_upload(&self, relative_path: Option<String>) -> OutputUpload {
        match self.method {
            HttpMethod::Post => OutputUpload::SingleFilePost {
                url: self.url.clone(),
                relative_path,
                form_fields: non_empty(&self.form_fields),
                signed_headers: non_empty(&self.signed_headers),
            },
            HttpMethod::Put => OutputUpload::SingleFilePut {
                url: self.url.clone(),
                relative_path,
                signed_headers: non_empty(&self.signed_headers),
            },
        }
    }

    fn zip_upload(&self) -> OutputUpload {
        match self.method {
            HttpMethod::Post => OutputUpload::ZipAndHttpPost {
                url: self.url.clone(),
                form_fields: non_empty(&self.form_fields),
            },
            HttpMethod::Put => OutputUpload::ZipAndHttpPut {
                url: self.url.clone(),
            },
        }
    }
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then(|| map.clone())
}

/// How job output found under a mount path should be uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputVolume {
    /// Upload the single file at the mount path.
    Http(HttpOutputVolume),
    /// Zip everything under the mount path and upload the archive.
    Zip(HttpOutputVolume),
    /// Upload several files, each relative to the mount path, plus an
    /// optional zip of the remaining system output.
    Multi {
        uploads: BTreeMap<String, HttpOutputVolume>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system_output: Option<HttpOutputVolume>,
    },
}

/// Upload descriptor as understood by the facilitator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_upload_type", rename_all = "snake_case")]
pub enum OutputUpload {
    SingleFilePost {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        form_fields: Option<BTreeMap<String, String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signed_headers: Option<BTreeMap<String, String>>,
    },
    SingleFilePut {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relative_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signed_headers: Option<BTreeMap<String, String>>,
    },
    ZipAndHttpPost {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        form_fields: Option<BTreeMap<String, String>>,
    },
    ZipAndHttpPut {
        url: String,
    },
    MultiUpload {
        uploads: Vec<OutputUpload>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system_output: Option<Box<OutputUpload>>,
    },
}

impl OutputVolume {
    /// Build the facilitator upload descriptor for output found at `mount_path`.
    ///
    /// `mount_path` must start with [`OUTPUT_MOUNT_PREFIX`].
    pub fn to_output_upload(&self, mount_path: &str) -> Result<OutputUpload> {
        let relative = relative_path(mount_path, OUTPUT_MOUNT_PREFIX)?;
        Ok(match self {
            OutputVolume::Http(destination) => destination.single_file_upload(relative),
            OutputVolume::Zip(destination) => destination.zip_upload(),
            OutputVolume::Multi {
                uploads,
                system_output,
            } => OutputUpload::MultiUpload {
                uploads: uploads
                    .iter()
                    .map(|(path, destination)| {
                        destination.single_file_upload(join_relative(relative.as_deref(), path))
                    })
                    .collect(),
                system_output: system_output
                    .as_ref()
                    .map(|destination| Box::new(destination.zip_upload())),
            },
        })
    }
}
