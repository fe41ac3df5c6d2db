//! Selected food photo
//!
//! An `ImageAsset` is validated once on construction and never mutated; a new
//! upload replaces it wholesale.

use crate::error::ValidationError;
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use tracing::debug;

/// Validated image bytes plus the MIME type they were detected as
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    bytes: Vec<u8>,
    mime_type: String,
    file_name: String,
}

impl std::fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAsset")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageAsset {
    /// Validate raw bytes as an image no larger than `max_bytes`
    ///
    /// The type is sniffed from magic bytes. `declared_mime` is only consulted
    /// when sniffing is inconclusive, and must itself be an `image/*` type.
    pub fn from_bytes(
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        declared_mime: Option<&str>,
        max_bytes: u64,
    ) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::EmptyImage);
        }

        let mime_type = match infer::get(&bytes) {
            Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
                kind.mime_type().to_string()
            }
            Some(kind) => {
                return Err(ValidationError::NotAnImage {
                    detected: kind.mime_type().to_string(),
                })
            }
            None => match declared_mime {
                Some(mime) if mime.starts_with("image/") => mime.to_string(),
                other => {
                    return Err(ValidationError::NotAnImage {
                        detected: other.unwrap_or("unknown").to_string(),
                    })
                }
            },
        };

        let size = bytes.len() as u64;
        if size > max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit: max_bytes,
            });
        }

        Ok(Self {
            bytes,
            mime_type,
            file_name: file_name.into(),
        })
    }

    /// Read and validate an image file
    ///
    /// The size ceiling is checked against file metadata before reading.
    pub async fn from_path(path: &Path, max_bytes: u64) -> Result<Self, ValidationError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ValidationError::Unreadable(format!("{}: {}", path.display(), e)))?;

        if metadata.len() > max_bytes {
            return Err(ValidationError::TooLarge {
                size: metadata.len(),
                limit: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ValidationError::Unreadable(format!("{}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        debug!(file = %path.display(), bytes = bytes.len(), "Read image file");
        Self::from_bytes(bytes, file_name, None, max_bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Displayable `data:` URI form
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}
