//! Input resolution: turn a user-supplied path or URL into image bytes.
//!
//! The whole photo is held in memory: OCR collaborators take bytes, and a
//! phone photo is a few megabytes at most. Format is checked by magic bytes
//! before anything is sent over the network, so a stray PDF or HEIC gets a
//! clear error instead of a confusing OCR rejection.

use crate::error::MathSnapError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the image came from. Decides where the report is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOrigin {
    /// A file on disk.
    Local(PathBuf),
    /// Downloaded from `url`; `file_name` is the last path segment.
    Remote { url: String, file_name: String },
    /// Bytes handed over directly by a library caller.
    Memory { name: String },
}

/// Validated image bytes plus their origin.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub origin: InputOrigin,
}

impl ImageInput {
    /// Wrap in-memory bytes, validating the format.
    pub fn from_bytes(bytes: Vec<u8>, name: impl Into<String>) -> Result<Self, MathSnapError> {
        let name = name.into();
        check_image_magic(&bytes, &name)?;
        Ok(Self {
            bytes,
            origin: InputOrigin::Memory { name },
        })
    }

    /// Short label for logs and progress output.
    pub fn display_name(&self) -> String {
        match &self.origin {
            InputOrigin::Local(p) => p.display().to_string(),
            InputOrigin::Remote { url, .. } => url.clone(),
            InputOrigin::Memory { name } => name.clone(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to validated image bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ImageInput, MathSnapError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input)).await
    }
}

async fn resolve_local(path: &Path) -> Result<ImageInput, MathSnapError> {
    let path = path.to_path_buf();

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(MathSnapError::PermissionDenied { path });
        }
        Err(_) => return Err(MathSnapError::FileNotFound { path }),
    };

    check_image_magic(&bytes, &path.display().to_string())?;
    debug!("Resolved local image: {} ({} bytes)", path.display(), bytes.len());

    Ok(ImageInput {
        bytes,
        origin: InputOrigin::Local(path),
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageInput, MathSnapError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MathSnapError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        let reason = if e.is_timeout() {
            format!("timed out after {timeout_secs}s")
        } else {
            e.to_string()
        };
        MathSnapError::DownloadFailed {
            url: url.to_string(),
            reason,
        }
    })?;

    if !response.status().is_success() {
        return Err(MathSnapError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MathSnapError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    check_image_magic(&bytes, url)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(ImageInput {
        bytes,
        origin: InputOrigin::Remote {
            url: url.to_string(),
            file_name: extract_filename(url),
        },
    })
}

/// Accept PNG and JPEG only; these are the formats the decoder is built with.
fn check_image_magic(bytes: &[u8], source_name: &str) -> Result<(), MathSnapError> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) | Ok(image::ImageFormat::Jpeg) => Ok(()),
        Ok(other) => Err(MathSnapError::InvalidImage {
            source_name: source_name.to_string(),
            detail: format!("unsupported format {other:?} (expected PNG or JPEG)"),
        }),
        Err(_) => {
            let head: Vec<u8> = bytes.iter().take(4).copied().collect();
            Err(MathSnapError::InvalidImage {
                source_name: source_name.to_string(),
                detail: format!("unrecognised header {head:?}"),
            })
        }
    }
}

/// Last non-empty URL path segment with an extension, else `download.png`.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "download.png".to_string()
}
