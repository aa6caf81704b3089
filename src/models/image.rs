use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_FILE_NAME: &str = "uploaded-image";

/// Encoded image payload carried by a request and kept on its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceImage {
    pub data_url: String, // data:image/jpeg;base64,...
    pub file_name: String,
}

impl SourceImage {
    pub fn new(data_url: impl Into<String>, file_name: Option<&str>) -> Self {
        Self {
            data_url: data_url.into(),
            file_name: file_name
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_FILE_NAME)
                .to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data_url.trim().is_empty()
    }
}

/// An upload as it arrives, before validation.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl RawImage {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        let media_type = media_type_for(path);
        Ok(Self::new(file_name, media_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Output of the preparation step: bounded, JPEG re-encoded, base64 wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub data_url: String,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub original_size: u64,
}

impl From<PreparedImage> for SourceImage {
    fn from(image: PreparedImage) -> Self {
        SourceImage::new(image.data_url, Some(&image.file_name))
    }
}
