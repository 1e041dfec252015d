use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

use crate::error::Error;

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";

/// Image received as a `data:image/<kind>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn from_data_uri(value: &str) -> Result<Self, Error> {
        let invalid = || Error::validation("Image must be a base64 encoded data URI");

        let rest = value.trim().strip_prefix("data:").ok_or_else(invalid)?;
        let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;

        let extension = match mime.to_ascii_lowercase().as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            other => {
                return Err(Error::validation(format!(
                    "Unsupported image type '{other}'"
                )))
            }
        };

        let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
        if bytes.is_empty() {
            return Err(Error::validation("Image may not be empty"));
        }

        Ok(Self { extension, bytes })
    }

    /// Writes the blob under `media_root` and returns its path relative to it.
    pub async fn save(&self, media_root: &Path) -> Result<String, Error> {
        let dir = media_root.join(RECIPE_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            log::error!("Could not create media directory {}: {e}", dir.display());
            Error::Internal(format!("{e}"))
        })?;

        let file_name = format!("{}.{}", Uuid::new_v4(), self.extension);
        tokio::fs::write(dir.join(&file_name), &self.bytes)
            .await
            .map_err(|e| {
                log::error!("Could not store image {file_name}: {e}");
                Error::Internal(format!("{e}"))
            })?;

        Ok(format!("{RECIPE_IMAGE_DIR}/{file_name}"))
    }
}

/// Removes a stored media file. Failures are only logged.
pub async fn discard(media_root: &Path, path: &str) {
    if let Err(e) = tokio::fs::remove_file(media_root.join(path)).await {
        log::warn!("Could not remove media file {path}: {e}");
    }
}
