use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use image::GenericImageView;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::infra::storage::ObjectStorage;

#[derive(Clone)]
pub struct MediaService {
    storage: ObjectStorage,
    folder: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub file_id: Uuid,
    pub width: u32,
    pub height: u32,
    pub size: i64,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file is not a supported image")]
    InvalidImage,
    #[error("{0}")]
    Provider(String),
}

impl MediaService {
    pub fn new(storage: ObjectStorage, folder: String) -> Self {
        Self { storage, folder }
    }

    /// Relay one image to object storage under a collision-resistant key and
    /// return the stored object's public coordinates.
    pub async fn upload_image(
        &self,
        owner_id: Uuid,
        data: Bytes,
        file_name: Option<String>,
        content_type: Option<String>,
    ) -> Result<UploadedImage, UploadError> {
        let decoded = image::load_from_memory(&data).map_err(|_| UploadError::InvalidImage)?;
        let (width, height) = decoded.dimensions();

        let size = data.len() as i64;
        let stored_name = stored_file_name(file_name.as_deref());
        let key = format!("{}/{}/{}", self.folder, owner_id, stored_name);

        let mut request = self
            .storage
            .client()
            .put_object()
            .bucket(self.storage.bucket())
            .key(&key)
            .body(ByteStream::from(data));
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }
        request
            .send()
            .await
            .map_err(|err| UploadError::Provider(err.to_string()))?;

        let url = self
            .storage
            .public_url(&key)
            .map_err(|err| UploadError::Provider(err.to_string()))?;

        Ok(UploadedImage {
            url,
            file_id: Uuid::new_v4(),
            width,
            height,
            size,
            name: stored_name,
        })
    }
}

/// `<unix_millis>_<random infix>_<sanitized original name>`. The random infix
/// keeps two same-millisecond uploads of the same file name distinct.
fn stored_file_name(original: Option<&str>) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let infix: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}_{}_{}", millis, infix, sanitize_file_name(original))
}

/// Everything outside `[A-Za-z0-9.-]` becomes `_`; a missing or empty name
/// falls back to "upload".
fn sanitize_file_name(original: Option<&str>) -> String {
    let name = original.unwrap_or("").trim();
    if name.is_empty() {
        return "upload".to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizer_keeps_dots_and_dashes() {
        assert_eq!(
            sanitize_file_name(Some("my-photo.final.jpg")),
            "my-photo.final.jpg"
        );
    }

    #[test]
    fn sanitizer_replaces_everything_else() {
        assert_eq!(
            sanitize_file_name(Some("summer vacation (1)/copy.png")),
            "summer_vacation__1__copy.png"
        );
        assert_eq!(sanitize_file_name(Some("héllo wörld.webp")), "h_llo_w_rld.webp");
    }

    #[test]
    fn sanitizer_defaults_missing_names() {
        assert_eq!(sanitize_file_name(None), "upload");
        assert_eq!(sanitize_file_name(Some("   ")), "upload");
    }

    #[test]
    fn stored_names_never_collide_for_identical_input() {
        let first = stored_file_name(Some("photo.jpg"));
        let second = stored_file_name(Some("photo.jpg"));

        assert_ne!(first, second);
        assert!(first.ends_with("_photo.jpg"));
        assert!(second.ends_with("_photo.jpg"));
    }
}
