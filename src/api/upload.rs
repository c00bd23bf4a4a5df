//! Post image uploads
//!
//! The post form is `multipart/form-data`. Text fields are collected as-is;
//! the optional `image` file is checked against the upload configuration and
//! written to `<upload.path>/posts_images/<uuid>.<ext>`.

use axum::{body::Bytes, extract::Multipart};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::error::AppError;
use crate::config::UploadConfig;

/// Directory under the upload root that holds post images
pub const POST_IMAGES_DIR: &str = "posts_images";

/// A file received in the `image` field
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Raw multipart form: text fields plus the optional image
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub image: Option<UploadedImage>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// Checkbox semantics: present and not "off"/"false"
    pub fn checked(&self, name: &str) -> bool {
        matches!(self.fields.get(name).map(|v| v.as_str()), Some(v) if v != "off" && v != "false")
    }
}

/// Read every field of a multipart body
pub async fn read_form(mut multipart: Multipart) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "image" {
            let filename = field.file_name().unwrap_or("").to_string();
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;

            // browsers send an empty part when no file was chosen
            if !data.is_empty() {
                form.image = Some(UploadedImage {
                    filename,
                    content_type,
                    data,
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;
        form.fields.insert(name, value);
    }

    Ok(form)
}

/// Why an image cannot be accepted, if it cannot
pub fn check_image(config: &UploadConfig, image: &UploadedImage) -> Option<String> {
    if !config.is_type_allowed(&image.content_type) {
        return Some(format!(
            "Invalid file type: {}. Allowed types: {}",
            image.content_type,
            config.allowed_types.join(", ")
        ));
    }
    if image.data.len() as u64 > config.max_file_size {
        return Some(format!(
            "File too large. Maximum size: {} MB",
            config.max_file_size / 1024 / 1024
        ));
    }
    None
}

/// Write an accepted image; returns its path relative to the upload root
pub async fn store_image(config: &UploadConfig, image: &UploadedImage) -> Result<String, AppError> {
    let dir = config.path.join(POST_IMAGES_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create upload dir {:?}: {}", dir, e))?;
    }

    let relative = format!(
        "{}/{}.{}",
        POST_IMAGES_DIR,
        Uuid::new_v4(),
        config.get_extension(&image.content_type)
    );
    fs::write(config.path.join(&relative), &image.data)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save image {}: {}", relative, e))?;

    tracing::debug!(file = %relative, original = %image.filename, size = image.data.len(), "Image stored");
    Ok(relative)
}

/// Delete a stored image; a file that is already gone is fine
pub async fn remove_image(config: &UploadConfig, relative: &str) {
    // stored paths never leave the upload root
    if relative.contains("..") || Path::new(relative).is_absolute() {
        return;
    }
    match fs::remove_file(config.path.join(relative)).await {
        Ok(()) => tracing::debug!(file = %relative, "Image removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove image {}: {}", relative, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> UploadConfig {
        UploadConfig {
            path: dir.path().to_path_buf(),
            max_file_size: 16,
            ..UploadConfig::default()
        }
    }

    fn png(len: usize) -> UploadedImage {
        UploadedImage {
            filename: "cat.png".into(),
            content_type: "image/png".into(),
            data: Bytes::from(vec![0u8; len]),
        }
    }

    #[test]
    fn test_check_image() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        assert_eq!(check_image(&config, &png(8)), None);
        assert!(check_image(&config, &png(17)).unwrap().contains("too large"));

        let svg = UploadedImage {
            content_type: "image/svg+xml".into(),
            ..png(8)
        };
        assert!(check_image(&config, &svg).unwrap().contains("Invalid file type"));
    }

    #[tokio::test]
    async fn test_store_and_remove_image() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let relative = store_image(&config, &png(8)).await.expect("Failed to store");
        assert!(relative.starts_with("posts_images/"));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).exists());

        remove_image(&config, &relative).await;
        assert!(!dir.path().join(&relative).exists());
        // second removal is silent
        remove_image(&config, &relative).await;
    }

    #[test]
    fn test_checkbox_semantics() {
        let mut form = MultipartForm::default();
        assert!(!form.checked("is_published"));
        form.fields.insert("is_published".into(), "on".into());
        assert!(form.checked("is_published"));
        form.fields.insert("is_published".into(), "false".into());
        assert!(!form.checked("is_published"));
    }
}
