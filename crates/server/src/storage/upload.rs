//! Validation and storage of session media uploads.

use bytes::Bytes;
use shared::UploadResponse;
use tempfile::TempPath;

use super::ObjectStore;
use crate::error::{AppError, Result};

pub const IMAGE_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const VIDEO_MAX_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Shorter slugs are refused by `delete_folder`
pub const MIN_FOLDER_SLUG_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Thumbnail,
    Video,
}

impl UploadKind {
    pub fn max_bytes(&self) -> u64 {
        match self {
            UploadKind::Thumbnail => IMAGE_MAX_BYTES,
            UploadKind::Video => VIDEO_MAX_BYTES,
        }
    }

    /// Videos are spooled to disk while they arrive instead of held in memory
    pub fn spools_to_disk(&self) -> bool {
        matches!(self, UploadKind::Video)
    }

    /// Fixed object name per kind, so a re-upload replaces the previous file
    fn file_stem(&self) -> &'static str {
        match self {
            UploadKind::Thumbnail => "thumbnail",
            UploadKind::Video => "video",
        }
    }

    /// File extension for an allowed content type
    pub fn extension_for(&self, content_type: &str) -> Option<&'static str> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match (self, essence.as_str()) {
            (UploadKind::Thumbnail, "image/jpeg") => Some("jpg"),
            (UploadKind::Thumbnail, "image/png") => Some("png"),
            (UploadKind::Thumbnail, "image/webp") => Some("webp"),
            (UploadKind::Video, "video/mp4") => Some("mp4"),
            (UploadKind::Video, "video/webm") => Some("webm"),
            (UploadKind::Video, "video/quicktime") => Some("mov"),
            _ => None,
        }
    }

    fn allowed(&self) -> &'static str {
        match self {
            UploadKind::Thumbnail => "JPEG, PNG or WebP",
            UploadKind::Video => "MP4, WebM or QuickTime",
        }
    }

    /// Fails when `content_type` is not accepted for this kind
    pub fn check_content_type(&self, content_type: &str) -> Result<&'static str> {
        self.extension_for(content_type).ok_or_else(|| {
            AppError::validation(format!(
                "content type {} is not allowed, expected {}",
                content_type,
                self.allowed()
            ))
        })
    }

    /// Fails once `len` passes the ceiling for this kind
    pub fn check_size(&self, len: u64) -> Result<()> {
        if len > self.max_bytes() {
            return Err(AppError::validation(format!(
                "file exceeds the {} MiB limit",
                self.max_bytes() / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum UploadBody {
    Memory(Bytes),
    /// Temporary file, removed when dropped
    Spooled { path: TempPath, len: u64 },
}

impl UploadBody {
    pub fn size(&self) -> u64 {
        match self {
            UploadBody::Memory(bytes) => bytes.len() as u64,
            UploadBody::Spooled { len, .. } => *len,
        }
    }
}

/// File part of an upload request
#[derive(Debug)]
pub struct UploadFile {
    pub content_type: String,
    pub body: UploadBody,
}

/// Folder slugs: non-empty, no path separators or dot segments
pub fn check_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.contains('/') || slug.contains('\\') || slug.contains("..") {
        return Err(AppError::validation(format!("invalid slug: {:?}", slug)));
    }
    Ok(())
}

pub fn object_key(kind: UploadKind, slug: &str, extension: &str) -> String {
    format!("{}/{}.{}", slug, kind.file_stem(), extension)
}

/// Validate an upload and store it under `<slug>/<kind>.<ext>`
pub async fn store_upload(
    store: &dyn ObjectStore,
    kind: UploadKind,
    slug: Option<&str>,
    file: Option<UploadFile>,
) -> Result<UploadResponse> {
    let file = file.ok_or_else(|| AppError::validation("file is required"))?;
    let slug = slug
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("slug is required"))?;
    check_slug(slug)?;

    let extension = kind.check_content_type(&file.content_type)?;
    kind.check_size(file.body.size())?;

    let key = object_key(kind, slug, extension);
    let url = match file.body {
        UploadBody::Memory(bytes) => store.put(&key, bytes, &file.content_type).await?,
        UploadBody::Spooled { path, .. } => store.put_file(&key, &path, &file.content_type).await?,
    };
    tracing::info!("Uploaded {:?} for {} as {}", kind, slug, key);

    Ok(UploadResponse { key, url })
}

/// Remove every object under `<slug>/`. Returns how many were deleted.
pub async fn delete_folder(store: &dyn ObjectStore, slug: &str) -> Result<usize> {
    let slug = slug.trim();
    if slug.chars().count() < MIN_FOLDER_SLUG_LEN {
        return Err(AppError::validation(format!(
            "slug must be at least {} characters",
            MIN_FOLDER_SLUG_LEN
        )));
    }
    check_slug(slug)?;

    // The trailing slash keeps "test" from matching "test-video/..."
    let prefix = format!("{}/", slug);
    let keys = store.list_by_prefix(&prefix).await?;
    for key in &keys {
        store.delete(key).await?;
    }

    tracing::info!("Deleted {} objects under {}", keys.len(), prefix);
    Ok(keys.len())
}
