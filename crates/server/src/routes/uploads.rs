use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, State,
    },
    Json,
};
use bytes::BytesMut;
use shared::{DeleteFolderResponse, UploadResponse};
use tokio::io::AsyncWriteExt;

use crate::{
    auth::AdminPrincipal,
    error::{AppError, Result},
    state::AppState,
    storage::upload::{self, UploadBody, UploadFile, UploadKind},
};

/// Longest accepted `slug` form field
const MAX_SLUG_FIELD_BYTES: usize = 256;

fn malformed(e: MultipartError) -> AppError {
    AppError::validation(format!("malformed multipart body: {}", e))
}

fn spool_failed(e: std::io::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("could not spool upload: {}", e))
}

/// Read the file part chunk by chunk, failing as soon as it passes the
/// ceiling for `kind`. Videos go to a temporary file.
async fn read_file(kind: UploadKind, field: &mut Field<'_>) -> Result<UploadBody> {
    if !kind.spools_to_disk() {
        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            kind.check_size((buf.len() + chunk.len()) as u64)?;
            buf.extend_from_slice(&chunk);
        }
        return Ok(UploadBody::Memory(buf.freeze()));
    }

    let (file, path) = tempfile::NamedTempFile::new().map_err(spool_failed)?.into_parts();
    let mut file = tokio::fs::File::from_std(file);
    let mut len = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        len += chunk.len() as u64;
        kind.check_size(len)?;
        file.write_all(&chunk).await.map_err(spool_failed)?;
    }
    file.flush().await.map_err(spool_failed)?;
    tracing::debug!("Spooled {} bytes to {}", len, path.display());

    Ok(UploadBody::Spooled { path, len })
}

/// Collect the `slug` and `file` parts
async fn read_parts(kind: UploadKind, mut multipart: Multipart) -> Result<(Option<String>, Option<UploadFile>)> {
    let mut slug = None;
    let mut file = None;

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("slug") => {
                let text = field.text().await.map_err(malformed)?;
                if text.len() > MAX_SLUG_FIELD_BYTES {
                    return Err(AppError::validation("slug is too long"));
                }
                slug = Some(text);
            }
            Some("file") => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                kind.check_content_type(&content_type)?;

                let body = read_file(kind, &mut field).await?;
                file = Some(UploadFile { content_type, body });
            }
            other => {
                tracing::debug!("Ignoring multipart field {:?}", other);
            }
        }
    }

    Ok((slug, file))
}

async fn handle_upload(state: &AppState, kind: UploadKind, multipart: Multipart) -> Result<Json<UploadResponse>> {
    let (slug, file) = read_parts(kind, multipart).await?;
    let response = upload::store_upload(state.store.as_ref(), kind, slug.as_deref(), file).await?;
    Ok(Json(response))
}

pub async fn thumbnail(
    AdminPrincipal(_admin): AdminPrincipal,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    handle_upload(&state, UploadKind::Thumbnail, multipart).await
}

pub async fn video(
    AdminPrincipal(_admin): AdminPrincipal,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    handle_upload(&state, UploadKind::Video, multipart).await
}

pub async fn delete_folder(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DeleteFolderResponse>> {
    let deleted = upload::delete_folder(state.store.as_ref(), &slug).await?;
    tracing::info!("Admin {} cleared media folder {}", admin.user_id, slug);
    Ok(Json(DeleteFolderResponse { deleted }))
}
