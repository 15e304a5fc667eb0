//! Dataset upload: accept a zip of labeled face images and unpack it.

use crate::server::AppState;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zip::ZipArchive;

/// Multipart field carrying the archive.
pub const UPLOAD_FIELD: &str = "uploads[]";
const ALLOWED_EXTENSIONS: &[&str] = &["zip"];

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file in request.files")]
    NoFilePart,
    #[error("No file selected")]
    NoFileSelected,
    #[error("File type not allowed")]
    NotAllowed,
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("Post method not used")]
    MethodNotUsed,
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("extraction task failed")]
    Join,
}

impl UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::NoFilePart
            | UploadError::NoFileSelected
            | UploadError::NotAllowed
            | UploadError::InvalidFilename
            | UploadError::MethodNotUsed => StatusCode::OK,
            UploadError::Multipart(e) => e.status(),
            UploadError::Io(_) | UploadError::Archive(_) | UploadError::Join => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "upload failed");
        } else {
            tracing::warn!(error = %self, "upload rejected");
        }
        (status, Json(UploadStatus::error(self.to_string()))).into_response()
    }
}

/// `{"status": "SUCCESS"}` or `{"status": "ERROR", "message": ...}`.
#[derive(Debug, Serialize, PartialEq)]
pub struct UploadStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UploadStatus {
    pub fn success() -> Self {
        Self {
            status: "SUCCESS",
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "ERROR",
            message: Some(message.into()),
        }
    }
}

pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadStatus>, UploadError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "request is not multipart");
        UploadError::NoFilePart
    })?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            upload = Some((filename, bytes));
            break;
        }
    }
    let (filename, bytes) = upload.ok_or(UploadError::NoFilePart)?;

    let dataset_dir = state.dataset_dir.clone();
    let extracted = tokio::task::spawn_blocking(move || store_upload(&dataset_dir, &filename, &bytes))
        .await
        .map_err(|_| UploadError::Join)??;

    tracing::info!(
        dataset = %state.dataset_dir.display(),
        files = extracted,
        "dataset archive extracted"
    );
    Ok(Json(UploadStatus::success()))
}

pub async fn upload_file_get() -> UploadError {
    UploadError::MethodNotUsed
}

/// Validate, save and unpack one uploaded archive. Returns the number of files extracted.
///
/// Nothing is written unless the filename passes validation.
pub fn store_upload(dataset_dir: &Path, filename: &str, bytes: &[u8]) -> Result<usize, UploadError> {
    if filename.is_empty() {
        return Err(UploadError::NoFileSelected);
    }
    if !allowed_file(filename) {
        return Err(UploadError::NotAllowed);
    }
    let safe_name = secure_filename(filename);
    if safe_name.is_empty() {
        return Err(UploadError::InvalidFilename);
    }

    fs::create_dir_all(dataset_dir)?;
    let archive_path = dataset_dir.join(&safe_name);
    fs::write(&archive_path, bytes)?;
    tracing::debug!(path = %archive_path.display(), bytes = bytes.len(), "saved upload");

    extract_archive(&archive_path, dataset_dir)
}

/// Unpack every entry of `archive` under `dest`, keeping entry paths.
///
/// Entries whose path would land outside `dest` are skipped.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, UploadError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut extracted = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = entry.name(), "skipping archive entry outside dataset directory");
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        extracted += 1;
    }

    Ok(extracted)
}

/// True when the text after the last `.` is an allowed extension (case-insensitive).
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

/// Reduce an uploaded filename to a safe single path component.
///
/// The name is NFKD-normalized and the remaining non-ASCII dropped, so
/// accented letters keep their base letter. Path separators become spaces,
/// whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]` is removed
/// and leading or trailing `.`/`_` are stripped. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
