use crate::{
    compressor::{
        job::{Job, Upload},
        profile::QualityProfile,
        CompressError,
    },
    http::response::ApiResponse,
    state::AppState,
};
use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{http::StatusCode, post, web, HttpResponse, Responder, ResponseError};
use chrono::{DateTime, Utc};
use futures_util::StreamExt as _;
use log::info;
use serde::Serialize;

const PDF_MAGIC: &[u8] = b"%PDF-";
// readers accept the header anywhere in the first kilobyte
const PDF_HEADER_WINDOW: usize = 1024;
const MAX_QUALITY_FIELD_BYTES: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum CompressRequestError {
    #[error("no file uploaded")]
    NoFile,
    #[error("no file selected")]
    NoFilename,
    #[error("file must be a PDF")]
    NotPdf,
    #[error("file is empty")]
    EmptyFile,
    #[error("file too large (max {max} bytes)")]
    TooLarge { max: usize },
    #[error("invalid quality: {0}. allowed: screen, ebook, printer, prepress")]
    InvalidQuality(String),
    #[error("failed to read multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Compress(#[from] CompressError),
}

impl ResponseError for CompressRequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            CompressRequestError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CompressRequestError::Compress(e) => match e {
                CompressError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CompressError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                CompressError::Engine(_)
                | CompressError::MissingOutput
                | CompressError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        ApiResponse::failure(self.status_code(), self)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressResponse {
    pub download_id: String,
    pub original_filename: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_ratio: f64,
    pub quality: QualityProfile,
    pub expires_at: DateTime<Utc>,
}

impl CompressResponse {
    fn new(job: &Job, lifetime: std::time::Duration) -> Self {
        let expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| job.created_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            download_id: job.id.to_string(),
            original_filename: job.original_filename.clone(),
            original_size: job.original_size,
            compressed_size: job.compressed_size,
            compression_ratio: job.compression_ratio(),
            quality: job.quality,
            expires_at,
        }
    }
}

#[post("/compress")]
pub async fn compress(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<impl Responder, CompressRequestError> {
    let mut upload: Option<Upload> = None;
    let mut quality: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;

        let Some(content_disposition) = field.content_disposition().cloned() else {
            continue;
        };

        match content_disposition.get_name() {
            Some("file") => {
                let filename = content_disposition
                    .get_filename()
                    .map(sanitize_filename)
                    .filter(|name| !name.is_empty())
                    .ok_or(CompressRequestError::NoFilename)?;

                if !filename.to_ascii_lowercase().ends_with(".pdf") {
                    return Err(CompressRequestError::NotPdf);
                }

                let bytes = read_limited(&mut field, state.max_upload_bytes)
                    .await?
                    .ok_or(CompressRequestError::TooLarge {
                        max: state.max_upload_bytes,
                    })?;

                info!("uploaded file: {} ({} bytes)", filename, bytes.len());
                upload = Some(Upload { filename, bytes });
            }
            Some("quality") => {
                let bytes = read_limited(&mut field, MAX_QUALITY_FIELD_BYTES)
                    .await?
                    .ok_or_else(|| CompressRequestError::InvalidQuality("<too long>".into()))?;
                quality = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            _ => continue,
        }
    }

    let upload = upload.ok_or(CompressRequestError::NoFile)?;
    let quality = QualityProfile::from_field(quality.as_deref())
        .ok_or_else(|| CompressRequestError::InvalidQuality(quality.unwrap_or_default()))?;

    if upload.bytes.is_empty() {
        return Err(CompressRequestError::EmptyFile);
    }
    if !has_pdf_header(&upload.bytes) {
        return Err(CompressRequestError::NotPdf);
    }

    let job = state.compressor.compress(upload, quality).await?;
    let response = CompressResponse::new(&job, state.file_lifetime);
    state.jobs.insert(job).await;

    Ok(ApiResponse::Success(response))
}

/// Collects a field into memory. Returns `None` as soon as it grows past
/// `limit`, without reading the rest.
async fn read_limited(
    field: &mut Field,
    limit: usize,
) -> Result<Option<Vec<u8>>, MultipartError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk?;
        if bytes.len() + data.len() > limit {
            return Ok(None);
        }
        bytes.extend_from_slice(&data);
    }
    Ok(Some(bytes))
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Reduces a client-supplied filename to its final component with only
/// ASCII alphanumerics, `.`, `-` and `_` kept.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
