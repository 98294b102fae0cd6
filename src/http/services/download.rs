// get /download/{id} where id is the download id handed out by /compress

use actix_web::{
    get,
    http::{
        header::{ContentDisposition, DispositionParam, DispositionType},
        StatusCode,
    },
    web, HttpResponse, ResponseError,
};
use log::info;
use tokio::fs;
use uuid::Uuid;

use crate::{http::response::ApiResponse, scratch::remove_quietly, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("file not found")]
    JobNotFound,
    #[error("filesystem error: {0}")]
    FilesystemError(#[from] std::io::Error),
}

impl ResponseError for DownloadError {
    fn status_code(&self) -> StatusCode {
        match self {
            DownloadError::JobNotFound => StatusCode::NOT_FOUND,
            DownloadError::FilesystemError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        ApiResponse::failure(self.status_code(), self)
    }
}

#[get("/download/{id}")]
pub async fn download(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, DownloadError> {
    let id = Uuid::parse_str(&path.into_inner()).map_err(|_| DownloadError::JobNotFound)?;

    // taking the job up front means a concurrent second download gets a 404
    let job = state.jobs.take(&id).await.ok_or(DownloadError::JobNotFound)?;

    let bytes = fs::read(&job.output_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DownloadError::JobNotFound
        } else {
            DownloadError::FilesystemError(e)
        }
    })?;

    let mime = mime_guess::from_path(&job.output_path)
        .first_or_octet_stream()
        .to_string();

    remove_quietly(&job.output_path).await;
    info!("job {} downloaded ({} bytes)", id, bytes.len());

    Ok(HttpResponse::Ok()
        .insert_header(("Content-Type", mime))
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(job.download_name())],
        })
        .body(bytes))
}
