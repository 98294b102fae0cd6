use std::time::Duration;

use actix_web::{get, web, Responder};
use log::warn;
use serde::Serialize;

use crate::{
    compressor::engine::query_version, http::response::ApiResponse, state::AppState,
};

pub const ENGINE_VERSION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub engine_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

#[get("/")]
pub async fn index() -> impl Responder {
    ApiResponse::Success(ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

/// Liveness plus whether the engine can actually be run.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let engine_version =
        match query_version(state.compressor.engine().as_ref(), ENGINE_VERSION_TIMEOUT).await {
            Ok(version) => Some(version),
            Err(e) => {
                warn!("engine unavailable: {}", e);
                None
            }
        };

    ApiResponse::Success(Health {
        status: "healthy",
        engine_available: engine_version.is_some(),
        engine_version,
    })
}
