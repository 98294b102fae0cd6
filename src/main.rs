mod compressor;
mod config;
mod http;
mod scratch;
mod state;

use std::sync::Arc;

use actix_web::web;
use compressor::{
    engine::{query_version, Ghostscript},
    Compressor,
};
use config::Config;
use env_logger::Env;
use http::{start_http, ENGINE_VERSION_TIMEOUT};
use log::{info, warn};
use scratch::Scratch;
use state::{sweeper::spawn_sweeper, AppState, JobStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("pdfd=info,actix_web=info"))
        .init();
    info!("starting pdfd");

    let config = Config::from_env()?;

    let engine = Arc::new(Ghostscript::new(config.gs_path.clone()));
    match query_version(engine.as_ref(), ENGINE_VERSION_TIMEOUT).await {
        Ok(version) => info!("working w/ ghostscript {}", version),
        // keep serving so /health can report the problem
        Err(e) => warn!(
            "failed to get ghostscript version -- pdfd needs `{}` on the path or GS_PATH set ({})",
            config.gs_path, e
        ),
    }

    let scratch = Scratch::new(&config.upload_dir, &config.compressed_dir);
    scratch.reset().await?;

    let state = web::Data::new(AppState {
        compressor: Compressor::new(engine, scratch, config.engine_timeout),
        jobs: JobStore::new(),
        max_upload_bytes: config.max_upload_bytes,
        file_lifetime: config.file_lifetime,
    });

    spawn_sweeper(state.clone(), config.sweep_interval);

    start_http(&config, state).await?;
    Ok(())
}
