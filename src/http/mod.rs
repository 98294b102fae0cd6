use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;
use services::{
    compress::compress,
    download::download,
    health::{health, index},
};

use crate::{config::Config, state::AppState};

mod response;
mod services;

pub use services::health::ENGINE_VERSION_TIMEOUT;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health)
        .service(compress)
        .service(download);
}

pub async fn start_http(config: &Config, state: web::Data<AppState>) -> anyhow::Result<()> {
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .configure(configure)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }
    let ip = format!("0.0.0.0:{}", config.port);
    info!("http server listening on {}", ip);
    server.bind(ip)?.run().await?;
    Ok(())
}
