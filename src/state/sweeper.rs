use std::time::Duration;

use actix_web::web;
use chrono::Utc;
use log::{error, info};

use super::AppState;
use crate::scratch::remove_quietly;

/// Evicts jobs past their lifetime, deletes their outputs, then clears any
/// stale leftovers in scratch storage. Returns how many jobs were evicted.
pub async fn sweep_once(state: &AppState) -> usize {
    let Ok(lifetime) = chrono::Duration::from_std(state.file_lifetime) else {
        return 0;
    };

    let expired = state.jobs.evict_expired(Utc::now(), lifetime).await;
    for job in &expired {
        info!("{:?} elapsed, removing {}", state.file_lifetime, job.id);
        remove_quietly(&job.output_path).await;
    }
    if !expired.is_empty() {
        info!("{} jobs still awaiting download", state.jobs.len().await);
    }

    match state.compressor.scratch().sweep(state.file_lifetime).await {
        Ok(0) => {}
        Ok(n) => info!("removed {} orphaned scratch files", n),
        Err(e) => error!("failed to sweep scratch storage: {}", e),
    }

    expired.len()
}

pub fn spawn_sweeper(state: web::Data<AppState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick fires immediately and there is nothing to sweep yet
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(&state).await;
        }
    });
}
