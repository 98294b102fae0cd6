use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::compressor::{job::Job, Compressor};

pub mod sweeper;

pub struct AppState {
    pub compressor: Compressor,
    pub jobs: JobStore,
    pub max_upload_bytes: usize,
    pub file_lifetime: std::time::Duration,
}

/// Finished jobs waiting to be downloaded, keyed by download id.
#[derive(Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: Job) {
        self.jobs.lock().await.insert(job.id, job);
    }

    /// Removes the job so a second download of the same id finds nothing.
    pub async fn take(&self, id: &Uuid) -> Option<Job> {
        self.jobs.lock().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Drops every job created more than `lifetime` before `now` and hands
    /// them back so their files can be deleted.
    pub async fn evict_expired(&self, now: DateTime<Utc>, lifetime: Duration) -> Vec<Job> {
        let mut jobs = self.jobs.lock().await;
        let expired: Vec<Uuid> = jobs
            .values()
            .filter(|job| now - job.created_at > lifetime)
            .map(|job| job.id)
            .collect();
        expired.iter().filter_map(|id| jobs.remove(id)).collect()
    }
}
