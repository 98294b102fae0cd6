use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::profile::QualityProfile;

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub original_filename: String,
    pub quality: QualityProfile,
    pub output_path: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Percentage saved relative to the input; negative when the engine made
    /// the file bigger.
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        let saved = self.original_size as f64 - self.compressed_size as f64;
        (saved / self.original_size as f64 * 10_000.0).round() / 100.0
    }

    pub fn download_name(&self) -> String {
        format!("compressed_{}", self.original_filename)
    }
}

/// An accepted upload waiting to be compressed.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}
