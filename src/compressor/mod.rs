use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use engine::{CompressionEngine, EngineError};
use job::{Job, Upload};
use log::{error, info};
use profile::QualityProfile;
use tokio::fs;
use uuid::Uuid;

use crate::scratch::{Scratch, ScratchGuard};

pub mod engine;
pub mod job;
pub mod profile;
#[cfg(test)]
pub mod testing;

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("compression failed: {0}")]
    Engine(#[from] EngineError),
    #[error("compression timed out after {0:?}")]
    Timeout(Duration),
    #[error("compression produced no output")]
    MissingOutput,
    #[error("scratch storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Runs one upload through the engine: persist, compress, verify, clean up.
pub struct Compressor {
    engine: Arc<dyn CompressionEngine>,
    scratch: Scratch,
    timeout: Duration,
}

impl Compressor {
    pub fn new(engine: Arc<dyn CompressionEngine>, scratch: Scratch, timeout: Duration) -> Self {
        Self {
            engine,
            scratch,
            timeout,
        }
    }

    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    pub fn engine(&self) -> &Arc<dyn CompressionEngine> {
        &self.engine
    }

    pub async fn compress(
        &self,
        upload: Upload,
        quality: QualityProfile,
    ) -> Result<Job, CompressError> {
        if upload.bytes.is_empty() {
            return Err(CompressError::InvalidInput("file is empty".to_string()));
        }

        let id = Uuid::new_v4();
        let input = self.scratch.upload_path(id);
        let output = self.scratch.output_path(id);
        let original_size = upload.bytes.len() as u64;

        // from here on every exit path, including cancellation, cleans up
        let mut guard = ScratchGuard::new(input.clone(), output.clone());

        if let Err(e) = fs::write(&input, &upload.bytes).await {
            error!("job {} failed to write upload: {}", id, e);
            return Err(e.into());
        }

        let compressed_size = match self.run(id, quality).await {
            Ok(size) => size,
            Err(e) => {
                error!("job {} failed: {}", id, e);
                return Err(e);
            }
        };
        guard.keep_output();
        drop(guard);

        info!(
            "job {} compressed {} -> {} bytes ({})",
            id, original_size, compressed_size, quality
        );

        Ok(Job {
            id,
            original_filename: upload.filename,
            quality,
            output_path: output,
            original_size,
            compressed_size,
            created_at: Utc::now(),
        })
    }

    /// Invokes the engine and returns the size of what it wrote.
    async fn run(&self, id: Uuid, quality: QualityProfile) -> Result<u64, CompressError> {
        let input = self.scratch.upload_path(id);
        let output = self.scratch.output_path(id);

        tokio::time::timeout(
            self.timeout,
            self.engine.compress(&input, &output, quality),
        )
        .await
        .map_err(|_| CompressError::Timeout(self.timeout))??;

        let size = match fs::metadata(&output).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CompressError::MissingOutput)
            }
            Err(e) => return Err(e.into()),
        };
        if size == 0 {
            return Err(CompressError::MissingOutput);
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Behaviour, FakeEngine, MINIMAL_PDF};
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    struct Fixture {
        tmp: tempfile::TempDir,
        compressor: Compressor,
        engine: Arc<FakeEngine>,
    }

    async fn fixture(engine: FakeEngine, timeout: Duration) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(tmp.path().join("uploads"), tmp.path().join("compressed"));
        scratch.ensure().await.unwrap();
        let engine = Arc::new(engine);
        let compressor = Compressor::new(engine.clone(), scratch, timeout);
        Fixture {
            tmp,
            compressor,
            engine,
        }
    }

    fn upload() -> Upload {
        Upload {
            filename: "report.pdf".to_string(),
            bytes: MINIMAL_PDF.to_vec(),
        }
    }

    async fn dir_is_empty(path: &std::path::Path) -> bool {
        let mut entries = fs::read_dir(path).await.unwrap();
        entries.next_entry().await.unwrap().is_none()
    }

    #[tokio::test]
    async fn every_profile_produces_output() {
        let f = fixture(FakeEngine::new(Behaviour::Halve), Duration::from_secs(5)).await;
        for quality in QualityProfile::iter() {
            let job = f.compressor.compress(upload(), quality).await.unwrap();
            assert_eq!(job.quality, quality);
            assert!(job.compressed_size > 0);
            assert_eq!(job.original_size, MINIMAL_PDF.len() as u64);
            assert!(job.output_path.exists());
            assert!(!f.compressor.scratch().upload_path(job.id).exists());
        }
        assert_eq!(f.engine.calls(), 4);
    }

    #[tokio::test]
    async fn engine_failure_leaves_no_files() {
        let f = fixture(
            FakeEngine::new(Behaviour::FailAfterPartialWrite),
            Duration::from_secs(5),
        )
        .await;
        let err = f
            .compressor
            .compress(upload(), QualityProfile::Ebook)
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::Engine(EngineError::Exit { .. })));
        assert!(dir_is_empty(&f.tmp.path().join("uploads")).await);
        assert!(dir_is_empty(&f.tmp.path().join("compressed")).await);
    }

    #[tokio::test]
    async fn hung_engine_times_out() {
        let f = fixture(FakeEngine::new(Behaviour::Hang), Duration::from_millis(50)).await;
        let err = f
            .compressor
            .compress(upload(), QualityProfile::Screen)
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::Timeout(_)));
        assert!(dir_is_empty(&f.tmp.path().join("uploads")).await);
        assert!(dir_is_empty(&f.tmp.path().join("compressed")).await);
    }

    #[tokio::test]
    async fn empty_output_is_rejected() {
        let f = fixture(FakeEngine::new(Behaviour::WriteEmpty), Duration::from_secs(5)).await;
        let err = f
            .compressor
            .compress(upload(), QualityProfile::Printer)
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::MissingOutput));
        assert!(dir_is_empty(&f.tmp.path().join("compressed")).await);
    }

    #[tokio::test]
    async fn silent_engine_without_output_is_rejected() {
        let f = fixture(FakeEngine::new(Behaviour::NoOutput), Duration::from_secs(5)).await;
        let err = f
            .compressor
            .compress(upload(), QualityProfile::Printer)
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::MissingOutput));
    }

    #[tokio::test]
    async fn empty_upload_never_reaches_the_engine() {
        let f = fixture(FakeEngine::new(Behaviour::Halve), Duration::from_secs(5)).await;
        let err = f
            .compressor
            .compress(
                Upload {
                    filename: "empty.pdf".to_string(),
                    bytes: Vec::new(),
                },
                QualityProfile::Ebook,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::InvalidInput(_)));
        assert_eq!(f.engine.calls(), 0);
    }

    #[tokio::test]
    async fn failed_upload_write_is_a_storage_error() {
        let f = fixture(FakeEngine::new(Behaviour::Halve), Duration::from_secs(5)).await;
        std::fs::remove_dir_all(f.tmp.path().join("uploads")).unwrap();

        let err = f
            .compressor
            .compress(upload(), QualityProfile::Ebook)
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::Storage(_)));
        assert_eq!(f.engine.calls(), 0);
        assert!(dir_is_empty(&f.tmp.path().join("compressed")).await);
    }

    #[tokio::test]
    async fn cancelled_job_leaves_no_files() {
        let f = fixture(FakeEngine::new(Behaviour::Hang), Duration::from_secs(3600)).await;

        // the caller going away drops the future mid-engine
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            f.compressor.compress(upload(), QualityProfile::Ebook),
        )
        .await;

        assert!(abandoned.is_err());
        assert_eq!(f.engine.calls(), 1);
        assert!(dir_is_empty(&f.tmp.path().join("uploads")).await);
        assert!(dir_is_empty(&f.tmp.path().join("compressed")).await);
    }

    #[tokio::test]
    async fn larger_output_is_still_returned() {
        let f = fixture(FakeEngine::new(Behaviour::Grow), Duration::from_secs(5)).await;
        let job = f
            .compressor
            .compress(upload(), QualityProfile::Prepress)
            .await
            .unwrap();
        assert!(job.compressed_size > job.original_size);
        assert!(job.compression_ratio() < 0.0);
    }

    #[tokio::test]
    async fn concurrent_jobs_use_disjoint_files() {
        let f = fixture(FakeEngine::new(Behaviour::Halve), Duration::from_secs(5)).await;
        let compressor = Arc::new(f.compressor);

        let handles: Vec<_> = (0..8u8)
            .map(|n| {
                let compressor = compressor.clone();
                tokio::spawn(async move {
                    let mut bytes = MINIMAL_PDF.to_vec();
                    bytes.extend(std::iter::repeat(n).take(64));
                    let upload = Upload {
                        filename: format!("{}.pdf", n),
                        bytes: bytes.clone(),
                    };
                    let job = compressor
                        .compress(upload, QualityProfile::Ebook)
                        .await
                        .unwrap();
                    let written = fs::read(&job.output_path).await.unwrap();
                    assert_eq!(written, bytes[..bytes.len() / 2]);
                    job
                })
            })
            .collect();

        let mut paths = HashSet::new();
        for handle in handles {
            let job = handle.await.unwrap();
            assert!(paths.insert(job.output_path));
        }
        assert_eq!(paths.len(), 8);
    }
}
