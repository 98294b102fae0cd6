use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;

use super::engine::{CompressionEngine, EngineError};
use super::profile::QualityProfile;

pub const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n";

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Writes the first half of the input.
    Halve,
    /// Writes the input twice over.
    Grow,
    /// Leaves a partial file behind and exits nonzero.
    FailAfterPartialWrite,
    /// Never returns, from either call.
    Hang,
    /// Succeeds with a zero-length output.
    WriteEmpty,
    /// Succeeds without writing anything.
    NoOutput,
}

/// Stand-in for Ghostscript that records how often it was invoked.
pub struct FakeEngine {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl FakeEngine {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn io_failure(e: std::io::Error) -> EngineError {
    EngineError::Exit {
        code: Some(1),
        stderr: e.to_string(),
    }
}

#[async_trait]
impl CompressionEngine for FakeEngine {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        _profile: QualityProfile,
    ) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = fs::read(input).await.map_err(io_failure)?;

        match self.behaviour {
            Behaviour::Halve => fs::write(output, &bytes[..bytes.len() / 2])
                .await
                .map_err(io_failure),
            Behaviour::Grow => fs::write(output, [bytes.as_slice(), bytes.as_slice()].concat())
                .await
                .map_err(io_failure),
            Behaviour::FailAfterPartialWrite => {
                fs::write(output, b"%PDF-").await.map_err(io_failure)?;
                Err(EngineError::Exit {
                    code: Some(1),
                    stderr: "Error: /syntaxerror in obj".to_string(),
                })
            }
            Behaviour::Hang => {
                fs::write(output, b"%PDF-").await.map_err(io_failure)?;
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Behaviour::WriteEmpty => fs::write(output, b"").await.map_err(io_failure),
            Behaviour::NoOutput => Ok(()),
        }
    }

    async fn version(&self) -> anyhow::Result<String> {
        if let Behaviour::Hang = self.behaviour {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok("10.02.1".to_string())
    }
}
