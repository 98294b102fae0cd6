use std::path::Path;
use std::process::Stdio;

use anyhow::anyhow;
use async_trait::async_trait;
use log::info;
use tokio::process::Command;

use super::profile::QualityProfile;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine exited with {}: {stderr}", exit_label(.code))]
    Exit { code: Option<i32>, stderr: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// External tool that rewrites a PDF at `input` into a smaller one at `output`.
#[async_trait]
pub trait CompressionEngine: Send + Sync {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        profile: QualityProfile,
    ) -> Result<(), EngineError>;

    async fn version(&self) -> anyhow::Result<String>;
}

/// Asks the engine for its version, giving up after `limit`.
pub async fn query_version(
    engine: &dyn CompressionEngine,
    limit: std::time::Duration,
) -> anyhow::Result<String> {
    tokio::time::timeout(limit, engine.version())
        .await
        .map_err(|_| anyhow!("version query timed out after {:?}", limit))?
}

pub struct Ghostscript {
    program: String,
}

impl Ghostscript {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(input: &Path, output: &Path, profile: QualityProfile) -> Vec<String> {
        let mut args: Vec<String> = [
            "-sDEVICE=pdfwrite",
            "-dCompatibilityLevel=1.4",
            "-dNOPAUSE",
            "-dQUIET",
            "-dBATCH",
            "-dSAFER",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.extend(profile.to_args());
        args.push("-dOptimize=true".to_string());
        args.push(format!("-sOutputFile={}", output.display()));
        args.push(input.display().to_string());
        args
    }
}

#[async_trait]
impl CompressionEngine for Ghostscript {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        profile: QualityProfile,
    ) -> Result<(), EngineError> {
        let args = Self::args(input, output, profile);
        info!("running '{} {}'", self.program, args.join(" "));

        // dropping the future (timeout) must take the child down with it
        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(EngineError::Exit {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    async fn version(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            return Err(anyhow!("{} --version exited with {}", self.program, output.status));
        }
        let version = String::from_utf8(output.stdout)?;
        let version = version.trim();
        if version.is_empty() {
            return Err(anyhow!("{} --version printed nothing", self.program));
        }
        Ok(version.to_string())
    }
}
