use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{info, warn};
use tokio::fs;
use uuid::Uuid;

/// The two directories uploads and engine outputs live in until they are
/// downloaded or swept. Every path is derived from a job id alone, so
/// concurrent jobs never touch each other's files.
#[derive(Debug, Clone)]
pub struct Scratch {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl Scratch {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn upload_path(&self, id: Uuid) -> PathBuf {
        self.upload_dir.join(format!("{}.pdf", id))
    }

    pub fn output_path(&self, id: Uuid) -> PathBuf {
        self.output_dir.join(format!("{}.pdf", id))
    }

    pub async fn ensure(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.upload_dir).await?;
        fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    /// Wipes anything left over from a previous run.
    pub async fn reset(&self) -> std::io::Result<()> {
        // we don't care if these fail, the dirs may not exist yet
        let _ = fs::remove_dir_all(&self.upload_dir).await;
        let _ = fs::remove_dir_all(&self.output_dir).await;
        self.ensure().await
    }

    /// Deletes files in both directories last modified more than `max_age` ago.
    pub async fn sweep(&self, max_age: Duration) -> std::io::Result<usize> {
        let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
            return Ok(0);
        };
        let mut removed = 0;
        for dir in [&self.upload_dir, &self.output_dir] {
            removed += sweep_dir(dir, cutoff).await?;
        }
        Ok(removed)
    }
}

async fn sweep_dir(dir: &Path, cutoff: SystemTime) -> std::io::Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            // raced with a download or another sweep
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            continue;
        }
        let stale = metadata.modified().map(|m| m < cutoff).unwrap_or(false);
        if stale && remove_quietly(&entry.path()).await {
            info!("swept stale scratch file {}", entry.path().display());
            removed += 1;
        }
    }
    Ok(removed)
}

/// Removes a file, treating "already gone" as success. Returns whether a file
/// was actually deleted.
pub async fn remove_quietly(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                warn!("failed to remove {}: {}", path.display(), e);
            }
            false
        }
    }
}

/// Owns a job's scratch files for the length of one compression. Dropping it
/// deletes the input and, unless `keep_output` was called, the output too, so
/// cleanup happens on error returns and when the task is cancelled.
pub struct ScratchGuard {
    input: PathBuf,
    output: PathBuf,
    keep_output: bool,
}

impl ScratchGuard {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            keep_output: false,
        }
    }

    pub fn keep_output(&mut self) {
        self.keep_output = true;
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        remove_now(&self.input);
        if !self.keep_output {
            remove_now(&self.output);
        }
    }
}

// Drop can't await
fn remove_now(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!("failed to remove {}: {}", path.display(), e);
        }
    }
}
