use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "/tmp/uploads";
const DEFAULT_COMPRESSED_DIR: &str = "/tmp/compressed";
const DEFAULT_GS_PATH: &str = "gs";
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_FILE_LIFETIME_SECS: u64 = 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub compressed_dir: PathBuf,
    pub gs_path: String,
    pub engine_timeout: Duration,
    pub max_upload_bytes: usize,
    pub file_lifetime: Duration,
    pub sweep_interval: Duration,
    pub workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            compressed_dir: PathBuf::from(DEFAULT_COMPRESSED_DIR),
            gs_path: DEFAULT_GS_PATH.to_string(),
            engine_timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            file_lifetime: Duration::from_secs(DEFAULT_FILE_LIFETIME_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            workers: None,
        }
    }
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(port) => {
                if port.is_empty() || !port.chars().all(char::is_numeric) {
                    anyhow::bail!("PORT must be a number");
                }
                port.parse().context("PORT out of range")?
            }
            None => defaults.port,
        };

        let engine_timeout = parse_or(&lookup, "ENGINE_TIMEOUT_SECS", DEFAULT_ENGINE_TIMEOUT_SECS)?;
        if engine_timeout == 0 {
            return Err(anyhow!("ENGINE_TIMEOUT_SECS must be greater than zero"));
        }
        let sweep_interval = parse_or(&lookup, "SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_interval == 0 {
            return Err(anyhow!("SWEEP_INTERVAL_SECS must be greater than zero"));
        }

        let workers = match lookup("WORKERS") {
            Some(workers) => Some(
                workers
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| anyhow!("WORKERS must be a positive number"))?,
            ),
            None => None,
        };

        Ok(Self {
            port,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            compressed_dir: lookup("COMPRESSED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.compressed_dir),
            gs_path: lookup("GS_PATH").unwrap_or(defaults.gs_path),
            engine_timeout: Duration::from_secs(engine_timeout),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            file_lifetime: Duration::from_secs(parse_or(
                &lookup,
                "FILE_LIFETIME_SECS",
                DEFAULT_FILE_LIFETIME_SECS,
            )?),
            sweep_interval: Duration::from_secs(sweep_interval),
            workers,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, value)),
        None => Ok(default),
    }
}
