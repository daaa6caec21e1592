//! Configuration module
//!
//! Settings are read from the environment (after loading `.env`), with CLI
//! flags layered on top by the binary.

use std::env;

use crate::storage_types::StorageBackend;

const SYNC_CONCURRENCY: usize = 8;
const MAX_SYNC_CONCURRENCY: usize = 64;
const INDEX_DOCUMENT: &str = "index.html";
const ERROR_DOCUMENT: &str = "error.html";
const LABEL_POLL_INTERVAL_SECS: u64 = 2;
const LABEL_MAX_ATTEMPTS: u32 = 120;

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub region: Option<String>,
    pub aws_profile: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    pub sync_concurrency: usize,
    pub index_document: String,
    pub error_document: String,
    pub label_poll_interval_secs: u64,
    pub label_max_attempts: u32,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::S3,
            region: None,
            aws_profile: None,
            s3_endpoint: None,
            local_storage_path: None,
            sync_concurrency: SYNC_CONCURRENCY,
            index_document: INDEX_DOCUMENT.to_string(),
            error_document: ERROR_DOCUMENT.to_string(),
            label_poll_interval_secs: LABEL_POLL_INTERVAL_SECS,
            label_max_attempts: LABEL_MAX_ATTEMPTS,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage_backend = match get("S3WEB_STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::S3,
        };

        let sync_concurrency = match get("S3WEB_SYNC_CONCURRENCY") {
            Some(value) => value.trim().parse().map_err(|_| {
                anyhow::anyhow!("S3WEB_SYNC_CONCURRENCY must be a positive number")
            })?,
            None => SYNC_CONCURRENCY,
        };

        let label_poll_interval_secs = match get("S3WEB_LABEL_POLL_INTERVAL_SECS") {
            Some(value) => value.trim().parse().map_err(|_| {
                anyhow::anyhow!("S3WEB_LABEL_POLL_INTERVAL_SECS must be a positive number")
            })?,
            None => LABEL_POLL_INTERVAL_SECS,
        };

        let label_max_attempts = match get("S3WEB_LABEL_MAX_ATTEMPTS") {
            Some(value) => value.trim().parse().map_err(|_| {
                anyhow::anyhow!("S3WEB_LABEL_MAX_ATTEMPTS must be a positive number")
            })?,
            None => LABEL_MAX_ATTEMPTS,
        };

        let log_format = match get("S3WEB_LOG_FORMAT").map(|v| v.to_lowercase()) {
            None => LogFormat::Pretty,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) => {
                return Err(anyhow::anyhow!(
                    "S3WEB_LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                    v
                ))
            }
        };

        let config = Config {
            storage_backend,
            region: get("S3WEB_REGION").or_else(|| get("AWS_REGION")),
            aws_profile: get("S3WEB_AWS_PROFILE"),
            s3_endpoint: get("S3WEB_S3_ENDPOINT"),
            local_storage_path: get("S3WEB_LOCAL_STORAGE_PATH"),
            sync_concurrency,
            index_document: get("S3WEB_INDEX_DOCUMENT")
                .unwrap_or_else(|| INDEX_DOCUMENT.to_string()),
            error_document: get("S3WEB_ERROR_DOCUMENT")
                .unwrap_or_else(|| ERROR_DOCUMENT.to_string()),
            label_poll_interval_secs,
            label_max_attempts,
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.sync_concurrency == 0 || self.sync_concurrency > MAX_SYNC_CONCURRENCY {
            return Err(anyhow::anyhow!(
                "S3WEB_SYNC_CONCURRENCY must be between 1 and {}",
                MAX_SYNC_CONCURRENCY
            ));
        }

        if self.label_poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("S3WEB_LABEL_POLL_INTERVAL_SECS must be at least 1"));
        }

        if self.label_max_attempts == 0 {
            return Err(anyhow::anyhow!("S3WEB_LABEL_MAX_ATTEMPTS must be at least 1"));
        }

        if self.index_document.trim().is_empty() || self.error_document.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "S3WEB_INDEX_DOCUMENT and S3WEB_ERROR_DOCUMENT must not be empty"
            ));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "S3WEB_LOCAL_STORAGE_PATH must be set when using local storage backend"
            ));
        }

        Ok(())
    }
}
