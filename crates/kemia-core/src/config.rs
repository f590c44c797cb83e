//! Configuration module
//!
//! Uploader configuration sourced from `KEMIA_*` environment variables with
//! development-friendly defaults. The bearer token is supplied by the caller's
//! session; when absent the client proceeds unauthenticated.

use std::env;
use std::path::PathBuf;

use crate::validation::UploadPolicy;

const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;
const DEFAULT_MIN_FILE_SIZE_BYTES: u64 = 1;
const DEFAULT_MAX_BATCH_SIZE: usize = 10;
const DEFAULT_UPLOAD_CONCURRENCY: usize = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Uploader configuration.
#[derive(Clone, Debug)]
pub struct UploaderConfig {
    pub api_url: String,
    /// Bearer token attached as `Authorization` when present.
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub max_file_size_bytes: u64,
    pub min_file_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    /// Maximum concurrent item count per batch session.
    pub max_batch_size: usize,
    /// Bound on parallel physical transfers when a batch is split per file.
    pub upload_concurrency: usize,
    /// When false, `submit` stages items and a separate start call dispatches.
    pub auto_start: bool,
    /// Spool directory for local preview files.
    pub preview_dir: PathBuf,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            api_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            min_file_size_bytes: DEFAULT_MIN_FILE_SIZE_BYTES,
            allowed_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "webp".to_string(),
            ],
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            auto_start: true,
            preview_dir: env::temp_dir().join("kemia-previews"),
        }
    }
}

impl UploaderConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let max_file_size_mb = env::var("KEMIA_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);

        let allowed_extensions = env::var("KEMIA_ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "jpg,jpeg,png,gif,webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let allowed_content_types = env::var("KEMIA_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| "image/jpeg,image/png,image/gif,image/webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let config = Self {
            api_url: env::var("KEMIA_API_URL")
                .or_else(|_| env::var("API_URL"))
                .unwrap_or(defaults.api_url),
            api_token: env::var("KEMIA_API_TOKEN").ok(),
            request_timeout_secs: env::var("KEMIA_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            min_file_size_bytes: env::var("KEMIA_MIN_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| DEFAULT_MIN_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MIN_FILE_SIZE_BYTES),
            allowed_extensions,
            allowed_content_types,
            max_batch_size: env::var("KEMIA_MAX_BATCH_SIZE")
                .unwrap_or_else(|_| DEFAULT_MAX_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_BATCH_SIZE),
            upload_concurrency: env::var("KEMIA_UPLOAD_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(DEFAULT_UPLOAD_CONCURRENCY),
            auto_start: env::var("KEMIA_AUTO_START")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            preview_dir: env::var("KEMIA_PREVIEW_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.preview_dir),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.api_url.trim().is_empty() {
            return Err(anyhow::anyhow!("KEMIA_API_URL must not be empty"));
        }
        if self.max_batch_size == 0 {
            return Err(anyhow::anyhow!("KEMIA_MAX_BATCH_SIZE must be at least 1"));
        }
        if self.upload_concurrency == 0 {
            return Err(anyhow::anyhow!(
                "KEMIA_UPLOAD_CONCURRENCY must be at least 1"
            ));
        }
        if self.min_file_size_bytes > self.max_file_size_bytes {
            return Err(anyhow::anyhow!(
                "KEMIA_MIN_FILE_SIZE_BYTES ({}) exceeds the maximum file size ({})",
                self.min_file_size_bytes,
                self.max_file_size_bytes
            ));
        }
        Ok(())
    }

    /// Derive the validation-gate policy from this configuration.
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_content_types: self.allowed_content_types.clone(),
            allowed_extensions: self.allowed_extensions.clone(),
            min_file_size_bytes: self.min_file_size_bytes,
            max_file_size_bytes: self.max_file_size_bytes,
            capacity: self.max_batch_size,
        }
    }
}
