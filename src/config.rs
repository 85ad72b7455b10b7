use crate::models::upload::UploadRules;
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_API_URL: &str = "https://storage.univpancasila.ac.id";
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "/api/v1/storage/upload";
pub const DEFAULT_DELETE_ENDPOINT: &str = "/api/v1/storage/delete";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/storage_up.db";
const DEFAULT_ALLOWED_EXTENSIONS: [&str; 13] = [
    "jpg", "jpeg", "png", "gif", "pdf", "doc", "docx", "xls", "xlsx", "txt", "csv", "zip", "rar",
];

/// Settings shared by every storage session.
/// Read once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct StorageUpConfig {
    pub api_url: String,
    pub default_api_key: Option<String>,
    pub upload_endpoint: String,
    pub delete_endpoint: String,
    pub upload_attempts: u32,
    pub delete_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_file_size_kb: u64,
    pub allowed_extensions: Vec<String>,
    pub database_url: String,
}

impl Default for StorageUpConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            default_api_key: None,
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.into(),
            delete_endpoint: DEFAULT_DELETE_ENDPOINT.into(),
            upload_attempts: 3,
            delete_attempts: 10,
            retry_delay_ms: 0,
            request_timeout_secs: 30,
            max_file_size_kb: 10240,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            database_url: DEFAULT_DATABASE_URL.into(),
        }
    }
}

impl StorageUpConfig {
    /// Load from `STORAGE_UP_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            api_url: var("STORAGE_UP_API_URL").unwrap_or(defaults.api_url),
            default_api_key: var("STORAGE_UP_API_KEY"),
            upload_endpoint: var("STORAGE_UP_UPLOAD_ENDPOINT").unwrap_or(defaults.upload_endpoint),
            delete_endpoint: var("STORAGE_UP_DELETE_ENDPOINT").unwrap_or(defaults.delete_endpoint),
            upload_attempts: parse_var(&var, "STORAGE_UP_RETRY_UPLOAD")?
                .unwrap_or(defaults.upload_attempts),
            delete_attempts: parse_var(&var, "STORAGE_UP_RETRY_DELETE")?
                .unwrap_or(defaults.delete_attempts),
            retry_delay_ms: parse_var(&var, "STORAGE_UP_RETRY_DELAY_MS")?
                .unwrap_or(defaults.retry_delay_ms),
            request_timeout_secs: parse_var(&var, "STORAGE_UP_REQUEST_TIMEOUT")?
                .unwrap_or(defaults.request_timeout_secs),
            max_file_size_kb: parse_var(&var, "STORAGE_UP_MAX_SIZE")?
                .unwrap_or(defaults.max_file_size_kb),
            allowed_extensions: var("STORAGE_UP_ALLOWED_EXTENSIONS")
                .map(|raw| split_extensions(&raw))
                .unwrap_or(defaults.allowed_extensions),
            database_url: var("STORAGE_UP_DATABASE_URL").unwrap_or(defaults.database_url),
        })
    }

    /// Parse environment variables + CLI args into config and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let env_cfg = Self::from_env()?;
        let migrate = args.migrate;
        Ok((args.merge_into(env_cfg), migrate))
    }

    pub fn upload_rules(&self) -> UploadRules {
        UploadRules {
            max_size_kb: self.max_file_size_kb,
            allowed_extensions: self.allowed_extensions.clone(),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Command-line overrides for the maintenance binary.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Metadata maintenance for remotely stored files")]
pub struct Args {
    /// Storage service base URL (overrides STORAGE_UP_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Database URL (overrides STORAGE_UP_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Request timeout in seconds (overrides STORAGE_UP_REQUEST_TIMEOUT)
    #[arg(long)]
    pub request_timeout: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl Args {
    fn merge_into(self, cfg: StorageUpConfig) -> StorageUpConfig {
        StorageUpConfig {
            api_url: self.api_url.unwrap_or(cfg.api_url),
            database_url: self.database_url.unwrap_or(cfg.database_url),
            request_timeout_secs: self.request_timeout.unwrap_or(cfg.request_timeout_secs),
            ..cfg
        }
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, value))
        })
        .transpose()
}

fn split_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
