use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_CLUSTER_NAME: &str = "dev";
pub const DEFAULT_PREFIX: &str = "vuln";
pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cluster_name: String,
    /// Key prefix for object-store writes; `<prefix>/<cluster>/...`.
    pub prefix: String,
    pub page_size: u32,
    pub sync_interval: Duration,
    pub snapshots_enabled: bool,
    pub object_store: Option<ObjectStoreConfig>,
    pub fs_output_dir: Option<PathBuf>,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    /// Endpoint override for S3-compatible stores.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: Option<String>,
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cluster_name = var("CLUSTER_NAME").unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string());
        let prefix = var("S3_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let region = var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());

        let object_store = var("S3_BUCKET").map(|bucket| ObjectStoreConfig {
            bucket,
            region,
            endpoint: var("S3_ENDPOINT"),
        });
        let fs_output_dir = var("FS_OUTPUT_DIR").map(PathBuf::from);

        if object_store.is_none() && fs_output_dir.is_none() {
            return Err(crate::Error::Config(
                "Either S3_BUCKET or FS_OUTPUT_DIR environment variable is required".to_string(),
            ));
        }

        if cluster_name.contains('/') {
            return Err(crate::Error::Config(format!(
                "CLUSTER_NAME must not contain '/': {cluster_name}"
            )));
        }

        let config = Config {
            cluster_name,
            prefix: prefix.trim_matches('/').to_string(),
            page_size: var("PAGE_SIZE")
                .map(|raw| parse_page_size(&raw))
                .unwrap_or(DEFAULT_PAGE_SIZE),
            sync_interval: var("SYNC_INTERVAL")
                .map(|raw| parse_interval(&raw))
                .unwrap_or(DEFAULT_SYNC_INTERVAL),
            snapshots_enabled: var("SNAPSHOTS_ENABLED")
                .map(|raw| parse_bool(&raw))
                .unwrap_or(false),
            object_store,
            fs_output_dir,
            server: ServerConfig {
                addr: var("METRICS_ADDR"),
            },
        };

        Ok(config)
    }
}

fn parse_page_size(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(size) if size > 0 => size,
        _ => {
            warn!(value = raw, "Invalid PAGE_SIZE, using default {}", DEFAULT_PAGE_SIZE);
            DEFAULT_PAGE_SIZE
        }
    }
}

fn parse_interval(raw: &str) -> Duration {
    match humantime::parse_duration(raw.trim()) {
        Ok(interval) if !interval.is_zero() => interval,
        _ => {
            warn!(value = raw, "Invalid SYNC_INTERVAL, using default 5m");
            DEFAULT_SYNC_INTERVAL
        }
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
