use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

use roadwatch_application::{DEFAULT_PAGE_SIZE, SyncFailurePolicy};
use roadwatch_core::AppError;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSyncConfig {
    pub base_url: Url,
    pub max_attempts: u8,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub page_size: NonZeroUsize,
    pub cache_dir: Option<PathBuf>,
    pub remote_sync: Option<RemoteSyncConfig>,
    pub sync_failure_policy: SyncFailurePolicy,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_host = optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or("API_PORT", optional("API_PORT"), 3001_u16)?;
        let frontend_url =
            optional("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());

        let page_size = parse_or("PAGE_SIZE", optional("PAGE_SIZE"), DEFAULT_PAGE_SIZE)?;
        let page_size = NonZeroUsize::new(page_size)
            .ok_or_else(|| AppError::Validation("PAGE_SIZE must be greater than zero".to_owned()))?;

        let cache_dir = optional("CACHE_DIR").map(PathBuf::from);

        let remote_sync = optional("REMOTE_SYNC_URL")
            .map(|value| -> Result<RemoteSyncConfig, AppError> {
                let base_url = Url::parse(value.as_str()).map_err(|error| {
                    AppError::Validation(format!("invalid REMOTE_SYNC_URL: {error}"))
                })?;
                Ok(RemoteSyncConfig {
                    base_url,
                    max_attempts: parse_or(
                        "REMOTE_SYNC_MAX_ATTEMPTS",
                        optional("REMOTE_SYNC_MAX_ATTEMPTS"),
                        3_u8,
                    )?,
                    retry_backoff_ms: parse_or(
                        "REMOTE_SYNC_BACKOFF_MS",
                        optional("REMOTE_SYNC_BACKOFF_MS"),
                        200_u64,
                    )?,
                })
            })
            .transpose()?;

        let sync_failure_policy = match optional("SYNC_FAILURE_POLICY") {
            Some(value) => SyncFailurePolicy::parse_transport(value.as_str()).map_err(|_| {
                AppError::Validation(format!(
                    "SYNC_FAILURE_POLICY must be either 'rollback' or 'keep_local', got '{value}'"
                ))
            })?,
            None => SyncFailurePolicy::default(),
        };

        Ok(Self {
            api_host,
            api_port,
            frontend_url,
            page_size,
            cache_dir,
            remote_sync,
            sync_failure_policy,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use roadwatch_application::SyncFailurePolicy;

    use super::ApiConfig;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, roadwatch_core::AppError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = load(&[]).unwrap_or_else(|_| unreachable!());

        assert_eq!(config.api_host, "127.0.0.1");
        assert_eq!(config.api_port, 3001);
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert_eq!(config.page_size.get(), 8);
        assert!(config.cache_dir.is_none());
        assert!(config.remote_sync.is_none());
        assert_eq!(config.sync_failure_policy, SyncFailurePolicy::Rollback);
        assert_eq!(
            config.socket_address().map(|address| address.port()).ok(),
            Some(3001)
        );
    }

    #[test]
    fn remote_sync_reads_retry_settings() {
        let config = load(&[
            ("REMOTE_SYNC_URL", "http://backend.local/api"),
            ("REMOTE_SYNC_MAX_ATTEMPTS", "5"),
            ("SYNC_FAILURE_POLICY", "keep_local"),
            ("CACHE_DIR", "/var/lib/roadwatch"),
        ])
        .unwrap_or_else(|_| unreachable!());

        let remote_sync = config.remote_sync.unwrap_or_else(|| unreachable!());
        assert_eq!(remote_sync.base_url.as_str(), "http://backend.local/api");
        assert_eq!(remote_sync.max_attempts, 5);
        assert_eq!(remote_sync.retry_backoff_ms, 200);
        assert_eq!(config.sync_failure_policy, SyncFailurePolicy::KeepLocal);
        assert!(config.cache_dir.is_some());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(load(&[("API_PORT", "port")]).is_err());
        assert!(load(&[("PAGE_SIZE", "0")]).is_err());
        assert!(load(&[("REMOTE_SYNC_URL", "not a url")]).is_err());
        assert!(load(&[("SYNC_FAILURE_POLICY", "retry")]).is_err());
        assert!(
            load(&[("API_HOST", "localhost")])
                .and_then(|config| config.socket_address())
                .is_err()
        );
    }
}
