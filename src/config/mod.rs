//! Service settings for the HTTP listener, cache store and CO-OPS upstream.
//!
//! Layers, lowest first:
//!
//! - struct defaults
//! - `config/tideserver.toml`, or the file named by `TIDESERVER_CONFIG`
//! - `TIDESERVER__<SECTION>__<KEY>` variables, e.g. `TIDESERVER__STORAGE__PREFIX=tides/`
//!   or `TIDESERVER__UPSTREAM__TIMEOUT_SECS=60` (a `.env` file is read first)
//!
//! Store credentials are never read from the file; see [`StorageConfig`].
//!
//! ```no_run
//! use tideserver::config::Config;
//!
//! # fn main() -> Result<(), tideserver::config::ConfigError> {
//! let config = Config::load()?;
//! println!("cache bucket: {}", config.storage.bucket);
//! # Ok(())
//! # }
//! ```

mod models;
mod sources;
mod validation;

pub use models::{Config, ServerConfig, StorageConfig, StorageProvider, UpstreamConfig};
pub use validation::ValidationError;

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Resolve every layer, pick up store credentials and validate.
    pub fn load() -> Result<Self, ConfigError> {
        Self::validated(sources::load()?)
    }

    /// Like [`Config::load`] but with an explicit TOML file and no credential lookup.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::validated(sources::load_layers(path.as_ref())?)
    }

    fn validated(config: Self) -> Result<Self, ConfigError> {
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_s3_without_bucket_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tideserver.toml");
        fs::write(&path, "[storage]\nprovider = \"s3\"\nbucket = \"\"\n").unwrap();

        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::ValidationError(ValidationError::MissingBucket))
        ));
    }

    #[test]
    fn test_absolute_prefix_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tideserver.toml");
        fs::write(&path, "[storage]\nprefix = \"/tides\"\n").unwrap();

        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::ValidationError(ValidationError::AbsolutePrefix { .. }))
        ));
    }

    #[test]
    fn test_zero_upstream_timeout_means_unbounded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tideserver.toml");
        fs::write(&path, "[upstream]\ntimeout_secs = 0\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.upstream.timeout_secs, Some(0));
        assert_eq!(config.upstream.request_timeout(), None);
    }

    #[test]
    fn test_s3_deployment_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tideserver.toml");
        fs::write(
            &path,
            r#"
[server]
bind_addr = "127.0.0.1:8081"

[storage]
provider = "s3"
bucket = "tides-prod"
prefix = "v1/"
region = "us-west-2"
endpoint = "http://localhost:9000"

[upstream]
base_url = "http://localhost:8089/axis/services"
timeout_secs = 45
user_agent = "tideserver-staging"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:8081");
        assert_eq!(config.storage.provider, StorageProvider::S3);
        assert_eq!(config.storage.bucket, "tides-prod");
        assert_eq!(config.storage.prefix, "v1/");
        assert_eq!(config.storage.region.as_deref(), Some("us-west-2"));
        assert_eq!(config.storage.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.upstream.base_url, "http://localhost:8089/axis/services");
        assert_eq!(
            config.upstream.request_timeout(),
            Some(std::time::Duration::from_secs(45))
        );
        assert_eq!(config.upstream.user_agent, "tideserver-staging");
    }

    #[test]
    fn test_defaults_serialize_to_loadable_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tideserver.toml");
        fs::write(&path, toml::to_string(&Config::default()).unwrap()).unwrap();

        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.storage.bucket, Config::default().storage.bucket);
        assert_eq!(config.upstream.base_url, Config::default().upstream.base_url);
    }
}
