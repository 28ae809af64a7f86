use super::models::{Config, StorageProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Storage provider is S3 but no bucket is configured")]
    MissingBucket,

    #[error("Storage prefix must not begin with '/': {prefix}")]
    AbsolutePrefix { prefix: String },

    #[error("Invalid upstream base URL '{url}', expected 'http://' or 'https://'")]
    InvalidUpstreamScheme { url: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_storage(config)?;
    validate_upstream(config)?;
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.provider == StorageProvider::S3 && config.storage.bucket.trim().is_empty() {
        return Err(ValidationError::MissingBucket);
    }

    if config.storage.prefix.starts_with('/') {
        return Err(ValidationError::AbsolutePrefix {
            prefix: config.storage.prefix.clone(),
        });
    }

    Ok(())
}

fn validate_upstream(config: &Config) -> Result<(), ValidationError> {
    let url = &config.upstream.base_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ValidationError::InvalidUpstreamScheme { url: url.clone() });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_absolute_prefix_rejected() {
        let mut config = Config::default();
        config.storage.prefix = "/cache".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::AbsolutePrefix { .. })
        ));
    }

    #[test]
    fn test_upstream_scheme() {
        let mut config = Config::default();
        config.upstream.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidUpstreamScheme { .. })
        ));
    }

    #[test]
    fn test_memory_provider_ignores_bucket() {
        let mut config = Config::default();
        config.storage.bucket = String::new();
        assert!(validate(&config).is_ok());
    }
}
