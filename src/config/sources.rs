use super::models::Config;
use config::{ConfigError, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "TIDESERVER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/tideserver.toml";
const ENV_PREFIX: &str = "TIDESERVER";

/// `TIDESERVER__UPSTREAM__TIMEOUT_SECS` -> `upstream.timeout_secs`
const ENV_NESTING: &str = "__";

/// Where the TOML layer is read from: `$TIDESERVER_CONFIG` or the default path.
pub fn config_file() -> PathBuf {
    env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Struct defaults, then the TOML file, then `.env` and process environment,
/// then storage credentials.
pub fn load() -> Result<Config, ConfigError> {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        tracing::warn!(error = %err, "Ignoring unreadable .env file");
    }

    let mut config = load_layers(&config_file())?;
    config.storage.access_key = credential("S3_ACCESS_KEY", "AWS_ACCESS_KEY_ID");
    config.storage.secret_key = credential("S3_SECRET_KEY", "AWS_SECRET_ACCESS_KEY");

    Ok(config)
}

/// Credentials come from the environment only; TOML values are skipped on deserialize.
fn credential(primary: &str, fallback: &str) -> Option<String> {
    env::var(primary).or_else(|_| env::var(fallback)).ok()
}

/// Merge the TOML file at `path` (when present) with `TIDESERVER__*` overrides.
pub fn load_layers(path: &Path) -> Result<Config, ConfigError> {
    if path.is_file() {
        tracing::info!(path = %path.display(), "Reading configuration file");
    } else {
        tracing::info!(path = %path.display(), "No configuration file; using defaults");
    }

    config::Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_NESTING)
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
