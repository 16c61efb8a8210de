use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::RepositoryConfig;
use crate::error::{ClientError, ClientResult};

/// Installs the global compact fmt subscriber filtered by `log_filter`.
///
/// Returns `Ok(false)` when a global subscriber is already installed.
pub fn init_logging(config: &RepositoryConfig) -> ClientResult<bool> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|e| ClientError::Config(format!("invalid log filter '{}': {e}", config.log_filter)))?;
    Ok(FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok())
}
