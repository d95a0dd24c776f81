//! Process configuration from environment variables
//!
//! A `.env` file in the working directory is loaded first when present,
//! matching how the bot is run in development. Only `BOT_TOKEN` is
//! required; everything else has a default.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration errors surfaced at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-gateway credential; never logged
    pub bot_token: String,
    /// Port the monitoring dashboard listens on
    pub dashboard_port: u16,
    /// Directory the record files live in
    pub data_dir: PathBuf,
    /// How long shutdown waits for the final flush
    pub shutdown_grace: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is the normal production case
        let _ = dotenvy::dotenv();

        let bot_token =
            std::env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingVar("BOT_TOKEN"))?;

        let dashboard_port = match std::env::var("DASHBOARD_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DASHBOARD_PORT", raw))?,
            Err(_) => 8080,
        };

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let shutdown_grace = match std::env::var("SHUTDOWN_GRACE_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("SHUTDOWN_GRACE_SECS", raw))?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(5),
        };

        Ok(Self {
            bot_token,
            dashboard_port,
            data_dir,
            shutdown_grace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state, so everything runs in one test
    #[test]
    fn test_from_env_defaults_and_overrides() {
        std::env::remove_var("BOT_TOKEN");
        std::env::remove_var("DASHBOARD_PORT");
        std::env::remove_var("DATA_DIR");
        std::env::remove_var("SHUTDOWN_GRACE_SECS");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar("BOT_TOKEN"))
        ));

        std::env::set_var("BOT_TOKEN", "secret");
        let config = Config::from_env().unwrap();
        assert_eq!(config.dashboard_port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));

        std::env::set_var("DASHBOARD_PORT", "9000");
        std::env::set_var("DATA_DIR", "/var/lib/bot");
        std::env::set_var("SHUTDOWN_GRACE_SECS", "9");
        let config = Config::from_env().unwrap();
        assert_eq!(config.dashboard_port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/bot"));
        assert_eq!(config.shutdown_grace, Duration::from_secs(9));

        std::env::set_var("DASHBOARD_PORT", "not-a-port");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue("DASHBOARD_PORT", _))
        ));

        std::env::remove_var("BOT_TOKEN");
        std::env::remove_var("DASHBOARD_PORT");
        std::env::remove_var("DATA_DIR");
        std::env::remove_var("SHUTDOWN_GRACE_SECS");
    }
}
