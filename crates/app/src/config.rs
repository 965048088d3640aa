//! Configuration

use std::path::PathBuf;

use clap::Args;

use crate::auth::Identity;

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Cart store settings.
#[derive(Debug, Args)]
pub struct StoreConfig {
    /// Directory carts are stored in
    #[arg(long, env = "TROLLEY_DATA_DIR", default_value = ".trolley")]
    pub data_dir: PathBuf,

    /// YAML product catalog
    #[arg(long, env = "TROLLEY_CATALOG", default_value = "fixtures/catalog.yaml")]
    pub catalog: PathBuf,

    /// Email of the signed-in user; omit to shop as a guest
    #[arg(long, env = "TROLLEY_USER")]
    pub user: Option<String>,
}

impl StoreConfig {
    /// Where the device-local guest cart lives.
    #[must_use]
    pub fn local_dir(&self) -> PathBuf {
        self.data_dir.join("local")
    }

    /// Where user carts live.
    #[must_use]
    pub fn remote_dir(&self) -> PathBuf {
        self.data_dir.join("remote")
    }

    /// The signed-in identity, if a user was given.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.user
            .as_deref()
            .filter(|email| !email.trim().is_empty())
            .map(Identity::from_email)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestConfig {
        #[command(flatten)]
        store: StoreConfig,

        #[command(flatten)]
        logging: LoggingConfig,
    }

    #[test]
    fn parses_store_and_logging_flags() -> TestResult {
        let config = TestConfig::try_parse_from([
            "trolley",
            "--data-dir",
            "/tmp/carts",
            "--catalog",
            "catalog.yaml",
            "--user",
            "Shopper@Example.com",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])?;

        assert_eq!(config.store.local_dir(), PathBuf::from("/tmp/carts/local"));
        assert_eq!(config.store.remote_dir(), PathBuf::from("/tmp/carts/remote"));
        assert_eq!(config.store.catalog, PathBuf::from("catalog.yaml"));
        assert_eq!(
            config.store.identity().map(|identity| identity.email),
            Some("shopper@example.com".to_string())
        );
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(config.logging.log_format, LogFormat::Json);

        Ok(())
    }

    #[test]
    fn blank_user_is_a_guest() {
        let config = StoreConfig {
            data_dir: PathBuf::from("."),
            catalog: PathBuf::from("catalog.yaml"),
            user: Some("  ".to_string()),
        };

        assert!(config.identity().is_none());
    }
}
