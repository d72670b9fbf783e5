//! CLI argument parsing.
//!
//! Broker options can also be given through `MQ_*` environment variables.
//! A flag wins over its variable; both win over the config file.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{ConfigError, ExporterConfig, parse_verify_ssl};

/// Export RabbitMQ queue statistics as Prometheus metrics.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "rabbitmq-exporter")]
#[command(about = "Export RabbitMQ queue statistics as Prometheus metrics")]
#[command(version)]
pub struct ExporterArgs {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// RabbitMQ endpoint (amqp:// or http(s)://, with or without credentials).
    #[arg(long, env = "MQ_URL", hide_env_values = true)]
    pub url: Option<String>,

    /// RabbitMQ username.
    #[arg(long, env = "MQ_USER")]
    pub user: Option<String>,

    /// RabbitMQ password.
    #[arg(long, env = "MQ_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Management API timeout in seconds.
    #[arg(long, env = "MQ_TIMEOUT")]
    pub timeout: Option<f64>,

    /// Verify the broker's TLS certificate (true or false).
    #[arg(
        long,
        env = "MQ_VERIFY_SSL",
        value_parser = parse_verify_ssl,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub verify_ssl: Option<bool>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    pub listen: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ExporterArgs {
    /// Build the effective configuration: config file (if any), then
    /// command-line and environment overrides, then validation.
    pub fn load_config(&self) -> Result<ExporterConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::read_file(path)?,
            None => ExporterConfig::default(),
        };

        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overlay the arguments that were given onto `config`.
    pub fn apply(&self, config: &mut ExporterConfig) {
        if let Some(url) = &self.url {
            config.broker.url = url.clone();
        }
        if let Some(user) = &self.user {
            config.broker.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.broker.password = password.clone();
        }
        if let Some(timeout) = self.timeout {
            config.broker.timeout_secs = timeout;
        }
        if let Some(verify_ssl) = self.verify_ssl {
            config.broker.verify_ssl = verify_ssl;
        }
        if let Some(listen) = &self.listen {
            config.http.listen = listen.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}
