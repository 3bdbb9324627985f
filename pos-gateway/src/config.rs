//! Gateway configuration

use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub ledger: LedgerStorageConfig,
    pub terminal: TerminalConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LedgerStorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TerminalConfig {
    pub host: String,
    pub port: u16,
    /// Terminal id stamped on every attempt
    pub terminal_id: String,
    /// Deadline for one request/response exchange
    pub timeout_secs: u64,
}

impl TerminalConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DispatchConfig {
    /// Token-bucket rate for the dispatch path; 0 disables limiting
    pub rate_limit_per_minute: u32,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            // Start with default configuration
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8085)?
            .set_default("server.workers", 4)?
            .set_default("ledger.data_dir", "./data/payment-ledger")?
            .set_default("terminal.host", "127.0.0.1")?
            .set_default("terminal.port", 10009)?
            .set_default("terminal.terminal_id", "term-1")?
            .set_default("terminal.timeout_secs", 120)?
            .set_default("dispatch.rate_limit_per_minute", 60)?;

        // Add environment-specific config file if it exists
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        } else {
            builder = builder
                .add_source(File::with_name(&format!("config/{environment}")).required(false));
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("POS_GATEWAY")
                .separator("__")
                .list_separator(","),
        );

        // Special handling for common env vars
        if let Ok(dir) = env::var("PAYMENT_LEDGER_DATA_DIR") {
            builder = builder.set_override("ledger.data_dir", dir)?;
        }
        if let Ok(host) = env::var("TERMINAL_HOST") {
            builder = builder.set_override("terminal.host", host)?;
        }
        if let Ok(port) = env::var("TERMINAL_PORT") {
            builder = builder.set_override("terminal.port", port)?;
        }
        if let Ok(port) = env::var("POS_GATEWAY_PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server port cannot be 0".to_string());
        }
        if self.terminal.host.is_empty() {
            return Err("terminal host is required".to_string());
        }
        if self.terminal.timeout_secs == 0 {
            return Err("terminal timeout cannot be 0".to_string());
        }
        Ok(())
    }
}
