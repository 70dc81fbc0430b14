// ⚙️ Configuration - settings from the environment and logging setup

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::rules::OrderingScope;

pub const ENV_DATABASE: &str = "METER_READINGS_DB";
pub const ENV_ACCOUNTS_CSV: &str = "METER_READINGS_ACCOUNTS_CSV";
pub const ENV_ADDR: &str = "METER_READINGS_ADDR";
pub const ENV_CHECK_BATCH_ORDER: &str = "METER_READINGS_CHECK_BATCH_ORDER";

pub const DEFAULT_DATABASE: &str = "meter_readings.db";
pub const DEFAULT_ACCOUNTS_CSV: &str = "data/Test_Accounts.csv";
pub const DEFAULT_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub accounts_csv: PathBuf,
    pub listen_addr: String,
    pub ordering: OrderingScope,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            accounts_csv: PathBuf::from(DEFAULT_ACCOUNTS_CSV),
            listen_addr: DEFAULT_ADDR.to_string(),
            ordering: OrderingScope::StoredOnly,
        }
    }
}

impl Settings {
    /// Defaults overridden by `METER_READINGS_*` variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(path) = lookup(ENV_DATABASE) {
            settings.database_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_ACCOUNTS_CSV) {
            settings.accounts_csv = PathBuf::from(path);
        }
        if let Some(addr) = lookup(ENV_ADDR) {
            settings.listen_addr = addr;
        }
        if let Some(flag) = lookup(ENV_CHECK_BATCH_ORDER) {
            let enabled = parse_flag(&flag)
                .with_context(|| format!("{} must be true or false, got {:?}", ENV_CHECK_BATCH_ORDER, flag))?;
            if enabled {
                settings.ordering = OrderingScope::IncludeBatch;
            }
        }

        Ok(settings)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("unrecognised flag value {:?}", other),
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise this crate logs at `info`, or `debug`
/// when verbose.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("meter_readings={}", level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
