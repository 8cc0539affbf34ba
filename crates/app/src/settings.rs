//! Settings for the `spendwise` binary.
//!
//! Read from a TOML file (`config/spendwise.toml` unless `--config` says
//! otherwise), then overridden by `SPENDWISE_*` environment variables using
//! `__` between nested keys, e.g. `SPENDWISE_AUTH__JWT_SECRET`.
//!
//! A service whose section is missing is not started.

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/spendwise.toml";

#[derive(Debug, Parser)]
#[command(name = "spendwise", about = "Personal finance services")]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    server::DEFAULT_TOKEN_TTL_HOURS
}

/// Where one service listens and which database it owns.
#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

impl Service {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind.as_deref().unwrap_or("127.0.0.1"), self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct Users {
    #[serde(flatten)]
    pub service: Service,
    /// bcrypt cost; lower it only for local experiments.
    pub password_cost: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Transactions {
    #[serde(flatten)]
    pub service: Service,
    pub budget_service_url: String,
    #[serde(default = "default_reconcile_timeout_secs")]
    pub reconcile_timeout_secs: u64,
}

fn default_reconcile_timeout_secs() -> u64 {
    server::DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub auth: Auth,
    pub users: Option<Users>,
    pub transactions: Option<Transactions>,
    pub budgets: Option<Service>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();
        let path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

        Self::load(path)
    }

    fn load(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SPENDWISE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
