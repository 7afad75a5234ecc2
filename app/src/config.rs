use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::*;
use serde::{Deserialize, Serialize};
use url::Url;

use infra::persistence::{FileStore, MemoryStore, PgStore, Storage};

const ENV_PREFIX: &str = "COSTBOOK_";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub namespace: String,
    pub currency: String,
    pub store: StoreConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    File {
        path: PathBuf,
    },
    Postgres {
        url: String,
        #[serde(default = "default_pool_size")]
        pool_size: u32,
    },
}

/// Settings that may be supplied through `COSTBOOK_*` environment variables.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct EnvOverrides {
    pub namespace: Option<String>,
    pub store_path: Option<PathBuf>,
    pub postgres_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct EnvLogger {
    level: Option<LogLevel>,
    modules: HashMap<String, LogLevel>,
    timestamp_nanos: bool,
}

fn default_pool_size() -> u32 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: "cost-tracking".to_string(),
            currency: "Rp".to_string(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: PathBuf::from("costbook.json"),
        }
    }
}

impl Config {
    pub fn from_toml(src: &str) -> Result<Self> {
        let config = toml::from_str(src).context("parse config")?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        let overrides = envy::prefixed(ENV_PREFIX)
            .from_env::<EnvOverrides>()
            .context("read environment overrides")?;
        self.apply(overrides);
        Ok(())
    }

    /// A postgres URL wins over a store path when both are given.
    pub fn apply(&mut self, overrides: EnvOverrides) {
        let EnvOverrides {
            namespace,
            store_path,
            postgres_url,
        } = overrides;
        if let Some(namespace) = namespace {
            debug!("Namespace from environment: {}", namespace);
            self.namespace = namespace;
        }
        if let Some(path) = store_path {
            debug!("Store path from environment: {:?}", path);
            self.store = StoreConfig::File { path };
        }
        if let Some(url) = postgres_url {
            debug!("Postgres URL from environment: {}", redacted(&url));
            let pool_size = match self.store {
                StoreConfig::Postgres { pool_size, .. } => pool_size,
                _ => default_pool_size(),
            };
            self.store = StoreConfig::Postgres { url, pool_size };
        }
    }
}

impl StoreConfig {
    pub fn build(&self) -> Result<Box<dyn Storage>> {
        debug!("Build store from {:?}", self.describe());
        let storage: Box<dyn Storage> = match self {
            StoreConfig::Memory => {
                warn!("Using an in-memory store; nothing will be kept");
                Box::new(MemoryStore::new())
            }
            StoreConfig::File { path } => Box::new(FileStore::new(path)),
            StoreConfig::Postgres { url, pool_size } => {
                check_postgres_url(url)?;
                Box::new(PgStore::connect(url, *pool_size)?)
            }
        };
        Ok(storage)
    }

    pub fn describe(&self) -> String {
        match self {
            StoreConfig::Memory => "memory".to_string(),
            StoreConfig::File { path } => format!("file {}", path.display()),
            StoreConfig::Postgres { url, pool_size } => {
                format!("postgres {} (pool of {})", redacted(url), pool_size)
            }
        }
    }
}

fn check_postgres_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).with_context(|| format!("parse {}", redacted(url)))?;
    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(parsed),
        other => bail!("unsupported database scheme {:?}", other),
    }
}

fn redacted(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable url>".to_string(),
    }
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl EnvLogger {
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        b
    }
}
