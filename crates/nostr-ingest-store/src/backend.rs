//! Closed set of storage backends selected by configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;

use nostr_ingest_core::{Event, EventId, PublicKey, ReplacementKey};

use crate::error::{Result, StoreError};
use crate::memory::MemoryStore;
use crate::pool::PoolSettings;
use crate::sqlite::SqliteStore;
use crate::traits::{AuthorList, InsertResult, ReplaceResult, Store, StoreStats};

/// Backend driver names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Driver {
    #[serde(rename = "sqlite3", alias = "sqlite")]
    Sqlite3,
    #[serde(rename = "memory")]
    Memory,
}

impl FromStr for Driver {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite3" | "sqlite" => Ok(Driver::Sqlite3),
            "memory" => Ok(Driver::Memory),
            other => Err(StoreError::UnsupportedDriver(other.to_owned())),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Sqlite3 => f.write_str("sqlite3"),
            Driver::Memory => f.write_str("memory"),
        }
    }
}

/// The `[database]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_driver")]
    pub driver: Driver,

    #[serde(default = "default_path")]
    pub path: PathBuf,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

fn default_driver() -> Driver {
    Driver::Sqlite3
}

fn default_path() -> PathBuf {
    PathBuf::from("nostr-relay.sqlite")
}

fn default_busy_timeout_ms() -> u64 {
    PoolSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    PoolSettings::default().max_size
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            path: default_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl StoreConfig {
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            max_size: self.pool_max_size,
        }
    }
}

/// One of the supported storage engines behind the [`Store`] interface.
pub enum Backend {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl Backend {
    /// Open the configured backend, running migrations where applicable.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let backend = match config.driver {
            Driver::Sqlite3 => {
                Backend::Sqlite(SqliteStore::open(&config.path, config.pool_settings())?)
            }
            Driver::Memory => Backend::Memory(MemoryStore::new()),
        };
        tracing::info!(driver = %config.driver, path = %config.path.display(), "opened store");
        Ok(backend)
    }

    pub fn driver(&self) -> Driver {
        match self {
            Backend::Sqlite(_) => Driver::Sqlite3,
            Backend::Memory(_) => Driver::Memory,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Backend::Sqlite($store) => $call,
            Backend::Memory($store) => $call,
        }
    };
}

#[async_trait]
impl Store for Backend {
    async fn insert_event(&self, event: &Event) -> Result<InsertResult> {
        dispatch!(self, s => s.insert_event(event).await)
    }

    async fn replace_event(&self, event: &Event, key: &ReplacementKey) -> Result<ReplaceResult> {
        dispatch!(self, s => s.replace_event(event, key).await)
    }

    async fn delete_event(&self, id: &EventId) -> Result<bool> {
        dispatch!(self, s => s.delete_event(id).await)
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        dispatch!(self, s => s.get_event(id).await)
    }

    async fn count_events(&self) -> Result<u64> {
        dispatch!(self, s => s.count_events().await)
    }

    async fn query_by_author_and_kind(&self, author: &PublicKey, kind: u32) -> Result<Vec<Event>> {
        dispatch!(self, s => s.query_by_author_and_kind(author, kind).await)
    }

    async fn query_by_author_kind_and_tag(
        &self,
        author: &PublicKey,
        kind: u32,
        tag_name: &str,
        tag_value: &str,
    ) -> Result<Vec<Event>> {
        dispatch!(self, s => s.query_by_author_kind_and_tag(author, kind, tag_name, tag_value).await)
    }

    async fn load_author_list(&self, list: AuthorList) -> Result<Vec<PublicKey>> {
        dispatch!(self, s => s.load_author_list(list).await)
    }

    async fn add_author(&self, list: AuthorList, author: &PublicKey) -> Result<()> {
        dispatch!(self, s => s.add_author(list, author).await)
    }

    async fn remove_author(&self, list: AuthorList, author: &PublicKey) -> Result<bool> {
        dispatch!(self, s => s.remove_author(list, author).await)
    }

    fn stats(&self) -> StoreStats {
        dispatch!(self, s => s.stats())
    }
}
