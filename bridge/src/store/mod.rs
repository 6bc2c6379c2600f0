//! Store abstraction for persisting rows.
//!
//! A [`Store`] is shared by every request handler. Each request begins its own
//! [`Transaction`], which holds one prepared insert that is executed once per
//! row and then committed or rolled back.

mod clickhouse;
mod in_memory;

use std::sync::Arc;

use async_trait::async_trait;

pub use self::clickhouse::ClickHouseStore;
pub use self::in_memory::InMemoryStore;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::model::Row;

/// Connection to the backing analytical store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Address used to label metrics for this store.
    fn destination(&self) -> &str;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Begin a transaction with the row insert prepared.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// A single request's unit of work.
///
/// Dropping a transaction without committing discards its rows.
#[async_trait]
pub trait Transaction: Send {
    /// Execute the prepared insert with one row's parameters.
    async fn execute(&mut self, row: &Row<'_>) -> Result<()>;

    /// Make every executed row visible.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every executed row.
    async fn rollback(self: Box<Self>);
}

/// Create a store from configuration.
///
/// ClickHouse stores are pinged before being returned, so an unreachable
/// server surfaces here as [`Error::Connection`](crate::Error::Connection).
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config {
        StoreConfig::InMemory => Arc::new(InMemoryStore::new()),
        StoreConfig::ClickHouse(ch) => Arc::new(ClickHouseStore::connect(ch)?),
    };
    store
        .ping()
        .await
        .map_err(|e| crate::Error::Connection(e.to_string()))?;
    Ok(store)
}
