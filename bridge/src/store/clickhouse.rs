//! ClickHouse store backed by the HTTP interface.

use ::clickhouse::insert::Insert;
use ::clickhouse::{Client, Row as ClickHouseRow};
use async_trait::async_trait;
use serde::Serialize;

use super::{Store, Transaction};
use crate::config::ClickHouseConfig;
use crate::error::{Error, Result};
use crate::model::Row;

/// Row of the metrics table. `EventDate` is days since the epoch and
/// `EventDateTime` is seconds since the epoch.
///
/// ```sql
/// CREATE TABLE metrics (
///     EventDate Date,
///     EventDateTime DateTime,
///     Metric String,
///     Labels Nested(
///         Name String,
///         Value String
///     ),
///     Value Float64
/// ) ENGINE = MergeTree
/// PARTITION BY toYYYYMM(EventDate)
/// ORDER BY (Metric, EventDate)
/// ```
#[derive(Debug, ClickHouseRow, Serialize)]
struct MetricRow {
    #[serde(rename = "EventDate")]
    event_date: u16,
    #[serde(rename = "EventDateTime")]
    event_date_time: u32,
    #[serde(rename = "Metric")]
    metric: String,
    #[serde(rename = "Labels.Name")]
    label_names: Vec<String>,
    #[serde(rename = "Labels.Value")]
    label_values: Vec<String>,
    #[serde(rename = "Value")]
    value: f64,
}

impl TryFrom<&Row<'_>> for MetricRow {
    type Error = Error;

    fn try_from(row: &Row<'_>) -> Result<Self> {
        let event_date = u16::try_from(row.event_date()).map_err(|_| {
            Error::RowExecution(format!(
                "timestamp {}s is outside the Date column range",
                row.timestamp_secs
            ))
        })?;
        let event_date_time = u32::try_from(row.event_date_time()).map_err(|_| {
            Error::RowExecution(format!(
                "timestamp {}s is outside the DateTime column range",
                row.timestamp_secs
            ))
        })?;
        Ok(Self {
            event_date,
            event_date_time,
            metric: row.metric.to_string(),
            label_names: row.label_names.to_vec(),
            label_values: row.label_values.to_vec(),
            value: row.value,
        })
    }
}

/// Store writing rows into a ClickHouse table.
pub struct ClickHouseStore {
    client: Client,
    address: String,
    table: String,
}

impl ClickHouseStore {
    /// Build a client for the configured server. No connection is made until
    /// the first query.
    pub fn connect(config: &ClickHouseConfig) -> Result<Self> {
        if config.table.is_empty() {
            return Err(Error::InvalidConfig("table name must not be empty".into()));
        }

        let mut client = Client::default().with_url(&config.address);
        if let Some(database) = &config.database {
            client = client.with_database(database);
        }
        if let Some(user) = &config.user {
            client = client.with_user(user);
        }
        if let Some(password) = &config.password {
            client = client.with_password(password);
        }

        Ok(Self {
            client,
            address: config.address.clone(),
            table: config.table.clone(),
        })
    }
}

#[async_trait]
impl Store for ClickHouseStore {
    fn destination(&self) -> &str {
        &self.address
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .execute()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let insert = self.client.insert::<MetricRow>(&self.table)?;
        tracing::debug!(table = %self.table, "Prepared insert");
        Ok(Box::new(ClickHouseTransaction { insert }))
    }
}

/// A single INSERT statement streamed to the server.
///
/// Rows are sent as they are executed but only become visible once the
/// statement is finished on commit. Dropping the insert aborts it.
struct ClickHouseTransaction {
    insert: Insert<MetricRow>,
}

#[async_trait]
impl Transaction for ClickHouseTransaction {
    async fn execute(&mut self, row: &Row<'_>) -> Result<()> {
        let row = MetricRow::try_from(row)?;
        self.insert
            .write(&row)
            .await
            .map_err(|e| Error::RowExecution(e.to_string()))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.insert
            .end()
            .await
            .map_err(|e| Error::Commit(e.to_string()))
    }

    async fn rollback(self: Box<Self>) {
        drop(self.insert);
    }
}
