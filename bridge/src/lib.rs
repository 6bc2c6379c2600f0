//! ClickHouse Bridge - Prometheus remote write storage adapter.
//!
//! The bridge accepts remote write pushes over HTTP and stores every sample as
//! a row in a ClickHouse table.
//!
//! # Pipeline
//!
//! Each request runs through the same steps:
//!
//! 1. **Decode**: the body is snappy block-decompressed and decoded as a
//!    protobuf `WriteRequest`. Malformed bodies are rejected with `400`.
//! 2. **Flatten**: each series is split into its metric name (the `__name__`
//!    label) and parallel label name/value arrays; every sample becomes a row.
//! 3. **Write**: all rows of the request are inserted in one transaction using
//!    a single prepared insert.
//! 4. **Observe**: received samples are counted and the transaction duration is
//!    recorded with its destination and result.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge::{BatchWriter, InMemoryStore, Metrics};
//! use bridge::server::{AppState, router};
//!
//! let metrics = Arc::new(Metrics::new());
//! let writer = BatchWriter::new(Arc::new(InMemoryStore::new()), metrics.clone());
//! let app = router(AppState { writer: Arc::new(writer), metrics });
//! ```

mod config;
mod decode;
mod error;
mod flatten;
mod metrics;
mod model;
mod proto;
pub mod server;
mod store;
mod writer;

pub use config::{BridgeConfig, CliArgs, ClickHouseConfig, StoreConfig, load_config};
pub use decode::decode_write_request;
pub use error::{Error, Result};
pub use flatten::{FlattenedSeries, METRIC_NAME_LABEL, partition_labels};
pub use metrics::{Metrics, Observer, Outcome};
pub use model::{OwnedRow, Row, timestamp_secs};
pub use proto::{Label, Sample, TimeSeries, WriteRequest};
pub use store::{ClickHouseStore, InMemoryStore, Store, Transaction, create_store};
pub use writer::BatchWriter;
