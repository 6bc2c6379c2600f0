//! Transactional batch writer.
//!
//! Every remote write request is persisted in exactly one store transaction.
//! Rows are executed in series order, then sample order within a series.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::flatten::partition_labels;
use crate::metrics::{Observer, Outcome};
use crate::proto::WriteRequest;
use crate::store::{Store, Transaction};

/// Writes decoded requests to a store and reports each attempt.
pub struct BatchWriter {
    store: Arc<dyn Store>,
    observer: Arc<dyn Observer>,
    timeout: Option<Duration>,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn Store>, observer: Arc<dyn Observer>) -> Self {
        Self {
            store,
            observer,
            timeout: None,
        }
    }

    /// Bound the begin and row execution of each request.
    ///
    /// The commit runs outside the deadline and is always awaited to
    /// completion.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Persist every sample of `request` in a single transaction.
    ///
    /// A failed commit is not an error: it is logged and reported as
    /// [`Outcome::Failed`]. A failed row rolls the transaction back and is
    /// returned as [`Error::RowExecution`]. The transaction duration is
    /// observed once in every case.
    pub async fn write(&self, request: &WriteRequest) -> Result<Outcome> {
        let started = Instant::now();

        let result = self.transact(request).await;

        let outcome = match &result {
            Ok(outcome) => *outcome,
            Err(_) => Outcome::Failed,
        };
        self.observer.record_duration(
            self.store.destination(),
            outcome,
            started.elapsed().as_secs_f64(),
        );

        result
    }

    async fn transact(&self, request: &WriteRequest) -> Result<Outcome> {
        // an expired deadline drops the open transaction, which discards its rows
        let (tx, rows_written) = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.execute_rows(request))
                .await
                .unwrap_or(Err(Error::Timeout(timeout)))?,
            None => self.execute_rows(request).await?,
        };

        match tx.commit().await {
            Ok(()) => {
                tracing::debug!(rows_written, "Committed transaction");
                Ok(Outcome::Ok)
            }
            Err(e) => {
                tracing::error!(
                    destination = self.store.destination(),
                    "Transaction failed: {}",
                    e
                );
                Ok(Outcome::Failed)
            }
        }
    }

    /// Begin a transaction and execute one row per sample, returning the
    /// uncommitted transaction.
    async fn execute_rows(&self, request: &WriteRequest) -> Result<(Box<dyn Transaction>, usize)> {
        let mut tx = self.store.begin().await?;

        let mut rows_written = 0usize;
        for series in &request.timeseries {
            let flattened = partition_labels(&series.labels);
            self.observer.record_samples(series.samples.len() as u64);

            for row in flattened.rows(&series.samples) {
                if let Err(e) = tx.execute(&row).await {
                    tracing::error!(
                        metric = %row.metric,
                        rows_written,
                        "Row insert failed, rolling back: {}",
                        e
                    );
                    tx.rollback().await;
                    return Err(e);
                }
                rows_written += 1;
            }
        }

        Ok((tx, rows_written))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::model::Row;
    use crate::proto::{Label, Sample, TimeSeries};
    use crate::store::InMemoryStore;

    #[derive(Default)]
    struct RecordingObserver {
        samples: Mutex<Vec<u64>>,
        durations: Mutex<Vec<(String, Outcome)>>,
    }

    impl Observer for RecordingObserver {
        fn record_samples(&self, count: u64) {
            self.samples.lock().unwrap().push(count);
        }

        fn record_duration(&self, destination: &str, outcome: Outcome, _seconds: f64) {
            self.durations
                .lock()
                .unwrap()
                .push((destination.to_string(), outcome));
        }
    }

    fn setup() -> (BatchWriter, InMemoryStore, Arc<RecordingObserver>) {
        let store = InMemoryStore::new();
        let observer = Arc::new(RecordingObserver::default());
        let writer = BatchWriter::new(Arc::new(store.clone()), observer.clone());
        (writer, store, observer)
    }

    fn series(metric: &str, samples: &[(i64, f64)]) -> TimeSeries {
        TimeSeries {
            labels: vec![Label::new("__name__", metric), Label::new("job", "node")],
            samples: samples.iter().map(|(t, v)| Sample::new(*t, *v)).collect(),
        }
    }

    #[tokio::test]
    async fn should_write_one_row_per_sample() {
        // given
        let (writer, store, observer) = setup();
        let request = WriteRequest {
            timeseries: vec![
                series("a", &[(1000, 1.0), (2000, 2.0)]),
                series("b", &[]),
                series("c", &[(3000, 3.0), (4000, 4.0), (5000, 5.0)]),
            ],
        };

        // when
        let outcome = writer.write(&request).await.unwrap();

        // then
        assert_eq!(outcome, Outcome::Ok);
        let rows = store.committed_rows();
        assert_eq!(rows.len(), request.sample_count());
        let order: Vec<(&str, f64)> = rows.iter().map(|r| (r.metric.as_str(), r.value)).collect();
        assert_eq!(
            order,
            vec![("a", 1.0), ("a", 2.0), ("c", 3.0), ("c", 4.0), ("c", 5.0)]
        );
        assert_eq!(*observer.samples.lock().unwrap(), vec![2, 0, 3]);
        assert_eq!(store.transactions_begun(), 1);
    }

    #[tokio::test]
    async fn should_commit_empty_request() {
        // given
        let (writer, store, observer) = setup();

        // when
        let outcome = writer.write(&WriteRequest::default()).await.unwrap();

        // then
        assert_eq!(outcome, Outcome::Ok);
        assert!(store.committed_rows().is_empty());
        assert_eq!(store.transactions_begun(), 1);
        assert_eq!(
            *observer.durations.lock().unwrap(),
            vec![("memory".to_string(), Outcome::Ok)]
        );
    }

    #[tokio::test]
    async fn should_report_failed_commit_without_error() {
        // given
        let (writer, store, observer) = setup();
        store.fail_commits(true);
        let request = WriteRequest {
            timeseries: vec![series("up", &[(1000, 1.0)])],
        };

        // when
        let outcome = writer.write(&request).await.unwrap();

        // then
        assert_eq!(outcome, Outcome::Failed);
        assert!(store.committed_rows().is_empty());
        assert_eq!(
            *observer.durations.lock().unwrap(),
            vec![("memory".to_string(), Outcome::Failed)]
        );
    }

    #[tokio::test]
    async fn should_roll_back_on_row_failure() {
        // given
        let (writer, store, observer) = setup();
        store.fail_row_at(Some(1));
        let request = WriteRequest {
            timeseries: vec![series("up", &[(1000, 1.0), (2000, 2.0), (3000, 3.0)])],
        };

        // when
        let result = writer.write(&request).await;

        // then
        assert!(matches!(result, Err(Error::RowExecution(_))));
        assert!(store.committed_rows().is_empty());
        assert_eq!(store.transactions_rolled_back(), 1);
        // samples are counted before any row is written
        assert_eq!(*observer.samples.lock().unwrap(), vec![3]);
        assert_eq!(
            *observer.durations.lock().unwrap(),
            vec![("memory".to_string(), Outcome::Failed)]
        );
    }

    #[tokio::test]
    async fn should_duplicate_rows_when_request_is_resent() {
        // given
        let (writer, store, _observer) = setup();
        let request = WriteRequest {
            timeseries: vec![series("up", &[(1000, 1.0)])],
        };

        // when
        writer.write(&request).await.unwrap();
        writer.write(&request).await.unwrap();

        // then
        let rows = store.committed_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], rows[1]);
    }

    #[tokio::test]
    async fn should_record_failed_outcome_when_begin_fails() {
        // given
        let (writer, store, observer) = setup();
        store.fail_begins(true);
        let request = WriteRequest {
            timeseries: vec![series("up", &[(1000, 1.0)])],
        };

        // when
        let result = writer.write(&request).await;

        // then
        assert!(matches!(result, Err(Error::Store(_))));
        assert!(observer.samples.lock().unwrap().is_empty());
        assert_eq!(
            *observer.durations.lock().unwrap(),
            vec![("memory".to_string(), Outcome::Failed)]
        );
    }

    /// Stalls either row execution forever or the commit for a while.
    struct StalledStore {
        stall_commit: Option<Duration>,
    }

    struct StalledTransaction {
        stall_commit: Option<Duration>,
    }

    #[async_trait]
    impl Store for StalledStore {
        fn destination(&self) -> &str {
            "stalled"
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn begin(&self) -> Result<Box<dyn Transaction>> {
            Ok(Box::new(StalledTransaction {
                stall_commit: self.stall_commit,
            }))
        }
    }

    #[async_trait]
    impl Transaction for StalledTransaction {
        async fn execute(&mut self, _row: &Row<'_>) -> Result<()> {
            if self.stall_commit.is_some() {
                return Ok(());
            }
            std::future::pending::<Result<()>>().await
        }

        async fn commit(self: Box<Self>) -> Result<()> {
            if let Some(delay) = self.stall_commit {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        }

        async fn rollback(self: Box<Self>) {}
    }

    #[tokio::test(start_paused = true)]
    async fn should_time_out_stalled_store() {
        // given
        let observer = Arc::new(RecordingObserver::default());
        let store = StalledStore { stall_commit: None };
        let writer = BatchWriter::new(Arc::new(store), observer.clone())
            .with_timeout(Some(Duration::from_secs(1)));
        let request = WriteRequest {
            timeseries: vec![series("up", &[(1000, 1.0)])],
        };

        // when
        let result = writer.write(&request).await;

        // then
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(
            *observer.durations.lock().unwrap(),
            vec![("stalled".to_string(), Outcome::Failed)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_time_out_slow_commit() {
        // given
        let observer = Arc::new(RecordingObserver::default());
        let store = StalledStore {
            stall_commit: Some(Duration::from_secs(5)),
        };
        let writer = BatchWriter::new(Arc::new(store), observer.clone())
            .with_timeout(Some(Duration::from_secs(1)));
        let request = WriteRequest {
            timeseries: vec![series("up", &[(1000, 1.0)])],
        };

        // when
        let result = writer.write(&request).await;

        // then
        assert!(matches!(result, Ok(Outcome::Ok)));
        assert_eq!(
            *observer.durations.lock().unwrap(),
            vec![("stalled".to_string(), Outcome::Ok)]
        );
    }
}
