use super::config::MonitorConfig;
use super::stats::{QueryKind, QueryStats, StatsRecorder};
use super::{MAX_LOGGED_SQL_BYTES, truncate_sql_bytes};
use crate::client::GenericClient;
use crate::context::cancel_in_flight;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// A database client that wraps a `GenericClient` with logging, slow-query
/// warnings, a per-statement timeout and counters.
pub struct InstrumentedClient<C> {
    client: C,
    config: MonitorConfig,
    stats: Arc<StatsRecorder>,
}

impl<C: GenericClient> InstrumentedClient<C> {
    /// Wrap `client` with the default configuration.
    pub fn new(client: C) -> Self {
        Self {
            client,
            config: MonitorConfig::default(),
            stats: Arc::new(StatsRecorder::new()),
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Record into an existing recorder, e.g. one shared by several clients.
    pub fn with_stats(mut self, stats: Arc<StatsRecorder>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MonitorConfig {
        &mut self.config
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> QueryStats {
        self.stats.snapshot()
    }

    pub fn stats_recorder(&self) -> Arc<StatsRecorder> {
        Arc::clone(&self.stats)
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    async fn with_timeout<T, F>(&self, future: F) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        self.stats.record_timeout();
                        cancel_in_flight(self.client.cancel_token());
                        Err(OrmError::DeadlineExceeded(timeout))
                    }
                }
            }
            None => future.await,
        }
    }

    async fn observe<T, F>(&self, sql: &str, params: usize, future: F) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>> + Send,
    {
        let kind = QueryKind::from_sql(sql);
        let start = Instant::now();
        let result = self.with_timeout(future).await;
        let duration = start.elapsed();

        let slow = self
            .config
            .slow_query_threshold
            .is_some_and(|threshold| duration > threshold);
        self.stats.record(kind, duration, result.is_err(), slow);

        let logged = truncate_sql_bytes(sql, MAX_LOGGED_SQL_BYTES);
        match &result {
            Err(e) => {
                tracing::warn!(
                    target: "pgmap.monitor",
                    sql = logged,
                    ?duration,
                    error = %e,
                    "statement failed"
                )
            }
            Ok(_) if slow => {
                tracing::warn!(
                    target: "pgmap.monitor",
                    sql = logged,
                    params,
                    ?duration,
                    "slow statement"
                )
            }
            Ok(_) if self.config.logging_enabled => {
                tracing::debug!(
                    target: "pgmap.monitor",
                    sql = logged,
                    params,
                    ?duration,
                    "statement"
                )
            }
            Ok(_) => {}
        }
        result
    }
}

impl<C: GenericClient> GenericClient for InstrumentedClient<C> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.observe(sql, params.len(), self.client.query(sql, params))
            .await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.observe(sql, params.len(), self.client.execute(sql, params))
            .await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        self.client.cancel_token()
    }
}
