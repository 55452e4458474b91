use super::*;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use std::time::Duration;

/// Answers every statement after `delay`; fails statements containing "boom".
struct DelayedClient {
    delay: Duration,
}

impl GenericClient for DelayedClient {
    async fn query(&self, sql: &str, _params: &[Value]) -> OrmResult<Vec<Row>> {
        tokio::time::sleep(self.delay).await;
        if sql.contains("boom") {
            return Err(OrmError::Other("boom".into()));
        }
        Ok(vec![Row::from_pairs([("n", Value::Int(1))])])
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> OrmResult<u64> {
        tokio::time::sleep(self.delay).await;
        Ok(3)
    }
}

fn client(delay: Duration) -> InstrumentedClient<DelayedClient> {
    InstrumentedClient::new(DelayedClient { delay })
}

#[test]
fn query_kind_from_sql() {
    assert_eq!(QueryKind::from_sql("SELECT 1"), QueryKind::Select);
    assert_eq!(QueryKind::from_sql("  (select 1)"), QueryKind::Select);
    assert_eq!(
        QueryKind::from_sql("INSERT INTO t DEFAULT VALUES"),
        QueryKind::Insert
    );
    assert_eq!(QueryKind::from_sql("update t SET a = 1"), QueryKind::Update);
    assert_eq!(QueryKind::from_sql("DELETE FROM t"), QueryKind::Delete);
    assert_eq!(QueryKind::from_sql("BEGIN"), QueryKind::Other);
    assert_eq!(QueryKind::from_sql(""), QueryKind::Other);
}

#[test]
fn truncate_respects_char_boundaries() {
    assert_eq!(truncate_sql_bytes("abc", 10), "abc");
    assert_eq!(truncate_sql_bytes("abcdef", 3), "abc");
    // 'é' is two bytes; cutting inside it backs off.
    assert_eq!(truncate_sql_bytes("aé", 2), "a");
}

#[test]
fn config_builder() {
    let config = MonitorConfig::new()
        .with_query_timeout(Duration::from_secs(1))
        .with_slow_query_threshold(Duration::from_millis(5))
        .enable_logging();
    assert_eq!(config.query_timeout, Some(Duration::from_secs(1)));
    assert_eq!(config.slow_query_threshold, Some(Duration::from_millis(5)));
    assert!(config.logging_enabled);
    assert!(!config.disable_logging().logging_enabled);
}

#[tokio::test]
async fn counts_statements_by_kind() {
    let client = client(Duration::ZERO);
    client.query("SELECT n FROM t", &[]).await.unwrap();
    client.execute("UPDATE t SET n = 2", &[]).await.unwrap();
    client.execute("DELETE FROM t", &[]).await.unwrap();
    assert!(client.query("SELECT boom", &[]).await.is_err());

    let stats = client.stats();
    assert_eq!(stats.total_queries, 4);
    assert_eq!(stats.failed_queries, 1);
    assert_eq!(stats.select_count, 2);
    assert_eq!(stats.update_count, 1);
    assert_eq!(stats.delete_count, 1);
    assert_eq!(stats.insert_count, 0);

    client.stats_recorder().reset();
    assert_eq!(client.stats(), QueryStats::default());
}

#[tokio::test]
async fn timeout_fails_with_deadline_exceeded() {
    let client = client(Duration::from_secs(5))
        .with_config(MonitorConfig::new().with_query_timeout(Duration::from_millis(20)));

    let err = client.query("SELECT n FROM t", &[]).await.unwrap_err();
    assert!(matches!(err, OrmError::DeadlineExceeded(d) if d == Duration::from_millis(20)));

    let stats = client.stats();
    assert_eq!(stats.timed_out_queries, 1);
    assert_eq!(stats.failed_queries, 1);
}

#[tokio::test]
async fn slow_statements_are_counted() {
    let client = client(Duration::from_millis(20))
        .with_config(MonitorConfig::new().with_slow_query_threshold(Duration::from_millis(1)));

    assert_eq!(client.execute("UPDATE t SET n = 1", &[]).await.unwrap(), 3);
    assert_eq!(client.stats().slow_queries, 1);
    assert!(client.stats().max_duration >= Duration::from_millis(20));
}
