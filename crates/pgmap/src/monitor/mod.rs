//! Statement monitoring and timeouts.
//!
//! [`InstrumentedClient`] wraps any [`GenericClient`](crate::GenericClient)
//! and, for every statement, logs it through `tracing`, warns when it runs
//! longer than the slow-query threshold, enforces a per-statement timeout
//! and updates [`QueryStats`] counters.
//!
//! # Example
//!
//! ```rust,ignore
//! use pgmap::monitor::{InstrumentedClient, MonitorConfig};
//! use std::time::Duration;
//!
//! let config = MonitorConfig::new()
//!     .with_query_timeout(Duration::from_secs(30))
//!     .with_slow_query_threshold(Duration::from_millis(200))
//!     .enable_logging();
//!
//! let client = InstrumentedClient::new(db_client).with_config(config);
//! let books = books_mapper.query().all(&ctx, &client).await?;
//! println!("{:?}", client.stats());
//! ```

mod config;
mod instrumented;
mod stats;

#[cfg(test)]
mod tests;

pub use config::MonitorConfig;
pub use instrumented::InstrumentedClient;
pub use stats::{QueryKind, QueryStats, StatsRecorder};

/// Longest SQL prefix written to logs.
const MAX_LOGGED_SQL_BYTES: usize = 512;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
