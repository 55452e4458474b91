use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Statement kind, detected from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl QueryKind {
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        let keyword = trimmed
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default();
        if keyword.eq_ignore_ascii_case("SELECT") {
            QueryKind::Select
        } else if keyword.eq_ignore_ascii_case("INSERT") {
            QueryKind::Insert
        } else if keyword.eq_ignore_ascii_case("UPDATE") {
            QueryKind::Update
        } else if keyword.eq_ignore_ascii_case("DELETE") {
            QueryKind::Delete
        } else {
            QueryKind::Other
        }
    }
}

/// Snapshot of collected statement statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub slow_queries: u64,
    pub timed_out_queries: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
}

/// Lock-free statement counters shared by clones of an instrumented client.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    total_queries: AtomicU64,
    failed_queries: AtomicU64,
    slow_queries: AtomicU64,
    timed_out_queries: AtomicU64,
    total_duration_nanos: AtomicU64,
    max_duration_nanos: AtomicU64,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, kind: QueryKind, duration: Duration, failed: bool, slow: bool) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);

        self.total_queries.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }
        if slow {
            self.slow_queries.fetch_add(1, Ordering::Relaxed);
        }
        let prev = self.total_duration_nanos.fetch_add(nanos, Ordering::Relaxed);
        if prev.checked_add(nanos).is_none() {
            self.total_duration_nanos.store(u64::MAX, Ordering::Relaxed);
        }
        self.max_duration_nanos.fetch_max(nanos, Ordering::Relaxed);

        let counter = match kind {
            QueryKind::Select => &self.select_count,
            QueryKind::Insert => &self.insert_count,
            QueryKind::Update => &self.update_count,
            QueryKind::Delete => &self.delete_count,
            QueryKind::Other => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.timed_out_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QueryStats {
        QueryStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            slow_queries: self.slow_queries.load(Ordering::Relaxed),
            timed_out_queries: self.timed_out_queries.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total_queries,
            &self.failed_queries,
            &self.slow_queries,
            &self.timed_out_queries,
            &self.total_duration_nanos,
            &self.max_duration_nanos,
            &self.select_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
