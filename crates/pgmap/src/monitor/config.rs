use std::time::Duration;

/// Configuration for statement monitoring and timeouts.
///
/// The default enforces no timeout, never reports slow statements and keeps
/// per-statement logging off. Counters are always kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Per-statement timeout. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Statements running longer than this are logged at `warn`.
    pub slow_query_threshold: Option<Duration>,
    /// Log every statement with its duration at `debug`.
    pub logging_enabled: bool,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements exceeding `timeout` are cancelled and fail with
    /// `DeadlineExceeded`.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn enable_logging(mut self) -> Self {
        self.logging_enabled = true;
        self
    }

    pub fn disable_logging(mut self) -> Self {
        self.logging_enabled = false;
        self
    }
}
