//! Cancellation and deadlines for store operations.
//!
//! Every mapper and query operation takes a [`Context`]. The round trip races
//! against the context's cancellation token and deadline; whichever fires
//! first drops the in-flight future, asks the server to cancel the statement
//! and returns [`OrmError::Cancelled`] or [`OrmError::DeadlineExceeded`].
//!
//! ```ignore
//! use pgmap::Context;
//! use std::time::Duration;
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(2));
//! let books = mapper.query().all(&ctx, &client).await?;
//! ```

use crate::error::{OrmError, OrmResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation token plus optional deadline carried by every operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Set the deadline to `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Derive a context that is cancelled with this one but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Fail fast when the context is already done.
    pub fn check(&self) -> OrmResult<()> {
        if self.token.is_cancelled() {
            return Err(OrmError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && deadline <= Instant::now()
        {
            return Err(OrmError::DeadlineExceeded(Duration::ZERO));
        }
        Ok(())
    }

    /// Drive `future` to completion unless the context is cancelled or expires first.
    pub(crate) async fn run<T, F>(
        &self,
        cancel_token: Option<tokio_postgres::CancelToken>,
        future: F,
    ) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>>,
    {
        self.check()?;
        let started = Instant::now();

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                cancel_in_flight(cancel_token);
                Err(OrmError::Cancelled)
            }
            _ = expired => {
                cancel_in_flight(cancel_token);
                Err(OrmError::DeadlineExceeded(started.elapsed()))
            }
            result = future => result,
        }
    }
}

/// Best-effort server-side cancel of the statement we stopped waiting on.
pub(crate) fn cancel_in_flight(cancel_token: Option<tokio_postgres::CancelToken>) {
    if let Some(cancel_token) = cancel_token {
        tokio::spawn(async move {
            if let Err(e) = cancel_token.cancel_query(tokio_postgres::NoTls).await {
                tracing::debug!(target: "pgmap.sql", error = %e, "server-side cancel failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn slow() -> OrmResult<u32> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(1)
    }

    #[tokio::test]
    async fn completes_without_deadline() {
        let ctx = Context::background();
        let v = ctx.run(None, async { Ok::<_, OrmError>(7) }).await.unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn deadline_aborts_in_flight_future() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let err = ctx.run(None, slow()).await.unwrap_err();
        assert!(err.is_deadline_exceeded());
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_future() {
        let ctx = Context::background();
        let handle = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });
        let err = ctx.run(None, slow()).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn already_cancelled_fails_before_running() {
        let ctx = Context::background();
        ctx.cancel();
        let ran = std::sync::atomic::AtomicBool::new(false);
        let err = ctx
            .run(None, async {
                ran.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, OrmError>(())
            })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn child_follows_parent_cancellation() {
        let parent = Context::background();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }
}
