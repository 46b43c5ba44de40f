use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Cancellation and deadline shared by every store round trip of one
/// operation.
///
/// Clones share the same token, so cancelling any clone stops all of them.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Sets a deadline `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// A context cancelled together with `self` that can also be cancelled
    /// on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails fast if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if matches!(self.deadline, Some(deadline) if deadline <= Instant::now()) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Runs one round trip, abandoning it as soon as the context is
    /// cancelled or its deadline passes.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = expired => Err(Error::DeadlineExceeded),
            res = fut => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = OpContext::new();
        let res = ctx.run(async { Ok(7) }).await;
        assert_eq!(res.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let ctx = OpContext::new();
        ctx.cancel();
        let res: Result<()> = ctx.run(async { Ok(()) }).await;
        assert!(matches!(res, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_round_trip() {
        let ctx = OpContext::new();
        let handle = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });
        let res: Result<()> = ctx.run(std::future::pending()).await;
        assert!(matches!(res, Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = OpContext::new().with_timeout(Duration::from_secs(1));
        let res: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_child_follows_parent() {
        let parent = OpContext::new();
        let child = parent.child();
        child.cancel();
        assert!(parent.check().is_ok());

        let child = parent.child();
        parent.cancel();
        assert!(matches!(child.check(), Err(Error::Cancelled)));
    }
}
