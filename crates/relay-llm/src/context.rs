use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::LlmError;

/// Caller-controlled lifetime of one `chat` call
///
/// Cancelling the token or passing the deadline aborts credential
/// resolution and the in-flight HTTP request alike.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ChatContext {
    /// Context that never expires on its own
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie the call to an existing cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Token that cancels this call when triggered
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `work` until it finishes, the token fires or the deadline passes
    pub(crate) async fn run<T, F>(&self, work: F) -> Result<T, LlmError>
    where
        F: Future<Output = Result<T, LlmError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(LlmError::Cancelled),
            () = deadline => Err(LlmError::DeadlineExceeded),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn slow() -> Result<u8, LlmError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(1)
    }

    #[tokio::test]
    async fn completes_when_unbounded() {
        let ctx = ChatContext::new();
        assert_eq!(ctx.run(async { Ok::<_, LlmError>(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn pre_cancelled_context_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ChatContext::new().with_cancellation(token);

        let err = ctx
            .run(std::future::pending::<Result<(), LlmError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_interrupts_work() {
        let ctx = ChatContext::new();
        let token = ctx.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = ctx.run(slow()).await.unwrap_err();
        assert!(matches!(err, LlmError::Cancelled));
    }

    #[tokio::test]
    async fn deadline_interrupts_work() {
        let ctx = ChatContext::new().with_timeout(Duration::from_millis(20));
        let err = ctx.run(slow()).await.unwrap_err();
        assert!(matches!(err, LlmError::DeadlineExceeded));
    }
}
