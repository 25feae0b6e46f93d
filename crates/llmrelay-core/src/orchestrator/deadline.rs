use std::future::Future;

use tokio::time::{Instant, timeout_at};

use crate::error::RelayError;

/// Runs `fut` until `deadline`. Expiry drops the future, which cancels any
/// provider call it owns.
pub(crate) async fn within<F, T>(deadline: Instant, fut: F) -> Result<T, RelayError>
where
    F: Future<Output = Result<T, RelayError>>,
{
    match timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expiry_is_a_timeout() {
        let deadline = Instant::now() + Duration::from_millis(10);
        let result = within(deadline, async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, RelayError>(())
        })
        .await;
        assert_eq!(result, Err(RelayError::Timeout));
    }

    #[tokio::test]
    async fn completes_before_deadline() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = within(deadline, async { Ok::<_, RelayError>(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
