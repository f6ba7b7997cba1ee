use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ConsoleError, Result};

/// 在取消令牌下执行 future，令牌先触发时返回 [`ConsoleError::Cancelled`]
pub async fn run_cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ConsoleError::Cancelled),
        res = fut => res,
    }
}

/// 可取消的等待
pub async fn pause(token: &CancellationToken, duration: Duration) -> Result<()> {
    if duration.is_zero() {
        return if token.is_cancelled() {
            Err(ConsoleError::Cancelled)
        } else {
            Ok(())
        };
    }
    run_cancellable(token, async {
        tokio::time::sleep(duration).await;
        Ok(())
    })
    .await
}
