pub mod account;
pub mod book;
pub mod dump;
pub mod order;

use crate::error::AppError;

/// Run a blocking exchange call off the async workers
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Exchange task failed: {e}")))
}
