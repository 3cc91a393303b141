pub mod checkout;
pub mod order_service;
pub mod reconciler;
pub mod user_service;

use crate::domain::errors::DomainError;

/// Run a synchronous store call on tokio's blocking pool. `on_join` builds the
/// error used if the blocking task itself panics or is cancelled.
pub(crate) async fn run_blocking<T, F>(
    f: F,
    on_join: fn(String) -> DomainError,
) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| on_join(e.to_string()))?
}
