use std::future::Future;

use tokio::time::Instant;

use crate::domain::{InternalReason, RoutingError};

/// Run `fut`, failing with `Internal(DeadlineExceeded)` once `deadline`
/// passes. Dropping the future cancels the in-flight call.
pub(crate) async fn within<F, T>(deadline: Instant, operation: &str, fut: F) -> Result<T, RoutingError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout_at(deadline, fut).await.map_err(|_| {
        RoutingError::internal(
            InternalReason::DeadlineExceeded,
            format!("{operation} did not complete before the request deadline"),
        )
    })
}
