//! Timeout wrapper composed around queue calls

use crate::queue::error::QueueError;
use std::future::Future;
use std::time::Duration;

/// Await `future` for at most `after`
///
/// When the deadline passes first the future is dropped, which also releases
/// any slot or resource it had been granted, and [`QueueError::Timeout`] is
/// returned through the caller's error type.
///
/// # Examples
/// ```rust
/// use std::time::Duration;
/// use taskgate::queue::api::{with_timeout, CapacityQueue, QueueError};
///
/// # async fn example() -> Result<(), QueueError> {
/// let queue = CapacityQueue::default();
/// let value = with_timeout(Duration::from_secs(5), queue.exec(|| async {
///     Ok::<_, QueueError>("done")
/// }))
/// .await?;
/// assert_eq!(value, "done");
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T, E>(after: Duration, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<QueueError>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            log::debug!("Operation abandoned after {:?}", after);
            Err(QueueError::Timeout { after }.into())
        }
    }
}
