use super::error::Error;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Wait `delay` before a rejection is returned, unless `cancel` fires first.
///
/// Always yields `false`. Cancellation ends the wait early; the token stays
/// cancelled, so the caller still observes the signal.
pub async fn reject(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = tokio::time::sleep(delay) => {}
        () = cancel.cancelled() => {
            debug!("{}", Error::ThrottleInterrupted);
        }
    }

    false
}
