//! Timeout-racing producer execution.
//!
//! [`run_with_timeout`] runs a producer invocation as an independent task
//! and races its completion against a deadline timer. The race has a
//! single winner:
//!
//! - If the producer finishes first, the pending timer is dropped and
//!   exactly what the producer returned or raised propagates to the
//!   caller. This path never swallows producer failures.
//! - If the deadline fires first, the call fails with
//!   [`CacheError::Timeout`], but the producer task is **not** cancelled.
//!   It is abandoned and may still run to completion with side effects
//!   nobody observes. This is an accepted limitation of the design, not
//!   a bug: forcibly interrupting arbitrary producer code is not safe.
//!
//! A loading-started event is emitted on entry and a loading-ended event
//! exactly once on either exit path.

use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use crate::events::CacheEvents;
use crate::types::{CacheError, ProducerError};

/// Run a producer invocation with a deadline.
///
/// The producer future starts immediately; there is no suspension before
/// it is spawned. A producer panic is caught at the task boundary and
/// reported as [`CacheError::Producer`] rather than unwinding into the
/// caller.
pub async fn run_with_timeout<T>(
    events: &CacheEvents,
    producer: BoxFuture<'static, Result<T, ProducerError>>,
    timeout: Duration,
) -> Result<T, CacheError>
where
    T: Send + 'static,
{
    events.emit_loading(true);

    // Spawned rather than raced in place, so a lost race abandons the
    // invocation instead of dropping it mid-poll.
    let invocation = tokio::spawn(producer);

    let result = tokio::select! {
        joined = invocation => match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CacheError::Producer(err)),
            Err(join_err) => Err(CacheError::Producer(Box::new(join_err))),
        },
        _ = tokio::time::sleep(timeout) => {
            debug!(?timeout, "producer deadline expired, invocation abandoned");
            Err(CacheError::Timeout(timeout))
        }
    };

    events.emit_loading(false);
    result
}
