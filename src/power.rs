//! Power manager capabilities used to defer shutdown.

use std::time::Duration;

use futures_util::Stream;

use crate::Error;

/// Inhibitor lock category.
pub const WHAT_SHUTDOWN: &str = "shutdown";

/// Inhibitor lock mode.
pub const MODE_DELAY: &str = "delay";

/// Parameters of a shutdown inhibitor request.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InhibitRequest {
    pub what: &'static str,
    pub who: String,
    pub why: String,
    pub mode: &'static str,
}

impl InhibitRequest {
    /// Delay-mode shutdown inhibitor on behalf of `who`.
    pub fn delay_shutdown(who: impl Into<String>, why: impl Into<String>) -> Self {
        Self { what: WHAT_SHUTDOWN, who: who.into(), why: why.into(), mode: MODE_DELAY }
    }
}

/// Open inhibitor lock.
///
/// Shutdown stays deferred until the lock is released. Releasing consumes the
/// lock, so it can only ever happen once.
pub trait InhibitorLock {
    /// Close the underlying lock handle.
    fn release(self) -> Result<(), Error>;
}

/// Host power manager.
#[allow(async_fn_in_trait)]
pub trait PowerManager {
    type Lock: InhibitorLock;
    type Shutdown: Stream<Item = ()> + Unpin;

    /// Maximum time shutdown will be delayed by a delay-mode inhibitor.
    async fn inhibit_delay_max(&self) -> Result<Duration, Error>;

    /// Acquire an inhibitor lock.
    async fn inhibit(&self, request: &InhibitRequest) -> Result<Self::Lock, Error>;

    /// Subscribe to shutdown-starting notifications.
    async fn subscribe_shutdown(&self) -> Result<Self::Shutdown, Error>;
}
