//! Forced termination of this process.

use std::future::Future;

use tokio::signal::unix::{SignalKind, signal};

use crate::Error;

/// Source of forced termination requests.
pub trait TerminationListener {
    /// Start listening for termination.
    ///
    /// The returned future resolves on the first request received after this
    /// call returned.
    fn listen(&self) -> Result<impl Future<Output = ()>, Error>;
}

/// `SIGTERM` delivered to this process.
#[derive(Copy, Clone, Default, Debug)]
pub struct Sigterm;

impl TerminationListener for Sigterm {
    fn listen(&self) -> Result<impl Future<Output = ()>, Error> {
        let mut sigterm = signal(SignalKind::terminate()).map_err(Error::TerminationListener)?;
        Ok(async move {
            sigterm.recv().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nix::sys::signal::{self, Signal};

    use super::*;

    #[tokio::test]
    async fn sigterm_resolves_listener() {
        let terminated = Sigterm.listen().unwrap();
        signal::raise(Signal::SIGTERM).unwrap();

        tokio::time::timeout(Duration::from_secs(5), terminated).await.unwrap();
    }
}
