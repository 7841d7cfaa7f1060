//! DBus system interfaces.

use std::os::fd::{IntoRawFd, OwnedFd};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::{debug, warn};
use zbus::Connection;

use crate::Error;
use crate::dbus::logind::ManagerProxy;
use crate::power::{InhibitRequest, InhibitorLock, PowerManager};

#[allow(clippy::all)]
mod logind;

/// systemd-logind power manager on the system bus.
pub struct Logind {
    connection: Connection,
    manager: ManagerProxy<'static>,
}

impl Logind {
    /// Connect to logind on the system bus.
    pub async fn connect() -> Result<Self, Error> {
        let connection = Connection::system().await.map_err(Error::Bus)?;
        let manager = ManagerProxy::new(&connection).await.map_err(Error::Bus)?;
        Ok(Self { connection, manager })
    }

    /// Close the bus connection.
    pub async fn close(self) {
        drop(self.manager);
        if let Err(err) = self.connection.close().await {
            warn!("Failed to close system bus connection: {err}");
        }
    }
}

impl PowerManager for Logind {
    type Lock = LogindLock;
    type Shutdown = BoxStream<'static, ()>;

    async fn inhibit_delay_max(&self) -> Result<Duration, Error> {
        let usec = self.manager.inhibit_delay_max_usec().await.map_err(Error::DelayBudget)?;
        Ok(Duration::from_micros(usec))
    }

    async fn inhibit(&self, request: &InhibitRequest) -> Result<LogindLock, Error> {
        let fd = self
            .manager
            .inhibit(request.what, &request.who, &request.why, request.mode)
            .await
            .map_err(Error::Inhibit)?;
        Ok(LogindLock { fd: fd.into() })
    }

    async fn subscribe_shutdown(&self) -> Result<Self::Shutdown, Error> {
        let signals =
            self.manager.receive_prepare_for_shutdown().await.map_err(Error::Subscribe)?;

        // Only the rising edge announces a shutdown.
        let shutdown = signals.filter_map(|signal| async move {
            match signal.args() {
                Ok(args) if *args.start() => Some(()),
                Ok(_) => {
                    debug!("Ignoring PrepareForShutdown(false)");
                    None
                },
                Err(err) => {
                    warn!("Invalid PrepareForShutdown signal: {err}");
                    None
                },
            }
        });

        Ok(shutdown.boxed())
    }
}

/// Inhibitor lock file descriptor handed out by logind.
#[derive(Debug)]
pub struct LogindLock {
    fd: OwnedFd,
}

impl InhibitorLock for LogindLock {
    fn release(self) -> Result<(), Error> {
        nix::unistd::close(self.fd.into_raw_fd()).map_err(Error::Release)
    }
}
