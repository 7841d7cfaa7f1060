//! Protected command execution.

use std::ffi::OsString;

use tokio::process::Command as Process;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::Error;

/// Command protected from shutdown.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    display: String,
}

impl Command {
    /// Build the command from its program name and arguments.
    ///
    /// Returns `None` if there is no program name.
    pub fn from_args(args: impl IntoIterator<Item = OsString>) -> Option<Self> {
        let mut args = args.into_iter();
        let program = args.next()?;
        let args: Vec<_> = args.collect();

        let mut display = program.to_string_lossy().into_owned();
        for arg in &args {
            display.push(' ');
            display.push_str(&arg.to_string_lossy());
        }

        Some(Self { program, args, display })
    }

    /// Human-readable command line.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Spawn the command in the background.
    ///
    /// Standard streams are inherited, so output shows up live. Only failing
    /// to launch the process is reported as an error, the exit status is
    /// delivered through the returned [`Completion`].
    pub fn start(&self) -> Result<Completion, Error> {
        let mut child = Process::new(&self.program)
            .args(&self.args)
            .spawn()
            .map_err(|err| Error::CommandStart(self.display.clone(), err))?;

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = match child.wait().await {
                Ok(status) if status.success() => {
                    info!("Command completed successfully");
                    CommandOutcome::Succeeded
                },
                Ok(status) => {
                    error!("error while running command: {status}");
                    CommandOutcome::Failed
                },
                Err(err) => {
                    error!("error while waiting for command: {err}");
                    CommandOutcome::Failed
                },
            };

            // Receiver is gone once the race was lost.
            let _ = tx.send(outcome);
        });

        Ok(Completion { rx })
    }
}

/// Result of a protected command run.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CommandOutcome {
    Succeeded,
    Failed,
}

/// Pending command completion.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<CommandOutcome>,
}

impl Completion {
    /// Wait for the command to exit.
    pub async fn outcome(self) -> CommandOutcome {
        self.rx.await.unwrap_or(CommandOutcome::Failed)
    }
}
