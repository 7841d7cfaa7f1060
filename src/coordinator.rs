//! Shutdown inhibition state machine.
//!
//! A delay-mode inhibitor is taken first, then the tool subscribes to the
//! shutdown announcement and waits for it indefinitely. Once shutdown starts,
//! the protected command is raced against forced termination of this process.
//! The inhibitor is released exactly once on every path after acquisition.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::Error;
use crate::command::{Command, CommandOutcome};
use crate::power::{InhibitRequest, InhibitorLock, PowerManager};
use crate::signal::TerminationListener;

/// Documentation for logind's maximum inhibitor delay.
const DELAY_MAX_DOCS: &str =
    "https://www.freedesktop.org/software/systemd/man/latest/logind.conf.html#InhibitDelayMaxSec=";

/// Winner of the command/termination race.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RaceOutcome {
    /// Command exited before the process was asked to terminate.
    Completed(CommandOutcome),
    /// Process was asked to terminate while the command was still running.
    Terminated,
}

/// Summary of a protected shutdown.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Report {
    pub outcome: RaceOutcome,
    pub elapsed: Duration,
    pub over_budget: bool,
}

impl Report {
    /// Whether the command ran to completion successfully.
    pub fn success(&self) -> bool {
        self.outcome == RaceOutcome::Completed(CommandOutcome::Succeeded)
    }
}

/// Defer the next shutdown until `command` has been run.
pub async fn protect<P, T>(
    power: &P,
    termination: &T,
    request: &InhibitRequest,
    command: &Command,
) -> Result<Report, Error>
where
    P: PowerManager,
    T: TerminationListener,
{
    let budget = power.inhibit_delay_max().await?;
    debug!("Shutdown delay budget is {budget:?}");

    let lock = power.inhibit(request).await?;
    debug!("Acquired {} inhibitor lock: {}", request.mode, request.why);

    let result = run_on_shutdown(power, termination, command, budget).await;

    match (result, lock.release()) {
        (Ok(report), Ok(())) => Ok(report),
        (Err(err), Ok(())) | (Ok(_), Err(err)) => Err(err),
        (Err(err), Err(release_err)) => {
            error!("{release_err}");
            Err(err)
        },
    }
}

/// Wait for shutdown, then race the command against forced termination.
async fn run_on_shutdown<P, T>(
    power: &P,
    termination: &T,
    command: &Command,
    budget: Duration,
) -> Result<Report, Error>
where
    P: PowerManager,
    T: TerminationListener,
{
    let mut shutdown = power.subscribe_shutdown().await?;

    info!("Waiting for shutdown...");
    if shutdown.next().await.is_none() {
        return Err(Error::ShutdownSignalsEnded);
    }
    drop(shutdown);

    info!("System is shutting down, running '{}'...", command.display());

    let start = Instant::now();
    let terminated = termination.listen()?;
    let completion = command.start()?;

    let outcome = tokio::select! {
        outcome = completion.outcome() => RaceOutcome::Completed(outcome),
        () = terminated => RaceOutcome::Terminated,
    };

    let elapsed = start.elapsed();
    let over_budget = outcome == RaceOutcome::Terminated && elapsed > budget;
    if over_budget {
        error!(
            "Error: command did not complete within the InhibitDelayMaxSec ({budget:?}) and was \
             killed - consider increasing this value: {DELAY_MAX_DOCS}"
        );
    } else if outcome == RaceOutcome::Terminated {
        info!("Terminated after {elapsed:?}, before '{}' completed", command.display());
    }

    Ok(Report { outcome, elapsed, over_budget })
}
