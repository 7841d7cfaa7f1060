use std::ffi::OsString;
use std::{env, io, process};

use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::command::Command;
use crate::config::Config;
use crate::coordinator::Report;
use crate::dbus::Logind;
use crate::power::InhibitRequest;
use crate::signal::Sigterm;

mod command;
mod config;
mod coordinator;
mod dbus;
mod power;
mod signal;

fn main() {
    let status = dispatch(env::args_os().skip(1), |command| {
        // Setup logging.
        let directives =
            env::var("RUST_LOG").unwrap_or("warn,on_shutdown=info,configory=info".into());
        let env_filter = EnvFilter::builder().parse_lossy(directives);
        FmtSubscriber::builder().with_env_filter(env_filter).with_line_number(true).init();

        run(command)
    });

    if status != 0 {
        process::exit(status);
    }
}

/// Handle the command line, returning the process exit status.
///
/// Without a command only the usage is printed and `protect` is never called.
fn dispatch<F>(args: impl IntoIterator<Item = OsString>, protect: F) -> i32
where
    F: FnOnce(Command) -> Result<Report, Error>,
{
    let command = match Command::from_args(args) {
        Some(command) => command,
        None => {
            print!("{}", usage());
            return 0;
        },
    };

    match protect(command) {
        Ok(report) => {
            info!("Released shutdown inhibitor after {:?}", report.elapsed);
            match report {
                report if report.success() => 0,
                Report { over_budget: true, .. } => 2,
                _ => 1,
            }
        },
        Err(err) => {
            error!("[CRITICAL] {err}");
            1
        },
    }
}

fn run(command: Command) -> Result<Report, Error> {
    let config = Config::load()?;
    let why = format!("{}{}", config.inhibitor.why_prefix, command.display());
    let request = InhibitRequest::delay_shutdown(config.inhibitor.who, why);

    let runtime = Builder::new_current_thread().enable_all().build().map_err(Error::Runtime)?;
    runtime.block_on(async {
        let logind = Logind::connect().await?;
        info!("Connected to systemd-logind");

        let report = coordinator::protect(&logind, &Sigterm, &request, &command).await;

        logind.close().await;

        report
    })
}

/// Version and usage text.
fn usage() -> String {
    format!(
        "version: v{}\nusage: {} <command> [options...]\n",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_NAME"),
    )
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("error getting system bus: {0}")]
    Bus(#[source] zbus::Error),
    #[error("error getting inhibit delay property: {0}")]
    DelayBudget(#[source] zbus::Error),
    #[error("error setting up shutdown inhibitor: {0}")]
    Inhibit(#[source] zbus::Error),
    #[error("error adding match signal: {0}")]
    Subscribe(#[source] zbus::Error),
    #[error("shutdown signal stream closed unexpectedly")]
    ShutdownSignalsEnded,
    #[error("error listening for SIGTERM: {0}")]
    TerminationListener(#[source] io::Error),
    #[error("error while starting command '{0}': {1}")]
    CommandStart(String, #[source] io::Error),
    #[error("error closing inhibitor file descriptor: {0}")]
    Release(#[source] nix::Error),
    #[error("error creating async runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("{0}")]
    Configory(#[from] configory::Error),
}
