//! Types and functions for the command-line interface
//!
//! The contents of this module are intended for use with the [at28cflash]
//! command-line application, and are likely not of much use otherwise.
//!
//! No stability guaranties apply
//!
//! [at28cflash]: https://crates.io/crates/at28cflash

use std::num::ParseIntError;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use miette::{IntoDiagnostic, Result, WrapErr};

use self::{config::Config, serial::get_serial_port};
use crate::{
    connection::Connection,
    error::Error,
    progress::{Operation, ProgressCallbacks},
    targets::Mode,
    AbortHandle, Programmer,
};

pub mod config;

mod serial;

/// Establish a connection with a programmer
#[derive(Debug, Args)]
#[non_exhaustive]
pub struct ConnectArgs {
    /// Serial port connected to the programmer
    #[arg(short = 'p', long, global = true, env = "AT28CFLASH_PORT")]
    pub port: Option<String>,
    /// EEPROM part in the programmer's socket [default: AT28C64]
    #[arg(short = 'm', long, global = true, value_enum, ignore_case = true)]
    pub mode: Option<Mode>,
    /// Disable write validation for faster writing
    #[arg(short = 'f', long, global = true)]
    pub fast: bool,
}

/// Progress bar for the bulk operations
#[derive(Debug, Default)]
pub struct ProgrammerProgress {
    pb: Option<ProgressBar>,
    operation: Option<Operation>,
}

impl ProgressCallbacks for ProgrammerProgress {
    fn init(&mut self, operation: Operation, total: usize) {
        let pb = ProgressBar::new(total as u64).with_style(
            ProgressStyle::with_template(
                "{msg:<11} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>6}/{len:6} [{percent:>3}%]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message(format!("{operation}..."));

        self.pb = Some(pb);
        self.operation = Some(operation);
    }

    fn update(&mut self, current: usize) {
        if let Some(ref pb) = self.pb {
            pb.set_position(current as u64);
        }
    }

    fn finish(&mut self, completed: bool) {
        if let Some(ref pb) = self.pb {
            let operation = self.operation.map(|op| op.to_string()).unwrap_or_default();

            if completed {
                pb.finish_with_message(format!("{operation} done"));
            } else {
                pb.abandon_with_message(format!("{operation} stopped"));
            }
        }
    }
}

/// Open the programmer's serial port and select the part
pub fn connect(args: &ConnectArgs, config: &Config) -> Result<Programmer> {
    let port = get_serial_port(args, config)?;

    let mode = args.mode.or(config.programmer.mode).unwrap_or_default();
    let validate_writes = !args.fast && config.programmer.validate_writes.unwrap_or(true);
    debug!("Mode: {}, validating writes: {}", mode, validate_writes);

    println!("Serial port: '{}'", port);
    println!("Connecting...\n");

    let connection = Connection::open(&port)
        .wrap_err_with(|| format!("Failed to open serial port {port}"))?;

    Ok(Programmer::connect(connection, mode, validate_writes)?)
}

/// Abort the programmer's bulk operations when Ctrl-C is pressed
pub fn abort_on_ctrlc(handle: AbortHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        warn!("Aborting, waiting for the current address to finish");
        handle.abort();
    })
    .into_diagnostic()
    .wrap_err("Failed to install Ctrl-C handler")
}

/// Map the outcome of a programmer operation onto the process result
pub fn succeeded(success: bool) -> Result<()> {
    if success {
        Ok(())
    } else {
        Err(Error::CommandFailed.into())
    }
}

/// Parse an address given either in decimal or as `0x` prefixed hexadecimal
pub fn parse_u32(input: &str) -> Result<u32, ParseIntError> {
    match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_addresses() {
        assert_eq!(parse_u32("0"), Ok(0));
        assert_eq!(parse_u32("8191"), Ok(8191));
        assert_eq!(parse_u32("0x1fff"), Ok(0x1fff));
        assert_eq!(parse_u32("0X7FFF"), Ok(0x7fff));

        assert!(parse_u32("").is_err());
        assert!(parse_u32("-1").is_err());
        assert!(parse_u32("0x").is_err());
        assert!(parse_u32("ten").is_err());
    }

    #[test]
    fn failed_operations_become_errors() {
        assert!(succeeded(true).is_ok());

        let report = succeeded(false).unwrap_err();
        assert_eq!(report.to_string(), "Command has failed");
    }
}
