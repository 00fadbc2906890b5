//! Library and application errors

use std::{
    fmt::{Display, Formatter},
    io,
    path::PathBuf,
};

use miette::Diagnostic;
use thiserror::Error;

use crate::{command::CommandType, targets::Mode};

/// All possible errors returned by at28cflash
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Operation was cancelled by the user")]
    #[diagnostic(code(at28cflash::cancelled))]
    Cancelled,

    #[error("Command has failed")]
    #[diagnostic(
        code(at28cflash::command_failed),
        help("The programmer rejected a request or the operation was aborted. Run with `RUST_LOG=debug` for details")
    )]
    CommandFailed,

    #[error("File does not exist: {}", .0.display())]
    #[diagnostic(code(at28cflash::file_not_found))]
    FileNotFound(PathBuf, #[source] io::Error),

    #[error("Unable to create file: {}", .0.display())]
    #[diagnostic(code(at28cflash::file_create))]
    FileCreate(PathBuf, #[source] io::Error),

    #[error("Failed to read file: {}", .0.display())]
    #[diagnostic(code(at28cflash::file_read))]
    FileRead(PathBuf, #[source] io::Error),

    #[error("Failed to write file: {}", .0.display())]
    #[diagnostic(code(at28cflash::file_write))]
    FileWrite(PathBuf, #[source] io::Error),

    #[cfg(feature = "cli")]
    #[error("Failed to parse configuration file: {}", .0.display())]
    #[diagnostic(code(at28cflash::invalid_config))]
    InvalidConfig(PathBuf, #[source] toml::de::Error),

    #[error("No serial ports could be detected")]
    #[diagnostic(
        code(at28cflash::no_serial),
        help("Make sure the programmer is connected to the host system, or pass the port name with `--port`")
    )]
    NoSerial,

    #[error("Unable to connect to programmer")]
    #[diagnostic(transparent)]
    Connection(#[source] ConnectionError),

    #[error("Communication error while programming device")]
    #[diagnostic(transparent)]
    Communication(#[source] ConnectionError),

    #[error("The programmer did not respond as expected")]
    #[diagnostic(transparent)]
    Protocol(#[from] ProtocolError),

    #[cfg(feature = "cli")]
    #[error(transparent)]
    #[diagnostic(code(at28cflash::dialoguer_error))]
    DialoguerError(#[from] dialoguer::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Connection(err.into())
    }
}

#[cfg(feature = "serialport")]
#[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Self::Connection(err.into())
    }
}

/// Connection-related errors
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ConnectionError {
    #[error("Serial port not found")]
    #[diagnostic(
        code(at28cflash::device_not_found),
        help("Ensure that the programmer is connected and your host recognizes the serial adapter")
    )]
    DeviceNotFound,

    #[error("Programmer rejected mode {mode} (response: {response:?})")]
    #[diagnostic(
        code(at28cflash::mode_rejected),
        help("Ensure the port belongs to an AT28C programmer and its firmware supports {mode}")
    )]
    ModeRejected { mode: Mode, response: String },

    #[error("Timeout while running {0}command")]
    #[diagnostic(code(at28cflash::timeout))]
    Timeout(TimedOutCommand),

    #[error("IO error while using serial port: {0}")]
    #[diagnostic(code(at28cflash::io_error))]
    Io(#[source] io::Error),

    #[cfg(feature = "serialport")]
    #[error("IO error while using serial port: {0}")]
    #[diagnostic(code(at28cflash::serial_error))]
    Serial(#[source] serialport::Error),
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => ConnectionError::Timeout(TimedOutCommand::default()),
            io::ErrorKind::NotFound => ConnectionError::DeviceNotFound,
            _ => ConnectionError::Io(err),
        }
    }
}

#[cfg(feature = "serialport")]
#[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
impl From<serialport::Error> for ConnectionError {
    fn from(err: serialport::Error) -> Self {
        use serialport::ErrorKind;

        match err.kind() {
            ErrorKind::Io(io::ErrorKind::TimedOut) => {
                ConnectionError::Timeout(TimedOutCommand::default())
            }
            ErrorKind::Io(io::ErrorKind::NotFound) | ErrorKind::NoDevice => {
                ConnectionError::DeviceNotFound
            }
            _ => ConnectionError::Serial(err),
        }
    }
}

/// An executed command which has timed out
#[derive(Clone, Debug, Default)]
pub struct TimedOutCommand {
    command: Option<CommandType>,
}

impl Display for TimedOutCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.command {
            Some(command) => write!(f, "{} ", command),
            None => Ok(()),
        }
    }
}

impl From<CommandType> for TimedOutCommand {
    fn from(ct: CommandType) -> Self {
        TimedOutCommand { command: Some(ct) }
    }
}

/// A single request/response exchange which did not succeed
///
/// These never escape the public [Programmer](crate::Programmer) operations,
/// which report them as a plain failure; they exist so the reason can be
/// logged.
#[derive(Debug, Diagnostic, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("{command} command was rejected with {response:?}")]
    #[diagnostic(code(at28cflash::protocol::rejected))]
    Rejected {
        command: CommandType,
        response: String,
    },

    #[error("{command} command returned a malformed response {response:?}")]
    #[diagnostic(code(at28cflash::protocol::malformed))]
    Malformed {
        command: CommandType,
        response: String,
    },

    #[error("No response to {0} command")]
    #[diagnostic(code(at28cflash::protocol::no_response))]
    NoResponse(CommandType),

    #[error("Verification of address {address:#06x} failed, expected {expected} but read {found}")]
    #[diagnostic(code(at28cflash::protocol::verify_failed))]
    VerifyMismatch { address: u32, expected: u8, found: u8 },
}

pub(crate) trait ResultExt {
    /// Mark an error as having occurred while programming
    fn communicating(self) -> Self;
    /// Mark the command from which this error originates
    fn for_command(self, command: CommandType) -> Self;
}

impl<T> ResultExt for Result<T, Error> {
    fn communicating(self) -> Self {
        match self {
            Err(Error::Connection(err)) => Err(Error::Communication(err)),
            res => res,
        }
    }

    fn for_command(self, command: CommandType) -> Self {
        match self {
            Err(Error::Connection(ConnectionError::Timeout(_))) => {
                Err(Error::Connection(ConnectionError::Timeout(command.into())))
            }
            Err(Error::Communication(ConnectionError::Timeout(_))) => {
                Err(Error::Communication(ConnectionError::Timeout(command.into())))
            }
            res => res,
        }
    }
}
