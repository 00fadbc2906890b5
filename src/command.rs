//! Commands understood by the programmer firmware
//!
//! Every command is a single line of ASCII text consisting of a one letter
//! opcode followed by space separated decimal arguments, and is answered by
//! exactly one line.

use std::fmt::{Display, Formatter};

use strum::Display;

use crate::{error::ProtocolError, targets::Mode};

/// Response sent by the programmer when a command has been carried out
pub const ACK: &str = "OK";

/// Types of commands that can be sent to the programmer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
#[non_exhaustive]
pub enum CommandType {
    SetMode,
    Read,
    Write,
}

impl CommandType {
    /// The opcode sent on the wire for this command
    pub const fn opcode(&self) -> char {
        match self {
            CommandType::SetMode => 'm',
            CommandType::Read => 'r',
            CommandType::Write => 'w',
        }
    }
}

/// Available commands
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    /// Select the socketed EEPROM part
    SetMode { mode: Mode },
    /// Read the byte stored at `address`
    Read { address: u32 },
    /// Store `value` at `address`
    Write { address: u32, value: u8 },
}

impl Command {
    /// Return the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::SetMode { .. } => CommandType::SetMode,
            Command::Read { .. } => CommandType::Read,
            Command::Write { .. } => CommandType::Write,
        }
    }

    /// Check a response which is expected to be a plain acknowledgement
    pub fn expect_ack(&self, response: &str) -> Result<(), ProtocolError> {
        let command = self.command_type();

        match response {
            ACK => Ok(()),
            "" => Err(ProtocolError::NoResponse(command)),
            _ => Err(ProtocolError::Rejected {
                command,
                response: response.to_owned(),
            }),
        }
    }

    /// Parse a response which is expected to carry a byte value in decimal
    pub fn expect_value(&self, response: &str) -> Result<u8, ProtocolError> {
        let command = self.command_type();

        if response.is_empty() {
            return Err(ProtocolError::NoResponse(command));
        }

        let malformed = || ProtocolError::Malformed {
            command,
            response: response.to_owned(),
        };

        // `u8::from_str` would also accept a leading '+'
        if !response.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        response.parse::<u8>().map_err(|_| malformed())
    }
}

/// Formats the request line, without the terminating newline
impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let opcode = self.command_type().opcode();

        match self {
            Command::SetMode { mode } => write!(f, "{opcode} {mode}"),
            Command::Read { address } => write!(f, "{opcode} {address}"),
            Command::Write { address, value } => write!(f, "{opcode} {address} {value}"),
        }
    }
}
