//! Read and write EEPROMs through a connected programmer
//!
//! The [Programmer] implements the programmer's command protocol on top of a
//! [Connection], and the bulk operations which walk the whole memory one
//! address at a time. Bulk operations can be cancelled from another thread or
//! a signal handler through an [AbortHandle].

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::{debug, info, warn};

use crate::{
    command::Command,
    connection::Connection,
    error::{ConnectionError, Error, ProtocolError, ResultExt},
    progress::{Operation, ProgressCallbacks},
    targets::Mode,
};

/// Cooperative cancellation of bulk operations
///
/// Cloning the handle shares the underlying flag. Setting it makes the next
/// bulk operation iteration stop, and clears the flag again so the
/// [Programmer] can be reused.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Request the running bulk operation to stop
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an abort has been requested and not yet consumed
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Connect to and program an EEPROM
#[derive(Debug)]
pub struct Programmer {
    /// Connection to the programmer
    connection: Connection,
    /// The part being programmed
    mode: Mode,
    /// Read back every written byte
    validate_writes: bool,
    abort: AbortHandle,
}

impl Programmer {
    /// Select `mode` on the programmer behind `connection`
    ///
    /// The connection is released if the programmer does not accept the
    /// mode.
    pub fn connect(
        mut connection: Connection,
        mode: Mode,
        validate_writes: bool,
    ) -> Result<Self, Error> {
        let command = Command::SetMode { mode };
        let response = connection.command(command)?;

        if let Err(e) = command.expect_ack(&response) {
            debug!("Failed to set mode: {}", e);
            return Err(Error::Connection(ConnectionError::ModeRejected {
                mode,
                response,
            }));
        }

        info!("Programmer set to {} mode", mode);

        Ok(Programmer {
            connection,
            mode,
            validate_writes,
            abort: AbortHandle::default(),
        })
    }

    /// The part being programmed
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn validate_writes(&self) -> bool {
        self.validate_writes
    }

    pub fn set_validate_writes(&mut self, validate_writes: bool) {
        self.validate_writes = validate_writes;
    }

    /// The underlying connection
    pub fn connection(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Release the programmer, returning its connection
    pub fn into_connection(self) -> Connection {
        self.connection
    }

    /// Request the running bulk operation to stop
    ///
    /// Takes effect at the start of the operation's next iteration.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// A handle which can abort bulk operations from elsewhere, e.g. a signal
    /// handler
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Read the byte stored at `address`
    ///
    /// Returns `None` if the programmer's response was not a byte value.
    pub fn read(&mut self, address: u32) -> Result<Option<u8>, Error> {
        recoverable(self.read_byte(address))
    }

    /// Write `value` to `address`, verifying it if write validation is on
    ///
    /// Returns `false` if the programmer did not acknowledge the write or the
    /// value read back differs.
    pub fn write(&mut self, address: u32, value: u8) -> Result<bool, Error> {
        recoverable(self.write_byte(address, value)).map(|r| r.is_some())
    }

    /// Write zeros to every address
    pub fn clear(&mut self, progress: &mut dyn ProgressCallbacks) -> Result<bool, Error> {
        let total = self.mode.memory_size();
        debug!("Clearing {} bytes", total);

        let result = self.each_address(Operation::Clear, total, progress, |programmer, address| {
            programmer.write_byte(address, 0)
        });

        if recoverable(result)?.is_some() {
            info!("EEPROM successfully cleared");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Read the whole EEPROM into the file at `path`, one byte per address
    ///
    /// If an address cannot be read the file is left holding the bytes read
    /// so far.
    pub fn dump_to_file(
        &mut self,
        path: impl AsRef<Path>,
        progress: &mut dyn ProgressCallbacks,
    ) -> Result<bool, Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::FileCreate(path.to_owned(), e))?;
        let mut writer = BufWriter::new(file);

        let total = self.mode.memory_size();
        debug!("Reading {} bytes into '{}'", total, path.display());

        let result = self.each_address(Operation::Read, total, progress, |programmer, address| {
            let value = programmer.read_byte(address)?;
            writer
                .write_all(&[value])
                .map_err(|e| Error::FileWrite(path.to_owned(), e))
        });

        writer
            .flush()
            .map_err(|e| Error::FileWrite(path.to_owned(), e))?;

        if recoverable(result)?.is_some() {
            info!(
                "EEPROM content successfully read and written to '{}'",
                path.display()
            );
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Write the content of the file at `path` to the EEPROM, starting at
    /// address 0
    ///
    /// The file's length is not checked against the part's size.
    pub fn load_from_file(
        &mut self,
        path: impl AsRef<Path>,
        progress: &mut dyn ProgressCallbacks,
    ) -> Result<bool, Error> {
        let path = path.as_ref();
        let data = read_file(path)?;

        if data.len() as u64 > self.mode.memory_size() as u64 {
            warn!(
                "'{}' is {} bytes, larger than the {} bytes of the {}",
                path.display(),
                data.len(),
                self.mode.memory_size(),
                self.mode
            );
        }

        debug!("Writing {} bytes from '{}'", data.len(), path.display());

        let result = self.each_address(
            Operation::Write,
            data.len() as u32,
            progress,
            |programmer, address| programmer.write_byte(address, data[address as usize]),
        );

        if recoverable(result)?.is_some() {
            info!("'{}' successfully written to EEPROM", path.display());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn read_byte(&mut self, address: u32) -> Result<u8, Error> {
        let command = Command::Read { address };
        let response = self.connection.command(command).communicating()?;

        Ok(command.expect_value(&response)?)
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Error> {
        let command = Command::Write { address, value };
        let response = self.connection.command(command).communicating()?;
        command.expect_ack(&response)?;

        if self.validate_writes {
            let found = self.read_byte(address)?;
            if found != value {
                return Err(ProtocolError::VerifyMismatch {
                    address,
                    expected: value,
                    found,
                }
                .into());
            }
        }

        Ok(())
    }

    /// Run `f` for each address in `0..total` in order, stopping at the first
    /// failure or when an abort has been requested
    fn each_address<F>(
        &mut self,
        operation: Operation,
        total: u32,
        progress: &mut dyn ProgressCallbacks,
        mut f: F,
    ) -> Result<(), Error>
    where
        F: FnMut(&mut Self, u32) -> Result<(), Error>,
    {
        progress.init(operation, total as usize);

        for address in 0..total {
            if self.abort.take() {
                info!("{} aborted at address {:#06x}", operation, address);
                progress.finish(false);
                return Err(Error::Cancelled);
            }

            progress.update(address as usize + 1);

            if let Err(e) = f(self, address) {
                progress.finish(false);
                return Err(e);
            }
        }

        progress.finish(true);

        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, Error> {
    let mut file = File::open(path).map_err(|e| Error::FileNotFound(path.to_owned(), e))?;

    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| Error::FileRead(path.to_owned(), e))?;

    Ok(data)
}

/// Collapse the failures a caller is expected to handle into `None`
///
/// The programmer refusing a request, a malformed response and an aborted
/// operation all look the same to the caller; only connection and file
/// errors are passed through.
fn recoverable<T>(result: Result<T, Error>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Protocol(e)) => {
            warn!("{}", e);
            Ok(None)
        }
        Err(Error::Cancelled) => Ok(None),
        Err(e) => Err(e),
    }
}
