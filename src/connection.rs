//! Establish a connection with a programmer
//!
//! The [Connection] struct abstracts over the serial connection and the
//! framing of newline terminated requests and responses.

use std::{
    io::{ErrorKind, Read, Write},
    thread::sleep,
    time::Duration,
};

use log::{debug, trace};
#[cfg(feature = "serialport")]
use serialport::FlowControl;

use crate::{
    command::Command,
    error::{Error, ResultExt},
    interface::Interface,
};

/// Baud rate the programmer firmware listens at
pub const DEFAULT_BAUD: u32 = 115_200;
/// How long a single response is waited for
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

const BOOT_DELAY: Duration = Duration::from_millis(1500);
const DISCARD_DELAY: Duration = Duration::from_millis(250);

/// Delays observed while bringing up a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTiming {
    /// Time given to the programmer to boot after the port is opened, as
    /// opening the port resets most boards
    pub boot_delay: Duration,
    /// Time given to the programmer to answer the newline sent before
    /// discarding its startup output
    pub discard_delay: Duration,
}

impl ConnectionTiming {
    /// No delays at all, for programmers which are already running
    pub const fn none() -> Self {
        ConnectionTiming {
            boot_delay: Duration::ZERO,
            discard_delay: Duration::ZERO,
        }
    }
}

impl Default for ConnectionTiming {
    fn default() -> Self {
        ConnectionTiming {
            boot_delay: BOOT_DELAY,
            discard_delay: DISCARD_DELAY,
        }
    }
}

/// An established connection with a programmer
#[derive(Debug)]
pub struct Connection {
    serial: Interface,
    timing: ConnectionTiming,
}

impl Connection {
    /// Open the named serial port and initialize a connection through it
    #[cfg(feature = "serialport")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
    pub fn open(port_name: &str) -> Result<Self, Error> {
        debug!("Opening serial port {}", port_name);

        let serial = serialport::new(port_name, DEFAULT_BAUD)
            .flow_control(FlowControl::None)
            .timeout(DEFAULT_TIMEOUT)
            .open()?;

        let mut connection = Connection::new(Interface::new(serial), ConnectionTiming::default());
        connection.begin()?;

        Ok(connection)
    }

    pub fn new(serial: Interface, timing: ConnectionTiming) -> Self {
        Connection { serial, timing }
    }

    /// Initialize a connection with a programmer
    ///
    /// Waits for the programmer to boot and throws away whatever it printed
    /// while doing so.
    pub fn begin(&mut self) -> Result<(), Error> {
        sleep(self.timing.boot_delay);
        self.discard()
    }

    fn discard(&mut self) -> Result<(), Error> {
        self.send_line("")?;
        sleep(self.timing.discard_delay);

        while self.serial.port().bytes_to_read()? > 0 {
            let line = self.read_line()?;
            debug!("Discarding {:?}", line);
        }

        Ok(())
    }

    /// Write a line of text followed by a newline
    pub fn send_line(&mut self, text: &str) -> Result<(), Error> {
        trace!("-> {:?}", text);

        let mut buffer = Vec::with_capacity(text.len() + 1);
        buffer.extend_from_slice(text.as_bytes());
        buffer.push(b'\n');

        self.serial.write_all(&buffer)?;
        self.serial.flush()?;

        Ok(())
    }

    /// Read a single line, without its terminator and surrounding whitespace
    ///
    /// Gives up once the read timeout elapses, in which case an empty string
    /// is returned and any partially received line is dropped.
    pub fn read_line(&mut self) -> Result<String, Error> {
        let mut line = Vec::new();
        let mut byte = [0; 1];

        loop {
            match self.serial.read(&mut byte) {
                Ok(0) => return Ok(self.timed_out(&line)),
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(self.timed_out(&line));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let line = String::from_utf8_lossy(&line).trim().to_owned();
        trace!("<- {:?}", line);

        Ok(line)
    }

    fn timed_out(&self, partial: &[u8]) -> String {
        if partial.is_empty() {
            debug!("Timed out waiting for a response");
        } else {
            debug!(
                "Timed out waiting for a response, dropping {:?}",
                String::from_utf8_lossy(partial)
            );
        }

        String::new()
    }

    /// Write a command and read its response
    pub fn command(&mut self, command: Command) -> Result<String, Error> {
        let ty = command.command_type();

        self.send_line(&command.to_string()).for_command(ty)?;
        self.read_line().for_command(ty)
    }

    /// Close the connection, releasing the serial port
    pub fn close(self) {
        debug!("Closing connection to {:?}", self.serial.port().name());
    }

    /// Turn a connection into its [Interface]
    pub fn into_interface(self) -> Interface {
        self.serial
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        io,
        sync::{Arc, Mutex},
    };

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{interface::Port, targets::Mode};

    /// Replays canned input one byte per read and records all output
    struct Script {
        input: VecDeque<io::Result<u8>>,
        output: Arc<Mutex<Vec<u8>>>,
    }

    impl Script {
        fn new(input: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
            let output = Arc::new(Mutex::new(Vec::new()));
            let script = Script {
                input: input.bytes().map(Ok).collect(),
                output: output.clone(),
            };

            (script, output)
        }
    }

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.input.pop_front() {
                Some(Ok(byte)) => {
                    buf[0] = byte;
                    Ok(1)
                }
                Some(Err(e)) => Err(e),
                None => Err(ErrorKind::TimedOut.into()),
            }
        }
    }

    impl Write for Script {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Port for Script {
        fn name(&self) -> Option<String> {
            Some("script".into())
        }

        fn bytes_to_read(&self) -> io::Result<u32> {
            Ok(self.input.len() as u32)
        }
    }

    fn connection(script: Script) -> Connection {
        Connection::new(Interface::new(script), ConnectionTiming::none())
    }

    #[test]
    fn read_line_strips_terminators() {
        let (script, _) = Script::new("OK\r\n  42 \n");
        let mut connection = connection(script);

        assert_eq!(connection.read_line().unwrap(), "OK");
        assert_eq!(connection.read_line().unwrap(), "42");
    }

    #[test]
    fn read_line_returns_empty_on_timeout() {
        let (script, _) = Script::new("12");
        let mut connection = connection(script);

        assert_eq!(connection.read_line().unwrap(), "");
        assert_eq!(connection.read_line().unwrap(), "");
    }

    #[test]
    fn read_line_retries_interrupted_reads() {
        let (mut script, _) = Script::new("");
        script.input = VecDeque::from([
            Ok(b'7'),
            Err(ErrorKind::Interrupted.into()),
            Ok(b'\n'),
        ]);
        let mut connection = connection(script);

        assert_eq!(connection.read_line().unwrap(), "7");
    }

    #[test]
    fn read_line_reports_io_faults() {
        let (mut script, _) = Script::new("");
        script.input = VecDeque::from([Err(ErrorKind::BrokenPipe.into())]);
        let mut connection = connection(script);

        assert!(matches!(connection.read_line(), Err(Error::Connection(_))));
    }

    #[test]
    fn send_line_appends_newline() {
        let (script, output) = Script::new("");
        let mut connection = connection(script);

        connection.send_line("r 12").unwrap();
        assert_eq!(output.lock().unwrap().as_slice(), b"r 12\n");
    }

    #[test]
    fn begin_discards_banner() {
        let (script, output) = Script::new("AT28C Programmer\r\nType 'h' for help\r\n");
        let mut connection = connection(script);

        connection.begin().unwrap();

        assert_eq!(output.lock().unwrap().as_slice(), b"\n");
        assert_eq!(connection.read_line().unwrap(), "");
    }

    #[test]
    fn command_is_one_exchange() {
        let (script, output) = Script::new("OK\n");
        let mut connection = connection(script);

        let response = connection
            .command(Command::SetMode {
                mode: Mode::At28c64,
            })
            .unwrap();

        assert_eq!(response, "OK");
        assert_eq!(output.lock().unwrap().as_slice(), b"m AT28C64\n");
    }
}
