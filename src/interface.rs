use std::{
    fmt::{Debug, Formatter},
    io::{self, Read, Write},
};

#[cfg(feature = "serialport")]
use serialport::SerialPort;

/// A byte stream connected to a programmer
///
/// Implemented for serial ports, and by simulated programmers in tests.
/// Reads are expected to give up with [io::ErrorKind::TimedOut] once the
/// port's read timeout elapses.
pub trait Port: Read + Write + Send {
    /// Name of the port, if it has one
    fn name(&self) -> Option<String>;

    /// Number of bytes received but not yet read
    fn bytes_to_read(&self) -> io::Result<u32>;
}

#[cfg(feature = "serialport")]
#[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
impl Port for Box<dyn SerialPort> {
    fn name(&self) -> Option<String> {
        (**self).name()
    }

    fn bytes_to_read(&self) -> io::Result<u32> {
        (**self).bytes_to_read().map_err(io::Error::from)
    }
}

/// Wrapper around the [Port] a connection talks through.
pub struct Interface {
    port: Box<dyn Port>,
}

impl Interface {
    pub fn new(port: impl Port + 'static) -> Self {
        Self {
            port: Box::new(port),
        }
    }

    pub fn port(&self) -> &dyn Port {
        self.port.as_ref()
    }

    pub fn port_mut(&mut self) -> &mut dyn Port {
        self.port.as_mut()
    }

    pub fn into_port(self) -> Box<dyn Port> {
        self.port
    }
}

impl Debug for Interface {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("port", &self.port.name())
            .finish()
    }
}

impl Read for Interface {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for Interface {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}
