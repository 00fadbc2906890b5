#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io::{self, ErrorKind, Read, Write},
    sync::{Arc, Mutex, MutexGuard},
};

use at28cflash::{
    connection::{Connection, ConnectionTiming},
    interface::{Interface, Port},
    progress::{Operation, ProgressCallbacks},
    AbortHandle, Mode, Programmer,
};

pub const BANNER: &str = "AT28C Programmer | v1.0\r\nType 'h' for help\r\n";

/// Misbehaviour injected into the simulated programmer
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Answer mode selection with an error
    pub reject_mode: bool,
    /// Answer every read with this line instead of the stored value
    pub read_response: Option<String>,
    /// Answer reads at and above this address with an error
    pub fail_reads_from: Option<u32>,
    /// Acknowledge writes but store the inverted value
    pub corrupt_writes: bool,
}

#[derive(Debug)]
struct Device {
    memory: Vec<u8>,
    mode: Option<Mode>,
    requests: Vec<String>,
    faults: Faults,
}

impl Device {
    fn size(&self) -> u32 {
        self.mode.map(Mode::memory_size).unwrap_or(0)
    }

    fn handle(&mut self, line: &str) -> String {
        self.requests.push(line.to_owned());

        let parts: Vec<&str> = line.split(' ').collect();
        match parts.as_slice() {
            // The firmware only understands the upper case names
            ["m", name] => match name.parse::<Mode>() {
                Ok(mode) if !self.faults.reject_mode && mode.to_string() == *name => {
                    self.mode = Some(mode);
                    "OK".into()
                }
                _ => "ERR".into(),
            },
            ["r", address] => {
                if let Some(response) = &self.faults.read_response {
                    return response.clone();
                }
                match address.parse::<u32>() {
                    Ok(address)
                        if address < self.size()
                            && self.faults.fail_reads_from.map_or(true, |from| address < from) =>
                    {
                        self.memory[address as usize].to_string()
                    }
                    _ => "ERR".into(),
                }
            }
            ["w", address, value] => match (address.parse::<u32>(), value.parse::<u8>()) {
                (Ok(address), Ok(value)) if address < self.size() => {
                    self.memory[address as usize] = if self.faults.corrupt_writes {
                        !value
                    } else {
                        value
                    };
                    "OK".into()
                }
                _ => "ERR".into(),
            },
            _ => "Unknown command!".into(),
        }
    }
}

/// A programmer backed by memory, answering requests the way the firmware
/// does
#[derive(Debug, Clone)]
pub struct SimulatedProgrammer {
    device: Arc<Mutex<Device>>,
}

impl SimulatedProgrammer {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        SimulatedProgrammer {
            device: Arc::new(Mutex::new(Device {
                memory: vec![0xff; Mode::At28c256.memory_size() as usize],
                mode: None,
                requests: Vec::new(),
                faults,
            })),
        }
    }

    fn device(&self) -> MutexGuard<'_, Device> {
        self.device.lock().unwrap()
    }

    /// A freshly opened port, with the boot banner waiting to be read
    pub fn port(&self) -> SimulatedPort {
        SimulatedPort {
            device: self.device.clone(),
            line: Vec::new(),
            output: BANNER.bytes().collect(),
        }
    }

    pub fn connect(&self, mode: Mode, validate_writes: bool) -> Programmer {
        let mut connection = Connection::new(Interface::new(self.port()), ConnectionTiming::none());
        connection.begin().unwrap();

        let programmer = Programmer::connect(connection, mode, validate_writes).unwrap();
        self.clear_requests();

        programmer
    }

    pub fn fill(&self, data: &[u8]) {
        self.device().memory[..data.len()].copy_from_slice(data);
    }

    pub fn memory(&self, len: usize) -> Vec<u8> {
        self.device().memory[..len].to_vec()
    }

    pub fn set_faults(&self, faults: Faults) {
        self.device().faults = faults;
    }

    pub fn requests(&self) -> Vec<String> {
        self.device().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.device().requests.clear();
    }
}

/// One end of a serial link to a [SimulatedProgrammer]
#[derive(Debug)]
pub struct SimulatedPort {
    device: Arc<Mutex<Device>>,
    line: Vec<u8>,
    output: VecDeque<u8>,
}

impl Read for SimulatedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.output.is_empty() {
            return Err(ErrorKind::TimedOut.into());
        }

        let mut count = 0;
        while count < buf.len() {
            match self.output.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }

        Ok(count)
    }
}

impl Write for SimulatedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            match byte {
                b'\n' => {
                    let line = String::from_utf8_lossy(&self.line).trim().to_owned();
                    self.line.clear();

                    let response = self.device.lock().unwrap().handle(&line);
                    self.output.extend(response.bytes());
                    self.output.extend(b"\r\n");
                }
                byte => self.line.push(byte),
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for SimulatedPort {
    fn name(&self) -> Option<String> {
        Some("simulated".into())
    }

    fn bytes_to_read(&self) -> io::Result<u32> {
        Ok(self.output.len() as u32)
    }
}

/// Records every progress notification, optionally aborting once a given
/// iteration has been reported
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub operation: Option<Operation>,
    pub total: usize,
    pub updates: Vec<usize>,
    pub finished: Option<bool>,
    pub abort_at: Option<(usize, AbortHandle)>,
}

impl RecordingProgress {
    pub fn aborting_at(iteration: usize, handle: AbortHandle) -> Self {
        RecordingProgress {
            abort_at: Some((iteration, handle)),
            ..Default::default()
        }
    }
}

impl ProgressCallbacks for RecordingProgress {
    fn init(&mut self, operation: Operation, total: usize) {
        self.operation = Some(operation);
        self.total = total;
        self.updates.clear();
        self.finished = None;
    }

    fn update(&mut self, current: usize) {
        self.updates.push(current);

        if let Some((iteration, handle)) = &self.abort_at {
            if current == *iteration {
                handle.abort();
            }
        }
    }

    fn finish(&mut self, completed: bool) {
        self.finished = Some(completed);
    }
}

/// Repeating `0..=255`
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}
