//! Progress reporting for bulk operations

use strum::Display;

/// The kind of bulk operation being reported on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Operation {
    /// Zeroing every address
    #[strum(serialize = "Clearing")]
    Clear,
    /// Dumping the EEPROM to a file
    #[strum(serialize = "Reading")]
    Read,
    /// Flashing a file to the EEPROM
    #[strum(serialize = "Writing")]
    Write,
}

/// Progress update callbacks
pub trait ProgressCallbacks {
    /// Initialize some progress report
    fn init(&mut self, operation: Operation, total: usize);
    /// Update some progress report, `current` counts from 1 up to `total`
    fn update(&mut self, current: usize);
    /// Finish some progress report
    fn finish(&mut self, completed: bool);
}

/// An empty implementation of [ProgressCallbacks] that does nothing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultProgressCallback;

impl ProgressCallbacks for DefaultProgressCallback {
    fn init(&mut self, _operation: Operation, _total: usize) {}
    fn update(&mut self, _current: usize) {}
    fn finish(&mut self, _completed: bool) {}
}
