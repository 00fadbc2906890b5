//! A library and application for programming AT28C parallel EEPROMs.
//!
//! The programmer hardware sits between the host and the EEPROM and speaks a
//! small line-based ASCII protocol over a serial port. This crate provides a
//! [Connection](connection::Connection) which frames requests and responses,
//! and a [Programmer] which implements the protocol along with the bulk
//! operations built on top of it: clearing the whole chip, dumping it to a
//! file, and flashing a file to it.
//!
//! ## As an application
//!
//! [at28cflash] can be installed using `cargo install`:
//!
//! ```bash
//! $ cargo install at28cflash
//! ```
//!
//! ## As a library
//!
//! [at28cflash] can be used as a library in other applications:
//!
//! ```toml
//! at28cflash = { version = "0.1", default-features = false, features = ["serialport"] }
//! ```
//!
//! We add `default-features` here to disable the `cli` feature, which is
//! enabled by default. Its important to note that the cli module does not
//! provide SemVer guarantees.
//!
//! [at28cflash]: https://crates.io/crates/at28cflash

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_debug_implementations, rust_2018_idioms)]

pub use self::{
    error::Error,
    programmer::{AbortHandle, Programmer},
    targets::Mode,
};

#[cfg(feature = "cli")]
#[cfg_attr(docsrs, doc(cfg(feature = "cli")))]
pub mod cli;
pub mod command;
pub mod connection;
pub mod error;
pub mod interface;
pub mod programmer;
pub mod progress;
pub mod targets;

/// Logging utilities
#[cfg(feature = "cli")]
#[cfg_attr(docsrs, doc(cfg(feature = "cli")))]
pub mod logging {
    use env_logger::{Builder, Env};
    use log::LevelFilter;

    /// Initialize the logger with the given [LevelFilter]
    pub fn initialize_logger(filter: LevelFilter) {
        Builder::from_env(Env::default().default_filter_or(filter.as_str()))
            .format_target(false)
            .init();
    }
}
