//! Supported EEPROM parts
//!
//! The programmer must be told which part is socketed before any other
//! command is issued; the selected [Mode] also fixes how many addresses the
//! bulk operations walk.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};

/// All supported EEPROM parts
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// AT28C64, 8 KiB
    #[default]
    #[cfg_attr(feature = "cli", value(name = "AT28C64"))]
    At28c64,
    /// AT28C256, 32 KiB
    #[cfg_attr(feature = "cli", value(name = "AT28C256"))]
    At28c256,
}

impl Mode {
    /// Size of the part's memory in bytes
    pub const fn memory_size(self) -> u32 {
        match self {
            Mode::At28c64 => 8192,
            Mode::At28c256 => 32768,
        }
    }
}
