//! Record addressing.
//!
//! Positions are always in whole records. A (position, mode) pair is checked
//! against the current cursor and file length, then turned into a byte level
//! `SeekFrom` by scaling with the record width. Rules, first match wins:
//!
//!   Absolute           0 <= position < len
//!   RelativeToCurrent  0 <= current + position < len
//!   FromEnd            -len < position <= 0      (0 is one past the last record)
//!   Absolute           position < 0              -> re-resolved as FromEnd
//!
//! Anything else is out of range. The Absolute redirect makes `-1` address
//! the last record, like a negative index.

use std::fmt;
use std::io::SeekFrom;
use std::str::FromStr;

use tracing::trace;

use crate::errors::RecfileError;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekMode {
    #[default]
    Absolute,
    RelativeToCurrent,
    FromEnd,
}

impl fmt::Display for SeekMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeekMode::Absolute => write!(f, "abs"),
            SeekMode::RelativeToCurrent => write!(f, "cur"),
            SeekMode::FromEnd => write!(f, "end"),
        }
    }
}

impl FromStr for SeekMode {
    type Err = RecfileError;

    /// Accepts the mode names and the numeric whence values 0, 1 and 2.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abs" | "0" => Ok(SeekMode::Absolute),
            "cur" | "1" => Ok(SeekMode::RelativeToCurrent),
            "end" | "2" => Ok(SeekMode::FromEnd),
            _ => Err(RecfileError::CLIError(format!("unknown seek mode: {}", s))),
        }
    }
}

/// A position that passed the range checks, still relative to `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub position: i64,
    pub mode: SeekMode,
}

impl Resolved {
    /// The byte level seek for records of `width` bytes.
    pub fn seek_from(&self, width: usize) -> SeekFrom {
        let bytes = self.position * width as i64;
        match self.mode {
            SeekMode::Absolute => SeekFrom::Start(bytes as u64),
            SeekMode::RelativeToCurrent => SeekFrom::Current(bytes),
            SeekMode::FromEnd => SeekFrom::End(bytes),
        }
    }
}

/// Checks `position` under `mode` for a file of `len` records whose cursor
/// sits at record `current`.
pub fn resolve(position: i64, mode: SeekMode, current: u64, len: u64) -> Result<Resolved> {
    let pos = i128::from(position);
    let cur = i128::from(current);
    let end = i128::from(len);

    let valid = match mode {
        SeekMode::Absolute => 0 <= pos && pos < end,
        SeekMode::RelativeToCurrent => 0 <= cur + pos && cur + pos < end,
        SeekMode::FromEnd => -end < pos && pos <= 0,
    };

    if valid {
        return Ok(Resolved { position, mode });
    }

    if mode == SeekMode::Absolute && position < 0 {
        trace!(position, "negative absolute position, resolving from end");
        return resolve(position, SeekMode::FromEnd, current, len);
    }

    Err(RecfileError::OutOfRange { position, mode, len })
}
