use std::fmt;
use std::ops::Range;
use std::ops::RangeFrom;
use std::ops::RangeFull;
use std::ops::RangeTo;
use std::str::FromStr;

use crate::errors::RecfileError;
use crate::errors::Result;

/// A `start:stop:step` selection of records. Missing bounds default to the
/// ends of the file, negative bounds count back from the end, and bounds
/// past either end are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordSlice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl RecordSlice {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        RecordSlice { start, stop, step }
    }

    pub fn with_step(self, step: i64) -> Self {
        RecordSlice { step: Some(step), ..self }
    }

    /// Expands the slice against a file of `len` records.
    pub fn indices(&self, len: u64) -> Result<SliceIndices> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(RecfileError::InvalidSlice("slice step cannot be zero".to_string()));
        }

        let len = i64::try_from(len)
            .map_err(|_| RecfileError::InvalidSlice(format!("length {} too large", len)))?;

        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clamp = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(b) if b < 0 => (b + len).max(lower),
            Some(b) => b.min(upper),
        };

        let start = clamp(self.start, if step < 0 { upper } else { lower });
        let stop = clamp(self.stop, if step < 0 { lower } else { upper });

        Ok(SliceIndices { next: start, stop, step })
    }
}

impl From<Range<i64>> for RecordSlice {
    fn from(range: Range<i64>) -> Self {
        RecordSlice::new(Some(range.start), Some(range.end), None)
    }
}

impl From<RangeFrom<i64>> for RecordSlice {
    fn from(range: RangeFrom<i64>) -> Self {
        RecordSlice::new(Some(range.start), None, None)
    }
}

impl From<RangeTo<i64>> for RecordSlice {
    fn from(range: RangeTo<i64>) -> Self {
        RecordSlice::new(None, Some(range.end), None)
    }
}

impl From<RangeFull> for RecordSlice {
    fn from(_: RangeFull) -> Self {
        RecordSlice::default()
    }
}

impl fmt::Display for RecordSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |b: Option<i64>| b.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}:{}", part(self.start), part(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{}", step)?;
        }
        Ok(())
    }
}

impl FromStr for RecordSlice {
    type Err = RecfileError;

    /// Parses `start:stop` or `start:stop:step`, any part may be empty.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(RecfileError::InvalidSlice(s.to_string()));
        }

        let bound = |part: &str| -> Result<Option<i64>> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            part
                .parse::<i64>()
                .map(Some)
                .map_err(|_| RecfileError::TypeMismatch(format!("slice bound '{}' is not an integer", part)))
        };

        let start = bound(parts[0])?;
        let stop = bound(parts[1])?;
        let step = match parts.get(2) {
            Some(part) => bound(*part)?,
            None => None,
        };

        Ok(RecordSlice { start, stop, step })
    }
}

/// The record positions a slice selects, in selection order.
#[derive(Debug, Clone)]
pub struct SliceIndices {
    next: i64,
    stop: i64,
    step: i64,
}

impl Iterator for SliceIndices {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        let more = if self.step > 0 { self.next < self.stop } else { self.next > self.stop };
        if !more {
            return None;
        }

        let current = self.next;
        // a step past the i64 range ends the walk
        self.next = self.next.checked_add(self.step).unwrap_or(self.stop);
        // clamping keeps every yielded index inside 0..len
        Some(current as u64)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let span = if self.step > 0 {
            self.stop - self.next
        } else {
            self.next - self.stop
        };
        let n = if span <= 0 {
            0
        } else {
            let step = u128::from(self.step.unsigned_abs());
            ((span as u128 + step - 1) / step) as usize
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for SliceIndices {}
