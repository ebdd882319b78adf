use std::fmt;
use std::ops::Deref;

use crate::errors::RecfileError;
use crate::errors::Result;
use crate::storage::format::FieldType;
use crate::storage::format::STRING_SIZE;
use crate::storage::layout::Layout;
use crate::storage::sizedbuf::SizedBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Long(isize),
    Float(f32),
    Double(f64),
    Char(u8),
    Boolean(bool),
    /// Raw bytes of a `string` field. Decoded values always carry the full
    /// 255 bytes, NUL padded.
    String(Vec<u8>),
}

impl Value {
    /// Builds a `string` value padded with NULs to the full field width.
    /// Input longer than the field is kept as is and rejected on encode.
    pub fn string<B: AsRef<[u8]>>(bytes: B) -> Self {
        let mut data = bytes.as_ref().to_vec();
        if data.len() < STRING_SIZE {
            data.resize(STRING_SIZE, 0);
        }
        Value::String(data)
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Integer(_) => FieldType::Integer,
            Value::Long(_) => FieldType::Long,
            Value::Float(_) => FieldType::Float,
            Value::Double(_) => FieldType::Double,
            Value::Char(_) => FieldType::Char,
            Value::Boolean(_) => FieldType::Boolean,
            Value::String(_) => FieldType::String,
        }
    }

    /// Parses the textual form of a value of type `field_type`.
    pub fn parse(field_type: FieldType, s: &str) -> Result<Self> {
        let mismatch = || {
            RecfileError::EncodingError(format!("expected {}, got '{}'", field_type, s))
        };

        let value = match field_type {
            FieldType::Integer => Value::Integer(s.parse().map_err(|_| mismatch())?),
            FieldType::Long => Value::Long(s.parse().map_err(|_| mismatch())?),
            FieldType::Float => Value::Float(s.parse().map_err(|_| mismatch())?),
            FieldType::Double => Value::Double(s.parse().map_err(|_| mismatch())?),
            FieldType::Char => {
                match s.as_bytes() {
                    [byte] => Value::Char(*byte),
                    _ => return Err(mismatch()),
                }
            },
            FieldType::Boolean => {
                match s {
                    "true" | "1" => Value::Boolean(true),
                    "false" | "0" => Value::Boolean(false),
                    _ => return Err(mismatch()),
                }
            },
            FieldType::String => {
                if s.len() > STRING_SIZE {
                    return Err(RecfileError::EncodingError(
                        format!("string of {} bytes does not fit in {}", s.len(), STRING_SIZE)
                    ));
                }
                Value::string(s)
            },
        };

        Ok(value)
    }
}

impl From<i32> for Value {
    fn from(val: i32) -> Self {
        Value::Integer(val)
    }
}

impl From<isize> for Value {
    fn from(val: isize) -> Self {
        Value::Long(val)
    }
}

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Value::Float(val)
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Double(val)
    }
}

impl From<u8> for Value {
    fn from(val: u8) -> Self {
        Value::Char(val)
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Boolean(val)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::string(val)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(val) => write!(f, "{}", val),
            Value::Long(val) => write!(f, "{}", val),
            Value::Float(val) => write!(f, "{}", val),
            Value::Double(val) => write!(f, "{}", val),
            Value::Char(val) => write!(f, "'{}'", val.escape_ascii()),
            Value::Boolean(val) => write!(f, "{}", val),
            Value::String(bytes) => {
                let end =
                    bytes
                    .iter()
                    .rposition(|b| *b != 0)
                    .map_or(0, |i| i + 1);
                write!(f, "{:?}", String::from_utf8_lossy(&bytes[..end]))
            },
        }
    }
}

/// One decoded record: a value per schema field, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Record { values }
    }
}

impl Deref for Record {
    type Target = [Value];

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

impl PartialEq<[Value]> for Record {
    fn eq(&self, other: &[Value]) -> bool {
        self.values.as_slice() == other
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

impl Record {
    /// Packs `input` into a buffer of exactly `layout.width()` bytes.
    /// Separator bytes are left zeroed.
    pub fn encode(input: &[Value], layout: &Layout) -> Result<SizedBuf> {
        if input.len() != layout.field_count() {
            return Err(RecfileError::EncodingError(
                format!("expected {} values, got {}", layout.field_count(), input.len())
            ));
        }

        let mut buf = SizedBuf::new(layout.width());
        for (i, (field, value)) in layout.fields().iter().zip(input).enumerate() {
            let offset = layout.offset(i).unwrap_or_default();

            match (field, value) {
                (FieldType::Integer, Value::Integer(val)) => {
                    buf.write_i32_offset(offset, *val);
                },
                (FieldType::Long, Value::Long(val)) => {
                    buf.write_isize_offset(offset, *val);
                },
                (FieldType::Float, Value::Float(val)) => {
                    buf.write_f32_offset(offset, *val);
                },
                (FieldType::Double, Value::Double(val)) => {
                    buf.write_f64_offset(offset, *val);
                },
                (FieldType::Char, Value::Char(val)) => {
                    buf.write_u8_offset(offset, *val);
                },
                (FieldType::Boolean, Value::Boolean(val)) => {
                    buf.write_bool_offset(offset, *val);
                },
                (FieldType::String, Value::String(val)) => {
                    if val.len() > STRING_SIZE {
                        return Err(RecfileError::EncodingError(
                            format!("record position {} string of {} bytes exceeds {}", i, val.len(), STRING_SIZE)
                        ));
                    }
                    buf.write_bytes_offset(offset, val, STRING_SIZE);
                },
                (field, value) => {
                    return Err(RecfileError::EncodingError(
                        format!("record position {} expected type {}, got {}", i, field, value.field_type())
                    ));
                },
            }
        }

        Ok(buf)
    }

    /// Unpacks one record. `buf` must hold exactly `layout.width()` bytes.
    pub fn decode(buf: &[u8], layout: &Layout) -> Result<Self> {
        if buf.len() != layout.width() {
            return Err(RecfileError::DecodingError(
                format!("expected {} bytes, got {}", layout.width(), buf.len())
            ));
        }

        let buf = SizedBuf::from(buf.to_vec());
        let mut values = Vec::with_capacity(layout.field_count());
        for (i, field) in layout.fields().iter().enumerate() {
            let offset = layout.offset(i).unwrap_or_default();

            let value = match field {
                FieldType::Integer => Value::Integer(buf.read_i32_offset(offset).1),
                FieldType::Long => Value::Long(buf.read_isize_offset(offset).1),
                FieldType::Float => Value::Float(buf.read_f32_offset(offset).1),
                FieldType::Double => Value::Double(buf.read_f64_offset(offset).1),
                FieldType::Char => Value::Char(buf.read_u8_offset(offset).1),
                FieldType::Boolean => Value::Boolean(buf.read_bool_offset(offset).1),
                FieldType::String => Value::String(buf.read_bytes_offset(offset, STRING_SIZE).1),
            };
            values.push(value);
        }

        Ok(Record { values })
    }
}
