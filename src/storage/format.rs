use std::fmt;
use std::mem;
use std::str::FromStr;

use crate::errors::RecfileError;

pub const BYTE_SIZE: usize = mem::size_of::<u8>();
pub const I32_SIZE: usize = mem::size_of::<i32>();
pub const F32_SIZE: usize = mem::size_of::<f32>();
pub const F64_SIZE: usize = mem::size_of::<f64>();
pub const ISIZE_SIZE: usize = mem::size_of::<isize>();

/// Width of a `string` field. Stored as that many consecutive single byte
/// slots, with no separator between them.
pub const STRING_SIZE: usize = 255;

/// Width of the separator written between adjacent fields of a record laid
/// out with `Padding::Separator`. The byte is never populated on write and
/// never inspected on read.
pub const SEPARATOR_SIZE: usize = 1;

////////////////////////////////////////////////////////////////////////////////
/// Field types
////////////////////////////////////////////////////////////////////////////////

/// The closed table of field type tags a schema can name.
///
///   tag        width         value
///   integer    4             i32
///   long       native word   isize
///   float      4             f32
///   double     8             f64  (alias: real)
///   char       1             u8
///   boolean    1             bool
///   string     255           [u8; 255]
///
/// Numeric values use the host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Long,
    Float,
    Double,
    Char,
    Boolean,
    String,
}

impl FieldType {
    pub fn size(&self) -> usize {
        match self {
            FieldType::Integer => I32_SIZE,
            FieldType::Long => ISIZE_SIZE,
            FieldType::Float => F32_SIZE,
            FieldType::Double => F64_SIZE,
            FieldType::Char => BYTE_SIZE,
            FieldType::Boolean => BYTE_SIZE,
            FieldType::String => STRING_SIZE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Char => "char",
            FieldType::Boolean => "boolean",
            FieldType::String => "string",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FieldType {
    type Err = RecfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" => Ok(FieldType::Integer),
            "long" => Ok(FieldType::Long),
            "float" => Ok(FieldType::Float),
            "double" | "real" => Ok(FieldType::Double),
            "char" => Ok(FieldType::Char),
            "boolean" => Ok(FieldType::Boolean),
            "string" => Ok(FieldType::String),
            _ => Err(RecfileError::UnknownFieldType(s.to_string())),
        }
    }
}
