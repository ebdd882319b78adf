//! Schema compilation.
//!
//! A schema is an ordered list of field type tags. Compiling it yields a
//! `Layout`: the byte offset and width of each field and the width of a whole
//! record. The layout is fixed once compiled; every record of a file shares it.
//!
//! Two layouts exist for the same schema. `Padding::Separator` leaves one
//! unused byte between every pair of adjacent fields, which is the layout
//! existing record files were written with:
//!
//!   (char, integer)   c x i i i i        -> 6 bytes
//!
//! `Padding::Packed` drops the separators:
//!
//!   (char, integer)   c i i i i          -> 5 bytes

use std::fmt;

use tracing::debug;

use crate::errors::RecfileError;
use crate::errors::Result;
use crate::storage::format::FieldType;
use crate::storage::format::SEPARATOR_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    #[default]
    Separator,
    Packed,
}

impl Padding {
    fn gap(&self) -> usize {
        match self {
            Padding::Separator => SEPARATOR_SIZE,
            Padding::Packed => 0,
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Padding::Separator => write!(f, "separated"),
            Padding::Packed => write!(f, "packed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    fields: Vec<FieldType>,
    offsets: Vec<usize>,
    width: usize,
    padding: Padding,
}

impl Layout {
    /// Compiles a schema given as type tags, e.g. `["char", "integer"]`.
    pub fn compile<S: AsRef<str>>(tags: &[S], padding: Padding) -> Result<Self> {
        let fields =
            tags
            .iter()
            .map(|tag| tag.as_ref().parse::<FieldType>())
            .collect::<Result<Vec<_>>>()?;

        Self::new(fields, padding)
    }

    pub fn new(fields: Vec<FieldType>, padding: Padding) -> Result<Self> {
        if fields.is_empty() {
            return Err(RecfileError::EmptySchema);
        }

        let mut offsets = Vec::with_capacity(fields.len());
        let mut offset = 0;
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                offset += padding.gap();
            }
            offsets.push(offset);
            offset += field.size();
        }

        let layout = Layout { fields, offsets, width: offset, padding };
        debug!(layout = %layout, "compiled record layout");
        Ok(layout)
    }

    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_width(&self, index: usize) -> Option<usize> {
        self.fields.get(index).map(FieldType::size)
    }

    pub fn offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }

    /// Total bytes per record, separators included.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(FieldType::name).collect();
        write!(f, "({}) {} bytes, {}", names.join(", "), self.width, self.padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_inserts_a_separator_between_adjacent_fields() {
        let layout = Layout::compile(&["char", "integer"], Padding::Separator).unwrap();
        assert_eq!(layout.field_count(), 2);
        assert_eq!(layout.offset(0), Some(0));
        assert_eq!(layout.offset(1), Some(2));
        assert_eq!(layout.width(), 6);
    }

    #[test]
    fn it_packs_fields_tightly_when_asked() {
        let layout = Layout::compile(&["char", "integer"], Padding::Packed).unwrap();
        assert_eq!(layout.offset(1), Some(1));
        assert_eq!(layout.width(), 5);
    }

    #[test]
    fn it_keeps_string_slots_contiguous() {
        let layout =
            Layout::compile(&["boolean", "string", "double"], Padding::Separator)
            .unwrap();
        // 1 + sep + 255 + sep + 8
        assert_eq!(layout.offset(1), Some(2));
        assert_eq!(layout.offset(2), Some(258));
        assert_eq!(layout.width(), 266);
        assert_eq!(layout.field_width(1), Some(255));
        assert_eq!(layout.field_width(3), None);
    }

    #[test]
    fn it_has_no_separator_for_a_single_field() {
        let layout = Layout::compile(&["long"], Padding::Separator).unwrap();
        assert_eq!(layout.width(), std::mem::size_of::<isize>());
    }

    #[test]
    fn it_fails_on_unknown_or_missing_fields() {
        let err = Layout::compile(&["integer", "decimal"], Padding::Separator).unwrap_err();
        assert!(matches!(err, RecfileError::UnknownFieldType(tag) if tag == "decimal"));

        let empty: [&str; 0] = [];
        let err = Layout::compile(&empty, Padding::Packed).unwrap_err();
        assert!(matches!(err, RecfileError::EmptySchema));
    }

    #[test]
    fn it_describes_itself() {
        let layout = Layout::compile(&["real", "char"], Padding::Packed).unwrap();
        assert_eq!(layout.to_string(), "(double, char) 9 bytes, packed");
    }
}
