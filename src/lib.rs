pub mod storage;
pub mod shell;

pub use storage::file::StructuredFile;
pub use storage::file::StructuredFileBuilder;
pub use storage::file::OpenMode;
pub use storage::layout::Layout;
pub use storage::layout::Padding;
pub use storage::format::FieldType;
pub use storage::record::Record;
pub use storage::record::Value;
pub use storage::addressing::SeekMode;
pub use storage::slice::RecordSlice;

pub mod errors {
    use std::io;

    use thiserror::Error;

    use crate::storage::addressing::SeekMode;

    pub type Result<T> = std::result::Result<T, RecfileError>;

    #[derive(Debug, Error)]
    pub enum RecfileError {
        #[error("unknown field type: {0}")]
        UnknownFieldType(String),
        #[error("schema has no fields")]
        EmptySchema,
        #[error("position {position} out of range for mode {mode} (length {len})")]
        OutOfRange {
            position: i64,
            mode: SeekMode,
            len: u64,
        },
        #[error("type error: {0}")]
        TypeMismatch(String),
        #[error("encoding error: {0}")]
        EncodingError(String),
        #[error("decoding error: {0}")]
        DecodingError(String),
        #[error("invalid slice: {0}")]
        InvalidSlice(String),
        #[error("{0}")]
        CLIError(String),
        #[error(transparent)]
        Io(#[from] io::Error),
    }
}
