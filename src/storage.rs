pub mod format;
pub mod sizedbuf;
pub mod layout;
pub mod record;
pub mod addressing;
pub mod slice;
pub mod file;
