use std::fmt;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::ops::Deref;
use std::ops::DerefMut;
use std::path::Path;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::errors::RecfileError;
use crate::errors::Result;
use crate::storage::addressing;
use crate::storage::addressing::SeekMode;
use crate::storage::layout::Layout;
use crate::storage::layout::Padding;
use crate::storage::record::Record;
use crate::storage::record::Value;
use crate::storage::slice::RecordSlice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Existing file, read only.
    #[default]
    Read,
    /// Existing file, read and write.
    ReadWrite,
    /// Create the file or truncate it, read and write.
    Create,
}

impl OpenMode {
    fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::ReadWrite => options.read(true).write(true),
            OpenMode::Create => options.read(true).write(true).create(true).truncate(true),
        };
        options
    }
}

pub struct StructuredFileBuilder {
    tags: Vec<String>,
    mode: OpenMode,
    padding: Padding,
}

impl StructuredFileBuilder {
    pub fn new<S: AsRef<str>>(tags: &[S]) -> Self {
        StructuredFileBuilder {
            tags: tags.iter().map(|tag| tag.as_ref().to_string()).collect(),
            mode: OpenMode::default(),
            padding: Padding::default(),
        }
    }

    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<StructuredFile<File>> {
        let layout = Layout::compile(self.tags.as_slice(), self.padding)?;
        let path = path.as_ref();
        let file = self.mode.options().open(path)?;

        debug!(path = %path.display(), mode = ?self.mode, %layout, "opened record file");

        Ok(StructuredFile {
            name: path.display().to_string(),
            layout,
            storage: file,
        })
    }

    /// Wraps an already open store. The open mode does not apply here.
    pub fn with_storage<S, N>(self, name: N, storage: S) -> Result<StructuredFile<S>>
    where
        S: Read + Write + Seek,
        N: Into<String>,
    {
        let layout = Layout::compile(self.tags.as_slice(), self.padding)?;
        Ok(StructuredFile { name: name.into(), layout, storage })
    }

    /// Opens `path`, runs `f` on it from record 0 and closes it afterwards,
    /// whether `f` succeeds or not.
    pub fn scoped<P, T, E, F>(self, path: P, f: F) -> std::result::Result<T, E>
    where
        P: AsRef<Path>,
        E: From<RecfileError>,
        F: FnOnce(&mut StructuredFile<File>) -> std::result::Result<T, E>,
    {
        self.open(path)?.scoped(f)
    }
}

/// A flat file of equal width records, addressed by record position.
///
/// The accessor owns the underlying handle and its cursor. Every public
/// position is in records; the byte cursor is `position * record_size()`.
/// The file has no header: its length in records is its byte size divided by
/// the record width, so a trailing partial record is not counted, and reading
/// it fails.
pub struct StructuredFile<S = File> {
    name: String,
    layout: Layout,
    storage: S,
}

impl StructuredFile<File> {
    pub fn open<P, T>(path: P, tags: &[T], mode: OpenMode) -> Result<Self>
    where
        P: AsRef<Path>,
        T: AsRef<str>,
    {
        StructuredFileBuilder::new(tags).mode(mode).open(path)
    }
}

impl<S: Read + Write + Seek> StructuredFile<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn record_size(&self) -> usize {
        self.layout.width()
    }

    fn width(&self) -> u64 {
        self.layout.width() as u64
    }

    /// Number of whole records in the file. The cursor is left where it was.
    pub fn len(&mut self) -> Result<u64> {
        let mut file = self.preserving_cursor()?;
        let size = file.storage.seek(SeekFrom::End(0))?;
        Ok(size / file.width())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Moves the cursor to `position` interpreted under `mode` and returns the
    /// new record position. See `addressing::resolve` for the accepted ranges.
    pub fn seek(&mut self, position: i64, mode: SeekMode) -> Result<u64> {
        let len = self.len()?;
        let current = self.tell()?;
        let resolved = addressing::resolve(position, mode, current, len)?;

        trace!(position, %mode, resolved = ?resolved, "seek");
        self.storage.seek(resolved.seek_from(self.layout.width()))?;
        self.tell()
    }

    pub fn forward(&mut self, n: i64) -> Result<u64> {
        self.seek(n, SeekMode::RelativeToCurrent)
    }

    pub fn backward(&mut self, n: i64) -> Result<u64> {
        self.forward(-n)
    }

    /// Moves to `n` records before the end. `tail(0)` is one past the last
    /// record.
    pub fn tail(&mut self, n: i64) -> Result<u64> {
        self.seek(-n, SeekMode::FromEnd)
    }

    /// Moves to the first byte without any range check, so it also works on
    /// an empty file.
    pub fn rewind(&mut self) -> Result<()> {
        self.storage.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    pub fn tell(&mut self) -> Result<u64> {
        let offset = self.storage.stream_position()?;
        Ok(offset / self.width())
    }

    pub fn eof(&mut self) -> Result<bool> {
        Ok(self.tell()? == self.len()?)
    }

    /// Reads the record at the cursor and advances past it. Returns `None`
    /// when fewer than a record's worth of bytes remain.
    pub fn read_next(&mut self) -> Result<Option<Record>> {
        let mut buf = vec![0u8; self.layout.width()];
        let filled = fill(&mut self.storage, &mut buf)?;

        if filled < buf.len() {
            if filled > 0 {
                trace!(filled, width = buf.len(), "partial trailing record");
            }
            return Ok(None);
        }

        Record::decode(&buf, &self.layout).map(Some)
    }

    /// Like `read_next` but running out of data is a `DecodingError`.
    pub fn read(&mut self) -> Result<Record> {
        let position = self.tell()?;
        self.read_next()?.ok_or_else(|| {
            RecfileError::DecodingError(format!("no complete record at position {}", position))
        })
    }

    /// Encodes `values` and writes them at the cursor as one buffer. No range
    /// check applies, so writing at the end grows the file.
    pub fn write(&mut self, values: &[Value]) -> Result<()> {
        let buf = Record::encode(values, &self.layout)?;
        self.storage.write_all(buf.get())?;
        Ok(())
    }

    /// Writes a record after the last whole record and returns its position.
    /// A trailing partial record is overwritten.
    pub fn append(&mut self, values: &[Value]) -> Result<u64> {
        let buf = Record::encode(values, &self.layout)?;
        let position = self.len()?;
        self.storage.seek(SeekFrom::Start(position * self.width()))?;
        self.storage.write_all(buf.get())?;
        debug!(position, "appended record");
        Ok(position)
    }

    pub fn get(&mut self, position: i64) -> Result<Record> {
        self.seek(position, SeekMode::Absolute)?;
        self.read()
    }

    pub fn get_slice<R: Into<RecordSlice>>(&mut self, slice: R) -> Result<Vec<Record>> {
        let len = self.len()?;
        slice
            .into()
            .indices(len)?
            .map(|position| self.get(position as i64))
            .collect()
    }

    pub fn set(&mut self, position: i64, values: &[Value]) -> Result<()> {
        let buf = Record::encode(values, &self.layout)?;
        self.seek(position, SeekMode::Absolute)?;
        self.storage.write_all(buf.get())?;
        Ok(())
    }

    /// Writes the same record at every position the slice selects.
    pub fn set_slice<R: Into<RecordSlice>>(&mut self, slice: R, values: &[Value]) -> Result<()> {
        let buf = Record::encode(values, &self.layout)?;
        let len = self.len()?;
        let mut written = 0;
        for position in slice.into().indices(len)? {
            self.seek(position as i64, SeekMode::Absolute)?;
            self.storage.write_all(buf.get())?;
            written += 1;
        }
        debug!(written, "broadcast record over slice");
        Ok(())
    }

    /// Scans the whole file for a record equal to `values`. The cursor is
    /// restored afterwards, found or not.
    pub fn contains(&mut self, values: &[Value]) -> Result<bool> {
        // round trip so the target compares like a decoded record would
        let encoded = Record::encode(values, &self.layout)?;
        let target = Record::decode(encoded.get(), &self.layout)?;

        let mut file = self.preserving_cursor()?;
        file.rewind()?;

        let mut scanned = 0u64;
        while let Some(record) = file.read_next()? {
            if record == target {
                debug!(position = scanned, "record found");
                return Ok(true);
            }
            scanned += 1;
        }

        debug!(scanned, "record not found");
        Ok(false)
    }

    /// Iterates records from the cursor forward. Stops cleanly when no whole
    /// record is left; the cursor stays where iteration ended.
    pub fn iter(&mut self) -> Records<'_, S> {
        let remaining = match (self.len(), self.storage.stream_position()) {
            (Ok(len), Ok(offset)) => {
                let exact = offset % self.width() == 0;
                Some((len.saturating_sub(offset / self.width()), exact))
            },
            _ => None,
        };

        Records { file: self, remaining, done: false }
    }

    /// Runs `f` from record 0 and closes the file afterwards, on success and
    /// on failure alike. An error from `f` takes precedence over one from
    /// closing.
    pub fn scoped<T, E, F>(mut self, f: F) -> std::result::Result<T, E>
    where
        E: From<RecfileError>,
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
    {
        let result = match self.rewind() {
            Ok(()) => f(&mut self),
            Err(err) => Err(err.into()),
        };
        let closed = self.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Flushes and releases the underlying handle.
    pub fn close(mut self) -> Result<()> {
        self.storage.flush()?;
        debug!(name = %self.name, "closed record file");
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    fn preserving_cursor(&mut self) -> Result<CursorGuard<'_, S>> {
        let saved = self.storage.stream_position()?;
        Ok(CursorGuard { file: self, saved })
    }
}

impl<S> fmt::Display for StructuredFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<S> fmt::Debug for StructuredFile<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredFile")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .finish()
    }
}

impl<'a, S: Read + Write + Seek> IntoIterator for &'a mut StructuredFile<S> {
    type Item = Result<Record>;
    type IntoIter = Records<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Restores the byte cursor it was created with when dropped.
struct CursorGuard<'a, S: Read + Write + Seek> {
    file: &'a mut StructuredFile<S>,
    saved: u64,
}

impl<S: Read + Write + Seek> Deref for CursorGuard<'_, S> {
    type Target = StructuredFile<S>;

    fn deref(&self) -> &Self::Target {
        &*self.file
    }
}

impl<S: Read + Write + Seek> DerefMut for CursorGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.file
    }
}

impl<S: Read + Write + Seek> Drop for CursorGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.file.storage.seek(SeekFrom::Start(self.saved)) {
            warn!(offset = self.saved, %err, "could not restore cursor");
        }
    }
}

pub struct Records<'a, S: Read + Write + Seek> {
    file: &'a mut StructuredFile<S>,
    /// records left and whether the cursor started on a record boundary
    remaining: Option<(u64, bool)>,
    done: bool,
}

impl<S: Read + Write + Seek> Iterator for Records<'_, S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.file.read_next() {
            Ok(Some(record)) => {
                if let Some((remaining, _)) = self.remaining.as_mut() {
                    *remaining = remaining.saturating_sub(1);
                }
                Some(Ok(record))
            },
            Ok(None) => {
                trace!(name = %self.file.name, "end of records");
                self.done = true;
                None
            },
            Err(err) => {
                self.done = true;
                Some(Err(err))
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }

        match self.remaining {
            Some((remaining, exact)) => {
                let n = usize::try_from(remaining).unwrap_or(usize::MAX);
                (if exact { n } else { 0 }, Some(n))
            },
            None => (0, None),
        }
    }
}

/// Reads until `buf` is full or the store runs dry, returning the bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
