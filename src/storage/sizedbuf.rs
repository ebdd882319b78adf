use crate::storage::format::BYTE_SIZE;
use crate::storage::format::F32_SIZE;
use crate::storage::format::F64_SIZE;
use crate::storage::format::I32_SIZE;
use crate::storage::format::ISIZE_SIZE;

/// Fixed length byte buffer holding exactly one record.
///
/// The offset based readers and writers return the offset just past the
/// value so calls can be chained field by field. Offsets come from a compiled
/// `Layout` and are always in bounds for a buffer of the layout's width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedBuf {
    size: usize,
    data: Vec<u8>,
}

impl From<Vec<u8>> for SizedBuf {
    fn from(data: Vec<u8>) -> Self {
        let size = data.len();
        SizedBuf { size, data }
    }
}

impl SizedBuf {
    pub fn new(size: usize) -> Self {
        let data = vec![0u8; size];
        SizedBuf { size, data }
    }

    pub fn get(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn read_array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[offset..offset + N]);
        bytes
    }

    fn write_slice(&mut self, offset: usize, bytes: &[u8]) -> usize {
        let end = offset + bytes.len();
        self.data[offset..end].copy_from_slice(bytes);
        end
    }

    // ------ primitive reads/writes ------

    pub fn read_u8_offset(&self, offset: usize) -> (usize, u8) {
        (offset + BYTE_SIZE, self.data[offset])
    }

    pub fn write_u8_offset(&mut self, offset: usize, val: u8) -> usize {
        self.data[offset] = val;
        offset + BYTE_SIZE
    }

    pub fn read_bool_offset(&self, offset: usize) -> (usize, bool) {
        let (end, byte) = self.read_u8_offset(offset);
        (end, byte != 0)
    }

    pub fn write_bool_offset(&mut self, offset: usize, val: bool) -> usize {
        self.write_u8_offset(offset, val as u8)
    }

    pub fn read_i32_offset(&self, offset: usize) -> (usize, i32) {
        let bytes = self.read_array::<I32_SIZE>(offset);
        (offset + I32_SIZE, i32::from_ne_bytes(bytes))
    }

    pub fn write_i32_offset(&mut self, offset: usize, val: i32) -> usize {
        self.write_slice(offset, &val.to_ne_bytes())
    }

    pub fn read_isize_offset(&self, offset: usize) -> (usize, isize) {
        let bytes = self.read_array::<ISIZE_SIZE>(offset);
        (offset + ISIZE_SIZE, isize::from_ne_bytes(bytes))
    }

    pub fn write_isize_offset(&mut self, offset: usize, val: isize) -> usize {
        self.write_slice(offset, &val.to_ne_bytes())
    }

    pub fn read_f32_offset(&self, offset: usize) -> (usize, f32) {
        let bytes = self.read_array::<F32_SIZE>(offset);
        (offset + F32_SIZE, f32::from_ne_bytes(bytes))
    }

    pub fn write_f32_offset(&mut self, offset: usize, val: f32) -> usize {
        self.write_slice(offset, &val.to_ne_bytes())
    }

    pub fn read_f64_offset(&self, offset: usize) -> (usize, f64) {
        let bytes = self.read_array::<F64_SIZE>(offset);
        (offset + F64_SIZE, f64::from_ne_bytes(bytes))
    }

    pub fn write_f64_offset(&mut self, offset: usize, val: f64) -> usize {
        self.write_slice(offset, &val.to_ne_bytes())
    }

    // ------ fixed width byte block ------

    pub fn read_bytes_offset(&self, offset: usize, len: usize) -> (usize, Vec<u8>) {
        let end = offset + len;
        (end, self.data[offset..end].to_vec())
    }

    /// Writes `val` into a block of `len` bytes, zero filling the remainder.
    /// Callers make sure `val.len() <= len`.
    pub fn write_bytes_offset(&mut self, offset: usize, val: &[u8], len: usize) -> usize {
        let end = offset + len;
        self.write_slice(offset, val);
        self.data[offset + val.len()..end].fill(0);
        end
    }
}
