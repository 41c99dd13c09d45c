//! Memory-backed implementations of the I/O traits.

use std::ops::Range;
use std::sync::Arc;

use crate::{ReadAt, SealingWrite};

impl ReadAt for Vec<u8> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        Ok(slice_clamped(self, range))
    }
}

/// A cheaply cloneable, immutable in-memory chunk image.
#[derive(Debug, Clone)]
pub struct SharedBuffer(Arc<Vec<u8>>);

impl SharedBuffer {
    pub fn new(data: Vec<u8>) -> SharedBuffer {
        SharedBuffer(Arc::new(data))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SharedBuffer {
    fn from(data: Vec<u8>) -> SharedBuffer {
        SharedBuffer::new(data)
    }
}

impl ReadAt for SharedBuffer {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.0.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        Ok(slice_clamped(&self.0, range))
    }
}

impl SealingWrite for Vec<u8> {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }

    fn seal(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn slice_clamped(data: &[u8], range: Range<u64>) -> Vec<u8> {
    assert!(range.end >= range.start);
    let pos = range.start as usize;
    if pos >= data.len() {
        return Vec::new();
    }
    let end = std::cmp::min(range.end as usize, data.len());
    data[pos..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_read_at() {
        let data: Vec<u8> = (0u8..100).collect();
        assert_eq!(data.size().unwrap(), 100);
        assert_eq!(data.read_at(10..20).unwrap(), (10u8..20).collect::<Vec<_>>());
        // Range past the end is clamped, not an error.
        assert_eq!(data.read_at(90..200).unwrap().len(), 10);
        assert!(data.read_at(200..210).unwrap().is_empty());
    }

    #[test]
    fn test_shared_buffer_read_at() {
        let buf = SharedBuffer::new((0u8..50).collect());
        let clone = buf.clone();
        assert_eq!(buf.read_at(0..5).unwrap(), clone.read_at(0..5).unwrap());
    }

    #[test]
    fn test_vec_sealing_write() {
        let mut sink: Vec<u8> = Vec::new();
        sink.write_all(b"abc").unwrap();
        sink.write_all(b"def").unwrap();
        sink.seal().unwrap();
        assert_eq!(&sink, b"abcdef");
    }
}
