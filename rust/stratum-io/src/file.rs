//! File-backed implementations of the I/O traits.

use std::{
    fs::File,
    io::{BufWriter, Write},
    ops::Range,
    path::Path,
    sync::{Arc, OnceLock},
};

use crate::{ReadAt, SealingWrite};

/// Positional reader over a [`File`].
///
/// The file size is fetched once and cached.
pub struct FileReader {
    file: Arc<File>,
    size: OnceLock<u64>,
}

impl FileReader {
    pub fn new(file: impl Into<Arc<File>>) -> FileReader {
        FileReader {
            file: file.into(),
            size: Default::default(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<FileReader> {
        Ok(FileReader::new(File::open(path)?))
    }

    fn get_size(&self) -> std::io::Result<u64> {
        if let Some(&size) = self.size.get() {
            Ok(size)
        } else {
            let size = self.file.metadata()?.len();
            let _ = self.size.set(size);
            Ok(size)
        }
    }
}

impl ReadAt for FileReader {
    fn size(&self) -> std::io::Result<u64> {
        self.get_size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        assert!(range.end >= range.start);
        let size = self.get_size()?;
        if range.start >= size || range.start == range.end {
            return Ok(Vec::new());
        }
        let end = std::cmp::min(range.end, size);
        let mut buf = vec![0u8; (end - range.start) as usize];
        read_exact_at(&self.file, range.start, &mut buf)?;
        Ok(buf)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, pos)
}

#[cfg(windows)]
fn read_exact_at(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut pos = pos;
    let mut buf = buf;
    while !buf.is_empty() {
        let n = file.seek_read(buf, pos)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "failed to fill whole buffer",
            ));
        }
        pos += n as u64;
        let rest = std::mem::take(&mut buf);
        buf = &mut rest[n..];
    }
    Ok(())
}

/// Sequential sink writing to a file through a [`BufWriter`]; `seal` flushes
/// and syncs.
pub struct FileWriter {
    writer: BufWriter<File>,
}

impl FileWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<FileWriter> {
        Ok(FileWriter {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl SealingWrite for FileWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReadAt;

    #[test]
    fn test_file_write_then_read_at() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk.bin");

        let mut writer = FileWriter::create(&path).unwrap();
        writer.write_all(&[1, 2, 3, 4, 5]).unwrap();
        writer.write_all(&[6, 7, 8]).unwrap();
        writer.seal().unwrap();

        let reader = FileReader::open(&path).unwrap();
        assert_eq!(reader.size().unwrap(), 8);
        assert_eq!(reader.read_at(2..6).unwrap(), vec![3, 4, 5, 6]);
        assert_eq!(reader.read_at(6..100).unwrap(), vec![7, 8]);
        assert!(reader.read_at(8..9).unwrap().is_empty());
    }
}
