//! I/O abstractions for chunk storage:
//! - [`ReadAt`]: positional reader able to fetch a byte range from a file or buffer.
//! - [`SealingWrite`]: sequential writer with a `seal()` operation committing the
//!   written data.
//!
//! Memory-based and file-based implementations are provided.

use std::ops::Range;
use std::sync::Arc;

pub mod file;
pub mod memory;

pub use file::{FileReader, FileWriter};

/// A conceptual file or buffer that supports reading from arbitrary positions.
pub trait ReadAt: Send + Sync + 'static {
    /// Returns the size of the underlying object.
    fn size(&self) -> std::io::Result<u64>;

    /// Reads the specified byte range.
    ///
    /// **NOTE**: `read_at` must not return a short read unless the range
    /// extends beyond the end of the object, in which case the result is
    /// clamped to the available bytes.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>>;
}

impl<T: ReadAt + ?Sized> ReadAt for Arc<T> {
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        self.as_ref().read_at(range)
    }
}

/// A sequential, append-only sink with explicit sealing semantics.
///
/// Unlike plain [`std::io::Write`], written data is only guaranteed to be
/// observable by readers after [`seal`](SealingWrite::seal) returns.
pub trait SealingWrite: Send {
    /// Appends the entire buffer to the sink. Either all bytes are written
    /// or an error is returned with no partial write observed.
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Flushes and commits all previously written data.
    fn seal(&mut self) -> std::io::Result<()>;
}

impl<W: SealingWrite + ?Sized> SealingWrite for &mut W {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        (**self).write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        (**self).seal()
    }
}
