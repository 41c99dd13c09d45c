//! Decoding of the dictionary page and of dictionary-coded value pages.

use byteorder::{ByteOrder, LittleEndian};

use stratum_common::{Result, error::Error};
use stratum_format::schema::BasicTypeDescriptor;
use stratum_sequence::{batch::ValueBatch, offsets::Offsets, values::Values};

/// The materialized dictionary of one column chunk.
///
/// Entries are kept in storage order, so an entry's position is the code
/// that dictionary-coded pages use to reference it. The dictionary is
/// owned by the chunk reader, built once, and immutable afterwards.
#[derive(Debug)]
pub struct ValueDictionary {
    values: Values,
    offsets: Option<Offsets>,
    type_desc: BasicTypeDescriptor,
    entry_count: usize,
}

impl ValueDictionary {
    /// Decodes a dictionary page body into a lookup table of `entry_count`
    /// entries.
    ///
    /// Fixed-size types are a contiguous stride array; variable-size types
    /// are `len:u32 payload` per entry. The body must be consumed exactly.
    pub fn decode(
        data: &[u8],
        entry_count: usize,
        type_desc: BasicTypeDescriptor,
    ) -> Result<ValueDictionary> {
        let mut values = Values::with_byte_capacity(data.len());
        let offsets = if let Some(size) = type_desc.primitive_size() {
            if data.len() != entry_count * size {
                return Err(Error::invalid_format(
                    "dictionary page",
                    format!(
                        "expected {} bytes for {entry_count} entries, found {}",
                        entry_count * size,
                        data.len()
                    ),
                ));
            }
            values.extend_from_byte_slice(data);
            None
        } else {
            let mut offsets = Offsets::with_capacity(entry_count);
            let mut pos = 0usize;
            for _ in 0..entry_count {
                if pos + 4 > data.len() {
                    return Err(Error::invalid_format(
                        "dictionary page",
                        "truncated entry length",
                    ));
                }
                let len = LittleEndian::read_u32(&data[pos..pos + 4]) as usize;
                pos += 4;
                if pos + len > data.len() {
                    return Err(Error::invalid_format(
                        "dictionary page",
                        "truncated entry payload",
                    ));
                }
                values.extend_from_byte_slice(&data[pos..pos + len]);
                offsets.push_length(len);
                pos += len;
            }
            if pos != data.len() {
                return Err(Error::invalid_format(
                    "dictionary page",
                    format!("{} trailing bytes after last entry", data.len() - pos),
                ));
            }
            Some(offsets)
        };
        Ok(ValueDictionary {
            values,
            offsets,
            type_desc,
            entry_count,
        })
    }

    /// Number of entries; valid codes are `0..len()`.
    #[inline]
    pub fn len(&self) -> usize {
        self.entry_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    pub fn type_desc(&self) -> BasicTypeDescriptor {
        self.type_desc
    }

    /// The value bytes for `code`.
    pub fn entry_bytes(&self, code: u32) -> Result<&[u8]> {
        let index = self.check_code(code)?;
        match (&self.offsets, self.type_desc.primitive_size()) {
            (Some(offsets), _) => Ok(&self.values.as_bytes()[offsets.range(index)]),
            (None, Some(size)) => Ok(&self.values.as_bytes()[index * size..(index + 1) * size]),
            (None, None) => unreachable!("variable-size dictionary without offsets"),
        }
    }

    /// Resolves `code` and appends the referenced value to `batch`.
    pub fn append_to_batch(&self, code: u32, batch: &mut ValueBatch) -> Result<()> {
        let bytes = self.entry_bytes(code)?;
        if self.offsets.is_some() {
            batch.push_binary(bytes);
        } else {
            batch.push_fixed(bytes);
        }
        Ok(())
    }

    fn check_code(&self, code: u32) -> Result<usize> {
        let index = code as usize;
        if index >= self.entry_count {
            return Err(Error::invalid_format(
                "dictionary code",
                format!("code {code} out of range for {} entries", self.entry_count),
            ));
        }
        Ok(index)
    }
}

/// Cursor over the `u32` codes of one dictionary-coded value page.
#[derive(Debug)]
pub struct CodesCursor {
    codes: Vec<u32>,
    pos: usize,
}

impl CodesCursor {
    /// Parses a value-page values section holding exactly `present_count`
    /// codes.
    pub fn new(data: &[u8], present_count: usize) -> Result<CodesCursor> {
        if data.len() != present_count * 4 {
            return Err(Error::invalid_format(
                "code page",
                format!(
                    "expected {} code bytes, found {}",
                    present_count * 4,
                    data.len()
                ),
            ));
        }
        let codes = data
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(CodesCursor { codes, pos: 0 })
    }

    /// The next code, or `None` when the page's codes are exhausted.
    #[inline]
    pub fn next(&mut self) -> Option<u32> {
        let code = self.codes.get(self.pos).copied();
        if code.is_some() {
            self.pos += 1;
        }
        code
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.codes.len() - self.pos
    }
}
