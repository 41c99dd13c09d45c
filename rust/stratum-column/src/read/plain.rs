//! Decoding of plain-encoded value pages.

use byteorder::{ByteOrder, LittleEndian};

use stratum_common::{Result, error::Error};
use stratum_format::schema::BasicTypeDescriptor;
use stratum_sequence::batch::ValueBatch;

/// Cursor over the inline values of one plain-encoded page.
///
/// Fixed-size types are a stride array and are validated up front;
/// variable-size values (`len:u32 payload`) are validated as the cursor
/// advances.
#[derive(Debug)]
pub struct PlainValuesCursor {
    data: Vec<u8>,
    pos: usize,
    type_desc: BasicTypeDescriptor,
    remaining: usize,
}

impl PlainValuesCursor {
    /// Creates a cursor over a values section holding `present_count`
    /// entries.
    pub fn new(
        data: Vec<u8>,
        present_count: usize,
        type_desc: BasicTypeDescriptor,
    ) -> Result<PlainValuesCursor> {
        if let Some(size) = type_desc.primitive_size() {
            if data.len() != present_count * size {
                return Err(Error::invalid_format(
                    "plain page",
                    format!(
                        "expected {} value bytes for {present_count} values, found {}",
                        present_count * size,
                        data.len()
                    ),
                ));
            }
        }
        Ok(PlainValuesCursor {
            data,
            pos: 0,
            type_desc,
            remaining: present_count,
        })
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Decodes the next `count` values into `batch`.
    ///
    /// Fixed-size runs are appended with a single bulk copy.
    pub fn append_run(&mut self, batch: &mut ValueBatch, count: usize) -> Result<()> {
        if count > self.remaining {
            return Err(Error::invalid_format(
                "plain page",
                format!("{count} values requested, {} left", self.remaining),
            ));
        }
        if let Some(size) = self.type_desc.primitive_size() {
            let end = self.pos + count * size;
            batch.extend_fixed(&self.data[self.pos..end]);
            self.pos = end;
        } else {
            for _ in 0..count {
                if self.pos + 4 > self.data.len() {
                    return Err(Error::invalid_format(
                        "plain page",
                        "truncated value length",
                    ));
                }
                let len = LittleEndian::read_u32(&self.data[self.pos..self.pos + 4]) as usize;
                self.pos += 4;
                if self.pos + len > self.data.len() {
                    return Err(Error::invalid_format(
                        "plain page",
                        "truncated value payload",
                    ));
                }
                batch.push_binary(&self.data[self.pos..self.pos + len]);
                self.pos += len;
            }
        }
        self.remaining -= count;
        Ok(())
    }

    /// Verifies the page's values section was consumed exactly.
    pub fn verify_exhausted(&self) -> Result<()> {
        if self.remaining != 0 || self.pos != self.data.len() {
            return Err(Error::invalid_format(
                "plain page",
                format!(
                    "{} values and {} bytes left after page rows were consumed",
                    self.remaining,
                    self.data.len() - self.pos
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_format::schema::{BasicType, BasicTypeDescriptor};

    fn int32_desc() -> BasicTypeDescriptor {
        BasicTypeDescriptor::new(BasicType::Int32, true)
    }

    fn string_desc() -> BasicTypeDescriptor {
        BasicTypeDescriptor::new(BasicType::String, false)
    }

    #[test]
    fn test_fixed_run_decode() {
        let data: Vec<u8> = [1i32, 2, 3, 4].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut cursor = PlainValuesCursor::new(data, 4, int32_desc()).unwrap();
        let mut batch = ValueBatch::empty(int32_desc());
        cursor.append_run(&mut batch, 3).unwrap();
        cursor.append_run(&mut batch, 1).unwrap();
        cursor.verify_exhausted().unwrap();
        assert_eq!(batch.values.as_slice::<i32>(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_fixed_size_mismatch() {
        let err = PlainValuesCursor::new(vec![0u8; 9], 2, int32_desc()).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_variable_decode() {
        let mut data = Vec::new();
        for value in ["ab", "", "xyz"] {
            data.extend_from_slice(&(value.len() as u32).to_le_bytes());
            data.extend_from_slice(value.as_bytes());
        }
        let mut cursor = PlainValuesCursor::new(data, 3, string_desc()).unwrap();
        let mut batch = ValueBatch::empty(string_desc());
        cursor.append_run(&mut batch, 3).unwrap();
        cursor.verify_exhausted().unwrap();
        assert_eq!(batch.binary_at(0), b"ab");
        assert_eq!(batch.binary_at(1), b"");
        assert_eq!(batch.binary_at(2), b"xyz");
    }

    #[test]
    fn test_variable_truncated_payload() {
        let mut data = Vec::new();
        data.extend_from_slice(&10u32.to_le_bytes());
        data.extend_from_slice(b"short");
        let mut cursor = PlainValuesCursor::new(data, 1, string_desc()).unwrap();
        let mut batch = ValueBatch::empty(string_desc());
        assert!(cursor.append_run(&mut batch, 1).unwrap_err().is_format_error());
    }

    #[test]
    fn test_trailing_bytes_detected() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(b"a");
        data.extend_from_slice(b"junk");
        let mut cursor = PlainValuesCursor::new(data, 1, string_desc()).unwrap();
        let mut batch = ValueBatch::empty(string_desc());
        cursor.append_run(&mut batch, 1).unwrap();
        assert!(cursor.verify_exhausted().unwrap_err().is_format_error());
    }
}
