//! Wire-level structures of a serialized column chunk.
//!
//! A chunk is laid out as `header page* footer`, little-endian throughout:
//!
//! ```text
//! header      := magic:u32 version:u16 basic_type:u8 flags:u8
//! page        := page_header body
//! page_header := kind:u8 encoding:u8 reserved:u16
//!                row_count:u32 null_count:u32 data_size:u32
//! footer      := row_count:u64 page_count:u32 magic:u32
//! ```
//!
//! The dictionary page, when present, is the first page of the chunk. A
//! value page's body holds an optional packed validity bitmap (only when the
//! page mixes present and null rows) followed by one entry per present row.

use byteorder::{ByteOrder, LittleEndian};

use stratum_common::{Result, error::Error};

use crate::schema::{BasicType, BasicTypeDescriptor};

/// `"STCK"` read as a little-endian `u32`.
pub const CHUNK_MAGIC: u32 = 0x4B43_5453;

pub const FORMAT_VERSION: u16 = 1;

const FLAG_SIGNED: u8 = 1;

/// Role of a page within a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageKind {
    /// The chunk's dictionary: distinct values in code order.
    Dictionary = 0,
    /// A run of row values.
    Values = 1,
}

impl PageKind {
    pub fn from_code(code: u8) -> Option<PageKind> {
        match code {
            0 => Some(PageKind::Dictionary),
            1 => Some(PageKind::Values),
            _ => None,
        }
    }
}

/// Encoding of the entries in a value page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageEncoding {
    /// Values stored inline.
    Plain = 0,
    /// Values stored as `u32` codes into the chunk's dictionary.
    Dictionary = 1,
}

impl PageEncoding {
    pub fn from_code(code: u8) -> Option<PageEncoding> {
        match code {
            0 => Some(PageEncoding::Plain),
            1 => Some(PageEncoding::Dictionary),
            _ => None,
        }
    }
}

/// Fixed-size chunk prologue carrying the column's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub type_desc: BasicTypeDescriptor,
}

impl ChunkHeader {
    pub const SIZE: usize = 8;

    pub fn new(type_desc: BasicTypeDescriptor) -> ChunkHeader {
        ChunkHeader { type_desc }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        LittleEndian::write_u32(&mut buf[0..4], CHUNK_MAGIC);
        LittleEndian::write_u16(&mut buf[4..6], FORMAT_VERSION);
        buf[6] = self.type_desc.basic_type as u8;
        buf[7] = if self.type_desc.signed { FLAG_SIGNED } else { 0 };
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<ChunkHeader> {
        if buf.len() < Self::SIZE {
            return Err(Error::invalid_format(
                "chunk header",
                format!("expected {} bytes, found {}", Self::SIZE, buf.len()),
            ));
        }
        let magic = LittleEndian::read_u32(&buf[0..4]);
        if magic != CHUNK_MAGIC {
            return Err(Error::invalid_format(
                "chunk header",
                format!("bad magic {magic:#010x}"),
            ));
        }
        let version = LittleEndian::read_u16(&buf[4..6]);
        if version != FORMAT_VERSION {
            return Err(Error::invalid_format(
                "chunk header",
                format!("unsupported format version {version}"),
            ));
        }
        let basic_type = BasicType::from_code(buf[6]).ok_or_else(|| {
            Error::invalid_format("chunk header", format!("unknown type code {}", buf[6]))
        })?;
        Ok(ChunkHeader {
            type_desc: BasicTypeDescriptor::new(basic_type, buf[7] & FLAG_SIGNED != 0),
        })
    }
}

/// Fixed-size page prologue.
///
/// `row_count` counts logical rows for a value page and dictionary entries
/// for a dictionary page. `data_size` is the byte length of the page body
/// that follows this header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub kind: PageKind,
    pub encoding: PageEncoding,
    pub row_count: u32,
    pub null_count: u32,
    pub data_size: u32,
}

impl PageHeader {
    pub const SIZE: usize = 16;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.kind as u8;
        buf[1] = self.encoding as u8;
        LittleEndian::write_u16(&mut buf[2..4], 0);
        LittleEndian::write_u32(&mut buf[4..8], self.row_count);
        LittleEndian::write_u32(&mut buf[8..12], self.null_count);
        LittleEndian::write_u32(&mut buf[12..16], self.data_size);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<PageHeader> {
        if buf.len() < Self::SIZE {
            return Err(Error::invalid_format(
                "page header",
                format!("expected {} bytes, found {}", Self::SIZE, buf.len()),
            ));
        }
        let kind = PageKind::from_code(buf[0]).ok_or_else(|| {
            Error::invalid_format("page header", format!("unknown page kind {}", buf[0]))
        })?;
        let encoding = PageEncoding::from_code(buf[1]).ok_or_else(|| {
            Error::invalid_format("page header", format!("unknown page encoding {}", buf[1]))
        })?;
        let row_count = LittleEndian::read_u32(&buf[4..8]);
        let null_count = LittleEndian::read_u32(&buf[8..12]);
        if null_count > row_count {
            return Err(Error::invalid_format(
                "page header",
                format!("null count {null_count} exceeds row count {row_count}"),
            ));
        }
        if kind == PageKind::Dictionary && (encoding != PageEncoding::Plain || null_count != 0) {
            return Err(Error::invalid_format(
                "page header",
                "dictionary page must be plain-encoded and null-free",
            ));
        }
        Ok(PageHeader {
            kind,
            encoding,
            row_count,
            null_count,
            data_size: LittleEndian::read_u32(&buf[12..16]),
        })
    }

    /// Byte length of the validity bitmap in this page's body, if any.
    ///
    /// Pages that are entirely present or entirely null carry no bitmap.
    pub fn validity_size(&self) -> usize {
        if self.null_count == 0 || self.null_count == self.row_count {
            0
        } else {
            (self.row_count as usize).div_ceil(8)
        }
    }

    /// Number of materialized value entries in the page body.
    pub fn present_count(&self) -> usize {
        (self.row_count - self.null_count) as usize
    }
}

/// Fixed-size chunk epilogue carrying the totals needed to iterate pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkFooter {
    pub row_count: u64,
    pub page_count: u32,
}

impl ChunkFooter {
    pub const SIZE: usize = 16;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        LittleEndian::write_u64(&mut buf[0..8], self.row_count);
        LittleEndian::write_u32(&mut buf[8..12], self.page_count);
        LittleEndian::write_u32(&mut buf[12..16], CHUNK_MAGIC);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<ChunkFooter> {
        if buf.len() < Self::SIZE {
            return Err(Error::invalid_format(
                "chunk footer",
                format!("expected {} bytes, found {}", Self::SIZE, buf.len()),
            ));
        }
        let magic = LittleEndian::read_u32(&buf[12..16]);
        if magic != CHUNK_MAGIC {
            return Err(Error::invalid_format(
                "chunk footer",
                format!("bad trailing magic {magic:#010x}"),
            ));
        }
        Ok(ChunkFooter {
            row_count: LittleEndian::read_u64(&buf[0..8]),
            page_count: LittleEndian::read_u32(&buf[8..12]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_header_round_trip() {
        let header = ChunkHeader::new(BasicTypeDescriptor::new(BasicType::String, false));
        let decoded = ChunkHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_chunk_header_rejects_bad_magic() {
        let mut buf = ChunkHeader::new(Default::default()).encode();
        buf[0] ^= 0xFF;
        let err = ChunkHeader::decode(&buf).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_chunk_header_rejects_truncation() {
        let buf = ChunkHeader::new(Default::default()).encode();
        assert!(ChunkHeader::decode(&buf[..4]).unwrap_err().is_format_error());
    }

    #[test]
    fn test_page_header_round_trip() {
        let header = PageHeader {
            kind: PageKind::Values,
            encoding: PageEncoding::Dictionary,
            row_count: 4096,
            null_count: 17,
            data_size: 20000,
        };
        let decoded = PageHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.validity_size(), 512);
        assert_eq!(decoded.present_count(), 4079);
    }

    #[test]
    fn test_page_header_validity_section_elision() {
        let mut header = PageHeader {
            kind: PageKind::Values,
            encoding: PageEncoding::Plain,
            row_count: 100,
            null_count: 0,
            data_size: 0,
        };
        assert_eq!(header.validity_size(), 0);
        header.null_count = 100;
        assert_eq!(header.validity_size(), 0);
        header.null_count = 1;
        assert_eq!(header.validity_size(), 13);
    }

    #[test]
    fn test_page_header_rejects_null_count_overflow() {
        let mut buf = PageHeader {
            kind: PageKind::Values,
            encoding: PageEncoding::Plain,
            row_count: 10,
            null_count: 0,
            data_size: 0,
        }
        .encode();
        LittleEndian::write_u32(&mut buf[8..12], 11);
        assert!(PageHeader::decode(&buf).unwrap_err().is_format_error());
    }

    #[test]
    fn test_page_header_rejects_coded_dictionary_page() {
        let mut buf = PageHeader {
            kind: PageKind::Dictionary,
            encoding: PageEncoding::Plain,
            row_count: 10,
            null_count: 0,
            data_size: 40,
        }
        .encode();
        buf[1] = PageEncoding::Dictionary as u8;
        assert!(PageHeader::decode(&buf).unwrap_err().is_format_error());
    }

    #[test]
    fn test_chunk_footer_round_trip() {
        let footer = ChunkFooter {
            row_count: 1_000_000,
            page_count: 245,
        };
        assert_eq!(ChunkFooter::decode(&footer.encode()).unwrap(), footer);
    }
}
