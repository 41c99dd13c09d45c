//! The column chunk writer: dictionary encoding with size-threshold
//! fallback to plain encoding.

use ahash::AHashMap;
use byteorder::{ByteOrder, LittleEndian};

use stratum_common::{Result, error::Error, verify_arg};
use stratum_format::{
    chunk::{ChunkFooter, ChunkHeader, PageEncoding, PageHeader, PageKind},
    schema::{BasicType, BasicTypeDescriptor},
};
use stratum_io::SealingWrite;

/// Whether a chunk starts out dictionary-encoding its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DictionaryEncoding {
    #[default]
    Enabled,
    Disabled,
}

/// Options controlling chunk encoding.
#[derive(Debug, Clone)]
pub struct ChunkWriterOptions {
    /// Ceiling, in serialized bytes, for the chunk's dictionary. Appending
    /// a distinct value that would push the dictionary past this limit
    /// triggers the fallback to plain encoding for the rest of the chunk.
    pub dictionary_size_limit: usize,
    /// Number of rows per value page.
    pub page_row_limit: usize,
    pub dictionary_encoding: DictionaryEncoding,
}

impl Default for ChunkWriterOptions {
    fn default() -> Self {
        ChunkWriterOptions {
            dictionary_size_limit: 1024 * 1024,
            page_row_limit: 4096,
            dictionary_encoding: DictionaryEncoding::Enabled,
        }
    }
}

/// Summary of a sealed chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkStats {
    pub row_count: u64,
    pub page_count: u32,
    /// Row offset of the first plain-encoded row, when the dictionary
    /// size limit forced a mid-chunk fallback.
    pub fallback_row: Option<u64>,
    /// Entry count of the written dictionary page, if one was written.
    pub dictionary_entries: Option<usize>,
}

/// Writes one column chunk to a sealing sink.
///
/// With dictionary encoding enabled, rows are buffered as dictionary codes
/// until either the chunk is finished (dictionary page plus code pages are
/// then flushed) or a new distinct value would push the dictionary past its
/// size limit. In the latter case the dictionary is frozen, everything
/// buffered is flushed dictionary-encoded, and every subsequent row is
/// written to plain pages. A chunk never reverts from plain back to
/// dictionary encoding.
#[derive(Debug)]
pub struct ColumnChunkWriter<W: SealingWrite> {
    sink: W,
    type_desc: BasicTypeDescriptor,
    options: ChunkWriterOptions,
    mode: EncodeMode,
    dict_index: AHashMap<Vec<u8>, u32>,
    dict_entries: Vec<Vec<u8>>,
    dict_size: usize,
    buffered_pages: Vec<EncodedPage>,
    page: PageBuilder,
    rows_appended: u64,
    pages_written: u32,
    fallback_row: Option<u64>,
    dictionary_entries: Option<usize>,
}

#[derive(Debug)]
enum EncodeMode {
    Dictionary,
    Plain,
}

/// Accumulates one page worth of rows before serialization.
#[derive(Default, Debug)]
struct PageBuilder {
    rows: u32,
    nulls: u32,
    /// One byte per row: 1 present, 0 null. Packed to a bitmap at flush.
    presence: Vec<u8>,
    /// Codes of present rows (dictionary mode).
    codes: Vec<u32>,
    /// Serialized values of present rows (plain mode).
    plain: Vec<u8>,
}

#[derive(Debug)]
struct EncodedPage {
    header: PageHeader,
    body: Vec<u8>,
}

impl<W: SealingWrite> ColumnChunkWriter<W> {
    /// Creates a writer and emits the chunk header to `sink`.
    pub fn new(
        mut sink: W,
        type_desc: BasicTypeDescriptor,
        options: ChunkWriterOptions,
    ) -> Result<ColumnChunkWriter<W>> {
        verify_arg!(options.page_row_limit, options.page_row_limit > 0);
        verify_arg!(
            options.page_row_limit,
            options.page_row_limit <= u32::MAX as usize
        );
        sink.write_all(&ChunkHeader::new(type_desc).encode())
            .map_err(|e| Error::io("chunk sink", e))?;
        let mode = match options.dictionary_encoding {
            DictionaryEncoding::Enabled => EncodeMode::Dictionary,
            DictionaryEncoding::Disabled => EncodeMode::Plain,
        };
        Ok(ColumnChunkWriter {
            sink,
            type_desc,
            options,
            mode,
            dict_index: AHashMap::new(),
            dict_entries: Vec::new(),
            dict_size: 0,
            buffered_pages: Vec::new(),
            page: PageBuilder::default(),
            rows_appended: 0,
            pages_written: 0,
            fallback_row: None,
            dictionary_entries: None,
        })
    }

    pub fn type_desc(&self) -> BasicTypeDescriptor {
        self.type_desc
    }

    /// Appends a primitive value.
    ///
    /// # Panics
    ///
    /// Panics if `size_of::<T>()` does not match the column's primitive
    /// size, or if the column is variable-size.
    pub fn push_value<T>(&mut self, value: T) -> Result<()>
    where
        T: bytemuck::NoUninit,
    {
        assert_eq!(
            self.type_desc.primitive_size(),
            Some(std::mem::size_of::<T>())
        );
        self.append_value(bytemuck::bytes_of(&value))
    }

    /// Appends a variable-size value.
    ///
    /// # Panics
    ///
    /// Panics if the column is not `String` or `Binary`.
    pub fn push_binary(&mut self, value: &[u8]) -> Result<()> {
        assert!(self.type_desc.requires_offsets());
        self.append_value(value)
    }

    pub fn push_str(&mut self, value: &str) -> Result<()> {
        assert_eq!(self.type_desc.basic_type, BasicType::String);
        self.append_value(value.as_bytes())
    }

    /// Appends a null row. Null rows occupy no space in the page's values
    /// section and never touch the dictionary.
    pub fn push_null(&mut self) -> Result<()> {
        self.page.presence.push(0);
        self.page.nulls += 1;
        self.page.rows += 1;
        self.rows_appended += 1;
        self.finish_page_if_full()
    }

    pub fn push_nulls(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.push_null()?;
        }
        Ok(())
    }

    /// Flushes any buffered pages, writes the footer, and seals the sink.
    pub fn finish(mut self) -> Result<ChunkStats> {
        self.finish_page()?;
        if matches!(self.mode, EncodeMode::Dictionary)
            && (!self.buffered_pages.is_empty() || !self.dict_entries.is_empty())
        {
            self.write_dictionary_page()?;
            for page in std::mem::take(&mut self.buffered_pages) {
                self.write_page(page)?;
            }
        }
        let footer = ChunkFooter {
            row_count: self.rows_appended,
            page_count: self.pages_written,
        };
        self.sink
            .write_all(&footer.encode())
            .map_err(|e| Error::io("chunk sink", e))?;
        self.sink.seal().map_err(|e| Error::io("chunk sink", e))?;
        Ok(ChunkStats {
            row_count: self.rows_appended,
            page_count: self.pages_written,
            fallback_row: self.fallback_row,
            dictionary_entries: self.dictionary_entries,
        })
    }

    fn append_value(&mut self, bytes: &[u8]) -> Result<()> {
        match self.mode {
            EncodeMode::Dictionary => {
                if let Some(&code) = self.dict_index.get(bytes) {
                    self.page.append_code(code);
                } else {
                    let entry_size = self.serialized_entry_size(bytes.len());
                    if self.dict_size + entry_size > self.options.dictionary_size_limit {
                        self.fall_back_to_plain()?;
                        self.page.append_plain(bytes, self.type_desc);
                    } else {
                        let code = self.dict_entries.len() as u32;
                        self.dict_index.insert(bytes.to_vec(), code);
                        self.dict_entries.push(bytes.to_vec());
                        self.dict_size += entry_size;
                        self.page.append_code(code);
                    }
                }
            }
            EncodeMode::Plain => self.page.append_plain(bytes, self.type_desc),
        }
        self.rows_appended += 1;
        self.finish_page_if_full()
    }

    /// Freezes the dictionary and switches the chunk to plain encoding:
    /// the partial code page is closed, the dictionary page and all
    /// buffered code pages are flushed, and the writer never dictionary-
    /// encodes again for this chunk.
    fn fall_back_to_plain(&mut self) -> Result<()> {
        self.finish_page()?;
        self.write_dictionary_page()?;
        for page in std::mem::take(&mut self.buffered_pages) {
            self.write_page(page)?;
        }
        self.dict_index = AHashMap::new();
        self.dict_entries = Vec::new();
        self.mode = EncodeMode::Plain;
        self.fallback_row = Some(self.rows_appended);
        Ok(())
    }

    fn finish_page_if_full(&mut self) -> Result<()> {
        if self.page.rows as usize >= self.options.page_row_limit {
            self.finish_page()?;
        }
        Ok(())
    }

    fn finish_page(&mut self) -> Result<()> {
        if self.page.rows == 0 {
            return Ok(());
        }
        let builder = std::mem::take(&mut self.page);
        let encoding = match self.mode {
            EncodeMode::Dictionary => PageEncoding::Dictionary,
            EncodeMode::Plain => PageEncoding::Plain,
        };
        let page = builder.into_page(encoding);
        match self.mode {
            // Code pages wait in memory until the dictionary page, which
            // must precede them in the chunk, is final.
            EncodeMode::Dictionary => {
                self.buffered_pages.push(page);
                Ok(())
            }
            EncodeMode::Plain => self.write_page(page),
        }
    }

    fn write_dictionary_page(&mut self) -> Result<()> {
        let mut body = Vec::with_capacity(self.dict_size);
        for entry in &self.dict_entries {
            if self.type_desc.requires_offsets() {
                body.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            }
            body.extend_from_slice(entry);
        }
        let header = PageHeader {
            kind: PageKind::Dictionary,
            encoding: PageEncoding::Plain,
            row_count: self.dict_entries.len() as u32,
            null_count: 0,
            data_size: body.len() as u32,
        };
        self.dictionary_entries = Some(self.dict_entries.len());
        self.write_page(EncodedPage { header, body })
    }

    fn write_page(&mut self, page: EncodedPage) -> Result<()> {
        self.sink
            .write_all(&page.header.encode())
            .map_err(|e| Error::io("chunk sink", e))?;
        self.sink
            .write_all(&page.body)
            .map_err(|e| Error::io("chunk sink", e))?;
        self.pages_written += 1;
        Ok(())
    }

    fn serialized_entry_size(&self, value_len: usize) -> usize {
        match self.type_desc.primitive_size() {
            Some(size) => size,
            None => 4 + value_len,
        }
    }
}

impl PageBuilder {
    fn append_code(&mut self, code: u32) {
        self.codes.push(code);
        self.presence.push(1);
        self.rows += 1;
    }

    fn append_plain(&mut self, bytes: &[u8], type_desc: BasicTypeDescriptor) {
        if type_desc.primitive_size().is_none() {
            self.plain.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        }
        self.plain.extend_from_slice(bytes);
        self.presence.push(1);
        self.rows += 1;
    }

    fn into_page(self, encoding: PageEncoding) -> EncodedPage {
        let mut body = Vec::new();
        if self.nulls > 0 && self.nulls < self.rows {
            body.extend_from_slice(&pack_presence(&self.presence));
        }
        match encoding {
            PageEncoding::Dictionary => {
                let mut codes = vec![0u8; self.codes.len() * 4];
                LittleEndian::write_u32_into(&self.codes, &mut codes);
                body.extend_from_slice(&codes);
            }
            PageEncoding::Plain => body.extend_from_slice(&self.plain),
        }
        EncodedPage {
            header: PageHeader {
                kind: PageKind::Values,
                encoding,
                row_count: self.rows,
                null_count: self.nulls,
                data_size: body.len() as u32,
            },
            body,
        }
    }
}

/// Packs byte-per-row presence into the wire bitmap (LSB-first, set bit =
/// present).
fn pack_presence(presence: &[u8]) -> Vec<u8> {
    let mut bits = vec![0u8; presence.len().div_ceil(8)];
    for (i, &present) in presence.iter().enumerate() {
        if present != 0 {
            bits[i / 8] |= 1 << (i % 8);
        }
    }
    bits
}
