//! The column chunk reader: a pull-based decoder producing value batches.

use std::cmp;
use std::ops::Range;

use stratum_common::{Result, error::Error, verify_arg};
use stratum_format::{
    chunk::{ChunkFooter, ChunkHeader, PageEncoding, PageHeader, PageKind},
    schema::BasicTypeDescriptor,
};
use stratum_io::ReadAt;
use stratum_sequence::batch::ValueBatch;

use super::{
    batch_pool::{BatchGuard, BatchPool},
    dictionary::{CodesCursor, ValueDictionary},
    plain::PlainValuesCursor,
    validity::PageValidity,
};

/// Options controlling a chunk read.
#[derive(Debug, Clone)]
pub struct ChunkReadOptions {
    /// Maximum number of rows per returned batch. Must be non-zero.
    pub batch_capacity: usize,
    /// When set, the reader recycles batch storage across `next_batch`
    /// calls; each returned batch is then valid only until the next call.
    pub reuse_buffers: bool,
}

impl Default for ChunkReadOptions {
    fn default() -> Self {
        ChunkReadOptions {
            batch_capacity: 1024,
            reuse_buffers: false,
        }
    }
}

/// Reads one column chunk as a lazy, finite sequence of batches.
///
/// The reader owns the chunk's dictionary (if any) and all decode state.
/// Readers over different chunks are fully independent; a single reader's
/// sequence is forward-only and consumed once. Re-opening the chunk
/// reproduces the identical batch sequence.
#[derive(Debug)]
pub struct ColumnChunkReader<R: ReadAt> {
    source: R,
    type_desc: BasicTypeDescriptor,
    footer: ChunkFooter,
    batch_capacity: usize,
    pool: BatchPool,
    state: DecodeState,
}

impl<R: ReadAt> ColumnChunkReader<R> {
    /// Opens a chunk for reading, validating its header and footer.
    pub fn open(source: R, options: ChunkReadOptions) -> Result<ColumnChunkReader<R>> {
        verify_arg!(options.batch_capacity, options.batch_capacity > 0);
        let size = source.size().map_err(|e| Error::io("chunk source", e))?;
        let min_size = (ChunkHeader::SIZE + ChunkFooter::SIZE) as u64;
        if size < min_size {
            return Err(Error::invalid_format(
                "chunk",
                format!("{size} bytes is smaller than the minimal chunk"),
            ));
        }
        let header_bytes = read_exact(&source, 0..ChunkHeader::SIZE as u64, "chunk header")?;
        let header = ChunkHeader::decode(&header_bytes)?;
        let footer_bytes = read_exact(&source, size - ChunkFooter::SIZE as u64..size, "chunk footer")?;
        let footer = ChunkFooter::decode(&footer_bytes)?;
        Ok(ColumnChunkReader {
            source,
            type_desc: header.type_desc,
            footer,
            batch_capacity: options.batch_capacity,
            pool: BatchPool::new(header.type_desc, options.reuse_buffers),
            state: DecodeState::new(),
        })
    }

    pub fn type_desc(&self) -> BasicTypeDescriptor {
        self.type_desc
    }

    /// Total rows in the chunk, from the footer.
    pub fn row_count(&self) -> u64 {
        self.footer.row_count
    }

    /// Row offset of the first plain-decoded row after dictionary-encoded
    /// pages, once the reader has observed the encoding transition.
    ///
    /// `None` if no transition has been observed (not yet reached, or the
    /// chunk is single-encoding).
    pub fn fallback_row(&self) -> Option<u64> {
        self.state.fallback_row
    }

    /// Decodes the next batch of up to the configured capacity.
    ///
    /// Returns `Ok(None)` once the chunk is exhausted. The final batch may
    /// be shorter than the capacity. On error the in-progress batch is
    /// discarded entirely; batches returned by earlier calls are unaffected.
    pub fn next_batch(&mut self) -> Result<Option<BatchGuard<'_>>> {
        if matches!(self.state.phase, ChunkPhase::Exhausted) {
            return Ok(None);
        }
        let capacity = self.batch_capacity;
        let Self {
            source,
            type_desc,
            footer,
            pool,
            state,
            ..
        } = self;
        let mut batch = pool.acquire(capacity);
        let mut filled = 0usize;
        while filled < capacity {
            if !state.load_next_page(source, *type_desc, footer)? {
                break;
            }
            filled += state.fill_from_page(&mut batch, capacity - filled)?;
        }
        state.rows_emitted += filled as u64;
        if state.page.is_none() && state.pages_read == footer.page_count {
            state.phase = ChunkPhase::Exhausted;
            if state.rows_emitted != footer.row_count {
                return Err(Error::invalid_format(
                    "chunk",
                    format!(
                        "decoded {} rows, footer declares {}",
                        state.rows_emitted, footer.row_count
                    ),
                ));
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        Ok(Some(batch))
    }
}

/// Chunk-level position of the decode: which page is active, which decoder
/// applies, and how far the chunk has been consumed. Owned and mutated by
/// exactly one [`ColumnChunkReader`].
#[derive(Debug)]
struct DecodeState {
    phase: ChunkPhase,
    next_page_offset: u64,
    pages_read: u32,
    /// Rows covered by all value pages loaded so far.
    rows_loaded: u64,
    /// Rows handed out through finished batches.
    rows_emitted: u64,
    dictionary: Option<ValueDictionary>,
    page: Option<ActivePage>,
    seen_plain_page: bool,
    fallback_row: Option<u64>,
}

#[derive(Debug)]
enum ChunkPhase {
    /// Before any page: a dictionary page is still admissible.
    ReadingDictionaryPage,
    ReadingValuePages,
    Exhausted,
}

#[derive(Debug)]
struct ActivePage {
    validity: PageValidity,
    decoder: PageValuesDecoder,
    next_row: usize,
}

/// The decode strategy of the active page. Dictionary-coded pages resolve
/// codes against the chunk dictionary held by the state; plain pages carry
/// their values inline.
#[derive(Debug)]
enum PageValuesDecoder {
    Dictionary(CodesCursor),
    Plain(PlainValuesCursor),
}

impl DecodeState {
    fn new() -> DecodeState {
        DecodeState {
            phase: ChunkPhase::ReadingDictionaryPage,
            next_page_offset: ChunkHeader::SIZE as u64,
            pages_read: 0,
            rows_loaded: 0,
            rows_emitted: 0,
            dictionary: None,
            page: None,
            seen_plain_page: false,
            fallback_row: None,
        }
    }

    /// Ensures a value page is active, reading pages forward as needed.
    /// Returns `false` when the chunk has no further pages.
    fn load_next_page<R: ReadAt>(
        &mut self,
        source: &R,
        type_desc: BasicTypeDescriptor,
        footer: &ChunkFooter,
    ) -> Result<bool> {
        loop {
            if self.page.is_some() {
                return Ok(true);
            }
            if self.pages_read == footer.page_count {
                return Ok(false);
            }
            let header_end = self.next_page_offset + PageHeader::SIZE as u64;
            let header_bytes = read_exact(source, self.next_page_offset..header_end, "page header")?;
            let header = PageHeader::decode(&header_bytes)?;
            let body_end = header_end + header.data_size as u64;
            let body = read_exact(source, header_end..body_end, "page body")?;
            self.pages_read += 1;
            self.next_page_offset = body_end;
            match header.kind {
                PageKind::Dictionary => self.load_dictionary_page(&header, &body, type_desc)?,
                PageKind::Values => self.load_value_page(&header, body, type_desc)?,
            }
        }
    }

    fn load_dictionary_page(
        &mut self,
        header: &PageHeader,
        body: &[u8],
        type_desc: BasicTypeDescriptor,
    ) -> Result<()> {
        if self.dictionary.is_some() {
            return Err(Error::invalid_format(
                "chunk",
                "more than one dictionary page",
            ));
        }
        if !matches!(self.phase, ChunkPhase::ReadingDictionaryPage) {
            return Err(Error::invalid_format(
                "chunk",
                "dictionary page after value pages",
            ));
        }
        self.dictionary = Some(ValueDictionary::decode(
            body,
            header.row_count as usize,
            type_desc,
        )?);
        self.phase = ChunkPhase::ReadingValuePages;
        Ok(())
    }

    fn load_value_page(
        &mut self,
        header: &PageHeader,
        body: Vec<u8>,
        type_desc: BasicTypeDescriptor,
    ) -> Result<()> {
        if header.row_count == 0 {
            return Err(Error::invalid_format("page header", "empty value page"));
        }
        self.phase = ChunkPhase::ReadingValuePages;
        let validity_size = header.validity_size();
        if body.len() < validity_size {
            return Err(Error::invalid_format(
                "page body",
                "truncated validity bitmap",
            ));
        }
        let validity = PageValidity::decode(header, &body[..validity_size])?;
        let values_bytes = &body[validity_size..];
        let decoder = match header.encoding {
            PageEncoding::Dictionary => {
                if self.seen_plain_page {
                    return Err(Error::invalid_format(
                        "chunk",
                        "dictionary-encoded page after a plain page",
                    ));
                }
                if self.dictionary.is_none() {
                    return Err(Error::invalid_format(
                        "chunk",
                        "dictionary-encoded page without a dictionary page",
                    ));
                }
                PageValuesDecoder::Dictionary(CodesCursor::new(
                    values_bytes,
                    header.present_count(),
                )?)
            }
            PageEncoding::Plain => {
                if !self.seen_plain_page {
                    self.seen_plain_page = true;
                    // The transition event: the chunk decoded dictionary
                    // pages up to this row and plain pages from it on.
                    if self.dictionary.is_some() {
                        self.fallback_row = Some(self.rows_loaded);
                    }
                }
                PageValuesDecoder::Plain(PlainValuesCursor::new(
                    values_bytes.to_vec(),
                    header.present_count(),
                    type_desc,
                )?)
            }
        };
        self.rows_loaded += header.row_count as u64;
        self.page = Some(ActivePage {
            validity,
            decoder,
            next_row: 0,
        });
        Ok(())
    }

    /// Moves up to `max_rows` rows from the active page into `batch`,
    /// consulting validity so that null rows consume no value. Closes the
    /// page when its last row is emitted.
    fn fill_from_page(&mut self, batch: &mut ValueBatch, max_rows: usize) -> Result<usize> {
        let Some(page) = self.page.as_mut() else {
            return Ok(0);
        };
        let dictionary = self.dictionary.as_ref();
        let page_rows = page.validity.len();
        let target = cmp::min(max_rows, page_rows - page.next_row);
        let mut produced = 0usize;
        while produced < target {
            let row = page.next_row;
            if page.validity.is_present(row) {
                let run = cmp::min(page.validity.present_run_len(row), target - produced);
                match &mut page.decoder {
                    PageValuesDecoder::Dictionary(cursor) => {
                        let dictionary = dictionary.ok_or_else(|| {
                            Error::invalid_format("chunk", "missing dictionary during decode")
                        })?;
                        for _ in 0..run {
                            let code = cursor.next().ok_or_else(|| {
                                Error::invalid_format(
                                    "code page",
                                    "codes exhausted before page rows",
                                )
                            })?;
                            dictionary.append_to_batch(code, batch)?;
                        }
                    }
                    PageValuesDecoder::Plain(cursor) => {
                        cursor.append_run(batch, run)?;
                    }
                }
                page.next_row += run;
                produced += run;
            } else {
                let run = cmp::min(page.validity.null_run_len(row), target - produced);
                batch.push_nulls(run);
                page.next_row += run;
                produced += run;
            }
        }
        let page_done = page.next_row == page_rows;
        if page_done {
            match &page.decoder {
                PageValuesDecoder::Dictionary(cursor) => {
                    if cursor.remaining() != 0 {
                        return Err(Error::invalid_format(
                            "code page",
                            "unconsumed codes after page rows",
                        ));
                    }
                }
                PageValuesDecoder::Plain(cursor) => cursor.verify_exhausted()?,
            }
            self.page = None;
        }
        Ok(produced)
    }
}

/// Reads `range` from the source, failing on a short read.
fn read_exact<R: ReadAt>(source: &R, range: Range<u64>, what: &str) -> Result<Vec<u8>> {
    let expected = (range.end - range.start) as usize;
    let data = source.read_at(range).map_err(|e| Error::io(what, e))?;
    if data.len() != expected {
        return Err(Error::invalid_format(
            what,
            format!("unexpected end of chunk: wanted {expected} bytes, got {}", data.len()),
        ));
    }
    Ok(data)
}
