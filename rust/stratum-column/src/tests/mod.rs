//! End-to-end tests driving the chunk writer and reader together.


use stratum_format::schema::{BasicType, BasicTypeDescriptor};
use stratum_io::ReadAt;

use crate::{
    read::chunk_reader::ColumnChunkReader,
    write::chunk_writer::{ChunkStats, ChunkWriterOptions, ColumnChunkWriter},
};

pub(crate) fn string_desc() -> BasicTypeDescriptor {
    BasicTypeDescriptor::new(BasicType::String, false)
}

pub(crate) fn int64_desc() -> BasicTypeDescriptor {
    BasicTypeDescriptor::new(BasicType::Int64, true)
}

/// Writes one string chunk into a memory sink.
pub(crate) fn write_string_chunk(
    values: &[Option<String>],
    options: ChunkWriterOptions,
) -> (Vec<u8>, ChunkStats) {
    let mut sink = Vec::new();
    let mut writer = ColumnChunkWriter::new(&mut sink, string_desc(), options).unwrap();
    for value in values {
        match value {
            Some(value) => writer.push_str(value).unwrap(),
            None => writer.push_null().unwrap(),
        }
    }
    let stats = writer.finish().unwrap();
    (sink, stats)
}

/// Writes one i64 chunk into a memory sink.
pub(crate) fn write_int_chunk(
    values: &[Option<i64>],
    options: ChunkWriterOptions,
) -> (Vec<u8>, ChunkStats) {
    let mut sink = Vec::new();
    let mut writer = ColumnChunkWriter::new(&mut sink, int64_desc(), options).unwrap();
    for value in values {
        match value {
            Some(value) => writer.push_value(*value).unwrap(),
            None => writer.push_null().unwrap(),
        }
    }
    let stats = writer.finish().unwrap();
    (sink, stats)
}

/// Drains a reader over a string chunk into per-row options.
pub(crate) fn collect_string_rows<R: ReadAt>(
    reader: &mut ColumnChunkReader<R>,
) -> Vec<Option<String>> {
    let mut rows = Vec::new();
    while let Some(batch) = reader.next_batch().unwrap() {
        for i in 0..batch.len() {
            rows.push(
                batch
                    .is_valid(i)
                    .then(|| String::from_utf8(batch.binary_at(i).to_vec()).unwrap()),
            );
        }
    }
    rows
}

/// Drains a reader over an i64 chunk into per-row options.
pub(crate) fn collect_int_rows<R: ReadAt>(
    reader: &mut ColumnChunkReader<R>,
) -> Vec<Option<i64>> {
    let mut rows = Vec::new();
    while let Some(batch) = reader.next_batch().unwrap() {
        for i in 0..batch.len() {
            rows.push(batch.is_valid(i).then(|| batch.value_at::<i64>(i)));
        }
    }
    rows
}
