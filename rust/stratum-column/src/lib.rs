//! Column chunk reading and writing for the Stratum format.
//!
//! The write side ([`write::chunk_writer::ColumnChunkWriter`]) dictionary-encodes
//! values until the dictionary's serialized size would exceed a configured
//! threshold, then falls back to plain encoding for the rest of the chunk.
//! The read side ([`read::chunk_reader::ColumnChunkReader`]) decodes the
//! resulting page stream into batches, switching decode strategy at the
//! recorded encoding transition.

pub mod read;
pub mod write;

#[cfg(test)]
mod tests;
