//! Encoding of a column chunk's page stream.

pub mod chunk_writer;
