//! Decoding of a column chunk's page stream into value batches.

pub mod batch_pool;
pub mod chunk_reader;
pub mod dictionary;
pub mod plain;
pub mod validity;
