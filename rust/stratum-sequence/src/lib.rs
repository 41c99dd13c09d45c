//! In-memory containers for decoded column data: a typed value buffer,
//! offsets for variable-size values, a per-row validity container, and the
//! [`batch::ValueBatch`] that combines them.

pub mod batch;
pub mod offsets;
pub mod presence;
pub mod values;
