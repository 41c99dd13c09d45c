//! Common error and result types shared by the Stratum crates.

pub mod error;
pub mod result;

pub use result::Result;
