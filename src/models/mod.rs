//! Data models exchanged over HTTP and with the blob storage backends.
//!
//! Everything here serializes naturally as JSON via `serde`; field names are
//! the wire names clients see.

pub mod blob;
pub mod datalake;
