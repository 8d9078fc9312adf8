//! Finding SLHA files on disk and feeding them to a store in bulk.

mod batch;
mod discovery;

pub use batch::{BatchSummary, ingest_directory};
pub use discovery::{NameClaims, discover};
