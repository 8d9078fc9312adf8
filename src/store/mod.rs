//! Binary table store for SLHA values.
//!
//! A [`Store`] keeps every ingested file's values in one random-access file, so the value of
//! any variable in any file is a single seek away. Variables and files are registered in two
//! fixed-capacity tables; when either fills up to the configured load factor the whole file is
//! rebuilt with larger tables.
//!
//! # File Format
//!
//! All integers are big-endian and text fields hold zero-padded UTF-16 code units.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                    │
//! │   - i32 variable capacity, i32 variables used        │
//! │   - i32 file capacity, i32 files used                │
//! ├──────────────────────────────────────────────────────┤
//! │ Variable Table (variable capacity × 110 bytes)       │
//! │   - i32 × 3 PDG codes                                │
//! │   - 20 units block name, 25 units description        │
//! │   - i64 starting offset (the cell of file slot 0)    │
//! ├──────────────────────────────────────────────────────┤
//! │ File Table (file capacity × 62 bytes)                │
//! │   - i64 modification time, Unix epoch milliseconds   │
//! │   - 25 units file name without extension             │
//! │   - i32 slot                                         │
//! ├──────────────────────────────────────────────────────┤
//! │ Data Matrix (file capacity × variable capacity × 8)  │
//! │   - one row of f64 cells per file slot               │
//! │   - f64::MAX marks a value that is missing           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The cell of a variable for file slot `s` lives at `offset + s × 8 × variable capacity`.
//! Because both the data start and the row stride depend on the two capacities, growing either
//! table moves every cell.

mod bootstrap;
mod engine;
mod growth;
mod inconsistency_log;
mod layout;
mod lock;
mod observer;
mod reconcile;
mod worker;

pub use engine::{FileInfo, IngestReport, Store, file_key};
pub use layout::{Capacities, Layout};
pub use observer::StoreObserver;
pub use worker::{WriteProgress, WriteRequest, WriteWorker};
