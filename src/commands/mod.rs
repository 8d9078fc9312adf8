//! Command-line interface for slha-store
//!
//! # Commands
//!
//! - **ingest**: Open (or create) a store, reconcile it with the files beside it, then ingest
//!   every new SLHA file from a directory
//! - **info**: Report a store's capacities, usage and stored files
//! - **variables**: List stored variables in the form `export` accepts
//! - **export**: Write the values of selected variables for every stored file
//!
//! ## Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes to the matching
//! handler. Handlers load the configuration and set up logging through the shared
//! [`GlobalArgs`], then drive the store on a blocking thread while a [`ProgressReporter`]
//! follows along as a store observer.
//!
//! Commands other than `ingest` never create a store.

mod common;
mod export;
mod host;
mod info;
mod ingest;
mod progress_reporter;
mod run;
mod variables;

pub use common::{ColorMode, GlobalArgs, LogLevel, StoreArgs};
pub use export::{ExportArgs, process_export};
pub use host::Host;
pub use info::{InfoArgs, process_info};
pub use ingest::{DEFAULT_STORE_NAME, IngestArgs, process_ingest};
pub use progress_reporter::ProgressReporter;
pub use run::run;
pub use variables::{VariablesArgs, process_variables};
