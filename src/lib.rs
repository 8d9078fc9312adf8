#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! slha-store crate
//!
//! Persists a growing collection of SLHA data files into a single random-access binary store,
//! with O(1) lookup of any variable's value in any ingested file, and checks every newly ingested
//! file against a trusted template for structural drift.
//!
//! # Module Organization
//!
//! - [`model`]: Variables, blocks, datasets and the SLHA text parser
//! - [`checker`]: Schema-consistency comparison between two datasets
//! - [`store`]: The on-disk layout, background write worker and growth protocol
//! - [`catalog`]: Directory discovery and batch ingestion
//! - [`export`]: Writing selected variables out as data files
//! - [`config`]: Store sizing and growth configuration
//! - [`commands`]: Command-line interface

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod catalog;
pub mod checker;
pub mod commands;
pub mod config;
pub mod export;
pub mod model;
pub mod store;

pub use commands::{Host, run};
