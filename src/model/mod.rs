//! The value model for SLHA data.
//!
//! A [`Dataset`] is one parsed SLHA file: a list of [`Block`]s, each holding [`Variable`]s.
//! Variables are identified by up to three PDG codes plus the name of their block; their
//! value and description are carried along but never take part in identity.

mod block;
mod dataset;
mod parser;
mod variable;

pub use block::{Block, decay_block_name};
pub use dataset::{Dataset, file_stem};
pub use variable::{SENTINEL, Variable};
