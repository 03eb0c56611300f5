//! Core domain model for mapdex.
//!
//! This crate defines the catalog [`Record`](model::Record), its attribute
//! field names, catalog-id parsing, and the tokenizer shared by indexing and
//! search.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod tokenize;

pub use error::{Error, Result};
pub use model::{Attributes, Field, Record};
