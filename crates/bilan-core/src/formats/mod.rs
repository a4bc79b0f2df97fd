//! # Formats Module
//!
//! Record encodings shared by the storage adapters.

mod persistence;

pub use persistence::*;
