//! # Bilan Application Library
//!
//! The async half of Bilan: the HTTP API, the CLI and configuration
//! loading. All progression rules live in `bilan-core`; this crate reads
//! the clock, authorizes actors and maps engine errors to HTTP statuses.

pub mod api;
pub mod cli;
pub mod config;
