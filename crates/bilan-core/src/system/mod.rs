//! # System Module
//!
//! Phase gating and phase progress.
//!
//! The two halves are independent: the gate reads only the
//! completion flags of an assessment, progress reads only the answer ledger.
//! The parcours view puts them side by side for display.

mod gate;
mod progress;

pub use gate::*;
pub use progress::*;
