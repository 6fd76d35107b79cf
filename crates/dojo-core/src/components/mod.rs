//! Domain model for the dojo.
//!
//! Components are plain data with invariant-preserving mutators.
//! Orchestration across rooms and people lives in the engine.

mod people;
mod room;

pub use people::*;
pub use room::*;
