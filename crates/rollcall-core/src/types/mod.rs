//! Core types for rollcall.

mod attendance;
mod identity;
mod sighting;

pub use attendance::*;
pub use identity::*;
pub use sighting::*;
