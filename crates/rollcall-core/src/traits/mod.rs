//! Collaborator traits the pipeline calls out through.

mod clock;
mod notifier;
mod store;

pub use clock::*;
pub use notifier::*;
pub use store::*;
