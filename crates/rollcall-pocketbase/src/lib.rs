//! rollcall-pocketbase - PocketBase REST adapter for rollcall.
//!
//! Implements the identity, arrival and detection store traits against the
//! `employees`, `attendance` and `employee_detections` collections of a
//! PocketBase instance.

mod filter;
mod store;

pub use filter::{quote, Filter};
pub use store::PocketBaseStore;
