//! Capability and request model.
//!
//! Everything here is built once from the input documents and never mutated
//! afterwards.

pub mod capability;
pub mod peripheral;
pub mod request;

pub use capability::*;
pub use peripheral::*;
pub use request::*;
