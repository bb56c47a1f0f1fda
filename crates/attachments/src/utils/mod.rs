//! Internal utilities.

pub mod hooks;
pub mod route;

pub use hooks::{FilterId, FilterRegistry, FILE_TYPES_HOOK};
pub use route::{coerce_id, NO_SESSION};
