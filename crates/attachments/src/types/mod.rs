//! Shared error and outcome types.

pub mod errors;

pub use errors::{DownloadDenied, StoreError, StoreResult, UploadRejection};
