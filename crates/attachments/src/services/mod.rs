pub mod access;
pub mod classifier;
pub mod upload;

pub use access::{AccessGateway, AuthorizedDownload, DownloadFile, DownloadRoute};
pub use classifier::FileTypeClassifier;
pub use upload::{AllowedGroup, UploadHints, UploadPolicy};
