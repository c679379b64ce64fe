pub(crate) mod api;
pub mod client;
pub mod consts;
pub mod error;
pub mod transport;
pub mod upload;

pub use client::UploadClient;
pub use error::Error;
pub use upload::{
	UploadEvents, UploadManager, UploadSession, UploadStatus, UploadSummary, UploadTask,
	retry::RetryPolicy,
};
