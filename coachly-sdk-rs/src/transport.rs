use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use coachly_types::{
	api::upload::{complete, initiate, part_url},
	fs::UploadedResource,
};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Fractional progress callback, in percent of the transfer (0-100).
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Seam between the upload orchestration and the network.
///
/// [`crate::client::UploadClient`] is the production implementation; tests
/// substitute a scripted transport. The orchestration stack only ever talks
/// to the gateway and the storage provider through this trait.
pub trait UploadTransport: Send + Sync {
	fn initiate<'a>(
		&'a self,
		request: &'a initiate::Request<'a>,
	) -> BoxFuture<'a, Result<initiate::Response, Error>>;

	fn part_url<'a>(
		&'a self,
		request: &'a part_url::Request<'a>,
	) -> BoxFuture<'a, Result<String, Error>>;

	fn complete_single<'a>(
		&'a self,
		request: &'a complete::single::Request<'a>,
	) -> BoxFuture<'a, Result<UploadedResource, Error>>;

	fn complete_multipart<'a>(
		&'a self,
		request: &'a complete::multipart::Request<'a>,
	) -> BoxFuture<'a, Result<UploadedResource, Error>>;

	/// Binary PUT of `body` to a presigned storage URL.
	///
	/// Returns the ETag response header if the storage provider exposed it,
	/// with surrounding quotes stripped. Cancelling `cancel` must abort the
	/// in-flight transfer with [`Error::Cancelled`].
	fn put_presigned<'a>(
		&'a self,
		url: &'a str,
		body: Bytes,
		content_type: &'a str,
		timeout: Duration,
		on_progress: Option<ProgressCallback>,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Option<String>, Error>>;
}
