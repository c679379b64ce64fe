use std::{convert::Infallible, time::Duration};

use bytes::Bytes;
use coachly_types::{
	api::{
		response::ApiEnvelope,
		upload::{complete, initiate, part_url},
	},
	fs::UploadedResource,
};
use futures::{Stream, future::BoxFuture};
use log::{debug, warn};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

use crate::{
	api,
	consts::PROGRESS_FRAME_SIZE,
	error::Error,
	transport::{ProgressCallback, UploadTransport},
};

/// HTTP client for the library upload gateway.
pub struct UploadClient {
	http: reqwest::Client,
	gateway: String,
	api_key: String,
}

impl UploadClient {
	pub fn new(gateway: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
		let http = reqwest::Client::builder()
			.build()
			.map_err(Error::Network)?;
		Ok(Self {
			http,
			gateway: gateway.into(),
			api_key: api_key.into(),
		})
	}

	fn endpoint_url(&self, endpoint: &str) -> String {
		format!("{}/{}", self.gateway.trim_end_matches('/'), endpoint)
	}

	pub(crate) async fn post_request<T, U>(
		&self,
		request: &T,
		endpoint: &'static str,
	) -> Result<U, Error>
	where
		T: Serialize,
		U: DeserializeOwned + std::fmt::Debug,
	{
		debug!("POST {endpoint}");
		let response = self
			.http
			.post(self.endpoint_url(endpoint))
			.bearer_auth(&self.api_key)
			.json(request)
			.send()
			.await
			.map_err(Error::from_reqwest)?;
		let status = response.status();
		let body = response
			.json::<serde_json::Value>()
			.await
			.map_err(Error::from_reqwest)?;

		// The gateway reports errors through the envelope rather than the
		// HTTP status alone, so check `success` before touching the payload.
		let envelope: ApiEnvelope = serde_json::from_value(body.clone())?;
		if let Err(e) = envelope.check_status() {
			warn!("Request to {endpoint} rejected ({status}): {e}");
			return Err(e.into());
		}
		Ok(serde_json::from_value(body)?)
	}
}

impl UploadTransport for UploadClient {
	fn initiate<'a>(
		&'a self,
		request: &'a initiate::Request<'a>,
	) -> BoxFuture<'a, Result<initiate::Response, Error>> {
		Box::pin(api::upload::initiate::post(self, request))
	}

	fn part_url<'a>(
		&'a self,
		request: &'a part_url::Request<'a>,
	) -> BoxFuture<'a, Result<String, Error>> {
		Box::pin(async move {
			let response = api::upload::part_url::post(self, request).await?;
			Ok(response.presigned_url)
		})
	}

	fn complete_single<'a>(
		&'a self,
		request: &'a complete::single::Request<'a>,
	) -> BoxFuture<'a, Result<UploadedResource, Error>> {
		Box::pin(async move {
			let response = api::upload::complete::single::post(self, request).await?;
			Ok(response.data)
		})
	}

	fn complete_multipart<'a>(
		&'a self,
		request: &'a complete::multipart::Request<'a>,
	) -> BoxFuture<'a, Result<UploadedResource, Error>> {
		Box::pin(async move {
			let response = api::upload::complete::multipart::post(self, request).await?;
			Ok(response.data)
		})
	}

	fn put_presigned<'a>(
		&'a self,
		url: &'a str,
		body: Bytes,
		content_type: &'a str,
		timeout: Duration,
		on_progress: Option<ProgressCallback>,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Option<String>, Error>> {
		Box::pin(async move {
			let total = body.len();
			let request = self
				.http
				.put(url)
				.header(reqwest::header::CONTENT_TYPE, content_type)
				.header(reqwest::header::CONTENT_LENGTH, total)
				.timeout(timeout)
				.body(reqwest::Body::wrap_stream(progress_body(body, on_progress)));

			// Dropping the send future aborts the in-flight transfer.
			let response = tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				response = request.send() => response.map_err(Error::from_reqwest)?,
			};

			let status = response.status();
			if !status.is_success() {
				return Err(Error::UploadFailed {
					status: status.as_u16(),
					status_text: status.canonical_reason().unwrap_or("unknown").to_string(),
				});
			}
			// Storage providers behind restrictive CORS policies may hide the
			// ETag header; the backend resolves those parts server-side.
			Ok(response
				.headers()
				.get(reqwest::header::ETAG)
				.and_then(|value| value.to_str().ok())
				.map(|etag| etag.trim_matches('"').to_string()))
		})
	}
}

/// Splits `body` into fixed-size frames and reports cumulative progress as
/// each frame is handed to the transport.
fn progress_body(
	body: Bytes,
	on_progress: Option<ProgressCallback>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
	let total = body.len();
	async_stream::stream! {
		let mut rest = body;
		let mut sent = 0usize;
		while !rest.is_empty() {
			let frame = rest.split_to(rest.len().min(PROGRESS_FRAME_SIZE));
			sent += frame.len();
			if let Some(callback) = &on_progress {
				callback(sent as f64 / total as f64 * 100.0);
			}
			yield Ok(frame);
		}
	}
}
