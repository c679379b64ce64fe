use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU32, Ordering},
	},
	time::Duration,
};

use bytes::Bytes;
use coachly_sdk_rs::{
	UploadEvents, UploadStatus,
	error::Error,
	transport::{ProgressCallback, UploadTransport},
};
use coachly_types::{
	api::upload::{CompletedPart, complete, initiate, part_url},
	fs::UploadedResource,
};
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything the mock gateway observed, for assertions.
#[derive(Debug, Default)]
pub struct CallLog {
	pub initiates: u32,
	/// (file name, part number) per part-url request, prefetch and on-demand
	/// alike.
	pub part_urls: Vec<(String, u16)>,
	/// Presigned URLs that received a PUT, in arrival order.
	pub puts: Vec<String>,
	pub single_completes: u32,
	pub multipart_completes: u32,
	/// Parts submitted with the last complete-multipart call.
	pub submitted_parts: Vec<CompletedPart>,
}

/// Scripted in-memory stand-in for the gateway and the storage provider.
///
/// Presigned URLs encode the file name, part number and a per-part serial
/// (`mock://{file}/{part}/{serial}`), so tests can tell a reused prefetched
/// URL from a freshly fetched one. Single-shot uploads PUT to
/// `mock://{file}/single`. The multipart `uploadId` is simply the file name.
pub struct MockTransport {
	multipart_threshold: u64,
	chunk_size: u64,
	fail_puts: Mutex<HashMap<(String, u16), u32>>,
	fail_part_urls: AtomicU32,
	fail_initiates: AtomicU32,
	block_parts_from: Option<u16>,
	blocked: Arc<Semaphore>,
	url_serials: Mutex<HashMap<(String, u16), u32>>,
	pub calls: Mutex<CallLog>,
}

impl MockTransport {
	pub fn new(multipart_threshold: u64, chunk_size: u64) -> Self {
		Self {
			multipart_threshold,
			chunk_size,
			fail_puts: Mutex::new(HashMap::new()),
			fail_part_urls: AtomicU32::new(0),
			fail_initiates: AtomicU32::new(0),
			block_parts_from: None,
			blocked: Arc::new(Semaphore::new(0)),
			url_serials: Mutex::new(HashMap::new()),
			calls: Mutex::new(CallLog::default()),
		}
	}

	/// Makes the next `times` PUTs of `part` for `file` fail with a 500.
	/// `u32::MAX` means every attempt fails. Part 0 is the single-shot PUT.
	pub fn fail_put(self, file: &str, part: u16, times: u32) -> Self {
		self.fail_puts
			.lock()
			.unwrap()
			.insert((file.to_string(), part), times);
		self
	}

	/// Makes the next `times` part-url requests fail, whichever file they
	/// belong to. Used to force the on-demand fallback.
	pub fn fail_part_urls(self, times: u32) -> Self {
		self.fail_part_urls.store(times, Ordering::SeqCst);
		self
	}

	pub fn fail_initiates(self, times: u32) -> Self {
		self.fail_initiates.store(times, Ordering::SeqCst);
		self
	}

	/// PUTs for parts >= `part` park until their cancellation token fires,
	/// then fail with `Error::Cancelled`, simulating mid-flight aborts.
	pub fn block_parts_from(mut self, part: u16) -> Self {
		self.block_parts_from = Some(part);
		self
	}

	/// Resolves once `count` PUTs are parked on the block above.
	pub async fn wait_until_blocked(&self, count: u32) {
		self.blocked
			.acquire_many(count)
			.await
			.expect("semaphore closed")
			.forget();
	}

	pub fn puts_for_part(&self, file: &str, part: u16) -> Vec<String> {
		let prefix = format!("mock://{file}/{part}/");
		self.calls
			.lock()
			.unwrap()
			.puts
			.iter()
			.filter(|url| url.starts_with(&prefix))
			.cloned()
			.collect()
	}

	fn next_url(&self, file: &str, part: u16) -> String {
		let mut serials = self.url_serials.lock().unwrap();
		let serial = serials.entry((file.to_string(), part)).or_insert(0);
		let url = format!("mock://{file}/{part}/{serial}");
		*serial += 1;
		url
	}

	fn parse_put_url(url: &str) -> (String, u16) {
		let mut segments = url
			.strip_prefix("mock://")
			.unwrap_or(url)
			.split('/');
		let file = segments.next().unwrap_or_default().to_string();
		let part = match segments.next() {
			Some("single") | None => 0,
			Some(part) => part.parse().expect("malformed mock part url"),
		};
		(file, part)
	}

	fn take_failure(&self, file: &str, part: u16) -> bool {
		let mut failures = self.fail_puts.lock().unwrap();
		match failures.get_mut(&(file.to_string(), part)) {
			Some(0) | None => false,
			Some(&mut u32::MAX) => true,
			Some(remaining) => {
				*remaining -= 1;
				true
			}
		}
	}
}

impl UploadTransport for MockTransport {
	fn initiate<'a>(
		&'a self,
		request: &'a initiate::Request<'a>,
	) -> BoxFuture<'a, Result<initiate::Response, Error>> {
		Box::pin(async move {
			self.calls.lock().unwrap().initiates += 1;
			if self
				.fail_initiates
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
				.is_ok()
			{
				return Err(Error::UploadFailed {
					status: 500,
					status_text: "Internal Server Error".to_string(),
				});
			}
			let file = request.file_name.to_string();
			let file_path = format!("library/{}/{file}", request.category);
			let public_url = format!("https://cdn.test/{file_path}");
			if request.file_size > self.multipart_threshold {
				Ok(initiate::Response::Multipart(initiate::MultipartUploadInfo {
					upload_id: file.clone(),
					file_path,
					file_name: file,
					public_url,
					chunk_size: self.chunk_size,
					total_chunks: request.file_size.div_ceil(self.chunk_size),
					expires_in: 3600,
				}))
			} else {
				Ok(initiate::Response::Single(initiate::SingleUploadInfo {
					presigned_url: format!("mock://{file}/single"),
					file_path,
					file_name: file,
					public_url,
					expires_in: 3600,
				}))
			}
		})
	}

	fn part_url<'a>(
		&'a self,
		request: &'a part_url::Request<'a>,
	) -> BoxFuture<'a, Result<String, Error>> {
		Box::pin(async move {
			let file = request.upload_id.to_string();
			self.calls
				.lock()
				.unwrap()
				.part_urls
				.push((file.clone(), request.part_number));
			if self
				.fail_part_urls
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
				.is_ok()
			{
				return Err(Error::UploadFailed {
					status: 503,
					status_text: "Service Unavailable".to_string(),
				});
			}
			Ok(self.next_url(&file, request.part_number))
		})
	}

	fn complete_single<'a>(
		&'a self,
		request: &'a complete::single::Request<'a>,
	) -> BoxFuture<'a, Result<UploadedResource, Error>> {
		Box::pin(async move {
			self.calls.lock().unwrap().single_completes += 1;
			Ok(UploadedResource {
				url: format!("https://cdn.test/{}", request.file_path),
				filename: request.file_name.to_string(),
			})
		})
	}

	fn complete_multipart<'a>(
		&'a self,
		request: &'a complete::multipart::Request<'a>,
	) -> BoxFuture<'a, Result<UploadedResource, Error>> {
		Box::pin(async move {
			let mut calls = self.calls.lock().unwrap();
			calls.multipart_completes += 1;
			calls.submitted_parts = request.parts.to_vec();
			Ok(UploadedResource {
				url: format!("https://cdn.test/{}", request.file.file_path),
				filename: request.file.file_name.to_string(),
			})
		})
	}

	fn put_presigned<'a>(
		&'a self,
		url: &'a str,
		body: Bytes,
		_content_type: &'a str,
		_timeout: Duration,
		on_progress: Option<ProgressCallback>,
		cancel: &'a CancellationToken,
	) -> BoxFuture<'a, Result<Option<String>, Error>> {
		Box::pin(async move {
			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}
			self.calls.lock().unwrap().puts.push(url.to_string());
			let (file, part) = Self::parse_put_url(url);
			if let Some(from) = self.block_parts_from
				&& part >= from
			{
				self.blocked.add_permits(1);
				cancel.cancelled().await;
				return Err(Error::Cancelled);
			}
			if self.take_failure(&file, part) {
				return Err(Error::UploadFailed {
					status: 500,
					status_text: "Internal Server Error".to_string(),
				});
			}
			let _ = body;
			if let Some(on_progress) = on_progress {
				on_progress(100.0);
			}
			Ok(Some(format!("etag-{file}-{part}")))
		})
	}
}

/// [`UploadEvents`] sink that records everything it sees.
#[derive(Default)]
pub struct RecordingEvents {
	pub statuses: Mutex<Vec<(Uuid, UploadStatus)>>,
	pub progress: Mutex<Vec<(Uuid, f64)>>,
	pub retries: Mutex<Vec<(Uuid, u32)>>,
	pub completed: Mutex<Vec<(Uuid, UploadedResource)>>,
}

impl RecordingEvents {
	pub fn statuses_for(&self, task_id: Uuid) -> Vec<UploadStatus> {
		self.statuses
			.lock()
			.unwrap()
			.iter()
			.filter(|(id, _)| *id == task_id)
			.map(|(_, status)| *status)
			.collect()
	}

	pub fn progress_for(&self, task_id: Uuid) -> Vec<f64> {
		self.progress
			.lock()
			.unwrap()
			.iter()
			.filter(|(id, _)| *id == task_id)
			.map(|(_, percent)| *percent)
			.collect()
	}

	pub fn retries_for(&self, task_id: Uuid) -> Vec<u32> {
		self.retries
			.lock()
			.unwrap()
			.iter()
			.filter(|(id, _)| *id == task_id)
			.map(|(_, attempt)| *attempt)
			.collect()
	}
}

impl UploadEvents for RecordingEvents {
	fn on_status(&self, task_id: Uuid, status: UploadStatus) {
		self.statuses.lock().unwrap().push((task_id, status));
	}

	fn on_progress(&self, task_id: Uuid, percent: f64) {
		self.progress.lock().unwrap().push((task_id, percent));
	}

	fn on_retry(&self, task_id: Uuid, attempt: u32) {
		self.retries.lock().unwrap().push((task_id, attempt));
	}

	fn on_complete(&self, task_id: Uuid, resource: &UploadedResource) {
		self.completed
			.lock()
			.unwrap()
			.push((task_id, resource.clone()));
	}
}
