use std::{borrow::Cow, sync::Arc};

use coachly_types::{
	api::upload::{complete, initiate},
	fs::UploadedResource,
};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
	consts::{DEFAULT_MAX_WORKERS, FILE_UPLOAD_TIMEOUT},
	error::Error,
	transport::{ProgressCallback, UploadTransport},
	upload::{
		NoopEvents, UploadEvents, UploadTask, or_cancelled, parallel,
		parallel::ProgressTracker,
		retry::{RetryCallback, RetryPolicy},
	},
};

/// Lifecycle of one file's upload.
///
/// `Pending` and `Uploading` are transient; the other states are terminal
/// and are only left by starting a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
	Pending,
	Uploading,
	Completed,
	Failed,
	Cancelled,
}

/// Drives a single file through initiate, upload and complete.
///
/// The gateway decides between a single presigned PUT and a multipart
/// upload when the session initiates; the session follows whichever branch
/// it is given. Each stage's network calls are individually retry-wrapped;
/// a stage failure is terminal for this file only.
pub struct UploadSession {
	task: UploadTask,
	transport: Arc<dyn UploadTransport>,
	events: Arc<dyn UploadEvents>,
	retry: RetryPolicy,
	max_workers: usize,
	cancel: CancellationToken,
}

impl UploadSession {
	pub fn new(task: UploadTask, transport: Arc<dyn UploadTransport>) -> Self {
		Self {
			task,
			transport,
			events: Arc::new(NoopEvents),
			retry: RetryPolicy::default(),
			max_workers: DEFAULT_MAX_WORKERS,
			cancel: CancellationToken::new(),
		}
	}

	pub fn events(mut self, events: Arc<dyn UploadEvents>) -> Self {
		self.events = events;
		self
	}

	pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn max_workers(mut self, max_workers: usize) -> Self {
		self.max_workers = max_workers;
		self
	}

	pub fn cancel_with(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;
		self
	}

	pub fn task_id(&self) -> Uuid {
		self.task.id
	}

	/// Cancelling this token aborts every in-flight network operation of
	/// the session without triggering retries.
	pub fn cancel_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	pub async fn run(self) -> Result<UploadedResource, Error> {
		let task_id = self.task.id;
		self.events.on_status(task_id, UploadStatus::Pending);
		debug!("Starting upload session {task_id} ({})", self.task.file_name);
		let result = self.drive().await;
		match &result {
			Ok(resource) => {
				self.events.on_progress(task_id, 100.0);
				self.events.on_status(task_id, UploadStatus::Completed);
				self.events.on_complete(task_id, resource);
			}
			Err(e) if e.is_cancellation() => {
				debug!("Upload session {task_id} cancelled");
				self.events.on_status(task_id, UploadStatus::Cancelled);
			}
			Err(e) => {
				warn!("Upload session {task_id} failed: {e}");
				self.events.on_status(task_id, UploadStatus::Failed);
			}
		}
		result
	}

	async fn drive(&self) -> Result<UploadedResource, Error> {
		let task = &self.task;
		let limit = task.category.max_file_size();
		if task.size() > limit {
			return Err(Error::FileTooLarge {
				size: task.size(),
				limit,
			});
		}
		if self.cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}
		self.events.on_status(task.id, UploadStatus::Uploading);

		let request = initiate::Request {
			file_name: Cow::Borrowed(task.file_name.as_str()),
			file_size: task.size(),
			file_type: Cow::Borrowed(task.file_type.as_str()),
			category: task.category,
		};
		let response = self
			.retry
			.run(
				initiate::ENDPOINT,
				&self.cancel,
				|attempt| self.events.on_retry(task.id, attempt),
				|_| {
					let transport = self.transport.clone();
					let cancel = &self.cancel;
					let request = &request;
					async move { or_cancelled(cancel, transport.initiate(request)).await }
				},
			)
			.await?;

		match response {
			initiate::Response::Single(info) => self.upload_single(&info).await,
			initiate::Response::Multipart(info) => self.upload_multipart(&info).await,
		}
	}

	async fn upload_single(
		&self,
		info: &initiate::SingleUploadInfo,
	) -> Result<UploadedResource, Error> {
		let task = &self.task;
		// one-chunk tracker keeps whole-file progress monotonic across retries
		let tracker = Arc::new(ProgressTracker::new(1, Some(self.progress_callback())));
		let progress: ProgressCallback = Arc::new(move |percent| tracker.record(0, percent));

		self.retry
			.run(
				"upload",
				&self.cancel,
				|attempt| self.events.on_retry(task.id, attempt),
				|_| {
					let transport = self.transport.clone();
					let cancel = self.cancel.clone();
					let url = info.presigned_url.as_str();
					let body = task.bytes.clone();
					let content_type = task.file_type.as_str();
					let progress = progress.clone();
					async move {
						transport
							.put_presigned(
								url,
								body,
								content_type,
								FILE_UPLOAD_TIMEOUT,
								Some(progress),
								&cancel,
							)
							.await
					}
				},
			)
			.await?;

		let request = self.complete_request(&info.file_path, &info.file_name);
		self.retry
			.run(
				complete::single::ENDPOINT,
				&self.cancel,
				|attempt| self.events.on_retry(task.id, attempt),
				|_| {
					let transport = self.transport.clone();
					let cancel = &self.cancel;
					let request = &request;
					async move { or_cancelled(cancel, transport.complete_single(request)).await }
				},
			)
			.await
	}

	async fn upload_multipart(
		&self,
		info: &initiate::MultipartUploadInfo,
	) -> Result<UploadedResource, Error> {
		let task = &self.task;
		if info.total_chunks == 0 || info.chunk_size == 0 {
			return Err(Error::UnexpectedResponse {
				endpoint: initiate::ENDPOINT,
				reason: "multipart upload with no chunks",
			});
		}

		let on_retry: RetryCallback = {
			let events = self.events.clone();
			let task_id = task.id;
			Arc::new(move |attempt| events.on_retry(task_id, attempt))
		};
		let parts = parallel::upload_all_parts(
			self.transport.clone(),
			task.bytes.clone(),
			info,
			self.retry,
			Some(self.progress_callback()),
			Some(on_retry),
			&self.cancel,
			self.max_workers,
		)
		.await?;

		let request = complete::multipart::Request {
			file: self.complete_request(&info.file_path, &info.file_name),
			upload_id: Cow::Borrowed(info.upload_id.as_str()),
			parts: Cow::Borrowed(parts.as_slice()),
		};
		self.retry
			.run(
				complete::multipart::ENDPOINT,
				&self.cancel,
				|attempt| self.events.on_retry(task.id, attempt),
				|_| {
					let transport = self.transport.clone();
					let cancel = &self.cancel;
					let request = &request;
					async move { or_cancelled(cancel, transport.complete_multipart(request)).await }
				},
			)
			.await
	}

	fn progress_callback(&self) -> ProgressCallback {
		let events = self.events.clone();
		let task_id = self.task.id;
		Arc::new(move |percent| events.on_progress(task_id, percent))
	}

	fn complete_request<'a>(
		&'a self,
		file_path: &'a str,
		file_name: &'a str,
	) -> complete::single::Request<'a> {
		let task = &self.task;
		complete::single::Request {
			file_path: Cow::Borrowed(file_path),
			file_name: Cow::Borrowed(file_name),
			title: Cow::Borrowed(task.title.as_str()),
			description: Cow::Borrowed(task.description.as_str()),
			author: Cow::Borrowed(task.author.as_str()),
			category: task.category,
			file_size: task.size(),
			file_type: Cow::Borrowed(task.file_type.as_str()),
			folder_id: task.folder_id,
		}
	}
}
