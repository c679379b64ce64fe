use bytes::Bytes;
use coachly_types::fs::{FileCategory, UploadedResource};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Error;

pub(crate) mod parallel;
pub(crate) mod presign;

pub mod manager;
pub mod retry;
pub mod session;

pub use manager::{UploadManager, UploadSummary};
pub use session::{UploadSession, UploadStatus};

/// One user-selected file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadTask {
	pub id: Uuid,
	pub file_name: String,
	pub bytes: Bytes,
	pub file_type: String,
	pub category: FileCategory,
	pub title: String,
	pub description: String,
	pub author: String,
	pub folder_id: Option<Uuid>,
}

impl UploadTask {
	pub fn new(file_name: impl Into<String>, bytes: Bytes, category: FileCategory) -> Self {
		let file_name = file_name.into();
		let file_type = mime_guess::from_path(&file_name)
			.first_or_octet_stream()
			.essence_str()
			.to_string();
		// Default the title to the file stem, the same way the upload dialog
		// pre-fills it.
		let title = file_name
			.split('.')
			.next()
			.unwrap_or(file_name.as_str())
			.to_string();
		Self {
			id: Uuid::new_v4(),
			file_name,
			bytes,
			file_type,
			category,
			title,
			description: String::new(),
			author: String::new(),
			folder_id: None,
		}
	}

	pub fn size(&self) -> u64 {
		self.bytes.len() as u64
	}

	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	pub fn author(mut self, author: impl Into<String>) -> Self {
		self.author = author.into();
		self
	}

	pub fn folder(mut self, folder_id: Uuid) -> Self {
		self.folder_id = Some(folder_id);
		self
	}
}

/// Per-file upload lifecycle events, for UI binding.
///
/// Uploads run concurrently, so implementations must be prepared for
/// interleaved events from different tasks.
pub trait UploadEvents: Send + Sync {
	fn on_status(&self, task_id: Uuid, status: UploadStatus) {
		let _ = (task_id, status);
	}
	fn on_progress(&self, task_id: Uuid, percent: f64) {
		let _ = (task_id, percent);
	}
	fn on_retry(&self, task_id: Uuid, attempt: u32) {
		let _ = (task_id, attempt);
	}
	fn on_complete(&self, task_id: Uuid, resource: &UploadedResource) {
		let _ = (task_id, resource);
	}
}

pub(crate) struct NoopEvents;

impl UploadEvents for NoopEvents {}

/// Races `future` against `cancel`, so pending gateway calls abort promptly.
pub(crate) async fn or_cancelled<T>(
	cancel: &CancellationToken,
	future: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(Error::Cancelled),
		result = future => result,
	}
}
