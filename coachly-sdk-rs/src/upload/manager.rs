use std::{collections::HashMap, sync::Arc};

use log::{info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
	consts::{GLOBAL_CONCURRENCY_CEILING, MIN_WORKERS_PER_FILE},
	transport::UploadTransport,
	upload::{NoopEvents, UploadEvents, UploadSession, UploadTask, retry::RetryPolicy},
};

/// Outcome of a batch, with per-task failure details.
#[derive(Debug, Default)]
pub struct UploadSummary {
	pub succeeded: usize,
	pub failed: usize,
	pub errors: Vec<(Uuid, String)>,
}

/// Splits a global chunk-worker ceiling across the files of a batch.
///
/// Every file keeps at least `MIN_WORKERS_PER_FILE` workers so large batches
/// still make visible progress on each file, accepting that the ceiling is a
/// soft limit once `file_count` exceeds `ceiling / MIN_WORKERS_PER_FILE`.
pub fn per_file_workers(ceiling: usize, file_count: usize) -> usize {
	(ceiling / file_count.max(1)).max(MIN_WORKERS_PER_FILE)
}

/// Runs a batch of uploads concurrently and aggregates the results.
///
/// One file failing or being cancelled never affects its siblings; only
/// [`UploadManager::cancel_all`] stops the whole batch.
pub struct UploadManager {
	transport: Arc<dyn UploadTransport>,
	events: Arc<dyn UploadEvents>,
	retry: RetryPolicy,
	ceiling: usize,
	tokens: Mutex<HashMap<Uuid, CancellationToken>>,
	batch_cancel: CancellationToken,
}

impl UploadManager {
	pub fn new(transport: Arc<dyn UploadTransport>) -> Self {
		Self {
			transport,
			events: Arc::new(NoopEvents),
			retry: RetryPolicy::default(),
			ceiling: GLOBAL_CONCURRENCY_CEILING,
			tokens: Mutex::new(HashMap::new()),
			batch_cancel: CancellationToken::new(),
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

	pub fn concurrency_ceiling(mut self, ceiling: usize) -> Self {
		self.ceiling = ceiling;
		self
	}

	/// Cancels one in-flight upload. Unknown ids are ignored.
	pub async fn cancel(&self, task_id: Uuid) {
		if let Some(token) = self.tokens.lock().await.get(&task_id) {
			token.cancel();
		}
	}

	/// Cancels every upload started by this manager.
	pub fn cancel_all(&self) {
		self.batch_cancel.cancel();
	}

	/// Uploads all tasks concurrently, returning once every one has reached
	/// a terminal state.
	pub async fn upload_all(&self, tasks: Vec<UploadTask>) -> UploadSummary {
		let workers = per_file_workers(self.ceiling, tasks.len());
		info!(
			"Uploading {} files with {workers} chunk workers each",
			tasks.len()
		);

		let mut sessions = tokio::task::JoinSet::new();
		for task in tasks {
			let task_id = task.id;
			let token = self.batch_cancel.child_token();
			self.tokens.lock().await.insert(task_id, token.clone());
			let session = UploadSession::new(task, self.transport.clone())
				.events(self.events.clone())
				.retry_policy(self.retry)
				.max_workers(workers)
				.cancel_with(token);
			sessions.spawn(async move { (task_id, session.run().await) });
		}

		let mut summary = UploadSummary::default();
		while let Some(joined) = sessions.join_next().await {
			let (task_id, result) = joined.expect("upload session panicked");
			match result {
				Ok(_) => summary.succeeded += 1,
				Err(e) => {
					if !e.is_cancellation() {
						warn!("Upload {task_id} failed: {e}");
					}
					summary.failed += 1;
					summary.errors.push((task_id, e.to_string()));
				}
			}
			self.tokens.lock().await.remove(&task_id);
		}
		summary
	}
}

impl UploadSummary {
	pub fn error_for(&self, task_id: Uuid) -> Option<&str> {
		self.errors
			.iter()
			.find(|(id, _)| *id == task_id)
			.map(|(_, message)| message.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn worker_budget_splits_the_ceiling() {
		assert_eq!(per_file_workers(12, 1), 12);
		assert_eq!(per_file_workers(12, 2), 6);
		assert_eq!(per_file_workers(12, 3), 4);
		assert_eq!(per_file_workers(12, 4), 3);
		assert_eq!(per_file_workers(12, 6), 2);
	}

	#[test]
	fn worker_budget_never_starves_a_file() {
		for file_count in 1..=20 {
			let workers = per_file_workers(12, file_count);
			assert!(workers >= MIN_WORKERS_PER_FILE);
			if file_count <= 6 {
				assert!(workers * file_count <= 12);
			}
		}
		// empty batches still get a sane value
		assert_eq!(per_file_workers(12, 0), 12);
	}
}
