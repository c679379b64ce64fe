use std::{
	borrow::Cow,
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU32, AtomicUsize, Ordering},
	},
};

use bytes::Bytes;
use coachly_types::api::upload::{CompletedPart, initiate, part_url};
use log::warn;
use tokio_util::sync::CancellationToken;

use crate::{
	consts::{CHUNK_UPLOAD_TIMEOUT, MAX_PART_NUMBER, OCTET_STREAM},
	error::Error,
	transport::{ProgressCallback, UploadTransport},
	upload::{
		or_cancelled, presign,
		retry::{RetryCallback, RetryPolicy},
	},
};

/// Aggregates per-chunk progress into one overall percentage.
///
/// The overall value is the arithmetic mean of all chunks' individual
/// progress, which stays smooth and monotonic even though workers complete
/// chunks out of order. Per-chunk values only ever move forward, so a chunk
/// restarting after a retry cannot drag the aggregate down.
pub(crate) struct ProgressTracker {
	// hundredths of a percent, so the aggregate fits atomics
	per_chunk: Vec<AtomicU32>,
	reported: Mutex<u64>,
	callback: Option<ProgressCallback>,
}

impl ProgressTracker {
	pub(crate) fn new(total_chunks: usize, callback: Option<ProgressCallback>) -> Self {
		Self {
			per_chunk: (0..total_chunks).map(|_| AtomicU32::new(0)).collect(),
			reported: Mutex::new(0),
			callback,
		}
	}

	pub(crate) fn record(&self, chunk_index: usize, percent: f64) {
		let clamped = (percent.clamp(0.0, 100.0) * 100.0) as u32;
		self.per_chunk[chunk_index].fetch_max(clamped, Ordering::Relaxed);
		// The staleness check and the callback must happen under the same
		// lock, otherwise two workers can deliver their aggregates out of
		// order.
		let mut reported = self.reported.lock().unwrap();
		let sum: u64 = self
			.per_chunk
			.iter()
			.map(|chunk| u64::from(chunk.load(Ordering::Relaxed)))
			.sum();
		let overall = sum / self.per_chunk.len() as u64;
		if overall > *reported {
			*reported = overall;
			if let Some(callback) = &self.callback {
				callback(overall as f64 / 100.0);
			}
		}
	}
}

fn chunk_bounds(index: usize, chunk_size: usize, file_len: usize) -> (usize, usize) {
	let start = (index * chunk_size).min(file_len);
	(start, file_len.min(start + chunk_size))
}

#[derive(Clone)]
struct WorkerContext {
	transport: Arc<dyn UploadTransport>,
	file: Bytes,
	file_path: Arc<str>,
	upload_id: Arc<str>,
	chunk_size: usize,
	total_chunks: usize,
	urls: Arc<HashMap<u16, String>>,
	cursor: Arc<AtomicUsize>,
	tracker: Arc<ProgressTracker>,
	retry: RetryPolicy,
	on_retry: Option<RetryCallback>,
	cancel: CancellationToken,
}

/// Uploads every part of a multipart upload with a bounded worker pool.
///
/// Workers pull chunk indices from a shared cursor until none remain. The
/// first failure (after that chunk's retries are exhausted) cancels the
/// remaining workers; on success the collected parts are returned sorted by
/// part number.
pub(crate) async fn upload_all_parts(
	transport: Arc<dyn UploadTransport>,
	file: Bytes,
	info: &initiate::MultipartUploadInfo,
	retry: RetryPolicy,
	on_progress: Option<ProgressCallback>,
	on_retry: Option<RetryCallback>,
	cancel: &CancellationToken,
	max_workers: usize,
) -> Result<Vec<CompletedPart>, Error> {
	if info.total_chunks > u64::from(MAX_PART_NUMBER) {
		return Err(Error::UnexpectedResponse {
			endpoint: initiate::ENDPOINT,
			reason: "too many parts",
		});
	}
	let total_chunks = info.total_chunks as usize;

	let urls = match presign::fetch_all(
		transport.as_ref(),
		&info.file_path,
		&info.upload_id,
		info.total_chunks as u16,
		cancel,
	)
	.await
	{
		Ok(urls) => urls,
		Err(e) if e.is_cancellation() => return Err(e),
		Err(e) => {
			warn!(
				"Presigned url prefetch for {} failed, fetching per part on demand: {e}",
				info.file_path
			);
			HashMap::new()
		}
	};

	let worker_cancel = cancel.child_token();
	let context = WorkerContext {
		transport,
		file,
		file_path: Arc::from(info.file_path.as_str()),
		upload_id: Arc::from(info.upload_id.as_str()),
		chunk_size: info.chunk_size as usize,
		total_chunks,
		urls: Arc::new(urls),
		cursor: Arc::new(AtomicUsize::new(0)),
		tracker: Arc::new(ProgressTracker::new(total_chunks, on_progress)),
		retry,
		on_retry,
		cancel: worker_cancel.clone(),
	};

	let mut workers = tokio::task::JoinSet::new();
	for _ in 0..max_workers.max(1).min(total_chunks) {
		workers.spawn(run_worker(context.clone()));
	}

	let mut parts = Vec::with_capacity(total_chunks);
	let mut first_error: Option<Error> = None;
	while let Some(joined) = workers.join_next().await {
		match joined.expect("upload worker panicked") {
			Ok(mut worker_parts) => parts.append(&mut worker_parts),
			Err(e) => {
				worker_cancel.cancel();
				// siblings wind down with Cancelled, keep the root cause
				let replace = match &first_error {
					None => true,
					Some(previous) => previous.is_cancellation() && !e.is_cancellation(),
				};
				if replace {
					first_error = Some(e);
				}
			}
		}
	}

	if cancel.is_cancelled() {
		return Err(Error::Cancelled);
	}
	if let Some(e) = first_error {
		return Err(e);
	}
	parts.sort_by_key(|part| part.part_number);
	Ok(parts)
}

async fn run_worker(context: WorkerContext) -> Result<Vec<CompletedPart>, Error> {
	let mut parts = Vec::new();
	loop {
		if context.cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}
		let index = context.cursor.fetch_add(1, Ordering::SeqCst);
		if index >= context.total_chunks {
			return Ok(parts);
		}
		let part_number = (index + 1) as u16;
		let (start, end) = chunk_bounds(index, context.chunk_size, context.file.len());
		let chunk = context.file.slice(start..end);
		let prefetched = context.urls.get(&part_number);
		let progress: ProgressCallback = {
			let tracker = context.tracker.clone();
			Arc::new(move |percent| tracker.record(index, percent))
		};

		let label = format!("chunk {part_number}");
		let etag = context
			.retry
			.run(
				&label,
				&context.cancel,
				|attempt| {
					if let Some(callback) = &context.on_retry {
						callback(attempt);
					}
				},
				|attempt| {
					let transport = context.transport.clone();
					let chunk = chunk.clone();
					let progress = progress.clone();
					let cancel = context.cancel.clone();
					let file_path = context.file_path.clone();
					let upload_id = context.upload_id.clone();
					// a prefetched URL may have expired by the time a retry
					// runs, so retries always fetch a fresh one
					let prefetched = if attempt == 0 {
						prefetched.cloned()
					} else {
						None
					};
					async move {
						let url = match prefetched {
							Some(url) => url,
							None => {
								let request = part_url::Request {
									file_path: Cow::Borrowed(&*file_path),
									upload_id: Cow::Borrowed(&*upload_id),
									part_number,
								};
								or_cancelled(&cancel, transport.part_url(&request)).await?
							}
						};
						transport
							.put_presigned(
								&url,
								chunk,
								OCTET_STREAM,
								CHUNK_UPLOAD_TIMEOUT,
								Some(progress),
								&cancel,
							)
							.await
					}
				},
			)
			.await?;

		context.tracker.record(index, 100.0);
		parts.push(CompletedPart { part_number, etag });
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use super::*;

	#[test]
	fn chunk_bounds_cover_the_file_exactly() {
		assert_eq!(chunk_bounds(0, 5, 23), (0, 5));
		assert_eq!(chunk_bounds(3, 5, 23), (15, 20));
		assert_eq!(chunk_bounds(4, 5, 23), (20, 23));
		assert_eq!(chunk_bounds(0, 5, 3), (0, 3));
		// out of range claims collapse to an empty slice
		assert_eq!(chunk_bounds(5, 5, 23), (23, 23));
	}

	#[test]
	fn overall_progress_is_the_mean_of_parts() {
		let reported = Arc::new(Mutex::new(Vec::new()));
		let sink = reported.clone();
		let tracker = ProgressTracker::new(4, Some(Arc::new(move |percent: f64| {
			sink.lock().unwrap().push(percent);
		})));

		tracker.record(2, 100.0);
		tracker.record(0, 50.0);
		tracker.record(0, 100.0);
		tracker.record(3, 100.0);
		tracker.record(1, 100.0);

		let reported = reported.lock().unwrap();
		assert_eq!(reported[0], 25.0);
		assert!(reported.windows(2).all(|w| w[0] < w[1]));
		assert_eq!(*reported.last().unwrap(), 100.0);
	}

	#[test]
	fn progress_never_regresses_when_a_chunk_restarts() {
		let reported = Arc::new(Mutex::new(Vec::new()));
		let sink = reported.clone();
		let tracker = ProgressTracker::new(2, Some(Arc::new(move |percent: f64| {
			sink.lock().unwrap().push(percent);
		})));

		tracker.record(0, 80.0);
		// retry restarts the chunk's transfer from zero
		tracker.record(0, 10.0);
		tracker.record(0, 80.0);

		assert_eq!(*reported.lock().unwrap(), vec![40.0]);
	}

	#[test]
	fn concurrent_records_deliver_monotonic_progress() {
		let reported = Arc::new(Mutex::new(Vec::new()));
		let sink = reported.clone();
		let tracker = Arc::new(ProgressTracker::new(
			8,
			Some(Arc::new(move |percent: f64| {
				sink.lock().unwrap().push(percent);
			})),
		));

		let workers: Vec<_> = (0..8)
			.map(|chunk| {
				let tracker = tracker.clone();
				std::thread::spawn(move || {
					for step in 1..=100u32 {
						tracker.record(chunk, f64::from(step));
					}
				})
			})
			.collect();
		for worker in workers {
			worker.join().unwrap();
		}

		let reported = reported.lock().unwrap();
		assert!(reported.windows(2).all(|w| w[0] < w[1]));
		assert_eq!(*reported.last().unwrap(), 100.0);
	}
}
