use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use coachly_sdk_rs::{
	RetryPolicy, UploadManager, UploadSession, UploadStatus, UploadTask,
};
use coachly_types::fs::FileCategory;
use test_utils::{MockTransport, RecordingEvents, init_logger};

fn fast_retry() -> RetryPolicy {
	RetryPolicy::new(3, Duration::from_millis(1))
}

fn video_task(name: &str, size: usize) -> UploadTask {
	UploadTask::new(name, Bytes::from(vec![7u8; size]), FileCategory::Videos)
}

#[tokio::test]
async fn multipart_upload_completes_with_all_parts() {
	init_logger();
	let mock = Arc::new(MockTransport::new(10, 5));
	let events = Arc::new(RecordingEvents::default());
	let task = video_task("big.mp4", 23);
	let task_id = task.id;

	let session = UploadSession::new(task, mock.clone()).events(events.clone());
	let resource = session.run().await.unwrap();
	assert_eq!(resource.filename, "big.mp4");

	let calls = mock.calls.lock().unwrap();
	assert_eq!(calls.initiates, 1);
	assert_eq!(calls.multipart_completes, 1);
	assert_eq!(calls.single_completes, 0);
	assert_eq!(calls.puts.len(), 5);
	let part_numbers: Vec<u16> = calls
		.submitted_parts
		.iter()
		.map(|part| part.part_number)
		.collect();
	assert_eq!(part_numbers, vec![1, 2, 3, 4, 5]);
	assert!(calls.submitted_parts.iter().all(|part| part.etag.is_some()));
	drop(calls);

	assert_eq!(
		events.statuses_for(task_id),
		vec![
			UploadStatus::Pending,
			UploadStatus::Uploading,
			UploadStatus::Completed
		]
	);
	let progress = events.progress_for(task_id);
	assert!(!progress.is_empty());
	assert!(progress.windows(2).all(|w| w[0] <= w[1]));
	assert_eq!(*progress.last().unwrap(), 100.0);
}

#[tokio::test]
async fn small_file_takes_the_single_shot_path() {
	init_logger();
	let mock = Arc::new(MockTransport::new(1024, 512));
	let task = UploadTask::new("pic.png", Bytes::from_static(b"tiny"), FileCategory::Images);

	let resource = UploadSession::new(task, mock.clone()).run().await.unwrap();
	assert_eq!(resource.filename, "pic.png");

	let calls = mock.calls.lock().unwrap();
	assert_eq!(calls.puts, vec!["mock://pic.png/single"]);
	assert_eq!(calls.single_completes, 1);
	assert_eq!(calls.multipart_completes, 0);
	assert!(calls.part_urls.is_empty());
}

#[tokio::test]
async fn oversized_file_is_rejected_before_initiating() {
	init_logger();
	let mock = Arc::new(MockTransport::new(10, 5));
	let events = Arc::new(RecordingEvents::default());
	let size = FileCategory::Images.max_file_size() as usize + 1;
	let task = UploadTask::new("huge.png", Bytes::from(vec![0u8; size]), FileCategory::Images);
	let task_id = task.id;

	let error = UploadSession::new(task, mock.clone())
		.events(events.clone())
		.run()
		.await
		.unwrap_err();
	assert!(matches!(
		error,
		coachly_sdk_rs::Error::FileTooLarge { .. }
	));
	assert_eq!(mock.calls.lock().unwrap().initiates, 0);
	// the task was queued, then rejected without ever starting to upload
	assert_eq!(
		events.statuses_for(task_id),
		vec![UploadStatus::Pending, UploadStatus::Failed]
	);
}

#[tokio::test]
async fn transient_initiate_failures_are_retried() {
	init_logger();
	let mock = Arc::new(MockTransport::new(1024, 512).fail_initiates(2));
	let events = Arc::new(RecordingEvents::default());
	let task = UploadTask::new("pic.png", Bytes::from_static(b"tiny"), FileCategory::Images);
	let task_id = task.id;

	UploadSession::new(task, mock.clone())
		.events(events.clone())
		.retry_policy(fast_retry())
		.run()
		.await
		.unwrap();

	assert_eq!(mock.calls.lock().unwrap().initiates, 3);
	assert_eq!(events.retries_for(task_id), vec![1, 2]);
}

#[tokio::test]
async fn failed_chunk_retries_with_a_fresh_url() {
	init_logger();
	let mock = Arc::new(MockTransport::new(10, 5).fail_put("big.mp4", 2, 1));
	let events = Arc::new(RecordingEvents::default());
	let task = video_task("big.mp4", 23);
	let task_id = task.id;

	UploadSession::new(task, mock.clone())
		.events(events.clone())
		.retry_policy(fast_retry())
		.run()
		.await
		.unwrap();

	// the prefetched URL is only trusted on the first attempt
	let urls = mock.puts_for_part("big.mp4", 2);
	assert_eq!(urls, vec!["mock://big.mp4/2/0", "mock://big.mp4/2/1"]);
	assert_eq!(events.retries_for(task_id), vec![1]);
	assert_eq!(mock.calls.lock().unwrap().multipart_completes, 1);
}

#[tokio::test]
async fn prefetch_failure_falls_back_to_on_demand_urls() {
	init_logger();
	let mock = Arc::new(MockTransport::new(10, 5).fail_part_urls(1));
	let task = video_task("big.mp4", 23);

	UploadSession::new(task, mock.clone())
		.retry_policy(fast_retry())
		.run()
		.await
		.unwrap();

	let calls = mock.calls.lock().unwrap();
	assert_eq!(calls.multipart_completes, 1);
	assert_eq!(calls.submitted_parts.len(), 5);
	// every part still got a signed URL after the batch prefetch aborted
	for part in 1..=5u16 {
		assert!(
			calls
				.part_urls
				.iter()
				.any(|(file, n)| file == "big.mp4" && *n == part)
		);
	}
}

#[tokio::test]
async fn one_failing_file_does_not_fail_its_siblings() {
	init_logger();
	let mock = Arc::new(MockTransport::new(10, 5).fail_put("b.mp4", 3, u32::MAX));
	let events = Arc::new(RecordingEvents::default());
	let task_a = video_task("a.mp4", 23);
	let task_b = video_task("b.mp4", 23);
	let (id_a, id_b) = (task_a.id, task_b.id);

	let manager = UploadManager::new(mock.clone())
		.events(events.clone())
		.retry_policy(fast_retry());
	let summary = manager.upload_all(vec![task_a, task_b]).await;

	assert_eq!(summary.succeeded, 1);
	assert_eq!(summary.failed, 1);
	assert!(summary.error_for(id_a).is_none());
	assert!(summary.error_for(id_b).unwrap().contains("500"));

	// the doomed part burned its full retry budget
	assert_eq!(mock.puts_for_part("b.mp4", 3).len(), 4);
	assert_eq!(events.retries_for(id_b), vec![1, 2, 3]);
	assert!(events.retries_for(id_a).is_empty());

	assert_eq!(
		events.statuses_for(id_a),
		vec![
			UploadStatus::Pending,
			UploadStatus::Uploading,
			UploadStatus::Completed
		]
	);
	assert_eq!(
		events.statuses_for(id_b),
		vec![
			UploadStatus::Pending,
			UploadStatus::Uploading,
			UploadStatus::Failed
		]
	);
	// only the healthy file reached complete-multipart
	assert_eq!(mock.calls.lock().unwrap().multipart_completes, 1);
}

#[tokio::test]
async fn cancelling_a_session_aborts_in_flight_parts_without_retrying() {
	init_logger();
	let mock = Arc::new(MockTransport::new(10, 5).block_parts_from(3));
	let events = Arc::new(RecordingEvents::default());
	let task = video_task("big.mp4", 23);
	let task_id = task.id;

	let session = UploadSession::new(task, mock.clone()).events(events.clone());
	let cancel = session.cancel_token();
	let handle = tokio::spawn(session.run());

	mock.wait_until_blocked(3).await;
	let puts_before = mock.calls.lock().unwrap().puts.len();
	cancel.cancel();

	let error = handle.await.unwrap().unwrap_err();
	assert!(error.is_cancellation());

	let calls = mock.calls.lock().unwrap();
	assert_eq!(calls.puts.len(), puts_before);
	assert_eq!(calls.multipart_completes, 0);
	drop(calls);
	assert!(events.retries_for(task_id).is_empty());
	assert_eq!(
		events.statuses_for(task_id),
		vec![
			UploadStatus::Pending,
			UploadStatus::Uploading,
			UploadStatus::Cancelled
		]
	);
}

#[tokio::test]
async fn cancel_all_stops_every_file_in_the_batch() {
	init_logger();
	let mock = Arc::new(MockTransport::new(10, 5).block_parts_from(1));
	let task_a = video_task("a.mp4", 14);
	let task_b = video_task("b.mp4", 14);

	let manager = Arc::new(UploadManager::new(mock.clone()));
	let handle = tokio::spawn({
		let manager = manager.clone();
		async move { manager.upload_all(vec![task_a, task_b]).await }
	});

	// 3 chunks per file, every PUT parks on the block
	mock.wait_until_blocked(6).await;
	manager.cancel_all();

	let summary = handle.await.unwrap();
	assert_eq!(summary.succeeded, 0);
	assert_eq!(summary.failed, 2);
	assert_eq!(mock.calls.lock().unwrap().multipart_completes, 0);
}

#[tokio::test]
async fn cancelling_one_upload_leaves_the_rest_of_the_batch_running() {
	init_logger();
	let mock = Arc::new(MockTransport::new(10, 5).block_parts_from(1));
	let events = Arc::new(RecordingEvents::default());
	let task_a = video_task("a.mp4", 14);
	let task_b = video_task("b.mp4", 14);
	let (id_a, id_b) = (task_a.id, task_b.id);

	let manager = Arc::new(UploadManager::new(mock.clone()).events(events.clone()));
	let handle = tokio::spawn({
		let manager = manager.clone();
		async move { manager.upload_all(vec![task_a, task_b]).await }
	});

	mock.wait_until_blocked(6).await;
	manager.cancel(id_b).await;
	while !events.statuses_for(id_b).contains(&UploadStatus::Cancelled) {
		tokio::task::yield_now().await;
	}
	// file A is untouched, its parts still parked on the block
	assert_eq!(
		events.statuses_for(id_a),
		vec![UploadStatus::Pending, UploadStatus::Uploading]
	);

	manager.cancel_all();
	let summary = handle.await.unwrap();
	assert_eq!(summary.failed, 2);
	assert!(summary.error_for(id_b).is_some());
}
