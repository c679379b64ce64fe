use std::{borrow::Cow, collections::HashMap};

use coachly_types::api::upload::part_url;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::{
	consts::PRESIGN_BATCH_SIZE, error::Error, transport::UploadTransport, upload::or_cancelled,
};

/// Prefetches presigned URLs for every part, one bounded batch at a time so
/// the signing endpoint is not flooded.
///
/// Any failure aborts the whole fetch. This is an optimization only: the
/// coordinator falls back to fetching URLs on demand per part when the
/// prefetch fails, so a degraded signing endpoint never fails the upload by
/// itself.
pub(crate) async fn fetch_all(
	transport: &dyn UploadTransport,
	file_path: &str,
	upload_id: &str,
	total_parts: u16,
	cancel: &CancellationToken,
) -> Result<HashMap<u16, String>, Error> {
	let mut urls = HashMap::with_capacity(total_parts as usize);
	let part_numbers: Vec<u16> = (1..=total_parts).collect();
	for batch in part_numbers.chunks(PRESIGN_BATCH_SIZE) {
		let fetched = or_cancelled(
			cancel,
			futures::future::try_join_all(batch.iter().map(|&part_number| async move {
				let request = part_url::Request {
					file_path: Cow::Borrowed(file_path),
					upload_id: Cow::Borrowed(upload_id),
					part_number,
				};
				let url = transport.part_url(&request).await?;
				Ok::<_, Error>((part_number, url))
			})),
		)
		.await?;
		urls.extend(fetched);
	}
	debug!("Prefetched {} presigned part urls for {file_path}", urls.len());
	Ok(urls)
}
