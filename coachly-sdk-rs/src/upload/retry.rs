use std::{sync::Arc, time::Duration};

use futures_timer::Delay;
use log::warn;
use tokio_util::sync::CancellationToken;

use crate::{
	consts::{MAX_UPLOAD_RETRIES, RETRY_BASE_DELAY},
	error::Error,
};

/// Side channel for surfacing "retrying... (n/3)" to users.
pub type RetryCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Bounded exponential-backoff retry for one network operation.
///
/// Retries are local to a single operation (one initiate call, one chunk
/// PUT, one complete call); they never restart a whole file pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	pub max_retries: u32,
	pub base_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: MAX_UPLOAD_RETRIES,
			base_delay: RETRY_BASE_DELAY,
		}
	}
}

impl RetryPolicy {
	pub fn new(max_retries: u32, base_delay: Duration) -> Self {
		Self {
			max_retries,
			base_delay,
		}
	}

	/// Runs `operation` up to `max_retries + 1` times, sleeping
	/// `base_delay * 2^attempt` between tries.
	///
	/// The attempt index (0-based) is passed to `operation` so callers can
	/// vary behaviour between the first try and retries, e.g. discarding a
	/// possibly expired prefetched URL. Cancellation is re-raised
	/// immediately, and the backoff sleep itself is raced against `cancel`
	/// so a cancelled caller never waits out the delay. On exhaustion the
	/// last observed error is returned unchanged so callers can branch on
	/// its content.
	pub async fn run<T, F, Fut>(
		&self,
		label: &str,
		cancel: &CancellationToken,
		mut on_retry: impl FnMut(u32),
		mut operation: F,
	) -> Result<T, Error>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T, Error>>,
	{
		let mut last_error = None;
		for attempt in 0..=self.max_retries {
			if attempt > 0 {
				tokio::select! {
					biased;
					_ = cancel.cancelled() => return Err(Error::Cancelled),
					_ = Delay::new(self.base_delay * 2u32.pow(attempt - 1)) => {}
				}
				warn!("Retrying: {label} ({attempt}/{})", self.max_retries);
				on_retry(attempt);
			}
			match operation(attempt).await {
				Ok(value) => return Ok(value),
				Err(e) if e.is_cancellation() => return Err(e),
				Err(e) => last_error = Some(e),
			}
		}
		Err(last_error.expect("retries must be more than 0"))
	}
}
