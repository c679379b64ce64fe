use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("upload cancelled")]
	Cancelled,
	#[error("network error: `{0}`")]
	Network(reqwest::Error),
	#[error("request timed out")]
	Timeout,
	#[error("upload failed with status {status}: `{status_text}`")]
	UploadFailed { status: u16, status_text: String },
	#[error("file too large: {size} bytes exceeds the {limit} byte category limit")]
	FileTooLarge { size: u64, limit: u64 },
	#[error("unexpected response from `{endpoint}`: {reason}")]
	UnexpectedResponse {
		endpoint: &'static str,
		reason: &'static str,
	},
	#[error("Request Error: `{0}`")]
	RequestError(#[from] coachly_types::error::ResponseError),
	#[error("Response Error: `{0}`")]
	ResponseError(#[from] serde_json::Error),
}

impl Error {
	/// Cancellation is terminal and must never be retried.
	pub fn is_cancellation(&self) -> bool {
		matches!(self, Error::Cancelled)
	}

	pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
		if e.is_timeout() {
			Error::Timeout
		} else {
			Error::Network(e)
		}
	}
}
