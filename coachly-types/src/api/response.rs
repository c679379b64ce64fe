use serde::Deserialize;

use crate::error::ResponseError;

/// Status envelope shared by every gateway endpoint.
///
/// Success payloads are flat (`{success: true, ...fields}`), so the envelope
/// is deserialized separately from the endpoint's `Response` type and only
/// carries the status fields.
#[derive(Deserialize, Debug)]
pub struct ApiEnvelope {
	#[serde(default)]
	pub success: bool,
	pub message: Option<String>,
	pub error: Option<String>,
}

impl ApiEnvelope {
	pub fn check_status(self) -> Result<(), ResponseError> {
		if self.success {
			Ok(())
		} else {
			Err(ResponseError::ApiError {
				message: self.message,
				error: self.error,
			})
		}
	}
}
