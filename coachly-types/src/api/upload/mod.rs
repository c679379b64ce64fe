use serde::{Deserialize, Serialize};

pub mod complete;
pub mod initiate;
pub mod part_url;

/// One finished part of a multipart upload.
///
/// `etag` is `None` when the storage provider blocked the ETag response
/// header client-side; the backend resolves the real value by listing the
/// uploaded parts before completing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
	pub part_number: u16,
	pub etag: Option<String>,
}
