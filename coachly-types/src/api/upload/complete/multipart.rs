use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::api::upload::CompletedPart;

pub const ENDPOINT: &str = "v1/library/upload/complete-multipart";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Request<'a> {
	#[serde(flatten)]
	pub file: super::single::Request<'a>,
	pub upload_id: Cow<'a, str>,
	pub parts: Cow<'a, [CompletedPart]>,
}

pub use super::Response;

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fs::FileCategory;

	#[test]
	fn missing_etag_serializes_as_null() {
		let request = Request {
			file: super::super::single::Request {
				file_path: "library/videos/7d4b.mp4".into(),
				file_name: "7d4b.mp4".into(),
				title: "Warmup".into(),
				description: "Session warmup".into(),
				author: "".into(),
				category: FileCategory::Videos,
				file_size: 123,
				file_type: "video/mp4".into(),
				folder_id: None,
			},
			upload_id: "upl-123".into(),
			parts: Cow::Owned(vec![
				CompletedPart {
					part_number: 1,
					etag: Some("abc".to_string()),
				},
				CompletedPart {
					part_number: 2,
					etag: None,
				},
			]),
		};
		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(json["parts"][0]["etag"], "abc");
		assert!(json["parts"][1]["etag"].is_null());
		assert_eq!(json["category"], "videos");
		assert_eq!(json["uploadId"], "upl-123");
	}
}
