use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::fs::FileCategory;

pub const ENDPOINT: &str = "v1/library/upload/initiate";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Request<'a> {
	pub file_name: Cow<'a, str>,
	pub file_size: u64,
	pub file_type: Cow<'a, str>,
	pub category: FileCategory,
}

/// The gateway decides between a single presigned PUT and a multipart
/// upload based on file size, tagged by `uploadType`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "uploadType", rename_all = "lowercase")]
pub enum Response {
	Single(SingleUploadInfo),
	Multipart(MultipartUploadInfo),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SingleUploadInfo {
	pub presigned_url: String,
	pub file_path: String,
	pub file_name: String,
	pub public_url: String,
	pub expires_in: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUploadInfo {
	pub upload_id: String,
	pub file_path: String,
	pub file_name: String,
	pub public_url: String,
	pub chunk_size: u64,
	pub total_chunks: u64,
	pub expires_in: u64,
}
