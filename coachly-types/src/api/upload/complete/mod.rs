use serde::{Deserialize, Serialize};

use crate::fs::UploadedResource;

pub mod multipart;
pub mod single;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Response {
	pub message: Option<String>,
	pub data: UploadedResource,
}
