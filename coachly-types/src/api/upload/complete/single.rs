use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fs::FileCategory;

pub const ENDPOINT: &str = "v1/library/upload/complete-single";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Request<'a> {
	pub file_path: Cow<'a, str>,
	pub file_name: Cow<'a, str>,
	pub title: Cow<'a, str>,
	pub description: Cow<'a, str>,
	pub author: Cow<'a, str>,
	pub category: FileCategory,
	pub file_size: u64,
	pub file_type: Cow<'a, str>,
	pub folder_id: Option<Uuid>,
}

pub use super::Response;
