use serde::{Deserialize, Serialize};

/// Library categories accepted by the upload endpoints.
///
/// Each category carries its own server-enforced size ceiling, which the
/// client checks before initiating an upload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
	Videos,
	Images,
	Articles,
	Sounds,
}

impl FileCategory {
	pub fn as_str(&self) -> &'static str {
		match self {
			FileCategory::Videos => "videos",
			FileCategory::Images => "images",
			FileCategory::Articles => "articles",
			FileCategory::Sounds => "sounds",
		}
	}

	/// Maximum file size for this category in bytes.
	pub fn max_file_size(&self) -> u64 {
		match self {
			FileCategory::Videos => 1536 * 1024 * 1024,
			FileCategory::Images => 50 * 1024 * 1024,
			FileCategory::Articles => 100 * 1024 * 1024,
			FileCategory::Sounds => 200 * 1024 * 1024,
		}
	}
}

impl std::fmt::Display for FileCategory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Descriptor of a stored library resource, returned by the complete
/// endpoints once the upload is finalized.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedResource {
	pub url: String,
	pub filename: String,
}
