use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResponseError {
	#[error("API Error, message: `{message:?}`, error: `{error:?}`")]
	ApiError {
		message: Option<String>,
		error: Option<String>,
	},
}
