pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Alignment error: {message}")]
	Alignment { message: String },
	#[error("Retrieval failed for input chunk {chunk_index} ({modality}): {message}")]
	Retrieval { chunk_index: usize, modality: &'static str, message: String },
	#[error("Prediction exceeded its {timeout_ms} ms deadline.")]
	Timeout { timeout_ms: u64 },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl From<regex::Error> for Error {
	fn from(err: regex::Error) -> Self {
		Self::Configuration { message: format!("Invalid calibration pattern: {err}") }
	}
}
