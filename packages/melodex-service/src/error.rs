pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}

impl From<melodex_providers::Error> for Error {
	fn from(err: melodex_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<melodex_storage::Error> for Error {
	fn from(err: melodex_storage::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<melodex_index::Error> for Error {
	fn from(err: melodex_index::Error) -> Self {
		Self::Index { message: err.to_string() }
	}
}
