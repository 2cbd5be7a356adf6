pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("Index file {path:?} is corrupted: {reason}.")]
	Corrupted { path: std::path::PathBuf, reason: String },
	#[error("Query vector has {found} dimensions, index expects {expected}.")]
	DimensionMismatch { expected: usize, found: usize },
	#[error("No index is loaded for field {field}.")]
	MissingIndex { field: String },
	#[error("Invalid record: {message}")]
	InvalidRecord { message: String },
	#[error("Restricted search is unavailable: {message}")]
	ScopedSearch { message: String },
}
