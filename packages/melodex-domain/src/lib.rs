pub mod field;
pub mod query;
pub mod song;
pub mod text;

pub use field::FieldKey;
pub use query::StructuredQuery;
pub use song::{AnnHit, ScopeSet, SongIdentity, SongMetadata, SongRecord};
