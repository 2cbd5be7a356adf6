pub mod hnsw;
pub mod registry;

mod error;

pub use error::{Error, Result};
pub use hnsw::HnswIndex;
pub use registry::IndexRegistry;

use melodex_domain::{AnnHit, ScopeSet};

/// One loaded ANN index. Searches are CPU-bound and synchronous; callers
/// schedule them on a blocking pool.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn dimension(&self) -> usize;

	fn len(&self) -> usize;

	fn search(&self, vector: &[f32], k: usize) -> Result<Vec<AnnHit>>;

	/// Restricted search over the ids in `scope` using the index's own
	/// id-selector mechanism. An error here is not fatal: the registry falls
	/// back to an unrestricted over-fetch plus post-filter.
	fn search_scoped(&self, vector: &[f32], k: usize, scope: &ScopeSet) -> Result<Vec<AnnHit>>;
}
