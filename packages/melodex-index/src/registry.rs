use std::{collections::HashMap, path::PathBuf, sync::Arc};

use tracing::{info, warn};

use melodex_domain::{AnnHit, FieldKey, ScopeSet};

use crate::{Error, HnswIndex, Result, VectorIndex};

/// One ANN index handle per search field, loaded once at startup and shared
/// read-only by every request.
pub struct IndexRegistry {
	indices: HashMap<FieldKey, Arc<dyn VectorIndex>>,
	scoped_overfetch: usize,
}

impl IndexRegistry {
	/// Loads `<field>.ann` for every search field from the primary directory,
	/// falling back to the backup directory per file. A field that loads from
	/// neither is a startup error, never a per-request one.
	pub fn load(cfg: &melodex_config::Index) -> Result<Self> {
		let mut indices: HashMap<FieldKey, Arc<dyn VectorIndex>> = HashMap::new();

		for field in FieldKey::ALL {
			let file_name = format!("{field}.ann");
			let primary = PathBuf::from(&cfg.primary_dir).join(&file_name);
			let index = match HnswIndex::load(&primary, cfg.ef_search) {
				Ok(index) => index,
				Err(primary_err) => {
					let Some(backup_dir) = cfg.backup_dir.as_ref() else {
						return Err(primary_err);
					};
					let backup = PathBuf::from(backup_dir).join(&file_name);

					warn!(
						%field,
						path = %primary.display(),
						error = %primary_err,
						"Primary index failed to load, trying backup."
					);

					HnswIndex::load(&backup, cfg.ef_search)?
				},
			};

			info!(
				%field,
				dimension = index.dimension(),
				vectors = index.len(),
				"Index loaded."
			);

			indices.insert(field, Arc::new(index));
		}

		Ok(Self::from_indices(indices, default_scoped_overfetch()))
	}

	/// Assembles a registry from pre-built indices. Startup uses this after
	/// [`IndexRegistry::load`]; tests inject in-memory indices directly.
	pub fn from_indices(
		indices: HashMap<FieldKey, Arc<dyn VectorIndex>>,
		scoped_overfetch: usize,
	) -> Self {
		Self { indices, scoped_overfetch: scoped_overfetch.max(1) }
	}

	pub fn with_scoped_overfetch(mut self, scoped_overfetch: usize) -> Self {
		self.scoped_overfetch = scoped_overfetch.max(1);
		self
	}

	pub fn has_index(&self, field: FieldKey) -> bool {
		self.indices.contains_key(&field)
	}

	pub fn dimension_of(&self, field: FieldKey) -> Option<usize> {
		self.indices.get(&field).map(|index| index.dimension())
	}

	pub fn search(&self, field: FieldKey, vector: &[f32], k: usize) -> Result<Vec<AnnHit>> {
		self.index(field)?.search(vector, k)
	}

	/// Restricted search. The index's native id selector is tried first; if
	/// it reports failure, an unrestricted search over `k * scoped_overfetch`
	/// candidates is post-filtered to the allowed set and truncated to `k`.
	pub fn search_scoped(
		&self,
		field: FieldKey,
		vector: &[f32],
		k: usize,
		scope: &ScopeSet,
	) -> Result<Vec<AnnHit>> {
		let index = self.index(field)?;

		match index.search_scoped(vector, k, scope) {
			Ok(hits) => Ok(hits),
			Err(err) => {
				warn!(
					%field,
					error = %err,
					"Native restricted search failed, post-filtering a wider search."
				);

				let widened = index.search(vector, k.saturating_mul(self.scoped_overfetch))?;

				Ok(widened
					.into_iter()
					.filter(|hit| scope.contains(&hit.id))
					.take(k)
					.collect())
			},
		}
	}

	fn index(&self, field: FieldKey) -> Result<&Arc<dyn VectorIndex>> {
		self.indices
			.get(&field)
			.ok_or_else(|| Error::MissingIndex { field: field.as_str().to_string() })
	}
}

fn default_scoped_overfetch() -> usize {
	10
}
