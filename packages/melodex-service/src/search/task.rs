use std::collections::HashMap;

use futures::future::join_all;
use tracing::info;

use melodex_domain::{AnnHit, FieldKey, SongRecord, text};

use crate::{
	Error, MelodexService, Result,
	search::{cutoff_for, exact_score_for, fusion, width_for},
};

impl MelodexService {
	/// One (field, value) search: embed, run the (scoped) ANN search,
	/// threshold, enrich in bounded batches, and fold the contributions into
	/// this task's result map. Any failure surfaces as an error that the
	/// dispatcher converts into an empty contribution.
	pub(crate) async fn run_field_task(
		&self,
		field: FieldKey,
		value: &str,
		playlist_id: Option<&str>,
	) -> Result<HashMap<String, SongRecord>> {
		let normalized = text::normalize_for_embedding(value);

		if normalized.is_empty() {
			return Ok(HashMap::new());
		}

		let vector = self
			.collaborators
			.embedding
			.resolve_vector(&self.cfg.providers.embedding, field, &normalized)
			.await?;
		let k = width_for(&self.cfg.search.widths, field);
		let mut hits = match playlist_id {
			Some(playlist) => {
				let scope = self.collaborators.scopes.scope_set(field, playlist).await?;
				// A scoped search with no known scope is a deliberate
				// "no match", not an unrestricted fallback.
				let Some(scope) = scope.filter(|ids| !ids.is_empty()) else {
					info!(%field, playlist, "No scope set for playlist, field yields nothing.");

					return Ok(HashMap::new());
				};

				self.scoped_ann_search(field, vector, k, scope).await?
			},
			None => self.ann_search(field, vector, k).await?,
		};

		if let Some(cutoff) = cutoff_for(&self.cfg.search.cutoffs, field) {
			for hit in &mut hits {
				if hit.distance > cutoff {
					hit.invalidate();
				}
			}
		}

		let valid: Vec<AnnHit> = hits.into_iter().filter(AnnHit::is_valid).collect();

		if valid.is_empty() {
			return Ok(HashMap::new());
		}

		let enrich_limit = self.enrich_limit();
		let batches = valid.chunks(self.cfg.search.enrich_batch_size.max(1));
		let batch_results = join_all(batches.map(|batch| {
			let enrich_limit = enrich_limit.clone();

			async move {
				let _permit = enrich_limit
					.acquire()
					.await
					.map_err(|err| Error::Internal { message: err.to_string() })?;

				self.enrich_batch(field, value, batch).await
			}
		}))
		.await;
		let mut records = HashMap::new();

		for result in batch_results {
			for contribution in result? {
				fusion::merge_record(&mut records, contribution);
			}
		}

		Ok(records)
	}

	/// Resolves one batch of valid hits into per-identity contributions.
	/// An id may fan out to several identities (album matches cover every
	/// track); ids the stores do not know are skipped silently.
	async fn enrich_batch(
		&self,
		field: FieldKey,
		raw_query: &str,
		batch: &[AnnHit],
	) -> Result<Vec<SongRecord>> {
		let mut unique_ids: Vec<i64> = batch.iter().map(|hit| hit.id).collect();

		unique_ids.sort_unstable();
		unique_ids.dedup();

		let id_map = self.collaborators.gateway.ids_to_identities(field, &unique_ids).await?;

		if id_map.is_empty() {
			return Ok(Vec::new());
		}

		let mut identities = Vec::new();
		let mut seen = std::collections::HashSet::new();

		for mapped in id_map.values() {
			for identity in mapped {
				if seen.insert(identity.key()) {
					identities.push(identity.clone());
				}
			}
		}

		let metadata = self.collaborators.gateway.identities_to_metadata(&identities).await?;

		// Per identity: the number of hit occurrences that reached it and the
		// minimum distance among them. Every occurrence becomes one merged
		// contribution at that minimum, so repeats halve rather than multiply.
		let mut grouped: HashMap<String, (usize, f32)> = HashMap::new();

		for hit in batch {
			let Some(mapped) = id_map.get(&hit.id) else {
				continue;
			};

			for identity in mapped {
				let slot = grouped.entry(identity.key()).or_insert((0, f32::INFINITY));

				slot.0 += 1;
				slot.1 = slot.1.min(hit.distance);
			}
		}

		let query_lower = raw_query.to_lowercase();
		let mut contributions = Vec::new();

		for identity in identities {
			let key = identity.key();
			let Some((occurrences, min_distance)) = grouped.get(&key).copied() else {
				continue;
			};
			let Some(meta) = metadata.get(&key) else {
				continue;
			};
			let raw_score = match exact_score_for(&self.cfg.search.exact_match, field) {
				Some(score)
					if meta
						.field_text(field)
						.map(|field_value| field_value.to_lowercase().contains(&query_lower))
						.unwrap_or(false) =>
					score,
				_ => min_distance,
			};

			for _ in 0..occurrences {
				contributions.push(SongRecord::first_contribution(
					identity.clone(),
					meta.clone(),
					field,
					raw_score,
				));
			}
		}

		Ok(contributions)
	}
}
