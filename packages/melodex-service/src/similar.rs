use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use melodex_domain::{FieldKey, SongIdentity, SongMetadata, text};

use crate::{MelodexService, Result};

/// Which of the song's stored embeddings drives the neighborhood walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarMode {
	#[default]
	Vibe,
	LyricsSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarRequest {
	pub disc_id: i64,
	pub track_no: String,
	#[serde(default)]
	pub mode: SimilarMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarSong {
	#[serde(flatten)]
	pub identity: SongIdentity,
	#[serde(flatten)]
	pub metadata: SongMetadata,
	/// How many of the query song's chunks reported this song as a
	/// neighbor.
	pub matches: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarResponse {
	pub results: Vec<SimilarSong>,
}

impl MelodexService {
	/// Finds songs similar to a known song: every stored embedding chunk of
	/// the query song votes with its nearest neighbors, candidates rank by
	/// vote count, and the walk down that ranking skips the query song and
	/// anything fuzzy-equal to it or to an already accepted candidate.
	pub async fn similar_songs(&self, req: SimilarRequest) -> Result<SimilarResponse> {
		let query_identity = SongIdentity::new(req.disc_id, &req.track_no);
		let mut field = match req.mode {
			SimilarMode::Vibe => FieldKey::Vibe,
			SimilarMode::LyricsSummary => FieldKey::LyricsSummary,
		};
		let mut chunks =
			self.collaborators.gateway.embedding_chunks(field, &query_identity).await?;

		// Songs without a lyrics summary fall back to their title embedding.
		if chunks.is_empty() && req.mode == SimilarMode::LyricsSummary {
			field = FieldKey::Title;
			chunks = self.collaborators.gateway.embedding_chunks(field, &query_identity).await?;
		}

		if chunks.is_empty() {
			info!(identity = %query_identity.key(), ?req.mode, "No stored embeddings for song.");

			return Ok(SimilarResponse { results: Vec::new() });
		}

		let mut votes: HashMap<String, (SongIdentity, u32)> = HashMap::new();

		for chunk in chunks {
			let hits = match self.ann_search(field, chunk, self.cfg.similar.per_chunk_k).await {
				Ok(hits) => hits,
				Err(err) => {
					warn!(%field, error = %err, "Neighbor search failed for one chunk.");

					continue;
				},
			};
			let mut ids: Vec<i64> =
				hits.iter().filter(|hit| hit.is_valid()).map(|hit| hit.id).collect();

			ids.sort_unstable();
			ids.dedup();

			let id_map = self.collaborators.gateway.ids_to_identities(field, &ids).await?;

			for mapped in id_map.values() {
				for identity in mapped {
					let entry =
						votes.entry(identity.key()).or_insert_with(|| (identity.clone(), 0));

					entry.1 += 1;
				}
			}
		}

		votes.remove(&query_identity.key());

		if votes.is_empty() {
			return Ok(SimilarResponse { results: Vec::new() });
		}

		let mut candidates: Vec<(SongIdentity, u32)> = votes.into_values().collect();

		candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.key().cmp(&b.0.key())));
		// Enough of the head to fill the result list even when the top of
		// the ranking is dominated by re-releases of one song.
		candidates.truncate(self.cfg.similar.max_results.saturating_mul(10));

		let mut lookup: Vec<SongIdentity> =
			candidates.iter().map(|(identity, _)| identity.clone()).collect();

		lookup.push(query_identity.clone());

		let metadata = self.collaborators.gateway.identities_to_metadata(&lookup).await?;
		let query_meta = metadata.get(&query_identity.key());
		let threshold = self.cfg.similar.fuzzy_threshold;
		let mut accepted: Vec<SimilarSong> = Vec::new();

		for (identity, matches) in candidates {
			if accepted.len() >= self.cfg.similar.max_results {
				break;
			}

			let Some(meta) = metadata.get(&identity.key()) else {
				continue;
			};
			let duplicate_of_query = query_meta
				.map(|query| {
					text::same_recording(
						&meta.artist,
						&meta.title,
						&query.artist,
						&query.title,
						threshold,
					)
				})
				.unwrap_or(false);

			if duplicate_of_query {
				continue;
			}
			if accepted.iter().any(|existing| {
				text::same_recording(
					&meta.artist,
					&meta.title,
					&existing.metadata.artist,
					&existing.metadata.title,
					threshold,
				)
			}) {
				continue;
			}

			accepted.push(SimilarSong { identity, metadata: meta.clone(), matches });
		}

		Ok(SimilarResponse { results: accepted })
	}
}
