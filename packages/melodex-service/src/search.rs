pub mod fusion;

mod task;

use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::{sync::Semaphore, time::timeout};
use tracing::{debug, error, info, warn};

use melodex_domain::{FieldKey, SongRecord, StructuredQuery};

use crate::{MelodexService, Result};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
	pub query: StructuredQuery,
	#[serde(default)]
	pub playlist_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResponse {
	pub year_list: Vec<i32>,
	pub popular: bool,
	pub query: StructuredQuery,
	pub results: Vec<SongRecord>,
}

impl MelodexService {
	/// Fans a structured query out over the per-field indices, fuses the
	/// per-task results into one ranking, and returns the capped list plus
	/// the normalized filter echo. Individual task failures and timeouts
	/// degrade recall for that field only; an overall timeout degrades to
	/// the echo with no results. Neither surfaces as an error.
	pub async fn search_structured(&self, req: SearchRequest) -> Result<SearchResponse> {
		let SearchRequest { mut query, playlist_id } = req;

		query.normalize();

		if !query.extra.is_empty() {
			let ignored: Vec<&str> = query.extra.keys().map(String::as_str).collect();

			debug!(?ignored, "Ignoring unrecognized query fields.");
		}

		if !query.has_search_terms() {
			return Ok(echo(query, Vec::new()));
		}

		let trace_id = uuid::Uuid::new_v4();
		let terms: Vec<(FieldKey, String)> = query
			.search_terms()
			.into_iter()
			.filter(|(field, _)| {
				let known = self.registry.has_index(*field);

				if !known {
					debug!(%field, "No index loaded for field, skipping.");
				}

				known
			})
			.map(|(field, value)| (field, value.to_string()))
			.collect();

		info!(%trace_id, tasks = terms.len(), scoped = playlist_id.is_some(), "Search dispatched.");

		let limit = Arc::new(Semaphore::new(self.cfg.search.max_concurrent_tasks));
		let task_timeout = Duration::from_millis(self.cfg.search.task_timeout_ms);
		let overall_timeout = Duration::from_millis(self.cfg.search.overall_timeout_ms);
		let tasks = terms.iter().map(|(field, value)| {
			let limit = limit.clone();
			let playlist_id = playlist_id.as_deref();
			let field = *field;

			async move {
				let Ok(_permit) = limit.acquire().await else {
					return HashMap::new();
				};

				match timeout(task_timeout, self.run_field_task(field, value, playlist_id)).await
				{
					Ok(Ok(records)) => records,
					Ok(Err(err)) => {
						warn!(%trace_id, %field, error = %err, "Field search failed.");

						HashMap::new()
					},
					Err(_) => {
						warn!(
							%trace_id,
							%field,
							timeout_ms = self.cfg.search.task_timeout_ms,
							"Field search timed out."
						);

						HashMap::new()
					},
				}
			}
		});
		let task_results = match timeout(overall_timeout, join_all(tasks)).await {
			Ok(results) => results,
			Err(_) => {
				error!(
					%trace_id,
					timeout_ms = self.cfg.search.overall_timeout_ms,
					"Search timed out before all field tasks completed."
				);

				return Ok(echo(query, Vec::new()));
			},
		};

		let merged = fusion::fuse_task_results(task_results);
		let results = fusion::rank_and_dedup(merged, self.cfg.search.result_cap);

		info!(%trace_id, results = results.len(), "Search completed.");

		Ok(echo(query, results))
	}
}

fn echo(query: StructuredQuery, results: Vec<SongRecord>) -> SearchResponse {
	SearchResponse {
		year_list: query.year.clone(),
		popular: query.popular_flag(),
		query,
		results,
	}
}

pub(crate) fn width_for(widths: &melodex_config::SearchWidths, field: FieldKey) -> usize {
	match field {
		FieldKey::Artist => widths.artist,
		FieldKey::Title => widths.title,
		FieldKey::AlbumName => widths.album_name,
		FieldKey::Vibe => widths.vibe,
		FieldKey::Lyrics => widths.lyrics,
		FieldKey::LyricsSummary => widths.lyrics_summary,
	}
}

pub(crate) fn cutoff_for(cutoffs: &melodex_config::DistanceCutoffs, field: FieldKey) -> Option<f32> {
	match field {
		FieldKey::Artist => Some(cutoffs.artist),
		FieldKey::Title => Some(cutoffs.title),
		FieldKey::Lyrics => Some(cutoffs.lyrics),
		FieldKey::LyricsSummary => Some(cutoffs.lyrics_summary),
		FieldKey::AlbumName | FieldKey::Vibe => None,
	}
}

pub(crate) fn exact_score_for(
	exact: &melodex_config::ExactMatchScores,
	field: FieldKey,
) -> Option<f32> {
	match field {
		FieldKey::Artist => Some(exact.artist),
		FieldKey::Title => Some(exact.title),
		FieldKey::AlbumName => Some(exact.album_name),
		FieldKey::Vibe | FieldKey::Lyrics | FieldKey::LyricsSummary => None,
	}
}
