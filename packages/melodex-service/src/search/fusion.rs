//! Score fusion across field-search results.
//!
//! The combination rule is deliberately asymmetric: a repeat sighting from a
//! field that already contributed halves the fused score (corroboration
//! within one modality is diminishing evidence), while a sighting from a new
//! field multiplies the scores (independent evidence; both are
//! distance-like, so a lower product is a stronger combined signal). The
//! outcome is invariant to task arrival order as long as the set of
//! contributing fields per song stays the same.

use std::collections::HashMap;

use melodex_domain::{SongRecord, text};

/// Merges one record into the accumulator map, applying the combination
/// rule. Used both when a single task folds its batches together and when
/// the dispatcher fuses task results, so a duplicate id within one task and
/// a repeat across tasks take the same halving branch.
pub fn merge_record(map: &mut HashMap<String, SongRecord>, incoming: SongRecord) {
	let key = incoming.identity.key();

	match map.entry(key) {
		std::collections::hash_map::Entry::Vacant(entry) => {
			entry.insert(incoming);
		},
		std::collections::hash_map::Entry::Occupied(mut entry) => {
			let existing = entry.get_mut();

			existing.count += incoming.count;

			let new_fields: Vec<_> = incoming
				.index_names
				.iter()
				.filter(|field| !existing.index_names.contains(*field))
				.copied()
				.collect();

			if new_fields.is_empty() {
				existing.dis /= 2.0;
			} else {
				existing.dis *= incoming.dis;
				existing.index_names.extend(new_fields);
			}
		},
	}
}

/// Folds every task's result map into one map keyed by song identity.
pub fn fuse_task_results(
	task_results: Vec<HashMap<String, SongRecord>>,
) -> HashMap<String, SongRecord> {
	let mut merged = HashMap::new();

	for records in task_results {
		for record in records.into_values() {
			merge_record(&mut merged, record);
		}
	}

	merged
}

/// Sorts ascending by fused score, walks the first `cap` unique identities,
/// and collapses records whose normalized (artist, title) collide. On a
/// collision the record flagged as a hit wins; otherwise the first-seen
/// record stays.
pub fn rank_and_dedup(merged: HashMap<String, SongRecord>, cap: usize) -> Vec<SongRecord> {
	let mut ranked: Vec<SongRecord> = merged.into_values().collect();

	ranked.sort_by(|a, b| a.dis.partial_cmp(&b.dis).unwrap_or(std::cmp::Ordering::Equal));

	let mut out: Vec<SongRecord> = Vec::new();
	let mut slot_by_key: HashMap<String, usize> = HashMap::new();

	for record in ranked.into_iter().take(cap) {
		let key = text::dedup_key(&record.metadata.artist, &record.metadata.title);

		match slot_by_key.get(&key) {
			Some(&slot) => {
				if record.metadata.hit_year && !out[slot].metadata.hit_year {
					out[slot] = record;
				}
			},
			None => {
				slot_by_key.insert(key, out.len());
				out.push(record);
			},
		}
	}

	out
}
