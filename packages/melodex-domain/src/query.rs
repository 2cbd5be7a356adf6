use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::FieldKey;

/// The structured form of a natural-language query as returned by the
/// translation collaborator. The schema is closed: every searchable field is
/// a tagged member, and anything else the translator emits lands in `extra`,
/// which is logged and never dispatched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StructuredQuery {
	#[serde(default)]
	pub artist: Vec<String>,
	#[serde(default)]
	pub title: Vec<String>,
	#[serde(default)]
	pub album_name: Vec<String>,
	#[serde(default)]
	pub vibe: Vec<String>,
	#[serde(default)]
	pub lyrics: Vec<String>,
	#[serde(default)]
	pub lyrics_summary: Vec<String>,
	/// Region label to genre, e.g. "kr" -> "ballad".
	#[serde(default)]
	pub genre: BTreeMap<String, String>,
	/// Zero, one, or two ints (a single year or an inclusive range).
	#[serde(default)]
	pub year: Vec<i32>,
	#[serde(default)]
	pub popular: Vec<bool>,
	/// Opaque routing tag assigned by the translator.
	#[serde(default, rename = "case", skip_serializing_if = "Option::is_none")]
	pub case_tag: Option<String>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl StructuredQuery {
	pub fn values(&self, field: FieldKey) -> &[String] {
		match field {
			FieldKey::Artist => &self.artist,
			FieldKey::Title => &self.title,
			FieldKey::AlbumName => &self.album_name,
			FieldKey::Vibe => &self.vibe,
			FieldKey::Lyrics => &self.lyrics,
			FieldKey::LyricsSummary => &self.lyrics_summary,
		}
	}

	fn values_mut(&mut self, field: FieldKey) -> &mut Vec<String> {
		match field {
			FieldKey::Artist => &mut self.artist,
			FieldKey::Title => &mut self.title,
			FieldKey::AlbumName => &mut self.album_name,
			FieldKey::Vibe => &mut self.vibe,
			FieldKey::Lyrics => &mut self.lyrics,
			FieldKey::LyricsSummary => &mut self.lyrics_summary,
		}
	}

	/// One (field, value) pair per non-blank value of every searchable field,
	/// in declaration order.
	pub fn search_terms(&self) -> Vec<(FieldKey, &str)> {
		let mut terms = Vec::new();

		for field in FieldKey::ALL {
			for value in self.values(field) {
				let trimmed = value.trim();

				if !trimmed.is_empty() {
					terms.push((field, trimmed));
				}
			}
		}

		terms
	}

	pub fn has_search_terms(&self) -> bool {
		FieldKey::ALL
			.iter()
			.any(|field| self.values(*field).iter().any(|value| !value.trim().is_empty()))
	}

	pub fn popular_flag(&self) -> bool {
		self.popular.first().copied().unwrap_or(false)
	}

	/// Trims every value, drops blanks, and clamps the year range to two
	/// entries. Absent fields stay empty rather than erroring.
	pub fn normalize(&mut self) {
		for field in FieldKey::ALL {
			let values = self.values_mut(field);

			values.iter_mut().for_each(|value| *value = value.trim().to_string());
			values.retain(|value| !value.is_empty());
		}

		self.year.truncate(2);
	}
}
