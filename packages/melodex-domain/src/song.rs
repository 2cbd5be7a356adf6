use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::field::FieldKey;

/// The precomputed restriction of the searchable id space to one playlist's
/// member songs for one field. Built offline, read-only here.
pub type ScopeSet = HashSet<i64>;

/// One raw nearest-neighbor hit. `id` is the embedding-table row id the
/// index was built from; `-1` with an infinite distance marks "no valid
/// match" and is filtered out before enrichment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnnHit {
	pub id: i64,
	pub distance: f32,
}

impl AnnHit {
	pub const NO_MATCH_ID: i64 = -1;

	pub fn new(id: i64, distance: f32) -> Self {
		Self { id, distance }
	}

	pub fn no_match() -> Self {
		Self { id: Self::NO_MATCH_ID, distance: f32::INFINITY }
	}

	pub fn is_valid(&self) -> bool {
		self.id >= 0 && self.distance.is_finite()
	}

	pub fn invalidate(&mut self) {
		self.id = Self::NO_MATCH_ID;
		self.distance = f32::INFINITY;
	}
}

/// The (disc id, track number) pair uniquely identifying a recording.
/// Track numbers arrive space-padded from the catalog store and are always
/// stored trimmed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongIdentity {
	pub disc_id: i64,
	pub track_no: String,
}

impl SongIdentity {
	pub fn new(disc_id: i64, track_no: &str) -> Self {
		Self { disc_id, track_no: track_no.trim().to_string() }
	}

	/// The join key between the id-map tables and the catalog rows.
	pub fn key(&self) -> String {
		format!("{}_{}", self.disc_id, self.track_no)
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SongMetadata {
	pub artist: String,
	pub title: String,
	pub album_name: String,
	pub duration_secs: Option<u32>,
	pub genre: Option<String>,
	pub hit_year: bool,
	pub image_ref: Option<String>,
	pub playable: bool,
	pub moods: Vec<String>,
	pub bpm: Option<u16>,
	/// 0-100.
	pub energy: Option<u8>,
}

impl SongMetadata {
	/// The metadata string a query for `field` is matched against when
	/// checking for a literal substring hit. Free-text fields have none.
	pub fn field_text(&self, field: FieldKey) -> Option<&str> {
		match field {
			FieldKey::Artist => Some(&self.artist),
			FieldKey::Title => Some(&self.title),
			FieldKey::AlbumName => Some(&self.album_name),
			FieldKey::Vibe | FieldKey::Lyrics | FieldKey::LyricsSummary => None,
		}
	}
}

/// A song with its fused confidence state. Created once per unique identity
/// the first time any search task reports it, merged in place by later
/// contributions, and dropped at the end of the request.
#[derive(Clone, Debug, Serialize)]
pub struct SongRecord {
	#[serde(flatten)]
	pub identity: SongIdentity,
	#[serde(flatten)]
	pub metadata: SongMetadata,
	/// Fused confidence, lower is better.
	pub dis: f32,
	/// Total contributions merged into this record.
	pub count: u32,
	/// The fields whose indices reported this song.
	pub index_names: BTreeSet<FieldKey>,
}

impl SongRecord {
	pub fn first_contribution(
		identity: SongIdentity,
		metadata: SongMetadata,
		field: FieldKey,
		dis: f32,
	) -> Self {
		Self { identity, metadata, dis, count: 1, index_names: BTreeSet::from([field]) }
	}
}
