use sqlx::FromRow;

use melodex_domain::{SongIdentity, SongMetadata};

/// One row of a per-field embedding map table.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRow {
	pub id: i64,
	pub disc_id: i64,
	pub track_no: String,
}

impl IdentityRow {
	pub fn identity(&self) -> SongIdentity {
		SongIdentity::new(self.disc_id, &self.track_no)
	}
}

/// One joined catalog row. Columns that the catalog leaves NULL map to the
/// metadata defaults rather than erroring.
#[derive(Debug, Clone, FromRow)]
pub struct MetadataRow {
	pub disc_id: i64,
	pub track_no: String,
	pub artist: String,
	pub title: String,
	pub album_name: String,
	pub duration_secs: Option<i32>,
	pub genre: Option<String>,
	pub hit_year: bool,
	pub image_ref: Option<String>,
	pub playable: bool,
	pub moods: Option<Vec<String>>,
	pub bpm: Option<i32>,
	pub energy: Option<i16>,
}

impl MetadataRow {
	pub fn identity(&self) -> SongIdentity {
		SongIdentity::new(self.disc_id, &self.track_no)
	}

	pub fn into_metadata(self) -> SongMetadata {
		SongMetadata {
			artist: self.artist,
			title: self.title,
			album_name: self.album_name,
			duration_secs: self.duration_secs.and_then(|secs| u32::try_from(secs).ok()),
			genre: self.genre,
			hit_year: self.hit_year,
			image_ref: self.image_ref,
			playable: self.playable,
			moods: self.moods.unwrap_or_default(),
			bpm: self.bpm.and_then(|bpm| u16::try_from(bpm).ok()),
			energy: self.energy.and_then(|energy| u8::try_from(energy.clamp(0, 100)).ok()),
		}
	}
}
