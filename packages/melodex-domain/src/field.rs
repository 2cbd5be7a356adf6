use serde::{Deserialize, Serialize};

/// A query dimension backed by its own ANN index and embedding model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
	Artist,
	Title,
	AlbumName,
	Vibe,
	Lyrics,
	LyricsSummary,
}

impl FieldKey {
	pub const ALL: [Self; 6] =
		[Self::Artist, Self::Title, Self::AlbumName, Self::Vibe, Self::Lyrics, Self::LyricsSummary];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Artist => "artist",
			Self::Title => "title",
			Self::AlbumName => "album_name",
			Self::Vibe => "vibe",
			Self::Lyrics => "lyrics",
			Self::LyricsSummary => "lyrics_summary",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"artist" => Some(Self::Artist),
			"title" => Some(Self::Title),
			"album_name" => Some(Self::AlbumName),
			"vibe" => Some(Self::Vibe),
			"lyrics" => Some(Self::Lyrics),
			"lyrics_summary" => Some(Self::LyricsSummary),
			_ => None,
		}
	}

	/// Whether raw ANN distance alone is too noisy for this field and hits
	/// above the configured cutoff must be invalidated before enrichment.
	pub fn thresholded(self) -> bool {
		matches!(self, Self::Artist | Self::Title | Self::Lyrics | Self::LyricsSummary)
	}
}

impl std::fmt::Display for FieldKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
