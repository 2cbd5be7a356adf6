use std::collections::HashMap;

use sqlx::QueryBuilder;

use melodex_domain::{FieldKey, SongIdentity, SongMetadata};

use crate::{
	Result,
	db::Db,
	models::{IdentityRow, MetadataRow},
};

/// Table holding the `(row id, disc, track)` mapping for one field's index.
/// Names are fixed at compile time; field keys never reach the SQL text as
/// data.
fn map_table(field: FieldKey) -> &'static str {
	match field {
		FieldKey::Artist => "embedding_map_artist",
		FieldKey::Title => "embedding_map_title",
		FieldKey::AlbumName => "embedding_map_album_name",
		FieldKey::Vibe => "embedding_map_vibe",
		FieldKey::Lyrics => "embedding_map_lyrics",
		FieldKey::LyricsSummary => "embedding_map_lyrics_summary",
	}
}

/// Resolves raw index ids to song identities. Album-level ids fan out to
/// every track of the disc; missing ids are simply absent from the map.
pub async fn ids_to_identities(
	db: &Db,
	field: FieldKey,
	ids: &[i64],
) -> Result<HashMap<i64, Vec<SongIdentity>>> {
	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	let rows: Vec<IdentityRow> = if field == FieldKey::AlbumName {
		sqlx::query_as(
			"\
SELECT m.id, m.disc_id, t.track_no
FROM embedding_map_album_name m
JOIN disc_tracks t ON t.disc_id = m.disc_id
WHERE m.id = ANY($1)",
		)
		.bind(ids)
		.fetch_all(&db.identity)
		.await?
	} else {
		sqlx::query_as(&format!(
			"SELECT id, disc_id, track_no FROM {} WHERE id = ANY($1)",
			map_table(field)
		))
		.bind(ids)
		.fetch_all(&db.identity)
		.await?
	};

	let mut out: HashMap<i64, Vec<SongIdentity>> = HashMap::new();

	for row in rows {
		out.entry(row.id).or_default().push(row.identity());
	}

	Ok(out)
}

/// Resolves identities to full catalog metadata. The result map is partial:
/// identities the catalog does not know stay absent.
pub async fn identities_to_metadata(
	db: &Db,
	identities: &[SongIdentity],
) -> Result<HashMap<String, SongMetadata>> {
	if identities.is_empty() {
		return Ok(HashMap::new());
	}

	let mut builder = QueryBuilder::new(
		"\
SELECT s.disc_id, s.track_no, s.artist, s.title, d.album_name, s.duration_secs, \
s.genre, s.hit_year, s.image_ref, s.playable, s.moods, s.bpm, s.energy \
FROM songs s \
JOIN discs d ON d.disc_id = s.disc_id \
WHERE ",
	);
	let mut separated = builder.separated(" OR ");

	for identity in identities {
		separated.push("(");
		separated
			.push_unseparated("s.disc_id = ")
			.push_bind_unseparated(identity.disc_id)
			.push_unseparated(" AND s.track_no = ")
			.push_bind_unseparated(identity.track_no.clone())
			.push_unseparated(")");
	}

	let rows: Vec<MetadataRow> = builder.build_query_as().fetch_all(&db.catalog).await?;
	let mut out = HashMap::with_capacity(rows.len());

	for row in rows {
		out.insert(row.identity().key(), row.into_metadata());
	}

	Ok(out)
}

/// All stored embedding chunks for one song in one field's table, in chunk
/// order. Songs indexed as a single vector return one chunk.
pub async fn embedding_chunks(
	db: &Db,
	field: FieldKey,
	identity: &SongIdentity,
) -> Result<Vec<Vec<f32>>> {
	let rows: Vec<(Vec<f32>,)> = sqlx::query_as(&format!(
		"SELECT vec FROM {} WHERE disc_id = $1 AND track_no = $2 ORDER BY chunk_no",
		map_table(field)
	))
	.bind(identity.disc_id)
	.bind(&identity.track_no)
	.fetch_all(&db.identity)
	.await?;

	Ok(rows.into_iter().map(|(vec,)| vec).collect())
}
