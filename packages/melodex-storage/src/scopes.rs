use melodex_domain::{FieldKey, ScopeSet};

use crate::{Result, db::Db};

/// Reads the precomputed allowed-id set for one (field, playlist) pair. The
/// rows are written by the offline playlist batch job; this side only ever
/// reads. `None` means no scope is known, which scoped search treats as
/// "no matches", never as an unrestricted fallback.
pub async fn scope_set(
	db: &Db,
	field: FieldKey,
	playlist_id: &str,
) -> Result<Option<ScopeSet>> {
	let row: Option<(Vec<i64>,)> = sqlx::query_as(
		"SELECT ann_ids FROM playlist_scope_sets WHERE field_key = $1 AND playlist_id = $2",
	)
	.bind(field.as_str())
	.bind(playlist_id)
	.fetch_optional(&db.identity)
	.await?;

	Ok(row.map(|(ids,)| ids.into_iter().collect()))
}
