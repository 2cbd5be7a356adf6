use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::Result;

/// The two relational collaborators: the identity-map store (embedding row
/// ids to song identities, playlist scope sets, stored embedding chunks) and
/// the canonical song/album catalog.
pub struct Db {
	pub identity: PgPool,
	pub catalog: PgPool,
}

impl Db {
	pub async fn connect(
		identity: &melodex_config::Postgres,
		catalog: &melodex_config::Postgres,
	) -> Result<Self> {
		let identity_pool = PgPoolOptions::new()
			.max_connections(identity.pool_max_conns)
			.connect(&identity.dsn)
			.await?;
		let catalog_pool = PgPoolOptions::new()
			.max_connections(catalog.pool_max_conns)
			.connect(&catalog.dsn)
			.await?;

		Ok(Self { identity: identity_pool, catalog: catalog_pool })
	}
}
