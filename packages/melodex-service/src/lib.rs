pub mod search;
pub mod similar;

mod error;

pub use error::{Error, Result};
pub use search::{SearchRequest, SearchResponse};
pub use similar::{SimilarMode, SimilarRequest, SimilarResponse, SimilarSong};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use tokio::sync::Semaphore;

use melodex_domain::{FieldKey, ScopeSet, SongIdentity, SongMetadata, StructuredQuery};
use melodex_index::IndexRegistry;
use melodex_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn resolve_vector<'a>(
		&'a self,
		cfg: &'a melodex_config::Embedding,
		field: FieldKey,
		text: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

pub trait QueryTranslator
where
	Self: Send + Sync,
{
	fn translate<'a>(
		&'a self,
		cfg: &'a melodex_config::Translator,
		text: &'a str,
		mood_hints: &'a [String],
	) -> BoxFuture<'a, Result<StructuredQuery>>;
}

pub trait MetadataGateway
where
	Self: Send + Sync,
{
	fn ids_to_identities<'a>(
		&'a self,
		field: FieldKey,
		ids: &'a [i64],
	) -> BoxFuture<'a, Result<HashMap<i64, Vec<SongIdentity>>>>;

	fn identities_to_metadata<'a>(
		&'a self,
		identities: &'a [SongIdentity],
	) -> BoxFuture<'a, Result<HashMap<String, SongMetadata>>>;

	fn embedding_chunks<'a>(
		&'a self,
		field: FieldKey,
		identity: &'a SongIdentity,
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait ScopeProvider
where
	Self: Send + Sync,
{
	fn scope_set<'a>(
		&'a self,
		field: FieldKey,
		playlist_id: &'a str,
	) -> BoxFuture<'a, Result<Option<ScopeSet>>>;
}

#[derive(Clone)]
pub struct Collaborators {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub translator: Arc<dyn QueryTranslator>,
	pub gateway: Arc<dyn MetadataGateway>,
	pub scopes: Arc<dyn ScopeProvider>,
}

impl Collaborators {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		translator: Arc<dyn QueryTranslator>,
		gateway: Arc<dyn MetadataGateway>,
		scopes: Arc<dyn ScopeProvider>,
	) -> Self {
		Self { embedding, translator, gateway, scopes }
	}

	/// Production wiring: HTTP providers plus the SQL gateway and scope
	/// reader over the shared pools.
	pub fn with_db(db: Arc<Db>) -> Self {
		Self {
			embedding: Arc::new(HttpEmbedding),
			translator: Arc::new(HttpTranslator),
			gateway: Arc::new(SqlGateway { db: db.clone() }),
			scopes: Arc::new(SqlScopes { db }),
		}
	}
}

pub struct MelodexService {
	pub cfg: melodex_config::Config,
	pub registry: Arc<IndexRegistry>,
	pub collaborators: Collaborators,
	/// Bounds concurrent metadata-batch queries so enrichment cannot starve
	/// the search workers.
	enrich_limit: Arc<Semaphore>,
}

impl MelodexService {
	pub fn new(cfg: melodex_config::Config, registry: Arc<IndexRegistry>, db: Arc<Db>) -> Self {
		let collaborators = Collaborators::with_db(db);

		Self::with_collaborators(cfg, registry, collaborators)
	}

	pub fn with_collaborators(
		cfg: melodex_config::Config,
		registry: Arc<IndexRegistry>,
		collaborators: Collaborators,
	) -> Self {
		let enrich_limit = Arc::new(Semaphore::new(cfg.search.enrich_concurrency.max(1)));

		Self { cfg, registry, collaborators, enrich_limit }
	}

	pub(crate) fn enrich_limit(&self) -> Arc<Semaphore> {
		self.enrich_limit.clone()
	}

	/// Runs an unscoped ANN search on the blocking pool.
	pub(crate) async fn ann_search(
		&self,
		field: FieldKey,
		vector: Vec<f32>,
		k: usize,
	) -> Result<Vec<melodex_domain::AnnHit>> {
		let registry = self.registry.clone();

		tokio::task::spawn_blocking(move || registry.search(field, &vector, k))
			.await
			.map_err(|err| Error::Internal { message: err.to_string() })?
			.map_err(Error::from)
	}

	/// Runs a scope-restricted ANN search on the blocking pool. The registry
	/// applies the post-filter fallback when the native selector fails.
	pub(crate) async fn scoped_ann_search(
		&self,
		field: FieldKey,
		vector: Vec<f32>,
		k: usize,
		scope: ScopeSet,
	) -> Result<Vec<melodex_domain::AnnHit>> {
		let registry = self.registry.clone();

		tokio::task::spawn_blocking(move || registry.search_scoped(field, &vector, k, &scope))
			.await
			.map_err(|err| Error::Internal { message: err.to_string() })?
			.map_err(Error::from)
	}
}

struct HttpEmbedding;

impl EmbeddingProvider for HttpEmbedding {
	fn resolve_vector<'a>(
		&'a self,
		cfg: &'a melodex_config::Embedding,
		field: FieldKey,
		text: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			Ok(melodex_providers::embedding::resolve_vector(cfg, field, text).await?)
		})
	}
}

struct HttpTranslator;

impl QueryTranslator for HttpTranslator {
	fn translate<'a>(
		&'a self,
		cfg: &'a melodex_config::Translator,
		text: &'a str,
		mood_hints: &'a [String],
	) -> BoxFuture<'a, Result<StructuredQuery>> {
		Box::pin(async move {
			Ok(melodex_providers::translator::translate(cfg, text, mood_hints).await?)
		})
	}
}

struct SqlGateway {
	db: Arc<Db>,
}

impl MetadataGateway for SqlGateway {
	fn ids_to_identities<'a>(
		&'a self,
		field: FieldKey,
		ids: &'a [i64],
	) -> BoxFuture<'a, Result<HashMap<i64, Vec<SongIdentity>>>> {
		Box::pin(async move {
			Ok(melodex_storage::gateway::ids_to_identities(&self.db, field, ids).await?)
		})
	}

	fn identities_to_metadata<'a>(
		&'a self,
		identities: &'a [SongIdentity],
	) -> BoxFuture<'a, Result<HashMap<String, SongMetadata>>> {
		Box::pin(async move {
			Ok(melodex_storage::gateway::identities_to_metadata(&self.db, identities).await?)
		})
	}

	fn embedding_chunks<'a>(
		&'a self,
		field: FieldKey,
		identity: &'a SongIdentity,
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			Ok(melodex_storage::gateway::embedding_chunks(&self.db, field, identity).await?)
		})
	}
}

struct SqlScopes {
	db: Arc<Db>,
}

impl ScopeProvider for SqlScopes {
	fn scope_set<'a>(
		&'a self,
		field: FieldKey,
		playlist_id: &'a str,
	) -> BoxFuture<'a, Result<Option<ScopeSet>>> {
		Box::pin(async move {
			Ok(melodex_storage::scopes::scope_set(&self.db, field, playlist_id).await?)
		})
	}
}
