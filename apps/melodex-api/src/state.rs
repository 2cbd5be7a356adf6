use std::sync::Arc;

use color_eyre::eyre;

use melodex_domain::FieldKey;
use melodex_index::IndexRegistry;
use melodex_service::MelodexService;
use melodex_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MelodexService>,
}

impl AppState {
	pub async fn new(config: melodex_config::Config) -> color_eyre::Result<Self> {
		let db = Arc::new(Db::connect(&config.storage.identity, &config.storage.catalog).await?);
		let registry = IndexRegistry::load(&config.index)?
			.with_scoped_overfetch(config.search.scoped_overfetch);

		check_dimensions(&config, &registry)?;

		let service = MelodexService::new(config, Arc::new(registry), db);

		Ok(Self { service: Arc::new(service) })
	}
}

/// Every loaded index must agree with the dimension of the embedding model
/// assigned to its field; a mismatch would silently return nonsense
/// neighbors at query time.
fn check_dimensions(
	config: &melodex_config::Config,
	registry: &IndexRegistry,
) -> color_eyre::Result<()> {
	for field in FieldKey::ALL {
		let Some(index_dim) = registry.dimension_of(field) else {
			continue;
		};
		let model_dim = config
			.providers
			.embedding
			.fields
			.get(field.as_str())
			.and_then(|model_id| config.providers.embedding.models.get(model_id))
			.map(|model| model.dimensions as usize);

		if let Some(model_dim) = model_dim
			&& model_dim != index_dim
		{
			return Err(eyre::eyre!(
				"Index for {field} has dimension {index_dim}, but its embedding model produces {model_dim}."
			));
		}
	}

	Ok(())
}
