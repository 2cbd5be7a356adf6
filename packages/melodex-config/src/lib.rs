mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, DistanceCutoffs, Embedding, EmbeddingModel, ExactMatchScores, Index, Postgres,
	Providers, SEARCH_FIELDS, Search, SearchWidths, Service, Similar, Storage, Translator,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	for (label, store) in
		[("identity", &cfg.storage.identity), ("catalog", &cfg.storage.catalog)]
	{
		if store.dsn.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("storage.{label}.dsn must be non-empty."),
			});
		}
		if store.pool_max_conns == 0 {
			return Err(Error::Validation {
				message: format!("storage.{label}.pool_max_conns must be greater than zero."),
			});
		}
	}

	if cfg.index.primary_dir.trim().is_empty() {
		return Err(Error::Validation {
			message: "index.primary_dir must be non-empty.".to_string(),
		});
	}
	if cfg.index.ef_search == 0 {
		return Err(Error::Validation {
			message: "index.ef_search must be greater than zero.".to_string(),
		});
	}

	if cfg.providers.embedding.models.is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.models must declare at least one model.".to_string(),
		});
	}
	for (model_id, model) in &cfg.providers.embedding.models {
		if model.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!(
					"providers.embedding.models.{model_id}.api_base must be non-empty."
				),
			});
		}
		if model.dimensions == 0 {
			return Err(Error::Validation {
				message: format!(
					"providers.embedding.models.{model_id}.dimensions must be greater than zero."
				),
			});
		}
	}
	for field in SEARCH_FIELDS {
		let Some(model_id) = cfg.providers.embedding.fields.get(field) else {
			return Err(Error::Validation {
				message: format!(
					"providers.embedding.fields must assign a model to {field}."
				),
			});
		};

		if !cfg.providers.embedding.models.contains_key(model_id) {
			return Err(Error::Validation {
				message: format!(
					"providers.embedding.fields.{field} references undeclared model {model_id}."
				),
			});
		}
	}
	for field in cfg.providers.embedding.fields.keys() {
		if !SEARCH_FIELDS.contains(&field.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"providers.embedding.fields contains unknown field {field}."
				),
			});
		}
	}

	let mut translators = vec![("translator", &cfg.providers.translator)];

	if let Some(fallback) = cfg.providers.translator_fallback.as_ref() {
		translators.push(("translator_fallback", fallback));
	}
	for (label, translator) in translators {
		if translator.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.{label}.api_base must be non-empty."),
			});
		}
		if translator.model.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.{label}.model must be non-empty."),
			});
		}
		if !translator.temperature.is_finite() || translator.temperature < 0.0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.temperature must be zero or greater."),
			});
		}
		if translator.max_tokens == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.max_tokens must be greater than zero."),
			});
		}
	}

	if cfg.search.max_concurrent_tasks == 0 {
		return Err(Error::Validation {
			message: "search.max_concurrent_tasks must be greater than zero.".to_string(),
		});
	}
	if cfg.search.task_timeout_ms == 0 || cfg.search.overall_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search timeouts must be greater than zero.".to_string(),
		});
	}
	if cfg.search.task_timeout_ms > cfg.search.overall_timeout_ms {
		return Err(Error::Validation {
			message: "search.task_timeout_ms must not exceed search.overall_timeout_ms."
				.to_string(),
		});
	}
	if cfg.search.enrich_batch_size == 0 {
		return Err(Error::Validation {
			message: "search.enrich_batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.enrich_concurrency == 0 {
		return Err(Error::Validation {
			message: "search.enrich_concurrency must be greater than zero.".to_string(),
		});
	}
	if cfg.search.result_cap == 0 {
		return Err(Error::Validation {
			message: "search.result_cap must be greater than zero.".to_string(),
		});
	}
	if cfg.search.scoped_overfetch == 0 {
		return Err(Error::Validation {
			message: "search.scoped_overfetch must be greater than zero.".to_string(),
		});
	}

	for (label, width) in [
		("artist", cfg.search.widths.artist),
		("title", cfg.search.widths.title),
		("album_name", cfg.search.widths.album_name),
		("vibe", cfg.search.widths.vibe),
		("lyrics", cfg.search.widths.lyrics),
		("lyrics_summary", cfg.search.widths.lyrics_summary),
	] {
		if width == 0 {
			return Err(Error::Validation {
				message: format!("search.widths.{label} must be greater than zero."),
			});
		}
	}

	for (label, cutoff) in [
		("artist", cfg.search.cutoffs.artist),
		("title", cfg.search.cutoffs.title),
		("lyrics", cfg.search.cutoffs.lyrics),
		("lyrics_summary", cfg.search.cutoffs.lyrics_summary),
	] {
		if !cutoff.is_finite() || cutoff <= 0.0 {
			return Err(Error::Validation {
				message: format!("search.cutoffs.{label} must be a positive finite number."),
			});
		}
	}

	let exact = &cfg.search.exact_match;

	if exact.artist <= 0.0 || exact.artist >= exact.title || exact.title >= exact.album_name {
		return Err(Error::Validation {
			message:
				"search.exact_match scores must satisfy 0 < artist < title < album_name."
					.to_string(),
		});
	}

	if cfg.similar.per_chunk_k == 0 {
		return Err(Error::Validation {
			message: "similar.per_chunk_k must be greater than zero.".to_string(),
		});
	}
	if cfg.similar.max_results == 0 {
		return Err(Error::Validation {
			message: "similar.max_results must be greater than zero.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.similar.fuzzy_threshold) {
		return Err(Error::Validation {
			message: "similar.fuzzy_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for model in cfg.providers.embedding.models.values_mut() {
		if model.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			model.api_key = None;
		}
	}

	let mut translators = vec![&mut cfg.providers.translator];

	if let Some(fallback) = cfg.providers.translator_fallback.as_mut() {
		translators.push(fallback);
	}
	for translator in translators {
		if translator.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			translator.api_key = None;
		}
	}
}
