use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use melodex_domain::FieldKey;

use crate::{Error, Result};

/// Resolves `text` to a vector using the embedding model assigned to
/// `field`. The caller is expected to pass already-normalized text; the
/// endpoint returns `{"results": [..]}` with one float per dimension.
pub async fn resolve_vector(
	cfg: &melodex_config::Embedding,
	field: FieldKey,
	text: &str,
) -> Result<Vec<f32>> {
	let model = model_for(cfg, field)?;
	let client = Client::builder().timeout(Duration::from_millis(model.timeout_ms)).build()?;
	let url = format!("{}{}", model.api_base, model.path);
	let body = serde_json::json!({ "text": text });
	let res = client
		.post(url)
		.headers(crate::auth_headers(model.api_key.as_deref())?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_vector_response(json, model.dimensions as usize)
}

fn model_for<'a>(
	cfg: &'a melodex_config::Embedding,
	field: FieldKey,
) -> Result<&'a melodex_config::EmbeddingModel> {
	let model_id = cfg.fields.get(field.as_str()).ok_or_else(|| Error::InvalidConfig {
		message: format!("No embedding model assigned to field {field}."),
	})?;

	cfg.models.get(model_id).ok_or_else(|| Error::InvalidConfig {
		message: format!("Embedding model {model_id} is not declared."),
	})
}

fn parse_vector_response(json: Value, expected_dim: usize) -> Result<Vec<f32>> {
	let values = json.get("results").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse {
			message: "Embedding response is missing the results array.".to_string(),
		}
	})?;
	let mut vector = Vec::with_capacity(values.len());

	for value in values {
		let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding value must be numeric.".to_string(),
		})?;

		vector.push(number as f32);
	}

	if vector.len() != expected_dim {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding vector has {} dimensions, expected {expected_dim}.",
				vector.len()
			),
		});
	}

	Ok(vector)
}
