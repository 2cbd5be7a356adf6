use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use melodex_domain::StructuredQuery;

use crate::{Error, Result};

const SYSTEM_PROMPT: &str = "\
You parse music search queries into JSON. Return only a JSON object with \
these keys: artist (array of artist names, include common romanizations), \
title (array of song titles), album_name (array of album titles), lyrics \
(array of quoted lyric fragments), lyrics_summary (array of short English \
descriptions of what the lyrics are about), vibe (array of short English \
audio descriptions suitable for an audio-text embedding, built from genre, \
mood, and context), genre (object mapping region to genre), year (array of \
zero to two integers), popular (array with one boolean), case (a short tag \
describing the query kind). Fill only what the query states explicitly; \
leave everything else as an empty array or object.";

/// Asks the translation model to turn free text (plus optional mood hints
/// from the client) into a structured query. The caller decides whether a
/// degenerate result warrants a retry against another backend.
pub async fn translate(
	cfg: &melodex_config::Translator,
	text: &str,
	mood_hints: &[String],
) -> Result<StructuredQuery> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
		"response_format": { "type": "json_object" },
		"messages": [
			{ "role": "system", "content": SYSTEM_PROMPT },
			{ "role": "user", "content": user_prompt(text, mood_hints) },
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref())?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_translation_response(json)
}

fn user_prompt(text: &str, mood_hints: &[String]) -> String {
	if mood_hints.is_empty() {
		format!("query: {text}")
	} else {
		format!("query: {text}\nmood hints: {}", mood_hints.join(", "))
	}
}

fn parse_translation_response(json: Value) -> Result<StructuredQuery> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Translation response is missing message content.".to_string(),
		})?;
	let mut query: StructuredQuery = serde_json::from_str(content.trim())?;

	query.normalize();

	Ok(query)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chat_response(content: &str) -> Value {
		serde_json::json!({
			"choices": [
				{ "message": { "content": content } }
			]
		})
	}

	#[test]
	fn parses_structured_query_content() {
		let json = chat_response(
			r#"{"artist": ["BIGBANG", "빅뱅"], "title": [" Red Sunset "], "popular": [true]}"#,
		);
		let query = parse_translation_response(json).expect("parse failed");

		assert_eq!(query.artist.len(), 2);
		assert_eq!(query.title, vec!["Red Sunset"]);
		assert!(query.popular_flag());
	}

	#[test]
	fn keeps_unknown_translator_keys_out_of_the_search_fields() {
		let json = chat_response(r#"{"mood": ["calm"], "vibe": ["calm ballad"]}"#);
		let query = parse_translation_response(json).expect("parse failed");

		assert_eq!(query.search_terms().len(), 1);
		assert!(query.extra.contains_key("mood"));
	}

	#[test]
	fn rejects_non_json_content() {
		let json = chat_response("sorry, I cannot do that");

		assert!(parse_translation_response(json).is_err());
	}

	#[test]
	fn mood_hints_extend_the_user_prompt() {
		let prompt = user_prompt("rainy day songs", &["calm".to_string(), "mellow".to_string()]);

		assert!(prompt.contains("rainy day songs"));
		assert!(prompt.contains("calm, mellow"));
	}
}
