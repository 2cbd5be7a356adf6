use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use melodex_domain::StructuredQuery;
use melodex_service::{
	Error as ServiceError, SearchRequest, SearchResponse, SimilarRequest, SimilarResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search/text", post(search_text))
		.route("/v1/search/query", post(search_query))
		.route("/v1/search/similar", post(similar))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct TextSearchRequest {
	text: String,
	#[serde(default)]
	mood: Vec<String>,
	#[serde(default)]
	playlist_id: Option<String>,
}

async fn search_text(
	State(state): State<AppState>,
	Json(payload): Json<TextSearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let text = payload.text.trim();

	if text.is_empty() {
		return Err(ApiError::new(
			StatusCode::BAD_REQUEST,
			"EMPTY_QUERY",
			"Search text must be non-empty.",
		));
	}

	let query = translate(&state, text, &payload.mood).await?;
	let response = state
		.service
		.search_structured(SearchRequest { query, playlist_id: payload.playlist_id })
		.await?;

	Ok(Json(response))
}

async fn search_query(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search_structured(payload).await?;

	Ok(Json(response))
}

async fn similar(
	State(state): State<AppState>,
	Json(payload): Json<SimilarRequest>,
) -> Result<Json<SimilarResponse>, ApiError> {
	let response = state.service.similar_songs(payload).await?;

	Ok(Json(response))
}

/// Asks the primary translation backend for a structured query and retries
/// once against the fallback backend when the primary errors or comes back
/// with nothing searchable.
async fn translate(
	state: &AppState,
	text: &str,
	mood: &[String],
) -> Result<StructuredQuery, ApiError> {
	let service = &state.service;
	let translator = &service.collaborators.translator;
	let primary =
		translator.translate(&service.cfg.providers.translator, text, mood).await;
	let degenerate = matches!(&primary, Ok(query) if !query.has_search_terms());

	if let Ok(query) = &primary
		&& !degenerate
	{
		return Ok(query.clone());
	}

	let Some(fallback_cfg) = service.cfg.providers.translator_fallback.as_ref() else {
		return primary.map_err(ApiError::from);
	};

	if let Err(err) = &primary {
		warn!(error = %err, "Primary translation failed, trying fallback.");
	} else {
		warn!("Primary translation came back empty, trying fallback.");
	}

	match translator.translate(fallback_cfg, text, mood).await {
		Ok(query) => Ok(query),
		Err(err) => {
			warn!(error = %err, "Fallback translation failed.");

			primary.map_err(ApiError::from)
		},
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, error_code) = match &err {
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
			ServiceError::Provider { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
			ServiceError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
			ServiceError::Index { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INDEX_ERROR"),
			ServiceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
		};

		Self::new(status, error_code, err.to_string())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
