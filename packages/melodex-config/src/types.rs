use std::collections::BTreeMap;

use serde::Deserialize;

/// The six query dimensions every deployment must back with an index and an
/// embedding model assignment.
pub const SEARCH_FIELDS: [&str; 6] =
	["artist", "title", "album_name", "vibe", "lyrics", "lyrics_summary"];

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub index: Index,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub similar: Similar,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	/// The store mapping embedding-table row ids to song identities; also
	/// holds the playlist scope sets.
	pub identity: Postgres,
	/// The canonical song/album catalog.
	pub catalog: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Index {
	/// Directory holding one `<field>.ann` file per search field.
	pub primary_dir: String,
	/// Fallback directory tried when a primary file is missing or corrupt.
	pub backup_dir: Option<String>,
	#[serde(default = "default_ef_search")]
	pub ef_search: usize,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: Embedding,
	pub translator: Translator,
	pub translator_fallback: Option<Translator>,
}

#[derive(Debug, Deserialize)]
pub struct Embedding {
	/// Model id to endpoint, e.g. "bgem3" or "clap".
	pub models: BTreeMap<String, EmbeddingModel>,
	/// Search field to model id. Must cover every entry of [`SEARCH_FIELDS`].
	pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingModel {
	pub api_base: String,
	pub path: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Translator {
	pub api_base: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_max_concurrent_tasks")]
	pub max_concurrent_tasks: usize,
	#[serde(default = "default_task_timeout_ms")]
	pub task_timeout_ms: u64,
	#[serde(default = "default_overall_timeout_ms")]
	pub overall_timeout_ms: u64,
	#[serde(default = "default_enrich_batch_size")]
	pub enrich_batch_size: usize,
	#[serde(default = "default_enrich_concurrency")]
	pub enrich_concurrency: usize,
	#[serde(default = "default_result_cap")]
	pub result_cap: usize,
	/// Over-fetch multiplier for the post-filter path of scoped search.
	#[serde(default = "default_scoped_overfetch")]
	pub scoped_overfetch: usize,
	#[serde(default)]
	pub widths: SearchWidths,
	#[serde(default)]
	pub cutoffs: DistanceCutoffs,
	#[serde(default)]
	pub exact_match: ExactMatchScores,
}

/// Per-field top-k. Free-text and mood fields search wide; exact-ish fields
/// stay narrow.
#[derive(Debug, Deserialize)]
pub struct SearchWidths {
	#[serde(default = "default_width_artist")]
	pub artist: usize,
	#[serde(default = "default_width_title")]
	pub title: usize,
	#[serde(default = "default_width_album_name")]
	pub album_name: usize,
	#[serde(default = "default_width_vibe")]
	pub vibe: usize,
	#[serde(default = "default_width_lyrics")]
	pub lyrics: usize,
	#[serde(default = "default_width_lyrics_summary")]
	pub lyrics_summary: usize,
}

/// Distance cutoffs for the fields where raw ANN distance is noisy. Hits
/// above the cutoff are invalidated before enrichment.
#[derive(Debug, Deserialize)]
pub struct DistanceCutoffs {
	#[serde(default = "default_cutoff_artist")]
	pub artist: f32,
	#[serde(default = "default_cutoff_title")]
	pub title: f32,
	#[serde(default = "default_cutoff_lyrics")]
	pub lyrics: f32,
	#[serde(default = "default_cutoff_lyrics_summary")]
	pub lyrics_summary: f32,
}

/// Near-certain scores forced when the query text is a literal substring of
/// the matching metadata field. Ordered artist < title < album_name, all far
/// below any real ANN distance.
#[derive(Debug, Deserialize)]
pub struct ExactMatchScores {
	#[serde(default = "default_exact_artist")]
	pub artist: f32,
	#[serde(default = "default_exact_title")]
	pub title: f32,
	#[serde(default = "default_exact_album_name")]
	pub album_name: f32,
}

#[derive(Debug, Deserialize)]
pub struct Similar {
	#[serde(default = "default_per_chunk_k")]
	pub per_chunk_k: usize,
	#[serde(default = "default_max_results")]
	pub max_results: usize,
	#[serde(default = "default_fuzzy_threshold")]
	pub fuzzy_threshold: f64,
}

impl Default for Search {
	fn default() -> Self {
		Self {
			max_concurrent_tasks: default_max_concurrent_tasks(),
			task_timeout_ms: default_task_timeout_ms(),
			overall_timeout_ms: default_overall_timeout_ms(),
			enrich_batch_size: default_enrich_batch_size(),
			enrich_concurrency: default_enrich_concurrency(),
			result_cap: default_result_cap(),
			scoped_overfetch: default_scoped_overfetch(),
			widths: SearchWidths::default(),
			cutoffs: DistanceCutoffs::default(),
			exact_match: ExactMatchScores::default(),
		}
	}
}

impl Default for SearchWidths {
	fn default() -> Self {
		Self {
			artist: default_width_artist(),
			title: default_width_title(),
			album_name: default_width_album_name(),
			vibe: default_width_vibe(),
			lyrics: default_width_lyrics(),
			lyrics_summary: default_width_lyrics_summary(),
		}
	}
}

impl Default for DistanceCutoffs {
	fn default() -> Self {
		Self {
			artist: default_cutoff_artist(),
			title: default_cutoff_title(),
			lyrics: default_cutoff_lyrics(),
			lyrics_summary: default_cutoff_lyrics_summary(),
		}
	}
}

impl Default for ExactMatchScores {
	fn default() -> Self {
		Self {
			artist: default_exact_artist(),
			title: default_exact_title(),
			album_name: default_exact_album_name(),
		}
	}
}

impl Default for Similar {
	fn default() -> Self {
		Self {
			per_chunk_k: default_per_chunk_k(),
			max_results: default_max_results(),
			fuzzy_threshold: default_fuzzy_threshold(),
		}
	}
}

fn default_ef_search() -> usize {
	64
}

fn default_max_concurrent_tasks() -> usize {
	16
}

fn default_task_timeout_ms() -> u64 {
	20_000
}

fn default_overall_timeout_ms() -> u64 {
	30_000
}

fn default_enrich_batch_size() -> usize {
	1_000
}

fn default_enrich_concurrency() -> usize {
	8
}

fn default_result_cap() -> usize {
	500
}

fn default_scoped_overfetch() -> usize {
	10
}

fn default_width_artist() -> usize {
	2_000
}

fn default_width_title() -> usize {
	50_000
}

fn default_width_album_name() -> usize {
	1_000
}

fn default_width_vibe() -> usize {
	10_000
}

fn default_width_lyrics() -> usize {
	20_000
}

fn default_width_lyrics_summary() -> usize {
	10_000
}

fn default_cutoff_artist() -> f32 {
	0.9
}

fn default_cutoff_title() -> f32 {
	1.1
}

fn default_cutoff_lyrics() -> f32 {
	1.2
}

fn default_cutoff_lyrics_summary() -> f32 {
	1.2
}

fn default_exact_artist() -> f32 {
	1e-4
}

fn default_exact_title() -> f32 {
	2e-4
}

fn default_exact_album_name() -> f32 {
	3e-4
}

fn default_per_chunk_k() -> usize {
	100
}

fn default_max_results() -> usize {
	5
}

fn default_fuzzy_threshold() -> f64 {
	0.85
}
