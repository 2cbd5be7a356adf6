use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn edit_template(edit: impl FnOnce(&mut toml::Table)) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	edit(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("melodex_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_edited(edit: impl FnOnce(&mut toml::Table)) -> melodex_config::Result<melodex_config::Config> {
	let path = write_temp_config(edit_template(edit));
	let result = melodex_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation_failure(
	edit: impl FnOnce(&mut toml::Table),
	expected_fragment: &str,
) {
	let err = load_edited(edit).expect_err("Expected a validation error.");
	let message = err.to_string();

	assert!(
		message.contains(expected_fragment),
		"Unexpected error message: {message}"
	);
}

#[test]
fn template_config_loads() {
	let cfg = load_edited(|_| ()).expect("Template config must validate.");

	assert_eq!(cfg.search.result_cap, 500);
	assert_eq!(cfg.search.widths.title, 50_000);
	assert_eq!(cfg.similar.max_results, 5);
}

#[test]
fn defaults_fill_missing_search_section() {
	let cfg = load_edited(|root| {
		root.remove("search");
		root.remove("similar");
	})
	.expect("Config without tunables must validate.");

	assert_eq!(cfg.search.max_concurrent_tasks, 16);
	assert_eq!(cfg.search.task_timeout_ms, 20_000);
	assert_eq!(cfg.search.overall_timeout_ms, 30_000);
	assert_eq!(cfg.search.scoped_overfetch, 10);
	assert_eq!(cfg.similar.per_chunk_k, 100);
}

#[test]
fn blank_api_keys_normalize_to_none() {
	let cfg = load_edited(|_| ()).expect("Template config must validate.");

	assert!(cfg.providers.translator.api_key.is_none());
}

#[test]
fn every_search_field_needs_a_model() {
	expect_validation_failure(
		|root| {
			let fields = root["providers"]["embedding"]["fields"]
				.as_table_mut()
				.expect("fields table");

			fields.remove("vibe");
		},
		"must assign a model to vibe",
	);
}

#[test]
fn field_assignments_must_reference_declared_models() {
	expect_validation_failure(
		|root| {
			let fields = root["providers"]["embedding"]["fields"]
				.as_table_mut()
				.expect("fields table");

			fields.insert("vibe".to_string(), Value::String("mulan".to_string()));
		},
		"references undeclared model mulan",
	);
}

#[test]
fn unknown_field_assignments_are_rejected() {
	expect_validation_failure(
		|root| {
			let fields = root["providers"]["embedding"]["fields"]
				.as_table_mut()
				.expect("fields table");

			fields.insert("mood".to_string(), Value::String("clap".to_string()));
		},
		"unknown field mood",
	);
}

#[test]
fn task_timeout_cannot_exceed_overall_timeout() {
	expect_validation_failure(
		|root| {
			let search = root["search"].as_table_mut().expect("search table");

			search.insert("task_timeout_ms".to_string(), Value::Integer(40_000));
		},
		"must not exceed search.overall_timeout_ms",
	);
}

#[test]
fn exact_match_scores_must_be_ordered() {
	expect_validation_failure(
		|root| {
			let exact = root["search"]["exact_match"].as_table_mut().expect("exact_match table");

			exact.insert("artist".to_string(), Value::Float(5e-4));
		},
		"0 < artist < title < album_name",
	);
}

#[test]
fn fuzzy_threshold_must_be_a_ratio() {
	expect_validation_failure(
		|root| {
			let similar = root["similar"].as_table_mut().expect("similar table");

			similar.insert("fuzzy_threshold".to_string(), Value::Float(1.5));
		},
		"similar.fuzzy_threshold must be in the range 0.0-1.0",
	);
}

#[test]
fn zero_width_is_rejected() {
	expect_validation_failure(
		|root| {
			let widths = root["search"]["widths"].as_table_mut().expect("widths table");

			widths.insert("album_name".to_string(), Value::Integer(0));
		},
		"search.widths.album_name must be greater than zero",
	);
}
