use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Canonical form of query text before it is handed to an embedding model:
/// NFKC, casefolded, all whitespace removed. The embedding tables were built
/// from text prepared the same way, so the query must match.
pub fn normalize_for_embedding(text: &str) -> String {
	text.nfkc().collect::<String>().to_lowercase().chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// The secondary key used to collapse alternate masters of the same song:
/// casefolded, space-stripped (artist, title).
pub fn dedup_key(artist: &str, title: &str) -> String {
	format!("{}|{}", normalize_for_embedding(artist), normalize_for_embedding(title))
}

/// Strips the noise that makes two renditions of one song read as distinct
/// titles: file extensions, bracketed or parenthesized annotations, and
/// trailing dash/tilde modifiers ("- remastered 2011").
pub fn strip_title_annotations(title: &str) -> String {
	let mut stripped = title.trim().to_string();

	for pattern in [
		r"(?i)\.(mp3|wav|flac|ogg|m4a|aac|wma)$",
		r"[\(\[][^\)\]]*[\)\]]",
		r"(?i)\s+[-~]\s+.*$",
	] {
		if let Ok(re) = Regex::new(pattern) {
			stripped = re.replace_all(&stripped, "").into_owned();
		}
	}

	stripped.trim().to_string()
}

/// Whether two (artist, title) pairs name the same perceptual song: exact
/// normalized match, or annotation-stripped similarity at or above
/// `threshold`.
pub fn same_recording(
	artist_a: &str,
	title_a: &str,
	artist_b: &str,
	title_b: &str,
	threshold: f64,
) -> bool {
	if dedup_key(artist_a, title_a) == dedup_key(artist_b, title_b) {
		return true;
	}

	let a = comparison_form(artist_a, title_a);
	let b = comparison_form(artist_b, title_b);

	strsim::normalized_levenshtein(&a, &b) >= threshold
}

fn comparison_form(artist: &str, title: &str) -> String {
	format!(
		"{} {}",
		normalize_for_embedding(artist),
		normalize_for_embedding(&strip_title_annotations(title))
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalization_casefolds_and_strips_spaces() {
		assert_eq!(normalize_for_embedding("  Red Sunset  "), "redsunset");
		assert_eq!(normalize_for_embedding("붉은 노을"), "붉은노을");
	}

	#[test]
	fn dedup_key_ignores_case_and_spacing() {
		assert_eq!(dedup_key("BIGBANG", "Red Sunset"), dedup_key("bigbang", "redsunset"));
	}

	#[test]
	fn strips_annotations_and_extensions() {
		assert_eq!(strip_title_annotations("Golden (Remastered) [Live].mp3"), "Golden");
		assert_eq!(strip_title_annotations("Golden - 2011 remaster"), "Golden");
		assert_eq!(strip_title_annotations("Golden"), "Golden");
	}

	#[test]
	fn near_identical_titles_are_the_same_recording() {
		assert!(same_recording("HUNTR/X", "Golden", "HUNTR/X", "Golden (Live)", 0.85));
		assert!(same_recording("HUNTR/X", "Golden", "huntr/x", "golden.mp3", 0.85));
		assert!(!same_recording("HUNTR/X", "Golden", "Saja Boys", "Soda Pop", 0.85));
	}

	#[test]
	fn small_typos_stay_within_threshold() {
		assert!(same_recording("The Beatles", "Let It Be", "The Beatles", "Let It Bee", 0.85));
	}
}
