//! Tag key taxonomy.
//!
//! Sorts every tag key into one of four [`KeyCategory`] buckets, checked in
//! priority order: plain, namespaced, forbidden, other. The forbidden set is
//! the characters that cannot appear in a document-store field name (or
//! that would be read as a path separator or operator).

use std::sync::LazyLock;

use osm_docs_normalize_models::KeyCategory;
use regex::Regex;

static PLAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_]*$").expect("valid regex"));

static NAMESPACED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_]*:[a-z_]*$").expect("valid regex"));

static FORBIDDEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[=+/&<>;'"?%#$@,. \t\r\n]"#).expect("valid regex"));

/// Classifies a tag key.
///
/// Total over all strings; the empty key is [`KeyCategory::Plain`].
#[must_use]
pub fn classify(key: &str) -> KeyCategory {
    if PLAIN_RE.is_match(key) {
        KeyCategory::Plain
    } else if NAMESPACED_RE.is_match(key) {
        KeyCategory::Namespaced
    } else if has_forbidden_chars(key) {
        KeyCategory::Forbidden
    } else {
        KeyCategory::Other
    }
}

/// Returns `true` if the key contains any forbidden character.
///
/// Plain and namespaced keys never do, so this agrees with [`classify`]
/// returning [`KeyCategory::Forbidden`].
#[must_use]
pub fn has_forbidden_chars(key: &str) -> bool {
    FORBIDDEN_RE.is_match(key)
}
