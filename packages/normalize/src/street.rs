//! Street name canonicalization.
//!
//! Applies two substitution passes to an `addr:street` value: the trailing
//! token is expanded through the suffix table ("Linwood Dr" → "Linwood
//! Drive"), then the leading token through the direction table ("N Blaney
//! Avenue" → "North Blaney Avenue"). Interior tokens are never touched, so
//! "Dr Martin Luther King Way" keeps its leading "Dr".
//!
//! The tables are plain data loaded from TOML. A default set is embedded at
//! compile time; [`StreetTables::from_path`] loads a replacement.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Default tables baked into the binary.
pub const DEFAULT_TABLES_TOML: &str = include_str!("../config/street_tables.toml");

static BUILTIN: LazyLock<StreetNormalizer> = LazyLock::new(|| {
    StreetTables::from_toml(DEFAULT_TABLES_TOML)
        .map(StreetNormalizer::from_validated)
        .expect("embedded street tables are valid")
});

/// Lookup tables driving [`StreetNormalizer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetTables {
    /// Trailing tokens that are already canonical street types.
    #[serde(default)]
    pub expected: BTreeSet<String>,
    /// Street type abbreviation → expansion, applied to the trailing token.
    #[serde(default)]
    pub suffixes: BTreeMap<String, String>,
    /// Cardinal direction abbreviation → expansion, applied to the leading
    /// token.
    #[serde(default)]
    pub directions: BTreeMap<String, String>,
}

impl StreetTables {
    /// Parses and validates tables from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or an entry would make
    /// normalization non-idempotent.
    pub fn from_toml(input: &str) -> Result<Self, StreetTableError> {
        let tables: Self = toml::from_str(input)?;
        tables.validate()?;
        Ok(tables)
    }

    /// Reads tables from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, StreetTableError> {
        let input = std::fs::read_to_string(path).map_err(|source| StreetTableError::Read {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Loaded street tables from {}", path.display());
        Self::from_toml(&input)
    }

    /// Checks that every entry is a single token and that no expansion is
    /// itself a key, which is what keeps `normalize` idempotent.
    ///
    /// # Errors
    ///
    /// Returns the first offending entry.
    pub fn validate(&self) -> Result<(), StreetTableError> {
        for (table, entries) in [("suffixes", &self.suffixes), ("directions", &self.directions)] {
            for (key, expansion) in entries {
                if !is_single_token(key) {
                    return Err(invalid(table, key, "key must be a single non-empty token"));
                }
                if !is_single_token(expansion) {
                    return Err(invalid(table, key, "expansion must be a single non-empty token"));
                }
                if self.suffixes.contains_key(expansion) || self.directions.contains_key(expansion) {
                    return Err(invalid(table, key, "expansion is itself an abbreviation"));
                }
            }
        }
        Ok(())
    }
}

fn is_single_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

fn invalid(table: &'static str, key: &str, reason: &'static str) -> StreetTableError {
    StreetTableError::InvalidEntry {
        table,
        key: key.to_string(),
        reason,
    }
}

/// Canonicalizes street names using a fixed set of [`StreetTables`].
#[derive(Debug, Clone)]
pub struct StreetNormalizer {
    tables: StreetTables,
}

impl StreetNormalizer {
    /// Creates a normalizer after validating the tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables fail [`StreetTables::validate`].
    pub fn new(tables: StreetTables) -> Result<Self, StreetTableError> {
        tables.validate()?;
        Ok(Self::from_validated(tables))
    }

    const fn from_validated(tables: StreetTables) -> Self {
        Self { tables }
    }

    /// Returns the normalizer built from the embedded default tables.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Returns `true` if `token` is listed as an already-canonical street
    /// type.
    #[must_use]
    pub fn is_expected(&self, token: &str) -> bool {
        self.tables.expected.contains(token)
    }

    /// Normalizes a raw street name.
    ///
    /// Total and idempotent: `normalize(normalize(x)) == normalize(x)`.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let mut name = raw.to_string();

        if let Some((start, token)) = trailing_token(raw)
            && let Some(expansion) = self.tables.suffixes.get(token)
        {
            name.replace_range(start.., expansion);
        }

        let leading = leading_token(&name)
            .and_then(|token| self.tables.directions.get(token).map(|exp| (token.len(), exp)));
        if let Some((end, expansion)) = leading {
            name.replace_range(..end, expansion);
        }

        name
    }
}

/// Returns the trailing whitespace-delimited token and its byte offset.
///
/// `None` when the string is empty or ends in whitespace.
#[must_use]
pub fn trailing_token(name: &str) -> Option<(usize, &str)> {
    let start = name
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8());
    let token = &name[start..];
    (!token.is_empty()).then_some((start, token))
}

/// Returns the leading whitespace-delimited token.
///
/// `None` when the string is empty or starts with whitespace.
#[must_use]
pub fn leading_token(name: &str) -> Option<&str> {
    let end = name.find(char::is_whitespace).unwrap_or(name.len());
    let token = &name[..end];
    (!token.is_empty()).then_some(token)
}

/// Errors from loading street tables.
#[derive(Debug, thiserror::Error)]
pub enum StreetTableError {
    /// Tables file could not be read.
    #[error("Failed to read street tables {path}: {source}")]
    Read {
        /// Path to the tables file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error.
    #[error("Invalid street tables TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// An entry that would break normalization.
    #[error("Invalid street table entry {table}.{key:?}: {reason}")]
    InvalidEntry {
        /// Table name (`suffixes` or `directions`).
        table: &'static str,
        /// Offending key.
        key: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> String {
        StreetNormalizer::builtin().normalize(raw)
    }

    #[test]
    fn expands_street_type_suffix() {
        assert_eq!(normalize("Linwood Dr"), "Linwood Drive");
        assert_eq!(normalize("Baldwin Rd."), "Baldwin Road");
        assert_eq!(normalize("Bay St."), "Bay Street");
        assert_eq!(normalize("Mission Blvd"), "Mission Boulevard");
    }

    #[test]
    fn expands_suffix_then_prefix() {
        assert_eq!(normalize("N Blaney Ave"), "North Blaney Avenue");
        assert_eq!(normalize("W. Lexington St."), "West Lexington Street");
        assert_eq!(normalize("S Main Street"), "South Main Street");
    }

    #[test]
    fn leaves_interior_tokens_alone() {
        assert_eq!(
            normalize("Dr Martin Luther King Way"),
            "Dr Martin Luther King Way"
        );
        assert_eq!(normalize("Main St Extension"), "Main St Extension");
        assert_eq!(normalize("Avenue N"), "Avenue N");
    }

    #[test]
    fn preserves_unmapped_names() {
        assert_eq!(normalize("Winchester"), "Winchester");
        assert_eq!(normalize("The Alameda"), "The Alameda");
        assert_eq!(normalize("Broadway"), "Broadway");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "   ");
    }

    #[test]
    fn expands_single_token_names() {
        assert_eq!(normalize("St"), "Street");
        assert_eq!(normalize("N"), "North");
        assert_eq!(normalize("E."), "East");
    }

    #[test]
    fn does_not_expand_across_surrounding_whitespace() {
        assert_eq!(normalize("Linwood Dr "), "Linwood Dr ");
        assert_eq!(normalize(" N Main"), " N Main");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "",
            " ",
            "St",
            "N",
            "N.",
            "Linwood Dr",
            "N Blaney Ave",
            "S. Van Ness Ave.",
            "Dr Martin Luther King Way",
            "The Alameda",
            "Winchester",
            "E St",
            "W Dr.",
            "Pl",
            "El Camino Real",
            "Embarcadero Ctr",
            "Calle Ñandú St",
            "N\tMain\tDRIVE",
            "ST. ST.",
            "Ave Ave",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn splits_tokens_on_unicode_whitespace() {
        assert_eq!(trailing_token("Main\u{a0}St"), Some((6, "St")));
        assert_eq!(leading_token("N\u{2003}Main"), Some("N"));
        assert_eq!(trailing_token("Main "), None);
        assert_eq!(leading_token(""), None);
    }

    #[test]
    fn embedded_tables_are_valid() {
        let tables = StreetTables::from_toml(DEFAULT_TABLES_TOML).unwrap();
        assert_eq!(tables.expected.len(), 12);
        assert_eq!(tables.suffixes.get("Pkwy").map(String::as_str), Some("Parkway"));
        assert_eq!(tables.directions.len(), 8);
        assert!(StreetNormalizer::builtin().is_expected("Commons"));
        assert!(!StreetNormalizer::builtin().is_expected("Way"));
    }

    #[test]
    fn rejects_expansion_that_is_an_abbreviation() {
        let err = StreetTables::from_toml(
            r#"
            [suffixes]
            "St" = "Street"
            "Street" = "Str"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, StreetTableError::InvalidEntry { .. }));
    }

    #[test]
    fn rejects_expansion_that_is_a_direction() {
        let tables = StreetTables {
            suffixes: BTreeMap::from([("Nth".to_string(), "N".to_string())]),
            directions: BTreeMap::from([("N".to_string(), "North".to_string())]),
            ..StreetTables::default()
        };
        assert!(StreetNormalizer::new(tables).is_err());
    }

    #[test]
    fn rejects_multi_token_entries() {
        let tables = StreetTables {
            suffixes: BTreeMap::from([("Hwy".to_string(), "State Highway".to_string())]),
            ..StreetTables::default()
        };
        let err = tables.validate().unwrap_err();
        assert!(err.to_string().contains("Hwy"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            StreetTables::from_toml("suffixes = 3"),
            Err(StreetTableError::Toml(_))
        ));
    }

    #[test]
    fn custom_tables_drive_normalization() {
        let tables = StreetTables::from_toml(
            r#"
            [suffixes]
            "Hwy" = "Highway"

            [directions]
            "NE" = "Northeast"
            "#,
        )
        .unwrap();
        let normalizer = StreetNormalizer::new(tables).unwrap();
        assert_eq!(normalizer.normalize("NE Sandy Hwy"), "Northeast Sandy Highway");
        assert_eq!(normalizer.normalize("N Main St"), "N Main St");
    }
}
