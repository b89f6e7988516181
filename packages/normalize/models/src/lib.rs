#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the OSM normalization pipeline.
//!
//! This crate contains only data types and simple conversions. It has no
//! heavyweight dependencies (no XML parser, no I/O).

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Field names occupied by the structured parts of a [`NormalizedDocument`].
///
/// A flat attribute or tag with one of these names always loses to the
/// structured field.
pub const RESERVED_FIELDS: &[&str] = &["id", "type", "created", "pos", "address", "node_refs"];

/// One top-level element read from the XML stream.
///
/// Holds everything the shaper needs and nothing else. Child elements other
/// than `tag` and `nd` are not retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawElement {
    /// Element name (`node`, `way`, `relation`, `bounds`, ...).
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child `tag` elements as `(k, v)` pairs in document order.
    pub tags: Vec<(String, String)>,
    /// Child `nd` element `ref` values in document order.
    pub node_refs: Vec<String>,
}

impl RawElement {
    /// Creates an empty element with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the first attribute value with the given name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the document kind if this element produces a document.
    #[must_use]
    pub fn document_kind(&self) -> Option<DocumentKind> {
        self.name.parse().ok()
    }
}

/// Element kinds that are shaped into documents.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentKind {
    /// A point with a location.
    Node,
    /// An ordered list of node references.
    Way,
}

/// Tag key taxonomy.
///
/// Every key string falls into exactly one category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyCategory {
    /// Lowercase letters and underscores only.
    Plain,
    /// Two plain segments joined by a single colon.
    Namespaced,
    /// Contains a character that is unsafe as a stored field name.
    Forbidden,
    /// Anything else (mixed case, digits, multiple colons).
    Other,
}

/// Why an element was excluded from the output.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// `node` or `way` without an `id` attribute.
    MissingIdentifier,
    /// `lat`/`lon` present but not finite numbers.
    MalformedCoordinate,
}

/// Why a single tag or attribute was left out of a document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// Key contains a forbidden character.
    ForbiddenKey,
    /// `addr:` key with more than one level (`addr:street:name`).
    MultiLevelAddress,
    /// Empty key, or `addr:` with nothing after the prefix. Dropped rather
    /// than stored as a `""` field name, which document stores reject.
    EmptyKey,
    /// Name already taken by an earlier attribute, tag, or structured field.
    FieldCollision,
}

/// Element `timestamp` attribute as stored in a document.
///
/// Parsed values serialize as extended JSON (`{"$date": "..."}`) so a bulk
/// loader stores a native date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Matched `YYYY-MM-DDTHH:MM:SSZ`.
    Parsed {
        /// The parsed instant.
        #[serde(rename = "$date")]
        date: DateTime<Utc>,
    },
    /// Any other value, kept verbatim.
    Raw(String),
}

/// Edit provenance copied from element attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changeset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// A shaped output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    /// Element identifier.
    pub id: String,
    /// Source element kind.
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    /// Edit provenance.
    pub created: Created,
    /// `[latitude, longitude]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<[f64; 2]>,
    /// Single-level `addr:*` tags with the prefix removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<BTreeMap<String, String>>,
    /// `nd` references of a way, in source order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_refs: Option<Vec<String>>,
    /// Every other attribute and tag.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl NormalizedDocument {
    /// Creates a document with only the identifying fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            id: id.into(),
            kind,
            created: Created::default(),
            pos: None,
            address: None,
            node_refs: None,
            fields: BTreeMap::new(),
        }
    }
}

/// Aggregate counts for a single pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Top-level elements read from the input.
    pub elements_read: u64,
    /// Documents written to the sink.
    pub documents_written: u64,
    /// Elements that are not shaped, by element name.
    pub ignored: BTreeMap<String, u64>,
    /// Elements excluded because of a per-element error.
    pub skipped: BTreeMap<SkipReason, u64>,
    /// Tags and attributes left out of otherwise valid documents.
    pub dropped: BTreeMap<DropReason, u64>,
    /// Category of every tag key seen on nodes and ways.
    pub key_categories: BTreeMap<KeyCategory, u64>,
    /// Distinct `uid` values across all elements.
    pub unique_users: u64,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl RunSummary {
    /// Total number of elements excluded because of an error.
    #[must_use]
    pub fn total_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }

    /// Total number of elements of kinds that never produce documents.
    #[must_use]
    pub fn total_ignored(&self) -> u64 {
        self.ignored.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_first_attribute() {
        let mut element = RawElement::new("node");
        element.attributes.push(("id".into(), "1".into()));
        element.attributes.push(("id".into(), "2".into()));
        assert_eq!(element.attribute("id"), Some("1"));
        assert_eq!(element.attribute("lat"), None);
    }

    #[test]
    fn resolves_document_kind_from_name() {
        assert_eq!(RawElement::new("node").document_kind(), Some(DocumentKind::Node));
        assert_eq!(RawElement::new("way").document_kind(), Some(DocumentKind::Way));
        assert_eq!(RawElement::new("relation").document_kind(), None);
        assert_eq!(RawElement::new("Node").document_kind(), None);
    }

    #[test]
    fn serializes_document_shape() {
        let mut doc = NormalizedDocument::new("42", DocumentKind::Way);
        doc.created.user = Some("alice".into());
        doc.node_refs = Some(vec!["1".into(), "2".into(), "1".into()]);
        doc.fields.insert("highway".into(), "residential".into());

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "way");
        assert_eq!(json["id"], "42");
        assert_eq!(json["created"]["user"], "alice");
        assert_eq!(json["highway"], "residential");
        assert_eq!(json["node_refs"], serde_json::json!(["1", "2", "1"]));
        assert!(json.get("pos").is_none());
        assert!(json.get("address").is_none());
    }

    #[test]
    fn serializes_parsed_timestamp_as_extended_json() {
        let date = "2012-03-28T18:31:23Z".parse::<DateTime<Utc>>().unwrap();
        let json = serde_json::to_value(Timestamp::Parsed { date }).unwrap();
        assert_eq!(json, serde_json::json!({ "$date": "2012-03-28T18:31:23Z" }));

        let raw = serde_json::to_value(Timestamp::Raw("yesterday".into())).unwrap();
        assert_eq!(raw, serde_json::json!("yesterday"));
    }

    #[test]
    fn reads_back_written_document() {
        let line = r#"{"id":"7","type":"node","created":{"timestamp":{"$date":"2014-01-02T03:04:05Z"}},"pos":[37.5,-122.25],"amenity":"cafe"}"#;
        let doc: NormalizedDocument = serde_json::from_str(line).unwrap();
        assert_eq!(doc.kind, DocumentKind::Node);
        let [lat, lon] = doc.pos.unwrap();
        assert!((lat - 37.5).abs() < f64::EPSILON);
        assert!((lon - -122.25).abs() < f64::EPSILON);
        assert!(matches!(doc.created.timestamp, Some(Timestamp::Parsed { .. })));
        assert_eq!(doc.fields.get("amenity").map(String::as_str), Some("cafe"));
    }

    #[test]
    fn parses_reason_names() {
        assert_eq!(
            "missing_identifier".parse::<SkipReason>().unwrap(),
            SkipReason::MissingIdentifier
        );
        assert_eq!(DropReason::MultiLevelAddress.to_string(), "multi_level_address");
        assert_eq!(KeyCategory::Namespaced.as_ref(), "namespaced");
    }
}
