//! Element → document shaping.
//!
//! Turns one [`RawElement`] into at most one [`NormalizedDocument`].
//! Attributes are applied before tags, and within each pass the first
//! writer of a field name wins. Tags whose keys cannot be stored safely are
//! dropped and counted, never partially merged.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use osm_docs_normalize_models::{
    DocumentKind, DropReason, NormalizedDocument, RESERVED_FIELDS, RawElement, SkipReason,
    Timestamp,
};
use regex::Regex;

use crate::keys;
use crate::street::StreetNormalizer;

/// Tag key prefix for structured address fields.
pub const ADDRESS_PREFIX: &str = "addr:";

/// Exact layout accepted as a structured timestamp.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}Z$").expect("valid regex")
});

/// Counts of tags and attributes dropped while shaping.
pub type DropTally = BTreeMap<DropReason, u64>;

/// Shapes raw elements into documents.
#[derive(Debug, Clone)]
pub struct DocumentShaper {
    streets: StreetNormalizer,
}

impl Default for DocumentShaper {
    fn default() -> Self {
        Self::new(StreetNormalizer::builtin().clone())
    }
}

impl DocumentShaper {
    /// Creates a shaper that canonicalizes `addr:street` with `streets`.
    #[must_use]
    pub const fn new(streets: StreetNormalizer) -> Self {
        Self { streets }
    }

    /// Shapes an element, discarding drop counts.
    ///
    /// # Errors
    ///
    /// See [`Self::shape_counting`].
    pub fn shape(&self, element: &RawElement) -> Result<Option<NormalizedDocument>, ShapeError> {
        self.shape_counting(element, &mut DropTally::new())
    }

    /// Shapes an element, adding every dropped tag or attribute to
    /// `dropped`.
    ///
    /// Returns `Ok(None)` for element kinds that never produce documents.
    ///
    /// # Errors
    ///
    /// * [`ShapeError::MissingIdentifier`] if a `node` or `way` has no `id`
    /// * [`ShapeError::MalformedCoordinate`] if `lat` and `lon` are present
    ///   but are not both finite numbers
    pub fn shape_counting(
        &self,
        element: &RawElement,
        dropped: &mut DropTally,
    ) -> Result<Option<NormalizedDocument>, ShapeError> {
        let Some(kind) = element.document_kind() else {
            return Ok(None);
        };
        let id = element
            .attribute("id")
            .ok_or(ShapeError::MissingIdentifier { kind })?;

        let mut doc = NormalizedDocument::new(id, kind);
        doc.pos = read_position(element, kind, id)?;

        for (name, value) in &element.attributes {
            match name.as_str() {
                "id" | "lat" | "lon" => {}
                "version" => doc.created.version = Some(value.clone()),
                "changeset" => doc.created.changeset = Some(value.clone()),
                "timestamp" => doc.created.timestamp = Some(parse_timestamp(value)),
                "user" => doc.created.user = Some(value.clone()),
                "uid" => doc.created.uid = Some(value.clone()),
                _ if keys::has_forbidden_chars(name) => tally(dropped, DropReason::ForbiddenKey),
                _ => insert_field(&mut doc.fields, name, value, dropped),
            }
        }

        let mut address = BTreeMap::new();
        for (key, value) in &element.tags {
            if keys::has_forbidden_chars(key) {
                tally(dropped, DropReason::ForbiddenKey);
            } else if key.is_empty() {
                tally(dropped, DropReason::EmptyKey);
            } else if let Some(field) = key.strip_prefix(ADDRESS_PREFIX) {
                self.insert_address(&mut address, field, value, dropped);
            } else {
                insert_field(&mut doc.fields, key, value, dropped);
            }
        }
        if !address.is_empty() {
            doc.address = Some(address);
        }

        if kind == DocumentKind::Way {
            doc.node_refs = Some(element.node_refs.clone());
        }

        Ok(Some(doc))
    }

    fn insert_address(
        &self,
        address: &mut BTreeMap<String, String>,
        field: &str,
        value: &str,
        dropped: &mut DropTally,
    ) {
        if field.is_empty() {
            tally(dropped, DropReason::EmptyKey);
        } else if field.contains(':') {
            tally(dropped, DropReason::MultiLevelAddress);
        } else if address.contains_key(field) {
            tally(dropped, DropReason::FieldCollision);
        } else {
            let value = if field == "street" {
                self.streets.normalize(value)
            } else {
                value.to_string()
            };
            address.insert(field.to_string(), value);
        }
    }
}

fn insert_field(
    fields: &mut BTreeMap<String, String>,
    name: &str,
    value: &str,
    dropped: &mut DropTally,
) {
    if RESERVED_FIELDS.contains(&name) || fields.contains_key(name) {
        tally(dropped, DropReason::FieldCollision);
    } else {
        fields.insert(name.to_string(), value.to_string());
    }
}

fn tally(dropped: &mut DropTally, reason: DropReason) {
    *dropped.entry(reason).or_default() += 1;
}

/// Parses `lat`/`lon` into `[lat, lon]` when both are present.
fn read_position(
    element: &RawElement,
    kind: DocumentKind,
    id: &str,
) -> Result<Option<[f64; 2]>, ShapeError> {
    let (Some(lat), Some(lon)) = (element.attribute("lat"), element.attribute("lon")) else {
        return Ok(None);
    };

    let parse = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    match (parse(lat), parse(lon)) {
        (Some(latitude), Some(longitude)) => Ok(Some([latitude, longitude])),
        _ => Err(ShapeError::MalformedCoordinate {
            kind,
            id: id.to_string(),
            lat: lat.to_string(),
            lon: lon.to_string(),
        }),
    }
}

/// Parses a `YYYY-MM-DDTHH:MM:SSZ` timestamp, keeping anything else
/// verbatim.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Timestamp {
    if TIMESTAMP_RE.is_match(raw)
        && let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
    {
        return Timestamp::Parsed {
            date: naive.and_utc(),
        };
    }
    Timestamp::Raw(raw.to_string())
}

/// Per-element shaping failures. The element is skipped; the run goes on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// `node` or `way` without an `id` attribute.
    #[error("{kind} element has no id")]
    MissingIdentifier {
        /// Element kind.
        kind: DocumentKind,
    },

    /// `lat`/`lon` present but unusable.
    #[error("{kind} {id} has malformed coordinates (lat={lat:?}, lon={lon:?})")]
    MalformedCoordinate {
        /// Element kind.
        kind: DocumentKind,
        /// Element identifier.
        id: String,
        /// Raw `lat` attribute.
        lat: String,
        /// Raw `lon` attribute.
        lon: String,
    },
}

impl ShapeError {
    /// The skip reason recorded in run summaries.
    #[must_use]
    pub const fn reason(&self) -> SkipReason {
        match self {
            Self::MissingIdentifier { .. } => SkipReason::MissingIdentifier,
            Self::MalformedCoordinate { .. } => SkipReason::MalformedCoordinate,
        }
    }
}
