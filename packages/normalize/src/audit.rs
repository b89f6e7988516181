//! Diagnostic passes over an OSM extract.
//!
//! Each audit makes a single streaming pass and keeps only its aggregate:
//! element-name frequencies, tag key categories, unexpected street types,
//! or the set of contributing user ids. None of them gate what the
//! pipeline writes.

use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use osm_docs_normalize_models::KeyCategory;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::keys;
use crate::street::{StreetNormalizer, trailing_token};
use crate::stream::{ElementStream, StreamError};

/// Counts every element name in the document, nested ones included
/// (`tag`, `nd`, `member`, ...).
///
/// # Errors
///
/// Returns an error if the input is not well-formed XML.
pub fn count_elements<R: BufRead>(input: R) -> Result<BTreeMap<String, u64>, StreamError> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut counts = BTreeMap::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                *counts.entry(name).or_default() += 1;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(source) => {
                return Err(StreamError::Xml {
                    position: reader.error_position(),
                    source,
                });
            }
        }
    }

    Ok(counts)
}

/// Tallies the [`KeyCategory`] of every tag key on nodes and ways.
///
/// # Errors
///
/// Returns an error if the input is not well-formed XML.
pub fn audit_keys<R: BufRead>(input: R) -> Result<BTreeMap<KeyCategory, u64>, StreamError> {
    let mut counts = BTreeMap::new();
    for element in ElementStream::new(input) {
        let element = element?;
        if element.document_kind().is_none() {
            continue;
        }
        for (key, _) in &element.tags {
            *counts.entry(keys::classify(key)).or_default() += 1;
        }
    }
    Ok(counts)
}

/// Street names grouped by a trailing token that is not an expected street
/// type.
pub type StreetTypeAudit = BTreeMap<String, BTreeSet<String>>;

/// Collects `addr:street` values on nodes and ways whose trailing token is
/// not in the expected list of `streets`.
///
/// # Errors
///
/// Returns an error if the input is not well-formed XML.
pub fn audit_streets<R: BufRead>(
    input: R,
    streets: &StreetNormalizer,
) -> Result<StreetTypeAudit, StreamError> {
    let mut unexpected = StreetTypeAudit::new();
    for element in ElementStream::new(input) {
        let element = element?;
        if element.document_kind().is_none() {
            continue;
        }
        for (key, name) in &element.tags {
            if key != "addr:street" {
                continue;
            }
            if let Some((_, street_type)) = trailing_token(name)
                && !streets.is_expected(street_type)
            {
                unexpected
                    .entry(street_type.to_string())
                    .or_default()
                    .insert(name.clone());
            }
        }
    }
    Ok(unexpected)
}

/// Collects the distinct `uid` attributes of all top-level elements.
///
/// # Errors
///
/// Returns an error if the input is not well-formed XML.
pub fn unique_users<R: BufRead>(input: R) -> Result<BTreeSet<String>, StreamError> {
    let mut users = BTreeSet::new();
    for element in ElementStream::new(input) {
        let mut element = element?;
        if let Some(index) = element.attributes.iter().position(|(name, _)| name == "uid") {
            users.insert(element.attributes.swap_remove(index).1);
        }
    }
    Ok(users)
}
