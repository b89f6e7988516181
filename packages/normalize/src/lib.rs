#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OpenStreetMap XML → document normalization pipeline.
//!
//! Streams an `.osm` XML extract element by element and shapes every
//! `node` and `way` into a schema-consistent JSON document for bulk loading
//! into a document store.
//!
//! # Architecture
//!
//! - [`stream`]: constant-memory `quick-xml` reader yielding one
//!   [`RawElement`] per top-level element
//! - [`keys`]: tag key taxonomy (plain, namespaced, forbidden, other)
//! - [`street`]: table-driven street name canonicalization
//! - [`shape`]: element → [`NormalizedDocument`]
//! - [`pipeline`]: stream → shape → JSON lines, with a [`RunSummary`]
//! - [`audit`]: diagnostic passes (element counts, key categories,
//!   street types, contributors)
//!
//! # Usage
//!
//! ```rust
//! use osm_docs_normalize::{DocumentShaper, Pipeline};
//!
//! let xml = r#"<osm><node id="1" lat="37.7" lon="-122.4">
//!   <tag k="addr:street" v="N Blaney Ave"/>
//! </node></osm>"#;
//!
//! let mut out = Vec::new();
//! let summary = Pipeline::new(DocumentShaper::default())
//!     .run(xml.as_bytes(), &mut out)
//!     .unwrap();
//!
//! assert_eq!(summary.documents_written, 1);
//! assert!(String::from_utf8(out).unwrap().contains("North Blaney Avenue"));
//! ```

pub mod audit;
pub mod files;
pub mod keys;
pub mod pipeline;
pub mod progress;
pub mod shape;
pub mod stream;
pub mod street;

pub use osm_docs_normalize_models::{
    Created, DocumentKind, DropReason, KeyCategory, NormalizedDocument, RawElement, RunSummary,
    SkipReason, Timestamp,
};
pub use pipeline::Pipeline;
pub use shape::DocumentShaper;
pub use stream::ElementStream;
pub use street::{StreetNormalizer, StreetTables};

/// Errors from any stage of the normalization toolchain.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// Structural XML error.
    #[error("Stream error: {0}")]
    Stream(#[from] stream::StreamError),

    /// Pipeline run failed.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] pipeline::PipelineError),

    /// Street tables could not be loaded.
    #[error("Street table error: {0}")]
    StreetTables(#[from] street::StreetTableError),

    /// Input or output could not be opened.
    #[error("File error: {0}")]
    Files(#[from] files::FilesError),
}

/// Loads street tables from `path`, or the embedded defaults when `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn load_street_normalizer(
    path: Option<&std::path::Path>,
) -> Result<StreetNormalizer, NormalizeError> {
    match path {
        Some(path) => Ok(StreetNormalizer::new(StreetTables::from_path(path)?)?),
        None => Ok(StreetNormalizer::builtin().clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn count_nodes(xml: &str) -> Result<u64, NormalizeError> {
        let counts = audit::count_elements(xml.as_bytes())?;
        Ok(counts.get("node").copied().unwrap_or(0))
    }

    #[test]
    fn wraps_stage_errors() {
        assert_eq!(count_nodes("<osm><node/></osm>").unwrap(), 1);
        assert!(matches!(
            count_nodes("<osm><node></way></osm>"),
            Err(NormalizeError::Stream(_))
        ));

        let missing = files::open_input(Path::new("/nonexistent/extract.osm"))
            .map(|_| ())
            .map_err(NormalizeError::from);
        assert!(matches!(missing, Err(NormalizeError::Files(_))));

        let aborted = Pipeline::new(DocumentShaper::default())
            .run(&b"<osm><way id=\"1\"></node></osm>"[..], std::io::sink())
            .map_err(NormalizeError::from);
        assert!(matches!(aborted, Err(NormalizeError::Pipeline(_))));
    }

    #[test]
    fn loads_builtin_street_tables_by_default() {
        let streets = load_street_normalizer(None).unwrap();
        assert_eq!(streets.normalize("Mission St"), "Mission Street");
        assert!(matches!(
            load_street_normalizer(Some(Path::new("/nonexistent/streets.toml"))),
            Err(NormalizeError::StreetTables(_))
        ));
    }
}
