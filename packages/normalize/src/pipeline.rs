//! Stream → shape → sink driver.
//!
//! Pulls one element at a time from an [`ElementStream`], shapes it, and
//! writes the document as a single JSON line. Per-element failures are
//! counted and the run continues; a structural XML error stops the run
//! after flushing whatever was already written.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use osm_docs_normalize_models::RunSummary;

use crate::keys;
use crate::progress::{ProgressCallback, null_progress};
use crate::shape::DocumentShaper;
use crate::stream::{ElementStream, StreamError};

/// Elements between progress updates.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Drives a single normalization run.
pub struct Pipeline {
    shaper: DocumentShaper,
    progress: Arc<dyn ProgressCallback>,
}

impl Pipeline {
    /// Creates a pipeline with no progress reporting.
    #[must_use]
    pub fn new(shaper: DocumentShaper) -> Self {
        Self {
            shaper,
            progress: null_progress(),
        }
    }

    /// Reports input bytes consumed to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Shapes every element of `input` and writes one JSON document per
    /// line to `sink`, in input order.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::Stream`] if the input is not well-formed XML;
    ///   documents written before the error stay in `sink`
    /// * [`PipelineError::Write`] / [`PipelineError::Serialize`] if the sink
    ///   fails
    pub fn run<R: BufRead, W: Write>(
        &self,
        input: R,
        mut sink: W,
    ) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        let mut stream = ElementStream::new(input);
        let mut summary = RunSummary::default();
        let mut users = BTreeSet::new();

        while let Some(next) = stream.next() {
            let element = match next {
                Ok(element) => element,
                Err(source) => {
                    self.progress.set_position(stream.bytes_read());
                    self.progress.finish(format!(
                        "aborted after {} documents",
                        summary.documents_written
                    ));
                    sink.flush()?;
                    log::warn!(
                        "Aborting after {} documents: {source}",
                        summary.documents_written
                    );
                    return Err(PipelineError::Stream {
                        documents_written: summary.documents_written,
                        source,
                    });
                }
            };
            summary.elements_read += 1;

            if let Some(uid) = element.attribute("uid")
                && !users.contains(uid)
            {
                users.insert(uid.to_string());
            }

            if element.document_kind().is_some() {
                for (key, _) in &element.tags {
                    *summary.key_categories.entry(keys::classify(key)).or_default() += 1;
                }
            }

            match self.shaper.shape_counting(&element, &mut summary.dropped) {
                Ok(Some(doc)) => {
                    serde_json::to_writer(&mut sink, &doc)?;
                    sink.write_all(b"\n")?;
                    summary.documents_written += 1;
                }
                Ok(None) => {
                    *summary.ignored.entry(element.name).or_default() += 1;
                }
                Err(e) => {
                    log::debug!("Skipping element: {e}");
                    *summary.skipped.entry(e.reason()).or_default() += 1;
                }
            }

            if summary.elements_read % PROGRESS_INTERVAL == 0 {
                self.progress.set_position(stream.bytes_read());
            }
        }

        sink.flush()?;

        summary.unique_users = u64::try_from(users.len()).unwrap_or(u64::MAX);
        summary.duration = start.elapsed();

        self.progress.set_position(stream.bytes_read());
        self.progress.finish(format!(
            "{} documents from {} elements",
            summary.documents_written, summary.elements_read
        ));
        log::info!(
            "Wrote {} documents from {} elements ({} skipped, {} ignored) in {:.1}s",
            summary.documents_written,
            summary.elements_read,
            summary.total_skipped(),
            summary.total_ignored(),
            summary.duration.as_secs_f64()
        );

        Ok(summary)
    }
}

/// Errors that stop a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input is not well-formed XML.
    #[error("Input stream failed after {documents_written} documents: {source}")]
    Stream {
        /// Documents written before the failure.
        documents_written: u64,
        /// Structural error.
        #[source]
        source: StreamError,
    },

    /// Writing to the sink failed.
    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),

    /// Serializing a document failed.
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}
