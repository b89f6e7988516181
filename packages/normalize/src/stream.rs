//! Streaming OSM XML element reader.
//!
//! Wraps a `quick-xml` pull parser and yields one [`RawElement`] per
//! top-level child of the root (`node`, `way`, `relation`, `bounds`, ...),
//! in document order. Only the element being assembled is held in memory;
//! the event buffer is reused between reads.
//!
//! Inside a top-level element, `tag` children contribute `(k, v)` pairs and
//! `nd` children contribute their `ref`. Everything else (relation
//! `member`s, note text) is skipped.

use std::io::BufRead;
use std::iter::FusedIterator;

use osm_docs_normalize_models::RawElement;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Depth of the root element's children.
const RECORD_DEPTH: usize = 1;

/// Depth of a record's direct children (`tag`, `nd`).
const CHILD_DEPTH: usize = 2;

/// Pull-based iterator over the top-level elements of an OSM XML document.
///
/// Yields `Err` at most once: a structural error ends the stream.
pub struct ElementStream<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    depth: usize,
    current: Option<RawElement>,
    finished: bool,
}

impl<R: BufRead> ElementStream<R> {
    /// Creates a stream over a buffered reader.
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::with_capacity(4096),
            depth: 0,
            current: None,
            finished: false,
        }
    }

    /// Number of input bytes consumed so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.reader.buffer_position()
    }

    fn fail(&mut self, error: StreamError) -> Option<Result<RawElement, StreamError>> {
        self.finished = true;
        self.current = None;
        Some(Err(error))
    }
}

impl<R: BufRead> Iterator for ElementStream<R> {
    type Item = Result<RawElement, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(source) => {
                    let position = self.reader.error_position();
                    return self.fail(StreamError::Xml { position, source });
                }
            };
            let position = self.reader.buffer_position();

            match event {
                Event::Start(start) => {
                    match self.depth {
                        RECORD_DEPTH => match read_element(&start, position) {
                            Ok(element) => self.current = Some(element),
                            Err(e) => return self.fail(e),
                        },
                        CHILD_DEPTH => {
                            if let Some(element) = self.current.as_mut()
                                && let Err(e) = read_child(element, &start, position)
                            {
                                return self.fail(e);
                            }
                        }
                        _ => {}
                    }
                    self.depth += 1;
                }
                Event::Empty(start) => match self.depth {
                    RECORD_DEPTH => {
                        return match read_element(&start, position) {
                            Ok(element) => Some(Ok(element)),
                            Err(e) => self.fail(e),
                        };
                    }
                    CHILD_DEPTH => {
                        if let Some(element) = self.current.as_mut()
                            && let Err(e) = read_child(element, &start, position)
                        {
                            return self.fail(e);
                        }
                    }
                    _ => {}
                },
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == RECORD_DEPTH
                        && let Some(element) = self.current.take()
                    {
                        return Some(Ok(element));
                    }
                }
                Event::Eof => {
                    if self.depth > 0 {
                        let open = self.depth;
                        return self.fail(StreamError::UnexpectedEof { open });
                    }
                    self.finished = true;
                    return None;
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> FusedIterator for ElementStream<R> {}

/// Builds an element from its start tag (name and attributes).
fn read_element(start: &BytesStart<'_>, position: u64) -> Result<RawElement, StreamError> {
    let mut element = RawElement::new(decode(start.name().as_ref(), position)?);
    element.attributes = read_attributes(start, position)?;
    Ok(element)
}

/// Folds a `tag` or `nd` child into its parent element.
fn read_child(
    element: &mut RawElement,
    start: &BytesStart<'_>,
    position: u64,
) -> Result<(), StreamError> {
    match start.name().as_ref() {
        b"tag" => {
            let mut key = None;
            let mut value = String::new();
            for (name, attr_value) in read_attributes(start, position)? {
                match name.as_str() {
                    "k" => key = Some(attr_value),
                    "v" => value = attr_value,
                    _ => {}
                }
            }
            if let Some(key) = key {
                element.tags.push((key, value));
            }
        }
        b"nd" => {
            if let Some((_, node_ref)) = read_attributes(start, position)?
                .into_iter()
                .find(|(name, _)| name == "ref")
            {
                element.node_refs.push(node_ref);
            }
        }
        _ => {}
    }
    Ok(())
}

fn read_attributes(
    start: &BytesStart<'_>,
    position: u64,
) -> Result<Vec<(String, String)>, StreamError> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|source| StreamError::Attribute { position, source })?;
            let name = decode(attr.key.as_ref(), position)?;
            let value = attr
                .unescape_value()
                .map_err(|source| StreamError::Xml { position, source })?;
            Ok((name, value.into_owned()))
        })
        .collect()
}

fn decode(bytes: &[u8], position: u64) -> Result<String, StreamError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|source| StreamError::Encoding { position, source })
}

/// Structural errors that end the stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Malformed XML.
    #[error("Malformed XML at byte {position}: {source}")]
    Xml {
        /// Byte offset of the error.
        position: u64,
        /// Parser error.
        #[source]
        source: quick_xml::Error,
    },

    /// Malformed attribute syntax.
    #[error("Malformed attribute at byte {position}: {source}")]
    Attribute {
        /// Byte offset of the enclosing tag.
        position: u64,
        /// Attribute parser error.
        #[source]
        source: quick_xml::events::attributes::AttrError,
    },

    /// Element or attribute name that is not UTF-8.
    #[error("Invalid UTF-8 in name at byte {position}: {source}")]
    Encoding {
        /// Byte offset of the enclosing tag.
        position: u64,
        /// Decoding error.
        #[source]
        source: std::str::Utf8Error,
    },

    /// Input ended inside an element.
    #[error("Unexpected end of input with {open} element(s) still open")]
    UnexpectedEof {
        /// Number of unclosed elements.
        open: usize,
    },
}
