//! Input and output endpoints for the command-line passes.
//!
//! Inputs are plain `.osm` files, gzip-compressed extracts (`.gz`), or `-`
//! for stdin. Outputs are a file path or stdout.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// Read buffer size for input files.
const READ_BUFFER_BYTES: usize = 1 << 20;

/// An opened input stream.
pub struct Input {
    /// Buffered reader over the (decompressed) XML.
    pub reader: Box<dyn BufRead>,
    /// Length of the XML in bytes, when it is known up front.
    pub len: Option<u64>,
}

/// Opens an input path. `-` reads stdin; a `.gz` extension is decompressed
/// on the fly.
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be opened.
pub fn open_input(path: &Path) -> Result<Input, FilesError> {
    if path.as_os_str() == "-" {
        return Ok(Input {
            reader: Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, std::io::stdin())),
            len: None,
        });
    }

    if !path.exists() {
        return Err(FilesError::NotFound(path.display().to_string()));
    }

    let file = File::open(path).map_err(|source| open_error(path, source))?;
    let gzipped = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    if gzipped {
        log::debug!("Reading gzip-compressed input {}", path.display());
        return Ok(Input {
            reader: Box::new(BufReader::with_capacity(
                READ_BUFFER_BYTES,
                MultiGzDecoder::new(file),
            )),
            len: None,
        });
    }

    let len = file.metadata().ok().map(|m| m.len());
    Ok(Input {
        reader: Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, file)),
        len,
    })
}

/// Opens an output sink: the given file (created or truncated), or stdout.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, FilesError> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::create(path).map_err(|source| FilesError::Create {
                path: path.display().to_string(),
                source,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(BufWriter::new(std::io::stdout().lock()))),
    }
}

fn open_error(path: &Path, source: std::io::Error) -> FilesError {
    FilesError::Open {
        path: path.display().to_string(),
        source,
    }
}

/// Errors opening inputs and outputs.
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Input file not found.
    #[error("Input file not found: {0}")]
    NotFound(String),

    /// Input file could not be opened.
    #[error("Failed to open {path}: {source}")]
    Open {
        /// Input path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Output file could not be created.
    #[error("Failed to create {path}: {source}")]
    Create {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
