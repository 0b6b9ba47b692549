//! Error types shared across the crate

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the sync engine and its collaborators.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The document could not be parsed as XML.
    #[error("malformed template document: {0}")]
    MalformedDocument(String),

    /// The templates/template/template path is missing from the document.
    #[error("no template name found in document")]
    NameNotFound,

    /// No template with the given technical name exists on the server.
    #[error("template \"{0}\" not found on server")]
    TemplateNotFound(String),

    /// More than one template matched a name that must be unique.
    #[error("template name \"{name}\" matched {count} templates on the server")]
    AmbiguousTemplate {
        /// The name that was looked up
        name: String,
        /// How many templates matched it
        count: usize,
    },

    /// A local file could not be read.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A local file or directory could not be written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that was being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The server speaks an API major version this tool does not support.
    #[error("unsupported API version {found}; supported major versions: {supported:?}")]
    UnsupportedApiVersion {
        /// Version string reported by the server
        found: String,
        /// Major versions this tool accepts
        supported: &'static [&'static str],
    },

    /// Unknown serialization format in the configuration.
    #[error("unsupported format \"{0}\"; supported formats: xml")]
    UnsupportedFormat(String),

    /// The configuration file is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The HTTP request itself failed.
    #[error("API request failed: {0}")]
    Transport(String),

    /// The server answered with an error object or an unusable payload.
    #[error("API error: {0}")]
    Api(String),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using [`SyncError`].
pub type Result<T> = std::result::Result<T, SyncError>;
