//! Result and error types for VRI.
//!
//! Every failure is fatal for the run. The variants follow the three classes
//! of failure the pipeline can hit: missing inputs, generator output that no
//! longer matches the grammar the engine understands, and the
//! already-instrumented guard.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for VRI operations
pub type VriResult<T> = Result<T, VriError>;

/// Errors that can occur while instrumenting a Verilator output tree
#[derive(Debug, Error)]
pub enum VriError {
    /// The directory to instrument does not exist
    #[error("Unable to access '{}'. Does the directory exist?", path.display())]
    MissingDirectory {
        /// Directory that was requested
        path: PathBuf,
    },

    /// A file the pipeline depends on does not exist
    #[error("Required file '{}' not found", path.display())]
    MissingFile {
        /// Missing file
        path: PathBuf,
    },

    /// A line that must be present in a file was not found
    #[error("Could not find line '{line}' in '{}'", path.display())]
    MissingLine {
        /// File that was searched
        path: PathBuf,
        /// Line that was expected
        line: String,
    },

    /// A function was recognized but has no body marker
    #[error("Function '{function}' at {}:{} has no '{marker}' marker", path.display(), line + 1)]
    MissingBodyMarker {
        /// File containing the function
        path: PathBuf,
        /// Function name
        function: String,
        /// Zero-based line of the function header
        line: usize,
        /// Marker that was expected
        marker: String,
    },

    /// A function body was never closed
    #[error("Body of function '{function}' in '{}' has no closing brace", path.display())]
    UnclosedBody {
        /// File containing the function
        path: PathBuf,
        /// Function name
        function: String,
    },

    /// A declaration file with an extension the scanner does not handle
    #[error("Unknown declaration file extension {extension:?} for '{}'", path.display())]
    UnknownExtension {
        /// File that was offered to the scanner
        path: PathBuf,
        /// Its extension, if any
        extension: Option<String>,
    },

    /// A declaration line could not be scanned
    #[error("Malformed declaration on line {}: {reason}\n  {text}", line + 1)]
    MalformedDeclaration {
        /// Zero-based line number
        line: usize,
        /// Why scanning failed
        reason: String,
        /// The offending line
        text: String,
    },

    /// An extracted body could not be parsed
    #[error("Failed to parse body at {}:{}-{}: {message}\n{snippet}", path.display(), start + 1, end)]
    Parse {
        /// File the body came from
        path: PathBuf,
        /// Zero-based first body line
        start: usize,
        /// Zero-based closing line
        end: usize,
        /// Parser message
        message: String,
        /// The text that failed to parse
        snippet: String,
    },

    /// A syntax error reported by the snippet parser before it is tied to a file
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset into the parsed text
        offset: usize,
        /// What went wrong
        message: String,
    },

    /// The engine met a statement or expression shape it does not instrument
    #[error("Unsupported {kind} in instrumented body:\n{fragment}")]
    Unsupported {
        /// Kind of node ("statement", "expression", ...)
        kind: String,
        /// Regenerated text of the fragment
        fragment: String,
    },

    /// An unsupported shape, tied to the body it was found in
    #[error("Unsupported {kind} in body at {}:{}-{}:\n{fragment}", path.display(), start + 1, end)]
    UnsupportedInBody {
        /// Implementation file
        path: PathBuf,
        /// First body line, zero-based
        start: usize,
        /// Closing brace line, zero-based
        end: usize,
        /// Kind of node
        kind: String,
        /// Regenerated text of the fragment
        fragment: String,
    },

    /// The tree was already instrumented by a previous run
    #[error("'{}' is already instrumented (found '{}'). Remove it to instrument again", root.display(), marker.display())]
    AlreadyInstrumented {
        /// Root directory
        root: PathBuf,
        /// Marker file that was found
        marker: PathBuf,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Glob pattern error
    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl VriError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unsupported-shape error
    #[must_use]
    pub fn unsupported(kind: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::Unsupported {
            kind: kind.into(),
            fragment: fragment.into(),
        }
    }

    /// Create a syntax error
    #[must_use]
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// Whether this error is the already-instrumented guard rather than a failure
    #[must_use]
    pub const fn is_already_instrumented(&self) -> bool {
        matches!(self, Self::AlreadyInstrumented { .. })
    }
}

impl From<glob::GlobError> for VriError {
    fn from(err: glob::GlobError) -> Self {
        let path = err.path().to_path_buf();
        Self::Io {
            path,
            source: err.into_error(),
        }
    }
}
