use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::pipeline::PipelineState;

/// Convenience result type for source parsing.
pub type InputResult<T> = Result<T, InputError>;

/// Convenience result type for storage appends.
pub type LoadResult<T> = Result<T, LoadError>;

/// Boxed driver error carried by [`LoadError`].
pub type BoxedStorageError = Box<dyn StdError + Send + Sync + 'static>;

/// A source could not be parsed at the structural level.
///
/// Shared by the CSV (customers) and XML (orders) readers. Per-record problems never produce an
/// `InputError`; those are reported as skips.
#[derive(Debug, Error)]
pub enum InputError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// XML reader error (ill-formed markup, bad escapes, mismatched end tags).
    #[error("xml error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// The input does not carry the required columns.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// The markup is readable but not a single well-formed document.
    #[error("malformed document: {message}")]
    Malformed { message: String },
}

/// A storage append (or the connection backing it) failed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The store could not be opened.
    #[error("failed to connect to '{target}': {source}")]
    Connect {
        target: String,
        #[source]
        source: BoxedStorageError,
    },

    /// The batched append into `table` did not complete.
    #[error("failed to append to table '{table}': {source}")]
    Storage {
        table: String,
        #[source]
        source: BoxedStorageError,
    },
}

impl LoadError {
    /// Wrap a driver error raised while appending into `table`.
    pub fn storage(table: impl Into<String>, source: impl Into<BoxedStorageError>) -> Self {
        Self::Storage {
            table: table.into(),
            source: source.into(),
        }
    }

    /// Wrap a driver error raised while opening `target`.
    pub fn connect(target: impl Into<String>, source: impl Into<BoxedStorageError>) -> Self {
        Self::Connect {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Terminal error of a pipeline run, naming the stage that failed.
#[derive(Debug)]
pub struct PipelineError {
    stage: PipelineState,
    kind: PipelineErrorKind,
}

/// The underlying failure of a [`PipelineError`].
#[derive(Debug)]
pub enum PipelineErrorKind {
    Input(InputError),
    Load(LoadError),
}

impl PipelineError {
    pub(crate) fn input(stage: PipelineState, err: InputError) -> Self {
        Self {
            stage,
            kind: PipelineErrorKind::Input(err),
        }
    }

    pub(crate) fn load(stage: PipelineState, err: LoadError) -> Self {
        Self {
            stage,
            kind: PipelineErrorKind::Load(err),
        }
    }

    /// The state the pipeline was in when it failed.
    pub fn stage(&self) -> PipelineState {
        self.stage
    }

    pub fn kind(&self) -> &PipelineErrorKind {
        &self.kind
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PipelineErrorKind::Input(e) => write!(f, "stage '{}' failed: {e}", self.stage),
            PipelineErrorKind::Load(e) => write!(f, "stage '{}' failed: {e}", self.stage),
        }
    }
}

impl StdError for PipelineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            PipelineErrorKind::Input(e) => Some(e),
            PipelineErrorKind::Load(e) => Some(e),
        }
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A setting has a value that cannot be used.
    #[error("invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

/// Returns `true` if any error in the `source()` chain is an [`std::io::Error`].
pub(crate) fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        if let Some(csv_err) = err.downcast_ref::<csv::Error>() {
            if matches!(csv_err.kind(), csv::ErrorKind::Io(_)) {
                return true;
            }
        }
        cur = err.source();
    }
    false
}
