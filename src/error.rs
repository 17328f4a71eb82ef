//! Error types shared by the recorder and the conversion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// A filename pattern could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder `{name}` at offset {offset}")]
    UnknownPlaceholder { name: String, offset: usize },

    #[error("unclosed placeholder starting at offset {offset}")]
    Unclosed { offset: usize },

    #[error("unmatched `}}` at offset {offset}")]
    UnmatchedClose { offset: usize },

    #[error("pattern renders to an empty filename")]
    Empty,
}

/// Errors returned synchronously by rotation calls.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("filename pattern error: {0}")]
    Template(#[from] TemplateError),

    #[error("{action} {path}: {source}")]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no active segment")]
    NoActiveSegment,
}

impl RecorderError {
    pub(crate) fn fs(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

/// The capability probe could not be run.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run encoder probe: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("encoder probe exited with {status}")]
    Failed { status: String },
}

/// Errors produced inside a detached conversion.
///
/// None of these reach the rotation caller; they are logged by the pipeline.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("{encoder} exited with {status}")]
    Attempt {
        encoder: String,
        status: String,
        stderr: String,
    },

    #[error("failed to start conversion tool: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("conversion cancelled")]
    Cancelled,

    #[error("all {attempts} conversion attempts failed")]
    Exhausted { attempts: usize },

    #[error("failed to remove {path} after conversion: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    /// Diagnostic output captured from the tool, if any.
    pub fn stderr(&self) -> &str {
        match self {
            Self::Attempt { stderr, .. } => stderr,
            _ => "",
        }
    }
}
