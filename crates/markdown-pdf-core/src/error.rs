use std::error::Error as _;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Coarse classification of conversion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Parse,
    TemplateNotFound,
    Render,
    Io,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template {path} not found")]
    NotFound { path: PathBuf },

    #[error("no template found (searched {searched})")]
    NoTemplate { searched: String },

    #[error("failed to read template {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to render template {name}: {message}")]
    Render { name: String, message: String },
}

impl TemplateError {
    pub(crate) fn render(name: &str, err: &tera::Error) -> Self {
        let mut message = err.to_string();
        let mut cause = err.source();
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        TemplateError::Render {
            name: name.to_owned(),
            message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NoTemplate { .. } => ErrorKind::TemplateNotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::Render { .. } => ErrorKind::Parse,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("wkhtmltopdf not found on PATH (install it or set `wkhtmltopdf` in the config)")]
    MissingBinary,

    #[error("renderer binary {path} not found")]
    BinaryNotFound { path: PathBuf },

    #[error("failed to launch {program}: {source}")]
    Spawn { program: PathBuf, source: io::Error },

    #[error("failed to pass HTML to {program}: {source}")]
    Input { program: PathBuf, source: io::Error },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("renderer produced an empty PDF for {path}")]
    EmptyOutput { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input file {path} not found")]
    InputNotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to resolve working directory: {0}")]
    WorkingDirectory(#[source] io::Error),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound { .. } => ErrorKind::NotFound,
            Self::Read { source, .. } if source.kind() == io::ErrorKind::InvalidData => {
                ErrorKind::Parse
            }
            Self::Read { .. } | Self::Write { .. } | Self::WorkingDirectory(_) => ErrorKind::Io,
            Self::Template(err) => err.kind(),
            Self::Render(_) => ErrorKind::Render,
        }
    }
}

/// Failures that abort a whole batch before or outside the per-file loop.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input directory {path} not found")]
    InputDirNotFound { path: PathBuf },

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("failed to list {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to create output directory {path}: {source}")]
    OutputDir { path: PathBuf, source: io::Error },
}
