//! HTML → PDF rendering through an external engine.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, warn};
use markdown_pdf_config::{Config, PdfOptions};
use serde_yaml::Value;

use crate::error::RenderError;
use crate::fs::{parent_dir, staging_path};

const DEFAULT_BINARY: &str = "wkhtmltopdf";
const STDIN_INPUT: &str = "-";

/// Turns a finished HTML document into a PDF file at `output`.
pub trait PdfRenderer {
    fn render(&self, html: &str, output: &Path, options: &PdfOptions) -> Result<(), RenderError>;
}

/// Renderer backed by the `wkhtmltopdf` command-line tool.
#[derive(Clone, Debug, Default)]
pub struct Wkhtmltopdf {
    binary: Option<PathBuf>,
}

impl Wkhtmltopdf {
    /// Look the binary up on `PATH` at render time.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(path.into()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.wkhtmltopdf.clone(),
        }
    }

    fn locate(&self) -> Result<PathBuf, RenderError> {
        match &self.binary {
            Some(path) => which::which(path).map_err(|_| RenderError::BinaryNotFound {
                path: path.clone(),
            }),
            None => which::which(DEFAULT_BINARY).map_err(|_| RenderError::MissingBinary),
        }
    }
}

impl PdfRenderer for Wkhtmltopdf {
    fn render(&self, html: &str, output: &Path, options: &PdfOptions) -> Result<(), RenderError> {
        let program = self.locate()?;

        let output_dir = parent_dir(output);
        let staged_pdf = staging_path(&output_dir, ".pdf").map_err(|source| RenderError::Io {
            path: output_dir.clone(),
            source,
        })?;

        // HTML is read from stdin; relative URLs resolve against our cwd.
        let mut cmd = Command::new(&program);
        cmd.args(wkhtmltopdf_arguments(options))
            .arg("--quiet")
            .arg("--enable-local-file-access")
            .arg(STDIN_INPUT)
            .arg(&*staged_pdf)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("running {:?}", cmd);
        let mut child = cmd.spawn().map_err(|source| RenderError::Spawn {
            program: program.clone(),
            source,
        })?;

        let feeder = child.stdin.take().map(|mut stdin| {
            let html = html.to_owned();
            thread::spawn(move || stdin.write_all(html.as_bytes()))
        });

        let result = child.wait_with_output().map_err(|source| RenderError::Spawn {
            program: program.clone(),
            source,
        })?;
        let fed = match feeder {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked"))),
            None => Ok(()),
        };

        if !result.status.success() {
            return Err(RenderError::Failed {
                program,
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            });
        }
        fed.map_err(|source| RenderError::Input { program, source })?;

        let written = fs::metadata(&staged_pdf)
            .map_err(|source| RenderError::Io {
                path: staged_pdf.to_path_buf(),
                source,
            })?
            .len();
        if written == 0 {
            return Err(RenderError::EmptyOutput {
                path: output.to_path_buf(),
            });
        }

        staged_pdf.persist(output).map_err(|err| RenderError::Io {
            path: output.to_path_buf(),
            source: err.error,
        })
    }
}

/// Command-line flags for the page layout. Extra `pdf_options` entries become
/// `--<key> <value>`; `true` yields a bare flag, `false` and `null` are
/// dropped.
pub fn wkhtmltopdf_arguments(options: &PdfOptions) -> Vec<String> {
    let mut args = vec![
        "--page-size".to_owned(),
        options.page_size.clone(),
        "--margin-top".to_owned(),
        options.margin_top.clone(),
        "--margin-right".to_owned(),
        options.margin_right.clone(),
        "--margin-bottom".to_owned(),
        options.margin_bottom.clone(),
        "--margin-left".to_owned(),
        options.margin_left.clone(),
    ];

    for (key, value) in &options.extra {
        let flag = if key.starts_with("--") {
            key.clone()
        } else {
            format!("--{key}")
        };
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::Bool(true) => args.push(flag),
            Value::String(text) => args.extend([flag, text.clone()]),
            Value::Number(number) => args.extend([flag, number.to_string()]),
            _ => warn!("ignoring pdf option '{key}': only scalar values are supported"),
        }
    }

    args
}
