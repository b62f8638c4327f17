//! Markdown → PDF conversion pipeline.
//!
//! A conversion reads one Markdown file, turns it into HTML
//! ([`markdown`]), merges it into an HTML template together with the
//! configuration metadata ([`template`]) and hands the result to an external
//! HTML → PDF renderer ([`render`]). [`pipeline::Converter`] sequences those
//! steps for a single file and [`batch`] loops over a directory with per-file
//! failure isolation.

use std::path::Path;

pub mod batch;
pub mod error;
pub mod fs;
pub mod markdown;
pub mod pipeline;
pub mod render;
pub mod template;

pub use batch::{BatchFailure, BatchOptions, BatchReport, Inputs, DEFAULT_PATTERN};
pub use error::{BatchError, ConvertError, ErrorKind, RenderError, TemplateError};
pub use markdown_pdf_config::{Config, PdfOptions};
pub use pipeline::{Conversion, Converter};
pub use render::{PdfRenderer, Wkhtmltopdf};
pub use template::{Template, TemplateResolver, TemplateSource};

/// Convert `input` to a PDF at `output` with the production wiring: the
/// `wkhtmltopdf` renderer and template lookup relative to the current
/// directory. `None` for `config` means the validated defaults.
pub fn convert_file(
    input: &Path,
    output: &Path,
    template: Option<&Path>,
    config: Option<&Config>,
) -> Result<Conversion, ConvertError> {
    let config = config.cloned().unwrap_or_default();
    Converter::standard(config)?.convert(input, output, template)
}
