//! Single-file conversion: read → markdown → template → optional HTML dump →
//! PDF. The first failing step aborts the conversion.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use markdown_pdf_config::Config;

use crate::error::ConvertError;
use crate::fs::{ensure_parent, write_atomic};
use crate::markdown;
use crate::render::{PdfRenderer, Wkhtmltopdf};
use crate::template::{TemplateResolver, TemplateSource};

/// Record of a finished conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Intermediate HTML written when `save_html` is enabled.
    pub html: Option<PathBuf>,
    pub template: TemplateSource,
}

/// Runs conversions against one validated configuration.
pub struct Converter {
    config: Config,
    templates: TemplateResolver,
    renderer: Box<dyn PdfRenderer>,
}

impl Converter {
    pub fn new(
        config: Config,
        templates: TemplateResolver,
        renderer: Box<dyn PdfRenderer>,
    ) -> Self {
        Self {
            config,
            templates,
            renderer,
        }
    }

    /// Production wiring: `wkhtmltopdf` plus the standard template lookup
    /// rooted at the current directory.
    pub fn standard(config: Config) -> Result<Self, ConvertError> {
        let working_dir = env::current_dir().map_err(ConvertError::WorkingDirectory)?;
        let renderer = Wkhtmltopdf::from_config(&config);
        Ok(Self::new(
            config,
            TemplateResolver::standard(&working_dir),
            Box::new(renderer),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn templates(&self) -> &TemplateResolver {
        &self.templates
    }

    pub fn convert(
        &self,
        input: &Path,
        output: &Path,
        template: Option<&Path>,
    ) -> Result<Conversion, ConvertError> {
        if !input.is_file() {
            return Err(ConvertError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        debug!("reading {}", input.display());
        let source = fs::read_to_string(input).map_err(|source| ConvertError::Read {
            path: input.to_path_buf(),
            source,
        })?;

        let content = markdown::to_html(&source);
        let template = self.templates.resolve(template)?;
        debug!("rendering {} into {}", input.display(), template.name());
        let html = template.render(&content, &self.config)?;

        ensure_parent(output).map_err(|source| ConvertError::Write {
            path: output.to_path_buf(),
            source,
        })?;

        let html_path = if self.config.save_html {
            let path = output.with_extension("html");
            write_atomic(&path, &html).map_err(|source| ConvertError::Write {
                path: path.clone(),
                source,
            })?;
            debug!("saved intermediate HTML to {}", path.display());
            Some(path)
        } else {
            None
        };

        self.renderer
            .render(&html, output, &self.config.pdf_options)?;
        info!("converted {} -> {}", input.display(), output.display());

        Ok(Conversion {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            html: html_path,
            template: template.origin().clone(),
        })
    }
}
