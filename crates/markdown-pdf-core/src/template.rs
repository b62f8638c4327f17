//! HTML templates and the ordered lookup that picks one.
//!
//! Lookup order is: an explicit path supplied by the caller, then each
//! [`TemplateSource`] of the [`TemplateResolver`] in turn. The standard
//! resolver checks `template.html` in the working directory before falling
//! back to the template bundled with this crate.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::debug;
use markdown_pdf_config::Config;
use regex::Regex;
use tera::{Context, Tera};

use crate::error::TemplateError;

/// File name looked up in the working directory by the standard resolver.
pub const LOCAL_TEMPLATE_FILE: &str = "template.html";

const BUNDLED_NAME: &str = "bundled:default.html";
const BUNDLED_TEMPLATE: &str = include_str!("../templates/default.html");

/// One place a template may come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateSource {
    /// A file on disk; skipped when it does not exist.
    File(PathBuf),
    /// The default template compiled into the binary.
    Bundled,
}

impl TemplateSource {
    fn load(&self) -> Result<Option<Template>, TemplateError> {
        match self {
            TemplateSource::File(path) if path.is_file() => Template::from_path(path).map(Some),
            TemplateSource::File(_) => Ok(None),
            TemplateSource::Bundled => Ok(Some(Template::bundled())),
        }
    }

    fn describe(&self) -> String {
        match self {
            TemplateSource::File(path) => path.display().to_string(),
            TemplateSource::Bundled => "bundled default".to_owned(),
        }
    }
}

/// Ordered list of template sources consulted when no explicit template is
/// given.
#[derive(Clone, Debug)]
pub struct TemplateResolver {
    sources: Vec<TemplateSource>,
}

impl TemplateResolver {
    pub fn new(sources: Vec<TemplateSource>) -> Self {
        Self { sources }
    }

    /// `template.html` in `working_dir`, then the bundled default.
    pub fn standard(working_dir: &Path) -> Self {
        Self::new(vec![
            TemplateSource::File(working_dir.join(LOCAL_TEMPLATE_FILE)),
            TemplateSource::Bundled,
        ])
    }

    pub fn sources(&self) -> &[TemplateSource] {
        &self.sources
    }

    /// Pick a template. An explicit path must exist; it never falls through
    /// to the other sources.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<Template, TemplateError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(TemplateError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            return Template::from_path(path);
        }

        for source in &self.sources {
            if let Some(template) = source.load()? {
                debug!("using template {}", template.name());
                return Ok(template);
            }
        }

        let searched = self
            .sources
            .iter()
            .map(TemplateSource::describe)
            .collect::<Vec<_>>();
        Err(TemplateError::NoTemplate {
            searched: if searched.is_empty() {
                "nothing".to_owned()
            } else {
                searched.join(", ")
            },
        })
    }
}

/// A loaded template ready to render.
#[derive(Clone, Debug)]
pub struct Template {
    name: String,
    body: String,
    origin: TemplateSource,
}

impl Template {
    pub fn bundled() -> Self {
        Self {
            name: BUNDLED_NAME.to_owned(),
            body: BUNDLED_TEMPLATE.to_owned(),
            origin: TemplateSource::Bundled,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, TemplateError> {
        let body = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            name: path.display().to_string(),
            body,
            origin: TemplateSource::File(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &TemplateSource {
        &self.origin
    }

    /// Fill the template with `content` plus every configuration field.
    ///
    /// Output is not autoescaped: `content` is already HTML and metadata is
    /// inserted as written. A top-level name printed by `{{ ... }}` that the
    /// configuration does not define renders as empty text, unless the
    /// expression supplies its own `default(...)`.
    pub fn render(&self, content: &str, config: &Config) -> Result<String, TemplateError> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_template(&self.name, &self.body)
            .map_err(|err| TemplateError::render(&self.name, &err))?;

        let mut context = Context::from_serialize(config)
            .map_err(|err| TemplateError::render(&self.name, &err))?;
        context.insert("content", content);
        for name in printed_names(&self.body) {
            if !context.contains_key(&name) {
                debug!("{}: '{name}' is not set, rendering it empty", self.name);
                context.insert(name, "");
            }
        }

        tera.render(&self.name, &context)
            .map_err(|err| TemplateError::render(&self.name, &err))
    }
}

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "as", "true", "false", "True", "False", "loop", "super",
];

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{\{-?(.*?)-?\}\}").expect("valid expression pattern"))
}

fn literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`"#).expect("valid literal pattern")
    })
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid identifier pattern"))
}

/// Variables read at the top level of `{{ ... }}` expressions. Attribute
/// names, filter and function names, keyword arguments and string literals
/// are left out, as is any expression with a `default(...)` filter.
fn printed_names(body: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for expression in expression_pattern().captures_iter(body) {
        let expression = literal_pattern().replace_all(&expression[1], " ");
        if expression.contains("default(") {
            continue;
        }
        for found in identifier_pattern().find_iter(&expression) {
            let before = expression[..found.start()].trim_end();
            let after = expression[found.end()..].trim_start();
            let preceded_by_digit = expression[..found.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_digit());
            if before.ends_with('.') || before.ends_with('|') || preceded_by_digit {
                continue;
            }
            if after.starts_with('(') || (after.starts_with('=') && !after.starts_with("==")) {
                continue;
            }
            let name = found.as_str();
            if name.starts_with("__") || KEYWORDS.contains(&name) {
                continue;
            }
            names.insert(name.to_owned());
        }
    }
    names
}
