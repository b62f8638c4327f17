//! Configuration primitives and loader for markdown-pdf.
//!
//! Settings resolve in layers: built-in defaults → optional YAML file →
//! command-line overrides. The merged layer is then validated into a
//! [`Config`] in which every recognised key is present, so downstream crates
//! never touch raw YAML.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

/// File name written by `init` when no output path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Format used for the injected `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DEFAULT_COMPANY: &str = "Example Company";
const DEFAULT_VERSION: &str = "1.0.0";
const DEFAULT_PAGE_SIZE: &str = "A4";
const DEFAULT_MARGIN: &str = "0.75in";

/// Complete configuration resolved from defaults, an optional file and flags.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Config {
    pub company: String,
    pub logo: Option<String>,
    pub version: String,
    pub date: String,
    pub author: Option<String>,
    pub approved_by: Option<String>,
    pub comments: Option<String>,
    pub title: Option<String>,
    pub pdf_options: PdfOptions,
    pub save_html: bool,
    /// Explicit path to the `wkhtmltopdf` binary; `PATH` is searched when unset.
    pub wkhtmltopdf: Option<PathBuf>,
    /// Unrecognised top-level keys, passed through to templates untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Page layout handed to the PDF renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PdfOptions {
    #[serde(rename = "page-size")]
    pub page_size: String,
    #[serde(rename = "margin-top")]
    pub margin_top: String,
    #[serde(rename = "margin-right")]
    pub margin_right: String,
    #[serde(rename = "margin-bottom")]
    pub margin_bottom: String,
    #[serde(rename = "margin-left")]
    pub margin_left: String,
    /// Additional renderer options, forwarded as `--<key> [value]`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Config::validate(PartialConfig::default())
    }
}

impl Config {
    /// Fill every absent key from the defaults and inject today's date when
    /// `date` is missing or empty.
    pub fn validate(partial: PartialConfig) -> Self {
        Config::validate_on(partial, Local::now().date_naive())
    }

    /// Same as [`Config::validate`] with an explicit notion of "today".
    pub fn validate_on(partial: PartialConfig, today: NaiveDate) -> Self {
        let mut merged = PartialConfig::defaults();
        merged.merge(partial);
        merged.finalize(today)
    }

    /// Loads configuration using the layer order and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut layer = PartialConfig::default();

        if let Some(path) = &options.path {
            layer.merge(PartialConfig::from_path(path)?);
        }

        if options.save_html.is_some() {
            layer.merge(PartialConfig {
                save_html: options.save_html,
                ..PartialConfig::default()
            });
        }

        Ok(Config::validate(layer))
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub path: Option<PathBuf>,
    pub save_html: Option<bool>,
}

impl LoadOptions {
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_save_html(mut self, save_html: bool) -> Self {
        self.save_html = Some(save_html);
        self
    }
}

/// Errors surfaced while loading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} not found")]
    NotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to serialise config: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("failed to write config {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// One configuration layer. Every key is optional; `None` and YAML `null`
/// both mean "not set here".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialConfig {
    #[serde(default, deserialize_with = "scalar")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub approved_by: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub comments: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub title: Option<String>,
    #[serde(default)]
    pub pdf_options: Option<PartialPdfOptions>,
    #[serde(default)]
    pub save_html: Option<bool>,
    #[serde(default)]
    pub wkhtmltopdf: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Page options as written in a configuration layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialPdfOptions {
    #[serde(rename = "page-size", default, deserialize_with = "scalar")]
    pub page_size: Option<String>,
    #[serde(rename = "margin-top", default, deserialize_with = "scalar")]
    pub margin_top: Option<String>,
    #[serde(rename = "margin-right", default, deserialize_with = "scalar")]
    pub margin_right: Option<String>,
    #[serde(rename = "margin-bottom", default, deserialize_with = "scalar")]
    pub margin_bottom: Option<String>,
    #[serde(rename = "margin-left", default, deserialize_with = "scalar")]
    pub margin_left: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PartialConfig {
    /// The built-in defaults layer.
    pub fn defaults() -> Self {
        PartialConfig {
            company: Some(DEFAULT_COMPANY.to_owned()),
            version: Some(DEFAULT_VERSION.to_owned()),
            pdf_options: Some(PartialPdfOptions::defaults()),
            save_html: Some(false),
            ..PartialConfig::default()
        }
    }

    /// Read a YAML layer from disk.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        PartialConfig::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a YAML document. An empty document is an empty layer.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        let value: Value = serde_yaml::from_str(contents)?;
        match value {
            Value::Null => Ok(PartialConfig::default()),
            value => serde_yaml::from_value(value),
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialize)
    }

    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn merge(&mut self, other: PartialConfig) {
        if other.company.is_some() {
            self.company = other.company;
        }
        if other.logo.is_some() {
            self.logo = other.logo;
        }
        if other.version.is_some() {
            self.version = other.version;
        }
        if other.date.is_some() {
            self.date = other.date;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.approved_by.is_some() {
            self.approved_by = other.approved_by;
        }
        if other.comments.is_some() {
            self.comments = other.comments;
        }
        if other.title.is_some() {
            self.title = other.title;
        }
        if let Some(other_pdf) = other.pdf_options {
            match &mut self.pdf_options {
                Some(pdf) => pdf.merge(other_pdf),
                None => self.pdf_options = Some(other_pdf),
            }
        }
        if other.save_html.is_some() {
            self.save_html = other.save_html;
        }
        if other.wkhtmltopdf.is_some() {
            self.wkhtmltopdf = other.wkhtmltopdf;
        }
        self.extra.extend(other.extra);
    }

    fn finalize(self, today: NaiveDate) -> Config {
        let date = self
            .date
            .filter(|date| !date.is_empty())
            .unwrap_or_else(|| today.format(DATE_FORMAT).to_string());

        Config {
            company: self
                .company
                .unwrap_or_else(|| DEFAULT_COMPANY.to_owned()),
            logo: self.logo,
            version: self
                .version
                .unwrap_or_else(|| DEFAULT_VERSION.to_owned()),
            date,
            author: self.author,
            approved_by: self.approved_by,
            comments: self.comments,
            title: self.title,
            pdf_options: self.pdf_options.unwrap_or_default().finalize(),
            save_html: self.save_html.unwrap_or(false),
            wkhtmltopdf: self.wkhtmltopdf,
            extra: self.extra,
        }
    }
}

impl PartialPdfOptions {
    pub fn defaults() -> Self {
        PartialPdfOptions {
            page_size: Some(DEFAULT_PAGE_SIZE.to_owned()),
            margin_top: Some(DEFAULT_MARGIN.to_owned()),
            margin_right: Some(DEFAULT_MARGIN.to_owned()),
            margin_bottom: Some(DEFAULT_MARGIN.to_owned()),
            margin_left: Some(DEFAULT_MARGIN.to_owned()),
            extra: BTreeMap::new(),
        }
    }

    fn merge(&mut self, other: PartialPdfOptions) {
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
        if other.margin_top.is_some() {
            self.margin_top = other.margin_top;
        }
        if other.margin_right.is_some() {
            self.margin_right = other.margin_right;
        }
        if other.margin_bottom.is_some() {
            self.margin_bottom = other.margin_bottom;
        }
        if other.margin_left.is_some() {
            self.margin_left = other.margin_left;
        }
        self.extra.extend(other.extra);
    }

    fn finalize(self) -> PdfOptions {
        let margin = || DEFAULT_MARGIN.to_owned();
        PdfOptions {
            page_size: self
                .page_size
                .unwrap_or_else(|| DEFAULT_PAGE_SIZE.to_owned()),
            margin_top: self.margin_top.unwrap_or_else(margin),
            margin_right: self.margin_right.unwrap_or_else(margin),
            margin_bottom: self.margin_bottom.unwrap_or_else(margin),
            margin_left: self.margin_left.unwrap_or_else(margin),
            extra: self.extra,
        }
    }
}

impl From<Config> for PartialConfig {
    fn from(config: Config) -> Self {
        PartialConfig {
            company: Some(config.company),
            logo: config.logo,
            version: Some(config.version),
            date: Some(config.date),
            author: config.author,
            approved_by: config.approved_by,
            comments: config.comments,
            title: config.title,
            pdf_options: Some(config.pdf_options.into()),
            save_html: Some(config.save_html),
            wkhtmltopdf: config.wkhtmltopdf,
            extra: config.extra,
        }
    }
}

impl From<PdfOptions> for PartialPdfOptions {
    fn from(options: PdfOptions) -> Self {
        PartialPdfOptions {
            page_size: Some(options.page_size),
            margin_top: Some(options.margin_top),
            margin_right: Some(options.margin_right),
            margin_bottom: Some(options.margin_bottom),
            margin_left: Some(options.margin_left),
            extra: options.extra,
        }
    }
}

/// Write the defaults layer to `path` as YAML, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let rendered = PartialConfig::defaults().to_yaml()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, rendered).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Accept any YAML scalar for a text field so `version: 1.2` reads as "1.2".
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(Value::Bool(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a scalar value, found {}",
            describe(&other)
        ))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
