//! Directory conversion with per-file failure isolation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{BatchError, ConvertError};
use crate::pipeline::{Conversion, Converter};

/// Glob used when the caller does not supply one.
pub const DEFAULT_PATTERN: &str = "*.md";

#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Glob matched against paths relative to `input_dir`. `*` stays within
    /// one directory level, `**` recurses.
    pub pattern: String,
    pub template: Option<PathBuf>,
}

impl BatchOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            pattern: DEFAULT_PATTERN.to_owned(),
            template: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }
}

#[derive(Debug)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: ConvertError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of files that matched the pattern.
    pub matched: usize,
    pub converted: Vec<Conversion>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.converted.len()
    }
}

impl Converter {
    /// Convert every matching file. A failing file is recorded and the loop
    /// moves on; only setup problems return `Err`.
    pub fn convert_batch(&self, options: &BatchOptions) -> Result<BatchReport, BatchError> {
        if !options.input_dir.is_dir() {
            return Err(BatchError::InputDirNotFound {
                path: options.input_dir.clone(),
            });
        }

        let Inputs { files, unreadable } = find_inputs(&options.input_dir, &options.pattern)?;
        let mut report = BatchReport {
            matched: files.len() + unreadable.len(),
            ..BatchReport::default()
        };

        if report.matched == 0 {
            info!(
                "no files matching '{}' in {}",
                options.pattern,
                options.input_dir.display()
            );
            return Ok(report);
        }

        fs::create_dir_all(&options.output_dir).map_err(|source| BatchError::OutputDir {
            path: options.output_dir.clone(),
            source,
        })?;

        for (relative, source) in unreadable {
            let input = options.input_dir.join(relative);
            warn!("cannot read {}: {source}", input.display());
            report.failures.push(BatchFailure {
                error: ConvertError::Read {
                    path: input.clone(),
                    source,
                },
                input,
            });
        }

        for relative in files {
            let input = options.input_dir.join(&relative);
            let output = options.output_dir.join(&relative).with_extension("pdf");
            match self.convert(&input, &output, options.template.as_deref()) {
                Ok(conversion) => report.converted.push(conversion),
                Err(error) => {
                    warn!("failed to convert {}: {error}", input.display());
                    report.failures.push(BatchFailure { input, error });
                }
            }
        }

        info!(
            "converted {} of {} file(s) from {}",
            report.succeeded(),
            report.matched,
            options.input_dir.display()
        );
        Ok(report)
    }
}

/// Files selected for a batch, relative to the input directory.
#[derive(Debug, Default)]
pub struct Inputs {
    /// Matching files, sorted.
    pub files: Vec<PathBuf>,
    /// Matching entries that could not be inspected, such as dangling
    /// symlinks. Each one becomes a per-file failure.
    pub unreadable: Vec<(PathBuf, io::Error)>,
}

/// Files under `dir` matching `pattern`. Entry errors on paths the pattern
/// does not select are logged and skipped; only a failure to read `dir`
/// itself is an error.
pub fn find_inputs(dir: &Path, pattern: &str) -> Result<Inputs, BatchError> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| BatchError::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?
        .compile_matcher();

    let mut walker = WalkDir::new(dir).min_depth(1).follow_links(true);
    if !pattern.contains('/') && !pattern.contains("**") {
        walker = walker.max_depth(1);
    }

    let relative_to_dir = |path: &Path| {
        path.strip_prefix(dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut inputs = Inputs::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let failed = err.path().map(Path::to_path_buf);
                let relative = match failed {
                    Some(path) if path != dir => relative_to_dir(&path),
                    _ => {
                        return Err(BatchError::Walk {
                            path: dir.to_path_buf(),
                            source: err,
                        })
                    }
                };
                if matcher.is_match(&relative) {
                    inputs.unreadable.push((relative, io::Error::from(err)));
                } else {
                    debug!("skipping unreadable entry {}: {err}", relative.display());
                }
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_to_dir(entry.path());
        if matcher.is_match(&relative) {
            inputs.files.push(relative);
        }
    }

    inputs.files.sort();
    inputs.unreadable.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(inputs)
}
