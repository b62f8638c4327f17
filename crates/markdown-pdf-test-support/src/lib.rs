//! Shared test harness utilities for markdown-pdf crates.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use markdown_pdf_config::PdfOptions;
use markdown_pdf_core::{PdfRenderer, RenderError};

/// Bytes written by the test renderers in place of a real PDF.
pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n% markdown-pdf test double\n%%EOF\n";

/// One call made to a [`RecordingRenderer`].
#[derive(Clone, Debug)]
pub struct RenderCall {
    pub html: String,
    pub output: PathBuf,
    pub options: PdfOptions,
}

/// Renderer that writes [`FAKE_PDF`] and remembers what it was asked to do.
/// Clones share the same call log.
#[derive(Clone, Debug, Default)]
pub struct RecordingRenderer {
    calls: Rc<RefCell<Vec<RenderCall>>>,
    fail_on: Option<String>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every render whose output file stem equals `stem`.
    pub fn failing_for(stem: &str) -> Self {
        Self {
            fail_on: Some(stem.to_owned()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.borrow().clone()
    }
}

impl PdfRenderer for RecordingRenderer {
    fn render(&self, html: &str, output: &Path, options: &PdfOptions) -> Result<(), RenderError> {
        self.calls.borrow_mut().push(RenderCall {
            html: html.to_owned(),
            output: output.to_path_buf(),
            options: options.clone(),
        });

        let stem = output.file_stem().and_then(|stem| stem.to_str());
        if stem.is_some() && stem == self.fail_on.as_deref() {
            return Err(RenderError::Io {
                path: output.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "simulated renderer failure"),
            });
        }

        fs::write(output, FAKE_PDF).map_err(|source| RenderError::Io {
            path: output.to_path_buf(),
            source,
        })
    }
}

/// Write `contents` to `dir/relative`, creating parent directories.
pub fn write_file(dir: &Path, relative: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(&path, contents).expect("write file");
    path
}

/// Install a shell script that behaves like `wkhtmltopdf` for the pipeline's
/// purposes: it saves stdin to `stdin.html` next to itself, appends its
/// working directory and arguments to `invocations.log`, and writes
/// [`FAKE_PDF`] to its last argument.
#[cfg(unix)]
pub fn fake_wkhtmltopdf(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = "#!/bin/sh\n\
        here=$(dirname \"$0\")\n\
        cat > \"$here/stdin.html\"\n\
        printf 'cwd=%s\\nargs=%s\\n' \"$(pwd -P)\" \"$*\" >> \"$here/invocations.log\"\n\
        for last; do :; done\n\
        printf '%%PDF-1.4\\n%% markdown-pdf test double\\n%%%%EOF\\n' > \"$last\"\n";
    let path = write_file(dir, "bin/wkhtmltopdf", script);
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// HTML the fake binary at `binary` last received on stdin.
pub fn fake_stdin(binary: &Path) -> String {
    fs::read_to_string(binary.with_file_name("stdin.html")).expect("read captured stdin")
}

/// `(cwd, args)` for every run of the fake binary at `binary`.
pub fn fake_invocations(binary: &Path) -> Vec<(String, String)> {
    let log = fs::read_to_string(binary.with_file_name("invocations.log"))
        .expect("read invocation log");
    let mut lines = log.lines();
    let mut runs = Vec::new();
    while let (Some(cwd), Some(args)) = (lines.next(), lines.next()) {
        runs.push((
            cwd.trim_start_matches("cwd=").to_owned(),
            args.trim_start_matches("args=").to_owned(),
        ));
    }
    runs
}

/// Write a config file pointing the renderer at `binary`, plus any extra YAML.
pub fn renderer_config(dir: &Path, binary: &Path, extra_yaml: &str) -> PathBuf {
    let contents = format!("wkhtmltopdf: \"{}\"\n{extra_yaml}", binary.display());
    write_file(dir, "config.yaml", contents)
}
