use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::debug;
use markdown_pdf_config::{write_default_config, Config, LoadOptions, DEFAULT_CONFIG_FILE};
use markdown_pdf_core::{BatchOptions, Converter, DEFAULT_PATTERN};

mod logging;

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Convert(args) => handle_convert(args),
        Command::BatchConvert(args) => handle_batch(args),
        Command::Init(args) => handle_init(args),
    }
}

fn handle_convert(args: ConvertArgs) -> Result<i32> {
    let ConvertArgs {
        input,
        output,
        shared,
    } = args;

    if !input.is_file() {
        bail!("input file {} not found", input.display());
    }
    let template = shared.template()?;
    let converter = converter(&shared)?;

    let conversion = converter
        .convert(&input, &output, template)
        .with_context(|| format!("failed to convert {}", input.display()))?;

    if let Some(html) = &conversion.html {
        println!("Saved HTML to {}", html.display());
    }
    println!("Created {}", conversion.output.display());
    Ok(0)
}

fn handle_batch(args: BatchArgs) -> Result<i32> {
    let BatchArgs {
        input_dir,
        output_dir,
        pattern,
        shared,
    } = args;

    if !input_dir.is_dir() {
        bail!("input directory {} not found", input_dir.display());
    }
    let template = shared.template()?;
    let converter = converter(&shared)?;

    let mut options = BatchOptions::new(&input_dir, &output_dir).with_pattern(pattern);
    if let Some(template) = template {
        options = options.with_template(template);
    }

    let report = converter.convert_batch(&options)?;
    if report.matched == 0 {
        println!(
            "No files matching '{}' in {}",
            options.pattern,
            input_dir.display()
        );
        return Ok(0);
    }

    for conversion in &report.converted {
        println!(
            "{} -> {}",
            conversion.input.display(),
            conversion.output.display()
        );
    }
    for failure in &report.failures {
        eprintln!("failed: {}: {}", failure.input.display(), failure.error);
    }
    println!(
        "Processed {} of {} file(s)",
        report.succeeded(),
        report.matched
    );
    Ok(0)
}

fn handle_init(args: InitArgs) -> Result<i32> {
    write_default_config(&args.output)?;
    println!("Wrote default configuration to {}", args.output.display());
    Ok(0)
}

fn converter(shared: &SharedArgs) -> Result<Converter> {
    let mut load = LoadOptions::default();
    if let Some(path) = &shared.config {
        if !path.is_file() {
            bail!("config file {} not found", path.display());
        }
        load = load.with_path(path);
    }
    if shared.save_html {
        load = load.with_save_html(true);
    }

    let config = Config::load(load)?;
    debug!("effective configuration: {config:?}");
    Converter::standard(config).context("failed to set up converter")
}

#[derive(Parser)]
#[command(
    name = "markdown-pdf",
    author,
    version,
    about = "Convert Markdown documents to PDF through HTML templates",
    propagate_version = true
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one Markdown file to PDF
    Convert(ConvertArgs),
    /// Convert every matching Markdown file in a directory
    BatchConvert(BatchArgs),
    /// Write the default configuration file
    Init(InitArgs),
}

/// Options shared by both conversion commands.
#[derive(Args)]
struct SharedArgs {
    /// HTML template (defaults to ./template.html, then the bundled one)
    #[arg(short, long, value_name = "PATH")]
    template: Option<PathBuf>,
    /// YAML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Keep the intermediate HTML next to each PDF
    #[arg(long = "save-html")]
    save_html: bool,
}

impl SharedArgs {
    fn template(&self) -> Result<Option<&Path>> {
        match &self.template {
            Some(path) if !path.is_file() => bail!("template {} not found", path.display()),
            other => Ok(other.as_deref()),
        }
    }
}

#[derive(Args)]
struct ConvertArgs {
    /// Markdown file to convert
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,
    /// PDF file to write
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,
    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Args)]
struct BatchArgs {
    /// Directory containing Markdown files
    #[arg(long = "input-dir", value_name = "DIR")]
    input_dir: PathBuf,
    /// Directory receiving the PDFs
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: PathBuf,
    /// Glob selecting files relative to the input directory
    #[arg(short, long, value_name = "GLOB", default_value = DEFAULT_PATTERN)]
    pattern: String,
    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Args)]
struct InitArgs {
    /// Where to write the configuration
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn batch_pattern_defaults_to_markdown() {
        let cli = Cli::try_parse_from([
            "markdown-pdf",
            "batch-convert",
            "--input-dir",
            "docs",
            "--output-dir",
            "pdf",
        ])
        .unwrap();
        match cli.command {
            Command::BatchConvert(args) => {
                assert_eq!(args.pattern, DEFAULT_PATTERN);
                assert!(args.shared.template.is_none());
                assert!(!args.shared.save_html);
            }
            _ => panic!("expected batch-convert"),
        }
    }

    #[test]
    fn verbosity_is_global_and_counted() {
        let cli = Cli::try_parse_from([
            "markdown-pdf",
            "-v",
            "init",
            "-v",
            "--output",
            "settings.yaml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Init(args) => assert_eq!(args.output, PathBuf::from("settings.yaml")),
            _ => panic!("expected init"),
        }
    }
}
