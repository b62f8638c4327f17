use std::fs;
use std::path::Path;

use markdown_pdf_config::{Config, PartialConfig, PartialPdfOptions};
use markdown_pdf_core::{
    convert_file, Converter, ErrorKind, TemplateResolver, TemplateSource,
};
use markdown_pdf_test_support::{write_file, RecordingRenderer, FAKE_PDF};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const SAMPLE: &str = "# Title\n\nBody text.\n\n\
| Part | Qty |\n|------|-----|\n| Bolt | 4 |\n\n\
```sh\nmake release\n```\n";

fn converter(config: Config, cwd: &Path, renderer: &RecordingRenderer) -> Converter {
    Converter::new(
        config,
        TemplateResolver::standard(cwd),
        Box::new(renderer.clone()),
    )
}

#[test]
fn converts_markdown_through_bundled_template() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_file(temp.path(), "doc.md", SAMPLE);
    let output = temp.path().join("out").join("doc.pdf");
    let renderer = RecordingRenderer::new();
    let config = Config::validate(PartialConfig {
        title: Some("Assembly Notes".into()),
        ..PartialConfig::default()
    });

    let conversion = converter(config.clone(), temp.path(), &renderer)
        .convert(&input, &output, None)
        .expect("convert");

    assert_eq!(conversion.output, output);
    assert_eq!(conversion.template, TemplateSource::Bundled);
    assert_eq!(conversion.html, None);
    assert_eq!(fs::read(&output).expect("read pdf"), FAKE_PDF);

    let calls = renderer.calls();
    assert_eq!(calls.len(), 1);
    let html = &calls[0].html;
    assert!(html.contains("<h1>Title</h1>"), "{html}");
    assert!(html.contains("<table>"), "{html}");
    assert!(html.contains("<code class=\"language-sh\">"), "{html}");
    assert!(html.contains("Assembly Notes"), "{html}");
    assert!(html.contains("Example Company"), "{html}");
    assert!(html.contains(&config.date), "{html}");
    assert_eq!(calls[0].options, config.pdf_options);
}

#[test]
fn page_options_reach_the_renderer() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_file(temp.path(), "doc.md", "# Hi\n");
    let renderer = RecordingRenderer::new();
    let config = Config::validate(PartialConfig {
        pdf_options: Some(PartialPdfOptions {
            page_size: Some("Letter".into()),
            ..PartialPdfOptions::default()
        }),
        ..PartialConfig::default()
    });

    converter(config, temp.path(), &renderer)
        .convert(&input, &temp.path().join("doc.pdf"), None)
        .expect("convert");

    let options = &renderer.calls()[0].options;
    assert_eq!(options.page_size, "Letter");
    assert_eq!(options.margin_top, "0.75in");
}

#[test]
fn explicit_template_beats_working_directory_template() {
    let temp = TempDir::new().expect("tempdir");
    write_file(temp.path(), "template.html", "LOCAL {{ content }}");
    let explicit = write_file(temp.path(), "custom.html", "EXPLICIT {{ company }} {{ content }}");
    let input = write_file(temp.path(), "doc.md", "Hello");
    let renderer = RecordingRenderer::new();

    let conversion = converter(Config::default(), temp.path(), &renderer)
        .convert(&input, &temp.path().join("doc.pdf"), Some(&explicit))
        .expect("convert");

    assert_eq!(conversion.template, TemplateSource::File(explicit));
    assert_eq!(
        renderer.calls()[0].html,
        "EXPLICIT Example Company <p>Hello</p>\n"
    );
}

#[test]
fn working_directory_template_beats_bundled() {
    let temp = TempDir::new().expect("tempdir");
    let local = write_file(temp.path(), "template.html", "LOCAL {{ content }}");
    let input = write_file(temp.path(), "doc.md", "Hello");
    let renderer = RecordingRenderer::new();

    let conversion = converter(Config::default(), temp.path(), &renderer)
        .convert(&input, &temp.path().join("doc.pdf"), None)
        .expect("convert");

    assert_eq!(conversion.template, TemplateSource::File(local));
    assert_eq!(renderer.calls()[0].html, "LOCAL <p>Hello</p>\n");
}

#[test]
fn missing_explicit_template_is_not_found() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_file(temp.path(), "doc.md", "Hello");
    let renderer = RecordingRenderer::new();

    let err = converter(Config::default(), temp.path(), &renderer)
        .convert(
            &input,
            &temp.path().join("doc.pdf"),
            Some(&temp.path().join("nope.html")),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(renderer.calls().is_empty());
}

#[test]
fn unresolvable_template_is_template_not_found() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_file(temp.path(), "doc.md", "Hello");
    let output = temp.path().join("doc.pdf");
    let renderer = RecordingRenderer::new();
    let resolver = TemplateResolver::new(vec![TemplateSource::File(
        temp.path().join("template.html"),
    )]);

    let err = Converter::new(Config::default(), resolver, Box::new(renderer.clone()))
        .convert(&input, &output, None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
    assert!(!output.exists());
}

#[test]
fn missing_input_is_not_found() {
    let temp = TempDir::new().expect("tempdir");
    let renderer = RecordingRenderer::new();

    let err = converter(Config::default(), temp.path(), &renderer)
        .convert(
            &temp.path().join("absent.md"),
            &temp.path().join("absent.pdf"),
            None,
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn invalid_utf8_input_is_a_parse_error() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_file(temp.path(), "binary.md", b"\xff\xfe\x00A");
    let renderer = RecordingRenderer::new();

    let err = converter(Config::default(), temp.path(), &renderer)
        .convert(&input, &temp.path().join("binary.pdf"), None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn save_html_writes_intermediate_next_to_output() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_file(temp.path(), "doc.md", "# Saved\n");
    let output = temp.path().join("build").join("doc.pdf");
    let renderer = RecordingRenderer::new();
    let config = Config::validate(PartialConfig {
        save_html: Some(true),
        ..PartialConfig::default()
    });

    let conversion = converter(config, temp.path(), &renderer)
        .convert(&input, &output, None)
        .expect("convert");

    let html_path = temp.path().join("build").join("doc.html");
    assert_eq!(conversion.html.as_deref(), Some(html_path.as_path()));
    let saved = fs::read_to_string(&html_path).expect("read html");
    assert_eq!(saved, renderer.calls()[0].html);
    assert!(saved.contains("<h1>Saved</h1>"));
}

#[test]
fn renderer_failure_is_a_render_error() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_file(temp.path(), "doc.md", "Hello");
    let output = temp.path().join("doc.pdf");
    let renderer = RecordingRenderer::failing_for("doc");

    let err = converter(Config::default(), temp.path(), &renderer)
        .convert(&input, &output, None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(!output.exists());
}

#[test]
fn convert_file_reports_missing_renderer_binary() {
    let temp = TempDir::new().expect("tempdir");
    let input = write_file(temp.path(), "doc.md", "Hello");
    let config = Config::validate(PartialConfig {
        wkhtmltopdf: Some(temp.path().join("no-such-wkhtmltopdf")),
        ..PartialConfig::default()
    });

    let err = convert_file(&input, &temp.path().join("doc.pdf"), None, Some(&config))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().contains("no-such-wkhtmltopdf"), "{err}");
}

#[test]
fn placeholders_missing_from_the_config_render_empty() {
    let temp = TempDir::new().expect("tempdir");
    write_file(
        temp.path(),
        "template.html",
        "<h1>{{ title }}</h1><p>{{ subtitle }}</p>{{ content }}",
    );
    let input = write_file(temp.path(), "doc.md", "Hello");
    let output = temp.path().join("doc.pdf");
    let renderer = RecordingRenderer::new();

    converter(Config::default(), temp.path(), &renderer)
        .convert(&input, &output, None)
        .expect("convert");

    assert_eq!(renderer.calls()[0].html, "<h1></h1><p></p><p>Hello</p>\n");
    assert!(output.is_file());
}
