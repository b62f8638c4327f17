//! Markdown → HTML adapter.

use pulldown_cmark::{html, Options, Parser};

/// Render Markdown text to an HTML fragment. Pipe tables are enabled on top
/// of CommonMark, which already covers fenced code blocks.
pub fn to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut rendered = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut rendered, parser);
    rendered
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options
}
