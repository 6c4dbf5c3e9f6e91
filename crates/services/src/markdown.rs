//! Markdown to HTML for model responses.
//!
//! Single newlines are kept as line breaks. Fenced code blocks are
//! highlighted with syntect using inline styles for the active theme.
//! Rendering never fails: if anything goes wrong the caller gets the input
//! back as escaped text.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use shared::Theme;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{self, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// A run of code text in one colour (0xRRGGBB).
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightedSpan {
    pub text: String,
    pub color: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightedLine {
    pub spans: Vec<HighlightedSpan>,
}

/// Extensions enabled for every markdown view: tables, strikethrough and
/// task lists on top of CommonMark.
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Renders markdown for one theme. Cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownRenderer {
    theme: Theme,
}

impl MarkdownRenderer {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn render(&self, text: &str) -> String {
        match panic::catch_unwind(AssertUnwindSafe(|| self.render_html(text))) {
            Ok(out) => out,
            Err(_) => {
                tracing::warn!("markdown rendering failed, showing plain text");
                format!("<p>{}</p>\n", escape(text))
            }
        }
    }

    fn render_html(&self, text: &str) -> String {
        let mut events: Vec<Event> = Vec::new();
        let mut code: Option<(Option<String>, String)> = None;

        for event in Parser::new_ext(text, parser_options()) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some((lang, String::new()));
                }
                Event::End(Tag::CodeBlock(_)) => {
                    if let Some((lang, body)) = code.take() {
                        let block = self.code_block_html(lang.as_deref(), &body);
                        events.push(Event::Html(CowStr::from(block)));
                    }
                }
                Event::Text(t) if code.is_some() => {
                    if let Some((_, body)) = code.as_mut() {
                        body.push_str(&t);
                    }
                }
                Event::SoftBreak => events.push(Event::HardBreak),
                other => events.push(other),
            }
        }

        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }

    fn code_block_html(&self, lang: Option<&str>, code: &str) -> String {
        let Some(theme) = syntect_theme(self.theme) else {
            return plain_code_block(code);
        };
        let syntax = find_syntax(lang);
        match highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme) {
            Ok(highlighted) => format!(
                "<div class=\"code-block\" data-lang=\"{}\">{}</div>\n",
                escape(lang.unwrap_or("text")),
                highlighted
            ),
            Err(e) => {
                tracing::warn!("code highlighting failed: {}", e);
                plain_code_block(code)
            }
        }
    }
}

/// Convenience for one-off renders.
pub fn render_html(text: &str, theme: Theme) -> String {
    MarkdownRenderer::new(theme).render(text)
}

/// Coloured spans per line, for drawing code natively instead of as HTML.
pub fn highlight_code_lines(code: &str, lang: Option<&str>, theme: Theme) -> Vec<HighlightedLine> {
    let default_color = if theme.is_dark() { 0xc0c5ce } else { 0x323232 };
    let plain = |line: &str| HighlightedLine {
        spans: vec![HighlightedSpan {
            text: line.trim_end_matches('\n').to_string(),
            color: default_color,
        }],
    };

    let Some(syn_theme) = syntect_theme(theme) else {
        return LinesWithEndings::from(code).map(plain).collect();
    };
    let mut highlighter = HighlightLines::new(find_syntax(lang), syn_theme);

    LinesWithEndings::from(code)
        .map(|line| match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => HighlightedLine {
                spans: ranges
                    .into_iter()
                    .map(|(style, text)| (style, text.trim_end_matches('\n')))
                    .filter(|(_, text)| !text.is_empty())
                    .map(|(style, text)| HighlightedSpan {
                        text: text.to_string(),
                        color: hex_color(style.foreground),
                    })
                    .collect(),
            },
            Err(_) => plain(line),
        })
        .collect()
}

fn syntect_theme(theme: Theme) -> Option<&'static highlighting::Theme> {
    let name = match theme {
        Theme::Light => "InspiredGitHub",
        Theme::Dark => "base16-ocean.dark",
    };
    THEME_SET
        .themes
        .get(name)
        .or_else(|| THEME_SET.themes.values().next())
}

/// The default syntax set has no TypeScript, so it borrows JavaScript.
fn find_syntax(lang: Option<&str>) -> &'static SyntaxReference {
    let token = lang.map(str::to_lowercase);
    let token = match token.as_deref() {
        Some("typescript" | "ts" | "tsx" | "jsx") => Some("js"),
        Some("shell" | "sh" | "zsh" | "console") => Some("bash"),
        Some("rust") => Some("rs"),
        Some("python") => Some("py"),
        other => other,
    };
    token
        .and_then(|t| SYNTAX_SET.find_syntax_by_token(t))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

fn hex_color(c: highlighting::Color) -> u32 {
    ((c.r as u32) << 16) | ((c.g as u32) << 8) | (c.b as u32)
}

fn plain_code_block(code: &str) -> String {
    format!("<pre><code>{}</code></pre>\n", escape(code))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    html::push_html(&mut out, std::iter::once(Event::Text(CowStr::Borrowed(text))));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_is_rendered() {
        let html = render_html("Hello **world**", Theme::Light);
        assert_eq!(html, "<p>Hello <strong>world</strong></p>\n");
    }

    #[test]
    fn test_single_newline_is_hard_break() {
        let html = render_html("line one\nline two", Theme::Light);
        assert!(html.contains("line one<br />"), "got {html}");
        assert!(html.contains("line two"));
    }

    #[test]
    fn test_tables_and_strikethrough() {
        let html = render_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~", Theme::Light);
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_fenced_code_is_highlighted() {
        let html = render_html("```rust\nfn main() {}\n```", Theme::Dark);
        assert!(html.contains("data-lang=\"rust\""));
        assert!(html.contains("<pre style="));
        assert!(html.contains("main"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_unknown_language_still_renders_escaped() {
        let html = render_html("```nosuchlang\n<b>&</b>\n```", Theme::Light);
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>&</b>"));
    }

    #[test]
    fn test_malformed_input_does_not_abort() {
        for input in ["```py\nunterminated", "**open", "[link](", "<div>", "| a |\n|-"] {
            let html = render_html(input, Theme::Light);
            assert!(!html.is_empty(), "no output for {input:?}");
        }
    }

    #[test]
    fn test_highlight_lines_keeps_line_structure() {
        let lines = highlight_code_lines("let a = 1;\nlet b = 2;\n", Some("rust"), Theme::Dark);
        assert_eq!(lines.len(), 2);
        let first: String = lines[0].spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(first, "let a = 1;");
    }

    #[test]
    fn test_escape_helper() {
        assert_eq!(escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }
}
