//! Native markdown rendering for the response area.
//!
//! egui has no HTML view, so the revealed markdown is parsed with the same
//! pulldown-cmark options as the HTML renderer and drawn as egui widgets.
//! Headings, lists, task lists, quotes, rules, tables and fenced code (syntax
//! highlighted, with a Copy button) are laid out as blocks; emphasis, strong,
//! strikethrough, inline code and links become styled spans.
//!
//! A fence that is still open (mid-reveal) is drawn as a code block up to
//! the end of the text.

use eframe::egui;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};
use services::markdown::{highlight_code_lines, parser_options, HighlightedLine};
use shared::Theme;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub strike: bool,
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Paragraph,
    Heading(u8),
    Quote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Flowing text. `prefix` is the list marker (with nesting indent) drawn
    /// before the first line.
    Text {
        kind: TextKind,
        prefix: String,
        lines: Vec<Vec<Span>>,
    },
    Code {
        lang: Option<String>,
        code: String,
    },
    /// Rows of cells; the first `header` rows are the table head.
    Table {
        header: usize,
        rows: Vec<Vec<Vec<Span>>>,
    },
    Rule,
}

pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(text, parser_options()) {
        builder.push(event);
    }
    builder.finish()
}

struct OpenText {
    kind: TextKind,
    prefix: String,
    lines: Vec<Vec<Span>>,
}

#[derive(Default)]
struct OpenTable {
    header: usize,
    rows: Vec<Vec<Vec<Span>>>,
    row: Vec<Vec<Span>>,
    cell: Vec<Span>,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    open: Option<OpenText>,
    heading: Option<u8>,
    quote_depth: usize,
    /// Next number for ordered lists, `None` for bullets
    lists: Vec<Option<u64>>,
    strong: usize,
    emphasis: usize,
    strike: usize,
    link: Option<String>,
    code: Option<(Option<String>, String)>,
    table: Option<OpenTable>,
}

impl BlockBuilder {
    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.code.as_mut() {
                Some((_, body)) => body.push_str(&text),
                None => self.push_text(&text, false),
            },
            Event::Code(code) => self.push_text(&code, true),
            Event::Html(html) => self.push_text(html.trim_end_matches('\n'), false),
            Event::SoftBreak | Event::HardBreak => self.line_break(),
            Event::Rule => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            Event::TaskListMarker(checked) => {
                self.push_text(if checked { "[x] " } else { "[ ] " }, false)
            }
            Event::FootnoteReference(name) => self.push_text(&format!("[{name}]"), false),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.ensure_open(),
            Tag::Heading(level, ..) => {
                self.flush();
                self.heading = Some(level as u8);
                self.ensure_open();
            }
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let indent = "    ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "•  ".to_string(),
                };
                self.open = Some(OpenText {
                    kind: self.text_kind(),
                    prefix: format!("{indent}{marker}"),
                    lines: vec![Vec::new()],
                });
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link(_, url, _) | Tag::Image(_, url, _) => self.link = Some(url.to_string()),
            Tag::CodeBlock(kind) => {
                self.flush();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::Table(_) => {
                self.flush();
                self.table = Some(OpenTable::default());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.row.clear();
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.clear();
                }
            }
            Tag::FootnoteDefinition(_) => self.flush(),
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::Item | Tag::FootnoteDefinition(_) => self.flush(),
            Tag::Heading(..) => {
                self.flush();
                self.heading = None;
            }
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            Tag::List(_) => {
                self.flush();
                self.lists.pop();
            }
            Tag::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            Tag::Strong => self.strong = self.strong.saturating_sub(1),
            Tag::Strikethrough => self.strike = self.strike.saturating_sub(1),
            Tag::Link(..) | Tag::Image(..) => self.link = None,
            Tag::CodeBlock(_) => self.close_code(),
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    // Some parser versions nest a row inside the head
                    if !table.row.is_empty() {
                        let row = std::mem::take(&mut table.row);
                        table.rows.push(row);
                    }
                    table.header = table.rows.len();
                }
            }
            Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            Tag::Table(_) => self.close_table(),
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.close_code();
        self.close_table();
        self.blocks
    }

    fn text_kind(&self) -> TextKind {
        match self.heading {
            Some(level) => TextKind::Heading(level),
            None if self.quote_depth > 0 => TextKind::Quote,
            None => TextKind::Paragraph,
        }
    }

    fn ensure_open(&mut self) {
        if self.open.is_none() {
            self.open = Some(OpenText {
                kind: self.text_kind(),
                prefix: String::new(),
                lines: vec![Vec::new()],
            });
        }
    }

    fn push_text(&mut self, text: &str, code: bool) {
        if text.is_empty() {
            return;
        }
        let span = Span {
            text: text.to_string(),
            style: SpanStyle {
                strong: self.strong > 0,
                emphasis: self.emphasis > 0,
                strike: self.strike > 0,
                code,
            },
            link: self.link.clone(),
        };
        if let Some(table) = self.table.as_mut() {
            push_merged(&mut table.cell, span);
            return;
        }
        self.ensure_open();
        if let Some(line) = self.open.as_mut().and_then(|open| open.lines.last_mut()) {
            push_merged(line, span);
        }
    }

    fn line_break(&mut self) {
        if self.table.is_some() {
            self.push_text(" ", false);
        } else if let Some(open) = self.open.as_mut() {
            open.lines.push(Vec::new());
        }
    }

    fn flush(&mut self) {
        let Some(mut open) = self.open.take() else {
            return;
        };
        while open.lines.last().is_some_and(Vec::is_empty) {
            open.lines.pop();
        }
        if !open.lines.is_empty() || !open.prefix.is_empty() {
            self.blocks.push(Block::Text {
                kind: open.kind,
                prefix: open.prefix,
                lines: open.lines,
            });
        }
    }

    fn close_code(&mut self) {
        if let Some((lang, code)) = self.code.take() {
            self.blocks.push(Block::Code {
                lang,
                code: code.trim_end_matches('\n').to_string(),
            });
        }
    }

    fn close_table(&mut self) {
        if let Some(table) = self.table.take() {
            self.blocks.push(Block::Table {
                header: table.header,
                rows: table.rows,
            });
        }
    }
}

/// Adjacent runs with the same style collapse into one span.
fn push_merged(line: &mut Vec<Span>, span: Span) {
    if let Some(last) = line.last_mut() {
        if last.style == span.style && last.link == span.link {
            last.text.push_str(&span.text);
            return;
        }
    }
    line.push(span);
}

fn rgb(color: u32) -> egui::Color32 {
    egui::Color32::from_rgb((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

struct Palette {
    text: egui::Color32,
    weak: egui::Color32,
    code_bg: egui::Color32,
    link: egui::Color32,
}

/// Draw `text` as markdown.
pub fn render_markdown(ui: &mut egui::Ui, text: &str, theme: Theme) {
    let dark = theme.is_dark();
    let palette = Palette {
        text: if dark {
            egui::Color32::from_rgb(220, 222, 228)
        } else {
            egui::Color32::from_rgb(32, 33, 36)
        },
        weak: ui.visuals().weak_text_color(),
        code_bg: if dark {
            egui::Color32::from_rgb(43, 48, 59)
        } else {
            egui::Color32::from_rgb(240, 244, 249)
        },
        link: egui::Color32::from_rgb(26, 115, 232),
    };

    for (index, block) in parse_blocks(text).iter().enumerate() {
        match block {
            Block::Text {
                kind,
                prefix,
                lines,
            } => render_text(ui, *kind, prefix, lines, &palette),
            Block::Rule => {
                ui.separator();
            }
            Block::Code { lang, code } => {
                let lines = highlight_code_lines(code, lang.as_deref(), theme);
                render_code_block(ui, index, lang.as_deref(), code, &lines, palette.code_bg);
            }
            Block::Table { header, rows } => {
                ui.add_space(4.0);
                egui::Grid::new(("md_table", index))
                    .striped(true)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        for (r, row) in rows.iter().enumerate() {
                            for cell in row {
                                ui.horizontal(|ui| {
                                    ui.spacing_mut().item_spacing.x = 0.0;
                                    for span in cell {
                                        render_span(ui, span, 14.0, palette.text, r < *header, &palette);
                                    }
                                });
                            }
                            ui.end_row();
                        }
                    });
                ui.add_space(4.0);
            }
        }
    }
}

fn render_text(ui: &mut egui::Ui, kind: TextKind, prefix: &str, lines: &[Vec<Span>], palette: &Palette) {
    let (size, color, heading) = match kind {
        TextKind::Heading(1) => (20.0, palette.text, true),
        TextKind::Heading(2) => (18.0, palette.text, true),
        TextKind::Heading(3) => (16.0, palette.text, true),
        TextKind::Heading(_) => (15.0, palette.text, true),
        TextKind::Quote => (14.0, palette.weak, false),
        TextKind::Paragraph => (14.0, palette.text, false),
    };
    let hanging = " ".repeat(prefix.chars().count());

    let draw = |ui: &mut egui::Ui| {
        for (i, line) in lines.iter().enumerate() {
            ui.horizontal_wrapped(|ui| {
                ui.spacing_mut().item_spacing.x = 0.0;
                let lead = if i == 0 { prefix } else { hanging.as_str() };
                if !lead.is_empty() {
                    ui.label(egui::RichText::new(lead).size(size).color(color));
                }
                for span in line {
                    render_span(ui, span, size, color, heading, palette);
                }
            });
        }
    };

    if heading {
        ui.add_space(4.0);
    }
    if kind == TextKind::Quote {
        egui::Frame::none()
            .stroke(egui::Stroke::new(1.0, palette.weak))
            .inner_margin(egui::Margin::symmetric(8.0, 2.0))
            .show(ui, draw);
    } else {
        draw(ui);
    }
}

fn render_span(
    ui: &mut egui::Ui,
    span: &Span,
    size: f32,
    color: egui::Color32,
    strong: bool,
    palette: &Palette,
) {
    let mut rich = egui::RichText::new(span.text.as_str()).size(size).color(color);
    if span.style.strong || strong {
        rich = rich.strong();
    }
    if span.style.emphasis {
        rich = rich.italics();
    }
    if span.style.strike {
        rich = rich.strikethrough();
    }
    if span.style.code {
        rich = rich.monospace().background_color(palette.code_bg);
    }
    match &span.link {
        Some(url) => {
            ui.add(egui::Hyperlink::from_label_and_url(
                rich.color(palette.link).underline(),
                url,
            ))
            .on_hover_text(url.as_str());
        }
        None => {
            ui.label(rich);
        }
    }
}

fn render_code_block(
    ui: &mut egui::Ui,
    index: usize,
    lang: Option<&str>,
    code: &str,
    lines: &[HighlightedLine],
    fill: egui::Color32,
) {
    let font = egui::FontId::monospace(13.0);
    let mut job = egui::text::LayoutJob::default();
    for (i, line) in lines.iter().enumerate() {
        for span in &line.spans {
            job.append(
                &span.text,
                0.0,
                egui::TextFormat::simple(font.clone(), rgb(span.color)),
            );
        }
        if i + 1 < lines.len() {
            job.append("\n", 0.0, egui::TextFormat::simple(font.clone(), egui::Color32::GRAY));
        }
    }

    ui.add_space(4.0);
    egui::Frame::none()
        .fill(fill)
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(egui::Margin::same(10.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(lang.unwrap_or("code"))
                        .small()
                        .color(ui.visuals().weak_text_color()),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("Copy").clicked() {
                        ui.output_mut(|o| o.copied_text = code.to_string());
                    }
                });
            });
            egui::ScrollArea::horizontal()
                .id_source(("code_block", index))
                .show(ui, |ui| {
                    ui.label(job);
                });
        });
    ui.add_space(4.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &[Span]) -> Vec<&str> {
        line.iter().map(|s| s.text.as_str()).collect()
    }

    fn text_block(block: &Block) -> (TextKind, &str, &[Vec<Span>]) {
        match block {
            Block::Text {
                kind,
                prefix,
                lines,
            } => (*kind, prefix.as_str(), lines.as_slice()),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_inline_styles() {
        let blocks = parse_blocks("Some **bold**, *italic* and ~~gone~~ `x`");
        assert_eq!(blocks.len(), 1);
        let (kind, prefix, lines) = text_block(&blocks[0]);
        assert_eq!(kind, TextKind::Paragraph);
        assert_eq!(prefix, "");
        let line = &lines[0];
        assert_eq!(
            texts(line),
            ["Some ", "bold", ", ", "italic", " and ", "gone", " ", "x"]
        );
        assert!(line[1].style.strong);
        assert!(line[3].style.emphasis);
        assert!(line[5].style.strike);
        assert!(line[7].style.code);
        assert_eq!(line[0].style, SpanStyle::default());
    }

    #[test]
    fn test_headings_quotes_and_rules() {
        let blocks = parse_blocks("## Title\n\n> quoted\n\n---\n\n#hashtag");
        assert_eq!(blocks.len(), 4);
        assert_eq!(text_block(&blocks[0]).0, TextKind::Heading(2));
        assert_eq!(texts(&text_block(&blocks[0]).2[0]), ["Title"]);
        assert_eq!(text_block(&blocks[1]).0, TextKind::Quote);
        assert_eq!(blocks[2], Block::Rule);
        let (kind, _, lines) = text_block(&blocks[3]);
        assert_eq!(kind, TextKind::Paragraph);
        assert_eq!(texts(&lines[0]), ["#hashtag"]);
    }

    #[test]
    fn test_list_markers_and_nesting() {
        let blocks = parse_blocks("1. one\n2. two\n   - inner\n\n- [x] done\n- [ ] todo");
        let prefixes: Vec<&str> = blocks.iter().map(|b| text_block(b).1).collect();
        assert_eq!(prefixes, ["1. ", "2. ", "    •  ", "•  ", "•  "]);
        assert_eq!(texts(&text_block(&blocks[2]).2[0]), ["inner"]);
        assert_eq!(texts(&text_block(&blocks[3]).2[0]), ["[x] done"]);
        assert_eq!(texts(&text_block(&blocks[4]).2[0]), ["[ ] todo"]);
    }

    #[test]
    fn test_single_newlines_start_new_lines() {
        let blocks = parse_blocks("line one\nline two");
        let (_, _, lines) = text_block(&blocks[0]);
        assert_eq!(lines.len(), 2);
        assert_eq!(texts(&lines[1]), ["line two"]);
    }

    #[test]
    fn test_links_keep_url() {
        let blocks = parse_blocks("see [docs](https://a.b) now");
        let line = &text_block(&blocks[0]).2[0];
        assert_eq!(texts(line), ["see ", "docs", " now"]);
        assert_eq!(line[1].link.as_deref(), Some("https://a.b"));
        assert_eq!(line[0].link, None);
    }

    #[test]
    fn test_table_rows_and_header() {
        let blocks = parse_blocks("| a | b |\n|---|---|\n| 1 | **2** |");
        let Block::Table { header, rows } = &blocks[0] else {
            panic!("expected table, got {:?}", blocks[0]);
        };
        assert_eq!(*header, 1);
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.iter().map(|s| s.text.as_str()).collect::<String>().trim().to_string())
                    .collect()
            })
            .collect();
        assert_eq!(cells, vec![vec!["a", "b"], vec!["1", "2"]]);
        assert!(rows[1][1].iter().any(|s| s.style.strong));
    }

    #[test]
    fn test_fenced_code_collected() {
        let blocks = parse_blocks("Intro\n\n```rust\nfn main() {\n    run();\n}\n```\nAfter");
        assert_eq!(
            blocks[1],
            Block::Code {
                lang: Some("rust".into()),
                code: "fn main() {\n    run();\n}".into()
            }
        );
        assert_eq!(texts(&text_block(&blocks[2]).2[0]), ["After"]);
    }

    #[test]
    fn test_open_fence_runs_to_end() {
        let blocks = parse_blocks("```py\nprint(1)\nprint(");
        assert_eq!(
            blocks,
            vec![Block::Code {
                lang: Some("py".into()),
                code: "print(1)\nprint(".into()
            }]
        );
    }
}
