//! Markdown rendering boundary
//!
//! Thin pass-through from document content to ratatui `Text` via
//! pulldown-cmark. Cross-reference tokens are rewritten into links with a
//! `wiki:` destination before parsing so they survive as styled, followable
//! spans; local image references render as dim placeholders.

use std::borrow::Cow;
use std::collections::HashMap;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use xxhash_rust::xxh3::xxh3_64;

use crate::links::parse_links;
use crate::workspace::TabId;

/// Link destination scheme used for rewritten cross-reference tokens
pub const WIKI_SCHEME: &str = "wiki:";

/// Whether a file renders as markdown (by name)
pub fn is_markdown(name: &str) -> bool {
    name.to_lowercase().ends_with(".md")
}

/// Render a document for preview: markdown for `.md` files, plain
/// monospace text for everything else.
pub fn render_document(name: &str, content: &str) -> Text<'static> {
    if is_markdown(name) {
        render_markdown(content)
    } else {
        render_plain(content)
    }
}

/// Render plain text
pub fn render_plain(content: &str) -> Text<'static> {
    Text::from(
        content
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect::<Vec<_>>(),
    )
}

/// Rewrite `[[Token]]` into `[Token](<wiki:Token>)` so the markdown parser
/// carries cross-references through as links. The pointy destination form
/// keeps tokens with spaces valid.
fn rewrite_wiki_links(content: &str) -> Cow<'_, str> {
    let links = parse_links(content);
    if links.is_empty() {
        return Cow::Borrowed(content);
    }

    let mut out = String::with_capacity(content.len() + links.len() * 10);
    let mut last = 0;
    for link in &links {
        out.push_str(&content[last..link.start]);
        out.push_str(&format!("[{}](<{}{}>)", link.token, WIKI_SCHEME, link.token));
        last = link.end;
    }
    out.push_str(&content[last..]);
    Cow::Owned(out)
}

/// Render markdown content
pub fn render_markdown(content: &str) -> Text<'static> {
    let rewritten = rewrite_wiki_links(content);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::default();
    for event in Parser::new_ext(&rewritten, options) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    bold: usize,
    emphasis: usize,
    strikethrough: usize,
    heading: Option<HeadingLevel>,
    code_block: bool,
    quote_depth: usize,
    link_dest: Option<String>,
    in_image: bool,
    list_stack: Vec<Option<u64>>,
}

impl Renderer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.current.push(Span::styled(
                code.to_string(),
                Style::default().fg(Color::Yellow),
            )),
            Event::SoftBreak | Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(40),
                    Style::default().fg(Color::DarkGray),
                )));
                self.blank();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.current.push(Span::styled(
                    marker.to_string(),
                    Style::default().fg(Color::Green),
                ));
            }
            Event::Html(html) | Event::InlineHtml(html) => self.current.push(Span::styled(
                html.to_string(),
                Style::default().fg(Color::DarkGray),
            )),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                self.heading = Some(level);
                let marker = "#".repeat(heading_rank(level));
                self.current.push(Span::styled(
                    format!("{marker} "),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.code_block = true;
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::List(start) => self.list_stack.push(start),
            Tag::Item => {
                self.flush();
                let depth = self.list_stack.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.current
                    .push(Span::styled(marker, Style::default().fg(Color::Cyan)));
            }
            Tag::Strong => self.bold += 1,
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strikethrough => self.strikethrough += 1,
            Tag::Link { dest_url, .. } => self.link_dest = Some(dest_url.to_string()),
            Tag::Image { dest_url, .. } => {
                // Local images cannot be drawn in a character grid; they
                // render as a dim placeholder naming the source.
                self.in_image = true;
                self.current.push(Span::styled(
                    format!("[image: {dest_url}]"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::DIM),
                ));
            }
            _ => {}
        }
    }

    fn end(&mut self, end: TagEnd) {
        match end {
            TagEnd::Heading(_) => {
                self.flush();
                self.heading = None;
                self.blank();
            }
            TagEnd::Paragraph => {
                self.flush();
                self.blank();
            }
            TagEnd::CodeBlock => {
                self.code_block = false;
                self.blank();
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            TagEnd::Link => {
                if let Some(dest) = self.link_dest.take() {
                    if !dest.starts_with(WIKI_SCHEME) {
                        self.current.push(Span::styled(
                            format!(" ({dest})"),
                            Style::default()
                                .fg(Color::DarkGray)
                                .add_modifier(Modifier::DIM),
                        ));
                    }
                }
            }
            TagEnd::Image => self.in_image = false,
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_image {
            // Alt text already replaced by the placeholder
            return;
        }

        if self.code_block {
            for line in text.lines() {
                self.lines.push(Line::from(Span::styled(
                    format!("  {line}"),
                    Style::default().fg(Color::Yellow),
                )));
            }
            return;
        }

        self.current
            .push(Span::styled(text.to_string(), self.inline_style()));
    }

    fn inline_style(&self) -> Style {
        let mut style = match self.heading {
            Some(HeadingLevel::H1) => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Some(HeadingLevel::H2) => Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            Some(_) => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            None => Style::default(),
        };

        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.emphasis > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strikethrough > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if let Some(dest) = &self.link_dest {
            style = if dest.starts_with(WIKI_SCHEME) {
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::UNDERLINED)
            } else {
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::UNDERLINED)
            };
        }
        style
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let mut spans = Vec::new();
            if self.quote_depth > 0 {
                spans.push(Span::styled(
                    "▌ ".repeat(self.quote_depth),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            spans.append(&mut self.current);
            self.lines.push(Line::from(spans));
        }
    }

    fn blank(&mut self) {
        if !matches!(self.lines.last(), Some(line) if line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Text<'static> {
        self.flush();
        while matches!(self.lines.last(), Some(line) if line.spans.is_empty()) {
            self.lines.pop();
        }
        Text::from(self.lines)
    }
}

fn heading_rank(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Rendered-preview cache keyed by tab and content hash, so unchanged
/// buffers are not re-rendered every frame.
#[derive(Default)]
pub struct RenderCache {
    entries: HashMap<TabId, (u64, Text<'static>)>,
}

impl RenderCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the rendered preview for a tab, re-rendering only when the
    /// content changed.
    pub fn get_or_render(&mut self, tab: TabId, name: &str, content: &str) -> &Text<'static> {
        let hash = xxh3_64(content.as_bytes());
        let stale = match self.entries.get(&tab) {
            Some((cached, _)) => *cached != hash,
            None => true,
        };
        if stale {
            self.entries.insert(tab, (hash, render_document(name, content)));
        }
        &self.entries.get(&tab).expect("inserted above").1
    }

    /// Drop the cached render for a closed tab
    pub fn forget(&mut self, tab: TabId) {
        self.entries.remove(&tab);
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
