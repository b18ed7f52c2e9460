//! Editor content widget
//!
//! Renders one pane's active tab: the rendered preview, the editing
//! buffer with a visible cursor, the loading placeholder, or the
//! empty-pane welcome state.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::tui::theme::Theme;
use crate::workspace::{ContentState, EditorPane, TabMode};

/// Welcome text shown in the empty-pane idle state
const WELCOME: &[&str] = &[
    "",
    "  Welcome to Notedesk",
    "",
    "  Enter  open the selected file",
    "  n      new file        s  split pane",
    "  t      new terminal    X  close this pane",
    "  ?      all keybindings",
];

/// Editor content widget for one pane
pub struct EditorView<'a> {
    pane: &'a EditorPane,
    /// Pre-rendered preview of the active tab, when in Preview mode
    preview: Option<&'a Text<'static>>,
    theme: &'a Theme,
    /// Cursor byte offset when the active tab is in Editing mode
    edit_cursor: usize,
}

impl<'a> EditorView<'a> {
    /// Create an editor view
    pub fn new(pane: &'a EditorPane, theme: &'a Theme) -> Self {
        Self {
            pane,
            preview: None,
            theme,
            edit_cursor: 0,
        }
    }

    /// Supply the rendered preview for the active tab
    pub fn preview(mut self, text: &'a Text<'static>) -> Self {
        self.preview = Some(text);
        self
    }

    /// Supply the editing cursor position
    pub fn edit_cursor(mut self, cursor: usize) -> Self {
        self.edit_cursor = cursor;
        self
    }

    fn render_welcome(&self, area: Rect, buf: &mut Buffer) {
        let lines: Vec<Line> = WELCOME
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let style = if i == 1 {
                    Style::default()
                        .fg(self.theme.text_accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.text_secondary)
                };
                Line::from(Span::styled(*l, style))
            })
            .collect();
        Paragraph::new(lines).render(area, buf);
    }

    fn render_loading(&self, name: &str, area: Rect, buf: &mut Buffer) {
        let line = Line::from(Span::styled(
            format!("  Loading {name} …"),
            Style::default().fg(self.theme.text_secondary),
        ));
        Paragraph::new(vec![Line::default(), line]).render(area, buf);
    }

    fn render_editing(&self, draft: &str, area: Rect, buf: &mut Buffer) {
        let mut cursor = self.edit_cursor.min(draft.len());
        while !draft.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let (cursor_row, cursor_col) = cursor_position(draft, cursor);

        let mut lines: Vec<Line> = Vec::new();
        for (row, raw) in split_keepempty(draft).into_iter().enumerate() {
            if row == cursor_row {
                lines.push(line_with_cursor(raw, cursor_col));
            } else {
                lines.push(Line::from(raw.to_string()));
            }
        }
        if lines.is_empty() {
            lines.push(line_with_cursor("", 0));
        }

        // Keep the cursor row visible
        let height = area.height.max(1) as usize;
        let scroll = cursor_row.saturating_sub(height.saturating_sub(1)) as u16;

        Paragraph::new(lines).scroll((scroll, 0)).render(area, buf);
    }
}

impl<'a> Widget for EditorView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(tab) = self.pane.active_tab() else {
            self.render_welcome(area, buf);
            return;
        };

        if tab.content_state == ContentState::Pending {
            self.render_loading(&tab.name, area, buf);
            return;
        }

        match &tab.mode {
            TabMode::Editing { draft, .. } => self.render_editing(draft, area, buf),
            TabMode::Preview => {
                let paragraph = match self.preview {
                    Some(text) => Paragraph::new(text.clone()),
                    None => Paragraph::new(tab.content_cache.clone()),
                };
                paragraph
                    .wrap(Wrap { trim: false })
                    .scroll((tab.scroll_offset, 0))
                    .render(area, buf);
            }
        }
    }
}

/// Split text into lines, keeping a trailing empty line when the text ends
/// with a newline (so the cursor can sit there).
fn split_keepempty(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.is_empty() {
        lines.push("");
    }
    lines
}

/// Byte offset to (row, column-in-chars)
fn cursor_position(text: &str, cursor: usize) -> (usize, usize) {
    let before = &text[..cursor];
    let row = before.matches('\n').count();
    let col = before
        .rsplit_once('\n')
        .map(|(_, tail)| tail.chars().count())
        .unwrap_or_else(|| before.chars().count());
    (row, col)
}

fn line_with_cursor(raw: &str, cursor_col: usize) -> Line<'static> {
    let chars: Vec<char> = raw.chars().collect();
    let before: String = chars.iter().take(cursor_col).collect();
    let at: String = chars.get(cursor_col).map(|c| c.to_string()).unwrap_or_else(|| " ".to_string());
    let after: String = chars.iter().skip(cursor_col + 1).collect();

    Line::from(vec![
        Span::raw(before),
        Span::styled(at, Style::default().add_modifier(Modifier::REVERSED)),
        Span::raw(after),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_position() {
        assert_eq!(cursor_position("abc", 0), (0, 0));
        assert_eq!(cursor_position("abc", 2), (0, 2));
        assert_eq!(cursor_position("ab\ncd", 3), (1, 0));
        assert_eq!(cursor_position("ab\ncd", 5), (1, 2));
    }

    #[test]
    fn test_split_keepempty() {
        assert_eq!(split_keepempty(""), vec![""]);
        assert_eq!(split_keepempty("a\nb"), vec!["a", "b"]);
        // Trailing newline leaves a line for the cursor
        assert_eq!(split_keepempty("a\n"), vec!["a", ""]);
    }

    #[test]
    fn test_line_with_cursor_at_end() {
        let line = line_with_cursor("ab", 2);
        // before, cursor block (a space), after
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content.as_ref(), " ");
    }
}
