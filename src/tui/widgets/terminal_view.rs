//! Terminal panel widget
//!
//! Renders the session strip and the active session's retained output
//! (ANSI converted to styled text), plus the inline error state for
//! sessions whose backing process could not be created.

use ansi_to_tui::IntoText;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Widget},
};

use crate::term::{SessionState, TerminalMultiplexer};
use crate::tui::theme::Theme;

/// Terminal panel widget
pub struct TerminalView<'a> {
    mux: &'a TerminalMultiplexer,
    theme: &'a Theme,
}

impl<'a> TerminalView<'a> {
    /// Create a terminal view
    pub fn new(mux: &'a TerminalMultiplexer, theme: &'a Theme) -> Self {
        Self { mux, theme }
    }

    fn session_strip(&self) -> Line<'a> {
        let mut spans = Vec::new();

        for (index, session) in self.mux.sessions_in_order().enumerate() {
            let state = self.mux.state(session.id);
            let (icon, color) = match state {
                Some(SessionState::Active) => ("●", self.theme.session_active),
                Some(SessionState::Suspended) => ("◐", self.theme.session_suspended),
                Some(SessionState::Failed) => ("✗", self.theme.session_failed),
                Some(SessionState::Exited) | Some(SessionState::Created) | None => {
                    ("○", self.theme.session_exited)
                }
            };

            let mut style = Style::default().fg(self.theme.text_secondary);
            if state == Some(SessionState::Active) {
                style = style
                    .fg(self.theme.text_primary)
                    .add_modifier(Modifier::BOLD);
            }

            spans.push(Span::styled(format!(" {} ", index + 1), style));
            spans.push(Span::styled(icon.to_string(), Style::default().fg(color)));
            spans.push(Span::styled(format!(" {} ", session.title), style));
        }

        if spans.is_empty() {
            spans.push(Span::styled(
                " no terminal sessions — press t to create one ",
                Style::default().fg(self.theme.text_secondary),
            ));
        }

        Line::from(spans)
    }
}

impl<'a> Widget for TerminalView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        // Row 0: session strip
        let strip_area = Rect { height: 1, ..area };
        Paragraph::new(self.session_strip()).render(strip_area, buf);

        if area.height == 1 {
            return;
        }
        let output_area = Rect {
            y: area.y + 1,
            height: area.height - 1,
            ..area
        };

        let Some(active) = self.mux.active_id().and_then(|id| self.mux.session(id)) else {
            return;
        };

        // Inline error state for Created-but-not-Connected sessions
        if let Some(reason) = active.failure() {
            let lines = vec![
                Line::default(),
                Line::from(Span::styled(
                    format!("  ✗ terminal unavailable: {reason}"),
                    Style::default().fg(self.theme.session_failed),
                )),
                Line::from(Span::styled(
                    "  close this session with W, or retry with t",
                    Style::default().fg(self.theme.text_secondary),
                )),
            ];
            Paragraph::new(lines).render(output_area, buf);
            return;
        }

        // Convert ANSI escape codes to ratatui styled text
        let text: Text<'_> = active
            .buffer()
            .into_text()
            .unwrap_or_else(|_| Text::raw(active.buffer()));

        // Show the tail that fits the visible area
        let height = output_area.height as usize;
        let skip = text.lines.len().saturating_sub(height);
        let tail: Vec<Line> = text.lines.into_iter().skip(skip).collect();

        // No .wrap() - preserve the terminal's own formatting
        Paragraph::new(tail).render(output_area, buf);
    }
}

/// Translate a key event into the byte sequence a terminal expects.
///
/// Returns None for keys that are not forwarded (they stay with the TUI).
pub fn key_to_bytes(key: KeyEvent) -> Option<Vec<u8>> {
    let bytes = match key.code {
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                let upper = c.to_ascii_uppercase();
                if upper.is_ascii_uppercase() {
                    vec![(upper as u8) & 0x1f]
                } else {
                    return None;
                }
            } else {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf).as_bytes().to_vec()
            }
        }
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Esc => vec![0x1b],
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[H".to_vec(),
        KeyCode::End => b"\x1b[F".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        _ => return None,
    };
    Some(bytes)
}
