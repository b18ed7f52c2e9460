//! Tab strip widget for one editor pane
//!
//! Renders the pane's tabs in order and exposes the same layout
//! computation used for mouse hit-testing, so clicks and drops land on the
//! tab the user sees.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::tui::theme::Theme;
use crate::workspace::{EditorPane, Tab, TabId};

/// Maximum rendered width of a tab label, in characters
const MAX_LABEL_CHARS: usize = 20;

fn truncated_name(tab: &Tab) -> String {
    let mut name: String = tab.name.chars().take(MAX_LABEL_CHARS).collect();
    if tab.name.chars().count() > MAX_LABEL_CHARS {
        name.push('…');
    }
    name
}

/// The rendered label of one tab
pub fn tab_label(tab: &Tab) -> String {
    if tab.is_dirty() {
        format!(" ●{} ", truncated_name(tab))
    } else {
        format!(" {} ", truncated_name(tab))
    }
}

/// Column ranges of each tab within a strip of the given width.
///
/// Returns `(tab, start, end)` with `start..end` relative to the strip's
/// left edge. Used by the renderer and by mouse hit-testing.
pub fn tab_layout(pane: &EditorPane, width: u16) -> Vec<(TabId, u16, u16)> {
    let mut ranges = Vec::new();
    let mut x = 0u16;

    for tab in pane.tabs_in_order() {
        let label_width = tab_label(tab).chars().count() as u16;
        let start = x;
        let end = x.saturating_add(label_width).min(width);
        if start >= width {
            break;
        }
        ranges.push((tab.id, start, end));
        x = end;
    }

    ranges
}

/// Find the tab at a strip-relative column
pub fn tab_at(pane: &EditorPane, width: u16, column: u16) -> Option<TabId> {
    tab_layout(pane, width)
        .into_iter()
        .find(|(_, start, end)| (*start..*end).contains(&column))
        .map(|(id, _, _)| id)
}

/// Tab strip widget
pub struct TabBar<'a> {
    pane: &'a EditorPane,
    theme: &'a Theme,
    /// Tab currently being dragged, for the pickup affordance
    dragging: Option<TabId>,
    /// Tab currently hovered as a drop target
    drop_target: Option<TabId>,
}

impl<'a> TabBar<'a> {
    /// Create a tab bar for a pane
    pub fn new(pane: &'a EditorPane, theme: &'a Theme) -> Self {
        Self {
            pane,
            theme,
            dragging: None,
            drop_target: None,
        }
    }

    /// Mark the dragged tab
    pub fn dragging(mut self, tab: Option<TabId>) -> Self {
        self.dragging = tab;
        self
    }

    /// Mark the hovered drop target
    pub fn drop_target(mut self, tab: Option<TabId>) -> Self {
        self.drop_target = tab;
        self
    }
}

impl<'a> Widget for TabBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = Vec::new();

        for tab in self.pane.tabs_in_order() {
            let active = self.pane.active_id() == Some(tab.id);

            let mut style = if active {
                Style::default()
                    .bg(self.theme.tab_active_bg)
                    .fg(self.theme.tab_active_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.text_secondary)
            };

            if self.dragging == Some(tab.id) {
                style = style.fg(self.theme.tab_drag).add_modifier(Modifier::DIM);
            }
            // Drop affordance only; the reorder happens on drop
            if self.drop_target == Some(tab.id) && self.dragging != Some(tab.id) {
                style = style.add_modifier(Modifier::UNDERLINED);
            }

            if tab.is_dirty() {
                // Split the label so the dirty dot carries its own color
                spans.push(Span::styled(" ".to_string(), style));
                spans.push(Span::styled("●".to_string(), style.fg(self.theme.tab_dirty)));
                spans.push(Span::styled(format!("{} ", truncated_name(tab)), style));
            } else {
                spans.push(Span::styled(tab_label(tab), style));
            }
        }

        if spans.is_empty() {
            spans.push(Span::styled(
                " (empty) ",
                Style::default().fg(self.theme.text_secondary),
            ));
        }

        Line::from(spans).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pane_with(targets: &[&str]) -> EditorPane {
        let mut pane = EditorPane::new();
        for t in targets {
            pane.open_tab(*t, *t, 0);
        }
        pane
    }

    #[test]
    fn test_tab_label_marks_dirty() {
        let mut pane = pane_with(&["a.md"]);
        let id = pane.active_id().unwrap();

        assert_eq!(tab_label(pane.tab(id).unwrap()), " a.md ");

        let tab = pane.tab_mut(id).unwrap();
        tab.apply_loaded(Ok("x".into()));
        tab.begin_edit();
        tab.edit_draft(|d| d.push('!'));
        assert_eq!(tab_label(pane.tab(id).unwrap()), " ●a.md ");
    }

    #[test]
    fn test_tab_label_truncates_long_names() {
        let pane = pane_with(&["a-very-long-file-name-that-keeps-going.md"]);
        let tab = pane.tabs_in_order().next().unwrap();
        let label = tab_label(tab);
        assert!(label.chars().count() <= MAX_LABEL_CHARS + 3);
        assert!(label.contains('…'));
    }

    #[test]
    fn test_tab_layout_is_contiguous() {
        let pane = pane_with(&["a.md", "b.md", "c.md"]);
        let layout = tab_layout(&pane, 80);

        assert_eq!(layout.len(), 3);
        assert_eq!(layout[0].1, 0);
        for pair in layout.windows(2) {
            assert_eq!(pair[0].2, pair[1].1);
        }
    }

    #[test]
    fn test_tab_at_hit_testing() {
        let pane = pane_with(&["a.md", "b.md"]);
        let layout = tab_layout(&pane, 80);
        let order = pane.tab_order();

        assert_eq!(tab_at(&pane, 80, layout[0].1), Some(order[0]));
        assert_eq!(tab_at(&pane, 80, layout[1].1), Some(order[1]));
        assert_eq!(tab_at(&pane, 80, 79), None);
    }

    #[test]
    fn test_tab_layout_clips_to_width() {
        let pane = pane_with(&["aaaa.md", "bbbb.md", "cccc.md"]);
        let layout = tab_layout(&pane, 10);
        assert!(layout.len() < 3);
        assert!(layout.iter().all(|(_, _, end)| *end <= 10));
    }
}
