//! Sidebar file tree widget
//!
//! Displays the current vault directory listing, directories first.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, List, ListItem, ListState, StatefulWidget},
};

use crate::tui::theme::Theme;
use crate::vault::FileEntry;

/// File tree widget for the sidebar
pub struct FileTree<'a> {
    /// Entries to display
    entries: &'a [FileEntry],
    /// Theme for styling
    theme: &'a Theme,
    /// Block for borders and title
    block: Option<Block<'a>>,
}

impl<'a> FileTree<'a> {
    /// Create a new file tree
    pub fn new(entries: &'a [FileEntry], theme: &'a Theme) -> Self {
        Self {
            entries,
            theme,
            block: None,
        }
    }

    /// Set the block
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn to_list_items(&self) -> Vec<ListItem<'a>> {
        self.entries
            .iter()
            .map(|entry| {
                let (icon, style) = if entry.is_dir {
                    (
                        "📁 ",
                        Style::default()
                            .fg(self.theme.text_directory)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    ("📄 ", Style::default().fg(self.theme.text_primary))
                };

                let line = Line::from(vec![
                    Span::raw(icon),
                    Span::styled(entry.name.clone(), style),
                ]);
                ListItem::new(line)
            })
            .collect()
    }
}

impl<'a> StatefulWidget for FileTree<'a> {
    type State = ListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let highlight = self.theme.selection().add_modifier(Modifier::BOLD);
        let items = self.to_list_items();

        let list = List::new(items).highlight_style(highlight);
        let list = if let Some(block) = self.block {
            list.block(block)
        } else {
            list
        };

        StatefulWidget::render(list, area, buf, state);
    }
}

/// File tree selection state
#[derive(Debug, Default)]
pub struct FileTreeState {
    /// Inner list state
    pub list_state: ListState,
    /// Total number of items
    pub item_count: usize,
}

impl FileTreeState {
    /// Create a new state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the selected index
    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    /// Select an item
    pub fn select(&mut self, index: Option<usize>) {
        self.list_state.select(index);
    }

    /// Select the next item
    pub fn next(&mut self) {
        if self.item_count == 0 {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= self.item_count - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };

        self.list_state.select(Some(i));
    }

    /// Select the previous item
    pub fn previous(&mut self) {
        if self.item_count == 0 {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.item_count - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };

        self.list_state.select(Some(i));
    }

    /// Update item count and ensure selection is valid
    pub fn set_item_count(&mut self, count: usize) {
        self.item_count = count;

        if let Some(selected) = self.list_state.selected() {
            if selected >= count && count > 0 {
                self.list_state.select(Some(count - 1));
            } else if count == 0 {
                self.list_state.select(None);
            }
        }
    }
}
