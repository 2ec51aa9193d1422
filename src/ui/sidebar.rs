//! Conversation list pane

use crate::conversation::ConversationSet;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Marker for the per-conversation menu
pub const MENU_MARKER: &str = "⋯";

/// Rebuilt from the conversation set on every frame
pub struct Sidebar<'a> {
    pub chats: &'a ConversationSet,
    pub active: Option<&'a str>,
    /// Row under the sidebar cursor
    pub highlighted: usize,
    pub has_focus: bool,
}

impl Sidebar<'_> {
    fn row_style(&self, index: usize, id: &str) -> Style {
        let mut style = if self.active == Some(id) {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        if self.has_focus && index == self.highlighted {
            style = style.bg(Color::DarkGray);
        }
        style
    }
}

impl Widget for Sidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Chats")
            .style(if self.has_focus {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if inner_area.height == 0 || inner_area.width == 0 {
            return;
        }

        if self.chats.is_empty() {
            let hint = Line::from(vec![Span::styled(
                "No chats yet (Ctrl+N)",
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &hint, inner_area.width);
            return;
        }

        // Scroll so the highlighted row stays visible
        let height = inner_area.height as usize;
        let start = (self.highlighted + 1).saturating_sub(height);
        let title_width = inner_area.width.saturating_sub(2) as usize;

        for (row, (index, (id, chat))) in self
            .chats
            .iter()
            .enumerate()
            .skip(start)
            .take(height)
            .enumerate()
        {
            let title: String = chat.name.chars().take(title_width).collect();
            let padding = title_width.saturating_sub(title.chars().count());
            let style = self.row_style(index, id);

            let line = Line::from(vec![
                Span::styled(title, style),
                Span::styled(" ".repeat(padding), style),
                Span::styled(format!(" {}", MENU_MARKER), Style::default().fg(Color::DarkGray)),
            ]);
            buf.set_line(inner_area.x, inner_area.y + row as u16, &line, inner_area.width);
        }
    }
}
