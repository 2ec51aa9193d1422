//! Message pane for the active conversation

use crate::conversation::{Conversation, Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Text shown while an answer is awaited
pub const THINKING_TEXT: &str = "Thinking...";

/// Rebuilt from the active conversation on every frame. Shows the newest
/// lines when the transcript is taller than the pane, unless scrolled back.
pub struct MessageView<'a> {
    pub conversation: Option<&'a Conversation>,
    /// Draw the placeholder after the last message
    pub thinking: bool,
    /// Lines scrolled back from the bottom, clamped to the transcript
    pub scroll: usize,
}

impl MessageView<'_> {
    /// Furthest the transcript can be scrolled back inside `area`
    pub fn max_scroll(&self, area: Rect) -> usize {
        let inner_area = Block::default().borders(Borders::ALL).inner(area);
        self.lines(inner_area.width.saturating_sub(2) as usize)
            .len()
            .saturating_sub(inner_area.height as usize)
    }

    fn lines(&self, width: usize) -> Vec<Line<'static>> {
        let Some(chat) = self.conversation else {
            return Vec::new();
        };

        let mut all_lines = Vec::new();
        for message in &chat.messages {
            all_lines.extend(render_message(message, width));
            // spacing between messages
            all_lines.push(Line::from(""));
        }

        if self.thinking {
            all_lines.push(header_line(Role::Bot));
            all_lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(THINKING_TEXT, Style::default().fg(Color::Yellow)),
            ]));
        }
        all_lines
    }
}

impl Widget for MessageView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.conversation {
            Some(chat) => format!("🤖 {}", chat.name),
            None => "🤖 No chat selected".to_string(),
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width.saturating_sub(2) as usize);

        let height = inner_area.height as usize;
        let bottom = all_lines.len().saturating_sub(height);
        let start = bottom.saturating_sub(self.scroll);

        for (i, line) in all_lines[start..].iter().take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn header_line(role: Role) -> Line<'static> {
    let icon = match role {
        Role::User => "👤",
        Role::Bot => "🤖",
    };
    Line::from(vec![Span::styled(
        format!("{} {}", icon, role.display_name()),
        Style::default().fg(Color::DarkGray),
    )])
}

fn content_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Cyan),
        Role::Bot => Style::default().fg(Color::Green),
    }
}

/// Render a single message into lines
fn render_message(message: &Message, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![header_line(message.role)];
    for content_line in wrap_text(&message.text, width) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, content_style(message.role)),
        ]));
    }
    lines
}

/// Wrap text to fit within the given display width, keeping explicit line
/// breaks. Words wider than a line are split across lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.width();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }

            if word_width > width {
                for c in word.chars() {
                    let char_width = c.width().unwrap_or(0);
                    if current_width > 0 && current_width + char_width > width {
                        lines.push(std::mem::take(&mut current_line));
                        current_width = 0;
                    }
                    current_line.push(c);
                    current_width += char_width;
                }
                continue;
            }

            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }
            current_line.push_str(word);
            current_width += word_width;
        }

        lines.push(current_line);
    }

    lines
}
