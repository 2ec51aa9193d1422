use crate::ui::commands::{parse_slash_command, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// A message to send
    Submitted(String),
    /// A new name for the conversation being renamed
    Renamed { conversation_id: String, name: String },
    Command(ParsedCommand),
    /// Rename mode was abandoned
    Cancelled,
    None,
}

/// What Enter does with the current text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerMode {
    Message,
    Rename { conversation_id: String },
}

/// Single-line input at the bottom of the screen.
///
/// `cursor` counts characters, not bytes.
#[derive(Debug, Clone)]
pub struct Composer {
    content: String,
    cursor: usize,
    mode: ComposerMode,
    has_focus: bool,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            mode: ComposerMode::Message,
            has_focus: true,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn mode(&self) -> &ComposerMode {
        &self.mode
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    /// Switch to rename mode with the current name pre-filled
    pub fn start_rename(&mut self, conversation_id: String, current_name: &str) {
        self.mode = ComposerMode::Rename { conversation_id };
        self.set_content(current_name);
    }

    /// Leave rename mode, dropping the pre-filled name. Returns false when
    /// the composer was not renaming.
    pub fn cancel_rename(&mut self) -> bool {
        if self.mode == ComposerMode::Message {
            return false;
        }
        self.mode = ComposerMode::Message;
        self.clear();
        true
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    fn set_content(&mut self, content: &str) {
        self.content = content.to_string();
        self.cursor = self.content.chars().count();
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.content
            .char_indices()
            .nth(cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.content.len())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => return self.submit(),
            KeyCode::Esc => {
                if self.cancel_rename() {
                    return ComposerResult::Cancelled;
                }
                self.clear();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let index = self.byte_index(self.cursor);
                self.content.insert(index, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let index = self.byte_index(self.cursor);
                    self.content.remove(index);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let index = self.byte_index(self.cursor);
                    self.content.remove(index);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.cursor < self.char_count() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_count();
            }
            _ => {}
        }

        ComposerResult::None
    }

    fn submit(&mut self) -> ComposerResult {
        if self.content.trim().is_empty() {
            return ComposerResult::None;
        }

        let content = std::mem::take(&mut self.content);
        self.cursor = 0;

        match std::mem::replace(&mut self.mode, ComposerMode::Message) {
            ComposerMode::Rename { conversation_id } => ComposerResult::Renamed {
                conversation_id,
                name: content.trim().to_string(),
            },
            ComposerMode::Message => match parse_slash_command(&content) {
                Some(command) => ComposerResult::Command(command),
                None => ComposerResult::Submitted(content),
            },
        }
    }

    fn title(&self) -> &'static str {
        match self.mode {
            ComposerMode::Message => "✏️  Ask a question (Enter to send, /help for commands)",
            ComposerMode::Rename { .. } => "✏️  Rename conversation (Enter to save, Esc to cancel)",
        }
    }
}

impl Widget for &Composer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .style(if self.has_focus {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if inner_area.height == 0 {
            return;
        }

        if self.content.is_empty() {
            let placeholder = match self.mode {
                ComposerMode::Message => "Type your question...",
                ComposerMode::Rename { .. } => "New name...",
            };
            let line = Line::from(vec![
                Span::raw(if self.has_focus { "▌" } else { "" }),
                Span::styled(placeholder, Style::default().fg(Color::DarkGray)),
            ]);
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
            return;
        }

        // Keep the cursor in view on long input
        let width = inner_area.width.saturating_sub(1) as usize;
        let skip = self.cursor.saturating_sub(width);
        let mut text: String = self.content.chars().skip(skip).collect();
        if self.has_focus {
            let at = text
                .char_indices()
                .nth(self.cursor - skip)
                .map(|(index, _)| index)
                .unwrap_or(text.len());
            text.insert(at, '▌');
        }

        let line = Line::from(vec![Span::styled(text, Style::default().fg(Color::White))]);
        buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
    }
}
