use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// Per-conversation actions offered by the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Rename,
    Delete,
}

impl MenuAction {
    const ALL: [MenuAction; 2] = [MenuAction::Rename, MenuAction::Delete];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Rename => "Rename",
            MenuAction::Delete => "Delete",
        }
    }
}

/// What a key press did to the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuResult {
    Chosen {
        conversation_id: String,
        action: MenuAction,
    },
    Closed,
    None,
}

/// Popup opened from a sidebar row
#[derive(Debug, Clone)]
pub struct ChatMenu {
    conversation_id: String,
    selected: usize,
}

impl ChatMenu {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            selected: 0,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> MenuResult {
        if key.kind != KeyEventKind::Press {
            return MenuResult::None;
        }

        let len = MenuAction::ALL.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = (self.selected + len - 1) % len;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1) % len;
            }
            KeyCode::Enter => {
                return MenuResult::Chosen {
                    conversation_id: self.conversation_id.clone(),
                    action: MenuAction::ALL[self.selected],
                };
            }
            KeyCode::Char('r') => {
                return MenuResult::Chosen {
                    conversation_id: self.conversation_id.clone(),
                    action: MenuAction::Rename,
                };
            }
            KeyCode::Char('d') => {
                return MenuResult::Chosen {
                    conversation_id: self.conversation_id.clone(),
                    action: MenuAction::Delete,
                };
            }
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('m') => return MenuResult::Closed,
            _ => {}
        }
        MenuResult::None
    }

    /// Popup area anchored at a sidebar row
    pub fn area(anchor: Rect, row: u16, bounds: Rect) -> Rect {
        let width = 14.min(bounds.width);
        let height = (MenuAction::ALL.len() as u16 + 2).min(bounds.height);
        let x = (anchor.x + anchor.width.saturating_sub(2)).min(bounds.right().saturating_sub(width));
        let y = row.min(bounds.bottom().saturating_sub(height));
        Rect::new(x, y, width, height)
    }
}

impl Widget for &ChatMenu {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Blue));
        let inner = block.inner(area);
        block.render(area, buf);

        for (index, action) in MenuAction::ALL.iter().enumerate() {
            if index >= inner.height as usize {
                break;
            }
            let style = if index == self.selected {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let line = Line::from(vec![Span::styled(action.label(), style)]);
            buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn selection_wraps_and_chooses() {
        let mut menu = ChatMenu::new("chat_1");
        menu.handle_key(key(KeyCode::Up));
        assert_eq!(
            menu.handle_key(key(KeyCode::Enter)),
            MenuResult::Chosen {
                conversation_id: "chat_1".to_string(),
                action: MenuAction::Delete
            }
        );
    }

    #[test]
    fn shortcuts_and_escape() {
        let mut menu = ChatMenu::new("chat_1");
        assert!(matches!(
            menu.handle_key(key(KeyCode::Char('r'))),
            MenuResult::Chosen { action: MenuAction::Rename, .. }
        ));
        assert_eq!(menu.handle_key(key(KeyCode::Esc)), MenuResult::Closed);
    }

    #[test]
    fn area_stays_inside_bounds() {
        let bounds = Rect::new(0, 0, 40, 10);
        let area = ChatMenu::area(Rect::new(0, 0, 30, 10), 9, bounds);
        assert!(area.right() <= bounds.right());
        assert!(area.bottom() <= bounds.bottom());
    }
}
