use crate::client::AnswerService;
use crate::controller::{self, SendResolution, UploadStatus};
use crate::events::{AppEvent, Focus};
use crate::state::ChatState;
use crate::ui::{
    get_help_text, ChatMenu, Composer, ComposerResult, MenuAction, MenuResult, MessageView,
    ParsedCommand, Sidebar, SlashCommand,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use std::cell::Cell;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Redraw interval while idle
const TICK: Duration = Duration::from_millis(100);

/// Width of the conversation list
const SIDEBAR_WIDTH: u16 = 30;

/// Lines moved per PageUp/PageDown
const SCROLL_STEP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// One-line status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub kind: StatusKind,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
        }
    }
}

/// The chat screen: state, widgets and the channel background work reports on
pub struct App {
    state: ChatState,
    service: Arc<dyn AnswerService>,
    top_k: u32,
    composer: Composer,
    focus: Focus,
    highlighted: usize,
    menu: Option<ChatMenu>,
    status: Status,
    /// Lines the message pane is scrolled back; clamped on every draw
    scroll_offset: Cell<usize>,
    /// Last document the service indexed this session
    indexed_file: Option<String>,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
    should_quit: bool,
}

impl App {
    pub fn new(state: ChatState, service: Arc<dyn AnswerService>, top_k: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            state,
            service,
            top_k,
            composer: Composer::new(),
            focus: Focus::Composer,
            highlighted: 0,
            menu: None,
            status: Status::info(get_help_text()),
            scroll_offset: Cell::new(0),
            indexed_file: None,
            tx,
            rx,
            should_quit: false,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn menu(&self) -> Option<&ChatMenu> {
        self.menu.as_ref()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset.get()
    }

    pub fn indexed_file(&self) -> Option<&str> {
        self.indexed_file.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Wait for the next result of background work
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Drive the terminal until the user quits
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;

            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            if self.should_quit {
                break;
            }

            let event = tokio::select! {
                event = self.rx.recv() => event,
                _ = tokio::time::sleep(TICK) => None,
            };
            if let Some(event) = event {
                self.handle_event(event);
            }
        }

        tracing::info!("Chat screen closed");
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('n') => {
                    self.new_chat();
                    return;
                }
                _ => {}
            }
        }

        if let Some(menu) = self.menu.as_mut() {
            match menu.handle_key(key) {
                MenuResult::Chosen {
                    conversation_id,
                    action,
                } => {
                    self.menu = None;
                    self.apply_menu_action(&conversation_id, action);
                }
                MenuResult::Closed => self.menu = None,
                MenuResult::None => {}
            }
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.set_focus(self.focus.toggle());
                return;
            }
            KeyCode::PageUp => {
                self.scroll_offset
                    .set(self.scroll_offset.get().saturating_add(SCROLL_STEP));
                return;
            }
            KeyCode::PageDown => {
                self.scroll_offset
                    .set(self.scroll_offset.get().saturating_sub(SCROLL_STEP));
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Sidebar => self.handle_sidebar_key(key),
            Focus::Composer => {
                let result = self.composer.handle_key(key);
                self.handle_composer_result(result);
            }
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AnswerReady { ticket, result } => {
                match controller::complete_send(&mut self.state, ticket, result) {
                    Ok(SendResolution::Answered { conversation_id }) => {
                        if self.state.active_id() == Some(conversation_id.as_str()) {
                            self.scroll_to_bottom();
                        }
                        self.status = Status::info("Answer received");
                    }
                    Ok(SendResolution::Failed { error, .. }) => {
                        self.set_error(format!("⚠️ No answer: {}", error));
                    }
                    Ok(SendResolution::Orphaned) => {}
                    Err(e) => self.set_error(format!("⚠️ Failed to save answer: {}", e)),
                }
            }
            AppEvent::UploadFinished { status } => {
                let kind = if status.is_success() {
                    StatusKind::Success
                } else {
                    StatusKind::Error
                };
                if let UploadStatus::Indexed { file } = &status {
                    self.indexed_file = Some(file.clone());
                }
                self.status = Status {
                    text: status.to_string(),
                    kind,
                };
            }
        }
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.composer.set_focus(focus == Focus::Composer);
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_offset.set(0);
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Status {
            text: text.into(),
            kind: StatusKind::Error,
        };
    }

    /// Move the sidebar cursor onto the active conversation
    fn sync_highlight(&mut self) {
        if let Some(position) = self
            .state
            .active_id()
            .and_then(|id| self.state.chats().position(id))
        {
            self.highlighted = position;
        }
        self.highlighted = self
            .highlighted
            .min(self.state.chats().len().saturating_sub(1));
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        let count = self.state.chats().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.highlighted = self.highlighted.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.highlighted + 1 < count {
                    self.highlighted += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.state.chats().id_at(self.highlighted).map(str::to_string) {
                    if let Err(e) = self.state.activate(&id) {
                        self.set_error(e.to_string());
                        return;
                    }
                    self.scroll_to_bottom();
                    self.set_focus(Focus::Composer);
                }
            }
            KeyCode::Char('m') | KeyCode::Right => {
                if let Some(id) = self.state.chats().id_at(self.highlighted) {
                    self.menu = Some(ChatMenu::new(id));
                }
            }
            KeyCode::Char('n') => self.new_chat(),
            KeyCode::Char('d') => {
                if let Some(id) = self.state.chats().id_at(self.highlighted).map(str::to_string) {
                    self.delete(&id);
                }
            }
            KeyCode::Esc => self.set_focus(Focus::Composer),
            _ => {}
        }
    }

    fn handle_composer_result(&mut self, result: ComposerResult) {
        match result {
            ComposerResult::Submitted(text) => self.send(&text),
            ComposerResult::Renamed {
                conversation_id,
                name,
            } => self.rename(&conversation_id, &name),
            ComposerResult::Command(command) => self.run_command(command),
            ComposerResult::Cancelled => self.status = Status::info("Rename cancelled"),
            ComposerResult::None => {}
        }
    }

    fn send(&mut self, text: &str) {
        let pending = match controller::begin_send(&mut self.state, text) {
            Ok(Some(pending)) => pending,
            Ok(None) => return,
            Err(e) => {
                self.set_error(format!("⚠️ {}", e));
                return;
            }
        };
        self.sync_highlight();
        self.scroll_to_bottom();
        self.status = Status::info("Waiting for answer...");

        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let k = self.top_k;
        tokio::spawn(async move {
            let result = service.ask(&pending.question, k).await;
            if tx
                .send(AppEvent::AnswerReady {
                    ticket: pending.ticket,
                    result,
                })
                .is_err()
            {
                tracing::debug!(ticket = pending.ticket, "Chat screen closed before the answer arrived");
            }
        });
    }

    fn upload(&mut self, path: PathBuf) {
        self.status = Status::info(format!("📄 Uploading {}...", path.display()));

        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let status: UploadStatus = controller::upload_document(service.as_ref(), &path).await;
            if tx.send(AppEvent::UploadFinished { status }).is_err() {
                tracing::debug!(path = %path.display(), "Chat screen closed before the upload finished");
            }
        });
    }

    fn new_chat(&mut self) {
        match self.state.create_conversation() {
            Ok(_) => {
                if self.composer.cancel_rename() {
                    self.status = Status::info("Rename cancelled");
                }
                self.scroll_to_bottom();
                self.sync_highlight();
                self.set_focus(Focus::Composer);
            }
            Err(e) => self.set_error(format!("⚠️ {}", e)),
        }
    }

    fn rename(&mut self, conversation_id: &str, name: &str) {
        match self.state.rename(conversation_id, name) {
            Ok(()) => self.status = Status::info(format!("Renamed to {}", name.trim())),
            Err(e) => self.set_error(format!("⚠️ {}", e)),
        }
    }

    fn delete(&mut self, conversation_id: &str) {
        match self.state.delete(conversation_id) {
            Ok(()) => {
                self.sync_highlight();
                self.scroll_to_bottom();
                self.status = Status::info("Conversation deleted");
            }
            Err(e) => self.set_error(format!("⚠️ {}", e)),
        }
    }

    fn apply_menu_action(&mut self, conversation_id: &str, action: MenuAction) {
        match action {
            MenuAction::Rename => {
                let Some(chat) = self.state.chats().get(conversation_id) else {
                    return;
                };
                let name = chat.name.clone();
                self.composer.start_rename(conversation_id.to_string(), &name);
                self.set_focus(Focus::Composer);
            }
            MenuAction::Delete => self.delete(conversation_id),
        }
    }

    fn run_command(&mut self, parsed: ParsedCommand) {
        if parsed.command.requires_argument() && parsed.argument().is_none() {
            self.set_error(format!(
                "Usage: /{} <{}>",
                parsed.command.command(),
                if parsed.command == SlashCommand::Upload { "path" } else { "name" }
            ));
            return;
        }

        match parsed.command {
            SlashCommand::New => self.new_chat(),
            SlashCommand::Upload => {
                if let Some(path) = parsed.argument() {
                    self.upload(PathBuf::from(path));
                }
            }
            SlashCommand::Rename => match (self.state.active_id().map(str::to_string), parsed.argument()) {
                (Some(id), Some(name)) => self.rename(&id, name),
                _ => self.set_error("No active conversation to rename"),
            },
            SlashCommand::Delete => match self.state.active_id().map(str::to_string) {
                Some(id) => self.delete(&id),
                None => self.set_error("No active conversation to delete"),
            },
            SlashCommand::Help => self.status = Status::info(get_help_text()),
            SlashCommand::Quit => self.should_quit = true,
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Sidebar + messages
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Status
            ])
            .split(area);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
            .split(rows[0]);

        let active = self.state.active_id();
        frame.render_widget(
            Sidebar {
                chats: self.state.chats(),
                active,
                highlighted: self.highlighted,
                has_focus: self.focus == Focus::Sidebar,
            },
            panes[0],
        );
        let mut messages = MessageView {
            conversation: self.state.active_conversation(),
            thinking: active.is_some_and(|id| self.state.is_awaiting(id)),
            scroll: 0,
        };
        let scroll = self.scroll_offset.get().min(messages.max_scroll(panes[1]));
        self.scroll_offset.set(scroll);
        messages.scroll = scroll;
        frame.render_widget(messages, panes[1]);
        frame.render_widget(&self.composer, rows[1]);
        frame.render_widget(self.status_line(), rows[2]);

        if let Some(menu) = &self.menu {
            let anchor = panes[0];
            let visible = anchor.height.saturating_sub(2) as usize;
            let start = (self.highlighted + 1).saturating_sub(visible);
            let row = anchor.y + 1 + self.highlighted.saturating_sub(start) as u16;
            frame.render_widget(menu, ChatMenu::area(anchor, row, area));
        }
    }

    fn status_line(&self) -> Paragraph<'_> {
        let color = match self.status.kind {
            StatusKind::Info => Color::Gray,
            StatusKind::Success => Color::Green,
            StatusKind::Error => Color::Red,
        };
        let mut spans = vec![Span::styled(
            self.status.text.as_str(),
            Style::default().fg(color),
        )];
        if self.state.pending_count() > 0 {
            spans.push(Span::styled(
                format!("  ({} awaiting)", self.state.pending_count()),
                Style::default().fg(Color::Yellow),
            ));
        }
        if let Some(file) = &self.indexed_file {
            spans.push(Span::styled(
                format!("  📄 Current: {}", file),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Paragraph::new(Line::from(spans))
    }
}

/// Put the terminal into raw mode on the alternate screen
pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

