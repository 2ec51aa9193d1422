//! Terminal UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod menu;
pub mod messages;
pub mod sidebar;

pub use commands::{get_help_text, parse_slash_command, ParsedCommand, SlashCommand};
pub use composer::{Composer, ComposerMode, ComposerResult};
pub use menu::{ChatMenu, MenuAction, MenuResult};
pub use messages::MessageView;
pub use sidebar::Sidebar;
