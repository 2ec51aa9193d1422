use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a new conversation
    New,
    /// Upload a document for indexing
    Upload,
    /// Rename the active conversation
    Rename,
    /// Delete the active conversation
    Delete,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new conversation",
            SlashCommand::Upload => "upload a document for indexing: /upload <path>",
            SlashCommand::Rename => "rename the active conversation: /rename <name>",
            SlashCommand::Delete => "delete the active conversation",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether the command needs an argument.
    pub fn requires_argument(self) -> bool {
        matches!(self, SlashCommand::Upload | SlashCommand::Rename)
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let body = input.trim().strip_prefix('/')?;

    let (head, rest) = match body.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (body, ""),
    };

    let command = SlashCommand::from_str(&head.to_lowercase())
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "bye" | "exit" => Some(SlashCommand::Quit),
            "n" => Some(SlashCommand::New),
            "u" => Some(SlashCommand::Upload),
            "h" | "?" => Some(SlashCommand::Help),
            _ => None,
        })?;

    let argument = (!rest.is_empty()).then(|| rest.to_string());

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Commands: ");
    let entries: Vec<String> = SlashCommand::iter()
        .map(|command| format!("/{}", command.command()))
        .collect();
    help.push_str(&entries.join(" "));
    help.push_str("  |  Tab: switch pane  Ctrl+N: new chat  m: chat menu  Ctrl+C: quit");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_argument() {
        let parsed = parse_slash_command("/upload  docs/leave policy.md ").unwrap();
        assert_eq!(parsed.command, SlashCommand::Upload);
        assert_eq!(parsed.argument(), Some("docs/leave policy.md"));
    }

    #[test]
    fn parses_aliases_and_case() {
        assert_eq!(parse_slash_command("/Q").unwrap().command, SlashCommand::Quit);
        assert_eq!(parse_slash_command("/NEW").unwrap().command, SlashCommand::New);
        assert_eq!(parse_slash_command("/help").unwrap().argument, None);
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert_eq!(parse_slash_command("what is /new?"), None);
        assert_eq!(parse_slash_command("/frobnicate"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for command in SlashCommand::iter() {
            assert!(help.contains(&format!("/{}", command.command())));
        }
        assert!(SlashCommand::Rename.requires_argument());
        assert!(!SlashCommand::Delete.requires_argument());
    }
}
