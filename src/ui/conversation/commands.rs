use std::str::FromStr;

use crate::config::Theme;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Send one of the suggested questions
    Suggest,
    /// Switch color theme
    Theme,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Zero-based index of the suggestion named by `/suggest <n>` (1-based)
    pub fn suggestion_index(&self) -> Option<usize> {
        if self.command != SlashCommand::Suggest {
            return None;
        }

        let n: usize = self.argument()?.trim().parse().ok()?;
        n.checked_sub(1)
    }

    pub fn theme_target(&self) -> Option<Theme> {
        if self.command != SlashCommand::Theme {
            return None;
        }

        Theme::from_str(self.argument()?.trim()).ok()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Suggest => "send a suggested question (/suggest 1-4)",
            SlashCommand::Theme => "switch color theme (light, dark)",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether this command can be run while a reply is pending.
    pub fn available_while_pending(self) -> bool {
        match self {
            SlashCommand::Suggest => false,
            SlashCommand::Theme | SlashCommand::Help | SlashCommand::Bye => true,
        }
    }
}

/// Return all built-in commands in a Vec paired with their command string.
pub fn built_in_slash_commands() -> Vec<(&'static str, SlashCommand)> {
    SlashCommand::iter().map(|c| (c.command(), c)).collect()
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let body = input.trim_start().strip_prefix('/')?;

    let mut parts = body.split_whitespace();
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "quit" | "exit" => Some(SlashCommand::Bye),
            "h" | "?" => Some(SlashCommand::Help),
            "s" => Some(SlashCommand::Suggest),
            _ => None,
        })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for (command_str, command) in built_in_slash_commands() {
        help.push_str(&format!("/{} - {}\n", command_str, command.description()));
    }

    help.push_str("\nAliases: /q, /quit or /exit for /bye, /s for /suggest, /h for /help");
    help.push_str("\nEnter sends, Shift+Enter adds a new line, Ctrl+C quits.");

    help
}
