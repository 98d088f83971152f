//! Slash-command parsing for the REPL.

use crate::error::CliError;

pub const HELP: &str = "\
Commands:
  /chat                 show the chat screen
  /history              list past sessions
  /settings             show settings
  /new                  start a new chat
  /open <n>             open session number n from /history
  /personality <text>   set the AI personality (blank resets)
  /location on|off      toggle location services
  /retry                ask again after a failed response
  /dismiss              hide the failure banner
  /cancel               stop waiting for the current response
  /help                 show this help
  /quit                 exit
Anything else is sent as a chat message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the chat engine.
    Say(String),
    Chat,
    History,
    Settings,
    New,
    Open(usize),
    Personality(String),
    Location(bool),
    Retry,
    Dismiss,
    Cancel,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CliError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Say(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "chat" => Self::Chat,
            "history" => Self::History,
            "settings" => Self::Settings,
            "new" => Self::New,
            "open" => Self::Open(parse_number(name, arg)?),
            "personality" => Self::Personality(arg.to_string()),
            "location" => Self::Location(parse_switch(name, arg)?),
            "retry" => Self::Retry,
            "dismiss" => Self::Dismiss,
            "cancel" => Self::Cancel,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => return Err(CliError::UnknownCommand(name.to_string())),
        };
        Ok(Some(command))
    }
}

fn invalid(command: &str, reason: impl Into<String>) -> CliError {
    CliError::InvalidArgument {
        command: command.to_string(),
        reason: reason.into(),
    }
}

fn parse_number(command: &str, arg: &str) -> Result<usize, CliError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(command, "expected a session number from /history")),
    }
}

fn parse_switch(command: &str, arg: &str) -> Result<bool, CliError> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(invalid(command, "expected on or off")),
    }
}
