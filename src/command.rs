use std::sync::LazyLock;

use regex::Regex;

const COMMAND_MARKER: &str = "/miaq/";

// Room id and message id of a Chatwork permalink, e.g.
// `/miaq/https://www.chatwork.com/#!rid(111)-222`.
static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/miaq/https://www\.chatwork\.com/#!rid\((\d+)\)-(\d+)")
        .expect("valid command pattern")
});

/// The message a `/miaq/` command points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatch {
    pub room_id: String,
    pub message_id: String,
}

/// Result of scanning a message body for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// The body does not mention `/miaq/` at all.
    NotCommand,
    /// `/miaq/` is present but no well-formed permalink follows it.
    Malformed,
    Command(CommandMatch),
}

impl ParsedCommand {
    /// Scan `body`. Only the first well-formed reference is used.
    pub fn parse(body: &str) -> Self {
        if let Some(captures) = COMMAND_RE.captures(body) {
            if let (Some(room), Some(message)) = (captures.get(1), captures.get(2)) {
                return ParsedCommand::Command(CommandMatch {
                    room_id: room.as_str().to_string(),
                    message_id: message.as_str().to_string(),
                });
            }
        }

        if body.contains(COMMAND_MARKER) {
            ParsedCommand::Malformed
        } else {
            ParsedCommand::NotCommand
        }
    }
}
