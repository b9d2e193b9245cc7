//! Keyword Matching and Completion
//!
//! Input lines are matched against the built-in keywords in a fixed order,
//! comparing only the first `keyword.len()` bytes. A line such as `getfoo`
//! therefore matches `get`; the handler sees the raw line and extracts its
//! own argument.

use crate::commands::Command;

/// Returns the command whose keyword prefixes `line`, checking
/// `help`, `get`, `exit`, `list`, `count` in that order.
pub fn parse_command(line: &str) -> Option<Command> {
    Command::ALL
        .into_iter()
        .find(|command| line.as_bytes().starts_with(command.keyword().as_bytes()))
}

/// Suggests full keywords for a partially typed buffer.
///
/// Only the first character is inspected; `q` suggests `exit`.
pub fn complete_keyword(buf: &str) -> Vec<&'static str> {
    let command = match buf.chars().next() {
        Some('h') => Command::Help,
        Some('g') => Command::Get,
        Some('l') => Command::List,
        Some('q') | Some('e') => Command::Exit,
        Some('c') => Command::Count,
        _ => return Vec::new(),
    };
    vec![command.keyword()]
}
