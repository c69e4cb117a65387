//! Parsed protocol requests.

use std::fmt;

/// One parsed input line: a command verb and an optional argument.
///
/// The command is canonicalized to uppercase at construction; the argument
/// is everything after the first space, verbatim. Requests are immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: String,
    argument: Option<String>,
}

impl Request {
    /// Build a request from a command name and an optional argument.
    pub fn new(command: impl Into<String>, argument: Option<String>) -> Self {
        Self {
            command: command.into().to_ascii_uppercase(),
            argument,
        }
    }

    /// Tokenize a trimmed input line into a request.
    ///
    /// Splits at the first space: the left side is the command verb, the
    /// remainder (untouched, spaces and all) is the argument. A line without
    /// a space is a bare command.
    pub fn parse(line: &str) -> Self {
        match line.split_once(' ') {
            Some((command, argument)) => Self::new(command, Some(argument.to_string())),
            None => Self::new(line, None),
        }
    }

    /// The uppercase command verb.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The raw argument, if the line had one.
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "{} {}", self.command, argument),
            None => f.write_str(&self.command),
        }
    }
}
