use std::fmt;
use std::str::FromStr;

use conduit_worker::ChannelId;

use crate::error::CommandError;

/// The commands Conduit understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
  Weather,
  Export,
  Label,
}

impl CommandKind {
  pub fn name(self) -> &'static str {
    match self {
      Self::Weather => "weather",
      Self::Export => "export",
      Self::Label => "label",
    }
  }

  pub fn usage(self) -> &'static str {
    match self {
      Self::Weather => "/weather [city]",
      Self::Export => "/export {dashboard|report} <id>",
      Self::Label => "/label <variableName> <variableType> <label>",
    }
  }
}

impl fmt::Display for CommandKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "/{}", self.name())
  }
}

impl FromStr for CommandKind {
  type Err = CommandError;

  /// Accepts the name with or without a leading `/`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().trim_start_matches('/') {
      "weather" => Ok(Self::Weather),
      "export" => Ok(Self::Export),
      "label" => Ok(Self::Label),
      other => Err(CommandError::UnknownCommand {
        name: other.to_string(),
      }),
    }
  }
}

/// What an export command exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
  Dashboard,
  Report,
}

impl ExportKind {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "dashboard" => Some(Self::Dashboard),
      "report" => Some(Self::Report),
      _ => None,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::Dashboard => "dashboard",
      Self::Report => "report",
    }
  }

  /// Name of the uploaded file.
  pub fn filename(self) -> String {
    format!("optimize_{}.json", self.name())
  }

  /// Title of the uploaded file.
  pub fn title(self) -> &'static str {
    match self {
      Self::Dashboard => "Optimize Dashboard",
      Self::Report => "Optimize Report",
    }
  }
}

/// An inbound command. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub kind: CommandKind,
  pub raw_arguments: Vec<String>,
  pub reply_channel: ChannelId,
}

impl Command {
  /// Parse a command name and its argument text, split on whitespace.
  pub fn parse(name: &str, text: &str, reply_channel: ChannelId) -> Result<Self, CommandError> {
    Ok(Self {
      kind: name.parse()?,
      raw_arguments: text.split_whitespace().map(str::to_string).collect(),
      reply_channel,
    })
  }

  /// Parse a full line such as `/weather New York`. Blank lines yield `None`.
  pub fn from_line(line: &str, reply_channel: ChannelId) -> Result<Option<Self>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
      return Ok(None);
    }
    let (name, text) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    Self::parse(name, text, reply_channel).map(Some)
  }

  /// Arguments joined back with single spaces.
  pub fn argument_text(&self) -> String {
    self.raw_arguments.join(" ")
  }

  pub(crate) fn usage_error(&self) -> CommandError {
    CommandError::Usage {
      usage: self.kind.usage(),
    }
  }
}
