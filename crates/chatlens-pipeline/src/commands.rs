//! Slash command vocabulary.

use std::fmt;

/// A command recognized by the pipeline. Names arrive without the slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Analytics,
    Dashboard,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse a command name. Matching ignores case and a trailing
    /// `@botname` suffix as group chats send it.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().trim_start_matches('/');
        let name = name.split('@').next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "analytics" => Command::Analytics,
            "dashboard" => Command::Dashboard,
            "help" => Command::Help,
            _ => Command::Unknown(name.to_string()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start => f.write_str("start"),
            Command::Analytics => f.write_str("analytics"),
            Command::Dashboard => f.write_str("dashboard"),
            Command::Help => f.write_str("help"),
            Command::Unknown(name) => write!(f, "unknown({})", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known() {
        assert_eq!(Command::parse("start"), Command::Start);
        assert_eq!(Command::parse("/Analytics"), Command::Analytics);
        assert_eq!(Command::parse("dashboard@chatlens_bot"), Command::Dashboard);
        assert_eq!(Command::parse("HELP"), Command::Help);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            Command::parse("websearch"),
            Command::Unknown("websearch".to_string())
        );
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
    }
}
