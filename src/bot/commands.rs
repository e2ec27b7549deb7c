//! Slash commands understood by the bot.

/// A bot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Calculate,
    Order,
    Links,
    Forward,
}

impl Command {
    /// Parse a message. Accepts `/name`, `/name@botname` and the bare word
    /// `cancel` in any case.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("cancel") {
            return Some(Self::Cancel);
        }

        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "cancel" => Some(Self::Cancel),
            "calculate" => Some(Self::Calculate),
            "order" => Some(Self::Order),
            "links" => Some(Self::Links),
            "forward" => Some(Self::Forward),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Cancel => "cancel",
            Self::Calculate => "calculate",
            Self::Order => "order",
            Self::Links => "links",
            Self::Forward => "forward",
        };
        write!(f, "/{s}")
    }
}
