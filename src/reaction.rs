use serde::{Deserialize, Deserializer};
use std::fmt;

/// An emoji the bot can react with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReactionToken {
    /// Guild emoji referenced by name and numeric id.
    Custom { animated: bool, name: String, id: u64 },
    /// Literal unicode emoji, passed through untouched.
    Unicode(String),
}

impl ReactionToken {
    /// Accepts `<:name:id>`, `<a:name:id>`, `<name:id>` and `name:id` as custom
    /// emoji. Everything else is kept as a unicode literal.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let inner = trimmed
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .unwrap_or(trimmed);

        let parts: Vec<&str> = inner.split(':').collect();
        let (animated, name, id) = match parts.as_slice() {
            [name, id] => (false, *name, *id),
            ["", name, id] => (false, *name, *id),
            ["a", name, id] => (true, *name, *id),
            _ => return Self::Unicode(trimmed.to_string()),
        };

        match id.parse::<u64>() {
            Ok(id) if !name.is_empty() => Self::Custom {
                animated,
                name: name.to_string(),
                id,
            },
            _ => Self::Unicode(trimmed.to_string()),
        }
    }
}

impl fmt::Display for ReactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom { animated: true, name, id } => write!(f, "<a:{}:{}>", name, id),
            Self::Custom { animated: false, name, id } => write!(f, "<:{}:{}>", name, id),
            Self::Unicode(emoji) => f.write_str(emoji),
        }
    }
}

impl From<&str> for ReactionToken {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl<'de> Deserialize<'de> for ReactionToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
