//! Typed settings loaded from `config.json`.
//!
//! The file is created with defaults on first run, and any key that later goes
//! missing is written back with its default value. Both cases stop startup so
//! the user can review the file. Per-guild mappings are user data and are never
//! backfilled.

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::ConfigError;
use crate::selector::ReactionWeights;

pub const CONFIG_PATH: &str = "config.json";

const TOKEN_PATTERN: &str = r"^([MN][\w-]{23,25})\.([\w-]{6})\.([\w-]{27,39})$";

/// Paths whose contents belong to the user and are left alone by the backfill.
const IGNORED_PATHS: &[&[&str]] = &[
    &["reaction_settings", "guild_mapping"],
    &["reaction_settings", "reaction_mapping"],
];

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub token: String,
    pub prefix: String,
    pub debug: bool,
    /// Only this user may run commands. Any human may when unset.
    #[serde(default)]
    pub owner_id: Option<u64>,
    pub reaction_settings: ReactionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionSettings {
    /// Seconds between two reactions leaving the queue.
    pub reaction_delay: f64,
    /// Percentage of eligible messages that get a reaction.
    pub reaction_chance: u32,
    /// Guild id to the channels the bot reacts in.
    #[serde(default)]
    pub guild_mapping: HashMap<u64, Vec<u64>>,
    /// Guild id to channel id to weighted reactions.
    #[serde(default)]
    pub reaction_mapping: HashMap<u64, HashMap<u64, ReactionWeights>>,
}

impl ReactionSettings {
    /// The drain period. Rejects values that are negative, not finite, too
    /// large for a `Duration`, or that round down to zero.
    pub fn reaction_delay(&self) -> Result<Duration, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: "reaction_settings/reaction_delay",
            reason,
        };

        let delay = Duration::try_from_secs_f64(self.reaction_delay).map_err(|e| {
            invalid(format!(
                "expected a positive number of seconds, got {} ({})",
                self.reaction_delay, e
            ))
        })?;
        if delay.is_zero() {
            return Err(invalid(format!(
                "expected a positive number of seconds, got {}",
                self.reaction_delay
            )));
        }
        Ok(delay)
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_token(&self.token) {
            return Err(ConfigError::InvalidToken);
        }

        self.reaction_settings.reaction_delay()?;

        let chance = self.reaction_settings.reaction_chance;
        if chance > 100 {
            return Err(ConfigError::InvalidValue {
                key: "reaction_settings/reaction_chance",
                reason: format!("expected a percentage between 0 and 100, got {}", chance),
            });
        }

        Ok(())
    }
}

pub fn is_valid_token(token: &str) -> bool {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX
        .get_or_init(|| Regex::new(TOKEN_PATTERN).expect("Valid token regex"))
        .is_match(token)
}

/// The document written on first run.
pub fn default_document() -> Value {
    json!({
        "token": "Your discord account token",
        "prefix": "cp!",
        "debug": true,
        "reaction_settings": {
            "__comment__": "Delay between adding reactions (in seconds (float))",
            "reaction_delay": 1.75,
            "__comment2__": "Reaction chance",
            "reaction_chance": 40,
            "__comment3__": "Mapping guild/channel list of channels and guilds in which bot will react",
            "guild_mapping": {
                "1097895009275101244": [1180933726201454642u64]
            },
            "__comment4__": "List of guilds/channels/reactions and chances (bot will use these reactions)",
            "__comment5__": "Chance is a relative weight, reactions of one channel compete by their share of the total",
            "__comment6__": "Custom emoji are written as <:name:id>, anything else is used as a unicode emoji",
            "reaction_mapping": {
                "1097895009275101244": {
                    "1180933726201454642": {
                        "<custom_name:custom_id>": 10,
                        "unicode_emoji": 20
                    }
                }
            }
        }
    })
}

/// Loads and validates the settings, creating or repairing the file when needed.
pub fn load(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let defaults = default_document();

    if !path.exists() {
        write_document(path, &defaults)?;
        return Err(ConfigError::Created(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document: Map<String, Value> = serde_json::from_str(&content)?;

    let missing = backfill_missing(&mut document, &defaults);
    if !missing.is_empty() {
        write_document(path, &Value::Object(document))?;
        return Err(ConfigError::MissingKeys(missing));
    }

    let settings: Settings = serde_json::from_value(Value::Object(document))?;
    settings.validate()?;
    Ok(settings)
}

fn write_document(path: &Path, document: &Value) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(document)?;
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Copies every default the document lacks into it and returns the
/// `/`-joined paths that were filled.
pub fn backfill_missing(document: &mut Map<String, Value>, defaults: &Value) -> Vec<String> {
    let mut missing = Vec::new();
    if let Value::Object(defaults) = defaults {
        backfill_object(document, defaults, &mut Vec::new(), &mut missing);
    }
    missing
}

fn backfill_object(
    document: &mut Map<String, Value>,
    defaults: &Map<String, Value>,
    path: &mut Vec<String>,
    missing: &mut Vec<String>,
) {
    for (key, default) in defaults {
        path.push(key.clone());

        if !is_ignored(path) {
            match default {
                Value::Object(nested_defaults) => {
                    let entry = document
                        .entry(key.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !entry.is_object() {
                        *entry = Value::Object(Map::new());
                    }
                    if let Value::Object(nested) = entry {
                        backfill_object(nested, nested_defaults, path, missing);
                    }
                }
                leaf => {
                    if document.get(key).map_or(true, Value::is_null) {
                        document.insert(key.clone(), leaf.clone());
                        missing.push(path.join("/"));
                    }
                }
            }
        }

        path.pop();
    }
}

fn is_ignored(path: &[String]) -> bool {
    IGNORED_PATHS.iter().any(|ignored| {
        path.len() >= ignored.len() && path.iter().zip(ignored.iter()).all(|(a, b)| a == b)
    })
}
