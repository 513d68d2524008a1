//! Triggers — the caller-declared reason a gather was requested.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why context is being gathered.
///
/// Serialized as a kebab-case string (`"user-prompt"`). Kinds this crate does
/// not know about round-trip through [`Trigger::Custom`] as `"custom:<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Trigger {
    /// The engine is preparing a suggestion nobody asked for yet.
    #[default]
    Proactive,
    /// The user typed a prompt into the chat.
    UserPrompt,
    /// The user clicked, typed or otherwise interacted with the page.
    UserAction,
    /// The page navigated.
    Navigation,
    /// A form field gained focus or changed.
    FormInteraction,
    /// A runtime error was observed.
    Error,
    Custom(String),
}

impl Trigger {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Proactive => "proactive",
            Self::UserPrompt => "user-prompt",
            Self::UserAction => "user-action",
            Self::Navigation => "navigation",
            Self::FormInteraction => "form-interaction",
            Self::Error => "error",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "custom:{name}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<String> for Trigger {
    fn from(value: String) -> Self {
        match value.as_str() {
            "proactive" => Self::Proactive,
            "user-prompt" | "user_prompt" => Self::UserPrompt,
            "user-action" | "user_action" => Self::UserAction,
            "navigation" => Self::Navigation,
            "form-interaction" | "form_interaction" => Self::FormInteraction,
            "error" => Self::Error,
            _ => match value.strip_prefix("custom:") {
                Some(name) => Self::Custom(name.to_string()),
                None => Self::Custom(value),
            },
        }
    }
}

impl From<&str> for Trigger {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Trigger> for String {
    fn from(trigger: Trigger) -> Self {
        trigger.to_string()
    }
}

impl FromStr for Trigger {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_triggers_parse() {
        assert_eq!(Trigger::from("user-prompt"), Trigger::UserPrompt);
        assert_eq!(Trigger::from("user_action"), Trigger::UserAction);
        assert_eq!(Trigger::from("navigation"), Trigger::Navigation);
    }

    #[test]
    fn unknown_trigger_becomes_custom() {
        let trigger: Trigger = "scroll-idle".parse().unwrap();
        assert_eq!(trigger, Trigger::Custom("scroll-idle".into()));
        assert_eq!(trigger.to_string(), "custom:scroll-idle");
        assert_eq!(Trigger::from(trigger.to_string()), trigger);
    }

    #[test]
    fn serializes_as_kebab_string() {
        let json = serde_json::to_string(&Trigger::FormInteraction).unwrap();
        assert_eq!(json, "\"form-interaction\"");
        let parsed: Trigger = serde_json::from_str("\"proactive\"").unwrap();
        assert_eq!(parsed, Trigger::Proactive);
    }
}
