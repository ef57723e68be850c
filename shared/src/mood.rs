use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub const DEFAULT_MOOD_HISTORY_LIMIT: i64 = 30;
pub const MAX_MOOD_HISTORY_LIMIT: i64 = 100;

/// How the user says they feel in a check-in. Distinct from the pet's mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MoodKind {
    Happy,
    Calm,
    Neutral,
    Sad,
    Anxious,
    Angry,
    Tired,
}

impl TryFrom<String> for MoodKind {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub fn mood_history_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_MOOD_HISTORY_LIMIT)
        .clamp(1, MAX_MOOD_HISTORY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_limit() {
        assert_eq!(mood_history_limit(None), 30);
        assert_eq!(mood_history_limit(Some(5)), 5);
        assert_eq!(mood_history_limit(Some(1000)), 100);
        assert_eq!(mood_history_limit(Some(-3)), 1);
    }

    #[test]
    fn test_mood_parsing() {
        assert_eq!(MoodKind::try_from("anxious".to_string()).unwrap(), MoodKind::Anxious);
        assert_eq!(MoodKind::Tired.as_ref(), "tired");
        assert!("ecstatic".parse::<MoodKind>().is_err());
    }
}
