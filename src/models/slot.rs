use serde::{Deserialize, Serialize};

/// A category of leasable credentials with shared duration/platform/label
/// policy. Read-only from the engine's perspective; administered externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub platform: String,
    /// Informational target pool size.
    #[serde(default)]
    pub required_amount: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub duration: SlotDuration,
    /// Default label-rendering mode ("platform" or "name").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_mode: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Lease duration: numeric hours, or a textual unit ("1 day", "12h", …).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SlotDuration {
    Hours(i64),
    Text(String),
}

impl Default for SlotDuration {
    fn default() -> Self {
        SlotDuration::Hours(Self::FALLBACK_HOURS)
    }
}

impl SlotDuration {
    /// Used when the duration cannot be made sense of.
    pub const FALLBACK_HOURS: i64 = 6;

    /// Resolve to a whole number of hours.
    ///
    /// A textual unit containing "day" means 24 hours; otherwise a leading
    /// integer is taken. Anything unparseable (or non-positive) falls back
    /// to [`Self::FALLBACK_HOURS`].
    pub fn hours(&self) -> i64 {
        match self {
            SlotDuration::Hours(h) if *h > 0 => *h,
            SlotDuration::Hours(_) => Self::FALLBACK_HOURS,
            SlotDuration::Text(s) => {
                if s.to_lowercase().contains("day") {
                    return 24;
                }
                let leading: String = s
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                leading
                    .parse::<i64>()
                    .ok()
                    .filter(|h| *h > 0)
                    .unwrap_or(Self::FALLBACK_HOURS)
            }
        }
    }
}

/// How a lease headline names the account it grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMode {
    /// "{platform} Account"
    Platform,
    /// "{slot name} Account"
    Name,
}

impl LabelMode {
    /// Accepts exactly "platform" or "name" (trimmed, case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "platform" => Some(LabelMode::Platform),
            "name" => Some(LabelMode::Name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duration_numeric_hours() {
        assert_eq!(SlotDuration::Hours(6).hours(), 6);
        assert_eq!(SlotDuration::Hours(48).hours(), 48);
        assert_eq!(SlotDuration::Hours(0).hours(), 6);
        assert_eq!(SlotDuration::Hours(-3).hours(), 6);
    }

    #[test]
    fn test_duration_day_unit() {
        assert_eq!(SlotDuration::Text("1 day".into()).hours(), 24);
        assert_eq!(SlotDuration::Text("Day".into()).hours(), 24);
        assert_eq!(SlotDuration::Text("3 days".into()).hours(), 24);
    }

    #[test]
    fn test_duration_leading_integer() {
        assert_eq!(SlotDuration::Text("12h".into()).hours(), 12);
        assert_eq!(SlotDuration::Text(" 8 hours".into()).hours(), 8);
        assert_eq!(SlotDuration::Text("whenever".into()).hours(), 6);
        assert_eq!(SlotDuration::Text("".into()).hours(), 6);
    }

    #[test]
    fn test_duration_deserializes_untagged() {
        let slot: Slot =
            serde_json::from_value(json!({"id": "s", "name": "S", "duration": 12})).unwrap();
        assert_eq!(slot.duration, SlotDuration::Hours(12));

        let slot: Slot =
            serde_json::from_value(json!({"id": "s", "name": "S", "duration": "1 day"}))
                .unwrap();
        assert_eq!(slot.duration.hours(), 24);

        // missing duration falls back
        let slot: Slot = serde_json::from_value(json!({"id": "s", "name": "S"})).unwrap();
        assert_eq!(slot.duration.hours(), 6);
    }

    #[test]
    fn test_label_mode_parse() {
        assert_eq!(LabelMode::parse(" Platform "), Some(LabelMode::Platform));
        assert_eq!(LabelMode::parse("NAME"), Some(LabelMode::Name));
        assert_eq!(LabelMode::parse("other"), None);
        assert_eq!(LabelMode::parse(""), None);
    }
}
