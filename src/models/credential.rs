use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Ownership predicate for one dimension of a credential's scope.
///
/// `Universal` is the literal wildcard "all"; `Listed` holds explicit names,
/// case-normalized. Stored values may be a JSON array or a comma-separated
/// string; both normalize the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerSet {
    Universal,
    Listed(Vec<String>),
}

impl OwnerSet {
    pub fn from_value(value: &Value) -> Self {
        let names: Vec<String> = match value {
            Value::String(s) => s
                .split(',')
                .map(|part| part.trim().to_lowercase())
                .filter(|part| !part.is_empty())
                .collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        if names.iter().any(|n| n == "all") {
            OwnerSet::Universal
        } else {
            OwnerSet::Listed(names)
        }
    }

    pub fn is_universal(&self) -> bool {
        matches!(self, OwnerSet::Universal)
    }

    /// Explicit match only — `Universal` does not list anything.
    pub fn lists(&self, name: &str) -> bool {
        match self {
            OwnerSet::Universal => false,
            OwnerSet::Listed(names) => {
                let name = name.trim().to_lowercase();
                names.iter().any(|n| *n == name)
            }
        }
    }
}

impl Default for OwnerSet {
    fn default() -> Self {
        OwnerSet::Listed(Vec::new())
    }
}

impl Serialize for OwnerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OwnerSet::Universal => ["all"].serialize(serializer),
            OwnerSet::Listed(names) => names.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for OwnerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(OwnerSet::from_value(&value))
    }
}

/// A leasable item from the shared pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    /// Slot ids this credential serves (or the wildcard).
    #[serde(default)]
    pub slots: OwnerSet,
    /// Platform tags this credential serves (or the wildcard).
    #[serde(default)]
    pub platforms: OwnerSet,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub usage_count: i64,
    /// 0 = unbounded.
    #[serde(default)]
    pub max_usage: i64,
    /// Day-granularity expiry (`YYYY-MM-DD`), inclusive through that day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<String>,
    /// Opaque payload: login secrets, `otp_secret`, `email`, `invite_url`, …
    #[serde(default)]
    pub payload: serde_json::Map<String, Value>,
}

impl Credential {
    pub fn at_capacity(&self) -> bool {
        self.max_usage > 0 && self.usage_count >= self.max_usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_owner_set_from_array() {
        let set = OwnerSet::from_value(&json!(["Premium", " basic "]));
        assert!(set.lists("premium"));
        assert!(set.lists("BASIC"));
        assert!(!set.lists("other"));
        assert!(!set.is_universal());
    }

    #[test]
    fn test_owner_set_from_comma_string() {
        let set = OwnerSet::from_value(&json!("premium, basic,"));
        assert!(set.lists("premium"));
        assert!(set.lists("basic"));
    }

    #[test]
    fn test_owner_set_wildcard() {
        assert!(OwnerSet::from_value(&json!(["ALL"])).is_universal());
        assert!(OwnerSet::from_value(&json!("all")).is_universal());
        // the wildcard never counts as an explicit listing
        assert!(!OwnerSet::from_value(&json!("all")).lists("premium"));
    }

    #[test]
    fn test_owner_set_empty_and_garbage() {
        assert_eq!(OwnerSet::from_value(&json!(null)), OwnerSet::Listed(vec![]));
        assert_eq!(OwnerSet::from_value(&json!(42)), OwnerSet::Listed(vec![]));
        assert_eq!(OwnerSet::from_value(&json!("")), OwnerSet::Listed(vec![]));
    }

    #[test]
    fn test_at_capacity() {
        let mut cred: Credential = serde_json::from_value(json!({"id": "c1"})).unwrap();
        assert!(!cred.at_capacity()); // 0 = unbounded
        cred.usage_count = 100;
        assert!(!cred.at_capacity());
        cred.max_usage = 100;
        assert!(cred.at_capacity());
        cred.usage_count = 99;
        assert!(!cred.at_capacity());
    }
}
