use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Name of one logical event stream on the shared socket.
///
/// Serialized as a bare string, so a `socket_topic` field in any server
/// object deserializes straight into a `Topic`:
///
/// ```json
/// {"socket_topic": "transaction_consumption:7d5e..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic {
    name: CompactString,
}

impl Topic {
    /// Topic used for connection-level heartbeats.
    pub const HEARTBEAT: &'static str = "phoenix";

    pub fn new(name: impl Into<CompactString>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_from_bare_string() {
        let topic: Topic = serde_json::from_str("\"transaction_request:abc\"").unwrap();
        assert_eq!(topic, Topic::new("transaction_request:abc"));
        assert_eq!(
            serde_json::to_string(&topic).unwrap(),
            "\"transaction_request:abc\""
        );
    }

    #[test]
    fn test_topic_rejects_nested_object() {
        assert!(serde_json::from_str::<Topic>(r#"{"name":"abc"}"#).is_err());
    }
}
