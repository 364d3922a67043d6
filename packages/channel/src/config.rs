use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for a linked endpoint pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Envelopes buffered per direction before `send` waits.
    pub capacity: usize,

    /// How long a correlated call waits for its reply. `None` waits forever.
    pub call_timeout_ms: Option<u64>,
}

impl ChannelConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout_ms = timeout.map(|d| d.as_millis() as u64);
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            call_timeout_ms: Some(30_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.call_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ChannelConfig = serde_json::from_str(r#"{"call_timeout_ms": null}"#).unwrap();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.call_timeout(), None);
    }
}
