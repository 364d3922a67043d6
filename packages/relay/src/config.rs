//! Relay configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stagefs_channel::ChannelConfig;
use stagefs_core::{SessionId, VirtualPath};

use crate::error::RelayError;

/// Settings for an [`AssetRelay`](crate::AssetRelay).
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Origin the relay serves from and stamps on its envelopes.
    pub origin: String,

    /// Path fragments marking a request as virtual. Matching is a plain
    /// substring test on the URL path.
    pub namespace_markers: Vec<String>,

    /// Directory under which generated files are served.
    pub namespace_root: String,

    /// File name of the top-level document. Requesting it resets the
    /// session cache.
    pub document_name: String,

    /// Query parameter on the document URL naming the owning session.
    pub session_param: String,

    /// Timeout for passthrough fetches.
    pub passthrough_timeout_ms: u64,

    /// Settings for links to presentation frames.
    pub channel: ChannelConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8601".to_string(),
            namespace_markers: vec!["leopard/".to_string(), "leopard_ext/".to_string()],
            namespace_root: "leopard".to_string(),
            document_name: "index.html".to_string(),
            session_param: "parentAppClientId".to_string(),
            passthrough_timeout_ms: 30_000,
            channel: ChannelConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load a config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self, RelayError> {
        let config: RelayConfig =
            serde_json::from_str(text).map_err(|e| RelayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.namespace_markers.iter().all(|m| m.is_empty()) {
            return Err(RelayError::Config("no namespace markers configured".into()));
        }
        let document = VirtualPath::parse(&self.document_name)
            .map_err(|e| RelayError::Config(format!("document name: {}", e)))?;
        if document.len() != 1 || document.extension().is_none() {
            return Err(RelayError::Config(format!(
                "document name '{}' must be a single file name with an extension",
                self.document_name
            )));
        }
        if self.session_param.is_empty() {
            return Err(RelayError::Config("session parameter is empty".into()));
        }
        Ok(())
    }

    pub fn passthrough_timeout(&self) -> Duration {
        Duration::from_millis(self.passthrough_timeout_ms)
    }

    /// The document URL a consumer frame of `session` should load.
    pub fn consumer_url(&self, session: SessionId) -> String {
        format!(
            "{}/{}/{}?{}={}",
            self.origin.trim_end_matches('/'),
            self.namespace_root,
            self.document_name,
            self.session_param,
            session
        )
    }
}
