//! Origin allow-lists.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ChannelError;

lazy_static! {
    /// Origins an editor host is served from: local dev servers and webviews.
    static ref EDITOR_HOSTS: Vec<Regex> = vec![
        Regex::new(r"^http://\w+\.localhost:3000$").unwrap(),
        Regex::new(r"^vscode-webview://").unwrap(),
    ];
}

/// A regex allow-list applied to envelope origins.
///
/// An origin is trusted if any pattern matches it. An empty policy trusts
/// nothing.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    patterns: Vec<Regex>,
}

impl OriginPolicy {
    /// Build a policy from regex sources.
    pub fn new<I, S>(patterns: I) -> Result<Self, ChannelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()).map_err(|e| ChannelError::InvalidPattern(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Trust exactly one origin.
    pub fn exact(origin: &str) -> Self {
        let pattern = format!("^{}$", regex::escape(origin));
        Self {
            // An escaped literal always compiles.
            patterns: Regex::new(&pattern).into_iter().collect(),
        }
    }

    /// The editor host origins.
    pub fn editor_hosts() -> Self {
        Self {
            patterns: EDITOR_HOSTS.clone(),
        }
    }

    /// Trust nothing.
    pub fn deny_all() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Add another policy's patterns to this one.
    pub fn with(mut self, other: OriginPolicy) -> Self {
        self.patterns.extend(other.patterns);
        self
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(origin))
    }
}
