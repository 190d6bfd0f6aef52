use educe::Educe;
use serde::{de::Error as _, Deserialize, Serialize};

use crate::error::{Error, Result};

/// Session-wide settings for building and submitting queries.
///
/// # Defaults
///
/// - default_limit: 100
/// - same_tab: false
/// - base_path: ""
#[derive(Educe, Clone, Debug, Serialize, Deserialize)]
#[educe(PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct QueryConfig {
    /// The `limit` meta parameter every fresh query starts with.
    #[educe(Default = 100)]
    pub default_limit: u64,
    /// If set, a new search replaces the most recently opened result view instead of adding one.
    pub same_tab: bool,
    /// Prefix prepended to every backend endpoint path.
    pub base_path: String,
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::custom)
    }

    pub fn default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn same_tab(mut self, same_tab: bool) -> Self {
        self.same_tab = same_tab;
        self
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = QueryConfig::from_json("{}").unwrap();
        assert_eq!(config, QueryConfig::new());
        assert_eq!(config.default_limit, 100);
        assert!(!config.same_tab);
    }

    #[test]
    fn overrides() {
        let config = QueryConfig::from_json(r#"{"default_limit": 25, "base_path": "/elsa/"}"#).unwrap();
        assert_eq!(config, QueryConfig::new().default_limit(25).base_path("/elsa/"));
        assert!(QueryConfig::from_json(r#"{"limit": 25}"#).is_err());
    }
}
