//! Decoded dynamic configuration tables.
//!
//! The data model of the tables an external configuration collaborator hands
//! to the program builder at boot: relay channel aliases, named sequences,
//! named patterns, and input-channel-to-program bindings. The JSON decode
//! helpers exist for hosts that keep these documents on disk; the engine
//! itself only ever sees the decoded structures.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::{InterceptError, Result};

/// One decoded on/off hold: `[on, duration_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SectionSpec(pub bool, pub i32);

/// One decoded pattern entry: `[channel_alias, start_delay_ms, sequence_name]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatternEntry(pub String, pub u32, pub String);

/// Decoded patterns document.
///
/// ```json
/// {
///   "sequences": { "double_tap": [[true, 100], [false, 100], [true, 100]] },
///   "patterns": { "Greeting": [["Channel 4", 0, "double_tap"]] },
///   "pattern_mappings": { "3": "Greeting" }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternsConfig {
    /// Named sequences: arrays of on/off-duration pairs.
    #[serde(default)]
    pub sequences: BTreeMap<String, Vec<SectionSpec>>,
    /// Named patterns: ordered triples binding sequences onto channels.
    #[serde(default)]
    pub patterns: BTreeMap<String, Vec<PatternEntry>>,
    /// Input-channel-index (as a decimal string key) to program name.
    #[serde(default, rename = "pattern_mappings")]
    pub mappings: BTreeMap<String, String>,
}

impl PatternsConfig {
    /// Decodes a patterns document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| InterceptError::ConfigError(format!("patterns document: {e}")))
    }

    /// Reads and decodes a patterns document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Decoded channel alias table: `[index, alias]` pairs.
///
/// ```json
/// [[0, "North poofer"], [1, "South poofer"]]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ChannelAliasConfig(pub Vec<(usize, String)>);

impl ChannelAliasConfig {
    /// Decodes an alias table from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| InterceptError::ConfigError(format!("channels document: {e}")))
    }

    /// Reads and decodes an alias table from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_full_patterns_document() {
        let config = PatternsConfig::from_json(
            r#"{
                "sequences": { "blip": [[true, 50], [false, 50]] },
                "patterns": { "Blip4": [["Channel 4", 0, "blip"]] },
                "pattern_mappings": { "2": "Blip4" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.sequences["blip"], vec![SectionSpec(true, 50), SectionSpec(false, 50)]);
        assert_eq!(
            config.patterns["Blip4"],
            vec![PatternEntry("Channel 4".into(), 0, "blip".into())]
        );
        assert_eq!(config.mappings["2"], "Blip4");
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let config = PatternsConfig::from_json("{}").unwrap();
        assert!(config.sequences.is_empty());
        assert!(config.patterns.is_empty());
        assert!(config.mappings.is_empty());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = PatternsConfig::from_json("{").unwrap_err();
        assert!(matches!(err, InterceptError::ConfigError(_)));
    }

    #[test]
    fn decodes_channel_aliases() {
        let aliases =
            ChannelAliasConfig::from_json(r#"[[0, "North"], [5, "South"]]"#).unwrap();
        assert_eq!(aliases.0.len(), 2);
        assert_eq!(aliases.0[1], (5, "South".to_string()));
    }
}
