//! Configuration for the relationship memory store.
//!
//! Maps directly to `streetcred.toml`. Every field has a default, so an
//! empty file (or a missing section) is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Dialogue-facing query tuning.
    #[serde(default)]
    pub dialogue: DialogueConfig,
}

impl StoreConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `StoreError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| crate::StoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Which durable slot backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `SQLite` database file.
    #[default]
    Sqlite,
    /// Plain JSON file (debugging, modding).
    Json,
    /// Nothing durable; state lives for the session only.
    Memory,
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "sqlite", "json" or "memory".
    #[serde(default)]
    pub backend: BackendKind,
    /// File backing the slot (ignored by the memory backend).
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Key the snapshot is stored under.
    #[serde(default = "default_slot_key")]
    pub slot_key: String,
    /// Use WAL mode for the `SQLite` backend.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            path: default_path(),
            slot_key: default_slot_key(),
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

/// Dialogue-facing query tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Memories returned by `get_referenceable_memories_default`.
    #[serde(default = "default_3")]
    pub referenceable_limit: usize,
    /// References after which a memorable event is retired.
    #[serde(default = "default_3_u32")]
    pub reference_limit: u32,
    /// Gossip items returned by `get_gossip`.
    #[serde(default = "default_3")]
    pub gossip_recent: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            referenceable_limit: 3,
            reference_limit: 3,
            gossip_recent: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_path() -> PathBuf { PathBuf::from("npc_memories.db") }
fn default_slot_key() -> String { "npc_memories".to_string() }
fn default_3() -> usize { 3 }
fn default_3_u32() -> u32 { 3 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = StoreConfig::from_toml("").expect("parse");
        assert_eq!(config.persistence.backend, BackendKind::Sqlite);
        assert_eq!(config.persistence.slot_key, "npc_memories");
        assert_eq!(config.dialogue.reference_limit, 3);
    }

    #[test]
    fn unknown_sections_are_ignored() {
        // Logging is configured by the host's subscriber, not here.
        let config = StoreConfig::from_toml(
            r#"
            [general]
            log_level = "debug"

            [dialogue]
            reference_limit = 1
            "#,
        )
        .expect("parse");
        assert_eq!(config.dialogue.reference_limit, 1);
        assert_eq!(config.persistence.backend, BackendKind::Sqlite);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config = StoreConfig::from_toml(
            r#"
            [persistence]
            backend = "json"
            path = "saves/contacts.json"

            [dialogue]
            gossip_recent = 5
            "#,
        )
        .expect("parse");
        assert_eq!(config.persistence.backend, BackendKind::Json);
        let path = PathBuf::from("saves/contacts.json");
        assert_eq!(config.persistence.path, path);
        assert!(config.persistence.checksum_enabled);
        assert_eq!(config.dialogue.gossip_recent, 5);
        assert_eq!(config.dialogue.referenceable_limit, 3);
    }

    #[test]
    fn bad_backend_is_a_config_error() {
        let toml = "[persistence]\nbackend = \"redis\"";
        let err = StoreConfig::from_toml(toml).expect_err("reject");
        assert!(matches!(err, crate::StoreError::Config(_)));
    }
}
