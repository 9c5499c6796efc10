//! Gossip log: "What I've heard about you."
//!
//! Two parallel capped sequences: who said it, and what was said. They are
//! pushed and evicted together so index `i` in one always matches index `i`
//! in the other.

use serde::{Deserialize, Deserializer, Serialize};

use crate::memory::Recent;
use crate::types::{GossipItem, NpcId};

/// Maximum gossip items an NPC keeps.
pub const GOSSIP_CAPACITY: usize = 10;

/// Per-NPC record of gossip heard about the player, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GossipLog {
    /// Source NPC of each item.
    pub heard_from: Recent<NpcId, GOSSIP_CAPACITY>,
    /// The items themselves.
    pub content: Recent<GossipItem, GOSSIP_CAPACITY>,
}

impl GossipLog {
    /// Record a new item. The oldest item is evicted from both sequences
    /// once the log is full.
    pub fn push(&mut self, item: GossipItem) {
        self.heard_from.push_front(item.from.clone());
        self.content.push_front(item);
    }

    /// Up to `count` of the newest items.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<GossipItem> {
        self.content.iter().take(count).cloned().collect()
    }

    /// Number of retained items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether nothing has been heard.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Deserialize)]
struct RawGossipLog {
    #[serde(default)]
    heard_from: Recent<NpcId, GOSSIP_CAPACITY>,
    #[serde(default)]
    content: Recent<GossipItem, GOSSIP_CAPACITY>,
}

impl<'de> Deserialize<'de> for GossipLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let RawGossipLog {
            mut heard_from,
            mut content,
        } = RawGossipLog::deserialize(deserializer)?;
        // Hand-edited or truncated saves can disagree; keep the lists aligned.
        let aligned = heard_from.len().min(content.len());
        heard_from.truncate(aligned);
        content.truncate(aligned);
        Ok(Self {
            heard_from,
            content,
        })
    }
}
