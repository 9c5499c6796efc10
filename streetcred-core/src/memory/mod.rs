//! The per-NPC relationship ledger.
//!
//! One [`NpcMemory`] exists per NPC the game has asked about. It holds the
//! bounded interaction history, the running [`InteractionSummary`], the
//! memorable events dialogue can reference, the derived relationship stage
//! and epithets, and the gossip the NPC has heard.

pub mod gossip;
pub mod recent;

pub use gossip::{GOSSIP_CAPACITY, GossipLog};
pub use recent::Recent;

use serde::{Deserialize, Serialize};

use crate::relationship;
use crate::types::{Interaction, MemorableEvent, NpcId, RelationshipStage, Timestamp};

/// Interactions retained per NPC.
pub const INTERACTION_CAPACITY: usize = 100;
/// Memorable events retained per NPC.
pub const MEMORABLE_CAPACITY: usize = 20;
/// Current record schema version.
pub const RECORD_VERSION: u32 = 1;

/// Running counters over every interaction ever recorded with an NPC.
///
/// Updated incrementally; never recomputed from the (truncated) history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSummary {
    /// Deals attempted (completed or failed).
    pub total_deals: u32,
    /// Deals completed.
    pub successful_deals: u32,
    /// Deals or jobs that fell apart.
    pub failed_deals: u32,
    /// Times the player sold this NPC out.
    pub betrayals: u32,
    /// Cumulative value of completed deals, in dollars.
    pub total_value: u64,
    /// Favors the player owes this NPC.
    pub favors_owed: u32,
    /// Favors the player has done this NPC.
    pub favors_given: u32,
    /// First recorded interaction.
    pub first_interaction: Option<Timestamp>,
    /// Most recent recorded interaction.
    pub last_interaction: Option<Timestamp>,
    /// Every interaction ever recorded, including evicted ones.
    pub interaction_count: u32,
}

impl InteractionSummary {
    /// Completed deals over attempted deals, 0.0 with no deals.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_deals == 0 {
            0.0
        } else {
            f64::from(self.successful_deals) / f64::from(self.total_deals)
        }
    }

    /// Favors given minus favors owed.
    #[must_use]
    pub fn favor_balance(&self) -> i64 {
        i64::from(self.favors_given) - i64::from(self.favors_owed)
    }
}

/// Everything one NPC remembers about the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcMemory {
    /// Who this ledger belongs to.
    pub npc_id: NpcId,
    /// Interaction history, newest first.
    #[serde(default)]
    pub interactions: Recent<Interaction, INTERACTION_CAPACITY>,
    /// Running counters.
    #[serde(default)]
    pub summary: InteractionSummary,
    /// Moments dialogue can bring up, newest first.
    #[serde(default)]
    pub memorable_events: Recent<MemorableEvent, MEMORABLE_CAPACITY>,
    /// Derived relationship stage.
    #[serde(default)]
    pub relationship_stage: RelationshipStage,
    /// Derived names the NPC may call the player.
    #[serde(default)]
    pub player_epithets: Vec<String>,
    /// Gossip heard from other NPCs.
    #[serde(default)]
    pub gossip: GossipLog,
    /// Reserved for game-side extensions.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Schema version of this record.
    #[serde(default)]
    pub version: u32,
}

impl NpcMemory {
    /// A fresh ledger: stranger, no history, no epithets.
    #[must_use]
    pub fn new(npc_id: NpcId) -> Self {
        Self {
            npc_id,
            interactions: Recent::new(),
            summary: InteractionSummary::default(),
            memorable_events: Recent::new(),
            relationship_stage: RelationshipStage::Stranger,
            player_epithets: Vec::new(),
            gossip: GossipLog::default(),
            tags: Vec::new(),
            version: RECORD_VERSION,
        }
    }

    /// Re-derive stage and epithets from the counters.
    pub fn reclassify(&mut self) {
        let stage = relationship::classify_stage(&self.summary, &self.memorable_events);
        self.player_epithets = relationship::epithets_for(stage, &self.summary);
        self.relationship_stage = stage;
    }

    /// Bring a record saved by an older schema up to date.
    ///
    /// Returns `true` if anything changed.
    pub fn migrate(&mut self) -> bool {
        if self.version >= RECORD_VERSION {
            return false;
        }
        // Pre-v1 saves stored no derived fields.
        self.reclassify();
        self.version = RECORD_VERSION;
        true
    }

    /// Whether the player has ever interacted with this NPC.
    #[must_use]
    pub fn has_met_player(&self) -> bool {
        self.summary.interaction_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_a_stranger() {
        let memory = NpcMemory::new(NpcId::from("vinnie"));
        assert_eq!(memory.relationship_stage, RelationshipStage::Stranger);
        assert!(memory.player_epithets.is_empty());
        assert!(!memory.has_met_player());
        assert_eq!(memory.version, RECORD_VERSION);
    }

    #[test]
    fn success_rate_handles_no_deals() {
        let mut summary = InteractionSummary::default();
        assert!(summary.success_rate().abs() < f64::EPSILON);
        summary.total_deals = 4;
        summary.successful_deals = 3;
        assert!((summary.success_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn legacy_record_is_migrated() {
        let json = r#"{
            "npc_id": "rosa",
            "summary": {
                "successful_deals": 6,
                "total_deals": 6,
                "interaction_count": 10,
                "favors_given": 5
            }
        }"#;
        let mut memory: NpcMemory = serde_json::from_str(json).expect("de");
        assert_eq!(memory.version, 0);
        assert!(memory.migrate());
        assert_eq!(memory.version, RECORD_VERSION);
        assert_ne!(memory.relationship_stage, RelationshipStage::Stranger);
        assert!(memory.player_epithets.iter().any(|e| e == "generous"));
        assert!(!memory.migrate());
    }
}
