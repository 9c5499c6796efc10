//! Query Surface helpers: what dialogue code reads back out of a ledger.
//!
//! Everything here is read-only except [`mark_referenced`], which retires
//! memorable events once dialogue has used them enough times.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::memory::NpcMemory;
use crate::types::{EventType, RelationshipStage, Sentiment, Timestamp};

/// Epithet used when a ledger has none.
pub const DEFAULT_EPITHET: &str = "stranger";
/// `last_seen` label for an NPC the player never met.
pub const NEVER_SEEN: &str = "never";

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MAX_WEEKS: i64 = 4;

// ---------------------------------------------------------------------------
// Time labels
// ---------------------------------------------------------------------------

/// Human-relative label for how long before `now` something happened.
///
/// Timestamps in the future read as "just now".
#[must_use]
pub fn time_ago(then: Timestamp, now: Timestamp) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < MINUTE {
        return "just now".to_string();
    }
    if secs < HOUR {
        return plural(secs / MINUTE, "minute");
    }
    if secs < DAY {
        return plural(secs / HOUR, "hour");
    }
    if secs < WEEK {
        return plural(secs / DAY, "day");
    }
    if secs <= MAX_WEEKS * WEEK {
        return plural(secs / WEEK, "week");
    }
    "a while back".to_string()
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

// ---------------------------------------------------------------------------
// Epithets
// ---------------------------------------------------------------------------

/// Uniform-random pick from `epithets`, [`DEFAULT_EPITHET`] if empty.
pub fn pick_epithet<R: Rng + ?Sized>(epithets: &[String], rng: &mut R) -> String {
    epithets
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| DEFAULT_EPITHET.to_string())
}

// ---------------------------------------------------------------------------
// Referenceable memories
// ---------------------------------------------------------------------------

/// A memorable event rendered for dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceableMemory {
    /// The interaction type behind it.
    pub event_type: EventType,
    /// Rendered description.
    pub description: String,
    /// How the NPC feels about it.
    pub sentiment: Sentiment,
    /// e.g. "3 days ago".
    pub time_ago: String,
}

/// The newest `limit` memorable events dialogue may still bring up.
#[must_use]
pub fn referenceable(memory: &NpcMemory, limit: usize, now: Timestamp) -> Vec<ReferenceableMemory> {
    memory
        .memorable_events
        .iter()
        .filter(|event| event.can_reference)
        .take(limit)
        .map(|event| ReferenceableMemory {
            event_type: event.event_type.clone(),
            description: event.description.clone(),
            sentiment: event.sentiment,
            time_ago: time_ago(event.timestamp, now),
        })
        .collect()
}

/// Count a dialogue reference against the newest memorable event of
/// `event_type`. Returns `false` if the ledger has no such event.
///
/// The newest event of that type is hit even if it is already retired.
pub fn mark_referenced(memory: &mut NpcMemory, event_type: &EventType, limit: u32) -> bool {
    let Some(event) = memory
        .memorable_events
        .iter_mut()
        .find(|event| &event.event_type == event_type)
    else {
        return false;
    };
    event.record_reference(limit);
    true
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// Read-only projection of a relationship for UI and dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipOverview {
    /// Current stage.
    pub stage: RelationshipStage,
    /// Deal success rate as a whole percentage.
    pub success_rate: u32,
    /// Cumulative completed-deal value.
    pub total_value: u64,
    /// Favors given minus favors owed.
    pub favor_balance: i64,
    /// Time label of the last interaction, [`NEVER_SEEN`] if none.
    pub last_seen: String,
    /// Whether the NPC considers the player an enemy.
    pub is_enemy: bool,
}

/// Project `memory` into a [`RelationshipOverview`].
#[must_use]
pub fn overview(memory: &NpcMemory, now: Timestamp) -> RelationshipOverview {
    let summary = &memory.summary;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let success_rate = (summary.success_rate() * 100.0).round() as u32;
    RelationshipOverview {
        stage: memory.relationship_stage,
        success_rate,
        total_value: summary.total_value,
        favor_balance: summary.favor_balance(),
        last_seen: summary
            .last_interaction
            .map_or_else(|| NEVER_SEEN.to_string(), |last| time_ago(last, now)),
        is_enemy: memory.relationship_stage == RelationshipStage::Enemy,
    }
}
