//! Relationship Classifier: trust score → stage → epithets.
//!
//! Pure functions of an NPC's [`InteractionSummary`] and memorable events.
//! A single betrayal pins the stage at [`RelationshipStage::Enemy`]; there
//! is deliberately no path back out in this model, even after
//! `FORGIVEN` / `MADE_AMENDS` events.

use crate::classification;
use crate::memory::InteractionSummary;
use crate::types::{MemorableEvent, RelationshipStage};

/// Trust score at or above which the player is trusted.
pub const TRUSTED_THRESHOLD: f64 = 80.0;
/// Trust score at or above which the player is a friend.
pub const FRIEND_THRESHOLD: f64 = 50.0;
/// Trust score at or above which the player is a business contact.
pub const BUSINESS_THRESHOLD: f64 = 25.0;
/// Trust score at or above which the player is an acquaintance.
pub const ACQUAINTANCE_THRESHOLD: f64 = 10.0;

/// Lifetime value above which the player is a "big earner".
pub const BIG_EARNER_VALUE: u64 = 50_000;
/// Successful deals (with no failures) above which the player is "reliable".
pub const RELIABLE_DEALS: u32 = 10;
/// Favors given above which the player is "generous".
pub const GENEROUS_FAVORS: u32 = 3;

/// Compute the trust score.
///
/// ```text
/// min(interactions × 2, 20)
///   + min(successful_deals × 5, 30)
///   + success_rate × 20
///   + min(total_value / 1000, 20)
///   + (favors_given − favors_owed) × 5
///   + legendary_events × 15
/// ```
///
/// The favor term is uncapped and may go negative.
#[must_use]
pub fn trust_score<'a, I>(summary: &InteractionSummary, memorable_events: I) -> f64
where
    I: IntoIterator<Item = &'a MemorableEvent>,
{
    let familiarity = (f64::from(summary.interaction_count) * 2.0).min(20.0);
    let track_record = (f64::from(summary.successful_deals) * 5.0).min(30.0);
    let reliability = summary.success_rate() * 20.0;
    #[allow(clippy::cast_precision_loss)]
    let earnings = (summary.total_value as f64 / 1000.0).min(20.0);
    #[allow(clippy::cast_precision_loss)]
    let favors = summary.favor_balance() as f64 * 5.0;
    let legendary = memorable_events
        .into_iter()
        .filter(|event| classification::is_legendary_type(&event.event_type))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let legends = legendary as f64 * 15.0;

    familiarity + track_record + reliability + earnings + favors + legends
}

/// Map a trust score to a stage (ignores betrayals).
#[must_use]
pub fn stage_for_score(score: f64) -> RelationshipStage {
    match score {
        s if s >= TRUSTED_THRESHOLD => RelationshipStage::Trusted,
        s if s >= FRIEND_THRESHOLD => RelationshipStage::Friend,
        s if s >= BUSINESS_THRESHOLD => RelationshipStage::Business,
        s if s >= ACQUAINTANCE_THRESHOLD => RelationshipStage::Acquaintance,
        _ => RelationshipStage::Stranger,
    }
}

/// Derive the relationship stage.
#[must_use]
pub fn classify_stage<'a, I>(summary: &InteractionSummary, memorable_events: I) -> RelationshipStage
where
    I: IntoIterator<Item = &'a MemorableEvent>,
{
    if summary.betrayals > 0 {
        return RelationshipStage::Enemy;
    }
    stage_for_score(trust_score(summary, memorable_events))
}

/// Epithets for a stage plus any earned by the player's record.
#[must_use]
pub fn epithets_for(stage: RelationshipStage, summary: &InteractionSummary) -> Vec<String> {
    let mut epithets: Vec<String> = classification::epithet_pool(stage)
        .iter()
        .map(|epithet| (*epithet).to_string())
        .collect();

    if summary.total_value > BIG_EARNER_VALUE {
        epithets.push("big earner".to_string());
    }
    if summary.successful_deals > RELIABLE_DEALS && summary.failed_deals == 0 {
        epithets.push("reliable".to_string());
    }
    if summary.favors_given > GENEROUS_FAVORS {
        epithets.push("generous".to_string());
    }
    epithets
}
