//! Event Recorder: interaction events → ledger mutations.
//!
//! The recorder is the only code path that appends to an NPC's interaction
//! history. For each event it:
//!
//! 1. Classifies significance from the lookup tables
//! 2. Prepends the interaction to the bounded history
//! 3. Moves the summary counters the event type maps to
//! 4. Synthesises a memorable event for moderate-or-higher significance
//! 5. Re-derives relationship stage and epithets
//! 6. Stamps first/last interaction times and bumps the interaction count
//!
//! Persistence and listener notification are the store's job.

use tracing::{debug, info};

use crate::classification::{self, SummaryEffect};
use crate::memory::{InteractionSummary, NpcMemory};
use crate::types::{
    EventType, Interaction, InteractionContext, MemorableEvent, RelationshipStage, Timestamp,
};

/// What a single recording did to the ledger.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// The interaction as stored.
    pub interaction: Interaction,
    /// The memorable event created, if the interaction was significant enough.
    pub memorable: Option<MemorableEvent>,
    /// Stage before the interaction.
    pub previous_stage: RelationshipStage,
    /// Stage after the interaction.
    pub stage: RelationshipStage,
}

impl RecordOutcome {
    /// Whether the relationship stage moved.
    #[must_use]
    pub fn stage_changed(&self) -> bool {
        self.previous_stage != self.stage
    }
}

/// Record one interaction into `memory` at time `now`.
///
/// Unrecognised event types are stored as trivial interactions and move no
/// counters.
pub fn record(
    memory: &mut NpcMemory,
    event_type: EventType,
    context: InteractionContext,
    now: Timestamp,
) -> RecordOutcome {
    let previous_stage = memory.relationship_stage;

    // --- 1. Classify ---
    let significance = classification::significance(&event_type, context.deal_value);

    let interaction = Interaction {
        event_type,
        timestamp: now,
        context,
        significance,
    };

    // --- 2. History ---
    memory.interactions.push_front(interaction.clone());

    // --- 3. Counters ---
    if let Some(effect) = classification::summary_effect(&interaction.event_type) {
        apply_effect(&mut memory.summary, effect, interaction.context.deal_value);
    }

    // --- 4. Memorable event ---
    let memorable = significance.is_memorable().then(|| MemorableEvent {
        event_type: interaction.event_type.clone(),
        description: classification::describe(
            &interaction.event_type,
            interaction.context.deal_value,
            interaction.context.location.as_deref(),
        ),
        sentiment: classification::sentiment(&interaction.event_type),
        significance,
        timestamp: now,
        can_reference: true,
        referenced_count: 0,
    });
    if let Some(event) = &memorable {
        memory.memorable_events.push_front(event.clone());
    }

    // --- 5. Derived state ---
    memory.reclassify();

    // --- 6. Bookkeeping ---
    let summary = &mut memory.summary;
    if summary.first_interaction.is_none() {
        summary.first_interaction = Some(now);
    }
    summary.last_interaction = Some(now);
    summary.interaction_count = summary.interaction_count.saturating_add(1);

    debug!(
        npc = %memory.npc_id,
        event = %interaction.event_type,
        significance = significance.level(),
        memorable = memorable.is_some(),
        interactions = summary.interaction_count,
        "Interaction recorded"
    );

    let stage = memory.relationship_stage;
    if stage != previous_stage {
        info!(
            npc = %memory.npc_id,
            from = %previous_stage,
            to = %stage,
            "Relationship stage changed"
        );
    }

    RecordOutcome {
        interaction,
        memorable,
        previous_stage,
        stage,
    }
}

/// Move the counters `effect` maps to.
pub fn apply_effect(summary: &mut InteractionSummary, effect: SummaryEffect, deal_value: u64) {
    match effect {
        SummaryEffect::DealSucceeded => {
            summary.total_deals += 1;
            summary.successful_deals += 1;
            summary.total_value = summary.total_value.saturating_add(deal_value);
        }
        SummaryEffect::DealFailed => {
            summary.total_deals += 1;
            summary.failed_deals += 1;
        }
        SummaryEffect::Betrayal => summary.betrayals += 1,
        SummaryEffect::FavorGiven => summary.favors_given += 1,
        SummaryEffect::FavorOwed => summary.favors_owed += 1,
    }
}
