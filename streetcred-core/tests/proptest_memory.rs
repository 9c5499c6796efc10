//! Property-Based Tests for the relationship ledger
//!
//! Uses `proptest` to check ledger invariants under arbitrary event
//! sequences: capacity bounds, counter monotonicity, the enemy override and
//! gossip alignment.

use proptest::prelude::*;

use streetcred_core::memory::{GOSSIP_CAPACITY, INTERACTION_CAPACITY, MEMORABLE_CAPACITY};
use streetcred_core::persistence::{self, InMemorySlot};
use streetcred_core::relationship;
use streetcred_core::{
    EventKind, EventType, InteractionContext, MemoryStore, NpcId, RelationshipStage,
};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_event_type() -> impl Strategy<Value = EventType> {
    let known = proptest::sample::select(EventKind::ALL.to_vec());
    prop_oneof![
        4 => known.prop_map(EventType::from),
        1 => "[A-Z_]{3,12}".prop_map(EventType::from),
    ]
}

fn located_deal((value, location): (u64, Option<String>)) -> InteractionContext {
    InteractionContext {
        location,
        ..InteractionContext::deal(value)
    }
}

fn arb_context() -> impl Strategy<Value = InteractionContext> {
    let location = proptest::option::of("[a-z ]{1,12}");
    (0u64..20_000, location).prop_map(located_deal)
}

fn arb_rumours() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec(("[a-z]{1,6}", "[a-z ]{0,20}"), 0..30)
}

fn arb_events(max: usize) -> impl Strategy<Value = Vec<(EventType, InteractionContext)>> {
    proptest::collection::vec((arb_event_type(), arb_context()), 0..max)
}

fn fresh_store() -> MemoryStore {
    MemoryStore::open(Box::new(InMemorySlot::new()))
}

// ---------------------------------------------------------------------------
// Property: bounded sequences never exceed capacity; count is exact
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn ledger_stays_bounded(events in arb_events(160)) {
        let mut store = fresh_store();
        let sal = NpcId::from("sal");
        for (event_type, context) in &events {
            store.record_interaction(&sal, event_type.clone(), context.clone());
        }
        let memory = store.get(&sal);
        prop_assert!(memory.interactions.len() <= INTERACTION_CAPACITY);
        prop_assert!(memory.memorable_events.len() <= MEMORABLE_CAPACITY);
        let expected_len = events.len().min(INTERACTION_CAPACITY);
        prop_assert_eq!(memory.interactions.len(), expected_len);
        let summary = &memory.summary;
        prop_assert_eq!(summary.interaction_count as usize, events.len());
        let settled = summary.successful_deals + summary.failed_deals;
        prop_assert_eq!(settled, summary.total_deals);
    }
}

// ---------------------------------------------------------------------------
// Property: history is newest first
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn newest_interaction_is_last_recorded(events in arb_events(40)) {
        prop_assume!(!events.is_empty());
        let mut store = fresh_store();
        let sal = NpcId::from("sal");
        for (event_type, context) in &events {
            store.record_interaction(&sal, event_type.clone(), context.clone());
        }
        let (last_type, last_context) = events.last().expect("non-empty");
        let newest = store
            .get(&sal)
            .interactions
            .newest()
            .expect("recorded")
            .clone();
        prop_assert_eq!(&newest.event_type, last_type);
        prop_assert_eq!(&newest.context, last_context);
    }
}

// ---------------------------------------------------------------------------
// Property: one betrayal pins the stage at enemy
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn betrayal_pins_enemy(before in arb_events(30), after in arb_events(30)) {
        let mut store = fresh_store();
        let sal = NpcId::from("sal");
        for (event_type, context) in before {
            store.record_interaction(&sal, event_type, context);
        }
        let betrayal = InteractionContext::default();
        store.record_interaction(&sal, EventKind::DealBetrayed, betrayal);
        let enemy = RelationshipStage::Enemy;
        prop_assert_eq!(store.get(&sal).relationship_stage, enemy);
        for (event_type, context) in after {
            store.record_interaction(&sal, event_type, context);
            prop_assert_eq!(store.get(&sal).relationship_stage, enemy);
        }
    }
}

// ---------------------------------------------------------------------------
// Property: without betrayals the stage matches the trust score
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn stage_is_derived_from_score(events in arb_events(60)) {
        let mut store = fresh_store();
        let sal = NpcId::from("sal");
        for (event_type, context) in events {
            if event_type == EventType::from(EventKind::DealBetrayed) {
                continue;
            }
            store.record_interaction(&sal, event_type, context);
        }
        let memory = store.get(&sal);
        // Stage is derived before the last interaction bumps the count.
        let mut summary = memory.summary.clone();
        summary.interaction_count = summary.interaction_count.saturating_sub(1);
        let expected = relationship::classify_stage(&summary, &memory.memorable_events);
        prop_assert_eq!(memory.relationship_stage, expected);
        let met = memory.summary.interaction_count > 0;
        prop_assert!(!met || !memory.player_epithets.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Property: gossip lists stay aligned
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn gossip_lists_stay_aligned(rumours in arb_rumours()) {
        let mut store = fresh_store();
        let target = NpcId::from("target");
        for (source, content) in &rumours {
            let source = NpcId::from(source.as_str());
            store.add_gossip(&target, &source, content.clone());
        }
        let gossip = store.get(&target).gossip.clone();
        prop_assert_eq!(gossip.heard_from.len(), gossip.content.len());
        prop_assert_eq!(gossip.len(), rumours.len().min(GOSSIP_CAPACITY));
        for (source, item) in gossip.heard_from.iter().zip(&gossip.content) {
            prop_assert_eq!(source, &item.from);
        }
        prop_assert!(store.get_gossip(&target).len() <= 3);
    }
}

// ---------------------------------------------------------------------------
// Property: snapshots restore exactly
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn snapshot_restores_identical_ledgers(events in arb_events(50)) {
        let slot = InMemorySlot::new();
        let mut store = MemoryStore::open(Box::new(slot.clone()));
        for (i, (event_type, context)) in events.into_iter().enumerate() {
            let id = NpcId::new(format!("npc-{}", i % 3));
            store.record_interaction(&id, event_type, context);
        }
        let ids: Vec<NpcId> = store.npc_ids().cloned().collect();

        let reopened = MemoryStore::open(Box::new(slot.clone()));
        for id in &ids {
            prop_assert_eq!(reopened.peek(id), store.peek(id));
        }
        if let Some(bytes) = slot.contents() {
            let snapshot = persistence::decode_snapshot(&bytes).expect("decode");
            prop_assert_eq!(snapshot.records.len(), ids.len());
        }
    }
}
