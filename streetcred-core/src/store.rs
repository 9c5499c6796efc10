//! The memory store service.
//!
//! One [`MemoryStore`] owns every NPC ledger for a play session. Game code
//! records interactions and gossip through it and dialogue code reads
//! through its query methods. Every mutation is followed by a synchronous
//! whole-store snapshot write; a failed write is logged and counted, and the
//! in-memory state stays authoritative.
//!
//! ```no_run
//! use streetcred_core::persistence::InMemorySlot;
//! use streetcred_core::{EventKind, InteractionContext, MemoryStore, NpcId};
//!
//! let mut store = MemoryStore::open(Box::new(InMemorySlot::new()));
//! let sal = NpcId::from("sal");
//! store.record_interaction(&sal, EventKind::DealCompleted, InteractionContext::deal(6_000));
//! println!("{}", store.get_epithet(&sal));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{DialogueConfig, StoreConfig};
use crate::error::Result;
use crate::events::{ListenerRegistry, ListenerResult, MemoryEvent, Subscription};
use crate::memory::NpcMemory;
use crate::metrics::StoreCounters;
use crate::persistence::{self, SnapshotSlot};
use crate::recall::{self, ReferenceableMemory, RelationshipOverview};
use crate::recorder;
use crate::types::{EventType, GossipItem, Interaction, InteractionContext, NpcId};

/// A store shared between threads. Every call takes the one lock, so all
/// mutation is serialised.
pub type SharedMemoryStore = Arc<Mutex<MemoryStore>>;

/// Result of loading the persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A snapshot was found and decoded.
    Restored {
        /// Ledgers restored.
        npcs: usize,
    },
    /// The slot held nothing.
    Empty,
    /// The slot could not be read or the snapshot was unusable; the store
    /// started empty.
    Failed,
}

/// Aggregate figures over every ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Ledgers held.
    pub npc_count: usize,
    /// Sum of every ledger's interaction count.
    pub total_interactions: u64,
    /// Memorable events currently retained.
    pub memorable_event_count: usize,
}

/// Owner of every NPC's relationship ledger.
pub struct MemoryStore {
    records: BTreeMap<NpcId, NpcMemory>,
    slot: Box<dyn SnapshotSlot>,
    listeners: ListenerRegistry,
    clock: Arc<dyn Clock>,
    dialogue: DialogueConfig,
    counters: StoreCounters,
    load_outcome: Option<LoadOutcome>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("npcs", &self.records.len())
            .field("slot", &self.slot.describe())
            .field("listeners", &self.listeners.len())
            .field("load_outcome", &self.load_outcome)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    // -----------------------------------------------------------------------
    // Construction & lifecycle
    // -----------------------------------------------------------------------

    /// An unloaded store backed by `slot`. Call [`Self::initialize`] before use.
    #[must_use]
    pub fn new(slot: Box<dyn SnapshotSlot>) -> Self {
        Self {
            records: BTreeMap::new(),
            slot,
            listeners: ListenerRegistry::new(),
            clock: Arc::new(SystemClock),
            dialogue: DialogueConfig::default(),
            counters: StoreCounters::new(),
            load_outcome: None,
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the dialogue query tuning.
    #[must_use]
    pub fn with_dialogue_config(mut self, dialogue: DialogueConfig) -> Self {
        self.dialogue = dialogue;
        self
    }

    /// Build a store on `slot` and load it.
    #[must_use]
    pub fn open(slot: Box<dyn SnapshotSlot>) -> Self {
        let mut store = Self::new(slot);
        store.initialize();
        store
    }

    /// Build the configured slot and open a store on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured slot cannot be opened.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let slot = persistence::open_slot(&config.persistence)?;
        let mut store = Self::new(slot)
            .with_dialogue_config(config.dialogue.clone());
        store.initialize();
        Ok(store)
    }

    /// Load the persisted snapshot. Only the first call reads the slot;
    /// later calls return the first outcome.
    ///
    /// A missing, unreadable, corrupt or too-new snapshot leaves the store
    /// empty. Nothing is returned as an error.
    pub fn initialize(&mut self) -> LoadOutcome {
        if let Some(outcome) = self.load_outcome {
            return outcome;
        }
        let start = Instant::now();
        let outcome = self.load();
        let elapsed = start.elapsed();
        info!(
            slot = %self.slot.describe(),
            outcome = ?outcome,
            elapsed_us = elapsed.as_micros(),
            "Memory store initialized"
        );
        self.load_outcome = Some(outcome);
        outcome
    }

    fn load(&mut self) -> LoadOutcome {
        let bytes = match self.slot.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return LoadOutcome::Empty,
            Err(e) => {
                warn!(error = %e, "Failed to read memory snapshot, starting empty");
                return LoadOutcome::Failed;
            }
        };
        let snapshot = match persistence::decode_snapshot(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, bytes = bytes.len(), "Unusable memory snapshot, starting empty");
                return LoadOutcome::Failed;
            }
        };

        let mut records = snapshot.records;
        let mut migrated = 0usize;
        for memory in records.values_mut() {
            if memory.migrate() {
                migrated += 1;
            }
        }
        let npcs = records.len();
        self.records = records;

        if migrated > 0 {
            info!(migrated, "Migrated legacy NPC records");
            self.persist();
        }
        LoadOutcome::Restored { npcs }
    }

    /// Outcome of the load, `None` before [`Self::initialize`].
    #[must_use]
    pub fn load_outcome(&self) -> Option<LoadOutcome> {
        self.load_outcome
    }

    /// Wrap the store for use from several threads.
    #[must_use]
    pub fn into_shared(self) -> SharedMemoryStore {
        Arc::new(Mutex::new(self))
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// The ledger for `npc_id`, created as a stranger if absent.
    ///
    /// Creating a ledger does not write a snapshot; it is saved with the next
    /// mutation.
    pub fn get(&mut self, npc_id: &NpcId) -> &NpcMemory {
        self.record_mut(npc_id)
    }

    /// The ledger for `npc_id` if one exists.
    #[must_use]
    pub fn peek(&self, npc_id: &NpcId) -> Option<&NpcMemory> {
        self.records.get(npc_id)
    }

    /// Every NPC with a ledger, in id order.
    pub fn npc_ids(&self) -> impl Iterator<Item = &NpcId> {
        self.records.keys()
    }

    /// Drop every ledger and erase the persisted snapshot.
    pub fn clear_all(&mut self) {
        let npcs = self.records.len();
        self.records.clear();
        if let Err(e) = self.slot.erase() {
            StoreCounters::incr(&self.counters.save_failures);
            warn!(error = %e, "Failed to erase persisted memories");
        }
        info!(npcs, "All NPC memories cleared");
    }

    /// Aggregate figures. Walks every ledger.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for memory in self.records.values() {
            stats.npc_count += 1;
            stats.total_interactions += u64::from(memory.summary.interaction_count);
            stats.memorable_event_count += memory.memorable_events.len();
        }
        stats
    }

    /// Write a snapshot now.
    ///
    /// # Errors
    ///
    /// Returns the encoding or slot error. Unlike the automatic saves after
    /// each mutation, the failure is handed to the caller.
    pub fn flush(&self) -> Result<()> {
        let start = Instant::now();
        let saved_at = self.clock.now();
        let bytes = persistence::encode_snapshot(&self.records, saved_at)?;
        self.slot.write(&bytes, saved_at)?;
        StoreCounters::incr(&self.counters.saves_completed);
        debug!(
            npcs = self.records.len(),
            bytes = bytes.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Memory snapshot saved"
        );
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            StoreCounters::incr(&self.counters.save_failures);
            warn!(error = %e, slot = %self.slot.describe(), "Failed to save memory snapshot");
        }
    }

    fn record_mut(&mut self, npc_id: &NpcId) -> &mut NpcMemory {
        self.records
            .entry(npc_id.clone())
            .or_insert_with(|| NpcMemory::new(npc_id.clone()))
    }

    // -----------------------------------------------------------------------
    // Event recording
    // -----------------------------------------------------------------------

    /// Record an interaction with `npc_id`, save, and notify listeners.
    ///
    /// Unknown event types are accepted as trivial interactions.
    pub fn record_interaction(
        &mut self,
        npc_id: &NpcId,
        event_type: impl Into<EventType>,
        context: InteractionContext,
    ) -> Interaction {
        let event_type = event_type.into();
        let now = self.clock.now();
        let memory = self.record_mut(npc_id);
        let outcome = recorder::record(memory, event_type.clone(), context, now);

        StoreCounters::incr(&self.counters.interactions_recorded);
        if outcome.memorable.is_some() {
            StoreCounters::incr(&self.counters.memorable_events_created);
        }

        self.persist();

        let delivery = self.listeners.emit(&MemoryEvent::Interaction {
            npc_id: npc_id.clone(),
            event_type,
            interaction: outcome.interaction.clone(),
        });
        if delivery.failed > 0 {
            StoreCounters::add(&self.counters.listener_failures, delivery.failed as u64);
        }

        outcome.interaction
    }

    /// Register a listener for store notifications.
    ///
    /// Listeners run on the recording thread. With a [`SharedMemoryStore`]
    /// the store lock is held while they run, so they must not lock it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&MemoryEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    // -----------------------------------------------------------------------
    // Gossip
    // -----------------------------------------------------------------------

    /// Tell `target` something `source` said about the player.
    pub fn add_gossip(&mut self, target: &NpcId, source: &NpcId, content: impl Into<String>) {
        let item = GossipItem {
            from: source.clone(),
            content: content.into(),
            timestamp: self.clock.now(),
        };
        let memory = self.record_mut(target);
        memory.gossip.push(item);
        debug!(npc = %target, from = %source, heard = memory.gossip.len(), "Gossip added");

        StoreCounters::incr(&self.counters.gossip_added);
        self.persist();
    }

    /// The newest gossip `npc_id` has heard, most recent first.
    #[must_use]
    pub fn get_gossip(&self, npc_id: &NpcId) -> Vec<GossipItem> {
        self.peek(npc_id)
            .map(|memory| memory.gossip.recent(self.dialogue.gossip_recent))
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Query surface
    // -----------------------------------------------------------------------

    /// A random epithet `npc_id` might call the player.
    #[must_use]
    pub fn get_epithet(&self, npc_id: &NpcId) -> String {
        self.get_epithet_with(npc_id, &mut rand::thread_rng())
    }

    /// [`Self::get_epithet`] with a caller-supplied RNG.
    #[must_use]
    pub fn get_epithet_with<R: rand::Rng + ?Sized>(&self, npc_id: &NpcId, rng: &mut R) -> String {
        let epithets = self
            .peek(npc_id)
            .map_or(&[][..], |memory| memory.player_epithets.as_slice());
        recall::pick_epithet(epithets, rng)
    }

    /// Up to `limit` memorable events dialogue may still bring up, newest first.
    #[must_use]
    pub fn get_referenceable_memories(
        &self,
        npc_id: &NpcId,
        limit: usize,
    ) -> Vec<ReferenceableMemory> {
        let now = self.clock.now();
        self.peek(npc_id)
            .map(|memory| recall::referenceable(memory, limit, now))
            .unwrap_or_default()
    }

    /// [`Self::get_referenceable_memories`] with the configured limit.
    #[must_use]
    pub fn get_referenceable_memories_default(&self, npc_id: &NpcId) -> Vec<ReferenceableMemory> {
        self.get_referenceable_memories(npc_id, self.dialogue.referenceable_limit)
    }

    /// Count a dialogue reference against the newest memorable event of
    /// `event_type`. Returns `false` (and saves nothing) if there is none.
    pub fn mark_as_referenced(&mut self, npc_id: &NpcId, event_type: impl Into<EventType>) -> bool {
        let event_type = event_type.into();
        let limit = self.dialogue.reference_limit;
        let Some(memory) = self.records.get_mut(npc_id) else {
            return false;
        };
        if !recall::mark_referenced(memory, &event_type, limit) {
            return false;
        }
        debug!(npc = %npc_id, event = %event_type, "Memorable event referenced");
        StoreCounters::incr(&self.counters.references_marked);
        self.persist();
        true
    }

    /// Read-only projection of the relationship with `npc_id`.
    #[must_use]
    pub fn get_relationship_summary(&self, npc_id: &NpcId) -> RelationshipOverview {
        let now = self.clock.now();
        match self.peek(npc_id) {
            Some(memory) => recall::overview(memory, now),
            None => recall::overview(&NpcMemory::new(npc_id.clone()), now),
        }
    }

    /// Whether the player has ever interacted with `npc_id`.
    #[must_use]
    pub fn has_met_player(&self, npc_id: &NpcId) -> bool {
        self.peek(npc_id).is_some_and(NpcMemory::has_met_player)
    }

    /// Activity counters since the store was built.
    #[must_use]
    pub fn counters(&self) -> &StoreCounters {
        &self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::PersistenceConfig;
    use crate::persistence::{InMemorySlot, SqliteSlot};
    use crate::types::{EventKind, RelationshipStage};
    use chrono::{Duration, TimeZone, Utc};

    fn store_with_slot() -> (MemoryStore, InMemorySlot) {
        let slot = InMemorySlot::new();
        let store = MemoryStore::open(Box::new(slot.clone()));
        (store, slot)
    }

    fn small_talk(store: &mut MemoryStore, npc_id: &NpcId) {
        let context = InteractionContext::default();
        store.record_interaction(npc_id, EventKind::SmallTalk, context);
    }

    #[test]
    fn fresh_slot_loads_empty() {
        let (store, _) = store_with_slot();
        assert_eq!(store.load_outcome(), Some(LoadOutcome::Empty));
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn lazy_get_creates_stranger_without_saving() {
        let (mut store, slot) = store_with_slot();
        let memory = store.get(&NpcId::from("vinnie"));
        assert_eq!(memory.relationship_stage, RelationshipStage::Stranger);
        assert_eq!(store.stats().npc_count, 1);
        assert!(slot.contents().is_none());
    }

    #[test]
    fn queries_do_not_create_records() {
        let (store, _) = store_with_slot();
        let ghost = NpcId::from("ghost");
        assert!(store.get_gossip(&ghost).is_empty());
        assert_eq!(store.get_epithet(&ghost), "stranger");
        assert!(
            store
                .get_referenceable_memories_default(&ghost)
                .is_empty()
        );
        assert!(!store.has_met_player(&ghost));
        let overview = store.get_relationship_summary(&ghost);
        assert_eq!(overview.last_seen, "never");
        assert_eq!(store.stats().npc_count, 0);
    }

    #[test]
    fn recording_saves_and_counts() {
        let (mut store, slot) = store_with_slot();
        let sal = NpcId::from("sal");
        let deal = InteractionContext::deal(6_000);
        store.record_interaction(&sal, EventKind::DealCompleted, deal);
        small_talk(&mut store, &sal);

        assert!(slot.contents().is_some());
        let counters = store.counters().snapshot();
        assert_eq!(counters.interactions_recorded, 2);
        assert_eq!(counters.memorable_events_created, 1);
        assert_eq!(counters.saves_completed, 2);
        assert!(store.has_met_player(&sal));
    }

    #[test]
    fn initialize_is_idempotent() {
        let (mut store, _) = store_with_slot();
        small_talk(&mut store, &NpcId::from("sal"));
        assert_eq!(store.initialize(), LoadOutcome::Empty);
        assert_eq!(store.stats().npc_count, 1);
    }

    #[test]
    fn reopening_restores_records() {
        let (mut store, slot) = store_with_slot();
        let sal = NpcId::from("sal");
        let context = InteractionContext::default();
        store.record_interaction(&sal, EventKind::FavorGiven, context);
        store.add_gossip(&sal, &NpcId::from("rosa"), "paid on time");
        drop(store);

        let reopened = MemoryStore::open(Box::new(slot));
        let restored = Some(LoadOutcome::Restored { npcs: 1 });
        assert_eq!(reopened.load_outcome(), restored);
        let memory = reopened.peek(&sal).expect("restored");
        assert_eq!(memory.summary.favors_given, 1);
        assert_eq!(reopened.get_gossip(&sal)[0].content, "paid on time");
    }

    #[test]
    fn garbage_snapshot_fails_to_empty() {
        let slot = InMemorySlot::with_bytes(b"not json".to_vec());
        let store = MemoryStore::open(Box::new(slot));
        assert_eq!(store.load_outcome(), Some(LoadOutcome::Failed));
        assert_eq!(store.stats().npc_count, 0);
    }

    #[test]
    fn clear_all_erases_slot() {
        let (mut store, slot) = store_with_slot();
        small_talk(&mut store, &NpcId::from("sal"));
        store.clear_all();
        assert_eq!(store.stats().npc_count, 0);
        assert!(slot.contents().is_none());
    }

    #[test]
    fn mark_as_referenced_saves_only_on_match() {
        let (mut store, _) = store_with_slot();
        let sal = NpcId::from("sal");
        let nobody = NpcId::from("nobody");
        let context = InteractionContext::default();
        store.record_interaction(&sal, EventKind::Rescued, context);
        let saves = store.counters().snapshot().saves_completed;

        assert!(!store.mark_as_referenced(&sal, EventKind::BigScore));
        assert!(!store.mark_as_referenced(&nobody, EventKind::Rescued));
        assert_eq!(store.counters().snapshot().saves_completed, saves);

        assert!(store.mark_as_referenced(&sal, EventKind::Rescued));
        let counters = store.counters().snapshot();
        assert_eq!(counters.saves_completed, saves + 1);
        assert_eq!(counters.references_marked, 1);
    }

    #[test]
    fn dialogue_config_is_honoured() {
        let dialogue = DialogueConfig {
            referenceable_limit: 1,
            reference_limit: 1,
            gossip_recent: 2,
        };
        let mut store = MemoryStore::open(Box::new(InMemorySlot::new()))
            .with_dialogue_config(dialogue);
        let sal = NpcId::from("sal");
        let context = InteractionContext::default();
        store.record_interaction(&sal, EventKind::FirstMeeting, context.clone());
        store.record_interaction(&sal, EventKind::Rescued, context);
        for i in 0..4 {
            store.add_gossip(&sal, &NpcId::from("rosa"), format!("rumour {i}"));
        }

        let memories = store.get_referenceable_memories_default(&sal);
        assert_eq!(memories.len(), 1);
        assert_eq!(store.get_gossip(&sal).len(), 2);

        assert!(store.mark_as_referenced(&sal, EventKind::Rescued));
        let left = store.get_referenceable_memories_default(&sal);
        let first_meeting = EventType::from(EventKind::FirstMeeting);
        assert_eq!(left[0].event_type, first_meeting);
    }

    #[test]
    fn labels_use_injected_clock() {
        let clock = Arc::new(ManualClock::default());
        let mut store = MemoryStore::open(Box::new(InMemorySlot::new()))
            .with_clock(clock.clone());
        let sal = NpcId::from("sal");
        let context = InteractionContext::default();
        store.record_interaction(&sal, EventKind::TrustEarned, context);

        clock.advance(Duration::days(2));
        let memories = store.get_referenceable_memories(&sal, 3);
        assert_eq!(memories[0].time_ago, "2 days ago");
        let overview = store.get_relationship_summary(&sal);
        assert_eq!(overview.last_seen, "2 days ago");
    }

    #[test]
    fn sqlite_stamp_follows_injected_clock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("contacts.db");
        let config = PersistenceConfig::default();
        let saved_at = Utc
            .with_ymd_and_hms(2011, 9, 17, 23, 45, 0)
            .single()
            .expect("valid date");

        let slot = SqliteSlot::open(&path, &config).expect("open");
        let clock = Arc::new(ManualClock::new(saved_at));
        let mut store = MemoryStore::open(Box::new(slot)).with_clock(clock);
        small_talk(&mut store, &NpcId::from("sal"));
        drop(store);

        let slot = SqliteSlot::open(&path, &config).expect("reopen");
        assert_eq!(slot.updated_at().expect("stamp"), Some(saved_at));
        let bytes = slot.read().expect("read").expect("snapshot");
        let snapshot = persistence::decode_snapshot(&bytes).expect("decode");
        assert_eq!(snapshot.saved_at, saved_at);
    }
}
