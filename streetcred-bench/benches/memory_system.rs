//! Streetcred Benchmark Suite
//!
//! Performance targets:
//!
//! ```text
//! record_interaction_in_memory ..... < 20μs + one snapshot write
//! classify_stage ................... < 1μs
//! encode_snapshot_200_npcs ......... < 5ms
//! referenceable_memories ........... < 5μs
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use streetcred_core::memory::NpcMemory;
use streetcred_core::persistence::{self, InMemorySlot};
use streetcred_core::{
    EventKind, InteractionContext, MemoryStore, NpcId, recall, recorder, relationship,
};

const MIX: [EventKind; 6] = [
    EventKind::SmallTalk,
    EventKind::DealCompleted,
    EventKind::FavorGiven,
    EventKind::JobCompleted,
    EventKind::DealFailed,
    EventKind::TrustEarned,
];

fn seasoned_memory(id: u32, interactions: u32) -> NpcMemory {
    let mut memory = NpcMemory::new(NpcId::new(format!("npc-{id}")));
    let now = Utc::now();
    for i in 0..interactions {
        let kind = MIX[i as usize % MIX.len()];
        let context = InteractionContext::deal(u64::from(i) * 250).at("the docks");
        recorder::record(&mut memory, kind.into(), context, now);
    }
    memory
}

/// Benchmark: one recorded interaction including the snapshot write.
fn bench_record_interaction(c: &mut Criterion) {
    let mut store = MemoryStore::open(Box::new(InMemorySlot::new()));
    let sal = NpcId::from("sal");
    c.bench_function("record_interaction_in_memory", |b| {
        b.iter(|| {
            let interaction = store.record_interaction(
                black_box(&sal),
                EventKind::DealCompleted,
                InteractionContext::deal(black_box(6_000)),
            );
            black_box(interaction);
        });
    });
}

/// Benchmark: stage classification over a full ledger.
fn bench_classify(c: &mut Criterion) {
    let memory = seasoned_memory(0, 150);
    c.bench_function("classify_stage", |b| {
        b.iter(|| {
            let stage = relationship::classify_stage(
                black_box(&memory.summary),
                black_box(&memory.memorable_events),
            );
            black_box(stage);
        });
    });
}

/// Benchmark: whole-store snapshot encoding.
fn bench_encode_snapshot(c: &mut Criterion) {
    let records: BTreeMap<NpcId, NpcMemory> = (0..200)
        .map(|i| {
            let memory = seasoned_memory(i, 30);
            (memory.npc_id.clone(), memory)
        })
        .collect();
    c.bench_function("encode_snapshot_200_npcs", |b| {
        b.iter(|| {
            let bytes = persistence::encode_snapshot(black_box(&records), Utc::now());
            black_box(bytes)
        });
    });
}

/// Benchmark: dialogue query for referenceable memories.
fn bench_referenceable(c: &mut Criterion) {
    let memory = seasoned_memory(1, 60);
    let now = Utc::now();
    c.bench_function("referenceable_memories", |b| {
        b.iter(|| {
            let memories = recall::referenceable(black_box(&memory), 3, now);
            black_box(memories)
        });
    });
}

criterion_group!(
    benches,
    bench_record_interaction,
    bench_classify,
    bench_encode_snapshot,
    bench_referenceable,
);
criterion_main!(benches);
