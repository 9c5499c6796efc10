//! # Streetcred Core Library
//!
//! Relationship memory for the NPCs of a crime-themed life simulation.
//!
//! Every contact (fence, dealer, fixer, cop on the take) gets an
//! [`NpcMemory`] ledger of the player's dealings with them. From that ledger
//! the engine derives:
//!
//! - **Relationship stage**: stranger → acquaintance → business → friend → trusted,
//!   or enemy after a single betrayal
//! - **Epithets**: what the NPC calls the player in dialogue
//! - **Memorable events**: moments the NPC can bring up ("that $6,000 deal")
//! - **Gossip**: what other NPCs have said about the player
//!
//! All state lives in a [`MemoryStore`] service that the game constructs once
//! per session and persists through a [`persistence::SnapshotSlot`].
//!
//! ## Performance Contract
//!
//! Every operation works on bounded sequences and completes synchronously:
//! - Recording an interaction: < 20μs plus one snapshot write
//! - Relationship classification: < 1μs
//! - Snapshot of 200 NPCs: < 5ms

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classification;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod recall;
pub mod recorder;
pub mod relationship;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use error::StoreError;
pub use memory::{NpcMemory, Recent};
pub use recall::{ReferenceableMemory, RelationshipOverview};
pub use store::{LoadOutcome, MemoryStore, SharedMemoryStore, StoreStats};
pub use types::*;
