//! Core type definitions for the relationship memory engine.
//!
//! All types are serializable; the snapshot format is plain JSON of these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wall-clock instant used for every timestamp in the ledger.
pub type Timestamp = DateTime<Utc>;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Stable identifier of an NPC. Any string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NpcId(pub String);

impl NpcId {
    /// Create an NPC id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NpcId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NpcId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Significance & Sentiment
// ---------------------------------------------------------------------------

/// How much an interaction matters to the NPC, 1 (trivial) to 5 (legendary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    /// Background noise: small talk, unrecognised events.
    Trivial = 1,
    /// Routine business.
    Minor = 2,
    /// Worth remembering.
    Moderate = 3,
    /// Shapes the relationship.
    Major = 4,
    /// Talked about for years.
    Legendary = 5,
}

impl Significance {
    /// Numeric level, 1..=5.
    #[must_use]
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Whether an interaction of this significance becomes a memorable event.
    #[must_use]
    pub fn is_memorable(self) -> bool {
        self >= Self::Moderate
    }
}

/// Emotional colour of a memorable event from the NPC's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// The NPC looks back on it fondly.
    Positive,
    /// The NPC holds it against the player.
    Negative,
    /// Neither.
    Neutral,
}

// ---------------------------------------------------------------------------
// Relationship Stage
// ---------------------------------------------------------------------------

/// Where the player stands with an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStage {
    /// Never dealt with, or barely.
    #[default]
    Stranger,
    /// Seen around.
    Acquaintance,
    /// Regular business contact.
    Business,
    /// Personal loyalty beyond business.
    Friend,
    /// Ride-or-die.
    Trusted,
    /// Betrayed at least once. Permanent.
    Enemy,
}

impl RelationshipStage {
    /// Every stage, in ascending order of trust (enemy last).
    pub const ALL: [Self; 6] = [
        Self::Stranger,
        Self::Acquaintance,
        Self::Business,
        Self::Friend,
        Self::Trusted,
        Self::Enemy,
    ];

    /// Lowercase label, matching the serialized form.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Stranger => "stranger",
            Self::Acquaintance => "acquaintance",
            Self::Business => "business",
            Self::Friend => "friend",
            Self::Trusted => "trusted",
            Self::Enemy => "enemy",
        }
    }
}

impl fmt::Display for RelationshipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Event Types
// ---------------------------------------------------------------------------

/// The interaction kinds the classification tables know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// The player and NPC meet for the first time.
    FirstMeeting,
    /// Idle chatter.
    SmallTalk,
    /// A deal went through.
    DealCompleted,
    /// A deal fell apart.
    DealFailed,
    /// The player sold the NPC out.
    DealBetrayed,
    /// The player took a job from the NPC.
    JobAccepted,
    /// The player turned a job down.
    JobDeclined,
    /// The player finished a job.
    JobCompleted,
    /// The player screwed a job up.
    JobBotched,
    /// The player did the NPC a favor.
    FavorGiven,
    /// The NPC did the player a favor.
    FavorReceived,
    /// The player proved trustworthy.
    TrustEarned,
    /// The player broke the NPC's trust (short of betrayal).
    TrustBroken,
    /// The player got the NPC out of trouble.
    Rescued,
    /// The two pulled off a big score together.
    BigScore,
    /// The NPC forgave the player.
    Forgiven,
    /// The player made amends.
    MadeAmends,
}

impl EventKind {
    /// Every recognised kind.
    pub const ALL: [Self; 17] = [
        Self::FirstMeeting,
        Self::SmallTalk,
        Self::DealCompleted,
        Self::DealFailed,
        Self::DealBetrayed,
        Self::JobAccepted,
        Self::JobDeclined,
        Self::JobCompleted,
        Self::JobBotched,
        Self::FavorGiven,
        Self::FavorReceived,
        Self::TrustEarned,
        Self::TrustBroken,
        Self::Rescued,
        Self::BigScore,
        Self::Forgiven,
        Self::MadeAmends,
    ];

    /// Wire tag, e.g. `DEAL_COMPLETED`.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::FirstMeeting => "FIRST_MEETING",
            Self::SmallTalk => "SMALL_TALK",
            Self::DealCompleted => "DEAL_COMPLETED",
            Self::DealFailed => "DEAL_FAILED",
            Self::DealBetrayed => "DEAL_BETRAYED",
            Self::JobAccepted => "JOB_ACCEPTED",
            Self::JobDeclined => "JOB_DECLINED",
            Self::JobCompleted => "JOB_COMPLETED",
            Self::JobBotched => "JOB_BOTCHED",
            Self::FavorGiven => "FAVOR_GIVEN",
            Self::FavorReceived => "FAVOR_RECEIVED",
            Self::TrustEarned => "TRUST_EARNED",
            Self::TrustBroken => "TRUST_BROKEN",
            Self::Rescued => "RESCUED",
            Self::BigScore => "BIG_SCORE",
            Self::Forgiven => "FORGIVEN",
            Self::MadeAmends => "MADE_AMENDS",
        }
    }

    /// Look a kind up by its wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The type of an incoming interaction event.
///
/// Callers upstream validate requests, not event vocabularies, so tags the
/// engine does not recognise are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// A kind the classification tables cover.
    Known(EventKind),
    /// Anything else. Classified as trivial, touches no counters.
    Other(String),
}

impl EventType {
    /// The recognised kind, if any.
    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Known(kind) => Some(*kind),
            Self::Other(_) => None,
        }
    }

    /// Wire tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Known(kind) => kind.tag(),
            Self::Other(tag) => tag,
        }
    }
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        Self::Known(kind)
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match EventKind::from_tag(&tag) {
            Some(kind) => Self::Known(kind),
            None => Self::Other(tag),
        }
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Known(kind) => kind.tag().to_string(),
            EventType::Other(tag) => tag,
        }
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Ledger entries
// ---------------------------------------------------------------------------

/// Circumstances of an interaction, as reported by the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionContext {
    /// Where it happened, if the game knows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Money that changed hands, in whole dollars.
    #[serde(default)]
    pub deal_value: u64,
    /// Player level at the time.
    #[serde(default)]
    pub player_level: u32,
    /// Player heat (police attention) at the time.
    #[serde(default)]
    pub player_heat: u32,
    /// Free-form details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl InteractionContext {
    /// Context for a deal of the given value.
    #[must_use]
    pub fn deal(deal_value: u64) -> Self {
        Self {
            deal_value,
            ..Self::default()
        }
    }

    /// Attach a location.
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// One recorded interaction. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// What happened.
    pub event_type: EventType,
    /// When it was recorded.
    pub timestamp: Timestamp,
    /// Circumstances.
    pub context: InteractionContext,
    /// Classified significance.
    pub significance: Significance,
}

/// A moment the NPC may bring up in dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorableEvent {
    /// The interaction type that created it.
    pub event_type: EventType,
    /// Rendered description, e.g. "closed a $6,000 deal together".
    pub description: String,
    /// How the NPC feels about it.
    pub sentiment: Sentiment,
    /// Significance of the originating interaction.
    pub significance: Significance,
    /// When it happened.
    pub timestamp: Timestamp,
    /// Whether dialogue may still reference it.
    pub can_reference: bool,
    /// How many times dialogue has referenced it.
    pub referenced_count: u32,
}

impl MemorableEvent {
    /// Count one dialogue reference. Once `limit` is reached the event is
    /// retired for good.
    pub fn record_reference(&mut self, limit: u32) {
        self.referenced_count = self.referenced_count.saturating_add(1);
        if self.referenced_count >= limit {
            self.can_reference = false;
        }
    }
}

/// Something one NPC told another about the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipItem {
    /// Who said it.
    pub from: NpcId,
    /// What was said.
    pub content: String,
    /// When it was heard.
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_parses_known_tags() {
        assert_eq!(
            EventType::from("DEAL_COMPLETED"),
            EventType::Known(EventKind::DealCompleted)
        );
        assert_eq!(
            EventType::from("TAGGED_WALL"),
            EventType::Other("TAGGED_WALL".to_string())
        );
    }

    #[test]
    fn every_kind_round_trips_through_its_tag() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn event_type_serializes_as_plain_tag() {
        let json = serde_json::to_string(&EventType::Known(EventKind::BigScore)).expect("ser");
        assert_eq!(json, "\"BIG_SCORE\"");
        let other: EventType = serde_json::from_str("\"ARSON\"").expect("de");
        assert_eq!(other.tag(), "ARSON");
        assert!(other.kind().is_none());
    }

    #[test]
    fn kind_serde_matches_tag() {
        for kind in EventKind::ALL {
            let json = serde_json::to_string(&kind).expect("ser");
            assert_eq!(json, format!("\"{}\"", kind.tag()));
        }
    }

    #[test]
    fn significance_ordering() {
        assert!(Significance::Legendary > Significance::Major);
        assert!(Significance::Moderate.is_memorable());
        assert!(!Significance::Minor.is_memorable());
        assert_eq!(Significance::Legendary.level(), 5);
    }

    #[test]
    fn reference_limit_retires_event() {
        let mut event = MemorableEvent {
            event_type: EventKind::Rescued.into(),
            description: "pulled me out of a raid".to_string(),
            sentiment: Sentiment::Positive,
            significance: Significance::Legendary,
            timestamp: Utc::now(),
            can_reference: true,
            referenced_count: 0,
        };
        event.record_reference(3);
        event.record_reference(3);
        assert!(event.can_reference);
        event.record_reference(3);
        assert!(!event.can_reference);
        event.record_reference(3);
        assert!(!event.can_reference);
        assert_eq!(event.referenced_count, 4);
    }
}
