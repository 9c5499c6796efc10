//! Classification tables: event type → significance, sentiment, summary
//! effect, description; relationship stage → epithet pool.
//!
//! The rules live here as data so they can be audited and extended without
//! touching the recorder. Kinds missing from a table fall back to the
//! table's default (trivial, neutral, no effect).

use crate::types::{EventKind, EventType, RelationshipStage, Sentiment, Significance};

// ---------------------------------------------------------------------------
// Significance
// ---------------------------------------------------------------------------

/// How the significance of a kind is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignificanceRule {
    /// Always this tier.
    Fixed(Significance),
    /// Tiered by the deal value of the interaction.
    ByDealValue,
}

/// Deal value above which a completion is [`Significance::Major`].
pub const MAJOR_DEAL_VALUE: u64 = 5_000;
/// Deal value above which a completion is [`Significance::Moderate`].
pub const MODERATE_DEAL_VALUE: u64 = 1_000;

const LEGENDARY: SignificanceRule = SignificanceRule::Fixed(Significance::Legendary);
const MAJOR: SignificanceRule = SignificanceRule::Fixed(Significance::Major);
const MODERATE: SignificanceRule = SignificanceRule::Fixed(Significance::Moderate);
const MINOR: SignificanceRule = SignificanceRule::Fixed(Significance::Minor);

/// Significance rules for recognised kinds.
pub const SIGNIFICANCE_TABLE: &[(EventKind, SignificanceRule)] = &[
    (EventKind::DealCompleted, SignificanceRule::ByDealValue),
    (EventKind::JobCompleted, SignificanceRule::ByDealValue),
    (EventKind::DealBetrayed, LEGENDARY),
    (EventKind::Rescued, LEGENDARY),
    (EventKind::BigScore, LEGENDARY),
    (EventKind::TrustEarned, MAJOR),
    (EventKind::TrustBroken, MAJOR),
    (EventKind::Forgiven, MAJOR),
    (EventKind::MadeAmends, MAJOR),
    (EventKind::FirstMeeting, MODERATE),
    (EventKind::DealFailed, MODERATE),
    (EventKind::JobBotched, MODERATE),
    (EventKind::FavorGiven, MODERATE),
    (EventKind::FavorReceived, MODERATE),
    (EventKind::JobAccepted, MINOR),
    (EventKind::JobDeclined, MINOR),
];

/// Tier for a completion of the given value.
#[must_use]
pub fn deal_value_tier(deal_value: u64) -> Significance {
    if deal_value > MAJOR_DEAL_VALUE {
        Significance::Major
    } else if deal_value > MODERATE_DEAL_VALUE {
        Significance::Moderate
    } else {
        Significance::Minor
    }
}

/// Significance of an interaction of `event_type` worth `deal_value`.
#[must_use]
pub fn significance(event_type: &EventType, deal_value: u64) -> Significance {
    let Some(kind) = event_type.kind() else {
        return Significance::Trivial;
    };
    match lookup(SIGNIFICANCE_TABLE, kind) {
        Some(SignificanceRule::Fixed(tier)) => tier,
        Some(SignificanceRule::ByDealValue) => deal_value_tier(deal_value),
        None => Significance::Trivial,
    }
}

/// Whether the type alone (ignoring deal value) is legendary.
#[must_use]
pub fn is_legendary_type(event_type: &EventType) -> bool {
    event_type.kind().is_some_and(|kind| {
        lookup(SIGNIFICANCE_TABLE, kind)
            == Some(SignificanceRule::Fixed(Significance::Legendary))
    })
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// How the NPC feels about each kind.
pub const SENTIMENT_TABLE: &[(EventKind, Sentiment)] = &[
    (EventKind::DealCompleted, Sentiment::Positive),
    (EventKind::JobCompleted, Sentiment::Positive),
    (EventKind::JobAccepted, Sentiment::Positive),
    (EventKind::FavorGiven, Sentiment::Positive),
    (EventKind::TrustEarned, Sentiment::Positive),
    (EventKind::Rescued, Sentiment::Positive),
    (EventKind::BigScore, Sentiment::Positive),
    (EventKind::Forgiven, Sentiment::Positive),
    (EventKind::MadeAmends, Sentiment::Positive),
    (EventKind::DealFailed, Sentiment::Negative),
    (EventKind::DealBetrayed, Sentiment::Negative),
    (EventKind::JobDeclined, Sentiment::Negative),
    (EventKind::JobBotched, Sentiment::Negative),
    (EventKind::TrustBroken, Sentiment::Negative),
    (EventKind::FirstMeeting, Sentiment::Neutral),
    (EventKind::SmallTalk, Sentiment::Neutral),
    (EventKind::FavorReceived, Sentiment::Neutral),
];

/// Sentiment for an event type; unrecognised types are neutral.
#[must_use]
pub fn sentiment(event_type: &EventType) -> Sentiment {
    event_type
        .kind()
        .and_then(|kind| lookup(SENTIMENT_TABLE, kind))
        .unwrap_or(Sentiment::Neutral)
}

// ---------------------------------------------------------------------------
// Summary effects
// ---------------------------------------------------------------------------

/// Which counters an event kind moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryEffect {
    /// `total_deals`, `successful_deals`, `total_value`.
    DealSucceeded,
    /// `total_deals`, `failed_deals`.
    DealFailed,
    /// `betrayals`.
    Betrayal,
    /// `favors_given`.
    FavorGiven,
    /// `favors_owed`.
    FavorOwed,
}

/// Counter effects for recognised kinds. Absent kinds move nothing.
pub const SUMMARY_EFFECT_TABLE: &[(EventKind, SummaryEffect)] = &[
    (EventKind::DealCompleted, SummaryEffect::DealSucceeded),
    (EventKind::DealFailed, SummaryEffect::DealFailed),
    (EventKind::JobBotched, SummaryEffect::DealFailed),
    (EventKind::DealBetrayed, SummaryEffect::Betrayal),
    (EventKind::FavorGiven, SummaryEffect::FavorGiven),
    (EventKind::FavorReceived, SummaryEffect::FavorOwed),
];

/// Counter effect for an event type, if any.
#[must_use]
pub fn summary_effect(event_type: &EventType) -> Option<SummaryEffect> {
    event_type
        .kind()
        .and_then(|kind| lookup(SUMMARY_EFFECT_TABLE, kind))
}

// ---------------------------------------------------------------------------
// Description templates
// ---------------------------------------------------------------------------

/// Description for unrecognised types.
pub const FALLBACK_DESCRIPTION: &str = "something happened between us";

/// Memorable-event templates. `{value}` renders the deal value as dollars,
/// `{location}` renders as " at <place>" or nothing.
pub const DESCRIPTION_TABLE: &[(EventKind, &str)] = &[
    (EventKind::FirstMeeting, "the first time we met{location}"),
    (
        EventKind::SmallTalk,
        "that time we shot the breeze{location}",
    ),
    (
        EventKind::DealCompleted,
        "that {value} deal we closed{location}",
    ),
    (EventKind::DealFailed, "that deal that fell apart{location}"),
    (EventKind::DealBetrayed, "when you sold me out{location}"),
    (EventKind::JobAccepted, "when you took that job{location}"),
    (EventKind::JobDeclined, "when you turned down my job"),
    (
        EventKind::JobCompleted,
        "that {value} job you pulled off{location}",
    ),
    (EventKind::JobBotched, "the job you botched{location}"),
    (EventKind::FavorGiven, "that favor you did me{location}"),
    (EventKind::FavorReceived, "the favor I did you{location}"),
    (
        EventKind::TrustEarned,
        "when you proved you could be trusted",
    ),
    (EventKind::TrustBroken, "when you broke my trust"),
    (
        EventKind::Rescued,
        "when you pulled me out of the fire{location}",
    ),
    (EventKind::BigScore, "the {value} score we pulled{location}"),
    (EventKind::Forgiven, "when I let it slide"),
    (EventKind::MadeAmends, "when you made things right"),
];

/// Render the memorable-event description for an interaction.
#[must_use]
pub fn describe(event_type: &EventType, deal_value: u64, location: Option<&str>) -> String {
    let Some(template) = event_type
        .kind()
        .and_then(|kind| lookup(DESCRIPTION_TABLE, kind))
    else {
        return FALLBACK_DESCRIPTION.to_string();
    };
    let location = location
        .filter(|place| !place.trim().is_empty())
        .map(|place| format!(" at {place}"))
        .unwrap_or_default();
    template
        .replace("{value}", &format_dollars(deal_value))
        .replace("{location}", &location)
}

/// Format whole dollars with thousands separators, e.g. `$12,500`.
#[must_use]
pub fn format_dollars(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ---------------------------------------------------------------------------
// Epithets
// ---------------------------------------------------------------------------

/// Base epithet pool per relationship stage.
pub const EPITHET_POOLS: &[(RelationshipStage, &[&str])] = &[
    (
        RelationshipStage::Stranger,
        &["stranger", "new face", "outsider"],
    ),
    (RelationshipStage::Acquaintance, &["kid", "rookie", "buddy"]),
    (
        RelationshipStage::Business,
        &["partner", "associate", "business man"],
    ),
    (RelationshipStage::Friend, &["friend", "brother", "homie"]),
    (
        RelationshipStage::Trusted,
        &["legend", "blood", "family", "ride-or-die"],
    ),
    (RelationshipStage::Enemy, &["rat", "snake", "traitor"]),
];

/// The base pool for a stage.
#[must_use]
pub fn epithet_pool(stage: RelationshipStage) -> &'static [&'static str] {
    lookup(EPITHET_POOLS, stage).unwrap_or(&[])
}

fn lookup<K: PartialEq + Copy, V: Copy>(table: &[(K, V)], key: K) -> Option<V> {
    table
        .iter()
        .find(|(entry, _)| *entry == key)
        .map(|(_, value)| *value)
}
