//! Data models for decks, cards and review statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::error::{StudyError, StudyResult};

/// Difficulty at or above which a card counts as mastered.
pub const MASTERED_DIFFICULTY: u8 = 3;

/// Difficulty below which a card counts as missed.
pub const MISSED_BELOW: u8 = 2;

/// Opaque identifier for decks and cards.
///
/// Fresh ids are UUID strings. Older data may carry numeric ids, which are
/// kept in their original form so they are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(serde_json::Number),
    Text(String),
}

impl EntityId {
    /// Generate a new random id.
    pub fn generate() -> Self {
        Self::Text(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

pub type DeckId = EntityId;
pub type CardId = EntityId;

/// A flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub front: String,
    pub back: String,
    /// Last rating given, 0 (Again) to 3 (Easy).
    #[serde(default)]
    pub difficulty: u8,
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_image_url: Option<String>,
    /// Legacy single image, shown with the back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Fields written by other versions, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    /// Create a new, never reviewed card.
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            front: front.into(),
            back: back.into(),
            difficulty: 0,
            last_reviewed: None,
            front_image_url: None,
            back_image_url: None,
            image_url: None,
            extra: Map::new(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Image shown alongside the back text.
    pub fn back_image(&self) -> Option<&str> {
        self.back_image_url.as_deref().or(self.image_url.as_deref())
    }

    pub fn is_missed(&self) -> bool {
        self.difficulty < MISSED_BELOW
    }

    pub fn is_mastered(&self) -> bool {
        self.difficulty >= MASTERED_DIFFICULTY
    }

    pub fn is_reviewed(&self) -> bool {
        self.last_reviewed.is_some()
    }
}

/// A named, ordered collection of cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Deck {
    /// Create an empty deck.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.into(),
            cards: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.id == id)
    }

    pub fn card_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| &c.id == id)
    }

    /// Derived statistics, recomputed on every call.
    pub fn stats(&self) -> DeckStats {
        DeckStats::from_cards(&self.cards)
    }
}

/// User rating for a reviewed card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rating {
    /// Complete failure.
    Again = 0,
    /// Difficult recall.
    Hard = 1,
    /// Normal recall.
    Good = 2,
    /// Effortless recall.
    Easy = 3,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Self::Again, Self::Hard, Self::Good, Self::Easy];

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Again => "Again",
            Self::Hard => "Hard",
            Self::Good => "Good",
            Self::Easy => "Easy",
        }
    }

    /// Get associated key.
    pub fn key(&self) -> char {
        match self {
            Self::Again => '1',
            Self::Hard => '2',
            Self::Good => '3',
            Self::Easy => '4',
        }
    }

    pub fn from_key(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == c)
    }

    /// Stored difficulty value.
    pub fn difficulty(self) -> u8 {
        self as u8
    }

    /// Good and Easy count as correct, Again and Hard as incorrect.
    pub fn is_correct(self) -> bool {
        self.difficulty() >= MISSED_BELOW
    }
}

impl TryFrom<u8> for Rating {
    type Error = StudyError;

    fn try_from(value: u8) -> StudyResult<Self> {
        match value {
            0 => Ok(Self::Again),
            1 => Ok(Self::Hard),
            2 => Ok(Self::Good),
            3 => Ok(Self::Easy),
            other => Err(StudyError::validation(format!(
                "difficulty must be between 0 and 3, got {other}"
            ))),
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.difficulty()
    }
}

/// Review totals across every deck and session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_reviews: u64,
    pub correct: u64,
    pub incorrect: u64,
    pub streak_count: u64,
}

impl AggregateStats {
    pub fn record(&mut self, rating: Rating) {
        self.total_reviews += 1;
        if rating.is_correct() {
            self.correct += 1;
            self.streak_count += 1;
        } else {
            self.incorrect += 1;
            self.streak_count = 0;
        }
    }

    /// Accuracy as a rounded percentage, 0 when nothing was reviewed.
    pub fn accuracy(&self) -> u8 {
        percent(self.correct, self.total_reviews)
    }
}

/// Correct/total counts for one study session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    pub correct: usize,
    pub total: usize,
}

impl SessionStats {
    pub fn record(&mut self, rating: Rating) {
        self.total += 1;
        if rating.is_correct() {
            self.correct += 1;
        }
    }

    pub fn accuracy(&self) -> u8 {
        percent(self.correct as u64, self.total as u64)
    }
}

/// Per-deck statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeckStats {
    pub total: usize,
    pub reviewed: usize,
    pub mastered: usize,
    /// Share of cards reviewed at least once, in percent.
    pub progress: u8,
}

impl DeckStats {
    pub fn from_cards(cards: &[Card]) -> Self {
        let total = cards.len();
        let reviewed = cards.iter().filter(|c| c.is_reviewed()).count();
        let mastered = cards.iter().filter(|c| c.is_mastered()).count();
        Self {
            total,
            reviewed,
            mastered,
            progress: percent(reviewed as u64, total as u64),
        }
    }
}

/// Statistics across the whole library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryStats {
    pub decks: usize,
    pub total_cards: usize,
    pub reviewed_cards: usize,
    pub mastered_cards: usize,
    pub reviews: AggregateStats,
}

impl LibraryStats {
    pub fn accuracy(&self) -> u8 {
        self.reviews.accuracy()
    }
}

fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        0
    } else {
        ((part as f64 / whole as f64) * 100.0).round() as u8
    }
}
