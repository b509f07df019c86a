//! Deck collection and aggregate review statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StudyError, StudyResult};
use crate::models::{
    AggregateStats, Card, CardId, Deck, DeckId, DeckStats, LibraryStats, Rating,
};
use crate::storage::{keys, Storage};

/// Owns every deck plus the review totals, persisting on each mutation.
#[derive(Debug)]
pub struct DeckStore {
    storage: Storage,
    decks: Vec<Deck>,
    stats: AggregateStats,
}

/// Shape of an export file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportData {
    #[serde(default)]
    decks: Option<Vec<Deck>>,
    #[serde(default)]
    stats: Option<AggregateStats>,
    #[serde(default)]
    export_date: Option<DateTime<Utc>>,
}

/// What an import replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub decks: Option<usize>,
    pub stats: bool,
}

impl DeckStore {
    /// Load decks and stats, falling back to empty data.
    pub fn load(storage: Storage) -> Self {
        let decks: Vec<Deck> = storage.load_or(keys::DECKS, Vec::new());
        let stats = storage.load_or(keys::STATS, AggregateStats::default());
        tracing::debug!(decks = decks.len(), "loaded deck store");
        Self { storage, decks, stats }
    }

    pub fn decks(&self) -> &[Deck] {
        &self.decks
    }

    pub fn deck(&self, id: &DeckId) -> Option<&Deck> {
        self.decks.iter().find(|d| &d.id == id)
    }

    pub fn contains(&self, id: &DeckId) -> bool {
        self.deck(id).is_some()
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    pub fn create_deck(&mut self, name: &str) -> StudyResult<Deck> {
        let name = required(name, "Deck name")?;
        let deck = Deck::new(name);
        tracing::info!(id = %deck.id, name = %deck.name, "created deck");
        self.decks.push(deck.clone());
        self.save_decks();
        Ok(deck)
    }

    /// Create a deck from already parsed front/back pairs.
    pub fn import_deck<I, F, B>(&mut self, name: &str, pairs: I) -> StudyResult<Deck>
    where
        I: IntoIterator<Item = (F, B)>,
        F: AsRef<str>,
        B: AsRef<str>,
    {
        let name = required(name, "Deck name")?;
        let cards: Vec<Card> = pairs
            .into_iter()
            .filter_map(|(front, back)| {
                let (front, back) = (front.as_ref().trim(), back.as_ref().trim());
                (!front.is_empty() && !back.is_empty()).then(|| Card::new(front, back))
            })
            .collect();
        if cards.is_empty() {
            return Err(StudyError::validation("No cards to import"));
        }

        let deck = Deck::new(name).with_cards(cards);
        tracing::info!(id = %deck.id, cards = deck.cards.len(), "imported deck");
        self.decks.push(deck.clone());
        self.save_decks();
        Ok(deck)
    }

    /// Remove a deck. Holders of an active deck must re-check it afterwards.
    pub fn delete_deck(&mut self, id: &DeckId) -> bool {
        let before = self.decks.len();
        self.decks.retain(|d| &d.id != id);
        let removed = self.decks.len() != before;
        if removed {
            tracing::info!(%id, "deleted deck");
            self.save_decks();
        }
        removed
    }

    /// Replace a deck by id. Missing ids are ignored.
    pub fn update_deck(&mut self, deck: Deck) -> bool {
        match self.decks.iter_mut().find(|d| d.id == deck.id) {
            Some(slot) => {
                *slot = deck;
                self.save_decks();
                true
            }
            None => {
                tracing::debug!(id = %deck.id, "update for missing deck ignored");
                false
            }
        }
    }

    pub fn rename_deck(&mut self, id: &DeckId, name: &str) -> StudyResult<bool> {
        let name = required(name, "Deck name")?;
        let Some(deck) = self.deck_mut(id) else {
            return Ok(false);
        };
        deck.name = name.to_string();
        self.save_decks();
        Ok(true)
    }

    pub fn add_card(&mut self, deck_id: &DeckId, front: &str, back: &str) -> StudyResult<CardId> {
        let front = required(front, "Card front")?;
        let back = required(back, "Card back")?;
        let deck = self
            .deck_mut(deck_id)
            .ok_or_else(|| StudyError::not_found(format!("deck {deck_id}")))?;

        let card = Card::new(front, back);
        let id = card.id.clone();
        deck.cards.push(card);
        self.save_decks();
        Ok(id)
    }

    /// Change a card's text, keeping its id and review history.
    pub fn edit_card(
        &mut self,
        deck_id: &DeckId,
        card_id: &CardId,
        front: &str,
        back: &str,
    ) -> StudyResult<bool> {
        let front = required(front, "Card front")?;
        let back = required(back, "Card back")?;
        let Some(card) = self.card_mut(deck_id, card_id) else {
            tracing::debug!(%deck_id, %card_id, "edit for missing card ignored");
            return Ok(false);
        };
        card.front = front.to_string();
        card.back = back.to_string();
        self.save_decks();
        Ok(true)
    }

    pub fn delete_card(&mut self, deck_id: &DeckId, card_id: &CardId) -> bool {
        let Some(deck) = self.deck_mut(deck_id) else {
            return false;
        };
        let before = deck.cards.len();
        deck.cards.retain(|c| &c.id != card_id);
        let removed = deck.cards.len() != before;
        if removed {
            self.save_decks();
        }
        removed
    }

    /// Store a rating on the card. Missing deck or card is a no-op.
    pub fn record_review(&mut self, deck_id: &DeckId, card_id: &CardId, rating: Rating) -> bool {
        self.record_review_at(deck_id, card_id, rating, Utc::now())
    }

    pub fn record_review_at(
        &mut self,
        deck_id: &DeckId,
        card_id: &CardId,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(card) = self.card_mut(deck_id, card_id) else {
            tracing::debug!(%deck_id, %card_id, "review for missing card ignored");
            return false;
        };
        card.difficulty = rating.difficulty();
        card.last_reviewed = Some(now);
        self.save_decks();
        true
    }

    /// Record a rating on the card and in the aggregate stats.
    ///
    /// The stats are updated even when the card is gone.
    pub fn apply_review(&mut self, deck_id: &DeckId, card_id: &CardId, rating: Rating) -> bool {
        let recorded = self.record_review(deck_id, card_id, rating);
        self.stats.record(rating);
        self.save_stats();
        recorded
    }

    pub fn reset_stats(&mut self) {
        self.stats = AggregateStats::default();
        self.save_stats();
    }

    pub fn deck_stats(&self, id: &DeckId) -> Option<DeckStats> {
        self.deck(id).map(Deck::stats)
    }

    pub fn library_stats(&self) -> LibraryStats {
        self.decks.iter().map(Deck::stats).fold(
            LibraryStats {
                decks: self.decks.len(),
                reviews: self.stats,
                ..LibraryStats::default()
            },
            |mut acc, s| {
                acc.total_cards += s.total;
                acc.reviewed_cards += s.reviewed;
                acc.mastered_cards += s.mastered;
                acc
            },
        )
    }

    /// Pretty-printed export of decks and stats.
    pub fn export_json(&self) -> StudyResult<String> {
        let data = ExportData {
            decks: Some(self.decks.clone()),
            stats: Some(self.stats),
            export_date: Some(Utc::now()),
        };
        Ok(serde_json::to_string_pretty(&data).map_err(StorageError::from)?)
    }

    /// Replace decks and/or stats from an export. Sections that are absent
    /// are left alone.
    pub fn import_json(&mut self, text: &str) -> StudyResult<ImportSummary> {
        let data: ExportData = serde_json::from_str(text)
            .map_err(|e| StudyError::validation(format!("Invalid import file: {e}")))?;

        let mut summary = ImportSummary::default();
        if let Some(decks) = data.decks {
            summary.decks = Some(decks.len());
            self.decks = decks;
            self.save_decks();
        }
        if let Some(stats) = data.stats {
            summary.stats = true;
            self.stats = stats;
            self.save_stats();
        }
        tracing::info!(?summary, "imported data");
        Ok(summary)
    }

    fn deck_mut(&mut self, id: &DeckId) -> Option<&mut Deck> {
        self.decks.iter_mut().find(|d| &d.id == id)
    }

    fn card_mut(&mut self, deck_id: &DeckId, card_id: &CardId) -> Option<&mut Card> {
        self.deck_mut(deck_id)?.card_mut(card_id)
    }

    fn save_decks(&self) {
        self.storage.save(keys::DECKS, &self.decks);
    }

    fn save_stats(&self) {
        self.storage.save(keys::STATS, &self.stats);
    }
}

fn required<'a>(value: &'a str, field: &str) -> StudyResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(StudyError::validation(format!("{field} cannot be empty")))
    } else {
        Ok(trimmed)
    }
}
