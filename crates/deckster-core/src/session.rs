//! Study session state machine.
//!
//! A session walks an ordered list of [`StudyCard`]s, one rating at a time:
//!
//! ```text
//! Empty ──start──▶ InProgress ──submit_review (last card)──▶ Complete
//!                     ▲   │                                    │
//!                     └───┴──── reset_keep_subset / reset_new_subset
//! ```
//!
//! The session itself is pure; writing ratings back to decks and saving
//! progress is done by [`crate::controller::StudyController`].

use rand::Rng;

use crate::builder::{build_study_cards, reshuffle_study_cards, StudyCard};
use crate::error::{StudyError, StudyResult};
use crate::models::{CardId, Deck, DeckId, Rating, SessionStats};
use crate::options::StudyOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No deck, or nothing buildable from it.
    Empty,
    InProgress,
    Complete,
}

/// Result of one rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub card_id: CardId,
    pub rating: Rating,
    pub correct: bool,
    /// Whether this rating finished the session.
    pub finished: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudySession {
    deck_id: Option<DeckId>,
    cards: Vec<StudyCard>,
    /// Subset replayed by "review again".
    original: Vec<StudyCard>,
    current_index: usize,
    stats: SessionStats,
    completed: bool,
}

impl StudySession {
    /// Session with nothing to study.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a fresh session for `deck`.
    pub fn start<R: Rng + ?Sized>(deck: &Deck, options: &StudyOptions, rng: &mut R) -> Self {
        let cards = build_study_cards(deck, options, rng);
        tracing::debug!(deck = %deck.id, cards = cards.len(), "built study session");
        Self {
            deck_id: Some(deck.id.clone()),
            original: cards.clone(),
            cards,
            ..Self::default()
        }
    }

    /// Rebuild a session from saved parts, checking the progress invariants.
    pub fn restore(
        deck_id: DeckId,
        cards: Vec<StudyCard>,
        original: Vec<StudyCard>,
        current_index: usize,
        stats: SessionStats,
        completed: bool,
    ) -> StudyResult<Self> {
        if current_index > cards.len() {
            return Err(StudyError::InvalidState("index past the end of the session"));
        }
        if completed != (!cards.is_empty() && current_index == cards.len()) {
            return Err(StudyError::InvalidState("completion flag disagrees with index"));
        }
        if stats.total != current_index || stats.correct > stats.total {
            return Err(StudyError::InvalidState("session stats disagree with index"));
        }
        let original = if original.is_empty() { cards.clone() } else { original };
        Ok(Self {
            deck_id: Some(deck_id),
            cards,
            original,
            current_index,
            stats,
            completed,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        if self.cards.is_empty() {
            SessionPhase::Empty
        } else if self.completed {
            SessionPhase::Complete
        } else {
            SessionPhase::InProgress
        }
    }

    pub fn deck_id(&self) -> Option<&DeckId> {
        self.deck_id.as_ref()
    }

    pub fn cards(&self) -> &[StudyCard] {
        &self.cards
    }

    pub fn original_cards(&self) -> &[StudyCard] {
        &self.original
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Card awaiting a rating.
    pub fn current_card(&self) -> Option<&StudyCard> {
        if self.completed {
            None
        } else {
            self.cards.get(self.current_index)
        }
    }

    /// One-based position of the current card, for "3 of 10" displays.
    pub fn position(&self) -> usize {
        (self.current_index + 1).min(self.cards.len())
    }

    /// Session accuracy as a rounded percentage.
    pub fn accuracy(&self) -> u8 {
        self.stats.accuracy()
    }

    /// Share of the session already rated, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.cards.is_empty() {
            0.0
        } else {
            self.current_index as f64 / self.cards.len() as f64
        }
    }

    /// Rate the current card and advance.
    pub fn submit_review(&mut self, rating: Rating) -> StudyResult<ReviewOutcome> {
        if self.phase() != SessionPhase::InProgress {
            return Err(StudyError::InvalidState("no card is awaiting a rating"));
        }
        let card_id = self.cards[self.current_index].id().clone();

        self.stats.record(rating);
        self.current_index += 1;
        self.completed = self.current_index == self.cards.len();

        Ok(ReviewOutcome {
            card_id,
            rating,
            correct: rating.is_correct(),
            finished: self.completed,
        })
    }

    /// Replay the same subset in a fresh order ("review again").
    pub fn reset_keep_subset<R: Rng + ?Sized>(&mut self, options: &StudyOptions, rng: &mut R) {
        self.cards = reshuffle_study_cards(&self.original, options, rng);
        self.restart();
    }

    /// Discard the subset and build a new one from `deck`.
    pub fn reset_new_subset<R: Rng + ?Sized>(
        &mut self,
        deck: &Deck,
        options: &StudyOptions,
        rng: &mut R,
    ) {
        *self = Self::start(deck, options, rng);
    }

    fn restart(&mut self) {
        self.current_index = 0;
        self.stats = SessionStats::default();
        self.completed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Card;
    use crate::options::Direction;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn deck(n: usize) -> Deck {
        let cards = (0..n)
            .map(|i| Card::new(format!("q{i}"), format!("a{i}")))
            .collect();
        Deck::new("Session").with_cards(cards)
    }

    #[test]
    fn test_empty_deck_stays_empty() {
        let session = StudySession::start(&deck(0), &StudyOptions::default(), &mut rng());
        assert_eq!(session.phase(), SessionPhase::Empty);
        assert!(session.current_card().is_none());
        assert_eq!(StudySession::empty().phase(), SessionPhase::Empty);
    }

    #[test]
    fn test_walk_through_session() {
        let deck = deck(2);
        let mut session = StudySession::start(&deck, &StudyOptions::default(), &mut rng());
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.position(), 1);
        assert_eq!(session.current_card().unwrap().id(), &deck.cards[0].id);

        let first = session.submit_review(Rating::Good).unwrap();
        assert!(first.correct);
        assert!(!first.finished);
        assert_eq!(session.position(), 2);

        let last = session.submit_review(Rating::Hard).unwrap();
        assert!(!last.correct);
        assert!(last.finished);
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert_eq!(session.current_index(), 2);
        assert!(session.current_card().is_none());
        assert_eq!(session.stats(), SessionStats { correct: 1, total: 2 });
        assert_eq!(session.accuracy(), 50);
    }

    #[test]
    fn test_review_after_complete_is_rejected() {
        let mut session = StudySession::start(&deck(1), &StudyOptions::default(), &mut rng());
        session.submit_review(Rating::Easy).unwrap();
        assert!(matches!(
            session.submit_review(Rating::Easy),
            Err(StudyError::InvalidState(_))
        ));
        assert!(StudySession::empty().submit_review(Rating::Good).is_err());
    }

    #[test]
    fn test_accuracy_mapping() {
        let mut session = StudySession::start(&deck(4), &StudyOptions::default(), &mut rng());
        for difficulty in 0..4u8 {
            session.submit_review(Rating::try_from(difficulty).unwrap()).unwrap();
        }
        assert_eq!(session.stats(), SessionStats { correct: 2, total: 4 });
    }

    #[test]
    fn test_reset_keep_subset_replays_same_cards() {
        let mut source = deck(6);
        for card in source.cards.iter_mut().take(3) {
            card.difficulty = 3;
        }
        let options = StudyOptions {
            only_missed: true,
            random_order: true,
            direction: Direction::Random,
            ..Default::default()
        };
        let mut rng = rng();
        let mut session = StudySession::start(&source, &options, &mut rng);
        let mut subset: Vec<String> = session.cards().iter().map(|c| c.id().to_string()).collect();
        subset.sort();
        while session.phase() == SessionPhase::InProgress {
            session.submit_review(Rating::Easy).unwrap();
        }

        session.reset_keep_subset(&options, &mut rng);
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.stats(), SessionStats::default());
        let mut replay: Vec<String> = session.cards().iter().map(|c| c.id().to_string()).collect();
        replay.sort();
        assert_eq!(replay, subset);
    }

    #[test]
    fn test_reset_keep_subset_mid_session() {
        let mut session = StudySession::start(&deck(3), &StudyOptions::default(), &mut rng());
        session.submit_review(Rating::Good).unwrap();
        session.reset_keep_subset(&StudyOptions::default(), &mut rng());
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_reset_new_subset_rebuilds() {
        let mut source = deck(4);
        let options = StudyOptions { only_missed: true, ..Default::default() };
        let mut session = StudySession::start(&source, &options, &mut rng());
        assert_eq!(session.len(), 4);
        session.submit_review(Rating::Easy).unwrap();

        source.cards[0].difficulty = 3;
        source.cards[1].difficulty = 3;
        session.reset_new_subset(&source, &options, &mut rng());
        assert_eq!(session.len(), 2);
        assert_eq!(session.original_cards().len(), 2);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_restore_checks_invariants() {
        let deck = deck(3);
        let built = StudySession::start(&deck, &StudyOptions::default(), &mut rng());
        let cards = built.cards().to_vec();

        let ok = StudySession::restore(
            deck.id.clone(),
            cards.clone(),
            Vec::new(),
            1,
            SessionStats { correct: 1, total: 1 },
            false,
        )
        .unwrap();
        assert_eq!(ok.original_cards().len(), 3);

        let bad_index = StudySession::restore(
            deck.id.clone(),
            cards.clone(),
            Vec::new(),
            4,
            SessionStats { correct: 0, total: 4 },
            false,
        );
        assert!(bad_index.is_err());

        let bad_flag = StudySession::restore(
            deck.id.clone(),
            cards.clone(),
            Vec::new(),
            3,
            SessionStats { correct: 0, total: 3 },
            false,
        );
        assert!(bad_flag.is_err());

        let bad_stats = StudySession::restore(
            deck.id,
            cards,
            Vec::new(),
            2,
            SessionStats { correct: 0, total: 1 },
            false,
        );
        assert!(bad_stats.is_err());
    }

    proptest! {
        #[test]
        fn prop_progress_invariant(
            n in 0usize..20,
            ratings in prop::collection::vec(0u8..=3, 0..30),
        ) {
            let mut session = StudySession::start(&deck(n), &StudyOptions::default(), &mut rng());
            for difficulty in ratings {
                let rating = Rating::try_from(difficulty).unwrap();
                let before = session.phase();
                let result = session.submit_review(rating);
                prop_assert_eq!(result.is_ok(), before == SessionPhase::InProgress);

                prop_assert_eq!(session.stats().total, session.current_index());
                prop_assert!(session.current_index() <= session.len());
                prop_assert_eq!(
                    session.is_complete(),
                    n > 0 && session.current_index() == session.len()
                );
                if session.is_complete() {
                    prop_assert_eq!(session.phase(), SessionPhase::Complete);
                }
            }
        }
    }
}
