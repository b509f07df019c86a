//! Wires a [`StudySession`] to the deck store and to session persistence.
//!
//! Every transition is followed by an explicit save in the same call, so the
//! stored session never lags the in-memory one by more than the transition
//! in flight.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::deck_store::DeckStore;
use crate::error::StudyResult;
use crate::models::{Deck, Rating};
use crate::options::StudyOptions;
use crate::persistence::SessionPersistence;
use crate::session::{ReviewOutcome, SessionPhase, StudySession};
use crate::storage::Storage;

/// How [`StudyController::open`] obtained its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    Resumed,
    Fresh,
}

#[derive(Debug)]
pub struct StudyController<R = StdRng> {
    session: StudySession,
    persistence: SessionPersistence,
    rng: R,
}

impl StudyController<StdRng> {
    pub fn new(storage: Storage) -> Self {
        Self::with_rng(storage, StdRng::from_entropy())
    }
}

impl<R: Rng> StudyController<R> {
    pub fn with_rng(storage: Storage, rng: R) -> Self {
        Self {
            session: StudySession::empty(),
            persistence: SessionPersistence::new(storage),
            rng,
        }
    }

    pub fn session(&self) -> &StudySession {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    /// Start studying `deck`, resuming recent saved progress for it.
    pub fn open(&mut self, deck: &Deck, options: &StudyOptions) -> SessionOrigin {
        if let Some(session) = self.persistence.load(&deck.id) {
            tracing::info!(deck = %deck.id, index = session.current_index(), "resumed session");
            self.session = session;
            return SessionOrigin::Resumed;
        }
        self.session = StudySession::start(deck, options, &mut self.rng);
        self.persistence.save(&self.session);
        SessionOrigin::Fresh
    }

    /// Rate the current card, write the rating to its deck and save progress.
    pub fn submit_review(
        &mut self,
        rating: Rating,
        decks: &mut DeckStore,
    ) -> StudyResult<ReviewOutcome> {
        let outcome = self.session.submit_review(rating)?;
        if let Some(deck_id) = self.session.deck_id() {
            decks.apply_review(deck_id, &outcome.card_id, rating);
        }
        self.persistence.save(&self.session);
        Ok(outcome)
    }

    /// "Review again": same subset, fresh order.
    pub fn reset_keep_subset(&mut self, options: &StudyOptions) {
        self.persistence.clear();
        self.session.reset_keep_subset(options, &mut self.rng);
        self.persistence.save(&self.session);
    }

    /// Throw away the current subset and pull a new one from `deck`.
    pub fn reset_new_subset(&mut self, deck: &Deck, options: &StudyOptions) {
        self.persistence.suppress_next_load();
        self.persistence.clear();
        self.session.reset_new_subset(deck, options, &mut self.rng);
        self.persistence.save(&self.session);
        self.persistence.rebuild_finished();
        tracing::info!(deck = %deck.id, cards = self.session.len(), "started new subset");
    }

    /// Drop the session, live or saved, if its deck no longer exists. Call
    /// after any change to the deck list.
    pub fn sync_with(&mut self, decks: &DeckStore) -> bool {
        let mut ended = false;
        if let Some(deck_id) = self.session.deck_id() {
            if !decks.contains(deck_id) {
                tracing::info!(deck = %deck_id, "active deck removed, ending session");
                self.session = StudySession::empty();
                ended = true;
            }
        }
        if let Some(saved) = self.persistence.saved_deck_id() {
            if !decks.contains(&saved) {
                self.persistence.clear();
                ended = true;
            }
        }
        ended
    }

    /// Leave the session without touching the saved progress.
    pub fn close(&mut self) {
        self.session = StudySession::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStats;
    use crate::options::Direction;
    use crate::storage::keys;

    fn setup(cards: usize) -> (Storage, DeckStore, Deck) {
        let storage = Storage::in_memory();
        let mut decks = DeckStore::load(storage.clone());
        let deck = decks.create_deck("Controller").unwrap();
        for i in 0..cards {
            decks.add_card(&deck.id, &format!("q{i}"), &format!("a{i}")).unwrap();
        }
        let deck = decks.deck(&deck.id).unwrap().clone();
        (storage, decks, deck)
    }

    fn controller(storage: &Storage, seed: u64) -> StudyController {
        StudyController::with_rng(storage.clone(), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_fresh_then_resume() {
        let (storage, mut decks, deck) = setup(3);
        let options = StudyOptions::default();

        let mut first = controller(&storage, 1);
        assert_eq!(first.open(&deck, &options), SessionOrigin::Fresh);
        first.submit_review(Rating::Good, &mut decks).unwrap();

        let mut second = controller(&storage, 2);
        assert_eq!(second.open(&deck, &options), SessionOrigin::Resumed);
        assert_eq!(second.session().current_index(), 1);
        assert_eq!(second.session().stats(), SessionStats { correct: 1, total: 1 });
    }

    #[test]
    fn test_other_deck_starts_fresh() {
        let (storage, mut decks, deck) = setup(3);
        let other = decks.create_deck("Other").unwrap();
        decks.add_card(&other.id, "x", "y").unwrap();
        let other = decks.deck(&other.id).unwrap().clone();
        let options = StudyOptions::default();

        let mut first = controller(&storage, 1);
        first.open(&deck, &options);
        first.submit_review(Rating::Good, &mut decks).unwrap();

        let mut second = controller(&storage, 1);
        assert_eq!(second.open(&other, &options), SessionOrigin::Fresh);
        assert_eq!(second.session().current_index(), 0);
    }

    #[test]
    fn test_accuracy_and_streak_end_to_end() {
        let (storage, mut decks, deck) = setup(4);
        let mut study = controller(&storage, 1);
        study.open(&deck, &StudyOptions::default());

        for difficulty in [0u8, 1, 2, 3] {
            study
                .submit_review(Rating::try_from(difficulty).unwrap(), &mut decks)
                .unwrap();
        }
        assert_eq!(study.phase(), SessionPhase::Complete);
        assert_eq!(study.session().stats(), SessionStats { correct: 2, total: 4 });
        assert_eq!(decks.stats().streak_count, 2);
        assert_eq!(decks.stats().total_reviews, 4);

        let stored = decks.deck(&deck.id).unwrap();
        let difficulties: Vec<u8> = stored.cards.iter().map(|c| c.difficulty).collect();
        assert_eq!(difficulties, vec![0, 1, 2, 3]);
        assert!(stored.cards.iter().all(|c| c.last_reviewed.is_some()));
    }

    #[test]
    fn test_review_again_keeps_missed_subset() {
        let (storage, mut decks, deck) = setup(4);
        let options = StudyOptions { only_missed: true, random_order: true, ..Default::default() };
        let mut study = controller(&storage, 3);
        study.open(&deck, &options);
        while study.phase() == SessionPhase::InProgress {
            study.submit_review(Rating::Easy, &mut decks).unwrap();
        }

        // Every card is now mastered, yet review-again replays the same four.
        study.reset_keep_subset(&options);
        assert_eq!(study.phase(), SessionPhase::InProgress);
        assert_eq!(study.session().len(), 4);
        assert_eq!(study.session().current_index(), 0);
    }

    #[test]
    fn test_reset_new_subset_is_not_undone_by_load() {
        let (storage, mut decks, deck) = setup(4);
        let options = StudyOptions { direction: Direction::Random, ..Default::default() };
        let mut study = controller(&storage, 4);
        study.open(&deck, &options);
        study.submit_review(Rating::Again, &mut decks).unwrap();
        study.submit_review(Rating::Good, &mut decks).unwrap();

        let deck = decks.deck(&deck.id).unwrap().clone();
        study.reset_new_subset(&deck, &options);
        assert_eq!(study.session().current_index(), 0);
        assert!(!study.persistence.is_load_suppressed());

        let mut reopened = controller(&storage, 5);
        assert_eq!(reopened.open(&deck, &options), SessionOrigin::Resumed);
        assert_eq!(reopened.session().current_index(), 0);
        assert_eq!(reopened.session().cards(), study.session().cards());
    }

    #[test]
    fn test_deleted_deck_clears_session() {
        let (storage, mut decks, deck) = setup(2);
        let mut study = controller(&storage, 1);
        study.open(&deck, &StudyOptions::default());
        assert!(!study.sync_with(&decks));

        decks.delete_deck(&deck.id);
        assert!(study.sync_with(&decks));
        assert_eq!(study.phase(), SessionPhase::Empty);
        assert_eq!(storage.raw(keys::SESSION).unwrap(), None);
    }

    #[test]
    fn test_deleted_deck_clears_saved_session_after_close() {
        let (storage, mut decks, deck) = setup(2);
        let mut study = controller(&storage, 1);
        study.open(&deck, &StudyOptions::default());
        study.close();
        assert!(storage.raw(keys::SESSION).unwrap().is_some());

        decks.delete_deck(&deck.id);
        assert!(study.sync_with(&decks));
        assert_eq!(storage.raw(keys::SESSION).unwrap(), None);
    }

    #[test]
    fn test_review_on_deleted_card_still_advances() {
        let (storage, mut decks, deck) = setup(2);
        let mut study = controller(&storage, 1);
        study.open(&deck, &StudyOptions::default());
        let current = study.session().current_card().unwrap().id().clone();
        decks.delete_card(&deck.id, &current);

        let outcome = study.submit_review(Rating::Good, &mut decks).unwrap();
        assert_eq!(outcome.card_id, current);
        assert_eq!(study.session().current_index(), 1);
    }

    #[test]
    fn test_empty_deck_stays_empty() {
        let (storage, _decks, deck) = setup(0);
        let mut study = controller(&storage, 1);
        assert_eq!(study.open(&deck, &StudyOptions::default()), SessionOrigin::Fresh);
        assert_eq!(study.phase(), SessionPhase::Empty);
        assert_eq!(storage.raw(keys::SESSION).unwrap(), None);
    }
}
