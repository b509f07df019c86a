//! Saving and resuming study sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::builder::StudyCard;
use crate::models::{DeckId, SessionStats};
use crate::session::StudySession;
use crate::storage::{keys, Storage};

/// Saved sessions older than this are discarded instead of resumed.
pub const STALE_AFTER_HOURS: i64 = 24;

/// Persisted form of a [`StudySession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub deck_id: DeckId,
    pub current_index: usize,
    pub completed: bool,
    #[serde(default)]
    pub session_stats: SessionStats,
    pub card_order: Vec<StudyCard>,
    #[serde(default)]
    pub original_card_order: Vec<StudyCard>,
    /// Save time, epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Capture `session`, or `None` if it has no deck or no cards.
    pub fn capture(session: &StudySession, now: DateTime<Utc>) -> Option<Self> {
        let deck_id = session.deck_id()?.clone();
        if session.is_empty() {
            return None;
        }
        Some(Self {
            deck_id,
            current_index: session.current_index(),
            completed: session.is_complete(),
            session_stats: session.stats(),
            card_order: session.cards().to_vec(),
            original_card_order: session.original_cards().to_vec(),
            timestamp: now,
        })
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) >= Duration::hours(STALE_AFTER_HOURS)
    }

    pub fn into_session(self) -> Option<StudySession> {
        StudySession::restore(
            self.deck_id,
            self.card_order,
            self.original_card_order,
            self.current_index,
            self.session_stats,
            self.completed,
        )
        .map_err(|err| tracing::debug!(error = %err, "saved session is inconsistent"))
        .ok()
    }
}

/// Mirrors session state into storage and resumes it later.
#[derive(Debug)]
pub struct SessionPersistence {
    storage: Storage,
    ignore_next_load: bool,
}

impl SessionPersistence {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            ignore_next_load: false,
        }
    }

    pub fn save(&self, session: &StudySession) -> bool {
        self.save_at(session, Utc::now())
    }

    /// Write the session. Sessions with nothing to study are not written.
    pub fn save_at(&self, session: &StudySession, now: DateTime<Utc>) -> bool {
        match SessionSnapshot::capture(session, now) {
            Some(snapshot) => self.storage.save(keys::SESSION, &snapshot),
            None => false,
        }
    }

    pub fn load(&mut self, deck_id: &DeckId) -> Option<StudySession> {
        self.load_at(deck_id, Utc::now())
    }

    /// Resume the saved session for `deck_id` if it is recent and intact.
    ///
    /// Saved state for another deck is left in place. Stale or broken state
    /// is removed.
    pub fn load_at(&mut self, deck_id: &DeckId, now: DateTime<Utc>) -> Option<StudySession> {
        if std::mem::take(&mut self.ignore_next_load) {
            tracing::debug!(%deck_id, "load suppressed after reset");
            return None;
        }

        let snapshot: SessionSnapshot = self.storage.load(keys::SESSION)?;
        if &snapshot.deck_id != deck_id {
            tracing::debug!(saved = %snapshot.deck_id, requested = %deck_id, "saved session is for another deck");
            return None;
        }
        if snapshot.is_stale(now) {
            tracing::debug!(%deck_id, saved_at = %snapshot.timestamp, "discarding stale session");
            self.clear();
            return None;
        }

        let session = snapshot.into_session();
        if session.is_none() {
            self.clear();
        }
        session
    }

    /// Deck of the stored session, if one is stored and readable.
    pub fn saved_deck_id(&self) -> Option<DeckId> {
        self.storage
            .load::<SessionSnapshot>(keys::SESSION)
            .map(|snapshot| snapshot.deck_id)
    }

    pub fn clear(&self) -> bool {
        self.storage.remove(keys::SESSION)
    }

    /// Make the next load attempt return nothing, so a deliberate rebuild is
    /// not replaced by the state it just superseded.
    pub fn suppress_next_load(&mut self) {
        self.ignore_next_load = true;
    }

    /// Drop the suppression once the rebuild has been saved.
    pub fn rebuild_finished(&mut self) {
        self.ignore_next_load = false;
    }

    pub fn is_load_suppressed(&self) -> bool {
        self.ignore_next_load
    }
}
