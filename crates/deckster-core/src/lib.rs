//! Core of the Deckster flashcard app.
//!
//! This crate holds everything below the user interface:
//! - Deck storage with review statistics ([`DeckStore`])
//! - Persisted study options ([`OptionsStore`])
//! - Session building: filtering, direction, shuffling and limits ([`build_study_cards`])
//! - The study session state machine ([`StudySession`]) and its persistence
//! - Text import for front/back pairs
//!
//! All state lives in a synchronous key-value [`Storage`] as JSON records.

pub mod builder;
pub mod controller;
pub mod deck_store;
pub mod error;
pub mod import;
pub mod models;
pub mod options;
pub mod persistence;
pub mod session;
pub mod storage;

// Re-exports
pub use builder::{build_study_cards, reshuffle_study_cards, StudyCard, StudyDirection};
pub use controller::{SessionOrigin, StudyController};
pub use deck_store::{DeckStore, ImportSummary};
pub use error::{StorageError, StorageResult, StudyError, StudyResult};
pub use import::{parse_cards, ImportedCard};
pub use models::{
    AggregateStats, Card, CardId, Deck, DeckId, DeckStats, EntityId, LibraryStats, Rating,
    SessionStats,
};
pub use options::{Direction, OptionsStore, StudyOptions};
pub use persistence::{SessionPersistence, SessionSnapshot, STALE_AFTER_HOURS};
pub use session::{ReviewOutcome, SessionPhase, StudySession};
pub use storage::{keys, KeyValueStore, MemoryStore, SqliteStore, Storage};
