//! Study options and their persisted store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StudyError, StudyResult};
use crate::storage::{keys, Storage};

/// Which face of a card is shown first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    FrontToBack,
    BackToFront,
    /// Picked per card when a session is built.
    Random,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Self::FrontToBack, Self::BackToFront, Self::Random];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontToBack => "front-to-back",
            Self::BackToFront => "back-to-front",
            Self::Random => "random",
        }
    }

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FrontToBack => "Front to back",
            Self::BackToFront => "Back to front",
            Self::Random => "Random",
        }
    }

    /// Next direction in the cycle, for toggling from a settings screen.
    pub fn next(&self) -> Self {
        match self {
            Self::FrontToBack => Self::BackToFront,
            Self::BackToFront => Self::Random,
            Self::Random => Self::FrontToBack,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = StudyError;

    fn from_str(s: &str) -> StudyResult<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| StudyError::validation(format!("unknown study direction '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudyOptions {
    pub random_order: bool,
    pub direction: Direction,
    /// Restrict sessions to cards rated Again or Hard.
    pub only_missed: bool,
    /// Keep the prompt visible once the answer is revealed.
    pub show_both_sides: bool,
    pub auto_read: bool,
    /// Maximum cards per session.
    pub card_limit: Option<usize>,
}

impl Default for StudyOptions {
    fn default() -> Self {
        Self {
            random_order: false,
            direction: Direction::FrontToBack,
            only_missed: false,
            show_both_sides: false,
            auto_read: false,
            card_limit: None,
        }
    }
}

impl StudyOptions {
    /// Positive card limit, if any.
    pub fn effective_limit(&self) -> Option<usize> {
        self.card_limit.filter(|&n| n > 0)
    }
}

/// Process-wide options, written through to storage on every change.
#[derive(Debug)]
pub struct OptionsStore {
    storage: Storage,
    options: StudyOptions,
}

impl OptionsStore {
    pub fn load(storage: Storage) -> Self {
        let options = storage.load_or(keys::STUDY_OPTIONS, StudyOptions::default());
        Self { storage, options }
    }

    pub fn options(&self) -> &StudyOptions {
        &self.options
    }

    pub fn set_random_order(&mut self, value: bool) {
        self.update(|o| o.random_order = value);
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.update(|o| o.direction = direction);
    }

    /// Set the direction from its stored name, rejecting unknown values.
    pub fn set_direction_str(&mut self, value: &str) -> StudyResult<()> {
        let direction = value.parse()?;
        self.set_direction(direction);
        Ok(())
    }

    pub fn set_only_missed(&mut self, value: bool) {
        self.update(|o| o.only_missed = value);
    }

    pub fn set_show_both_sides(&mut self, value: bool) {
        self.update(|o| o.show_both_sides = value);
    }

    pub fn set_auto_read(&mut self, value: bool) {
        self.update(|o| o.auto_read = value);
    }

    pub fn set_card_limit(&mut self, limit: Option<usize>) -> StudyResult<()> {
        if limit == Some(0) {
            return Err(StudyError::validation("Card limit must be at least 1"));
        }
        self.update(|o| o.card_limit = limit);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.update(|o| *o = StudyOptions::default());
    }

    fn update(&mut self, f: impl FnOnce(&mut StudyOptions)) {
        f(&mut self.options);
        tracing::debug!(options = ?self.options, "study options changed");
        self.storage.save(keys::STUDY_OPTIONS, &self.options);
    }
}
