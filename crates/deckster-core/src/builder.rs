//! Turns a deck and study options into the ordered cards of a session.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{Card, CardId, Deck};
use crate::options::{Direction, StudyOptions};

/// Direction resolved for one card of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudyDirection {
    FrontToBack,
    BackToFront,
}

impl StudyDirection {
    fn resolve<R: Rng + ?Sized>(direction: Direction, rng: &mut R) -> Self {
        match direction {
            Direction::FrontToBack => Self::FrontToBack,
            Direction::BackToFront => Self::BackToFront,
            Direction::Random => {
                if rng.gen_bool(0.5) {
                    Self::FrontToBack
                } else {
                    Self::BackToFront
                }
            }
        }
    }
}

/// A card as presented in a session, with the faces already swapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyCard {
    #[serde(flatten)]
    pub card: Card,
    pub study_direction: StudyDirection,
    pub display_front: String,
    pub display_back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_front_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_back_image: Option<String>,
}

impl StudyCard {
    pub fn new(card: Card, direction: StudyDirection) -> Self {
        let front_image = card.front_image_url.clone();
        let back_image = card.back_image().map(str::to_string);
        let (display_front, display_back, display_front_image, display_back_image) =
            match direction {
                StudyDirection::FrontToBack => {
                    (card.front.clone(), card.back.clone(), front_image, back_image)
                }
                StudyDirection::BackToFront => {
                    (card.back.clone(), card.front.clone(), back_image, front_image)
                }
            };
        Self {
            card,
            study_direction: direction,
            display_front,
            display_back,
            display_front_image,
            display_back_image,
        }
    }

    pub fn id(&self) -> &CardId {
        &self.card.id
    }
}

/// Build the ordered study list for `deck`.
///
/// Steps, in order: only-missed filter (dropped again if it would leave
/// nothing), per-card direction, shuffle, card limit. The deck is never
/// modified.
pub fn build_study_cards<R: Rng + ?Sized>(
    deck: &Deck,
    options: &StudyOptions,
    rng: &mut R,
) -> Vec<StudyCard> {
    if deck.cards.is_empty() {
        return Vec::new();
    }

    let mut selected: Vec<&Card> = if options.only_missed {
        deck.cards.iter().filter(|c| c.is_missed()).collect()
    } else {
        Vec::new()
    };
    if selected.is_empty() {
        if options.only_missed {
            tracing::debug!(deck = %deck.id, "no missed cards, studying the whole deck");
        }
        selected = deck.cards.iter().collect();
    }

    let mut cards: Vec<StudyCard> = selected
        .into_iter()
        .map(|card| StudyCard::new(card.clone(), StudyDirection::resolve(options.direction, rng)))
        .collect();

    if options.random_order {
        cards.shuffle(rng);
    }
    if let Some(limit) = options.effective_limit() {
        cards.truncate(limit);
    }
    cards
}

/// Reorder an existing study list without re-filtering or re-resolving
/// directions. Only shuffles when `random_order` is on.
pub fn reshuffle_study_cards<R: Rng + ?Sized>(
    cards: &[StudyCard],
    options: &StudyOptions,
    rng: &mut R,
) -> Vec<StudyCard> {
    let mut cards = cards.to_vec();
    if options.random_order {
        cards.shuffle(rng);
    }
    cards
}
