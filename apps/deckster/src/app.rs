//! Application state and logic.

use crate::config::Config;
use crossterm::event::{KeyCode, KeyEvent};
use deckster_core::{
    parse_cards, CardId, Deck, DeckId, DeckStore, OptionsStore, Rating, SessionOrigin,
    SessionPhase, Storage, StudyController, StudyResult,
};
use std::path::Path;

pub struct App {
    pub storage: Storage,
    pub config: Config,
    pub decks: DeckStore,
    pub options: OptionsStore,
    pub study: StudyController,
    pub view: View,
    pub selected_deck: usize,
    pub selected_card: usize,
    pub selected_option: usize,
    /// Deck being studied, re-checked after every deck list change.
    pub active_deck: Option<DeckId>,
    pub flipped: bool,
    pub editing: bool,
    pub input_buffer: String,
    pub input_field: InputField,
    /// Front text held while the back is being entered.
    pub pending_front: Option<String>,
    pub editing_card: Option<CardId>,
    pub pending_delete: Option<Pending>,
    pub message: Option<String>,
    pub show_help: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    DeckList,
    Study,
    Stats,
    Options,
    CardBrowser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    DeckName,
    RenameDeck,
    CardFront,
    CardBack,
    ImportPath,
    CardLimit,
}

/// Deletion awaiting a second key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Deck(DeckId),
    Card(CardId),
}

/// Rows of the options screen, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRow {
    RandomOrder,
    Direction,
    OnlyMissed,
    ShowBothSides,
    AutoRead,
    CardLimit,
}

impl OptionRow {
    pub const ALL: [OptionRow; 6] = [
        Self::RandomOrder,
        Self::Direction,
        Self::OnlyMissed,
        Self::ShowBothSides,
        Self::AutoRead,
        Self::CardLimit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::RandomOrder => "Random order",
            Self::Direction => "Direction",
            Self::OnlyMissed => "Only missed cards",
            Self::ShowBothSides => "Show both sides",
            Self::AutoRead => "Read cards aloud",
            Self::CardLimit => "Cards per session",
        }
    }
}

impl App {
    pub fn new(config: Config, storage: Storage) -> Self {
        let decks = DeckStore::load(storage.clone());
        let options = OptionsStore::load(storage.clone());
        let study = StudyController::new(storage.clone());

        Self {
            storage,
            config,
            decks,
            options,
            study,
            view: View::DeckList,
            selected_deck: 0,
            selected_card: 0,
            selected_option: 0,
            active_deck: None,
            flipped: false,
            editing: false,
            input_buffer: String::new(),
            input_field: InputField::None,
            pending_front: None,
            editing_card: None,
            pending_delete: None,
            message: None,
            show_help: false,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn selected_deck(&self) -> Option<&Deck> {
        self.decks.decks().get(self.selected_deck)
    }

    pub fn active_deck(&self) -> Option<&Deck> {
        self.active_deck.as_ref().and_then(|id| self.decks.deck(id))
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.message = None;

        if self.show_help {
            self.show_help = false;
            return;
        }

        if self.editing {
            self.handle_edit_key(key);
        } else {
            match self.view {
                View::DeckList => self.handle_deck_list_key(key),
                View::Study => self.handle_study_key(key),
                View::Stats => self.handle_stats_key(key),
                View::Options => self.handle_options_key(key),
                View::CardBrowser => self.handle_browser_key(key),
            }
        }

        self.report_storage_warnings();
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.stop_editing(),
            KeyCode::Enter => self.finish_editing(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn handle_deck_list_key(&mut self, key: KeyEvent) {
        let confirm_delete = key.code == KeyCode::Char('d');
        if !confirm_delete {
            self.pending_delete = None;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                let len = self.decks.decks().len();
                if len > 0 {
                    self.selected_deck = (self.selected_deck + 1).min(len - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_deck = self.selected_deck.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.start_study(),
            KeyCode::Char('a') => self.start_editing(InputField::DeckName, ""),
            KeyCode::Char('n') => {
                if let Some(name) = self.selected_deck().map(|d| d.name.clone()) {
                    self.start_editing(InputField::RenameDeck, &name);
                }
            }
            KeyCode::Char('d') => self.delete_selected_deck(),
            KeyCode::Char('i') => self.start_editing(InputField::ImportPath, ""),
            KeyCode::Char('s') => self.view = View::Stats,
            KeyCode::Char('o') => self.view = View::Options,
            KeyCode::Char('b') => {
                if self.selected_deck().is_some() {
                    self.selected_card = 0;
                    self.view = View::CardBrowser;
                }
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_study_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
            self.leave_study();
            return;
        }
        if key.code == KeyCode::Char('?') {
            self.show_help = true;
            return;
        }

        match self.study.phase() {
            SessionPhase::Empty => self.leave_study(),
            SessionPhase::Complete => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char('r')) {
                    self.review_again();
                }
            }
            SessionPhase::InProgress => match key.code {
                KeyCode::Char(' ') | KeyCode::Enter => self.flipped = !self.flipped,
                KeyCode::Char('r') => self.reset_session(),
                KeyCode::Char(c) if self.flipped => {
                    if let Some(rating) = Rating::from_key(c) {
                        self.answer(rating);
                    }
                }
                _ => {}
            },
        }
    }

    fn handle_stats_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.view = View::DeckList,
            KeyCode::Char('x') => {
                self.decks.reset_stats();
                self.message = Some("Statistics reset".to_string());
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_options_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.view = View::DeckList,
            KeyCode::Char('j') | KeyCode::Down => {
                self.selected_option = (self.selected_option + 1).min(OptionRow::ALL.len() - 1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_option = self.selected_option.saturating_sub(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_option(),
            KeyCode::Char('x') => {
                self.options.reset();
                self.message = Some("Study options reset".to_string());
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_browser_key(&mut self, key: KeyEvent) {
        let Some(deck) = self.selected_deck() else {
            self.view = View::DeckList;
            return;
        };
        let card_count = deck.cards.len();
        let selected = deck.cards.get(self.selected_card).cloned();

        let confirm_delete = key.code == KeyCode::Char('d');
        if !confirm_delete {
            self.pending_delete = None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.view = View::DeckList,
            KeyCode::Char('j') | KeyCode::Down => {
                if card_count > 0 {
                    self.selected_card = (self.selected_card + 1).min(card_count - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Char('a') => {
                self.editing_card = None;
                self.start_editing(InputField::CardFront, "");
            }
            KeyCode::Char('e') => {
                if let Some(card) = selected {
                    self.editing_card = Some(card.id.clone());
                    self.start_editing(InputField::CardFront, &card.front);
                }
            }
            KeyCode::Char('d') => {
                if let Some(card) = selected {
                    self.delete_card(card.id);
                }
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn start_editing(&mut self, field: InputField, initial: &str) {
        self.editing = true;
        self.input_field = field;
        self.input_buffer = initial.to_string();
    }

    fn stop_editing(&mut self) {
        self.editing = false;
        self.input_buffer.clear();
        self.input_field = InputField::None;
        self.pending_front = None;
        self.editing_card = None;
    }

    fn finish_editing(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        let result = match self.input_field {
            InputField::DeckName => self.decks.create_deck(&input).map(|deck| {
                self.selected_deck = self.decks.decks().len() - 1;
                self.message = Some(format!("Deck '{}' created", deck.name));
            }),
            InputField::RenameDeck => match self.selected_deck().map(|d| d.id.clone()) {
                Some(id) => self.decks.rename_deck(&id, &input).map(|_| ()),
                None => Ok(()),
            },
            InputField::CardFront => {
                if input.trim().is_empty() {
                    self.message = Some("Card front cannot be empty".to_string());
                    self.input_buffer = input;
                    return;
                }
                // Keep editing: the back comes next.
                let back = self
                    .editing_card
                    .as_ref()
                    .and_then(|id| self.selected_deck()?.card(id))
                    .map(|c| c.back.clone())
                    .unwrap_or_default();
                self.pending_front = Some(input);
                self.input_field = InputField::CardBack;
                self.input_buffer = back;
                return;
            }
            InputField::CardBack => self.save_card(&input),
            InputField::ImportPath => self.import_file(Path::new(input.trim())),
            InputField::CardLimit => self.set_card_limit(&input),
            InputField::None => Ok(()),
        };

        if let Err(err) = result {
            self.message = Some(err.to_string());
        }
        self.stop_editing();
    }

    fn save_card(&mut self, back: &str) -> StudyResult<()> {
        let Some(deck_id) = self.selected_deck().map(|d| d.id.clone()) else {
            return Ok(());
        };
        let front = self.pending_front.clone().unwrap_or_default();
        match self.editing_card.clone() {
            Some(card_id) => {
                self.decks.edit_card(&deck_id, &card_id, &front, back)?;
                self.message = Some("Card updated".to_string());
            }
            None => {
                self.decks.add_card(&deck_id, &front, back)?;
                self.message = Some("Card created".to_string());
            }
        }
        Ok(())
    }

    /// Import a text file as a new deck named after the file.
    pub fn import_file(&mut self, path: &Path) -> StudyResult<()> {
        let text = std::fs::read_to_string(path).map_err(deckster_core::StorageError::from)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.import_text(&name, &text)
    }

    pub fn import_text(&mut self, name: &str, text: &str) -> StudyResult<()> {
        let cards = parse_cards(text);
        let deck = self
            .decks
            .import_deck(name, cards.into_iter().map(|c| (c.front, c.back)))?;
        self.message = Some(format!("Imported {} cards into '{}'", deck.cards.len(), deck.name));
        Ok(())
    }

    fn set_card_limit(&mut self, input: &str) -> StudyResult<()> {
        let input = input.trim();
        let limit = if input.is_empty() {
            None
        } else {
            let n = input.parse::<usize>().map_err(|_| {
                deckster_core::StudyError::validation("Card limit must be a whole number")
            })?;
            Some(n)
        };
        self.options.set_card_limit(limit)
    }

    fn toggle_option(&mut self) {
        let current = self.options.options().clone();
        match OptionRow::ALL[self.selected_option] {
            OptionRow::RandomOrder => self.options.set_random_order(!current.random_order),
            OptionRow::Direction => self.options.set_direction(current.direction.next()),
            OptionRow::OnlyMissed => self.options.set_only_missed(!current.only_missed),
            OptionRow::ShowBothSides => self.options.set_show_both_sides(!current.show_both_sides),
            OptionRow::AutoRead => self.options.set_auto_read(!current.auto_read),
            OptionRow::CardLimit => {
                let initial = current.card_limit.map(|n| n.to_string()).unwrap_or_default();
                self.start_editing(InputField::CardLimit, &initial);
            }
        }
    }

    fn delete_selected_deck(&mut self) {
        let Some(deck) = self.selected_deck() else { return };
        let id = deck.id.clone();
        let name = deck.name.clone();

        if self.pending_delete.as_ref() != Some(&Pending::Deck(id.clone())) {
            self.pending_delete = Some(Pending::Deck(id));
            self.message = Some(format!("Press d again to delete '{name}'"));
            return;
        }

        self.pending_delete = None;
        if self.decks.delete_deck(&id) {
            self.message = Some(format!("Deck '{name}' deleted"));
        }
        self.after_deck_list_change();
    }

    fn delete_card(&mut self, card_id: CardId) {
        if self.pending_delete.as_ref() != Some(&Pending::Card(card_id.clone())) {
            self.pending_delete = Some(Pending::Card(card_id));
            self.message = Some("Press d again to delete this card".to_string());
            return;
        }

        self.pending_delete = None;
        let Some(deck_id) = self.selected_deck().map(|d| d.id.clone()) else { return };
        if self.decks.delete_card(&deck_id, &card_id) {
            self.message = Some("Card deleted".to_string());
        }
        let remaining = self.selected_deck().map_or(0, |d| d.cards.len());
        self.selected_card = self.selected_card.min(remaining.saturating_sub(1));
    }

    /// Clear the active deck and its session if the deck disappeared.
    fn after_deck_list_change(&mut self) {
        if self.study.sync_with(&self.decks) {
            self.flipped = false;
        }
        if let Some(id) = &self.active_deck {
            if !self.decks.contains(id) {
                self.active_deck = None;
            }
        }
        let len = self.decks.decks().len();
        self.selected_deck = self.selected_deck.min(len.saturating_sub(1));
    }

    fn start_study(&mut self) {
        let Some(deck) = self.selected_deck().cloned() else {
            return;
        };

        let origin = self.study.open(&deck, self.options.options());
        self.active_deck = Some(deck.id.clone());
        self.flipped = false;
        self.view = View::Study;

        match (origin, self.study.phase()) {
            (_, SessionPhase::Empty) => {
                self.message = Some("No cards to study. Add some from the card browser.".to_string());
            }
            (SessionOrigin::Resumed, _) => {
                self.message = Some("Resumed where you left off".to_string());
            }
            (SessionOrigin::Fresh, _) => {}
        }
    }

    fn answer(&mut self, rating: Rating) {
        match self.study.submit_review(rating, &mut self.decks) {
            Ok(outcome) if outcome.finished => {
                self.message = Some("Session complete!".to_string());
            }
            Ok(_) => {}
            Err(err) => self.message = Some(err.to_string()),
        }
        self.flipped = false;
    }

    fn reset_session(&mut self) {
        let Some(deck) = self.active_deck().cloned() else {
            self.leave_study();
            return;
        };
        self.study.reset_new_subset(&deck, self.options.options());
        self.flipped = false;
        self.message = Some("Session reset".to_string());
    }

    fn review_again(&mut self) {
        self.study.reset_keep_subset(self.options.options());
        self.flipped = false;
    }

    /// Back to the deck list. Progress stays saved for later.
    fn leave_study(&mut self) {
        self.study.close();
        self.flipped = false;
        self.view = View::DeckList;
    }

    fn report_storage_warnings(&mut self) {
        if let Some(err) = self.storage.take_warnings().into_iter().last() {
            self.message = Some(format!("Warning: changes could not be saved ({err})"));
        }
    }
}
