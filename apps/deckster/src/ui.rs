//! UI rendering for Deckster.

use crate::app::{App, InputField, OptionRow, View};
use deckster_core::{Rating, SessionPhase, StudyCard};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &App) {
    match app.view {
        View::DeckList => draw_deck_list(f, app),
        View::Study => draw_study(f, app),
        View::Stats => draw_stats(f, app),
        View::Options => draw_options(f, app),
        View::CardBrowser => draw_browser(f, app),
    }

    if app.show_help {
        draw_help(f);
    }

    if app.editing {
        draw_input(f, app);
    }

    if let Some(msg) = &app.message {
        draw_message(f, msg);
    }
}

fn screen(f: &Frame) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area())
}

fn header(title: &str) -> Paragraph<'_> {
    Paragraph::new(title)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
}

fn footer(keys: &str) -> Paragraph<'_> {
    Paragraph::new(keys)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL))
}

fn highlight(selected: bool) -> Style {
    if selected {
        Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn draw_deck_list(f: &mut Frame, app: &App) {
    let chunks = screen(f);
    f.render_widget(header("Deckster"), chunks[0]);

    if app.decks.decks().is_empty() {
        let msg = Paragraph::new("No decks yet. Press 'a' to create one or 'i' to import.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Decks "));
        f.render_widget(msg, chunks[1]);
    } else {
        let items: Vec<ListItem> = app
            .decks
            .decks()
            .iter()
            .enumerate()
            .map(|(i, deck)| {
                let stats = deck.stats();
                let mut spans = vec![
                    Span::styled(deck.name.as_str(), highlight(i == app.selected_deck)),
                    Span::raw(format!(" - {} cards", stats.total)),
                ];
                if app.config.display.show_progress {
                    spans.push(Span::raw(", "));
                    spans.push(Span::styled(
                        format!("{}% reviewed", stats.progress),
                        Style::default().fg(Color::Yellow),
                    ));
                    spans.push(Span::raw(", "));
                    spans.push(Span::styled(
                        format!("{} mastered", stats.mastered),
                        Style::default().fg(Color::Green),
                    ));
                }
                if app.active_deck.as_ref() == Some(&deck.id) {
                    spans.push(Span::styled(" *", Style::default().fg(Color::Cyan)));
                }

                let style = if i == app.selected_deck {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(spans)).style(style)
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Decks "));
        f.render_widget(list, chunks[1]);
    }

    f.render_widget(
        footer("j/k:Navigate  Enter:Study  a:Add  n:Rename  d:Delete  i:Import  b:Browse  s:Stats  o:Options  ?:Help  q:Quit"),
        chunks[2],
    );
}

fn draw_study(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress
            Constraint::Min(0),    // Card
            Constraint::Length(3), // Buttons
        ])
        .split(f.area());

    let session = app.study.session();
    let deck_name = app.active_deck().map(|d| d.name.as_str()).unwrap_or("Study");

    let mut status = format!("{deck_name} | Card {} of {}", session.position(), session.len());
    if app.config.display.show_accuracy && session.stats().total > 0 {
        status.push_str(&format!(" | Accuracy: {}%", session.accuracy()));
    }
    if app.config.display.show_progress {
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Green))
            .ratio(session.progress().clamp(0.0, 1.0))
            .label(status);
        f.render_widget(gauge, chunks[0]);
    } else {
        f.render_widget(header(&status), chunks[0]);
    }

    match session.phase() {
        SessionPhase::Empty => {
            let empty = Paragraph::new("No cards to study.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(empty, chunks[1]);
            f.render_widget(footer("q:Back"), chunks[2]);
        }
        SessionPhase::Complete => {
            let stats = session.stats();
            let text = vec![
                Line::from(Span::styled(
                    "Session complete!",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("{} of {} correct ({}%)", stats.correct, stats.total, stats.accuracy())),
            ];
            let complete = Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(complete, chunks[1]);
            f.render_widget(footer("Enter/r:Review again  q:Back"), chunks[2]);
        }
        SessionPhase::InProgress => {
            if let Some(card) = session.current_card() {
                draw_card(f, app, card, chunks[1]);
            }
            draw_buttons(f, app.flipped, chunks[2]);
        }
    }
}

fn draw_card(f: &mut Frame, app: &App, card: &StudyCard, area: Rect) {
    let prompt = card_face(&card.display_front, card.display_front_image.as_deref());
    let answer = card_face(&card.display_back, card.display_back_image.as_deref());

    if !app.flipped {
        let front = Paragraph::new(prompt)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Question "))
            .wrap(Wrap { trim: true });
        f.render_widget(front, area);
        return;
    }

    let back = Paragraph::new(answer)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL).title(" Answer "))
        .wrap(Wrap { trim: true });

    if app.options.options().show_both_sides {
        let inner = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let front = Paragraph::new(prompt)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Question "))
            .wrap(Wrap { trim: true });
        f.render_widget(front, inner[0]);
        f.render_widget(back, inner[1]);
    } else {
        f.render_widget(back, area);
    }
}

fn card_face<'a>(text: &'a str, image: Option<&'a str>) -> Vec<Line<'a>> {
    let mut lines = vec![Line::from(text)];
    if let Some(url) = image {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("[image: {url}]"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn draw_buttons(f: &mut Frame, flipped: bool, area: Rect) {
    let buttons: Vec<(String, &str, Color)> = if flipped {
        Rating::ALL
            .iter()
            .map(|r| (r.key().to_string(), r.name(), rating_color(*r)))
            .collect()
    } else {
        vec![("Space".to_string(), "Show Answer", Color::White)]
    };

    let mut spans: Vec<Span> = buttons
        .iter()
        .flat_map(|(key, label, color)| {
            vec![
                Span::styled(format!("[{}]", key), Style::default().fg(*color).add_modifier(Modifier::BOLD)),
                Span::raw(format!(" {} ", label)),
                Span::raw("  "),
            ]
        })
        .collect();
    spans.push(Span::styled("r:Reset  q:Back", Style::default().fg(Color::DarkGray)));

    let line = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(line, area);
}

fn rating_color(rating: Rating) -> Color {
    match rating {
        Rating::Again => Color::Red,
        Rating::Hard => Color::Yellow,
        Rating::Good => Color::Green,
        Rating::Easy => Color::Blue,
    }
}

fn draw_stats(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    f.render_widget(header("Statistics"), chunks[0]);

    let library = app.decks.library_stats();
    let summary = vec![
        Line::from(format!(
            "Decks: {}   Cards: {}   Reviewed: {}   Mastered: {}",
            library.decks, library.total_cards, library.reviewed_cards, library.mastered_cards
        )),
        Line::from(format!(
            "Reviews: {}   Correct: {}   Incorrect: {}",
            library.reviews.total_reviews, library.reviews.correct, library.reviews.incorrect
        )),
        Line::from(vec![
            Span::raw(format!("Accuracy: {}%   ", library.accuracy())),
            Span::styled(
                format!("Streak: {}", library.reviews.streak_count),
                Style::default().fg(Color::Yellow),
            ),
        ]),
    ];
    let summary = Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title(" Overall "));
    f.render_widget(summary, chunks[1]);

    let rows: Vec<Row> = app
        .decks
        .decks()
        .iter()
        .map(|deck| {
            let stats = deck.stats();
            Row::new(vec![
                deck.name.clone(),
                stats.total.to_string(),
                stats.reviewed.to_string(),
                stats.mastered.to_string(),
                format!("{}%", stats.progress),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(15),
            Constraint::Percentage(15),
            Constraint::Percentage(15),
            Constraint::Percentage(15),
        ],
    )
    .header(
        Row::new(vec!["Deck", "Cards", "Reviewed", "Mastered", "Progress"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(" Decks "));
    f.render_widget(table, chunks[2]);

    f.render_widget(footer("x:Reset statistics  q:Back  ?:Help"), chunks[3]);
}

fn draw_options(f: &mut Frame, app: &App) {
    let chunks = screen(f);
    f.render_widget(header("Study Options"), chunks[0]);

    let options = app.options.options();
    let on_off = |b: bool| if b { "on" } else { "off" };

    let items: Vec<ListItem> = OptionRow::ALL
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let value = match row {
                OptionRow::RandomOrder => on_off(options.random_order).to_string(),
                OptionRow::Direction => options.direction.name().to_string(),
                OptionRow::OnlyMissed => on_off(options.only_missed).to_string(),
                OptionRow::ShowBothSides => on_off(options.show_both_sides).to_string(),
                OptionRow::AutoRead => on_off(options.auto_read).to_string(),
                OptionRow::CardLimit => options
                    .effective_limit()
                    .map_or_else(|| "all".to_string(), |n| n.to_string()),
            };
            let line = Line::from(vec![
                Span::styled(format!("{:<20}", row.label()), highlight(i == app.selected_option)),
                Span::styled(value, Style::default().fg(Color::Cyan)),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Options "));
    f.render_widget(list, chunks[1]);

    f.render_widget(footer("j/k:Navigate  Enter:Change  x:Reset all  q:Back"), chunks[2]);
}

fn draw_browser(f: &mut Frame, app: &App) {
    let chunks = screen(f);

    let Some(deck) = app.selected_deck() else {
        return;
    };
    f.render_widget(header(&format!("Cards in {}", deck.name)), chunks[0]);

    if deck.cards.is_empty() {
        let content = Paragraph::new("No cards yet. Press 'a' to add one.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(content, chunks[1]);
    } else {
        let rows: Vec<Row> = deck
            .cards
            .iter()
            .enumerate()
            .map(|(i, card)| {
                let rating = Rating::try_from(card.difficulty)
                    .map(|r| r.name())
                    .unwrap_or("-");
                let rating = if card.is_reviewed() { rating } else { "new" };
                Row::new(vec![card.front.clone(), card.back.clone(), rating.to_string()])
                    .style(highlight(i == app.selected_card))
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(40),
                Constraint::Percentage(45),
                Constraint::Percentage(15),
            ],
        )
        .header(Row::new(vec!["Front", "Back", "Last"]).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(table, chunks[1]);
    }

    f.render_widget(footer("j/k:Navigate  a:Add  e:Edit  d:Delete  q:Back  ?:Help"), chunks[2]);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help = r#"
Deckster Keybindings

Deck List:
  j/k, Up/Down    Navigate decks
  Enter, Space    Study (resumes recent progress)
  a / n / d       Add / rename / delete deck
  i               Import a text file
  b               Browse cards
  s / o           Statistics / study options
  q               Quit

Study Session:
  Space           Show answer
  1 2 3 4         Again / Hard / Good / Easy
  r               Start over with a new set
  Enter           Review again (when finished)
  q, Esc          Back to decks

Card Browser:
  a / e / d       Add / edit / delete card

Press any key to close
"#;

    let popup = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, area);
}

fn draw_input(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 15, f.area());
    f.render_widget(Clear, area);

    let title = match app.input_field {
        InputField::DeckName => "Enter deck name",
        InputField::RenameDeck => "Rename deck",
        InputField::CardFront => "Enter card front",
        InputField::CardBack => "Enter card back",
        InputField::ImportPath => "File to import",
        InputField::CardLimit => "Cards per session (empty for all)",
        InputField::None => "",
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title)));
    f.render_widget(input, area);

    let typed = u16::try_from(app.input_buffer.chars().count()).unwrap_or(u16::MAX);
    let cursor = area.x.saturating_add(1).saturating_add(typed);
    f.set_cursor_position((cursor.min(area.right().saturating_sub(2)), area.y.saturating_add(1)));
}

fn draw_message(f: &mut Frame, msg: &str) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(5),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use deckster_core::Storage;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn render(app: &App) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn buffer_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app() -> App {
        let mut app = App::new(Config::default(), Storage::in_memory());
        app.decks
            .import_deck("Spanish", [("hola", "hello"), ("adios", "goodbye")])
            .unwrap();
        app
    }

    #[test]
    fn test_empty_deck_list() {
        let app = App::new(Config::default(), Storage::in_memory());
        assert!(render(&app).contains("No decks yet"));
    }

    #[test]
    fn test_deck_list_shows_decks() {
        let screen = render(&app());
        assert!(screen.contains("Spanish"));
        assert!(screen.contains("2 cards"));
    }

    #[test]
    fn test_study_question_and_answer() {
        let mut app = app();
        let deck = app.decks.decks()[0].clone();
        app.study.open(&deck, app.options.options());
        app.view = View::Study;

        let screen = render(&app);
        assert!(screen.contains("Question"));
        assert!(screen.contains("hola"));
        assert!(screen.contains("Card 1 of 2"));

        app.flipped = true;
        let screen = render(&app);
        assert!(screen.contains("hello"));
        assert!(screen.contains("[1] Again"));
        assert!(!screen.contains("Question"));
    }

    #[test]
    fn test_show_both_sides() {
        let mut app = app();
        app.options.set_show_both_sides(true);
        let deck = app.decks.decks()[0].clone();
        app.study.open(&deck, app.options.options());
        app.view = View::Study;
        app.flipped = true;

        let screen = render(&app);
        assert!(screen.contains("Question"));
        assert!(screen.contains("Answer"));
    }

    #[test]
    fn test_stats_view() {
        let mut app = app();
        app.view = View::Stats;
        let screen = render(&app);
        assert!(screen.contains("Statistics"));
        assert!(screen.contains("Decks: 1"));
        assert!(screen.contains("Streak: 0"));
    }

    #[test]
    fn test_options_view() {
        let mut app = app();
        app.view = View::Options;
        let screen = render(&app);
        assert!(screen.contains("Random order"));
        assert!(screen.contains("Cards per session"));
        assert!(screen.contains("all"));
    }

    #[test]
    fn test_help_popup() {
        let mut app = app();
        app.show_help = true;
        assert!(render(&app).contains("Deckster Keybindings"));
    }

    #[test]
    fn test_long_input_keeps_cursor_in_box() {
        let mut app = app();
        app.editing = true;
        app.input_field = InputField::DeckName;
        app.input_buffer = "x".repeat(usize::from(u16::MAX) + 10);

        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let cursor = terminal.get_cursor_position().unwrap();
        assert!(cursor.x < 100);
    }
}
