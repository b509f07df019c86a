//! Deckster - Study flashcard decks in the terminal.

mod app;
mod config;
mod ui;

use anyhow::Context;
use app::{App, View};
use clap::Parser;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use deckster_core::{ImportSummary, SqliteStore, Storage};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "deckster", version, about = "Study flashcard decks in the terminal")]
struct Cli {
    /// Use a throwaway in-memory store instead of the database
    #[arg(long)]
    memory: bool,

    /// Import a text file of front/back pairs as a new deck
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Name for the imported deck (defaults to the file name)
    #[arg(long, requires = "import")]
    name: Option<String>,

    /// Write all decks and statistics to a JSON file and exit
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Load decks and statistics from a JSON export and exit
    #[arg(long, value_name = "FILE", conflicts_with = "export")]
    restore: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    init_logging(&config);
    if Config::config_path().is_some_and(|p| !p.exists()) {
        if let Err(err) = config.save() {
            tracing::warn!(error = %err, "could not write default config");
        }
    }

    let storage = open_storage(&cli, &config)?;
    let mut app = App::new(config, storage);

    if let Some(path) = &cli.import {
        import_deck_file(&mut app, path, cli.name.as_deref())?;
    }

    if let Some(path) = &cli.export {
        let count = export_to(&app, path)?;
        println!("Exported {count} decks to {}", path.display());
        return Ok(());
    }

    if let Some(path) = &cli.restore {
        let summary = restore_from(&mut app, path)?;
        match summary.decks {
            Some(n) => println!("Restored {n} decks"),
            None => println!("No decks in {}", path.display()),
        }
        if summary.stats {
            println!("Restored statistics");
        }
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = %err, "terminal loop failed");
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    Ok(())
}

/// Import a text file as a new deck, failing if the deck was not saved.
fn import_deck_file(app: &mut App, path: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let name = name.map(str::to_string).unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    app.import_text(&name, &text)?;
    ensure_saved(&app.storage, "import")
}

/// Write the JSON backup. Returns the number of decks written.
fn export_to(app: &App, path: &Path) -> anyhow::Result<usize> {
    let json = app.decks.export_json()?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    ensure_saved(&app.storage, "export")?;
    Ok(app.decks.decks().len())
}

/// Load a JSON backup, failing if any part of it could not be saved.
fn restore_from(app: &mut App, path: &Path) -> anyhow::Result<ImportSummary> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let summary = app.decks.import_json(&text)?;
    ensure_saved(&app.storage, "restore")?;
    Ok(summary)
}

/// Print queued write failures to stderr and turn them into an error.
fn ensure_saved(storage: &Storage, action: &str) -> anyhow::Result<()> {
    let warnings = storage.take_warnings();
    if warnings.is_empty() {
        return Ok(());
    }
    for warning in &warnings {
        eprintln!("Warning: {warning}");
    }
    anyhow::bail!("{action} failed: {} change(s) could not be saved", warnings.len())
}

fn open_storage(cli: &Cli, config: &Config) -> anyhow::Result<Storage> {
    if cli.memory {
        tracing::info!("using in-memory store");
        return Ok(Storage::in_memory());
    }
    let path = config
        .db_path()
        .context("no data directory available, pass --memory or set storage.path")?;
    tracing::info!(path = %path.display(), "opening database");
    let store = SqliteStore::open(&path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(Storage::new(store))
}

/// Send logs to the log file. Without one, logging stays off so the
/// terminal UI is not overwritten.
fn init_logging(config: &Config) {
    let Some(path) = config.log_path() else { return };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.code == KeyCode::Char('q') && key.modifiers.is_empty() {
                if !app.is_editing() && !app.show_help && app.view == View::DeckList {
                    break;
                }
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }
            app.handle_key(key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckster_core::{KeyValueStore, MemoryStore, StorageResult};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Backend whose writes fail once `fail_writes` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: Rc<Cell<bool>>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if self.fail_writes.get() {
                return Err(io::Error::other("disk full").into());
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key)
        }
    }

    fn flaky_app() -> (App, Rc<Cell<bool>>) {
        let backend = FlakyStore::default();
        let fail = backend.fail_writes.clone();
        (App::new(Config::default(), Storage::new(backend)), fail)
    }

    fn backup_file(dir: &Path) -> PathBuf {
        let mut source = App::new(Config::default(), Storage::in_memory());
        source.import_text("Spanish", "uno\tone\ndos\ttwo\n").unwrap();
        let path = dir.join("backup.json");
        export_to(&source, &path).unwrap();
        path
    }

    #[test]
    fn test_restore_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = backup_file(dir.path());
        let (mut app, _fail) = flaky_app();

        let summary = restore_from(&mut app, &path).unwrap();
        assert_eq!(summary.decks, Some(1));
        assert!(summary.stats);
        assert_eq!(app.decks.decks()[0].cards.len(), 2);
    }

    #[test]
    fn test_restore_fails_when_writes_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = backup_file(dir.path());
        let (mut app, fail) = flaky_app();
        fail.set(true);

        let err = restore_from(&mut app, &path).unwrap_err();
        assert!(err.to_string().contains("restore failed: 2 change(s)"));
        assert!(app.storage.take_warnings().is_empty());
    }

    #[test]
    fn test_import_fails_when_writes_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colors.txt");
        std::fs::write(&path, "red\trojo\n").unwrap();
        let (mut app, fail) = flaky_app();
        fail.set(true);

        assert!(import_deck_file(&mut app, &path, None).is_err());

        fail.set(false);
        import_deck_file(&mut app, &path, Some("Colores")).unwrap();
        assert_eq!(app.decks.decks().last().unwrap().name, "Colores");
    }

    #[test]
    fn test_ensure_saved_drains_warnings() {
        let (app, fail) = flaky_app();
        assert!(ensure_saved(&app.storage, "export").is_ok());

        fail.set(true);
        assert!(!app.storage.save("scratch", &1));
        assert!(ensure_saved(&app.storage, "export").is_err());
        assert!(ensure_saved(&app.storage, "export").is_ok());
    }
}
