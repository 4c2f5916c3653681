use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use whack::{
    app::{App, AppAction, MAX_CELLS},
    config::{ConfigStore, FileConfigStore, GameConfig},
    high_score::{FileHighScoreStore, HighScoreStore},
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    session::SessionController,
    timer::DeadlineTimer,
};

const TICK_RATE_MS: u64 = 16;

type LiveApp = App<DeadlineTimer, FileHighScoreStore, StdRng>;

/// whack-a-mole in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "One cell lights up at a time. Tap it with its key or the mouse before the countdown runs out; every hit and every miss makes the next countdown shorter."
)]
pub struct Cli {
    /// misses allowed before the game ends
    #[clap(short = 'm', long)]
    max_misses: Option<u32>,

    /// number of cells on the board (2 to 35)
    #[clap(short = 'c', long)]
    cells: Option<usize>,

    /// starting countdown in milliseconds
    #[clap(short = 'i', long)]
    initial_delay: Option<u64>,

    /// shortest countdown in milliseconds
    #[clap(long)]
    min_delay: Option<u64>,

    /// milliseconds removed from the countdown after every hit or miss
    #[clap(long)]
    delay_step: Option<u64>,

    /// seed for a reproducible sequence of cells
    #[clap(long)]
    seed: Option<u64>,

    /// settings file to read (and write with --save-config)
    #[clap(long)]
    config: Option<PathBuf>,

    /// high score file
    #[clap(long)]
    high_score_file: Option<PathBuf>,

    /// persist the resolved settings as the new defaults and exit
    #[clap(long)]
    save_config: bool,

    /// reset the stored high score to 0 and exit
    #[clap(long)]
    clear_high_score: bool,

    /// write logs to this file (filter with RUST_LOG, default warn)
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Stored settings with command line overrides on top
    fn apply(&self, base: GameConfig) -> GameConfig {
        GameConfig {
            max_misses: self.max_misses.unwrap_or(base.max_misses),
            num_cells: self.cells.unwrap_or(base.num_cells),
            initial_delay_ms: self.initial_delay.unwrap_or(base.initial_delay_ms),
            min_delay_ms: self.min_delay.unwrap_or(base.min_delay_ms),
            delay_step_ms: self.delay_step.unwrap_or(base.delay_step_ms),
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn high_score_store(&self) -> FileHighScoreStore {
        match &self.high_score_file {
            Some(path) => FileHighScoreStore::with_path(path),
            None => FileHighScoreStore::new(),
        }
    }
}

fn resolve_config(cli: &Cli, store: &impl ConfigStore) -> Result<GameConfig, String> {
    let config = cli.apply(store.load());
    config.validate().map_err(|e| e.to_string())?;
    if config.num_cells > MAX_CELLS {
        return Err(format!(
            "at most {} cells are supported, got {}",
            MAX_CELLS, config.num_cells
        ));
    }
    Ok(config)
}

fn init_logging(log_file: Option<&Path>, tui: bool) -> io::Result<()> {
    let env = env_logger::Env::default().default_filter_or("warn");
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            env_logger::Builder::from_env(env)
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        // stderr would scribble over the alternate screen
        None if tui => {}
        None => env_logger::Builder::from_env(env).init(),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(
        cli.log_file.as_deref(),
        !(cli.clear_high_score || cli.save_config),
    )?;

    if cli.clear_high_score {
        let mut store = cli.high_score_store();
        store.write(0);
        println!("high score cleared");
        return Ok(());
    }

    let config_store = cli.config_store();
    let config = match resolve_config(&cli, &config_store) {
        Ok(config) => config,
        Err(msg) => Cli::command().error(ErrorKind::ValueValidation, msg).exit(),
    };
    if cli.save_config {
        config_store.save(&config)?;
        println!("saved settings to {}", config_store.path().display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let controller =
        SessionController::new(config, DeadlineTimer::new(), cli.high_score_store(), rng)?;
    let mut app = App::new(controller);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);
    app.shutdown();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut LiveApp) -> Result<(), Box<dyn Error>> {
    let tick = Duration::from_millis(TICK_RATE_MS);
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::new(tick));

    loop {
        terminal.draw(|f| {
            app.area = f.area();
            f.render_widget(&*app, f.area());
        })?;

        let limit = app
            .controller
            .timer()
            .time_until_next(Instant::now())
            .unwrap_or(tick);

        if app.handle(runner.step_within(limit))? == AppAction::Quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["whack"]);

        assert_eq!(cli.max_misses, None);
        assert_eq!(cli.cells, None);
        assert_eq!(cli.seed, None);
        assert!(!cli.save_config);
        assert!(!cli.clear_high_score);
        assert_eq!(cli.apply(GameConfig::default()), GameConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "whack",
            "-m",
            "3",
            "-c",
            "16",
            "-i",
            "1500",
            "--min-delay",
            "300",
            "--delay-step",
            "25",
        ]);
        let cfg = cli.apply(GameConfig::default());
        assert_eq!(
            cfg,
            GameConfig {
                max_misses: 3,
                num_cells: 16,
                initial_delay_ms: 1500,
                min_delay_ms: 300,
                delay_step_ms: 25,
            }
        );
    }

    #[test]
    fn test_cli_partial_override_keeps_stored_values() {
        let stored = GameConfig {
            max_misses: 9,
            num_cells: 4,
            initial_delay_ms: 800,
            min_delay_ms: 200,
            delay_step_ms: 10,
        };
        let cli = Cli::parse_from(["whack", "--cells", "6"]);
        let cfg = cli.apply(stored);
        assert_eq!(cfg.num_cells, 6);
        assert_eq!(cfg.max_misses, 9);
        assert_eq!(cfg.initial_delay_ms, 800);
    }

    #[test]
    fn test_resolve_config_validates() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));

        let cli = Cli::parse_from(["whack", "--cells", "1"]);
        assert!(resolve_config(&cli, &store)
            .unwrap_err()
            .contains("at least 2 cells"));

        let cli = Cli::parse_from(["whack", "--cells", "36"]);
        assert!(resolve_config(&cli, &store)
            .unwrap_err()
            .contains("at most 35 cells"));

        let cli = Cli::parse_from(["whack", "--min-delay", "5000"]);
        assert!(resolve_config(&cli, &store).is_err());

        let cli = Cli::parse_from(["whack"]);
        assert_eq!(resolve_config(&cli, &store), Ok(GameConfig::default()));
    }

    #[test]
    fn test_resolve_config_reads_the_store() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let stored = GameConfig {
            num_cells: 12,
            ..GameConfig::default()
        };
        store.save(&stored).unwrap();

        let cli = Cli::parse_from(["whack"]);
        assert_eq!(resolve_config(&cli, &store), Ok(stored));
    }
}
