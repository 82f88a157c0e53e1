use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    env, io,
    time::{Duration, Instant},
};

use quiz_minigame::api::ApiClient;
use quiz_minigame::app::{App, StartupOptions};
use quiz_minigame::error::Result;
use quiz_minigame::game::QuizGame;
use quiz_minigame::questions::QuestionSource;
use quiz_minigame::stats::StatsTracker;
use quiz_minigame::storage::{StatsStore, STATS_FILE};
use quiz_minigame::types::{Category, Difficulty};

use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn setup_logging() -> Result<()> {
    // Set up file appender
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "quiz_minigame.log");

    // Set different log levels based on build type
    let env_filter = if cfg!(debug_assertions) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .init();

    info!("Logging system initialized");
    Ok(())
}

fn parse_args() -> StartupOptions {
    let mut options = StartupOptions::default();
    for arg in env::args().skip(1) {
        let arg = arg.trim_start_matches('-');
        if let Ok(count) = arg.parse::<usize>() {
            options.question_count = Some(count.clamp(1, 20));
        } else if let Some(category) = Category::parse(arg) {
            info!(category = %category, "category selected from argument");
            options.category = Some(category);
        } else if let Some(difficulty) = Difficulty::parse(arg) {
            info!(difficulty = %difficulty, "difficulty selected from argument");
            options.difficulty = Some(difficulty);
        } else {
            warn!(argument = arg, "ignoring unrecognized argument");
        }
    }
    options
}

fn main() -> Result<()> {
    setup_logging()?;
    info!("Starting quiz minigame");

    let rt = tokio::runtime::Runtime::new()?;
    let options = parse_args();

    let api = match ApiClient::from_env() {
        Ok(api) => Some(api),
        Err(e) => {
            warn!(error = %e, "HTTP client unavailable, playing offline");
            None
        }
    };
    let source = match api.clone() {
        Some(api) => QuestionSource::new(Box::new(api)),
        None => QuestionSource::offline(),
    };
    let catalog = match &api {
        Some(api) => rt.block_on(api.fetch_categories()),
        None => quiz_minigame::bank::default_categories(),
    };
    let tracker = StatsTracker::load(StatsStore::new(STATS_FILE));
    let game = QuizGame::new(source, api.clone());
    let mut app = App::new(game, tracker, api, catalog, options);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = Duration::from_millis(250);
    let res = run_app(&mut terminal, &mut app, &rt, tick_rate);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {}", err);
        println!("Error: {}", err);
    }

    info!("Application terminated");
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rt: &tokio::runtime::Runtime,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| app.render(f))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(rt, key);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick(rt);
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
