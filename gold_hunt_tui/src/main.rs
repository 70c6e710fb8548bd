mod console;
mod transcript;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gold_hunt_core::{Game, GameConfig, GameMode, GridMap, Position, Tile};
use ratatui::{
    crossterm::{
        self,
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, Stdout},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing_appender::non_blocking::WorkerGuard;

use crate::transcript::transcript;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Map file to load
    #[arg(short, long, value_name = "MAP_FILE", default_value = "maps/example_map.txt")]
    map: PathBuf,

    /// Who takes turns
    #[arg(long, value_enum, default_value_t = Mode::Player)]
    mode: Mode,

    /// Show the full map, the bot's responses and its observations
    #[arg(short, long)]
    trace: bool,

    /// Seed for start positions and the bot's random moves
    #[arg(long)]
    seed: Option<u64>,

    /// Read commands from stdin and print responses instead of drawing a TUI
    #[arg(long)]
    headless: bool,

    /// Stop a headless game after this many rounds
    #[arg(long, value_name = "ROUNDS")]
    max_rounds: Option<u64>,

    /// Directory for the log file (TUI) or nothing (headless logs to stderr)
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Write a JSON summary of the finished game here
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Player and bot take turns
    Player,
    /// Only the bot moves
    BotTest,
}

impl From<Mode> for GameMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Player => GameMode::PlayerAndBot,
            Mode::BotTest => GameMode::BotTest,
        }
    }
}

struct App {
    /// The game being played.
    game: Game,
    /// Show the whole board and the bot's responses.
    trace: bool,
    /// Command being typed.
    input: String,
    /// Everything printed so far.
    log: Vec<String>,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(game: Game, trace: bool) -> Self {
        let mut log = vec![format!(
            "Map '{}', collect {} gold and reach an exit.",
            game.map().name(),
            game.map().gold_required()
        )];
        if trace {
            log.push(game.player().to_string());
            log.push(game.bot().to_string());
        }
        App {
            game,
            trace,
            input: String::new(),
            log,
            should_quit: false,
        }
    }

    /// Plays one round with the given human input.
    fn play(&mut self, human_input: Option<&str>) {
        if self.game.is_over() {
            return;
        }
        match self.game.step(human_input) {
            Ok(report) => {
                if let Some(line) = human_input {
                    self.log.push(format!("> {}", line.trim()));
                }
                self.log.extend(transcript(&report, self.trace));
            }
            Err(err) => self.log.push(format!("Error: {err}")),
        }
    }

    /// Submits the typed command.
    fn submit(&mut self) {
        let line = std::mem::take(&mut self.input);
        if !line.trim().is_empty() {
            self.play(Some(&line));
        }
    }

    /// Handles one step of the simulation in bot-test mode.
    fn tick(&mut self) {
        if self.game.mode() == GameMode::BotTest {
            self.play(None);
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let _guard = setup_logging(&args)?;

    let map = GridMap::load(&args.map).context("Failed to load map")?;
    let mut game = Game::new(
        map,
        GameConfig {
            mode: args.mode.into(),
            seed: args.seed,
        },
    );

    if args.headless {
        console::run(&mut game, args.trace, args.max_rounds)?;
    } else {
        // Set up the terminal
        let mut terminal = setup_terminal()?;

        let mut app = App::new(game, args.trace);
        let result = run_app(&mut terminal, &mut app);

        // Restore the terminal state before reporting any error
        restore_terminal(&mut terminal)?;
        result?;
        game = app.game;
    }

    if let Some(outcome) = game.outcome() {
        tracing::info!("Final outcome: {}", outcome);
    }
    if let Some(path) = &args.report {
        write_report(&game, path)?;
    }
    Ok(())
}

/// Installs the tracing subscriber. The TUI owns the terminal, so it only
/// logs when given a directory; headless runs log to stderr.
fn setup_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let env_filter = || {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into())
    };

    if let Some(dir) = &args.log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let file_appender = tracing_appender::rolling::never(dir, "gold_hunt.log");
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(writer)
            .with_ansi(false)
            .init();
        tracing::info!("Logging to {}", dir.join("gold_hunt.log").display());
        return Ok(Some(guard));
    }

    if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(io::stderr)
            .init();
    }
    Ok(None)
}

fn write_report(game: &Game, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&game.report())?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250); // bot-test pace
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => app.quit(),
                        KeyCode::Enter => app.submit(),
                        KeyCode::Backspace => {
                            app.input.pop();
                        }
                        KeyCode::Char(c) => app.input.push(c),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let map_height = if app.trace {
        app.game.map().rows() as u16 + 2
    } else {
        0
    };
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(map_height), // full map, trace only
            Constraint::Min(5),             // transcript
            Constraint::Length(4),          // entities
            Constraint::Length(3),          // command input
        ])
        .split(frame.area());

    if app.trace {
        render_map(frame, main_layout[0], &app.game);
    }
    render_log(frame, main_layout[1], &app.log);
    render_entities(frame, main_layout[2], &app.game, app.trace);
    render_input(frame, main_layout[3], app);
}

/// Renders the transcript, keeping the newest lines in view.
fn render_log(frame: &mut Frame, area: Rect, log: &[String]) {
    let visible = area.height.saturating_sub(2) as usize;
    let offset = log.len().saturating_sub(visible) as u16;
    let lines: Vec<Line> = log.iter().map(|l| Line::from(l.as_str())).collect();
    let paragraph = Paragraph::new(lines)
        .scroll((offset, 0))
        .block(Block::default().borders(Borders::ALL).title("Gold Hunt"));
    frame.render_widget(paragraph, area);
}

/// Renders both entities; the bot's details are only shown with trace.
fn render_entities(frame: &mut Frame, area: Rect, game: &Game, trace: bool) {
    let mut items = vec![ListItem::from(Line::from(Span::styled(
        format!("Gold owned: {}", game.player().gold_owned()),
        Style::default().fg(Color::Yellow),
    )))];
    if trace {
        items.push(ListItem::from(format!(
            "{} | bot commands: {}",
            game.bot(),
            game.bot_moves()
        )));
    }
    let widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(widget, area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let (text, title) = match (app.game.outcome(), app.game.mode()) {
        (Some(outcome), _) => (outcome.to_string(), "Game over, press Esc to leave"),
        (None, GameMode::PlayerAndBot) => (
            format!("{}_", app.input),
            "Enter command (HELLO, GOLD, LOOK, MOVE N/E/S/W, PICKUP, QUIT), Esc to leave",
        ),
        (None, GameMode::BotTest) => (String::new(), "Bot test running, Esc to leave"),
    };
    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

fn tile_span(tile: Tile) -> Span<'static> {
    let style = match tile {
        Tile::Wall => Style::default().fg(Color::DarkGray),
        Tile::Gold => Style::default().fg(Color::Yellow),
        Tile::Exit => Style::default().fg(Color::Green),
        Tile::Player => Style::default().fg(Color::Cyan).bold(),
        Tile::Bot => Style::default().fg(Color::Red).bold(),
        Tile::Space => Style::default(),
    };
    Span::styled(tile.symbol().to_string(), style)
}

/// Renders the full board with both entities onto the frame.
fn render_map(frame: &mut Frame, area: Rect, game: &Game) {
    let map = game.map();
    let overlays: [(Position, Tile); 2] = [
        (game.player().position, game.player().symbol),
        (game.bot().position, game.bot().symbol),
    ];

    let mut lines: Vec<Line> = Vec::with_capacity(map.rows());
    for row in 0..map.rows() {
        let Some(cells) = map.tiles().row(row) else {
            break;
        };
        let spans: Vec<Span> = cells
            .iter()
            .enumerate()
            .map(|(column, tile)| {
                let here = Position::new(row as isize, column as isize);
                let shown = overlays
                    .iter()
                    .find(|(at, _)| *at == here)
                    .map_or(*tile, |(_, marker)| *marker);
                tile_span(shown)
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let title = format!("{} (win {})", map.name(), map.gold_required());
    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}
