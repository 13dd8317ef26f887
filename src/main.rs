pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{info, warn};

use typometer::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, Overrides},
    logging,
    mirror::{HttpMirror, ResultSink},
    progress_log::ProgressLog,
    report::{Report, Reporter},
    runtime::{
        session_key, CrosstermEventSource, FixedTicker, Runner, Ticker, TypingEvent,
        TypingEventSource,
    },
    server,
    session::{Key, Session, SessionResult},
    texts::choose_reference,
    TICK_RATE_MS,
};

/// terminal typing speed test with a local progress log and web dashboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing speed test. Finished results are appended to a local CSV progress log and mirrored to an optional web dashboard (`typometer serve`)."
)]
pub struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,

    /// custom text to type instead of a random sample
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// progress log to append results to (the server's own log under `serve`)
    #[clap(long, global = true)]
    log_file: Option<PathBuf>,

    /// endpoint finished results are posted to
    #[clap(long)]
    server_url: Option<String>,

    /// keep results local, never contact the dashboard server
    #[clap(long)]
    no_mirror: bool,

    /// config file (defaults to config.json in the platform config dir)
    #[clap(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// run the result ingestion service and HTML dashboard
    Serve {
        /// address to listen on, e.g. 127.0.0.1:5000
        #[clap(long)]
        bind: Option<String>,
    },
}

impl Cli {
    /// `--log-file` names the client's log, or the server's under `serve`.
    fn overrides(&self) -> Overrides {
        match &self.command {
            Some(Command::Serve { bind }) => Overrides {
                server_log_file: self.log_file.clone(),
                bind: bind.clone(),
                ..Overrides::default()
            },
            None => Overrides {
                log_file: self.log_file.clone(),
                server_url: self.server_url.clone(),
                no_mirror: self.no_mirror,
                ..Overrides::default()
            },
        }
    }

    fn load_config(&self) -> Config {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        store.load().apply_overrides(&self.overrides())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
}

/// What the event loop should do after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Redraw,
    Quit,
}

pub struct App {
    pub session: Session,
    pub state: AppState,
    pub report: Option<Report>,
    pub mirror_enabled: bool,
    custom_prompt: Option<String>,
    reporter: Reporter,
}

impl App {
    pub fn new(custom_prompt: Option<String>, reporter: Reporter, mirror_enabled: bool) -> Self {
        Self {
            session: Session::new(choose_reference(custom_prompt.as_deref())),
            state: AppState::Typing,
            report: None,
            mirror_enabled,
            custom_prompt,
            reporter,
        }
    }

    fn from_config(cli: &Cli, config: &Config) -> Self {
        let sink: Option<Box<dyn ResultSink>> = if config.mirror {
            Some(Box::new(HttpMirror::new(
                config.server_url.clone(),
                Duration::from_secs(config.mirror_timeout_secs),
            )) as Box<dyn ResultSink>)
        } else {
            None
        };
        let reporter = Reporter::new(ProgressLog::new(config.log_path()), sink);
        Self::new(cli.prompt.clone(), reporter, config.mirror)
    }

    /// Same reference text, fresh session.
    pub fn restart(&mut self) {
        let reference = self.session.reference().to_string();
        self.session.reset(reference);
        self.report = None;
        self.state = AppState::Typing;
    }

    /// New reference text (the custom prompt again when one was given).
    pub fn new_test(&mut self) {
        self.session
            .reset(choose_reference(self.custom_prompt.as_deref()));
        self.report = None;
        self.state = AppState::Typing;
    }

    fn handle_event(&mut self, event: TypingEvent, now: Instant) -> Flow {
        match event {
            TypingEvent::Tick => {
                let mut changed = self.session.on_tick(now);
                if let Some(report) = self.report.as_mut() {
                    if report.is_mirror_pending() && report.poll_mirror().is_some() {
                        changed = true;
                    }
                }
                if changed {
                    Flow::Redraw
                } else {
                    Flow::Continue
                }
            }
            TypingEvent::Resize => Flow::Redraw,
            TypingEvent::Closed => {
                warn!("terminal input closed, exiting");
                Flow::Quit
            }
            TypingEvent::Paste(text) => match self.state {
                AppState::Typing => self.type_key(Key::Paste(text), now),
                AppState::Results => Flow::Continue,
            },
            TypingEvent::Key(key) => self.handle_key(key, now),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        // ctrl+c to quit
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Flow::Quit;
        }

        match key.code {
            KeyCode::Left => {
                self.restart();
                return Flow::Redraw;
            }
            KeyCode::Right => {
                self.new_test();
                return Flow::Redraw;
            }
            _ => {}
        }

        match self.state {
            AppState::Typing => self.type_key(session_key(&key), now),
            AppState::Results => match key.code {
                KeyCode::Char('r') => {
                    self.restart();
                    Flow::Redraw
                }
                KeyCode::Char('n') => {
                    self.new_test();
                    Flow::Redraw
                }
                _ => Flow::Continue,
            },
        }
    }

    fn type_key(&mut self, key: Key, now: Instant) -> Flow {
        if let Some(result) = self.session.handle_key(key, now) {
            self.finish(result);
        }
        Flow::Redraw
    }

    fn finish(&mut self, result: SessionResult) {
        info!(
            "session complete: wpm={}, accuracy={}%, {:.1}s",
            result.wpm, result.accuracy, result.elapsed_secs
        );
        self.report = Some(self.reporter.report(&result));
        self.state = AppState::Results;
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config();

    match cli.command {
        Some(Command::Serve { .. }) => run_serve(&config),
        None => run_client(&cli, &config),
    }
}

fn run_serve(config: &Config) -> anyhow::Result<()> {
    logging::init_stderr();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::run_server(config))
}

fn run_client(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let client_log = AppDirs::client_log_path();
    if let Err(e) = logging::init_file(&client_log) {
        eprintln!("logging disabled, cannot open {}: {}", client_log.display(), e);
    }

    let mut app = App::from_config(cli, config);
    info!(
        "progress log {}, mirror {}",
        config.log_path().display(),
        if config.mirror {
            config.server_url.as_str()
        } else {
            "off"
        }
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        warn!("tui exited with error: {}", e);
    }
    result
}

fn start_tui<B: Backend, E: TypingEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> anyhow::Result<()> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match app.handle_event(runner.step(), Instant::now()) {
            Flow::Quit => break,
            Flow::Redraw => {
                terminal.draw(|f| ui(app, f))?;
            }
            Flow::Continue => {}
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
