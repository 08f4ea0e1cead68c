use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pokeview::config::Config;
use pokeview::fetch::{PokemonApi, PokemonSource};
use pokeview::ui::{draw_ui, App};
use pokeview::utils::capitalize_first;

#[derive(Parser, Debug)]
#[command(author, version, about = "Look up Pokémon by national dex number", long_about = None)]
struct Args {
    /// Root of the REST API (overrides POKEVIEW_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the browser UI (default)
    Serve {
        /// Bind address (overrides POKEVIEW_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides POKEVIEW_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Browse in the terminal
    Tui {
        /// Id to start on
        #[arg(long)]
        id: Option<u32>,
    },
    /// Print one Pokémon's name, stats and sprite URL, then exit
    Show { id: u32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(url) = args.base_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            init_stderr_logging();
            let source: Arc<dyn PokemonSource> = Arc::new(PokemonApi::new(&config.base_url));
            let addr = config.bind_addr();
            pokeview::web::serve(config, source)
                .await
                .with_context(|| format!("web server on {} failed", addr))
        }
        Command::Show { id } => {
            init_stderr_logging();
            show(&config, id).await
        }
        Command::Tui { id } => {
            if let Some(id) = id {
                config.initial_id = config.clamp_id(id);
            }
            let _guard = init_file_logging()?;
            run_tui(config).await
        }
    }
}

async fn show(config: &Config, id: u32) -> Result<()> {
    let api = PokemonApi::new(&config.base_url);
    let pokemon = api
        .get_pokemon(id)
        .await
        .with_context(|| format!("could not fetch #{}", id))?;
    println!("{}", capitalize_first(pokemon.name()));
    for (name, value) in pokemon.stats_snapshot()?.iter() {
        println!("  {:<16}{:>4}", name.as_ref(), value);
    }
    println!(
        "  sprite          {}",
        pokemon.images().front_default().unwrap_or("(none)")
    );
    Ok(())
}

async fn run_tui(config: Config) -> Result<()> {
    let source: Arc<dyn PokemonSource> = Arc::new(PokemonApi::new(&config.base_url));
    let mut app = App::new(config, source);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(LeaveAlternateScreen)?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        app.sync_sprite();
        draw_ui(terminal, app)?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key.code) {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// The terminal UI owns the screen, so logs go to a file instead.
fn init_file_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = std::env::temp_dir().join("pokeview");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("could not create {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "tui.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false),
        )
        .init();

    tracing::info!("Log file: {}/tui.log", log_dir.display());
    Ok(guard)
}
