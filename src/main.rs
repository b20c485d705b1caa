// wlantop - live 802.11 monitor
// Nodes, networks and channels of the surrounding wireless spectrum at a glance

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wlantop::app::{event::handle_key_event, AppState, EngineConfig, HopConfig, RefreshConfig};
use wlantop::engine::channel::ChannelDef;
use wlantop::engine::essid::SplitTrigger;
use wlantop::engine::filter::PacketFilter;
use wlantop::engine::Engine;
use wlantop::source::{SynthConfig, SyntheticSource};
use wlantop::wlan::MacAddr;
use wlantop::{app::config, ui};

#[derive(Parser)]
#[command(name = "wlantop")]
#[command(author, version, about = "Live 802.11 spectrum monitor")]
struct Cli {
    /// Seconds without frames before a node is removed
    #[arg(long, default_value_t = config::NODE_TIMEOUT.as_secs())]
    node_timeout: u64,

    /// Milliseconds spent on each channel while hopping
    #[arg(long, default_value_t = config::CHANNEL_TIME.as_millis() as u64)]
    channel_time: u64,

    /// Display refresh interval in milliseconds
    #[arg(long, default_value_t = config::DISPLAY_INTERVAL_MS)]
    display_interval: u64,

    /// Stay on the start channel
    #[arg(long)]
    no_hop: bool,

    /// Channel number to start on
    #[arg(short, long, default_value_t = 1)]
    channel: u32,

    /// Only probe responses may reveal a hidden network's name
    #[arg(long)]
    split_on_probe_response: bool,

    /// Seed of the synthetic traffic source
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Simulated client stations
    #[arg(long, default_value_t = 12)]
    stations: usize,

    /// Synthetic frames per second
    #[arg(long, default_value_t = 400)]
    rate: u32,

    /// Only show frames from this source MAC (repeatable)
    #[arg(long = "filter-mac", value_name = "MAC")]
    filter_macs: Vec<MacAddr>,

    /// Only show frames for this BSSID
    #[arg(long, value_name = "MAC")]
    filter_bssid: Option<MacAddr>,

    /// Write logs to this file (the terminal belongs to the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wlantop=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .init();
    Ok(())
}

fn build_filter(cli: &Cli) -> Result<PacketFilter> {
    let mut filter = PacketFilter::new();
    for mac in &cli.filter_macs {
        if !filter.allow_mac(*mac) {
            bail!("too many --filter-mac entries (max {})", wlantop::engine::filter::MAX_FILTERMAC);
        }
    }
    filter.bssid = cli.filter_bssid;
    Ok(filter)
}

fn build_app(cli: &Cli) -> Result<AppState> {
    let channels = ChannelDef::default_table();
    let engine_config = EngineConfig {
        node_timeout: Duration::from_secs(cli.node_timeout),
        split_trigger: if cli.split_on_probe_response {
            SplitTrigger::ProbeResponse
        } else {
            SplitTrigger::AnyFrame
        },
        ..Default::default()
    };
    let mut engine = Engine::new(engine_config, &channels)?;
    engine.set_filter(build_filter(cli)?);

    let start = engine
        .channels()
        .find_index(cli.channel)
        .with_context(|| format!("channel {} is not in the channel table", cli.channel))?;

    let source = SyntheticSource::new(
        &SynthConfig {
            seed: cli.seed,
            stations: cli.stations,
            rate: cli.rate,
        },
        &channels,
    );
    let hop = HopConfig {
        enabled: !cli.no_hop,
        dwell: Duration::from_millis(cli.channel_time.max(1)),
    };

    let mut app = AppState::new(engine, Box::new(source), &hop, RefreshConfig::with_interval(cli.display_interval));
    app.start(start)?;
    tracing::info!(source = app.source_name(), channel = cli.channel, "capture started");
    Ok(app)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }

    // Fail before touching the terminal
    let app = build_app(&cli)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, mut app: AppState) -> Result<()> {
    loop {
        app.on_tick();
        terminal.draw(|f| ui::draw(f, &mut app))?;

        if !app.running {
            tracing::info!(packets = app.engine.stats().total().packets, "exiting");
            return Ok(());
        }

        if event::poll(app.refresh_config.ui_interval())? {
            if let Event::Key(key) = event::read()? {
                handle_key_event(&mut app, key.code);
            }
        }
    }
}
