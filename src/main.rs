//! Friend Head CLI
//!
//! Behavior core for a desktop companion robot head.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use friend_head::{
    bus::{stdio, LocalBus},
    config::Config,
    core::{parse_proximity, parse_sleep, parse_touch, run, try_parse_touch, Engine},
    telemetry::create_shared_telemetry,
    VERSION,
};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "friend-head")]
#[command(version = VERSION)]
#[command(about = "Behavior core for a desktop companion robot head", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine, exchanging bus traffic as `<topic> <payload>` lines on stdin/stdout
    Run {
        /// Configuration file (defaults to the user config directory)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration file
    Init {
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show how an inbound payload is interpreted
    Parse {
        #[arg(value_enum)]
        channel: ChannelArg,

        payload: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Touch,
    Radar,
    Sleep,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => cmd_run(config.as_deref()),
        Commands::Config { config } => cmd_config(config.as_deref()),
        Commands::Init { config, force } => cmd_init(config.as_deref(), force),
        Commands::Parse { channel, payload } => {
            cmd_parse(channel, &payload);
            Ok(())
        }
    }
}

fn cmd_run(path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(path)?;
    init_tracing(&config.log_filter);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("friend-head-timer")
        .enable_time()
        .build()
        .context("Failed to build timer runtime")?;

    let telemetry = create_shared_telemetry();
    tracing::info!(version = VERSION, session = %telemetry.session_id(), "starting");

    let bus = Arc::new(LocalBus::new());
    let writer = stdio::spawn_writer(bus.tap(), std::io::stdout());

    let engine = Engine::new(
        bus.clone(),
        &config,
        telemetry.clone(),
        runtime.handle().clone(),
    );
    engine
        .start()
        .context("Failed to subscribe to inbound topics")?;

    // Subscriptions exist now, so nothing read from stdin is discarded early
    let _reader = stdio::spawn_reader(bus.clone(), BufReader::new(std::io::stdin()));

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let exit = run(&engine, bus.receiver(), &running);
    tracing::info!(?exit, "inbound pump stopped");

    // Deferred actions go before the bus connection
    engine.shutdown();
    bus.disconnect();
    match writer.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("bridge writer stopped early: {e}"),
        Err(_) => tracing::warn!("bridge writer panicked"),
    }
    runtime.shutdown_timeout(Duration::from_secs(1));

    eprintln!();
    eprintln!("{}", telemetry.summary());
    Ok(())
}

fn cmd_config(path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let shown = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {shown:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);
    if target.exists() && !force {
        bail!("{target:?} already exists (use --force to overwrite)");
    }
    Config::default()
        .save_to(&target)
        .with_context(|| format!("Failed to write {target:?}"))?;
    println!("Wrote default configuration to {target:?}");
    Ok(())
}

fn cmd_parse(channel: ChannelArg, payload: &str) {
    match channel {
        ChannelArg::Touch => {
            let reading = parse_touch(payload);
            let verdict = if reading.is_active() { "active" } else { "released" };
            if try_parse_touch(payload).is_some() {
                println!(
                    "touch: left={} right={} -> {verdict}",
                    reading.left, reading.right
                );
            } else {
                println!("touch: unreadable -> {verdict}");
            }
        }
        ChannelArg::Radar => match parse_proximity(payload) {
            Some(detected) => println!("radar: detected={detected}"),
            None => println!("radar: unreadable -> ignored"),
        },
        ChannelArg::Sleep => match parse_sleep(payload) {
            Some(sleeping) => println!("sleep: sleeping={sleeping}"),
            None => println!("sleep: unrecognized -> ignored"),
        },
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.context("Failed to load configuration")
}

/// Log to stderr; stdout carries bus traffic.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
