//! evpump - Scripted Input Replay
//!
//! Feeds a JSON script of keyboard/mouse steps through the event system and
//! logs every event the application side receives.
//!
//! Usage: evpump [--config <path>] [--filter-motion] <script.json>
//!
//! Architecture:
//! - ReplaySource is registered as the only event source
//! - The main loop blocks in wait_event until Quit arrives
//! - The script's end posts a Quit behind the replayed input

mod replay;

use anyhow::{Context, Result};
use evpump_core::config::load_config;
use evpump_core::{filter_fn, EventConfig, EventMask, EventSystem};
use replay::{ReplayScript, ReplaySource};
use std::path::PathBuf;
use tracing::{debug, info};

/// Command line options
#[derive(Debug, Default, Clone)]
struct Options {
    /// Explicit config file, otherwise the data directory one is used
    config: Option<PathBuf>,
    /// Drop mouse motion through an event filter
    filter_motion: bool,
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    info!("evpump starting...");

    let options = parse_args(std::env::args().skip(1))?;
    debug!("Options: {:?}", options);

    let script_path = options
        .script
        .clone()
        .context("Usage: evpump [--config <path>] [--filter-motion] <script.json>")?;

    let config = match &options.config {
        Some(path) => EventConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => load_config(),
    };

    let script = ReplayScript::load(&script_path)?;
    let received = run(config, script, options.filter_motion)?;

    info!("evpump finished, {} events received", received);
    Ok(())
}

/// Replay `script` and drain events until Quit; returns how many were received
fn run(config: EventConfig, script: ReplayScript, filter_motion: bool) -> Result<usize> {
    let system = EventSystem::init(config).context("Failed to initialize event system")?;

    if filter_motion {
        system.set_event_filter(Some(filter_fn(|event| {
            !EventMask::MOUSE_MOTION.matches(event)
        })));
    }

    let source = ReplaySource::new(script, system.quit_handle());
    info!("Replaying {} steps", source.remaining());
    system.add_source(Box::new(source));

    let mut received = 0;
    loop {
        let event = system.wait_event()?;
        received += 1;
        info!("[{}] {:?}", event.event_type(), event);
        if event.is_quit() {
            break;
        }
    }

    system.shutdown();
    Ok(received)
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> Result<Options>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                options.config = Some(PathBuf::from(path));
            }
            "--filter-motion" => options.filter_motion = true,
            _ if arg.starts_with("--") => anyhow::bail!("Unknown option: {}", arg),
            _ => options.script = Some(PathBuf::from(arg)),
        }
    }

    Ok(options)
}
