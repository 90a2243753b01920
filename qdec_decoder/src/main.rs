//! # qdec - dual quadrature encoder decoder
//!
//! Decodes the configured rotary encoders and reports every position change
//! as a log event and a JSON line on stdout (one topic per encoder).
//!
//! # Usage
//!
//! ```bash
//! # Simulated encoders with a short demo rotation
//! qdec --simulate --seconds 5
//!
//! # Raspberry Pi, raw quarter-steps, 500 µs glitch filter
//! qdec --backend rppal --mode raw --glitch 500
//!
//! # Custom wiring, JSON logs
//! qdec --config /etc/qdec/qdec.toml -a 5 -b 6 --json
//! ```

use clap::{Parser, ValueEnum};
use qdec_common::config::{ConfigError, EncoderConfig, Mode, QdecConfig};
use qdec_common::consts::DEFAULT_CONFIG_PATH;
use qdec_common::gpio::{ChannelId, GpioBackend};
use qdec_decoder::backends::simulation::{self, SimulatedGpio};
use qdec_decoder::notifier::{self, Notifier};
use qdec_decoder::{BackendRegistry, EncoderBank, EncoderError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Reporting mode on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Every quarter-step.
    Raw,
    /// One count per detent click.
    Detent,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Raw => Mode::Raw,
            ModeArg::Detent => Mode::Detent,
        }
    }
}

/// qdec - quadrature rotary encoder decoder
#[derive(Parser, Debug)]
#[command(name = "qdec")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Decode quadrature rotary encoders from GPIO edges")]
#[command(long_about = None)]
struct Args {
    /// Configuration file. Defaults to /etc/qdec/qdec.toml when present.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Channel A of the first encoder
    #[arg(short = 'a', value_name = "GPIO")]
    enc_a_channel_a: Option<ChannelId>,

    /// Channel B of the first encoder
    #[arg(short = 'b', value_name = "GPIO")]
    enc_a_channel_b: Option<ChannelId>,

    /// Channel A of the second encoder
    #[arg(short = 'c', value_name = "GPIO")]
    enc_b_channel_a: Option<ChannelId>,

    /// Channel B of the second encoder
    #[arg(short = 'd', value_name = "GPIO")]
    enc_b_channel_b: Option<ChannelId>,

    /// Reporting mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Glitch filter window in microseconds
    #[arg(long, value_name = "US")]
    glitch: Option<u32>,

    /// Run time in seconds (0 = until Ctrl-C)
    #[arg(long)]
    seconds: Option<u64>,

    /// GPIO backend name
    #[arg(long)]
    backend: Option<String>,

    /// Force the simulation backend and drive a demo rotation
    #[arg(short = 's', long)]
    simulate: bool,

    /// List compiled-in backends and exit
    #[arg(long)]
    list_backends: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("qdec failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args);
    let level = match &config {
        _ if args.verbose => Level::DEBUG,
        Ok(config) => config.shared.log_level.into(),
        Err(_) => Level::INFO,
    };
    setup_tracing(level, args.json);

    let registry = BackendRegistry::with_builtin();
    if args.list_backends {
        for name in registry.list() {
            println!("{name}");
        }
        return Ok(());
    }

    let config = config?;
    info!(
        "{} v{} starting ({} encoder(s), {:?}, backend '{}')",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION"),
        config.encoders.len(),
        config.decoder.mode,
        config.decoder.backend
    );

    // The simulation backend is built here so the demo can drive it.
    let simulated = (config.decoder.backend == simulation::BACKEND_NAME)
        .then(|| Arc::new(SimulatedGpio::new()));
    let backend: Arc<dyn GpioBackend> = match &simulated {
        Some(gpio) => Arc::clone(gpio) as Arc<dyn GpioBackend>,
        None => registry.create(&config.decoder.backend)?,
    };

    let bank = EncoderBank::from_config(backend, &config, |entry| {
        build_notifier(entry, &config)
    })?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let demo = match simulated {
        Some(gpio) => Some(spawn_demo(gpio, &config.encoders, Arc::clone(&running))?),
        None => None,
    };

    let deadline = (config.decoder.run_seconds > 0)
        .then(|| Instant::now() + Duration::from_secs(config.decoder.run_seconds));
    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Run time elapsed");
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }
    running.store(false, Ordering::SeqCst);

    if let Some(demo) = demo {
        if demo.join().is_err() {
            warn!("Demo thread panicked");
        }
    }

    bank.cancel();
    for (name, position) in bank.positions() {
        info!("Final position of '{}': {}", name, position);
    }
    drop(bank);

    info!("qdec shutdown complete");
    Ok(())
}

/// Load the configuration file and apply command-line overrides.
fn load_config(args: &Args) -> Result<QdecConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => QdecConfig::load_validated(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            QdecConfig::load_validated(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => QdecConfig::default(),
    };

    let overrides = [
        (0, args.enc_a_channel_a, args.enc_a_channel_b),
        (1, args.enc_b_channel_a, args.enc_b_channel_b),
    ];
    for (index, channel_a, channel_b) in overrides {
        if channel_a.is_none() && channel_b.is_none() {
            continue;
        }
        let encoder = config.encoders.get_mut(index).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "channel override for encoder #{} but only {} configured",
                index + 1,
                index
            ))
        })?;
        if let Some(channel) = channel_a {
            encoder.channel_a = channel;
        }
        if let Some(channel) = channel_b {
            encoder.channel_b = channel;
        }
    }

    if let Some(mode) = args.mode {
        config.decoder.mode = mode.into();
    }
    if let Some(glitch) = args.glitch {
        config.decoder.noise_filter_us = glitch;
    }
    if let Some(seconds) = args.seconds {
        config.decoder.run_seconds = seconds;
    }
    if let Some(backend) = &args.backend {
        config.decoder.backend = backend.clone();
    }
    if args.simulate {
        config.decoder.backend = simulation::BACKEND_NAME.to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Log event plus JSON line on stdout, delivered from a worker thread.
fn build_notifier(
    entry: &EncoderConfig,
    config: &QdecConfig,
) -> Result<Arc<dyn Notifier>, EncoderError> {
    notifier::telemetry(
        &entry.name,
        entry.topic(),
        std::io::stdout(),
        &config.decoder.notify,
    )
}

/// Turn every simulated encoder a few clicks forward and back until stopped.
fn spawn_demo(
    gpio: Arc<SimulatedGpio>,
    encoders: &[EncoderConfig],
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    let pairs: Vec<(ChannelId, ChannelId)> = encoders
        .iter()
        .map(|e| (e.channel_a, e.channel_b))
        .collect();
    info!("Simulation demo driving {} encoder(s)", pairs.len());

    thread::Builder::new()
        .name("qdec-demo".to_string())
        .spawn(move || {
            // Three clicks forward, two back, per encoder.
            let script = [4, 4, 4, -4, -4];
            for quarter_steps in script {
                for &(a, b) in &pairs {
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    gpio.rotate(a, b, quarter_steps);
                }
                thread::sleep(Duration::from_millis(200));
            }
        })
}

/// Setup tracing subscriber.
fn setup_tracing(level: Level, json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
