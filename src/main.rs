//! Footctl - MIDI foot controller core
//!
//! Runs the controller core on a host: SysEx librarian protocol over a
//! MIDI port pair, a file-backed preset store, and the touchscreen link
//! (console-logged in this build).

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam::channel::{self, RecvTimeoutError};
use midir::{MidiInput, MidiOutput, MidiOutputConnection};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use footctl::app::App;
use footctl::config::AppConfig;
use footctl::midi::{wrap_sysex, SysexSink};
use footctl::screen::ConsolePort;
use footctl::storage::{FileStorage, MemStorage, PresetStore, StorageDevice};

/// Footctl - MIDI foot controller core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Run with in-memory storage (fresh factory library, nothing persisted)
    #[arg(long)]
    demo: bool,
}

/// Polling interval of the main loop.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting footctl...");

    if args.list_ports {
        list_ports()?;
        return Ok(());
    }

    let config = AppConfig::load(args.config.as_ref())?;

    let storage: Box<dyn StorageDevice> = if args.demo {
        info!("demo mode: in-memory storage");
        Box::new(MemStorage::new())
    } else {
        let path = config.storage.image_path();
        info!(path = %path.display(), "opening storage image");
        Box::new(FileStorage::open(&path)?)
    };
    let mut store = PresetStore::new(storage);
    if args.demo {
        store.reset()?;
    }

    // MIDI in: raw bytes from the callback thread into the polling loop.
    let (tx, rx) = channel::unbounded::<Vec<u8>>();
    let midi_in = MidiInput::new("footctl")?;
    let in_port = find_port(midi_in.ports(), |p| midi_in.port_name(p), &config.midi.input_port)?;
    let _in_connection = midi_in
        .connect(
            &in_port,
            "footctl-in",
            move |_stamp, message, _| {
                let _ = tx.send(message.to_vec());
            },
            (),
        )
        .map_err(|e| anyhow!("failed to open MIDI input: {e}"))?;

    let midi_out = MidiOutput::new("footctl")?;
    let out_port = find_port(midi_out.ports(), |p| midi_out.port_name(p), &config.midi.output_port)?;
    let out_connection = midi_out
        .connect(&out_port, "footctl-out")
        .map_err(|e| anyhow!("failed to open MIDI output: {e}"))?;
    info!("MIDI ports connected");

    let mut app = App::new(store, MidirSink(out_connection), ConsolePort);
    app.startup(config.screen.high_baud)
        .context("screen bring-up failed")?;
    info!("✅ footctl up, entering polling loop");

    let started = Instant::now();
    loop {
        let now_ms = started.elapsed().as_millis() as u64;

        // At most one MIDI event per iteration.
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(bytes) => {
                if let Err(e) = app.on_midi(&bytes, now_ms) {
                    warn!("MIDI event failed: {e:#}");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Err(e) = app.drain_screen(now_ms) {
            warn!("screen drain failed: {e:#}");
        }
        if let Err(e) = app.tick(now_ms) {
            warn!("tick failed: {e:#}");
        }
    }

    info!("footctl shutdown complete");
    Ok(())
}

/// Outbound SysEx over a midir connection.
struct MidirSink(MidiOutputConnection);

impl SysexSink for MidirSink {
    fn send(&mut self, body: &[u8]) -> Result<()> {
        self.0
            .send(&wrap_sysex(body))
            .map_err(|e| anyhow!("MIDI send failed: {e}"))
    }
}

/// Pick the port whose name contains `pattern`, or the first port when the
/// pattern is empty.
fn find_port<P: Clone>(
    ports: Vec<P>,
    name_of: impl Fn(&P) -> Result<String, midir::PortInfoError>,
    pattern: &str,
) -> Result<P> {
    if ports.is_empty() {
        return Err(anyhow!("no MIDI ports available"));
    }
    if pattern.is_empty() {
        return Ok(ports[0].clone());
    }
    ports
        .iter()
        .find(|p| {
            name_of(p)
                .map(|name| name.to_lowercase().contains(&pattern.to_lowercase()))
                .unwrap_or(false)
        })
        .cloned()
        .ok_or_else(|| anyhow!("no MIDI port matching '{pattern}'"))
}

fn list_ports() -> Result<()> {
    let midi_in = MidiInput::new("footctl")?;
    println!("Input ports:");
    for port in midi_in.ports() {
        println!("  {}", midi_in.port_name(&port).unwrap_or_default());
    }

    let midi_out = MidiOutput::new("footctl")?;
    println!("Output ports:");
    for port in midi_out.ports() {
        println!("  {}", midi_out.port_name(&port).unwrap_or_default());
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
