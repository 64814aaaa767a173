//! Replay a bus trace through the Interface Pico decode core.
//!
//! Models the board's bring-up harnesses on the host: the decoder runs
//! against a simulated PIO block instead of the edge connector, and every
//! serviced transaction is printed as a JSON line.
//!
//! ```text
//! ifp-replay --trace boot.jsonl [--rom 48.rom] [--config board.json]
//!            [--overlay on|off] [--summary]
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use ifp_core::{Observable, Value};
use ifp_spectrum::trace::{load_trace, replay};
use ifp_spectrum::{AdapterConfig, Decoder, Overlay, RomcsLatch, ShadowRom, start_fifo};
use rp2350_pio::{PioChannel, SimPio};

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    trace_path: Option<PathBuf>,
    rom_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    overlay: Option<bool>,
    summary: bool,
}

fn usage() -> ! {
    eprintln!(
        "Usage: ifp-replay --trace <file> [--rom <file>] [--config <file>] [--overlay on|off] [--summary]"
    );
    process::exit(2);
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        trace_path: None,
        rom_path: None,
        config_path: None,
        overlay: None,
        summary: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--trace" => {
                i += 1;
                cli.trace_path = args.get(i).map(PathBuf::from);
            }
            "--rom" => {
                i += 1;
                cli.rom_path = args.get(i).map(PathBuf::from);
            }
            "--config" => {
                i += 1;
                cli.config_path = args.get(i).map(PathBuf::from);
            }
            "--overlay" => {
                i += 1;
                cli.overlay = match args.get(i).map(String::as_str) {
                    Some("on") => Some(true),
                    Some("off") => Some(false),
                    _ => usage(),
                };
            }
            "--summary" => {
                cli.summary = true;
            }
            "--help" | "-h" => usage(),
            other => {
                eprintln!("Unknown argument: {other}");
                usage();
            }
        }
        i += 1;
    }
    cli
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("ifp-replay: {message}");
    process::exit(1);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = parse_args();

    let Some(trace_path) = cli.trace_path else {
        usage();
    };

    let mut config = match &cli.config_path {
        Some(path) => AdapterConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => AdapterConfig::default(),
    };
    if cli.rom_path.is_some() {
        config.rom = cli.rom_path;
    }
    if let Some(on) = cli.overlay {
        config.overlay_at_start = on;
    }

    let rom: ShadowRom = config.load_rom().unwrap_or_else(|e| fail(e));
    let (memory_sm, io_sm) = config.state_machines().unwrap_or_else(|e| fail(e));
    let events = load_trace(&trace_path).unwrap_or_else(|e| fail(e));

    let pio = SimPio::new();
    let mut decoder = Decoder::new(
        &rom,
        PioChannel::new(&pio, memory_sm),
        PioChannel::new(&pio, io_sm),
        Overlay::new(RomcsLatch::new(), config.overlay_at_start),
    )
    .with_pins(config.pins)
    .unwrap_or_else(|e| fail(e));

    // Host side of the handshake: nothing else to set up, release at once.
    let (start, mut started) = start_fifo();
    start.signal();
    decoder.await_start(&mut started);

    for line in replay(&mut decoder, &pio, &events) {
        match serde_json::to_string(&line) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(e),
        }
    }

    if cli.summary {
        let mut summary: BTreeMap<&str, Value> = decoder
            .query_paths()
            .iter()
            .filter_map(|&path| decoder.query(path).map(|value| (path, value)))
            .collect();
        summary.insert("romcs.writes", Value::U64(decoder.overlay().line().writes()));
        match serde_json::to_string(&summary) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => fail(e),
        }
    }
}
