//! Bus trace replay.
//!
//! Stands in for the bench harnesses that toggled the bus strobes by hand:
//! a trace of bus cycles is captured into a [`SimPio`] and the decoder
//! services it exactly as it would on the board. Cycles are captured as
//! fast as the RX FIFOs accept them, so memory/I-O priority shows up in the
//! output order.
//!
//! Traces are JSON lines; blank lines and lines starting with `#` are
//! skipped:
//!
//! ```text
//! {"channel": "mreq", "access": "read", "address": 102}
//! {"channel": "iorq", "access": "write", "address": 254, "data": 7}
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use ifp_core::{BusCycle, Observable};
use rp2350_pio::{IoRequest, MemoryRequest, PioChannel, PioError, SimPio};
use serde::{Deserialize, Serialize};

use crate::decoder::{Decoder, Serviced};
use crate::overlay::{DisablePolicy, RomcsLine};
use crate::ports::PortHandler;

/// Which capture program sees the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Mreq,
    Iorq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceEvent {
    pub channel: Channel,
    pub access: Access,
    pub address: u16,
    #[serde(default)]
    pub data: u8,
}

impl TraceEvent {
    /// The bus cycle the host CPU would run for this event.
    #[must_use]
    pub fn cycle(&self) -> BusCycle {
        match (self.channel, self.access) {
            (Channel::Mreq, Access::Read) => BusCycle::memory_read(self.address),
            (Channel::Mreq, Access::Write) => BusCycle::memory_write(self.address, self.data),
            (Channel::Iorq, Access::Read) => BusCycle::io_read(self.address),
            (Channel::Iorq, Access::Write) => BusCycle::io_write(self.address, self.data),
        }
    }
}

/// Parse a JSON-lines trace.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEvent>, TraceError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| TraceError::Parse {
                line: index + 1,
                source,
            })
        })
        .collect()
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceEvent>, TraceError> {
    let text = std::fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(&text)
}

/// One serviced transaction, as printed by the replay tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayLine {
    pub channel: Channel,
    pub address: u16,
    /// Raw response word written to the TX FIFO.
    pub response: u32,
    pub drive: bool,
    pub data: u8,
    /// Overlay state after the transaction.
    pub overlay: bool,
}

type SimDecoder<'r, 'p, L, H, D> = Decoder<
    'r,
    PioChannel<'p, SimPio, MemoryRequest>,
    PioChannel<'p, SimPio, IoRequest>,
    L,
    H,
    D,
>;

/// Capture `events` into `pio` and service them with `decoder`, whose
/// channels must be bound to `pio`.
pub fn replay<L, H, D>(
    decoder: &mut SimDecoder<'_, '_, L, H, D>,
    pio: &SimPio,
    events: &[TraceEvent],
) -> Vec<ReplayLine>
where
    L: RomcsLine,
    H: PortHandler,
    D: DisablePolicy,
{
    let (memory_sm, io_sm) = {
        let (memory, io) = decoder.channels();
        (memory.state_machine(), io.state_machine())
    };
    let mut lines = Vec::with_capacity(events.len());

    for event in events {
        let sm = match event.channel {
            Channel::Mreq => memory_sm,
            Channel::Iorq => io_sm,
        };
        let record = decoder.pins().encode(&event.cycle());
        while let Err(PioError::RxFull(_)) = pio.capture(sm, record) {
            drain(decoder, pio, &mut lines);
        }
    }
    drain(decoder, pio, &mut lines);

    log::info!(
        "replayed {} cycles, overlay {}",
        lines.len(),
        decoder.query("overlay.enabled").map_or_else(String::new, |v| v.to_string())
    );
    lines
}

fn drain<L, H, D>(decoder: &mut SimDecoder<'_, '_, L, H, D>, pio: &SimPio, lines: &mut Vec<ReplayLine>)
where
    L: RomcsLine,
    H: PortHandler,
    D: DisablePolicy,
{
    while let Some(serviced) = decoder.step() {
        let (channel, sm) = match serviced {
            Serviced::Memory { .. } => (Channel::Mreq, decoder.channels().0.state_machine()),
            Serviced::Io { .. } => (Channel::Iorq, decoder.channels().1.state_machine()),
        };
        // Keep the TX FIFO empty, as the sequencer would by shifting the
        // word onto the pins.
        let _ = pio.take_response(sm);

        let response = serviced.response();
        lines.push(ReplayLine {
            channel,
            address: decoder.inspect(serviced.record()).address,
            response: response.raw(),
            drive: response.drives_bus(),
            data: response.data(),
            overlay: decoder.overlay().is_enabled(),
        });
    }
}

#[derive(Debug)]
pub enum TraceError {
    Io { path: PathBuf, source: io::Error },
    Parse { line: usize, source: serde_json::Error },
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { line, source } => write!(f, "trace line {line}: {source}"),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}
