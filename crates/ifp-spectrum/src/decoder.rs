//! The bus decode engine.
//!
//! Runs alone on its core with interrupts masked. Each iteration polls the
//! memory-request channel and, only when that is empty, the I/O-request
//! channel; a received record is decoded and answered before the next poll.
//! Nothing in the loop blocks or allocates: the Z80 sits in a wait state
//! until the response lands in the sequencer's TX FIFO.
//!
//! Memory requests always win. Sustained memory traffic starves the I/O
//! channel; the Spectrum's bus mix never sustains it long enough to matter.

use ifp_core::{
    BusCycle, ControlLines, Observable, PinMap, PinMapError, Response, TransactionRecord, Value,
    parse_address,
};
use rp2350_pio::{IoRequestChannel, MemoryRequestChannel};
use serde::Serialize;

use crate::handshake::StartReceiver;
use crate::overlay::{DisablePolicy, NeverDisable, Overlay, RomcsLine};
use crate::ports::{PortHandler, PortTable, Unemulated};
use crate::rom::ShadowRom;

/// Addresses whose access re-enables the overlay: the NMI vector, the
/// RST 8 error restart and the shadow-ROM error handler entry.
pub const TRAP_ADDRESSES: [u16; 3] = [0x0066, 0x0008, 0x1708];

#[inline]
#[must_use]
pub const fn is_trap(address: u16) -> bool {
    matches!(address, 0x0066 | 0x0008 | 0x1708)
}

const MEMORY_READ: ControlLines = ControlLines::MREQ.union(ControlLines::RD);

/// One transaction serviced by [`Decoder::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serviced {
    Memory {
        record: TransactionRecord,
        response: Response,
    },
    Io {
        record: TransactionRecord,
        response: Response,
    },
}

impl Serviced {
    #[must_use]
    pub fn record(&self) -> TransactionRecord {
        match *self {
            Self::Memory { record, .. } | Self::Io { record, .. } => record,
        }
    }

    #[must_use]
    pub fn response(&self) -> Response {
        match *self {
            Self::Memory { response, .. } | Self::Io { response, .. } => response,
        }
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory { .. })
    }
}

/// Wrapping transaction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Records taken from the memory-request channel.
    pub memory: u64,
    /// Records taken from the I/O-request channel.
    pub io: u64,
    /// Responses that drove the data bus.
    pub substituted: u64,
    /// Trap-address hits.
    pub traps: u64,
}

impl ServiceStats {
    /// Counts accumulated since `earlier` was taken.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            memory: self.memory.wrapping_sub(earlier.memory),
            io: self.io.wrapping_sub(earlier.io),
            substituted: self.substituted.wrapping_sub(earlier.substituted),
            traps: self.traps.wrapping_sub(earlier.traps),
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.memory.wrapping_add(self.io)
    }
}

/// The decode engine. Owns both channels and the overlay state; borrows
/// the installed ROM.
pub struct Decoder<'r, M, I, L, H = Unemulated, D = NeverDisable> {
    rom: &'r ShadowRom,
    memory: M,
    io: I,
    overlay: Overlay<L>,
    ports: PortTable<H>,
    policy: D,
    pins: PinMap,
    stats: ServiceStats,
}

impl<'r, M, I, L> Decoder<'r, M, I, L>
where
    M: MemoryRequestChannel,
    I: IoRequestChannel,
    L: RomcsLine,
{
    /// Assemble an engine with no peripheral emulation, the never-disable
    /// overlay policy and the Interface Pico pin layout.
    pub fn new(rom: &'r ShadowRom, memory: M, io: I, overlay: Overlay<L>) -> Self {
        Self {
            rom,
            memory,
            io,
            overlay,
            ports: PortTable::new(Unemulated),
            policy: NeverDisable,
            pins: PinMap::INTERFACE_PICO,
            stats: ServiceStats::default(),
        }
    }
}

impl<'r, M, I, L, H, D> Decoder<'r, M, I, L, H, D>
where
    M: MemoryRequestChannel,
    I: IoRequestChannel,
    L: RomcsLine,
    H: PortHandler,
    D: DisablePolicy,
{
    /// Replace the peripheral port table.
    pub fn with_ports<H2: PortHandler>(self, ports: PortTable<H2>) -> Decoder<'r, M, I, L, H2, D> {
        Decoder {
            rom: self.rom,
            memory: self.memory,
            io: self.io,
            overlay: self.overlay,
            ports,
            policy: self.policy,
            pins: self.pins,
            stats: self.stats,
        }
    }

    /// Replace the overlay disable policy.
    pub fn with_disable_policy<D2: DisablePolicy>(self, policy: D2) -> Decoder<'r, M, I, L, H, D2> {
        Decoder {
            rom: self.rom,
            memory: self.memory,
            io: self.io,
            overlay: self.overlay,
            ports: self.ports,
            policy,
            pins: self.pins,
            stats: self.stats,
        }
    }

    /// Use a different bus-word layout, rejecting one that does not fit a
    /// 32-bit word or maps two signals to the same bit.
    pub fn with_pins(mut self, pins: PinMap) -> Result<Self, PinMapError> {
        pins.validate()?;
        self.pins = pins;
        Ok(self)
    }

    /// Wait for the companion core to finish shared I/O set-up, then warm
    /// the ROM. No record is taken from either channel before this returns.
    pub fn await_start(&mut self, start: &mut StartReceiver) {
        start.wait();
        let checksum = self.rom.prime();
        log::info!(
            "bus decoder running: ROM {} bytes (sum {checksum:#06X}), window {:#06X}, overlay {}",
            self.rom.len(),
            self.rom.window().size(),
            if self.overlay.is_enabled() { "on" } else { "off" },
        );
    }

    /// Service forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// One loop iteration: answer at most one record, memory requests first.
    #[inline]
    pub fn step(&mut self) -> Option<Serviced> {
        if let Some(record) = self.memory.try_receive() {
            let response = self.decode_memory(record);
            self.memory.send(response);
            self.stats.memory = self.stats.memory.wrapping_add(1);
            self.count_substitution(response);
            return Some(Serviced::Memory { record, response });
        }

        let record = self.io.try_receive()?;
        let response = self.decode_io(record);
        self.io.send(response);
        self.stats.io = self.stats.io.wrapping_add(1);
        self.count_substitution(response);
        Some(Serviced::Io { record, response })
    }

    /// Busy-poll until `transactions` records have been answered.
    ///
    /// Never returns if the sequencers stop producing records.
    pub fn run_for(&mut self, transactions: u64) -> ServiceStats {
        let before = self.stats;
        let mut done = 0;
        while done < transactions {
            if self.step().is_some() {
                done += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        self.stats.since(&before)
    }

    /// Answer records until both channels are empty. Returns how many were
    /// serviced.
    pub fn run_until_idle(&mut self) -> u64 {
        let mut done = 0;
        while self.step().is_some() {
            done += 1;
        }
        done
    }

    /// Decode a record from the memory-request channel.
    #[inline]
    pub fn decode_memory(&mut self, record: TransactionRecord) -> Response {
        let cycle = self.pins.decode(record);
        let address = cycle.address;

        if self.overlay.is_enabled()
            && cycle.lines.contains(MEMORY_READ)
            && self.rom.window().contains(address)
        {
            return Response::drive(self.rom.read(address));
        }

        if cycle.is_memory_request() {
            if is_trap(address) {
                self.overlay.enable();
                self.stats.traps = self.stats.traps.wrapping_add(1);
                log::debug!("trap at {address:#06X}: overlay on");
                return Response::drive(self.rom.read(address));
            }
            if self.overlay.is_enabled() && self.policy.should_disable(&cycle) {
                self.overlay.disable();
                log::debug!("overlay off after access to {address:#06X}");
            }
            return Response::RELEASE;
        }

        // /MREQ high: the capture program also fires on /IORQ-only cycles.
        self.ports.read(address)
    }

    /// Decode a record from the I/O-request channel.
    #[inline]
    pub fn decode_io(&mut self, record: TransactionRecord) -> Response {
        let cycle = self.pins.decode(record);
        if cycle.is_read() {
            return self.ports.read(cycle.address);
        }
        self.ports.write(cycle.address, cycle.data);
        Response::RELEASE
    }

    fn count_substitution(&mut self, response: Response) {
        if response.drives_bus() {
            self.stats.substituted = self.stats.substituted.wrapping_add(1);
        }
    }

    #[must_use]
    pub fn overlay(&self) -> &Overlay<L> {
        &self.overlay
    }

    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        self.stats
    }

    #[must_use]
    pub fn rom(&self) -> &ShadowRom {
        self.rom
    }

    #[must_use]
    pub fn pins(&self) -> &PinMap {
        &self.pins
    }

    #[must_use]
    pub fn ports(&self) -> &PortTable<H> {
        &self.ports
    }

    /// The memory-request and I/O-request channels.
    #[must_use]
    pub fn channels(&self) -> (&M, &I) {
        (&self.memory, &self.io)
    }

    /// Decode `record` with this engine's pin layout, without servicing it.
    #[must_use]
    pub fn inspect(&self, record: TransactionRecord) -> BusCycle {
        self.pins.decode(record)
    }
}

impl<M, I, L, H, D> Observable for Decoder<'_, M, I, L, H, D>
where
    M: MemoryRequestChannel,
    I: IoRequestChannel,
    L: RomcsLine,
    H: PortHandler,
    D: DisablePolicy,
{
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("rom.") {
            let address = parse_address(rest)?;
            return self
                .rom
                .window()
                .contains(address)
                .then(|| Value::U8(self.rom.read(address)));
        }
        match path {
            "overlay.enabled" => Some(self.overlay.is_enabled().into()),
            "overlay.window" => Some(self.rom.window().size().into()),
            "stats.memory" => Some(self.stats.memory.into()),
            "stats.io" => Some(self.stats.io.into()),
            "stats.substituted" => Some(self.stats.substituted.into()),
            "stats.traps" => Some(self.stats.traps.into()),
            "stats.total" => Some(self.stats.total().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "overlay.enabled",
            "overlay.window",
            "stats.memory",
            "stats.io",
            "stats.substituted",
            "stats.traps",
            "stats.total",
            "rom.<address>",
        ]
    }
}
