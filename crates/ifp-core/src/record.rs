//! Transaction records captured by the bus sequencers.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::PinMap;

bitflags! {
    /// Asserted control strobes, active high.
    ///
    /// The wire convention is active low; [`PinMap`] decoding inverts it so
    /// a set flag always means "the host is driving this strobe".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ControlLines: u8 {
        const RD   = 0b0000_0001;
        const WR   = 0b0000_0010;
        const MREQ = 0b0000_0100;
        const IORQ = 0b0000_1000;
        const M1   = 0b0001_0000;
    }
}

/// A raw 32-bit bus sample pulled from a sequencer RX FIFO.
///
/// Immutable once captured; the decode engine consumes each record exactly
/// once and answers it with one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionRecord(pub u32);

impl TransactionRecord {
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A transaction record decoded through a [`PinMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusCycle {
    pub address: u16,
    /// Data bus at sample time. Only meaningful on write cycles.
    pub data: u8,
    pub lines: ControlLines,
}

impl BusCycle {
    /// A memory read cycle (/MREQ and /RD low).
    #[must_use]
    pub const fn memory_read(address: u16) -> Self {
        Self {
            address,
            data: 0,
            lines: ControlLines::MREQ.union(ControlLines::RD),
        }
    }

    /// A memory write cycle (/MREQ and /WR low).
    #[must_use]
    pub const fn memory_write(address: u16, data: u8) -> Self {
        Self {
            address,
            data,
            lines: ControlLines::MREQ.union(ControlLines::WR),
        }
    }

    /// An I/O read cycle (/IORQ and /RD low).
    #[must_use]
    pub const fn io_read(port: u16) -> Self {
        Self {
            address: port,
            data: 0,
            lines: ControlLines::IORQ.union(ControlLines::RD),
        }
    }

    /// An I/O write cycle (/IORQ and /WR low).
    #[must_use]
    pub const fn io_write(port: u16, data: u8) -> Self {
        Self {
            address: port,
            data,
            lines: ControlLines::IORQ.union(ControlLines::WR),
        }
    }

    #[must_use]
    pub const fn is_memory_request(&self) -> bool {
        self.lines.contains(ControlLines::MREQ)
    }

    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.lines.contains(ControlLines::RD)
    }

    /// Low byte of the address: the port number the Spectrum decodes.
    #[must_use]
    pub const fn port(&self) -> u8 {
        self.address as u8
    }
}

impl PinMap {
    /// Split a raw record into address, data and asserted strobes.
    #[inline]
    #[must_use]
    pub fn decode(&self, record: TransactionRecord) -> BusCycle {
        let word = record.0;
        let low = |bit: u8| word & (1 << bit) == 0;

        let mut lines = ControlLines::empty();
        lines.set(ControlLines::RD, low(self.rd));
        lines.set(ControlLines::WR, low(self.wr));
        lines.set(ControlLines::MREQ, low(self.mreq));
        lines.set(ControlLines::IORQ, low(self.iorq));
        if let Some(m1) = self.m1 {
            lines.set(ControlLines::M1, low(m1));
        }

        BusCycle {
            address: (word >> self.address_base) as u16,
            data: (word >> self.data_base) as u8,
            lines,
        }
    }

    /// Build the word a sequencer would capture for `cycle`.
    ///
    /// Deasserted strobes are driven high, as the bus pull-ups would leave
    /// them. Used by harnesses that stand in for the capture hardware.
    #[must_use]
    pub fn encode(&self, cycle: &BusCycle) -> TransactionRecord {
        let high = |asserted: bool, bit: u8| if asserted { 0 } else { 1u32 << bit };

        let mut word = u32::from(cycle.address) << self.address_base;
        word |= u32::from(cycle.data) << self.data_base;
        word |= high(cycle.lines.contains(ControlLines::RD), self.rd);
        word |= high(cycle.lines.contains(ControlLines::WR), self.wr);
        word |= high(cycle.lines.contains(ControlLines::MREQ), self.mreq);
        word |= high(cycle.lines.contains(ControlLines::IORQ), self.iorq);
        if let Some(m1) = self.m1 {
            word |= high(cycle.lines.contains(ControlLines::M1), m1);
        }
        TransactionRecord(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PINS: PinMap = PinMap::INTERFACE_PICO;

    #[test]
    fn decodes_memory_read_from_raw_word() {
        // A = $0066, /WR /IORQ high, /RD /MREQ low
        let word = (0x0066 << 16) | (1 << 13) | (1 << 15);
        let cycle = PINS.decode(TransactionRecord(word));
        assert_eq!(cycle.address, 0x0066);
        assert_eq!(cycle.lines, ControlLines::MREQ | ControlLines::RD);
        assert!(cycle.is_memory_request());
        assert!(cycle.is_read());
    }

    #[test]
    fn all_strobes_high_is_idle() {
        let word = 0xFFFF_F0FF;
        let cycle = PINS.decode(TransactionRecord(word));
        assert!(cycle.lines.is_empty());
        assert_eq!(cycle.address, 0xFFFF);
        assert_eq!(cycle.data, 0xFF);
    }

    #[test]
    fn io_write_carries_data_byte() {
        let record = PINS.encode(&BusCycle::io_write(0x00FE, 0x12));
        let cycle = PINS.decode(record);
        assert_eq!(cycle.port(), 0xFE);
        assert_eq!(cycle.data, 0x12);
        assert!(!cycle.is_read());
        assert!(!cycle.is_memory_request());
    }

    #[test]
    fn m1_only_decoded_when_mapped() {
        let pins = PinMap {
            m1: Some(8),
            ..PINS
        };
        let mut cycle = BusCycle::memory_read(0x0000);
        cycle.lines |= ControlLines::M1;
        assert!(pins.decode(pins.encode(&cycle)).lines.contains(ControlLines::M1));
        assert!(!PINS.decode(PINS.encode(&cycle)).lines.contains(ControlLines::M1));
    }

    proptest! {
        #[test]
        fn address_field_survives_encoding(address in any::<u16>(), data in any::<u8>()) {
            let cycle = BusCycle::memory_write(address, data);
            let record = PINS.encode(&cycle);
            prop_assert_eq!(record.raw() & PINS.address_mask(), u32::from(address) << 16);
            prop_assert_eq!(PINS.decode(record), cycle);
        }
    }
}
