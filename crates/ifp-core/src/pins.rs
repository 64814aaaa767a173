//! Placement of Z80 bus signals inside a sampled bus word.
//!
//! The sequencers shift in 32 consecutive GPIOs starting at the PIO GPIO
//! base, so every signal's bit position is its pin offset from that base.
//! Control strobes are active low on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bit positions of the bus signals within a transaction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinMap {
    /// Lowest bit of the 8-bit data bus (D0).
    pub data_base: u8,
    /// Lowest bit of the 16-bit address bus (A0).
    pub address_base: u8,
    /// /RD strobe.
    pub rd: u8,
    /// /WR strobe.
    pub wr: u8,
    /// /MREQ strobe.
    pub mreq: u8,
    /// /IORQ strobe.
    pub iorq: u8,
    /// /M1, when the board routes it into the sampled window.
    #[serde(default)]
    pub m1: Option<u8>,
}

impl PinMap {
    /// The Interface Pico board: D0-D7 on GPIO base+0..7, the four strobes
    /// on base+12..15 and A0-A15 on base+16..31.
    pub const INTERFACE_PICO: Self = Self {
        data_base: 0,
        address_base: 16,
        rd: 12,
        wr: 13,
        mreq: 14,
        iorq: 15,
        m1: None,
    };

    /// Check that every field fits in 32 bits and that no two signals share
    /// a bit.
    pub fn validate(&self) -> Result<(), PinMapError> {
        let mut fields: Vec<(&'static str, u64)> = vec![
            ("data", field_mask(self.data_base, 8)),
            ("address", field_mask(self.address_base, 16)),
            ("rd", field_mask(self.rd, 1)),
            ("wr", field_mask(self.wr, 1)),
            ("mreq", field_mask(self.mreq, 1)),
            ("iorq", field_mask(self.iorq, 1)),
        ];
        if let Some(m1) = self.m1 {
            fields.push(("m1", field_mask(m1, 1)));
        }

        for &(signal, mask) in &fields {
            if mask >> 32 != 0 {
                return Err(PinMapError::OutOfRange { signal });
            }
        }
        for (i, &(first, a)) in fields.iter().enumerate() {
            for &(second, b) in &fields[i + 1..] {
                if a & b != 0 {
                    return Err(PinMapError::Overlap { first, second });
                }
            }
        }
        Ok(())
    }

    /// Mask selecting the address field in a raw word.
    #[must_use]
    pub const fn address_mask(&self) -> u32 {
        0xFFFF << self.address_base
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self::INTERFACE_PICO
    }
}

fn field_mask(base: u8, width: u32) -> u64 {
    ((1u64 << width) - 1) << base.min(63)
}

/// A pin map that cannot describe a real bus word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMapError {
    /// The signal's bits extend past bit 31.
    OutOfRange { signal: &'static str },
    /// Two signals claim the same bit.
    Overlap {
        first: &'static str,
        second: &'static str,
    },
}

impl fmt::Display for PinMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { signal } => {
                write!(f, "pin map: {signal} does not fit in a 32-bit bus word")
            }
            Self::Overlap { first, second } => {
                write!(f, "pin map: {first} and {second} share a bit")
            }
        }
    }
}

impl std::error::Error for PinMapError {}
