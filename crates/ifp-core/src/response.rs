//! Response words handed back to a sequencer.
//!
//! The sequencer's OUT shifts the low 16 bits of the word onto the pins:
//! first the data byte onto D0-D7, then the next byte onto the D0-D7 pin
//! directions. A clear direction byte leaves the data bus tristated so the
//! host's own memory or peripheral answers the cycle.

use std::fmt;

/// Direction bits enabling all eight data-bus drivers.
const DRIVE_ALL: u32 = 0xFF00;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Response(u32);

impl Response {
    /// Leave the bus alone. The raw value is 0.
    pub const RELEASE: Self = Self(0);

    /// Drive `byte` onto the data bus for this cycle.
    #[inline]
    #[must_use]
    pub const fn drive(byte: u8) -> Self {
        Self(DRIVE_ALL | byte as u32)
    }

    /// Wrap a word produced elsewhere (e.g. read back from a TX FIFO).
    #[must_use]
    pub const fn from_raw(word: u32) -> Self {
        Self(word)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The byte placed on D0-D7 when the bus is driven.
    #[must_use]
    pub const fn data(self) -> u8 {
        self.0 as u8
    }

    #[must_use]
    pub const fn drives_bus(self) -> bool {
        self.0 & DRIVE_ALL != 0
    }
}

impl From<Option<u8>> for Response {
    fn from(byte: Option<u8>) -> Self {
        byte.map_or(Self::RELEASE, Self::drive)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.drives_bus() {
            write!(f, "drive {:#04X}", self.data())
        } else {
            f.write_str("release")
        }
    }
}
