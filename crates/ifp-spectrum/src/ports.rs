//! Peripheral port table.
//!
//! The Spectrum decodes I/O ports on the low address byte only, so the
//! table is keyed by `port & 0xFF`. Peripheral emulation plugs in through
//! [`PortHandler`]; nothing is emulated yet, so every entry answers
//! "not handled" and the cycle is left to whatever sits on the bus.

use ifp_core::Response;
use serde::Serialize;

/// Peripherals the adapter can stand in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Peripheral {
    /// Kempston joystick interface, port $1F.
    KempstonJoystick,
    /// Fuller joystick interface, port $7F.
    FullerJoystick,
    /// ULA port $FE: keyboard rows (Sinclair/cursor joysticks) and EAR.
    UlaKeyboardTape,
}

impl Peripheral {
    pub const ALL: [Self; 3] = [
        Self::KempstonJoystick,
        Self::FullerJoystick,
        Self::UlaKeyboardTape,
    ];

    #[must_use]
    pub const fn port(self) -> u8 {
        match self {
            Self::KempstonJoystick => 0x1F,
            Self::FullerJoystick => 0x7F,
            Self::UlaKeyboardTape => 0xFE,
        }
    }

    /// Look up the peripheral decoded at `port`.
    #[inline]
    #[must_use]
    pub const fn decode(port: u8) -> Option<Self> {
        match port {
            0x1F => Some(Self::KempstonJoystick),
            0x7F => Some(Self::FullerJoystick),
            0xFE => Some(Self::UlaKeyboardTape),
            _ => None,
        }
    }
}

/// Emulation of the peripherals in the port table.
///
/// `port` is the full 16-bit address; the high byte carries the keyboard
/// row select on $FE reads.
pub trait PortHandler {
    /// Byte to drive for a read, or `None` to leave the bus alone.
    fn read(&mut self, peripheral: Peripheral, port: u16) -> Option<u8>;

    /// Observe a write. Writes are never answered on the bus.
    fn write(&mut self, _peripheral: Peripheral, _port: u16, _value: u8) {}
}

/// No peripheral emulation: every table entry answers `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unemulated;

impl PortHandler for Unemulated {
    #[inline]
    fn read(&mut self, _peripheral: Peripheral, _port: u16) -> Option<u8> {
        None
    }
}

/// Dispatch from port number to [`PortHandler`].
#[derive(Debug, Default)]
pub struct PortTable<H = Unemulated> {
    handler: H,
}

impl<H: PortHandler> PortTable<H> {
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Response for an I/O read of `port`.
    #[inline]
    pub fn read(&mut self, port: u16) -> Response {
        match Peripheral::decode(port as u8) {
            Some(peripheral) => Response::from(self.handler.read(peripheral, port)),
            None => Response::RELEASE,
        }
    }

    /// Forward an I/O write of `value` to `port`'s handler, if any.
    #[inline]
    pub fn write(&mut self, port: u16, value: u8) {
        if let Some(peripheral) = Peripheral::decode(port as u8) {
            self.handler.write(peripheral, port, value);
        }
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Kempston state in bits 0-4 (right, left, down, up, fire), active high.
    #[derive(Default)]
    struct Kempston {
        state: u8,
        last_fe_write: Option<u8>,
    }

    impl PortHandler for Kempston {
        fn read(&mut self, peripheral: Peripheral, _port: u16) -> Option<u8> {
            (peripheral == Peripheral::KempstonJoystick).then_some(self.state)
        }

        fn write(&mut self, peripheral: Peripheral, _port: u16, value: u8) {
            if peripheral == Peripheral::UlaKeyboardTape {
                self.last_fe_write = Some(value);
            }
        }
    }

    #[test]
    fn decode_on_low_byte() {
        for p in Peripheral::ALL {
            assert_eq!(Peripheral::decode(p.port()), Some(p));
        }
        assert_eq!(Peripheral::decode(0xFD), None);
        assert_eq!(Peripheral::decode(0x03), None);
    }

    #[test]
    fn unemulated_entries_release_the_bus() {
        let mut table = PortTable::new(Unemulated);
        assert_eq!(table.read(0x001F), Response::RELEASE);
        assert_eq!(table.read(0x007F), Response::RELEASE);
        assert_eq!(table.read(0xFEFE), Response::RELEASE);
        assert_eq!(table.read(0x1234), Response::RELEASE);
    }

    #[test]
    fn handler_byte_is_driven() {
        let mut table = PortTable::new(Kempston {
            state: 0b0001_0001,
            ..Kempston::default()
        });
        assert_eq!(table.read(0xFF1F), Response::drive(0x11));
        assert_eq!(table.read(0x007F), Response::RELEASE);
    }

    #[test]
    fn writes_reach_handler_for_table_ports_only() {
        let mut table = PortTable::new(Kempston::default());
        table.write(0x00FD, 0x55);
        assert_eq!(table.handler().last_fe_write, None);
        table.write(0x00FE, 0x07);
        assert_eq!(table.handler().last_fe_write, Some(0x07));
        table.handler_mut().state = 1;
        assert_eq!(table.read(0x001F), Response::drive(0x01));
    }
}
