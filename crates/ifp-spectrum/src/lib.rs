//! Bus-decode core of the Interface Pico, a ZX Spectrum edge-connector
//! adapter built on an RP2350.
//!
//! Two PIO state machines hold the Z80 in a wait state on every /MREQ and
//! /IORQ cycle and hand the sampled bus word to a dedicated core. The
//! [`Decoder`] drains both queues (memory requests first), decides whether
//! the adapter supplies the byte from the shadow ROM or an emulated
//! peripheral register, or leaves the cycle to the Spectrum. The response is
//! sent back before the host is released.
//!
//! The overlay is switched with the /ROMCS line: while it is high the
//! Spectrum's own ROM is disabled and [`ShadowRom`] answers reads in the
//! overlay window. Accesses to a small set of trap addresses (the NMI
//! vector and two error entry points) switch it back on.

mod config;
mod decoder;
mod handshake;
mod overlay;
mod ports;
mod rom;
pub mod trace;

pub use config::{AdapterConfig, ConfigError};
pub use decoder::{Decoder, ServiceStats, Serviced, TRAP_ADDRESSES, is_trap};
pub use handshake::{StartReceiver, StartSender, start_fifo};
pub use overlay::{DisablePolicy, NeverDisable, Overlay, RomcsLatch, RomcsLine};
pub use ports::{Peripheral, PortHandler, PortTable, Unemulated};
pub use rom::{OverlayWindow, RomError, ShadowRom};
