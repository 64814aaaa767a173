//! Core types for the Interface Pico bus adapter.
//!
//! The adapter sits on a Z80 host bus. Hardware sequencers sample the bus
//! into 32-bit words; this crate names the fields of those words, builds the
//! response words handed back to the sequencers, and provides the inspection
//! trait shared by the adapter components.

mod observable;
mod pins;
mod record;
mod response;

pub use observable::{Observable, Value, parse_address};
pub use pins::{PinMap, PinMapError};
pub use record::{BusCycle, ControlLines, TransactionRecord};
pub use response::Response;
