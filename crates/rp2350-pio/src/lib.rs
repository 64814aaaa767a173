//! RP2350 PIO state machines as bus-transaction channels.
//!
//! The adapter runs two capture programs on one PIO block: one triggered by
//! /MREQ cycles and one by /IORQ cycles. Each program stalls the Z80 with
//! /WAIT, pushes a sampled bus word into its RX FIFO and holds the wait state
//! until a response word arrives in its TX FIFO. The programs themselves are
//! opaque here; this crate only moves words through the FIFOs.
//!
//! Register access goes through [`PioRegisters`]. [`MmioPio`] talks to the
//! silicon, [`SimPio`] is a software model used by tests and the trace
//! replay tool. [`GpioOutput`] drives a single SIO output such as /ROMCS.

mod channel;
mod mmio;
mod regs;
mod sim;

pub use channel::{
    IoRequest, IoRequestChannel, MemoryRequest, MemoryRequestChannel, PioChannel, RequestChannel,
};
pub use mmio::{GPIO_COUNT, GpioOutput, MmioPio, PIO0_BASE, PIO1_BASE, PIO2_BASE, ROMCS_PIN, SIO_BASE};
pub use regs::{FDebug, FStat, PioRegisters, StateMachine};
pub use sim::{FIFO_DEPTH, PioError, SimPio};
