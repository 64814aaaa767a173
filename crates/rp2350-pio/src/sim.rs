//! Software model of a PIO block's FIFOs.
//!
//! Stands in for the capture hardware on the host: a harness pushes bus
//! words into a state machine's RX FIFO with [`SimPio::capture`], the decode
//! engine drains them through [`PioRegisters`], and the harness collects the
//! answers with [`SimPio::take_response`].

use std::cell::{Cell, RefCell};
use std::fmt;

use ifp_core::{Response, TransactionRecord};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer};

use crate::regs::{FDebug, FStat, PioRegisters, StateMachine};

/// Depth of each RX and TX FIFO (unjoined).
pub const FIFO_DEPTH: usize = 4;

struct Fifos {
    rx: HeapRb<u32>,
    tx: HeapRb<u32>,
}

impl Fifos {
    fn new() -> Self {
        Self {
            rx: HeapRb::new(FIFO_DEPTH),
            tx: HeapRb::new(FIFO_DEPTH),
        }
    }
}

pub struct SimPio {
    machines: [RefCell<Fifos>; 4],
    fdebug: Cell<FDebug>,
}

impl SimPio {
    #[must_use]
    pub fn new() -> Self {
        Self {
            machines: std::array::from_fn(|_| RefCell::new(Fifos::new())),
            fdebug: Cell::new(FDebug::empty()),
        }
    }

    /// Push a sampled bus word into `sm`'s RX FIFO, as the capture program
    /// does on a bus edge.
    ///
    /// A full FIFO would stall the real program; here the word is refused
    /// and RXSTALL is flagged.
    pub fn capture(&self, sm: StateMachine, record: TransactionRecord) -> Result<(), PioError> {
        let mut fifos = self.machines[sm.index()].borrow_mut();
        if fifos.rx.try_push(record.raw()).is_err() {
            self.flag(sm, FDebug::RXSTALL);
            return Err(PioError::RxFull(sm));
        }
        Ok(())
    }

    /// Pop the oldest response the engine wrote for `sm`.
    pub fn take_response(&self, sm: StateMachine) -> Option<Response> {
        self.machines[sm.index()]
            .borrow_mut()
            .tx
            .try_pop()
            .map(Response::from_raw)
    }

    /// Records captured for `sm` and not yet received by the engine.
    #[must_use]
    pub fn rx_level(&self, sm: StateMachine) -> usize {
        self.machines[sm.index()].borrow().rx.occupied_len()
    }

    #[must_use]
    pub fn fdebug(&self) -> FDebug {
        self.fdebug.get()
    }

    pub fn clear_fdebug(&self) {
        self.fdebug.set(FDebug::empty());
    }

    fn flag(&self, sm: StateMachine, group: FDebug) {
        let bit = FDebug::from_bits_retain(sm.lane_of(group.bits()));
        self.fdebug.set(self.fdebug.get() | bit);
    }
}

impl Default for SimPio {
    fn default() -> Self {
        Self::new()
    }
}

impl PioRegisters for SimPio {
    fn fstat(&self) -> FStat {
        let mut bits = 0;
        for (index, machine) in self.machines.iter().enumerate() {
            let fifos = machine.borrow();
            let lane = |group: FStat, set: bool| if set { group.bits() & (0x0101_0101 << index) } else { 0 };
            bits |= lane(FStat::RXFULL, fifos.rx.is_full());
            bits |= lane(FStat::RXEMPTY, fifos.rx.is_empty());
            bits |= lane(FStat::TXFULL, fifos.tx.is_full());
            bits |= lane(FStat::TXEMPTY, fifos.tx.is_empty());
        }
        FStat::from_bits_retain(bits)
    }

    fn read_rxf(&self, sm: StateMachine) -> u32 {
        let word = self.machines[sm.index()].borrow_mut().rx.try_pop();
        word.unwrap_or_else(|| {
            self.flag(sm, FDebug::RXUNDER);
            0
        })
    }

    fn write_txf(&self, sm: StateMachine, word: u32) {
        let pushed = self.machines[sm.index()].borrow_mut().tx.try_push(word);
        if pushed.is_err() {
            log::warn!("{sm:?}: TX FIFO overflow, response {word:#010X} dropped");
            self.flag(sm, FDebug::TXOVER);
        }
    }
}

/// A harness-side FIFO operation the modelled hardware would not perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PioError {
    /// The state machine's RX FIFO already holds [`FIFO_DEPTH`] records.
    RxFull(StateMachine),
}

impl fmt::Display for PioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RxFull(sm) => write!(f, "RX FIFO of SM{} is full", sm.index()),
        }
    }
}

impl std::error::Error for PioError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_block_reports_all_fifos_empty() {
        let pio = SimPio::new();
        let fstat = pio.fstat();
        assert!(fstat.contains(FStat::RXEMPTY | FStat::TXEMPTY));
        assert!(!fstat.intersects(FStat::RXFULL | FStat::TXFULL));
    }

    #[test]
    fn rx_fills_after_four_captures() {
        let pio = SimPio::new();
        let sm = StateMachine::SM2;
        for i in 0..FIFO_DEPTH as u32 {
            pio.capture(sm, TransactionRecord(i)).expect("capture");
        }
        assert_eq!(pio.rx_level(sm), FIFO_DEPTH);
        assert_eq!(pio.fstat().bits() & FStat::RXFULL.bits(), 1 << 2);
        assert_eq!(pio.capture(sm, TransactionRecord(9)), Err(PioError::RxFull(sm)));
        assert_eq!(pio.fdebug(), FDebug::from_bits_retain(1 << 2));
    }

    #[test]
    fn fifo_order_is_preserved() {
        let pio = SimPio::new();
        let sm = StateMachine::SM0;
        pio.capture(sm, TransactionRecord(1)).expect("capture");
        pio.capture(sm, TransactionRecord(2)).expect("capture");
        assert_eq!(pio.read_rxf(sm), 1);
        assert_eq!(pio.read_rxf(sm), 2);
    }

    #[test]
    fn empty_read_flags_underflow() {
        let pio = SimPio::new();
        assert_eq!(pio.read_rxf(StateMachine::SM1), 0);
        assert_eq!(pio.fdebug(), FDebug::from_bits_retain(1 << 9));
        pio.clear_fdebug();
        assert!(pio.fdebug().is_empty());
    }

    #[test]
    fn tx_overflow_drops_word() {
        let pio = SimPio::new();
        let sm = StateMachine::SM0;
        for i in 0..=FIFO_DEPTH as u32 {
            pio.write_txf(sm, i);
        }
        assert!(pio.fdebug().contains(FDebug::from_bits_retain(1 << 16)));
        for i in 0..FIFO_DEPTH as u32 {
            assert_eq!(pio.take_response(sm), Some(Response::from_raw(i)));
        }
        assert_eq!(pio.take_response(sm), None);
    }
}
