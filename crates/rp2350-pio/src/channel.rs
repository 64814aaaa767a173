//! Typed request channels over PIO state machines.

use std::marker::PhantomData;

use ifp_core::{Response, TransactionRecord};

use crate::regs::{FStat, PioRegisters, StateMachine};

/// One capture/response queue pair.
///
/// The hardware expects exactly one response per captured record, in
/// capture order: every `send` must follow a `try_receive` that returned a
/// record.
pub trait RequestChannel {
    /// Pop the next captured record, or `None` if the RX FIFO is empty.
    /// Never blocks.
    fn try_receive(&mut self) -> Option<TransactionRecord>;

    /// Answer the record most recently received. Never blocks.
    fn send(&mut self, response: Response);
}

/// Channel fed by the /MREQ capture program.
pub trait MemoryRequestChannel: RequestChannel {}

/// Channel fed by the /IORQ capture program.
pub trait IoRequestChannel: RequestChannel {}

impl<C: RequestChannel + ?Sized> RequestChannel for &mut C {
    fn try_receive(&mut self) -> Option<TransactionRecord> {
        (**self).try_receive()
    }

    fn send(&mut self, response: Response) {
        (**self).send(response);
    }
}

impl<C: MemoryRequestChannel + ?Sized> MemoryRequestChannel for &mut C {}
impl<C: IoRequestChannel + ?Sized> IoRequestChannel for &mut C {}

/// Kind marker: the state machine runs the /MREQ program.
#[derive(Debug)]
pub enum MemoryRequest {}

/// Kind marker: the state machine runs the /IORQ program.
#[derive(Debug)]
pub enum IoRequest {}

/// A request channel bound to one state machine of a shared PIO block.
pub struct PioChannel<'a, P, K> {
    pio: &'a P,
    sm: StateMachine,
    rx_empty: FStat,
    /// A record has been received and not yet answered.
    pending: bool,
    _kind: PhantomData<K>,
}

impl<'a, P: PioRegisters, K> PioChannel<'a, P, K> {
    #[must_use]
    pub fn new(pio: &'a P, sm: StateMachine) -> Self {
        Self {
            pio,
            sm,
            rx_empty: sm.rx_empty_mask(),
            pending: false,
            _kind: PhantomData,
        }
    }

    #[must_use]
    pub fn state_machine(&self) -> StateMachine {
        self.sm
    }

    /// True if a record was received and is still waiting for its response.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

impl<P: PioRegisters, K> RequestChannel for PioChannel<'_, P, K> {
    #[inline]
    fn try_receive(&mut self) -> Option<TransactionRecord> {
        if self.pio.fstat().intersects(self.rx_empty) {
            return None;
        }
        debug_assert!(!self.pending, "{:?}: record received before the previous was answered", self.sm);
        self.pending = true;
        Some(TransactionRecord(self.pio.read_rxf(self.sm)))
    }

    #[inline]
    fn send(&mut self, response: Response) {
        debug_assert!(self.pending, "{:?}: response sent with no record outstanding", self.sm);
        self.pending = false;
        self.pio.write_txf(self.sm, response.raw());
    }
}

impl<P: PioRegisters> MemoryRequestChannel for PioChannel<'_, P, MemoryRequest> {}
impl<P: PioRegisters> IoRequestChannel for PioChannel<'_, P, IoRequest> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimPio;

    type MreqChannel<'a> = PioChannel<'a, SimPio, MemoryRequest>;
    type IorqChannel<'a> = PioChannel<'a, SimPio, IoRequest>;

    #[test]
    fn empty_fifo_yields_nothing() {
        let pio = SimPio::new();
        let mut ch = MreqChannel::new(&pio, StateMachine::SM0);
        assert_eq!(ch.try_receive(), None);
        assert!(!ch.is_pending());
    }

    #[test]
    fn receive_then_send_round_trips_through_fifos() {
        let pio = SimPio::new();
        let mut ch = MreqChannel::new(&pio, StateMachine::SM0);
        pio.capture(StateMachine::SM0, TransactionRecord(0x0066_A000))
            .expect("capture");

        assert_eq!(ch.try_receive(), Some(TransactionRecord(0x0066_A000)));
        assert!(ch.is_pending());
        ch.send(Response::drive(0xF3));
        assert!(!ch.is_pending());

        assert_eq!(pio.take_response(StateMachine::SM0), Some(Response::drive(0xF3)));
        assert_eq!(ch.try_receive(), None);
    }

    #[test]
    fn machines_sharing_a_block_are_independent() {
        let pio = SimPio::new();
        let mut mreq = MreqChannel::new(&pio, StateMachine::SM0);
        let mut iorq = IorqChannel::new(&pio, StateMachine::SM1);
        pio.capture(StateMachine::SM1, TransactionRecord(0x001F_0000))
            .expect("capture");

        assert_eq!(mreq.try_receive(), None);
        assert_eq!(iorq.try_receive(), Some(TransactionRecord(0x001F_0000)));
        iorq.send(Response::RELEASE);
        assert_eq!(pio.take_response(StateMachine::SM0), None);
        assert_eq!(pio.take_response(StateMachine::SM1), Some(Response::RELEASE));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "no record outstanding")]
    fn send_without_receive_is_a_protocol_violation() {
        let pio = SimPio::new();
        let mut ch = IorqChannel::new(&pio, StateMachine::SM1);
        ch.send(Response::RELEASE);
    }
}
