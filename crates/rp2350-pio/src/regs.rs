//! PIO block registers used by the bus channels.

use bitflags::bitflags;

bitflags! {
    /// FIFO status register (FSTAT). Each group holds one bit per state
    /// machine, SM0 in the lowest bit of the group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FStat: u32 {
        const RXFULL  = 0x0000_000F;
        const RXEMPTY = 0x0000_0F00;
        const TXFULL  = 0x000F_0000;
        const TXEMPTY = 0x0F00_0000;
    }
}

bitflags! {
    /// FIFO debug register (FDEBUG). Sticky; write-one-to-clear on silicon.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FDebug: u32 {
        const RXSTALL = 0x0000_000F;
        const RXUNDER = 0x0000_0F00;
        const TXOVER  = 0x000F_0000;
    }
}

/// One of the four state machines in a PIO block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateMachine(u8);

impl StateMachine {
    pub const SM0: Self = Self(0);
    pub const SM1: Self = Self(1);
    pub const SM2: Self = Self(2);
    pub const SM3: Self = Self(3);

    /// Returns `None` for indices past SM3.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < 4 { Some(Self(index)) } else { None }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// This machine's bit in every group of FSTAT/FDEBUG.
    const fn lanes(self) -> u32 {
        0x0101_0101 << self.0
    }

    /// This machine's RX-empty bit in FSTAT.
    #[must_use]
    pub const fn rx_empty_mask(self) -> FStat {
        FStat::from_bits_retain(FStat::RXEMPTY.bits() & self.lanes())
    }

    /// This machine's TX-full bit in FSTAT.
    #[must_use]
    pub const fn tx_full_mask(self) -> FStat {
        FStat::from_bits_retain(FStat::TXFULL.bits() & self.lanes())
    }

    /// Restrict any FSTAT/FDEBUG group mask to this machine.
    #[must_use]
    pub const fn lane_of(self, group: u32) -> u32 {
        group & self.lanes()
    }
}

/// The slice of a PIO register block the bus channels touch.
///
/// Methods take `&self` like volatile register accesses do: both channels
/// share one block, each touching only its own state machine's FIFOs.
pub trait PioRegisters {
    fn fstat(&self) -> FStat;

    /// Pop a word from `sm`'s RX FIFO. Reading an empty FIFO returns 0
    /// and flags RXUNDER.
    fn read_rxf(&self, sm: StateMachine) -> u32;

    /// Push a word into `sm`'s TX FIFO. Writing a full FIFO drops the word
    /// and flags TXOVER.
    fn write_txf(&self, sm: StateMachine, word: u32);
}
