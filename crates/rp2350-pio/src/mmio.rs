//! Volatile access to the RP2350 PIO blocks and SIO GPIO outputs.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use crate::regs::{FStat, PioRegisters, StateMachine};

pub const PIO0_BASE: usize = 0x5020_0000;
pub const PIO1_BASE: usize = 0x5030_0000;
pub const PIO2_BASE: usize = 0x5040_0000;

// Word offsets into the register block.
const FSTAT: usize = 0x004 / 4;
const TXF0: usize = 0x010 / 4;
const RXF0: usize = 0x020 / 4;

pub const SIO_BASE: usize = 0xD000_0000;

/// GPIO driving the edge connector's /ROMCS line on the Interface Pico.
pub const ROMCS_PIN: u8 = 25;

/// GPIOs on the largest RP2350 package.
pub const GPIO_COUNT: u8 = 48;

// SIO word offsets. GPIOs 32-47 live in the HI bank.
const GPIO_OUT_SET: usize = 0x018 / 4;
const GPIO_HI_OUT_SET: usize = 0x01C / 4;
const GPIO_OUT_CLR: usize = 0x020 / 4;
const GPIO_HI_OUT_CLR: usize = 0x024 / 4;

/// A PIO register block reached through its memory-mapped base address.
#[derive(Debug)]
pub struct MmioPio {
    base: NonNull<u32>,
}

impl MmioPio {
    /// # Safety
    ///
    /// `base` must point to a PIO register block (or memory laid out like
    /// one) that stays valid for the lifetime of the value, and no other
    /// code may pop this block's RX FIFOs or push its TX FIFOs for the
    /// state machines handed to channels.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u32>) -> Self {
        Self { base }
    }

    /// # Safety
    ///
    /// As for [`MmioPio::new`]; `address` must be one of the PIO base
    /// addresses of the running chip.
    #[must_use]
    pub unsafe fn at(address: usize) -> Option<Self> {
        NonNull::new(address as *mut u32).map(|base| Self { base })
    }

    fn reg(&self, word: usize) -> *mut u32 {
        // SAFETY: every offset used is inside the 0x184-byte register block.
        unsafe { self.base.as_ptr().add(word) }
    }
}

impl PioRegisters for MmioPio {
    #[inline]
    fn fstat(&self) -> FStat {
        // SAFETY: FSTAT is a read-only status register.
        FStat::from_bits_retain(unsafe { self.reg(FSTAT).read_volatile() })
    }

    #[inline]
    fn read_rxf(&self, sm: StateMachine) -> u32 {
        // SAFETY: reading RXFn pops that machine's FIFO; channels own their machine.
        unsafe { self.reg(RXF0 + sm.index()).read_volatile() }
    }

    #[inline]
    fn write_txf(&self, sm: StateMachine, word: u32) {
        // SAFETY: writing TXFn pushes that machine's FIFO; channels own their machine.
        unsafe { self.reg(TXF0 + sm.index()).write_volatile(word) }
    }
}

/// One GPIO output driven through the SIO set/clear registers.
///
/// The pin must already be muxed to SIO with its output enabled; this type
/// only changes the level. Set/clear writes are atomic, so other outputs in
/// the same bank are left alone.
#[derive(Debug)]
pub struct GpioOutput {
    set: NonNull<u32>,
    clr: NonNull<u32>,
    mask: u32,
}

impl GpioOutput {
    /// Returns `None` for pins past [`GPIO_COUNT`].
    ///
    /// # Safety
    ///
    /// `sio` must point to the SIO register block (or memory laid out like
    /// one) that stays valid for the lifetime of the value.
    #[must_use]
    pub unsafe fn new(sio: NonNull<u32>, pin: u8) -> Option<Self> {
        if pin >= GPIO_COUNT {
            return None;
        }
        let (set, clr) = if pin < 32 {
            (GPIO_OUT_SET, GPIO_OUT_CLR)
        } else {
            (GPIO_HI_OUT_SET, GPIO_HI_OUT_CLR)
        };
        // SAFETY: both offsets are inside the SIO block.
        unsafe {
            Some(Self {
                set: sio.add(set),
                clr: sio.add(clr),
                mask: 1 << (pin % 32),
            })
        }
    }

    pub fn set_high(&mut self) {
        // SAFETY: GPIO_OUT_SET only raises the bits written as one.
        unsafe { self.set.as_ptr().write_volatile(self.mask) }
    }

    pub fn set_low(&mut self) {
        // SAFETY: GPIO_OUT_CLR only lowers the bits written as one.
        unsafe { self.clr.as_ptr().write_volatile(self.mask) }
    }

    pub fn set_level(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryRequest, PioChannel, RequestChannel};
    use ifp_core::{Response, TransactionRecord};

    #[test]
    fn channel_reads_and_writes_register_slots() {
        let mut block = [0u32; 0x184 / 4];
        // SM1 RX not empty, every other RX empty.
        block[FSTAT] = FStat::RXEMPTY.bits() & !(1 << 9);
        block[RXF0 + 1] = 0x1708_A000;

        let base = NonNull::new(block.as_mut_ptr()).expect("non-null");
        // SAFETY: `block` outlives `pio` and nothing else touches it meanwhile.
        let pio = unsafe { MmioPio::new(base) };
        let mut ch = PioChannel::<_, MemoryRequest>::new(&pio, StateMachine::SM1);

        assert_eq!(ch.try_receive(), Some(TransactionRecord(0x1708_A000)));
        ch.send(Response::drive(0xC3));
        drop(ch);
        drop(pio);

        assert_eq!(block[TXF0 + 1], 0xFFC3);
        assert_eq!(block[TXF0], 0);
    }

    #[test]
    fn empty_status_means_no_record() {
        let mut block = [0u32; 0x184 / 4];
        block[FSTAT] = FStat::RXEMPTY.bits();
        let base = NonNull::new(block.as_mut_ptr()).expect("non-null");
        // SAFETY: as above.
        let pio = unsafe { MmioPio::new(base) };
        let mut ch = PioChannel::<_, MemoryRequest>::new(&pio, StateMachine::SM0);
        assert_eq!(ch.try_receive(), None);
    }

    #[test]
    fn gpio_output_writes_set_and_clear_registers() {
        let mut block = [0u32; 0x40 / 4];
        let sio = NonNull::new(block.as_mut_ptr()).expect("non-null");
        // SAFETY: `block` outlives `romcs` and nothing else touches it meanwhile.
        let mut romcs = unsafe { GpioOutput::new(sio, ROMCS_PIN) }.expect("pin");

        romcs.set_level(true);
        romcs.set_level(false);
        drop(romcs);

        assert_eq!(block[GPIO_OUT_SET], 1 << 25);
        assert_eq!(block[GPIO_OUT_CLR], 1 << 25);
        assert_eq!(block[GPIO_HI_OUT_SET], 0);
        assert_eq!(block[GPIO_HI_OUT_CLR], 0);
    }

    #[test]
    fn high_bank_gpio_uses_hi_registers() {
        let mut block = [0u32; 0x40 / 4];
        let sio = NonNull::new(block.as_mut_ptr()).expect("non-null");
        // SAFETY: as above.
        let mut out = unsafe { GpioOutput::new(sio, 40) }.expect("pin");
        out.set_high();
        drop(out);

        assert_eq!(block[GPIO_HI_OUT_SET], 1 << 8);
        assert_eq!(block[GPIO_OUT_SET], 0);
    }

    #[test]
    fn gpio_past_bank_rejected() {
        let mut block = [0u32; 0x40 / 4];
        let sio = NonNull::new(block.as_mut_ptr()).expect("non-null");
        // SAFETY: a rejected pin never touches the block.
        assert!(unsafe { GpioOutput::new(sio, GPIO_COUNT) }.is_none());
    }

    #[test]
    fn null_base_rejected() {
        // SAFETY: a null address is never dereferenced.
        assert!(unsafe { MmioPio::at(0) }.is_none());
    }
}
