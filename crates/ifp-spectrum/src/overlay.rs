//! Overlay control: the enable flag and the /ROMCS output that mirrors it.
//!
//! Driving /ROMCS high disables the Spectrum's internal ROM, leaving the
//! adapter to answer reads in the overlay window. The flag and the pin are
//! only ever changed together.

use ifp_core::BusCycle;
use rp2350_pio::GpioOutput;

/// The output pin wired to the edge connector's /ROMCS line.
pub trait RomcsLine {
    fn set_level(&mut self, high: bool);
}

impl<L: RomcsLine + ?Sized> RomcsLine for &mut L {
    fn set_level(&mut self, high: bool) {
        (**self).set_level(high);
    }
}

/// The board's /ROMCS GPIO ([`rp2350_pio::ROMCS_PIN`]).
impl RomcsLine for GpioOutput {
    #[inline]
    fn set_level(&mut self, high: bool) {
        GpioOutput::set_level(self, high);
    }
}

/// A /ROMCS stand-in that remembers what was written to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomcsLatch {
    level: Option<bool>,
    writes: u64,
}

impl RomcsLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written, `None` before the first write.
    #[must_use]
    pub fn level(&self) -> Option<bool> {
        self.level
    }

    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl RomcsLine for RomcsLatch {
    fn set_level(&mut self, high: bool) {
        self.level = Some(high);
        self.writes += 1;
    }
}

/// Overlay enable state, owned by the decode engine.
#[derive(Debug)]
pub struct Overlay<L> {
    enabled: bool,
    line: L,
}

impl<L: RomcsLine> Overlay<L> {
    /// Take ownership of the /ROMCS output and drive it to `enabled`.
    pub fn new(mut line: L, enabled: bool) -> Self {
        line.set_level(enabled);
        Self { enabled, line }
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn enable(&mut self) {
        self.enabled = true;
        self.line.set_level(true);
    }

    #[inline]
    pub fn disable(&mut self) {
        self.enabled = false;
        self.line.set_level(false);
    }

    #[must_use]
    pub fn line(&self) -> &L {
        &self.line
    }
}

/// Decides when the overlay should be switched off.
///
/// Consulted for memory-request cycles the overlay did not answer, while
/// the overlay is enabled. The firmware's protocol for handing the bus back
/// to the Spectrum ROM after the boot vector is not settled, so the shipped
/// policy is [`NeverDisable`]; a board-specific rule plugs in here.
pub trait DisablePolicy {
    fn should_disable(&mut self, cycle: &BusCycle) -> bool;
}

/// Once enabled, the overlay stays enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverDisable;

impl DisablePolicy for NeverDisable {
    #[inline]
    fn should_disable(&mut self, _cycle: &BusCycle) -> bool {
        false
    }
}

impl<F: FnMut(&BusCycle) -> bool> DisablePolicy for F {
    fn should_disable(&mut self, cycle: &BusCycle) -> bool {
        self(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_drives_initial_level() {
        let overlay = Overlay::new(RomcsLatch::new(), true);
        assert!(overlay.is_enabled());
        assert_eq!(overlay.line().level(), Some(true));
        assert_eq!(overlay.line().writes(), 1);

        let overlay = Overlay::new(RomcsLatch::new(), false);
        assert_eq!(overlay.line().level(), Some(false));
    }

    #[test]
    fn pin_follows_every_change() {
        let mut overlay = Overlay::new(RomcsLatch::new(), false);
        overlay.enable();
        assert!(overlay.is_enabled());
        assert_eq!(overlay.line().level(), Some(true));
        overlay.disable();
        assert!(!overlay.is_enabled());
        assert_eq!(overlay.line().level(), Some(false));
        assert_eq!(overlay.line().writes(), 3);
    }

    #[test]
    fn enable_twice_stays_enabled() {
        let mut overlay = Overlay::new(RomcsLatch::new(), false);
        overlay.enable();
        overlay.enable();
        assert!(overlay.is_enabled());
        assert_eq!(overlay.line().level(), Some(true));
    }

    #[test]
    fn borrowed_line() {
        let mut latch = RomcsLatch::new();
        {
            let mut overlay = Overlay::new(&mut latch, false);
            overlay.enable();
        }
        assert_eq!(latch.level(), Some(true));
    }

    #[test]
    #[allow(unsafe_code)]
    fn gpio_pin_mirrors_overlay_flag() {
        use rp2350_pio::ROMCS_PIN;
        use std::ptr::NonNull;

        // GPIO_OUT_SET and GPIO_OUT_CLR word slots.
        const SET: usize = 0x018 / 4;
        const CLR: usize = 0x020 / 4;

        let mut sio = [0u32; 0x40 / 4];
        let base = NonNull::new(sio.as_mut_ptr()).expect("non-null");
        // SAFETY: `sio` outlives the overlay and is only written through it.
        let pin = unsafe { GpioOutput::new(base, ROMCS_PIN) }.expect("pin");

        let mut overlay = Overlay::new(pin, false);
        // SAFETY: the overlay holds the only pointer and is idle here.
        let clr = unsafe { base.add(CLR).read_volatile() };
        assert_eq!(clr, 1 << ROMCS_PIN, "constructed low");

        overlay.enable();
        // SAFETY: as above.
        let set = unsafe { base.add(SET).read_volatile() };
        assert_eq!(set, 1 << ROMCS_PIN);
        assert!(overlay.is_enabled());
        drop(overlay);
    }

    #[test]
    fn closure_policy() {
        let mut past_rom = |cycle: &BusCycle| cycle.address >= 0x4000;
        assert!(!past_rom.should_disable(&BusCycle::memory_read(0x0000)));
        assert!(past_rom.should_disable(&BusCycle::memory_read(0x8000)));
        assert!(!NeverDisable.should_disable(&BusCycle::memory_read(0x8000)));
    }
}
