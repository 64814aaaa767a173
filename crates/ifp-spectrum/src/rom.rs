//! Shadow ROM store.
//!
//! The image is installed once before the decode loop starts and is only
//! read afterwards. Construction guarantees the image covers the whole
//! overlay window, so any address that passed [`OverlayWindow::contains`]
//! can be used as an index without further checks.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The host address range the shadow ROM can answer: `0..size`.
///
/// `size` is a power of two so membership is a single mask test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayWindow {
    size: u32,
}

impl OverlayWindow {
    /// $0000-$3FFF, where every Spectrum model pages its ROM.
    pub const SPECTRUM_ROM: Self = Self { size: 0x4000 };

    /// Smallest window that still contains every trap address.
    pub const MIN_SIZE: u32 = 0x2000;

    pub fn new(size: u32) -> Result<Self, RomError> {
        if !size.is_power_of_two() || !(Self::MIN_SIZE..=0x1_0000).contains(&size) {
            return Err(RomError::BadWindow(size));
        }
        Ok(Self { size })
    }

    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, address: u16) -> bool {
        address as u32 & !(self.size - 1) == 0
    }
}

impl Default for OverlayWindow {
    fn default() -> Self {
        Self::SPECTRUM_ROM
    }
}

/// Bring-up program run from the overlay: reads itself back, then checks
/// that every byte above it equals the low byte of its address, halting on
/// the first mismatch.
///
/// ```text
/// start:            ld  hl, 0
/// read_first_part:  ld  a, l
///                   cp  end_of_program
///                   jp  nc, read_second_part
///                   ld  a, (hl)
///                   inc hl
///                   jp  read_first_part
/// read_second_part: ld  hl, end_of_program
/// read_loop:        ld  a, h
///                   cp  40h
///                   jp  nc, start
///                   ld  a, (hl)
///                   cp  l
///                   jp  nc, bad_byte
///                   inc hl
///                   jp  read_loop
/// bad_byte:         halt
///                   jp  bad_byte
/// ```
const DIAGNOSTIC_PROGRAM: [u8; 36] = [
    0x21, 0x00, 0x00, 0x7D, 0xFE, 0x24, 0xD2, 0x0E, 0x00, 0x7E, 0x23, 0xC3, 0x03, 0x00, 0x21, 0x24,
    0x00, 0x7C, 0xFE, 0x40, 0xD2, 0x00, 0x00, 0x7E, 0xBD, 0xD2, 0x20, 0x00, 0x23, 0xC3, 0x11, 0x00,
    0x76, 0xC3, 0x20, 0x00,
];

/// An installed ROM image and the window it serves.
#[derive(Debug, Clone)]
pub struct ShadowRom {
    image: Box<[u8]>,
    window: OverlayWindow,
}

impl ShadowRom {
    /// Install `image`, which must be at least as large as `window`.
    pub fn new(image: Vec<u8>, window: OverlayWindow) -> Result<Self, RomError> {
        if image.is_empty() {
            return Err(RomError::Empty);
        }
        if image.len() < window.size() as usize {
            return Err(RomError::TooSmall {
                len: image.len(),
                window: window.size(),
            });
        }
        Ok(Self {
            image: image.into_boxed_slice(),
            window,
        })
    }

    /// Install `image`, zero-filling it up to the window size.
    pub fn padded(image: &[u8], window: OverlayWindow) -> Result<Self, RomError> {
        let mut padded = image.to_vec();
        if padded.len() < window.size() as usize {
            padded.resize(window.size() as usize, 0);
        }
        Self::new(padded, window)
    }

    /// Read an image file and install it, zero-padded to the window.
    pub fn load(path: &Path, window: OverlayWindow) -> Result<Self, RomError> {
        let bytes = std::fs::read(path).map_err(|source| RomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(RomError::Empty);
        }
        Self::padded(&bytes, window)
    }

    /// The bring-up self-test image: [`DIAGNOSTIC_PROGRAM`] followed by
    /// `byte[a] = a as u8` up to the end of the window.
    #[must_use]
    pub fn diagnostic(window: OverlayWindow) -> Self {
        let mut image: Vec<u8> = (0..window.size()).map(|a| a as u8).collect();
        image[..DIAGNOSTIC_PROGRAM.len()].copy_from_slice(&DIAGNOSTIC_PROGRAM);
        Self {
            image: image.into_boxed_slice(),
            window,
        }
    }

    /// Byte at `address`.
    ///
    /// `address` must lie inside the overlay window; the decoder only calls
    /// this after [`OverlayWindow::contains`] or a trap-address match.
    #[inline]
    #[must_use]
    pub fn read(&self, address: u16) -> u8 {
        self.image[address as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.image.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    #[must_use]
    pub fn window(&self) -> OverlayWindow {
        self.window
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.image
    }

    /// Touch every byte once so the first host fetches don't pay for a
    /// flash cache miss. Returns the 16-bit additive checksum.
    pub fn prime(&self) -> u16 {
        self.image
            .iter()
            .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(std::hint::black_box(b))))
    }
}

#[derive(Debug)]
pub enum RomError {
    Empty,
    TooSmall { len: usize, window: u32 },
    BadWindow(u32),
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for RomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("ROM image is empty"),
            Self::TooSmall { len, window } => write!(
                f,
                "ROM image is {len} bytes, overlay window needs {window}"
            ),
            Self::BadWindow(size) => write!(
                f,
                "overlay window size {size:#X} must be a power of two between {:#X} and 0x10000",
                OverlayWindow::MIN_SIZE
            ),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for RomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
