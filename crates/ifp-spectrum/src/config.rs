//! Adapter configuration.
//!
//! Everything here is fixed before the decode loop starts. The trap
//! addresses are not configurable.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use ifp_core::{PinMap, PinMapError};
use rp2350_pio::StateMachine;
use serde::{Deserialize, Serialize};

use crate::rom::{OverlayWindow, RomError, ShadowRom};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    /// Bus-word layout shared by both capture programs.
    pub pins: PinMap,
    /// Overlay window size in bytes, from address $0000.
    pub window_size: u32,
    /// Initial overlay state. The firmware boots with /ROMCS high.
    pub overlay_at_start: bool,
    /// ROM image; the diagnostic image is installed when absent.
    pub rom: Option<PathBuf>,
    /// State machine running the /MREQ capture program.
    pub memory_sm: u8,
    /// State machine running the /IORQ capture program.
    pub io_sm: u8,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            pins: PinMap::INTERFACE_PICO,
            window_size: OverlayWindow::SPECTRUM_ROM.size(),
            overlay_at_start: true,
            rom: None,
            memory_sm: 0,
            io_sm: 1,
        }
    }
}

impl AdapterConfig {
    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pins.validate().map_err(ConfigError::Pins)?;
        self.window()?;
        self.state_machines()?;
        Ok(())
    }

    pub fn window(&self) -> Result<OverlayWindow, ConfigError> {
        OverlayWindow::new(self.window_size).map_err(ConfigError::Rom)
    }

    /// The memory-request and I/O-request state machines.
    pub fn state_machines(&self) -> Result<(StateMachine, StateMachine), ConfigError> {
        let bad = || ConfigError::StateMachines {
            memory: self.memory_sm,
            io: self.io_sm,
        };
        let memory = StateMachine::new(self.memory_sm).ok_or_else(bad)?;
        let io = StateMachine::new(self.io_sm).ok_or_else(bad)?;
        if memory == io {
            return Err(bad());
        }
        Ok((memory, io))
    }

    /// Install the configured ROM image.
    pub fn load_rom(&self) -> Result<ShadowRom, ConfigError> {
        let window = self.window()?;
        match &self.rom {
            Some(path) => ShadowRom::load(path, window).map_err(ConfigError::Rom),
            None => Ok(ShadowRom::diagnostic(window)),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse(serde_json::Error),
    Pins(PinMapError),
    Rom(RomError),
    StateMachines { memory: u8, io: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse(e) => write!(f, "invalid configuration: {e}"),
            Self::Pins(e) => write!(f, "{e}"),
            Self::Rom(e) => write!(f, "{e}"),
            Self::StateMachines { memory, io } => write!(
                f,
                "state machines must be two distinct indices 0-3, got memory={memory} io={io}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            Self::Pins(e) => Some(e),
            Self::Rom(e) => Some(e),
            Self::StateMachines { .. } => None,
        }
    }
}
