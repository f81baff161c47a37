//! SPI master abstraction
//!
//! The bus only moves bytes. Chip select is an ordinary SIO pin toggled
//! through the [`crate::GpioBank`], which lets the host keep it asserted
//! across transfers.

/// Physical SPI master
pub trait SpiBus {
    type Error: embedded_hal::spi::Error;

    /// Reprogram mode and clock; returns the rate the divider settled on
    ///
    /// `config.frequency` is already clamped to
    /// [`min_frequency`](Self::min_frequency)..=[`max_frequency`](Self::max_frequency).
    fn configure(&mut self, config: &SpiConfig) -> u32;

    /// Lowest reachable SCK rate in Hz
    fn min_frequency(&self) -> u32;

    /// Highest reachable SCK rate in Hz
    fn max_frequency(&self) -> u32;

    /// Full duplex: clock out `write` while filling `read` (same length)
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error>;

    /// Clock out `data`, discarding what comes back
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Clock in `buf.len()` bytes while sending zeros
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Host-visible bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Requested SCK rate in Hz
    pub frequency: u32,
    pub polarity: Polarity,
    pub phase: Phase,
    /// Bits per frame
    pub frame_size: u8,
}

impl Default for SpiConfig {
    /// Mode 0, 8-bit frames at 1 MHz
    fn default() -> Self {
        Self {
            frequency: 1_000_000,
            polarity: Polarity::IdleLow,
            phase: Phase::CaptureOnFirstTransition,
            frame_size: 8,
        }
    }
}

impl SpiConfig {
    /// Apply the polarity and phase of `mode`
    pub fn set_mode(&mut self, mode: Mode) {
        let (polarity, phase): (Polarity, Phase) = mode.into();
        self.polarity = polarity;
        self.phase = phase;
    }
}

/// SCK level between frames (CPOL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    IdleLow,
    IdleHigh,
}

/// SCK edge that samples data (CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    CaptureOnFirstTransition,
    CaptureOnSecondTransition,
}

/// The four CPOL/CPHA combinations, numbered as on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl Mode {
    /// Decode `CPOL << 1 | CPHA`
    pub fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0 => Mode::Mode0,
            1 => Mode::Mode1,
            2 => Mode::Mode2,
            3 => Mode::Mode3,
            _ => return None,
        })
    }
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        let polarity = match mode {
            Mode::Mode0 | Mode::Mode1 => Polarity::IdleLow,
            Mode::Mode2 | Mode::Mode3 => Polarity::IdleHigh,
        };
        let phase = match mode {
            Mode::Mode0 | Mode::Mode2 => Phase::CaptureOnFirstTransition,
            Mode::Mode1 | Mode::Mode3 => Phase::CaptureOnSecondTransition,
        };
        (polarity, phase)
    }
}
