//! GPIO bank abstraction
//!
//! The adapter hands pins to the host one at a time and muxes them
//! between SIO, I2C and SPI at run time, so the trait addresses pins by
//! number instead of owning typed pin objects.

/// Peripheral function routed to a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinFunction {
    /// Disconnected from every peripheral
    Null,
    /// Software controlled I/O
    Sio,
    I2c,
    Spi,
    /// Analog input: digital input buffer and pulls disabled
    Analog,
}

/// Pad pull resistor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None,
    Up,
    Down,
}

/// Condition that raises a pin's interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// No events
    None,
    /// Both edges
    Change,
    /// While the pin reads high
    LevelHigh,
    /// While the pin reads low
    LevelLow,
}

/// Event flags latched by one pin interrupt
///
/// Bit values match the RP2040 interrupt status layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeFlags(u8);

impl EdgeFlags {
    pub const LEVEL_LOW: Self = Self(0x1);
    pub const LEVEL_HIGH: Self = Self(0x2);
    pub const EDGE_FALL: Self = Self(0x4);
    pub const EDGE_RISE: Self = Self(0x8);

    /// No flags set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from raw status bits, ignoring unknown bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0xf)
    }

    /// Raw status bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if no flag is set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if every flag in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Combine two flag sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl core::ops::BitOr for EdgeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Bank of numbered GPIO pins
///
/// Pin numbers are validated by the caller; implementations may ignore
/// out-of-range pins.
pub trait GpioBank {
    /// Route `pin` to a peripheral function
    fn set_function(&mut self, pin: u8, function: PinFunction);

    /// Configure the pull resistor
    fn set_pull(&mut self, pin: u8, pull: Pull);

    /// Enable or disable the output driver
    fn set_output_enable(&mut self, pin: u8, enable: bool);

    /// Check if the output driver is enabled
    fn is_output_enabled(&self, pin: u8) -> bool;

    /// Set the level driven when the output is enabled
    fn set_output_level(&mut self, pin: u8, high: bool);

    /// Level currently requested on the output latch
    fn output_level(&self, pin: u8) -> bool;

    /// Level sampled on the pad
    fn input_level(&self, pin: u8) -> bool;

    /// Select which condition raises the pin's interrupt
    ///
    /// The interrupt side picks the new trigger up and restarts its edge
    /// tracking from the current level.
    fn set_trigger(&mut self, pin: u8, trigger: Trigger);

    /// Configure `pin` as a software input with the given pull
    fn make_input(&mut self, pin: u8, pull: Pull) {
        self.set_function(pin, PinFunction::Sio);
        self.set_output_enable(pin, false);
        self.set_pull(pin, pull);
    }

    /// Configure `pin` as a software output driving `high`
    fn make_output(&mut self, pin: u8, high: bool) {
        self.set_function(pin, PinFunction::Sio);
        self.set_output_level(pin, high);
        self.set_output_enable(pin, true);
    }
}
