//! I2C master abstraction
//!
//! The adapter only forwards plain host transfers, so the trait carries
//! single-direction reads and writes; repeated-start sequences are not
//! part of the DLN-2 I2C master commands.

/// Physical I2C master
///
/// Errors report an [`embedded_hal::i2c::ErrorKind`] so the I2C handler
/// can tell a data NACK from a missing device.
pub trait I2cBus {
    type Error: embedded_hal::i2c::Error;

    /// Change the SCL rate
    fn configure(&mut self, config: &I2cConfig) -> Result<(), Self::Error>;

    /// Address the 7-bit `address` for writing and send `data`
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Address the 7-bit `address` for reading and fill `buf`
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Bus settings applied on enable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// SCL rate in Hz
    pub frequency: u32,
}

impl I2cConfig {
    /// 100 kHz, the rate boards ship with
    pub const STANDARD: Self = Self { frequency: 100_000 };
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}
