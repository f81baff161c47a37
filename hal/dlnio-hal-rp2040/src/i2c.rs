//! I2C0 master

use dlnio_hal::{I2cBus, I2cConfig};
use embassy_embedded_hal::SetConfig;
use embassy_rp::i2c::{self, Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embedded_hal::i2c::ErrorKind;

/// I2C errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// Transfer failed on the bus
    Bus(i2c::Error),
    /// Clock rate out of range for the peripheral clock
    Config,
}

impl embedded_hal::i2c::Error for I2cError {
    fn kind(&self) -> ErrorKind {
        match self {
            I2cError::Bus(e) => embedded_hal::i2c::Error::kind(e),
            I2cError::Config => ErrorKind::Other,
        }
    }
}

/// Blocking I2C0 master
pub struct Rp2040I2c {
    bus: I2c<'static, I2C0, Blocking>,
}

impl Rp2040I2c {
    pub fn new(bus: I2c<'static, I2C0, Blocking>) -> Self {
        Self { bus }
    }
}

impl I2cBus for Rp2040I2c {
    type Error = I2cError;

    fn configure(&mut self, config: &I2cConfig) -> Result<(), Self::Error> {
        let mut cfg = i2c::Config::default();
        cfg.frequency = config.frequency;
        self.bus.set_config(&cfg).map_err(|_| I2cError::Config)
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.bus.blocking_write(address, data).map_err(I2cError::Bus)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.blocking_read(address, buf).map_err(I2cError::Bus)
    }
}
