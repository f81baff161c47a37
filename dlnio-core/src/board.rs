//! Board description
//!
//! Bundles the peripheral types a concrete board provides so the device
//! can be generic over a single parameter.

use dlnio_hal::{AdcReader, GpioBank, I2cBus, NorFlash, SpiBus};
use embedded_hal::delay::DelayNs;

use crate::events::EventTimer;

/// Peripheral types of a board
pub trait Board {
    type Gpio: GpioBank;
    type I2c: I2cBus;
    type Spi: SpiBus;
    type Adc: AdcReader;
    type Flash: NorFlash;
    /// Blocking delay used for chip select settling
    type Delay: DelayNs;
    /// Pacing for ADC condition events
    type Timer: EventTimer;
}

/// Peripheral instances handed to [`crate::dispatch::Device::new`]
pub struct BoardParts<B: Board> {
    pub gpio: B::Gpio,
    pub i2c: B::I2c,
    pub spi: B::Spi,
    pub adc: B::Adc,
    pub flash: B::Flash,
    /// Offset of the store region inside `flash`
    pub flash_base: u32,
    pub delay: B::Delay,
    pub timer: B::Timer,
    /// Factory-programmed unique id
    pub unique_id: [u8; 8],
}
