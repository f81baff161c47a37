//! ADC conversions
//!
//! RP2040 has a single 12-bit ADC. The adapter exposes the three
//! channels on the header pins:
//! - Channel 0: GPIO26
//! - Channel 1: GPIO27
//! - Channel 2: GPIO28

use dlnio_hal::AdcReader;
use embassy_rp::adc::{self, Adc, Blocking, Channel};

/// Conversion errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// No such channel
    InvalidChannel,
    /// Conversion failed
    Conversion,
}

/// Blocking ADC with its input channels
pub struct Rp2040Adc {
    adc: Adc<'static, Blocking>,
    channels: [Channel<'static>; 3],
}

impl Rp2040Adc {
    /// Wrap the converter and the GPIO26..28 channels, in channel order
    pub fn new(adc: Adc<'static, Blocking>, channels: [Channel<'static>; 3]) -> Self {
        Self { adc, channels }
    }
}

impl AdcReader for Rp2040Adc {
    type Error = AdcError;

    fn read(&mut self, channel: u8) -> Result<u16, Self::Error> {
        let ch = self
            .channels
            .get_mut(channel as usize)
            .ok_or(AdcError::InvalidChannel)?;
        self.adc
            .blocking_read(ch)
            .map_err(|_: adc::Error| AdcError::Conversion)
    }
}
