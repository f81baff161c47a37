//! Event payloads
//!
//! Events are sent with the `EVENT` handle, `echo = 0` and no result
//! field, so the message is `HEADER_SIZE + payload` bytes long.

use crate::header::{write_u16, WireError};

/// `GPIO_CONDITION_MET_EV` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioConditionEvent {
    /// Pin that changed
    pub pin: u16,
    /// Level after the change (0 or 1)
    pub value: u8,
}

impl GpioConditionEvent {
    /// Encoded size: count u16, type u8, pin u16, value u8
    pub const SIZE: usize = 6;

    /// Encode into `buf`, returning the number of bytes written
    ///
    /// The host driver ignores `count` and `type`; both are sent as zero.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, WireError> {
        if buf.len() < Self::SIZE {
            return Err(WireError::BufferTooSmall);
        }
        write_u16(buf, 0, 0);
        buf[2] = 0;
        write_u16(buf, 3, self.pin);
        buf[5] = self.value;
        Ok(Self::SIZE)
    }
}

/// `ADC_CONDITION_MET_EV` payload
///
/// Only the arrival of the event matters to the host, which re-reads the
/// channels itself, so every field is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcConditionEvent;

impl AdcConditionEvent {
    /// Encoded size: count u16, port u8, chan u8, value u16, type u8
    pub const SIZE: usize = 7;

    /// Encode into `buf`, returning the number of bytes written
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, WireError> {
        if buf.len() < Self::SIZE {
            return Err(WireError::BufferTooSmall);
        }
        buf[..Self::SIZE].fill(0);
        Ok(Self::SIZE)
    }
}
