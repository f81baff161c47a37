//! RP2040 implementation of the dlnio hardware traits
//!
//! Wraps the embassy-rp blocking drivers so the protocol core can drive
//! them through the `dlnio-hal` traits:
//!
//! - [`gpio::Rp2040Gpio`] - Whole-bank pin muxing and SIO
//! - [`gpio::PinWatch`] - Per-pin interrupt waits
//! - [`i2c::Rp2040I2c`] - I2C0 master
//! - [`spi::Rp2040Spi`] - SPI0 master
//! - [`adc::Rp2040Adc`] - One-shot conversions on GPIO26..28
//! - [`flash::Rp2040Flash`] - On-chip QSPI flash and the board unique id
//! - [`pins`] - Which pins each peripheral block can be routed to

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod pins;
pub mod spi;

pub use adc::Rp2040Adc;
pub use flash::{Rp2040Flash, FLASH_SIZE};
pub use gpio::{PinWatch, Rp2040Gpio};
pub use i2c::Rp2040I2c;
pub use spi::Rp2040Spi;
