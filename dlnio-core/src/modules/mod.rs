//! Per-module command handlers
//!
//! Each handler decodes the payload of one DLN-2 module's commands and
//! drives the matching peripheral. Pin ownership goes through the shared
//! [`crate::pins::PinRegistry`].

pub mod adc;
pub mod gpio;
pub mod i2c;
pub mod spi;

pub use adc::AdcModule;
pub use gpio::GpioModule;
pub use i2c::{I2cModule, I2cPins, VirtualDevice};
pub use spi::{SpiModule, SpiPins};
