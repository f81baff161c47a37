//! dlnio Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the protocol core drives. A
//! chip-specific HAL implements them, and host tests implement them with
//! in-memory fakes, so the command handlers never touch registers.
//!
//! # Layering
//!
//! ```text
//!   dlnio-core handlers ──▶ dlnio-hal traits ──┬──▶ dlnio-hal-rp2040
//!                                              └──▶ fakes in dlnio-core tests
//! ```
//!
//! # Traits
//!
//! - [`gpio::GpioBank`] - Whole-bank digital I/O, pin muxing and edge flags
//! - [`i2c::I2cBus`] - I2C bus master
//! - [`spi::SpiBus`] - SPI bus master
//! - [`adc::AdcReader`] - One-shot analog conversions
//! - [`board::BoardId`] - Factory-programmed unique id
//! - [`flash::NorFlash`] - Re-exported `embedded-storage` flash trait

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod board;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use adc::AdcReader;
pub use board::BoardId;
pub use flash::NorFlash;
pub use gpio::{EdgeFlags, GpioBank, PinFunction, Pull, Trigger};
pub use i2c::{I2cBus, I2cConfig};
pub use spi::{SpiBus, SpiConfig};
