//! Board-agnostic core of the dlnio adapter firmware
//!
//! Everything between the USB bulk endpoints and the hardware traits of
//! `dlnio-hal` lives here:
//!
//! - Message transport: slot pool, packet reassembly, IN queue
//! - Request routing to the GPIO, I2C, SPI and ADC handlers
//! - Pin ownership shared by all handlers
//! - GPIO edge and ADC event producers
//! - Wear-leveled flash store and the virtual AT24 EEPROM on top of it
//! - Board configuration parsing

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to later modules
mod fmt;

pub mod board;
pub mod config;
pub mod dispatch;
pub mod eeprom;
pub mod events;
pub mod modules;
pub mod pins;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testing;

pub use board::{Board, BoardParts};
pub use config::BoardConfig;
pub use dispatch::Device;
pub use transport::{Engine, PACKET_SIZE};
