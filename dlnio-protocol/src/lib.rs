//! DLN-2 Wire Protocol
//!
//! This crate defines the message format spoken between a USB host driver
//! and the adapter over a single pair of bulk endpoints. Every request
//! carries a fixed header followed by a command payload; every response
//! repeats the header and appends a 16-bit result code.
//!
//! # Message Layout
//!
//! All fields are little-endian:
//! ```text
//! Request:
//! ┌──────┬────────────┬──────┬────────┬─────────────┐
//! │ SIZE │ COMMAND ID │ ECHO │ HANDLE │ PAYLOAD     │
//! │ 2B   │ 2B         │ 2B   │ 2B     │ 0–256B      │
//! └──────┴────────────┴──────┴────────┴─────────────┘
//!
//! Response:
//! ┌──────┬────────────┬──────┬────────┬────────┬─────────────┐
//! │ SIZE │ COMMAND ID │ ECHO │ HANDLE │ RESULT │ PAYLOAD     │
//! │ 2B   │ 2B         │ 2B   │ 2B     │ 2B     │ 0–256B      │
//! └──────┴────────────┴──────┴────────┴────────┴─────────────┘
//! ```
//!
//! The command id packs the owning module in its high byte and the
//! command number in its low byte. Unsolicited events use the request
//! layout with the `EVENT` handle and no result field.

#![no_std]
#![deny(unsafe_code)]

pub mod commands;
pub mod events;
pub mod header;
pub mod result;

pub use commands::{Handle, Module};
pub use events::{AdcConditionEvent, GpioConditionEvent};
pub use header::{
    Header, WireError, HEADER_SIZE, MAX_MESSAGE_SIZE, MAX_PAYLOAD_SIZE, RESPONSE_HEADER_SIZE,
};
pub use result::ResultCode;
