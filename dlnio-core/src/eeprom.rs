//! Virtual AT24 EEPROM
//!
//! Emulates a 24cXX serial EEPROM on the I2C bus. A write starts with a
//! big-endian memory offset of one or two bytes, optionally followed by
//! data; a read returns bytes from the current offset. Contents live in
//! the [`FlashStore`] under the device's bus address.

use dlnio_hal::NorFlash;
use dlnio_protocol::ResultCode;
use heapless::Vec;

use crate::store::{FlashStore, StoreError, PAGE_SIZE};

/// Longest initial image a device can carry
pub const MAX_INITIAL: usize = 32;

/// EEPROM errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EepromError {
    /// Write shorter than the memory offset
    MissingOffset,
    /// Offset or transfer beyond the device size
    OutOfRange,
    /// Data write to a read-only device
    ReadOnly,
    /// Backing store failed
    Store(StoreError),
}

impl From<StoreError> for EepromError {
    fn from(e: StoreError) -> Self {
        EepromError::Store(e)
    }
}

impl From<EepromError> for ResultCode {
    fn from(_: EepromError) -> Self {
        // A real device would not acknowledge
        ResultCode::I2cMasterSendingAddressFailed
    }
}

/// Static description of one emulated EEPROM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EepromConfig {
    /// 7-bit bus address
    pub address: u8,
    /// Capacity in bytes, at most one store page ([`PAGE_SIZE`])
    pub size: usize,
    /// Bytes of memory offset at the start of a write (1 or 2)
    pub address_width: u8,
    pub read_only: bool,
    /// Contents of a device that was never written
    pub initial: Vec<u8, MAX_INITIAL>,
}

impl EepromConfig {
    /// The board's stock 24c32 at 0x10 with a greeting preloaded
    ///
    /// A real 24c32 holds 4 KiB; the emulated one stops at the store page.
    pub fn at24c32() -> Self {
        let mut initial = Vec::new();
        let _ = initial.extend_from_slice(b"HELLO\0");
        Self {
            address: 0x10,
            size: PAGE_SIZE,
            address_width: 2,
            read_only: false,
            initial,
        }
    }
}

/// AT24 emulation state
#[derive(Debug, Clone)]
pub struct At24 {
    config: EepromConfig,
    offset: usize,
}

impl At24 {
    /// Capacities above [`PAGE_SIZE`] are cut down to it
    pub fn new(mut config: EepromConfig) -> Self {
        config.size = config.size.min(PAGE_SIZE);
        Self { config, offset: 0 }
    }

    /// Bus address
    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// Current memory offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn store_address(&self) -> u16 {
        self.config.address as u16
    }

    /// Handle a bus write: offset bytes, then optional data
    pub fn write<F: NorFlash>(
        &mut self,
        store: &mut FlashStore<F>,
        data: &[u8],
    ) -> Result<(), EepromError> {
        let width = self.config.address_width as usize;
        if data.len() < width {
            return Err(EepromError::MissingOffset);
        }

        let (offset, payload) = data.split_at(width);
        let offset = offset
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        if offset >= self.config.size {
            return Err(EepromError::OutOfRange);
        }
        self.offset = offset;

        if payload.is_empty() {
            return Ok(());
        }
        if self.config.read_only {
            return Err(EepromError::ReadOnly);
        }
        if offset + payload.len() > self.config.size {
            return Err(EepromError::OutOfRange);
        }

        trace!(
            "EEPROM {=u8:#x} write {} bytes at {}",
            self.config.address,
            payload.len(),
            offset
        );
        store.write(self.store_address(), offset, payload, &self.config.initial)?;
        Ok(())
    }

    /// Handle a bus read from the current offset
    pub fn read<F: NorFlash>(
        &mut self,
        store: &mut FlashStore<F>,
        buf: &mut [u8],
    ) -> Result<(), EepromError> {
        if buf.is_empty() {
            return Ok(());
        }
        if self.offset + buf.len() > self.config.size {
            return Err(EepromError::OutOfRange);
        }

        store.read(self.store_address(), self.offset, buf, &self.config.initial)?;
        self.offset += buf.len();
        Ok(())
    }
}
