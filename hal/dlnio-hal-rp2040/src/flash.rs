//! On-chip flash driver for RP2040
//!
//! Exposes the QSPI flash through the blocking `embedded-storage` NOR
//! traits, addressed from the start of flash, and reads the flash chip's
//! unique id for the board serial number.
//!
//! Erase and program run with XIP disabled; the embassy driver keeps
//! interrupts masked for the duration.

use dlnio_hal::flash::{ErrorType, NorFlash, ReadNorFlash};
use dlnio_hal::BoardId;
use embassy_rp::flash::{self, Blocking, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

/// Flash size on the Pico
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Blocking flash with the unique id
pub struct Rp2040Flash {
    flash: Flash<'static, FLASH, Blocking, FLASH_SIZE>,
}

impl Rp2040Flash {
    pub fn new(flash: Peri<'static, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
        }
    }
}

impl BoardId for Rp2040Flash {
    fn unique_id(&mut self) -> [u8; 8] {
        let mut id = [0u8; 8];
        // The id stays zero if the chip does not answer
        if self.flash.blocking_unique_id(&mut id).is_err() {
            id = [0; 8];
        }
        id
    }
}

impl ErrorType for Rp2040Flash {
    type Error = flash::Error;
}

impl ReadNorFlash for Rp2040Flash {
    const READ_SIZE: usize = <Flash<'static, FLASH, Blocking, FLASH_SIZE> as ReadNorFlash>::READ_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        ReadNorFlash::read(&mut self.flash, offset, bytes)
    }

    fn capacity(&self) -> usize {
        FLASH_SIZE
    }
}

impl NorFlash for Rp2040Flash {
    const WRITE_SIZE: usize = <Flash<'static, FLASH, Blocking, FLASH_SIZE> as NorFlash>::WRITE_SIZE;
    const ERASE_SIZE: usize = flash::ERASE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        NorFlash::erase(&mut self.flash, from, to)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        NorFlash::write(&mut self.flash, offset, bytes)
    }
}
