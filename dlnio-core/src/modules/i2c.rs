//! I2C module
//!
//! One master port. Transfers go to an emulated device when one answers
//! the address, otherwise to the physical bus.

use dlnio_hal::{GpioBank, I2cBus, I2cConfig, NorFlash, PinFunction};
use dlnio_protocol::commands::i2c;
use dlnio_protocol::header::{read_u16, write_u16};
use dlnio_protocol::{Module, ResultCode};
use embedded_hal::i2c::{Error as _, ErrorKind, NoAcknowledgeSource};
use heapless::Vec;

use crate::eeprom::{At24, EepromError};
use crate::pins::PinMux;
use crate::store::FlashStore;

/// Emulated devices per bus
pub const MAX_DEVICES: usize = 4;

/// `port, addr, mem_addr_len, mem_addr:u32, buf_len:u16`
const TRANSFER_HEADER: usize = 9;

/// Pin assignment of the I2C port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cPins {
    pub sda: u8,
    pub scl: u8,
}

/// Device emulated in firmware
pub enum VirtualDevice {
    At24(At24),
}

impl VirtualDevice {
    /// Bus address, `None` answers every address
    pub fn address(&self) -> Option<u8> {
        match self {
            VirtualDevice::At24(dev) => Some(dev.address()),
        }
    }

    fn answers(&self, address: u8) -> bool {
        self.address().map_or(true, |a| a == address)
    }

    fn read<F: NorFlash>(
        &mut self,
        store: &mut FlashStore<F>,
        buf: &mut [u8],
    ) -> Result<(), EepromError> {
        match self {
            VirtualDevice::At24(dev) => dev.read(store, buf),
        }
    }

    fn write<F: NorFlash>(
        &mut self,
        store: &mut FlashStore<F>,
        data: &[u8],
    ) -> Result<(), EepromError> {
        match self {
            VirtualDevice::At24(dev) => dev.write(store, data),
        }
    }
}

/// I2C command handler
pub struct I2cModule<I, F> {
    bus: I,
    pins: I2cPins,
    config: I2cConfig,
    enabled: bool,
    devices: Vec<VirtualDevice, MAX_DEVICES>,
    store: FlashStore<F>,
}

impl<I: I2cBus, F: NorFlash> I2cModule<I, F> {
    pub fn new(bus: I, pins: I2cPins, frequency: u32, store: FlashStore<F>) -> Self {
        Self {
            bus,
            pins,
            config: I2cConfig { frequency },
            enabled: false,
            devices: Vec::new(),
            store,
        }
    }

    /// Register an emulated device
    ///
    /// Returns the device back if the table is full.
    pub fn attach(&mut self, device: VirtualDevice) -> Result<(), VirtualDevice> {
        self.devices.push(device)
    }

    /// Check if the physical bus is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Handle one I2C command
    pub fn handle<G: GpioBank>(
        &mut self,
        id: u16,
        request: &[u8],
        response: &mut [u8],
        mux: &mut PinMux<'_, G>,
    ) -> Result<usize, ResultCode> {
        match id {
            i2c::ENABLE => {
                port_only(request)?;
                self.enable(mux)?;
                Ok(0)
            }
            i2c::DISABLE => {
                port_only(request)?;
                let I2cPins { sda, scl } = self.pins;
                mux.release_all(&[sda, scl], Module::I2c)?;
                self.enabled = false;
                self.store.commit().map_err(|e| {
                    error!("EEPROM commit failed: {}", e);
                    ResultCode::from(e)
                })?;
                Ok(0)
            }
            i2c::READ => self.read(request, response),
            i2c::WRITE => self.write(request, response),
            _ => {
                debug!("I2C command not supported: {=u16:#x}", id);
                Err(ResultCode::COMMAND_NOT_SUPPORTED)
            }
        }
    }

    fn enable<G: GpioBank>(&mut self, mux: &mut PinMux<'_, G>) -> Result<(), ResultCode> {
        let I2cPins { sda, scl } = self.pins;
        mux.request_all(&[scl, sda], Module::I2c)?;

        if self.bus.configure(&self.config).is_err() {
            let _ = mux.registry.free(scl as u16, Module::I2c);
            let _ = mux.registry.free(sda as u16, Module::I2c);
            return Err(ResultCode::Fail);
        }
        mux.connect(&[scl, sda], PinFunction::I2c);
        self.enabled = true;

        debug!("I2C enabled at {=u32} Hz", self.config.frequency);
        Ok(())
    }

    fn device(&self, address: u8) -> Option<usize> {
        self.devices.iter().position(|dev| dev.answers(address))
    }

    fn read(&mut self, request: &[u8], response: &mut [u8]) -> Result<usize, ResultCode> {
        if request.len() != TRANSFER_HEADER {
            return Err(ResultCode::InvalidCommandSize);
        }
        check_port(request)?;
        let address = request[1];
        let len = read_u16(request, 7) as usize;
        if len > dlnio_protocol::header::MAX_PAYLOAD_SIZE {
            return Err(ResultCode::InvalidCommandSize);
        }
        let buf = response
            .get_mut(2..2 + len)
            .ok_or(ResultCode::BadParameter)?;

        let served = match self.device(address) {
            Some(i) => self.devices[i]
                .read(&mut self.store, buf)
                .inspect_err(|e| debug!("Virtual read at {=u8:#x} failed: {}", address, e))
                .is_ok(),
            None => false,
        };
        if !served {
            self.bus_transfer(|bus| bus.read(address, buf))?;
        }

        write_u16(response, 0, len as u16);
        Ok(2 + len)
    }

    fn write(&mut self, request: &[u8], response: &mut [u8]) -> Result<usize, ResultCode> {
        if request.len() < TRANSFER_HEADER {
            return Err(ResultCode::InvalidCommandSize);
        }
        check_port(request)?;
        let address = request[1];
        let len = read_u16(request, 7) as usize;
        let data = &request[TRANSFER_HEADER..];
        if data.len() != len {
            return Err(ResultCode::InvalidCommandSize);
        }

        // A failing virtual device leaves the transfer to the physical bus
        let served = match self.device(address) {
            Some(i) => self.devices[i]
                .write(&mut self.store, data)
                .inspect_err(|e| debug!("Virtual write at {=u8:#x} failed: {}", address, e))
                .is_ok(),
            None => false,
        };
        if !served {
            self.bus_transfer(|bus| bus.write(address, data))?;
        }

        // The host expects the written length back as payload
        let echo = response.get_mut(..len).ok_or(ResultCode::BadParameter)?;
        echo.fill(0);
        Ok(len)
    }

    fn bus_transfer(
        &mut self,
        op: impl FnOnce(&mut I) -> Result<(), I::Error>,
    ) -> Result<(), ResultCode> {
        if !self.enabled {
            return Err(ResultCode::I2cMasterSendingAddressFailed);
        }
        op(&mut self.bus).map_err(|e| match e.kind() {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => {
                ResultCode::I2cMasterSendingDataFailed
            }
            _ => ResultCode::I2cMasterSendingAddressFailed,
        })
    }
}

fn check_port(request: &[u8]) -> Result<(), ResultCode> {
    match request.first() {
        Some(0) => Ok(()),
        _ => Err(ResultCode::InvalidPortNumber),
    }
}

fn port_only(request: &[u8]) -> Result<(), ResultCode> {
    if request.len() != 1 {
        return Err(ResultCode::InvalidCommandSize);
    }
    check_port(request)
}
