//! Handles, modules and command ids
//!
//! Command ids are grouped per module. Each id is built with [`cmd`] so
//! the module number always lands in the high byte.

/// Function block addressed by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Handle {
    /// Unsolicited device-to-host events
    Event = 0,
    /// Generic device control (version, serial)
    Ctrl = 1,
    Gpio = 2,
    I2c = 3,
    Spi = 4,
    Adc = 5,
}

impl Handle {
    /// Marker stored in a slot header while the slot is unused
    pub const UNUSED: u16 = 0xffff;

    /// Parse a wire value
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Handle::Event),
            1 => Some(Handle::Ctrl),
            2 => Some(Handle::Gpio),
            3 => Some(Handle::I2c),
            4 => Some(Handle::Spi),
            5 => Some(Handle::Adc),
            _ => None,
        }
    }

    /// Wire value
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Module number, the high byte of a command id
///
/// Also used as the owner tag in the pin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Module {
    Generic = 0x00,
    Gpio = 0x01,
    Spi = 0x02,
    I2c = 0x03,
    Adc = 0x06,
    Uart = 0x0e,
}

impl Module {
    /// Parse a module number
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Module::Generic),
            0x01 => Some(Module::Gpio),
            0x02 => Some(Module::Spi),
            0x03 => Some(Module::I2c),
            0x06 => Some(Module::Adc),
            0x0e => Some(Module::Uart),
            _ => None,
        }
    }

    /// Module number
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Build a command id from a command number and its module
pub const fn cmd(command: u8, module: Module) -> u16 {
    command as u16 | (module as u16) << 8
}

/// Generic control commands (handle `Ctrl`)
pub mod ctrl {
    use super::{cmd, Module};

    pub const GET_DEVICE_VER: u16 = cmd(0x30, Module::Generic);
    pub const GET_DEVICE_SN: u16 = cmd(0x31, Module::Generic);

    /// Hardware id reported by `GET_DEVICE_VER`
    pub const HW_ID: u32 = 0x200;
}

/// GPIO commands (handle `Gpio`)
pub mod gpio {
    use super::{cmd, Module};

    pub const GET_PIN_COUNT: u16 = cmd(0x01, Module::Gpio);
    pub const SET_DEBOUNCE: u16 = cmd(0x04, Module::Gpio);
    pub const PIN_GET_VAL: u16 = cmd(0x0B, Module::Gpio);
    pub const PIN_SET_OUT_VAL: u16 = cmd(0x0C, Module::Gpio);
    pub const PIN_GET_OUT_VAL: u16 = cmd(0x0D, Module::Gpio);
    pub const CONDITION_MET_EV: u16 = cmd(0x0F, Module::Gpio);
    pub const PIN_ENABLE: u16 = cmd(0x10, Module::Gpio);
    pub const PIN_DISABLE: u16 = cmd(0x11, Module::Gpio);
    pub const PIN_SET_DIRECTION: u16 = cmd(0x13, Module::Gpio);
    pub const PIN_GET_DIRECTION: u16 = cmd(0x14, Module::Gpio);
    pub const PIN_SET_EVENT_CFG: u16 = cmd(0x1E, Module::Gpio);

    pub const EVENT_NONE: u8 = 0;
    pub const EVENT_CHANGE: u8 = 1;
    pub const EVENT_LVL_HIGH: u8 = 2;
    pub const EVENT_LVL_LOW: u8 = 3;
}

/// I2C master commands (handle `I2c`)
pub mod i2c {
    use super::{cmd, Module};

    pub const ENABLE: u16 = cmd(0x01, Module::I2c);
    pub const DISABLE: u16 = cmd(0x02, Module::I2c);
    pub const WRITE: u16 = cmd(0x06, Module::I2c);
    pub const READ: u16 = cmd(0x07, Module::I2c);
}

/// SPI master commands (handle `Spi`)
pub mod spi {
    use super::{cmd, Module};

    pub const ENABLE: u16 = cmd(0x11, Module::Spi);
    pub const DISABLE: u16 = cmd(0x12, Module::Spi);
    pub const SET_MODE: u16 = cmd(0x14, Module::Spi);
    pub const SET_FRAME_SIZE: u16 = cmd(0x16, Module::Spi);
    pub const SET_FREQUENCY: u16 = cmd(0x18, Module::Spi);
    pub const READ_WRITE: u16 = cmd(0x1A, Module::Spi);
    pub const READ: u16 = cmd(0x1B, Module::Spi);
    pub const WRITE: u16 = cmd(0x1C, Module::Spi);
    pub const SET_SS: u16 = cmd(0x26, Module::Spi);
    pub const SS_MULTI_ENABLE: u16 = cmd(0x38, Module::Spi);
    pub const SS_MULTI_DISABLE: u16 = cmd(0x39, Module::Spi);
    pub const GET_SUPPORTED_FRAME_SIZES: u16 = cmd(0x43, Module::Spi);
    pub const GET_SS_COUNT: u16 = cmd(0x44, Module::Spi);
    pub const GET_MIN_FREQUENCY: u16 = cmd(0x45, Module::Spi);
    pub const GET_MAX_FREQUENCY: u16 = cmd(0x46, Module::Spi);

    /// Mode bit: clock phase
    pub const CPHA: u8 = 1 << 0;
    /// Mode bit: clock polarity
    pub const CPOL: u8 = 1 << 1;

    /// Transfer attribute: keep chip select asserted afterwards
    pub const ATTR_LEAVE_SS_LOW: u8 = 1 << 0;

    /// Largest single transfer
    pub const MAX_XFER_SIZE: usize = 256;
}

/// ADC commands (handle `Adc`)
pub mod adc {
    use super::{cmd, Module};

    pub const GET_CHANNEL_COUNT: u16 = cmd(0x01, Module::Adc);
    pub const ENABLE: u16 = cmd(0x02, Module::Adc);
    pub const DISABLE: u16 = cmd(0x03, Module::Adc);
    pub const CHANNEL_ENABLE: u16 = cmd(0x05, Module::Adc);
    pub const CHANNEL_DISABLE: u16 = cmd(0x06, Module::Adc);
    pub const SET_RESOLUTION: u16 = cmd(0x08, Module::Adc);
    pub const CHANNEL_GET_VAL: u16 = cmd(0x0A, Module::Adc);
    pub const CHANNEL_GET_ALL_VAL: u16 = cmd(0x0B, Module::Adc);
    pub const CHANNEL_SET_CFG: u16 = cmd(0x0C, Module::Adc);
    pub const CONDITION_MET_EV: u16 = cmd(0x10, Module::Adc);

    pub const EVENT_NONE: u8 = 0;
    pub const EVENT_ALWAYS: u8 = 5;

    /// Channel slots in a `CHANNEL_GET_ALL_VAL` response
    pub const MAX_CHANNELS: usize = 8;
}
