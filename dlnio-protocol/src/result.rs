//! Response result codes

/// Result code carried in every response
///
/// `Success` is the only non-error value. The remaining codes follow the
/// numbering of the DLN-2 adapter family so that the stock host driver
/// can interpret them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ResultCode {
    Success = 0x00,
    Fail = 0x83,
    BadParameter = 0x85,
    InvalidCommandSize = 0x88,
    InvalidMessageSize = 0x8a,
    InvalidHandle = 0x8f,
    /// Also reported for unknown command ids
    NotImplemented = 0x91,
    PinInUse = 0xa5,
    InvalidPortNumber = 0xa8,
    InvalidEventType = 0xa9,
    PinNotConnectedToModule = 0xaa,
    InvalidPinNumber = 0xab,
    InvalidEventPeriod = 0xac,
    InvalidBufferSize = 0xae,
    SpiMasterInvalidSsValue = 0xb9,
    I2cMasterSendingAddressFailed = 0xba,
    I2cMasterSendingDataFailed = 0xbb,
    InvalidChannelNumber = 0xc0,
    InvalidMode = 0xc7,
    InvalidValue = 0xe2,
}

impl ResultCode {
    /// Alias used by command handlers for unknown command ids
    pub const COMMAND_NOT_SUPPORTED: Self = ResultCode::NotImplemented;

    /// Wire value
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire value
    pub fn from_u16(value: u16) -> Option<Self> {
        let code = match value {
            0x00 => ResultCode::Success,
            0x83 => ResultCode::Fail,
            0x85 => ResultCode::BadParameter,
            0x88 => ResultCode::InvalidCommandSize,
            0x8a => ResultCode::InvalidMessageSize,
            0x8f => ResultCode::InvalidHandle,
            0x91 => ResultCode::NotImplemented,
            0xa5 => ResultCode::PinInUse,
            0xa8 => ResultCode::InvalidPortNumber,
            0xa9 => ResultCode::InvalidEventType,
            0xaa => ResultCode::PinNotConnectedToModule,
            0xab => ResultCode::InvalidPinNumber,
            0xac => ResultCode::InvalidEventPeriod,
            0xae => ResultCode::InvalidBufferSize,
            0xb9 => ResultCode::SpiMasterInvalidSsValue,
            0xba => ResultCode::I2cMasterSendingAddressFailed,
            0xbb => ResultCode::I2cMasterSendingDataFailed,
            0xc0 => ResultCode::InvalidChannelNumber,
            0xc7 => ResultCode::InvalidMode,
            0xe2 => ResultCode::InvalidValue,
            _ => return None,
        };
        Some(code)
    }

    /// Returns true for `Success`
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl From<ResultCode> for u16 {
    fn from(code: ResultCode) -> Self {
        code.as_u16()
    }
}
