//! ADC abstraction

/// One-shot analog conversions
pub trait AdcReader {
    /// Error type for conversions
    type Error;

    /// Convert `channel` and return the raw 12-bit result
    fn read(&mut self, channel: u8) -> Result<u16, Self::Error>;
}
