//! ADC module
//!
//! Three channels on the analog-capable pins. Samples are reported with
//! the 10-bit resolution the host driver expects.

use dlnio_hal::{AdcReader, GpioBank, PinFunction};
use dlnio_protocol::commands::adc;
use dlnio_protocol::header::{read_u16, write_u16};
use dlnio_protocol::{Module, ResultCode};

use crate::events::EventTimer;
use crate::pins::PinRegistry;

/// Channels exposed to the host
pub const CHANNEL_COUNT: u8 = 3;

/// Pin of channel 0; the others follow
pub const FIRST_PIN: u8 = 26;

/// ADC command handler
pub struct AdcModule<A, T> {
    adc: A,
    timer: T,
    /// One condition event is owed after the current response
    event_due: bool,
}

impl<A: AdcReader, T: EventTimer> AdcModule<A, T> {
    pub fn new(adc: A, timer: T) -> Self {
        Self {
            adc,
            timer,
            event_due: false,
        }
    }

    /// Take the pending one-shot event request
    pub fn take_event_due(&mut self) -> bool {
        core::mem::take(&mut self.event_due)
    }

    fn sample(&mut self, channel: u8) -> Result<u16, ResultCode> {
        // The host driver has a fixed 10-bit resolution
        self.adc
            .read(channel)
            .map(|raw| raw >> 2)
            .map_err(|_| ResultCode::Fail)
    }

    /// Handle one ADC command
    pub fn handle<G: GpioBank>(
        &mut self,
        id: u16,
        request: &[u8],
        response: &mut [u8],
        pins: &mut PinRegistry,
        bank: &mut G,
    ) -> Result<usize, ResultCode> {
        match id {
            adc::GET_CHANNEL_COUNT => {
                expect_len(request, 1)?;
                response[0] = CHANNEL_COUNT;
                Ok(1)
            }
            adc::ENABLE => {
                expect_len(request, 1)?;
                write_u16(response, 0, 0);
                Ok(2)
            }
            adc::DISABLE => {
                expect_len(request, 1)?;
                self.timer.stop();
                for pin in FIRST_PIN..FIRST_PIN + CHANNEL_COUNT {
                    if pins.is_owned_by(pin as u16, Module::Adc) {
                        let _ = pins.free(pin as u16, Module::Adc);
                        bank.set_function(pin, PinFunction::Null);
                    }
                }
                write_u16(response, 0, 0);
                Ok(2)
            }
            adc::CHANNEL_ENABLE => {
                let pin = channel_pin(request)?;
                pins.request(pin as u16, Module::Adc)?;
                bank.set_function(pin, PinFunction::Analog);
                Ok(0)
            }
            adc::CHANNEL_DISABLE => {
                let pin = channel_pin(request)?;
                if pins.is_owned_by(pin as u16, Module::Adc) {
                    pins.free(pin as u16, Module::Adc)?;
                    bank.set_function(pin, PinFunction::Null);
                }
                Ok(0)
            }
            adc::SET_RESOLUTION => {
                expect_len(request, 2)?;
                Ok(0)
            }
            adc::CHANNEL_GET_VAL => {
                let pin = channel_pin(request)?;
                let value = self.sample(pin - FIRST_PIN)?;
                write_u16(response, 0, value);
                Ok(2)
            }
            adc::CHANNEL_GET_ALL_VAL => {
                expect_len(request, 1)?;
                let len = 2 * (1 + adc::MAX_CHANNELS);
                response[..len].fill(0);
                for channel in 0..CHANNEL_COUNT {
                    let value = self.sample(channel)?;
                    write_u16(response, 2 + 2 * channel as usize, value);
                }
                Ok(len)
            }
            adc::CHANNEL_SET_CFG => self.set_cfg(request),
            _ => {
                debug!("ADC command not supported: {=u16:#x}", id);
                Err(ResultCode::COMMAND_NOT_SUPPORTED)
            }
        }
    }

    /// `port, chan, type, period:u16, low:u16, high:u16`
    fn set_cfg(&mut self, request: &[u8]) -> Result<usize, ResultCode> {
        expect_len(request, 9)?;
        if request[1] >= CHANNEL_COUNT {
            return Err(ResultCode::InvalidChannelNumber);
        }
        let kind = request[2];
        let period = read_u16(request, 3);

        match (kind, period) {
            (adc::EVENT_ALWAYS, 0) => Err(ResultCode::InvalidEventPeriod),
            (adc::EVENT_ALWAYS, period) => {
                debug!("ADC events every {} ms", period);
                self.timer.start(period);
                Ok(0)
            }
            (adc::EVENT_NONE, 0) => {
                self.timer.stop();
                self.event_due = true;
                Ok(0)
            }
            (adc::EVENT_NONE, _) => {
                self.timer.stop();
                Ok(0)
            }
            _ => Err(ResultCode::NotImplemented),
        }
    }
}

fn expect_len(request: &[u8], len: usize) -> Result<(), ResultCode> {
    if request.len() == len {
        Ok(())
    } else {
        Err(ResultCode::InvalidCommandSize)
    }
}

/// Parse `port, chan` into the channel's pin
fn channel_pin(request: &[u8]) -> Result<u8, ResultCode> {
    expect_len(request, 2)?;
    let channel = request[1];
    if channel >= CHANNEL_COUNT {
        return Err(ResultCode::InvalidChannelNumber);
    }
    Ok(FIRST_PIN + channel)
}
