//! GPIO module
//!
//! Pins are handed to the host one at a time with `PIN_ENABLE` and then
//! driven through the value/direction commands. Event configuration only
//! selects the pin's interrupt trigger; the interrupt side decodes edges
//! with [`crate::events::PinEdges`].

use dlnio_hal::{GpioBank, Pull, Trigger};
use dlnio_protocol::commands::gpio;
use dlnio_protocol::header::{read_u16, write_u16};
use dlnio_protocol::{Module, ResultCode};

use crate::pins::PinRegistry;

/// Pins exposed to the host
pub const PIN_COUNT: u16 = 29;

/// GPIO command handler state
pub struct GpioModule {
    led: Option<u8>,
}

impl GpioModule {
    /// Create the handler; `led` is never reconfigured as an input
    pub fn new(led: Option<u8>) -> Self {
        Self { led }
    }

    fn is_led(&self, pin: u8) -> bool {
        self.led == Some(pin)
    }

    /// Handle one GPIO command
    pub fn handle<G: GpioBank>(
        &mut self,
        id: u16,
        request: &[u8],
        response: &mut [u8],
        pins: &mut PinRegistry,
        bank: &mut G,
    ) -> Result<usize, ResultCode> {
        match id {
            gpio::GET_PIN_COUNT => {
                if !request.is_empty() {
                    return Err(ResultCode::InvalidCommandSize);
                }
                write_u16(response, 0, PIN_COUNT);
                Ok(2)
            }
            gpio::SET_DEBOUNCE => Err(ResultCode::COMMAND_NOT_SUPPORTED),
            gpio::PIN_GET_VAL => {
                let pin = owned_pin(request, false, pins)?.0;
                Ok(pin_value(response, pin, bank.input_level(pin)))
            }
            gpio::PIN_SET_OUT_VAL => {
                let (pin, value) = owned_pin(request, true, pins)?;
                bank.set_output_level(pin, value != 0);
                Ok(pin_only(response, pin))
            }
            gpio::PIN_GET_OUT_VAL => {
                let pin = owned_pin(request, false, pins)?.0;
                Ok(pin_value(response, pin, bank.output_level(pin)))
            }
            gpio::PIN_ENABLE => {
                let pin = pin_arg(request, false)?.0;
                pins.request(pin as u16, Module::Gpio)?;
                if !self.is_led(pin) {
                    bank.make_input(pin, Pull::Up);
                }
                Ok(0)
            }
            gpio::PIN_DISABLE => {
                let pin = pin_arg(request, false)?.0;
                pins.free(pin as u16, Module::Gpio)?;
                bank.set_trigger(pin, Trigger::None);
                if !self.is_led(pin) {
                    bank.set_function(pin, dlnio_hal::PinFunction::Null);
                }
                Ok(0)
            }
            gpio::PIN_SET_DIRECTION => {
                let (pin, output) = owned_pin(request, true, pins)?;
                if self.is_led(pin) && output == 0 {
                    return Err(ResultCode::InvalidValue);
                }
                bank.set_output_enable(pin, output != 0);
                Ok(pin_only(response, pin))
            }
            gpio::PIN_GET_DIRECTION => {
                let pin = owned_pin(request, false, pins)?.0;
                Ok(pin_value(response, pin, bank.is_output_enabled(pin)))
            }
            gpio::PIN_SET_EVENT_CFG => self.set_event_cfg(request, pins, bank),
            _ => {
                debug!("GPIO command not supported: {=u16:#x}", id);
                Err(ResultCode::COMMAND_NOT_SUPPORTED)
            }
        }
    }

    /// `pin:u16, type:u8, period:u16`
    fn set_event_cfg<G: GpioBank>(
        &self,
        request: &[u8],
        pins: &PinRegistry,
        bank: &mut G,
    ) -> Result<usize, ResultCode> {
        if request.len() != 5 {
            return Err(ResultCode::InvalidCommandSize);
        }
        let pin = read_u16(request, 0);
        if !pins.is_owned_by(pin, Module::Gpio) || pin >= PIN_COUNT {
            return Err(ResultCode::InvalidPinNumber);
        }
        let pin = pin as u8;
        if self.is_led(pin) {
            return Err(ResultCode::InvalidValue);
        }

        let trigger = match request[2] {
            gpio::EVENT_NONE => Trigger::None,
            gpio::EVENT_CHANGE => Trigger::Change,
            gpio::EVENT_LVL_HIGH => Trigger::LevelHigh,
            gpio::EVENT_LVL_LOW => Trigger::LevelLow,
            _ => return Err(ResultCode::InvalidEventType),
        };
        bank.set_trigger(pin, trigger);

        debug!("GPIO pin {} events {}", pin, request[2]);
        Ok(0)
    }
}

/// Parse `pin:u16` optionally followed by a value byte
fn pin_arg(request: &[u8], with_value: bool) -> Result<(u8, u8), ResultCode> {
    let expected = if with_value { 3 } else { 2 };
    if request.len() != expected {
        return Err(ResultCode::InvalidPinNumber);
    }
    let pin = read_u16(request, 0);
    if pin >= PIN_COUNT {
        return Err(ResultCode::InvalidPinNumber);
    }
    let value = if with_value { request[2] } else { 0 };
    Ok((pin as u8, value))
}

/// Like [`pin_arg`] but also require GPIO ownership
fn owned_pin(
    request: &[u8],
    with_value: bool,
    pins: &PinRegistry,
) -> Result<(u8, u8), ResultCode> {
    let (pin, value) = pin_arg(request, with_value)?;
    if !pins.is_owned_by(pin as u16, Module::Gpio) {
        return Err(ResultCode::InvalidPinNumber);
    }
    Ok((pin, value))
}

fn pin_only(response: &mut [u8], pin: u8) -> usize {
    write_u16(response, 0, pin as u16);
    2
}

fn pin_value(response: &mut [u8], pin: u8, value: bool) -> usize {
    write_u16(response, 0, pin as u16);
    response[2] = value as u8;
    3
}
