//! GPIO bank on the RP2040 register block
//!
//! Pins are handed between SIO, I2C and SPI while the firmware runs, which
//! the typed embassy pin drivers cannot express. This bank writes the
//! IO_BANK0 function select, the pad controls and SIO directly.
//!
//! Pin events ride on embassy-rp's `IO_IRQ_BANK0` handler: a [`PinWatch`]
//! arms the pin interrupt through [`Flex`] and wakes when it fires. The
//! bank itself only forwards trigger changes to the watchers.

use dlnio_hal::{EdgeFlags, GpioBank, PinFunction, Pull, Trigger};
use embassy_rp::gpio::{AnyPin, Flex, Pin};
use embassy_rp::{pac, Peri};

/// Number of user GPIOs on the RP2040
pub const GPIO_COUNT: u8 = 30;

// IO_BANK0 function select values
const FUNCSEL_SPI: u8 = 1;
const FUNCSEL_I2C: u8 = 3;
const FUNCSEL_SIO: u8 = 5;
const FUNCSEL_NULL: u8 = 0x1f;

/// Receives every trigger change, typically to wake the pin's watcher
pub type TriggerHook = fn(pin: u8, trigger: Trigger);

/// The RP2040 bank 0 GPIOs
pub struct Rp2040Gpio {
    on_trigger: TriggerHook,
}

impl Rp2040Gpio {
    /// Take over the bank
    ///
    /// `embassy_rp::init` must have run so IO_BANK0 and PADS_BANK0 are out
    /// of reset.
    pub fn new(on_trigger: TriggerHook) -> Self {
        Self { on_trigger }
    }

    fn valid(pin: u8) -> bool {
        pin < GPIO_COUNT
    }

    fn bit(pin: u8) -> u32 {
        1 << pin
    }
}

impl GpioBank for Rp2040Gpio {
    fn set_function(&mut self, pin: u8, function: PinFunction) {
        if !Self::valid(pin) {
            return;
        }
        let n = pin as usize;

        let funcsel = match function {
            PinFunction::Null | PinFunction::Analog => FUNCSEL_NULL,
            PinFunction::Sio => FUNCSEL_SIO,
            PinFunction::I2c => FUNCSEL_I2C,
            PinFunction::Spi => FUNCSEL_SPI,
        };

        pac::PADS_BANK0.gpio(n).modify(|w| match function {
            PinFunction::Analog => {
                w.set_ie(false);
                w.set_od(true);
                w.set_pue(false);
                w.set_pde(false);
            }
            PinFunction::I2c => {
                // Open drain bus; the pad pull-up keeps it idle high
                w.set_ie(true);
                w.set_od(false);
                w.set_pue(true);
                w.set_pde(false);
            }
            _ => {
                w.set_ie(true);
                w.set_od(false);
            }
        });
        pac::IO_BANK0
            .gpio(n)
            .ctrl()
            .write(|w| w.set_funcsel(funcsel));
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) {
        if !Self::valid(pin) {
            return;
        }
        pac::PADS_BANK0.gpio(pin as usize).modify(|w| {
            w.set_pue(pull == Pull::Up);
            w.set_pde(pull == Pull::Down);
        });
    }

    fn set_output_enable(&mut self, pin: u8, enable: bool) {
        if !Self::valid(pin) {
            return;
        }
        let oe = pac::SIO.gpio_oe(0);
        if enable {
            oe.value_set().write_value(Self::bit(pin));
        } else {
            oe.value_clr().write_value(Self::bit(pin));
        }
    }

    fn is_output_enabled(&self, pin: u8) -> bool {
        Self::valid(pin) && pac::SIO.gpio_oe(0).value().read() & Self::bit(pin) != 0
    }

    fn set_output_level(&mut self, pin: u8, high: bool) {
        if !Self::valid(pin) {
            return;
        }
        let out = pac::SIO.gpio_out(0);
        if high {
            out.value_set().write_value(Self::bit(pin));
        } else {
            out.value_clr().write_value(Self::bit(pin));
        }
    }

    fn output_level(&self, pin: u8) -> bool {
        Self::valid(pin) && pac::SIO.gpio_out(0).value().read() & Self::bit(pin) != 0
    }

    fn input_level(&self, pin: u8) -> bool {
        Self::valid(pin) && pac::SIO.gpio_in(0).read() & Self::bit(pin) != 0
    }

    fn set_trigger(&mut self, pin: u8, trigger: Trigger) {
        if Self::valid(pin) {
            (self.on_trigger)(pin, trigger);
        }
    }
}

/// Read and acknowledge the edges latched on `pin`
///
/// The raw status latches edges whether or not the interrupt is enabled,
/// and embassy-rp's handler leaves it alone.
pub fn take_edges(pin: u8) -> EdgeFlags {
    if pin >= GPIO_COUNT {
        return EdgeFlags::empty();
    }
    let (group, index) = (pin as usize / 8, pin as usize % 8);
    let intr = pac::IO_BANK0.intr(group).read();
    let (rise, fall) = (intr.edge_high(index), intr.edge_low(index));
    pac::IO_BANK0.intr(group).write(|w| {
        w.set_edge_high(index, rise);
        w.set_edge_low(index, fall);
    });

    let mut flags = EdgeFlags::empty();
    if rise {
        flags = flags | EdgeFlags::EDGE_RISE;
    }
    if fall {
        flags = flags | EdgeFlags::EDGE_FALL;
    }
    flags
}

/// Interrupt waiter for one pin
///
/// Creating the watcher routes the pin to SIO with its input buffer on;
/// the bank re-routes it afterwards as the host asks. The watcher never
/// drops its [`Flex`], so it never resets the pad behind the bank's back.
pub struct PinWatch {
    pin: Flex<'static>,
    number: u8,
}

impl PinWatch {
    pub fn new(pin: Peri<'static, AnyPin>) -> Self {
        let number = pin.pin();
        Self {
            pin: Flex::new(pin),
            number,
        }
    }

    /// GPIO number
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Level on the pad right now
    pub fn level(&self) -> bool {
        self.pin.is_high()
    }

    /// Wait for `trigger` to fire and return what the interrupt latched
    ///
    /// [`Trigger::None`] never fires.
    pub async fn wait(&mut self, trigger: Trigger) -> EdgeFlags {
        match trigger {
            Trigger::None => core::future::pending().await,
            Trigger::Change => {
                self.pin.wait_for_any_edge().await;
                take_edges(self.number)
            }
            Trigger::LevelHigh => {
                self.pin.wait_for_high().await;
                EdgeFlags::LEVEL_HIGH
            }
            Trigger::LevelLow => {
                self.pin.wait_for_low().await;
                EdgeFlags::LEVEL_LOW
            }
        }
    }

    /// Wait until the level a level trigger fired on goes away
    ///
    /// Returns at once for edge triggers.
    pub async fn wait_release(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::LevelHigh => self.pin.wait_for_low().await,
            Trigger::LevelLow => self.pin.wait_for_high().await,
            Trigger::None | Trigger::Change => {}
        }
    }
}
