//! Raspberry Pi Pico wiring
//!
//! Binds I2C0, SPI0, the ADC and the flash to the `dlnio-hal-rp2040`
//! drivers. The bus blocks are created on fixed pins and those pins are
//! parked straight away; the command handlers route whichever pins the
//! board description names when the host enables a bus.
//!
//! Every host pin that can carry events also gets a [`PinWatch`], which
//! waits on the pin interrupt independently of the bank's muxing.

use defmt::*;
use dlnio_core::config::BoardConfig;
use dlnio_core::modules::gpio::PIN_COUNT;
use dlnio_core::store::REGION_SIZE;
use dlnio_core::{Board, BoardParts};
use dlnio_hal::{BoardId, GpioBank, PinFunction};
use dlnio_hal_rp2040::pins::{i2c0_signal, spi0_signal, I2cSignal, SpiSignal};
use dlnio_hal_rp2040::{
    PinWatch, Rp2040Adc, Rp2040Flash, Rp2040Gpio, Rp2040I2c, Rp2040Spi, FLASH_SIZE,
};
use embassy_rp::adc::{self, Adc, Channel};
use embassy_rp::gpio::{AnyPin, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{ADC, FLASH, I2C0, PIN_16, PIN_18, PIN_19, PIN_26, PIN_27, PIN_28, PIN_4, PIN_5, SPI0};
use embassy_rp::spi::{self, Spi};
use embassy_rp::Peri;

use heapless::Vec;

use crate::channels::{publish_trigger, AdcTimer};

/// Upper bound on pin watchers
pub const MAX_WATCHED: usize = PIN_COUNT as usize;

/// The Pico board
pub struct PicoBoard;

impl Board for PicoBoard {
    type Gpio = Rp2040Gpio;
    type I2c = Rp2040I2c;
    type Spi = Rp2040Spi;
    type Adc = Rp2040Adc;
    type Flash = Rp2040Flash;
    type Delay = embassy_time::Delay;
    type Timer = AdcTimer;
}

/// Peripherals the adapter takes over
pub struct PicoPeripherals {
    pub i2c0: Peri<'static, I2C0>,
    pub i2c_sda: Peri<'static, PIN_4>,
    pub i2c_scl: Peri<'static, PIN_5>,
    pub spi0: Peri<'static, SPI0>,
    pub spi_sck: Peri<'static, PIN_18>,
    pub spi_mosi: Peri<'static, PIN_19>,
    pub spi_miso: Peri<'static, PIN_16>,
    pub adc: Peri<'static, ADC>,
    pub adc_pins: (Peri<'static, PIN_26>, Peri<'static, PIN_27>, Peri<'static, PIN_28>),
    pub flash: Peri<'static, FLASH>,
}

/// Warn about pins the bound peripheral blocks cannot reach
fn check_routing(config: &BoardConfig) {
    let i2c = [(config.i2c.sda, I2cSignal::Sda), (config.i2c.scl, I2cSignal::Scl)];
    for (pin, signal) in i2c {
        if i2c0_signal(pin) != Some(signal) {
            warn!("GPIO{} does not carry I2C0 {}", pin, signal);
        }
    }

    let spi = [
        (config.spi.sck, SpiSignal::Sck),
        (config.spi.mosi, SpiSignal::Mosi),
        (config.spi.miso, SpiSignal::Miso),
    ];
    for (pin, signal) in spi {
        if spi0_signal(pin) != Some(signal) {
            warn!("GPIO{} does not carry SPI0 {}", pin, signal);
        }
    }
}

/// Create a watcher for every host pin that can carry events
///
/// The LED and reserved pins never do.
fn watch_pins(config: &BoardConfig) -> Vec<PinWatch, MAX_WATCHED> {
    let mut watches = Vec::new();
    for pin in 0..PIN_COUNT as u8 {
        if config.led == Some(pin) || config.reserved.contains(&pin) {
            continue;
        }
        // SAFETY: the bus and ADC drivers given some of these pins only
        // program the pads while they are built, which happens after this.
        // A watcher only arms the pin interrupt and reads the input level.
        let pin = unsafe { AnyPin::steal(pin) };
        let _ = watches.push(PinWatch::new(pin));
    }
    watches
}

/// Bring up the drivers and return them with the board unique id and the
/// pin watchers
pub fn init(
    p: PicoPeripherals,
    config: &BoardConfig,
) -> (BoardParts<PicoBoard>, Vec<PinWatch, MAX_WATCHED>) {
    check_routing(config);
    let watches = watch_pins(config);

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = config.i2c_frequency;
    let i2c = I2c::new_blocking(p.i2c0, p.i2c_scl, p.i2c_sda, i2c_config);

    let spi = Spi::new_blocking(p.spi0, p.spi_sck, p.spi_mosi, p.spi_miso, spi::Config::default());

    let adc = Adc::new_blocking(p.adc, adc::Config::default());
    let (a0, a1, a2) = p.adc_pins;
    let channels = [
        Channel::new_pin(a0, Pull::None),
        Channel::new_pin(a1, Pull::None),
        Channel::new_pin(a2, Pull::None),
    ];

    // Host pins stay disconnected until the host enables them
    let mut gpio = Rp2040Gpio::new(publish_trigger);
    let watched = watches.iter().map(PinWatch::number);
    for pin in watched.chain([4, 5, 16, 18, 19, 26, 27, 28]) {
        gpio.set_function(pin, PinFunction::Null);
    }

    let mut flash = Rp2040Flash::new(p.flash);
    let unique_id = flash.unique_id();
    info!("Board id {:02x}", unique_id);

    let parts = BoardParts {
        gpio,
        i2c: Rp2040I2c::new(i2c),
        spi: Rp2040Spi::new(spi),
        adc: Rp2040Adc::new(adc, channels),
        flash,
        flash_base: (FLASH_SIZE - REGION_SIZE) as u32,
        delay: embassy_time::Delay,
        timer: AdcTimer,
        unique_id,
    };
    (parts, watches)
}
