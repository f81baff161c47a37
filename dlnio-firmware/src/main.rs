//! dlnio - USB I/O adapter firmware
//!
//! Turns a Raspberry Pi Pico into a DLN-2 compatible adapter: the host
//! drives GPIO, I2C, SPI and ADC over one vendor bulk pipe, and a virtual
//! I2C EEPROM keeps its contents in on-chip flash.

#![no_std]
#![no_main]

use core::fmt::Write;

use defmt::*;
use dlnio_core::config::{parse_config, BoardConfig};
use dlnio_core::{Device, Engine};
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_sync::mutex::Mutex;
use embassy_usb::Builder;
use heapless::String;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::board::PicoPeripherals;
use crate::channels::{SharedDevice, SharedEngine};

mod board;
mod channels;
mod tasks;

/// Board description compiled into the firmware
/// Edit board.toml and rebuild to customize
const BOARD_CONFIG: &str = include_str!("../board.toml");

/// USB vendor interface class
const VENDOR_CLASS: u8 = 0xff;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
});

// Static cells for everything the tasks borrow (must live forever)
static CONFIG: StaticCell<BoardConfig> = StaticCell::new();
static SERIAL: StaticCell<String<16>> = StaticCell::new();
static ENGINE: StaticCell<SharedEngine> = StaticCell::new();
static DEVICE: StaticCell<SharedDevice> = StaticCell::new();
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("dlnio firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config: &'static BoardConfig = CONFIG.init(load_config());

    let (parts, watches) = board::init(
        PicoPeripherals {
            i2c0: p.I2C0,
            i2c_sda: p.PIN_4,
            i2c_scl: p.PIN_5,
            spi0: p.SPI0,
            spi_sck: p.PIN_18,
            spi_mosi: p.PIN_19,
            spi_miso: p.PIN_16,
            adc: p.ADC,
            adc_pins: (p.PIN_26, p.PIN_27, p.PIN_28),
            flash: p.FLASH,
        },
        config,
    );
    let serial = SERIAL.init(serial_string(&parts.unique_id));

    let device = DEVICE.init(Mutex::new(Device::new(config, parts)));
    let engine = ENGINE.init(Mutex::new(Engine::new()));
    info!("Device initialized, {} slots", Engine::capacity());

    // USB device with one vendor interface and a bulk endpoint pair
    let driver = Driver::new(p.USB, Irqs);

    let mut usb_config = embassy_usb::Config::new(config.usb.vid, config.usb.pid);
    usb_config.manufacturer = Some(config.usb.manufacturer.as_str());
    usb_config.product = Some(config.usb.product.as_str());
    usb_config.serial_number = Some(serial.as_str());
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );

    let mut function = builder.function(VENDOR_CLASS, 0, 0);
    let mut interface = function.interface();
    let mut alt = interface.alt_setting(VENDOR_CLASS, 0, 0, None);
    let ep_out = alt.endpoint_bulk_out(None, dlnio_core::PACKET_SIZE as u16);
    let ep_in = alt.endpoint_bulk_in(None, dlnio_core::PACKET_SIZE as u16);
    drop(function);

    let usb = builder.build();
    info!(
        "USB {=u16:04x}:{=u16:04x} serial {}",
        config.usb.vid,
        config.usb.pid,
        serial.as_str()
    );

    // Spawn tasks
    spawner.spawn(tasks::usb_task(usb)).unwrap();
    spawner.spawn(tasks::dln2_out_task(ep_out, engine, device)).unwrap();
    spawner.spawn(tasks::dln2_in_task(ep_in, engine)).unwrap();
    spawner.spawn(tasks::gpio_event_task(engine)).unwrap();
    spawner.spawn(tasks::adc_event_task(engine)).unwrap();
    for watch in watches {
        spawner.spawn(tasks::gpio_pin_task(watch)).unwrap();
    }

    info!("All tasks spawned, firmware running");
}

/// Parse the embedded board description
///
/// Falls back to the stock Pico layout if the description is rejected.
fn load_config() -> BoardConfig {
    match parse_config(BOARD_CONFIG) {
        Ok(config) => {
            info!(
                "board.toml loaded: {} EEPROM device(s)",
                config.eeproms.len()
            );
            config
        }
        Err(e) => {
            error!("board.toml rejected ({}), using defaults", e);
            BoardConfig::default()
        }
    }
}

/// USB serial number: the unique id as 16 hex digits
fn serial_string(id: &[u8; 8]) -> String<16> {
    let mut s = String::new();
    for b in id {
        // 8 bytes always fit 16 digits
        let _ = write!(s, "{:02X}", b);
    }
    s
}
