//! Request routing
//!
//! [`Device`] owns every module handler and the peripherals behind them,
//! and routes each request to a handler by its header handle.

use dlnio_hal::board::serial_number;
use dlnio_hal::GpioBank;
use dlnio_protocol::commands::ctrl;
use dlnio_protocol::header::write_u32;
use dlnio_protocol::{Handle, Header, ResultCode};

use crate::board::{Board, BoardParts};
use crate::config::BoardConfig;
use crate::eeprom::At24;
use crate::events::emit_adc_event;
use crate::modules::{AdcModule, GpioModule, I2cModule, SpiModule, VirtualDevice};
use crate::pins::{PinMux, PinRegistry};
use crate::store::FlashStore;
use crate::transport::{Dispatch, EventSink};

/// The adapter as seen by the transport
pub struct Device<B: Board> {
    pins: PinRegistry,
    gpio_bank: B::Gpio,
    gpio: GpioModule,
    i2c: I2cModule<B::I2c, B::Flash>,
    spi: SpiModule<B::Spi, B::Delay>,
    adc: AdcModule<B::Adc, B::Timer>,
    serial: u32,
}

impl<B: Board> Device<B> {
    /// Bring up the handlers on `parts` as described by `config`
    pub fn new(config: &BoardConfig, parts: BoardParts<B>) -> Self {
        let mut pins = PinRegistry::new();
        for &pin in &config.reserved {
            pins.set_unavailable(pin);
        }

        let mut gpio_bank = parts.gpio;
        if let Some(led) = config.led {
            gpio_bank.make_output(led, false);
        }

        let store = FlashStore::new(parts.flash, parts.flash_base);
        let mut i2c = I2cModule::new(parts.i2c, config.i2c, config.i2c_frequency, store);
        for eeprom in &config.eeproms {
            if i2c
                .attach(VirtualDevice::At24(At24::new(eeprom.clone())))
                .is_err()
            {
                warn!("No room for EEPROM at {=u8:#x}", eeprom.address);
            }
        }

        Self {
            pins,
            gpio_bank,
            gpio: GpioModule::new(config.led),
            i2c,
            spi: SpiModule::new(parts.spi, parts.delay, config.spi),
            adc: AdcModule::new(parts.adc, parts.timer),
            serial: serial_number(&parts.unique_id),
        }
    }

    fn ctrl(&mut self, id: u16, request: &[u8], response: &mut [u8]) -> Result<usize, ResultCode> {
        let value = match id {
            ctrl::GET_DEVICE_VER => ctrl::HW_ID,
            ctrl::GET_DEVICE_SN => self.serial,
            _ => return Err(ResultCode::COMMAND_NOT_SUPPORTED),
        };
        if !request.is_empty() {
            return Err(ResultCode::InvalidCommandSize);
        }
        write_u32(response, 0, value);
        Ok(4)
    }
}

impl<B: Board> Dispatch for Device<B> {
    fn dispatch(
        &mut self,
        header: &Header,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, ResultCode> {
        let id = header.id;
        match Handle::from_u16(header.handle) {
            Some(Handle::Ctrl) => self.ctrl(id, request, response),
            Some(Handle::Gpio) => {
                self.gpio
                    .handle(id, request, response, &mut self.pins, &mut self.gpio_bank)
            }
            Some(Handle::I2c) => {
                let mut mux = PinMux::new(&mut self.pins, &mut self.gpio_bank);
                self.i2c.handle(id, request, response, &mut mux)
            }
            Some(Handle::Spi) => {
                let mut mux = PinMux::new(&mut self.pins, &mut self.gpio_bank);
                self.spi.handle(id, request, response, &mut mux)
            }
            Some(Handle::Adc) => {
                self.adc
                    .handle(id, request, response, &mut self.pins, &mut self.gpio_bank)
            }
            Some(Handle::Event) | None => Err(ResultCode::InvalidHandle),
        }
    }

    fn after_response(&mut self, events: &mut EventSink<'_>) {
        if self.adc.take_event_due() && emit_adc_event(events).is_err() {
            warn!("No free slot, ADC event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EdgeOutcome, EdgeRing, PinEdges};
    use crate::store::REGION_SIZE;
    use crate::testing::{
        MemFlash, MockAdc, MockBoard, MockDelay, MockGpio, MockI2c, MockSpi, MockTimer,
    };
    use crate::transport::{Engine, Receive, PACKET_SIZE};
    use dlnio_protocol::commands::{adc, gpio, i2c, Module};
    use dlnio_protocol::header::read_u16;
    use dlnio_hal::{EdgeFlags, Trigger};
    use dlnio_protocol::RESPONSE_HEADER_SIZE;

    fn device() -> Device<MockBoard> {
        let parts = BoardParts::<MockBoard> {
            gpio: MockGpio::new(),
            i2c: MockI2c::new(0x50),
            spi: MockSpi::new(),
            adc: MockAdc { raw: [0; 4] },
            flash: MemFlash::new(REGION_SIZE),
            flash_base: 0,
            delay: MockDelay::default(),
            timer: MockTimer::default(),
            unique_id: [0xe6, 0x61, 0x38, 0x52, 0x83, 0x45, 0x21, 0x2f],
        };
        Device::new(&BoardConfig::default(), parts)
    }

    fn request(id: u16, echo: u16, handle: u16, payload: &[u8]) -> heapless::Vec<u8, PACKET_SIZE> {
        let mut msg = heapless::Vec::new();
        let size = (8 + payload.len()) as u16;
        for field in [size, id, echo, handle] {
            msg.extend_from_slice(&field.to_le_bytes()).unwrap();
        }
        msg.extend_from_slice(payload).unwrap();
        msg
    }

    /// Send one single-packet request and return the response bytes
    fn roundtrip(
        engine: &mut Engine,
        dev: &mut Device<MockBoard>,
        msg: &[u8],
    ) -> heapless::Vec<u8, 300> {
        assert_eq!(engine.receive(msg, dev), Receive::Dispatched);
        let out = heapless::Vec::from_slice(engine.begin_in().unwrap()).unwrap();
        engine.in_complete();
        out
    }

    #[test]
    fn test_get_pin_count() {
        let mut engine = Engine::new();
        let mut dev = device();
        let msg = request(gpio::GET_PIN_COUNT, 0x1234, Handle::Gpio.as_u16(), &[]);

        let out = roundtrip(&mut engine, &mut dev, &msg);
        assert_eq!(
            &out[..],
            &[0x0c, 0x00, 0x01, 0x01, 0x34, 0x12, 0x02, 0x00, 0x00, 0x00, 29, 0]
        );
    }

    #[test]
    fn test_ctrl_commands() {
        let mut engine = Engine::new();
        let mut dev = device();

        let out = roundtrip(
            &mut engine,
            &mut dev,
            &request(ctrl::GET_DEVICE_VER, 1, Handle::Ctrl.as_u16(), &[]),
        );
        assert_eq!(read_u16(&out, 8), 0);
        assert_eq!(&out[RESPONSE_HEADER_SIZE..], &0x200u32.to_le_bytes());

        let out = roundtrip(
            &mut engine,
            &mut dev,
            &request(ctrl::GET_DEVICE_SN, 2, Handle::Ctrl.as_u16(), &[]),
        );
        assert_eq!(&out[RESPONSE_HEADER_SIZE..], &0x8345_212fu32.to_le_bytes());

        let out = roundtrip(
            &mut engine,
            &mut dev,
            &request(ctrl::GET_DEVICE_SN, 3, Handle::Ctrl.as_u16(), &[0]),
        );
        assert_eq!(read_u16(&out, 8), ResultCode::InvalidCommandSize.as_u16());
        assert_eq!(out.len(), RESPONSE_HEADER_SIZE);
    }

    #[test]
    fn test_bad_handles() {
        let mut engine = Engine::new();
        let mut dev = device();
        for handle in [Handle::Event.as_u16(), 9, 0xffff] {
            let out = roundtrip(&mut engine, &mut dev, &request(0x30, 0, handle, &[]));
            assert_eq!(read_u16(&out, 8), ResultCode::InvalidHandle.as_u16());
        }

        // A GPIO id sent to the SPI handle is unknown there
        let out = roundtrip(
            &mut engine,
            &mut dev,
            &request(gpio::GET_PIN_COUNT, 0, Handle::Spi.as_u16(), &[]),
        );
        assert_eq!(read_u16(&out, 8), ResultCode::NotImplemented.as_u16());
    }

    #[test]
    fn test_boot_state() {
        let dev = device();
        assert!(dev.gpio_bank.output_enable[25]);
        assert!(!dev.gpio_bank.output[25]);
        assert!(dev.pins.is_unavailable(23));
        assert!(dev.pins.is_unavailable(24));
        assert!(dev.pins.is_unavailable(29));
        assert!(!dev.pins.is_unavailable(25));
    }

    #[test]
    fn test_modules_share_pins() {
        let mut engine = Engine::new();
        let mut dev = device();

        roundtrip(
            &mut engine,
            &mut dev,
            &request(gpio::PIN_ENABLE, 0, Handle::Gpio.as_u16(), &[4, 0]),
        );
        let out = roundtrip(
            &mut engine,
            &mut dev,
            &request(i2c::ENABLE, 1, Handle::I2c.as_u16(), &[0]),
        );
        assert_eq!(read_u16(&out, 8), ResultCode::PinInUse.as_u16());
        assert!(!dev.pins.is_owned_by(5, Module::I2c));
    }

    #[test]
    fn test_adc_event_follows_response() {
        let mut engine = Engine::new();
        let mut dev = device();
        let cfg = [0, 0, adc::EVENT_NONE, 0, 0, 0, 0, 0, 0];
        let msg = request(adc::CHANNEL_SET_CFG, 7, Handle::Adc.as_u16(), &cfg);

        let out = roundtrip(&mut engine, &mut dev, &msg);
        assert_eq!(read_u16(&out, 8), 0);

        let event = engine.begin_in().unwrap();
        assert_eq!(read_u16(event, 0), 15);
        assert_eq!(read_u16(event, 2), adc::CONDITION_MET_EV);
        assert_eq!(read_u16(event, 4), 0);
        assert_eq!(read_u16(event, 6), Handle::Event.as_u16());
        assert_eq!(&event[8..], &[0; 7]);
    }

    #[test]
    fn test_gpio_edges_become_events() {
        let mut engine = Engine::new();
        let mut dev = device();
        let ring = EdgeRing::new();
        dev.gpio_bank.input[3] = true;

        roundtrip(
            &mut engine,
            &mut dev,
            &request(gpio::PIN_ENABLE, 0, Handle::Gpio.as_u16(), &[3, 0]),
        );
        roundtrip(
            &mut engine,
            &mut dev,
            &request(
                gpio::PIN_SET_EVENT_CFG,
                0,
                Handle::Gpio.as_u16(),
                &[3, 0, gpio::EVENT_CHANGE, 0, 0],
            ),
        );
        assert_eq!(dev.gpio_bank.trigger[3], Trigger::Change);

        // The pin's interrupt side picks the trigger up and sees a fall
        let mut edges = PinEdges::new(3);
        edges.arm(dev.gpio_bank.trigger[3], dev.gpio_bank.input_level(3));
        dev.gpio_bank.input[3] = false;
        assert!(matches!(
            edges.service(EdgeFlags::EDGE_FALL, || false, &ring),
            EdgeOutcome::Queued(_)
        ));
        assert_eq!(ring.drain(|edge| edge.emit(&mut engine).is_ok()), 1);

        let event = engine.begin_in().unwrap();
        assert_eq!(read_u16(event, 2), gpio::CONDITION_MET_EV);
        assert_eq!(&event[8..], &[0, 0, 0, 3, 0, 0]);
    }
}
