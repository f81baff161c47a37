//! SPI module
//!
//! One master port with a single software-driven chip select. The chip
//! select pin is claimed separately through `SS_MULTI_ENABLE`.

use dlnio_hal::spi::Mode;
use dlnio_hal::{GpioBank, PinFunction, SpiBus, SpiConfig};
use dlnio_protocol::commands::spi;
use dlnio_protocol::header::{read_u16, read_u32, write_u16, write_u32};
use dlnio_protocol::{Module, ResultCode};
use embedded_hal::delay::DelayNs;

use crate::pins::PinMux;

/// Frequency restored by `GET_SS_COUNT`
pub const DEFAULT_FREQUENCY: u32 = 1_000_000;

/// Smallest and largest frame size reported to the host
const FRAME_SIZES: core::ops::RangeInclusive<u8> = 4..=16;

/// Bytes in the supported frame sizes list
const FRAME_SIZE_SLOTS: usize = 36;

/// Pin assignment of the SPI port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiPins {
    pub sck: u8,
    pub mosi: u8,
    pub miso: u8,
    pub cs: u8,
}

/// SPI command handler
pub struct SpiModule<S, D> {
    bus: S,
    delay: D,
    pins: SpiPins,
    config: SpiConfig,
}

impl<S: SpiBus, D: DelayNs> SpiModule<S, D> {
    pub fn new(bus: S, delay: D, pins: SpiPins) -> Self {
        Self {
            bus,
            delay,
            pins,
            config: SpiConfig::default(),
        }
    }

    /// Handle one SPI command
    pub fn handle<G: GpioBank>(
        &mut self,
        id: u16,
        request: &[u8],
        response: &mut [u8],
        mux: &mut PinMux<'_, G>,
    ) -> Result<usize, ResultCode> {
        match id {
            spi::ENABLE => {
                expect_len(request, 1)?;
                check_port(request)?;
                self.enable(mux)
            }
            spi::DISABLE => {
                // port, wait for completion
                expect_len(request, 2)?;
                check_port(request)?;
                let SpiPins { sck, mosi, miso, .. } = self.pins;
                mux.release_all(&[sck, mosi, miso], Module::Spi)?;
                Ok(0)
            }
            spi::SET_MODE => {
                expect_len(request, 2)?;
                check_port(request)?;
                let mode = Mode::from_bits(request[1]).ok_or(ResultCode::InvalidMode)?;
                self.config.set_mode(mode);
                Ok(0)
            }
            spi::SET_FRAME_SIZE => {
                expect_len(request, 2)?;
                check_port(request)?;
                self.config.frame_size = request[1];
                Ok(0)
            }
            spi::SET_FREQUENCY => {
                expect_len(request, 5)?;
                check_port(request)?;
                let wanted = read_u32(request, 1)
                    .clamp(self.bus.min_frequency(), self.bus.max_frequency());
                self.config.frequency = wanted;
                let actual = self.bus.configure(&self.config);
                self.config.frequency = actual;
                write_u32(response, 0, actual);
                Ok(4)
            }
            spi::READ_WRITE => self.read_write(request, response, mux),
            spi::READ => self.read(request, response, mux),
            spi::WRITE => self.write(request, mux),
            spi::SET_SS => {
                expect_len(request, 2)?;
                check_port(request)?;
                // Only SS0 exists, every other bit must be deselected
                if request[1] & 0xfe != 0xfe {
                    return Err(ResultCode::SpiMasterInvalidSsValue);
                }
                Ok(0)
            }
            spi::SS_MULTI_ENABLE => {
                self.check_ss_mask(request)?;
                let cs = self.pins.cs;
                mux.registry.request(cs as u16, Module::Spi)?;
                mux.gpio.make_output(cs, true);
                Ok(0)
            }
            spi::SS_MULTI_DISABLE => {
                self.check_ss_mask(request)?;
                mux.release_all(&[self.pins.cs], Module::Spi)?;
                Ok(0)
            }
            spi::GET_SUPPORTED_FRAME_SIZES => {
                expect_len(request, 1)?;
                check_port(request)?;
                let list = &mut response[..1 + FRAME_SIZE_SLOTS];
                list.fill(0);
                let mut count = 0;
                for (slot, size) in list[1..].iter_mut().zip(FRAME_SIZES) {
                    *slot = size;
                    count += 1;
                }
                list[0] = count;
                Ok(1 + FRAME_SIZE_SLOTS)
            }
            spi::GET_SS_COUNT => {
                expect_len(request, 1)?;
                check_port(request)?;
                // The host asks this first when binding, so reset to defaults
                self.config.frequency = DEFAULT_FREQUENCY;
                self.config.frame_size = 8;
                write_u16(response, 0, 1);
                Ok(2)
            }
            spi::GET_MIN_FREQUENCY => {
                expect_len(request, 1)?;
                check_port(request)?;
                write_u32(response, 0, self.bus.min_frequency());
                Ok(4)
            }
            spi::GET_MAX_FREQUENCY => {
                expect_len(request, 1)?;
                check_port(request)?;
                write_u32(response, 0, self.bus.max_frequency());
                Ok(4)
            }
            _ => {
                debug!("SPI command not supported: {=u16:#x}", id);
                Err(ResultCode::COMMAND_NOT_SUPPORTED)
            }
        }
    }

    fn enable<G: GpioBank>(&mut self, mux: &mut PinMux<'_, G>) -> Result<usize, ResultCode> {
        let SpiPins { sck, mosi, miso, .. } = self.pins;
        mux.request_all(&[sck, mosi, miso], Module::Spi)?;

        let actual = self.bus.configure(&self.config);
        self.config.frequency = actual;
        mux.connect(&[sck, mosi, miso], PinFunction::Spi);

        debug!("SPI enabled at {=u32} Hz", actual);
        Ok(0)
    }

    fn check_ss_mask(&self, request: &[u8]) -> Result<(), ResultCode> {
        expect_len(request, 2)?;
        check_port(request)?;
        if request[1] != 0x01 {
            return Err(ResultCode::SpiMasterInvalidSsValue);
        }
        Ok(())
    }

    /// Settle time around chip select edges: half a clock, at least 1 us
    fn cs_delay_us(&self) -> u32 {
        self.config.frequency.div_ceil(2_000_000)
    }

    fn select<G: GpioBank>(&mut self, gpio: &mut G, active: bool) {
        let us = self.cs_delay_us();
        if !active {
            self.delay.delay_us(us);
        }
        gpio.set_output_level(self.pins.cs, !active);
        if active {
            self.delay.delay_us(us);
        }
    }

    /// Run `op` with chip select asserted
    fn framed<G: GpioBank>(
        &mut self,
        gpio: &mut G,
        attr: u8,
        op: impl FnOnce(&mut S) -> Result<(), S::Error>,
    ) -> Result<(), ResultCode> {
        self.select(gpio, true);
        let result = op(&mut self.bus);
        if attr & spi::ATTR_LEAVE_SS_LOW == 0 {
            self.select(gpio, false);
        }
        result.map_err(|_| ResultCode::Fail)
    }

    /// `port, size:u16, attr, buf[size]`
    fn read_write<G: GpioBank>(
        &mut self,
        request: &[u8],
        response: &mut [u8],
        mux: &mut PinMux<'_, G>,
    ) -> Result<usize, ResultCode> {
        let (size, attr, data) = transfer_args(request)?;
        let rx = response
            .get_mut(2..2 + size)
            .ok_or(ResultCode::BadParameter)?;

        self.framed(mux.gpio, attr, |bus| bus.transfer(rx, data))?;
        write_u16(response, 0, size as u16);
        Ok(2 + size)
    }

    /// `port, size:u16, attr`
    fn read<G: GpioBank>(
        &mut self,
        request: &[u8],
        response: &mut [u8],
        mux: &mut PinMux<'_, G>,
    ) -> Result<usize, ResultCode> {
        expect_len(request, 4)?;
        check_port(request)?;
        let size = read_u16(request, 1) as usize;
        let attr = request[3];
        if size > spi::MAX_XFER_SIZE {
            return Err(ResultCode::BadParameter);
        }
        let rx = response
            .get_mut(2..2 + size)
            .ok_or(ResultCode::BadParameter)?;

        self.framed(mux.gpio, attr, |bus| bus.read(rx))?;
        write_u16(response, 0, size as u16);
        Ok(2 + size)
    }

    /// `port, size:u16, attr, buf[size]`
    fn write<G: GpioBank>(
        &mut self,
        request: &[u8],
        mux: &mut PinMux<'_, G>,
    ) -> Result<usize, ResultCode> {
        let (_, attr, data) = transfer_args(request)?;
        self.framed(mux.gpio, attr, |bus| bus.write(data))?;
        Ok(0)
    }

    /// Current bus settings
    pub fn config(&self) -> &SpiConfig {
        &self.config
    }
}

fn expect_len(request: &[u8], len: usize) -> Result<(), ResultCode> {
    if request.len() == len {
        Ok(())
    } else {
        Err(ResultCode::InvalidCommandSize)
    }
}

fn check_port(request: &[u8]) -> Result<(), ResultCode> {
    match request.first() {
        Some(0) => Ok(()),
        _ => Err(ResultCode::InvalidPortNumber),
    }
}

/// Validate a transfer carrying data and split it up
fn transfer_args(request: &[u8]) -> Result<(usize, u8, &[u8]), ResultCode> {
    if request.len() < 4 {
        return Err(ResultCode::InvalidCommandSize);
    }
    check_port(request)?;
    let size = read_u16(request, 1) as usize;
    if size > spi::MAX_XFER_SIZE {
        return Err(ResultCode::BadParameter);
    }
    let data = &request[4..];
    if data.len() != size {
        return Err(ResultCode::InvalidBufferSize);
    }
    Ok((size, request[3], data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::PinRegistry;
    use crate::testing::{MockDelay, MockGpio, MockSpi};
    use dlnio_hal::spi::{Phase, Polarity};

    const PINS: SpiPins = SpiPins {
        sck: 18,
        mosi: 19,
        miso: 16,
        cs: 17,
    };

    struct Fixture {
        module: SpiModule<MockSpi, MockDelay>,
        registry: PinRegistry,
        bank: MockGpio,
        response: [u8; 256],
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                module: SpiModule::new(MockSpi::new(), MockDelay::default(), PINS),
                registry: PinRegistry::new(),
                bank: MockGpio::new(),
                response: [0; 256],
            }
        }

        fn call(&mut self, id: u16, request: &[u8]) -> Result<usize, ResultCode> {
            let mut mux = PinMux::new(&mut self.registry, &mut self.bank);
            self.module.handle(id, request, &mut self.response, &mut mux)
        }

        fn enabled() -> Self {
            let mut f = Self::new();
            f.call(spi::ENABLE, &[0]).unwrap();
            f.call(spi::SS_MULTI_ENABLE, &[0, 1]).unwrap();
            f
        }
    }

    fn transfer(size: u16, attr: u8, data: &[u8]) -> heapless::Vec<u8, 300> {
        let mut req = heapless::Vec::new();
        req.push(0).unwrap();
        req.extend_from_slice(&size.to_le_bytes()).unwrap();
        req.push(attr).unwrap();
        req.extend_from_slice(data).unwrap();
        req
    }

    #[test]
    fn test_enable_claims_bus_pins() {
        let mut f = Fixture::new();
        assert_eq!(f.call(spi::ENABLE, &[0]), Ok(0));
        for pin in [18, 19, 16] {
            assert!(f.registry.is_owned_by(pin, Module::Spi));
            assert_eq!(f.bank.function[pin as usize], PinFunction::Spi);
        }
        // Chip select is claimed on its own
        assert!(!f.registry.is_owned_by(17, Module::Spi));

        assert_eq!(f.call(spi::DISABLE, &[0, 0]), Ok(0));
        assert!(!f.registry.is_owned_by(18, Module::Spi));
        assert_eq!(f.bank.function[16], PinFunction::Null);
    }

    #[test]
    fn test_enable_rolls_back() {
        let mut f = Fixture::new();
        f.registry.request(16, Module::Gpio).unwrap();
        assert_eq!(f.call(spi::ENABLE, &[0]), Err(ResultCode::PinInUse));
        assert!(!f.registry.is_owned_by(18, Module::Spi));
        assert!(!f.registry.is_owned_by(19, Module::Spi));
    }

    #[test]
    fn test_port_and_size_checks() {
        let mut f = Fixture::new();
        assert_eq!(f.call(spi::ENABLE, &[1]), Err(ResultCode::InvalidPortNumber));
        assert_eq!(f.call(spi::ENABLE, &[0, 0]), Err(ResultCode::InvalidCommandSize));
        assert_eq!(f.call(spi::DISABLE, &[0]), Err(ResultCode::InvalidCommandSize));
        assert_eq!(f.call(spi::SET_MODE, &[0, 4]), Err(ResultCode::InvalidMode));
    }

    #[test]
    fn test_mode_and_frame_size() {
        let mut f = Fixture::new();
        f.call(spi::SET_MODE, &[0, spi::CPOL | spi::CPHA]).unwrap();
        f.call(spi::SET_FRAME_SIZE, &[0, 12]).unwrap();
        assert_eq!(f.module.config().polarity, Polarity::IdleHigh);
        assert_eq!(f.module.config().phase, Phase::CaptureOnSecondTransition);
        assert_eq!(f.module.config().frame_size, 12);

        f.call(spi::GET_SS_COUNT, &[0]).unwrap();
        assert_eq!(&f.response[..2], &[1, 0]);
        assert_eq!(f.module.config().frame_size, 8);
        assert_eq!(f.module.config().frequency, DEFAULT_FREQUENCY);
    }

    #[test]
    fn test_frequency_is_clamped() {
        let mut f = Fixture::new();
        assert_eq!(f.call(spi::SET_FREQUENCY, &[0, 1, 0, 0, 0]), Ok(4));
        let low = read_u32(&f.response, 0);
        assert!(low >= MockSpi::MIN);

        let mut req = [0u8; 5];
        req[1..].copy_from_slice(&u32::MAX.to_le_bytes());
        f.call(spi::SET_FREQUENCY, &req).unwrap();
        assert!(read_u32(&f.response, 0) <= MockSpi::MAX);

        f.call(spi::GET_MIN_FREQUENCY, &[0]).unwrap();
        assert_eq!(read_u32(&f.response, 0), MockSpi::MIN);
        f.call(spi::GET_MAX_FREQUENCY, &[0]).unwrap();
        assert_eq!(read_u32(&f.response, 0), MockSpi::MAX);
    }

    #[test]
    fn test_read_write_loopback() {
        let mut f = Fixture::enabled();
        let req = transfer(3, 0, &[1, 2, 3]);

        assert_eq!(f.call(spi::READ_WRITE, &req), Ok(5));
        assert_eq!(&f.response[..5], &[3, 0, 1, 2, 3]);
        // Released after the transfer
        assert!(f.bank.output[17]);
        // 1 MHz gives a 1 us settle on each edge
        assert_eq!(f.module.delay.total_ns, 2_000);
    }

    #[test]
    fn test_leave_ss_low() {
        let mut f = Fixture::enabled();
        let req = transfer(2, spi::ATTR_LEAVE_SS_LOW, &[9, 9]);
        f.call(spi::WRITE, &req).unwrap();
        assert!(!f.bank.output[17]);
        assert_eq!(&f.module.bus.written[..], &[9, 9]);
    }

    #[test]
    fn test_read_zeros() {
        let mut f = Fixture::enabled();
        f.response.fill(0xee);
        assert_eq!(f.call(spi::READ, &[0, 4, 0, 0]), Ok(6));
        assert_eq!(&f.response[..6], &[4, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_transfer_validation() {
        let mut f = Fixture::enabled();
        assert_eq!(
            f.call(spi::WRITE, &transfer(3, 0, &[1, 2])),
            Err(ResultCode::InvalidBufferSize)
        );
        assert_eq!(
            f.call(spi::WRITE, &transfer(300, 0, &[])),
            Err(ResultCode::BadParameter)
        );
        // 256 bytes plus the length prefix overflow the response
        assert_eq!(
            f.call(spi::READ, &[0, 0, 1, 0]),
            Err(ResultCode::BadParameter)
        );
        assert_eq!(f.call(spi::READ, &[0, 254, 0, 0]), Ok(256));
        assert_eq!(
            f.call(spi::READ, &[1, 4, 0, 0]),
            Err(ResultCode::InvalidPortNumber)
        );
        assert_eq!(f.call(spi::WRITE, &[0, 0]), Err(ResultCode::InvalidCommandSize));
    }

    #[test]
    fn test_chip_select_masks() {
        let mut f = Fixture::new();
        assert_eq!(f.call(spi::SET_SS, &[0, 0xfe]), Ok(0));
        assert_eq!(f.call(spi::SET_SS, &[0, 0xff]), Ok(0));
        assert_eq!(
            f.call(spi::SET_SS, &[0, 0x0e]),
            Err(ResultCode::SpiMasterInvalidSsValue)
        );
        assert_eq!(
            f.call(spi::SS_MULTI_ENABLE, &[0, 2]),
            Err(ResultCode::SpiMasterInvalidSsValue)
        );

        f.call(spi::SS_MULTI_ENABLE, &[0, 1]).unwrap();
        assert!(f.registry.is_owned_by(17, Module::Spi));
        assert!(f.bank.output_enable[17]);
        assert!(f.bank.output[17]);

        f.call(spi::SS_MULTI_DISABLE, &[0, 1]).unwrap();
        assert!(!f.registry.is_owned_by(17, Module::Spi));
        assert_eq!(f.bank.function[17], PinFunction::Null);
    }

    #[test]
    fn test_frame_sizes() {
        let mut f = Fixture::new();
        assert_eq!(f.call(spi::GET_SUPPORTED_FRAME_SIZES, &[0]), Ok(37));
        assert_eq!(f.response[0], 13);
        assert_eq!(f.response[1], 4);
        assert_eq!(f.response[13], 16);
        assert_eq!(&f.response[14..37], &[0; 23]);
    }
}
