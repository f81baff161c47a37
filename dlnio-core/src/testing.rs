//! In-memory hardware fakes shared by the unit tests

use dlnio_hal::flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};
use dlnio_hal::{
    AdcReader, GpioBank, I2cBus, I2cConfig, PinFunction, Pull, SpiBus, SpiConfig,
    Trigger,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind as I2cErrorKind, NoAcknowledgeSource};
use embedded_hal::spi::ErrorKind as SpiErrorKind;

use crate::board::Board;
use crate::events::EventTimer;

const PINS: usize = 32;

/// Mock GPIO bank recording every pad setting
pub struct MockGpio {
    pub function: [PinFunction; PINS],
    pub pull: [Pull; PINS],
    pub output_enable: [bool; PINS],
    pub output: [bool; PINS],
    pub input: [bool; PINS],
    pub trigger: [Trigger; PINS],
}

impl MockGpio {
    pub fn new() -> Self {
        Self {
            function: [PinFunction::Null; PINS],
            pull: [Pull::None; PINS],
            output_enable: [false; PINS],
            output: [false; PINS],
            input: [false; PINS],
            trigger: [Trigger::None; PINS],
        }
    }
}

impl GpioBank for MockGpio {
    fn set_function(&mut self, pin: u8, function: PinFunction) {
        self.function[pin as usize] = function;
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) {
        self.pull[pin as usize] = pull;
    }

    fn set_output_enable(&mut self, pin: u8, enable: bool) {
        self.output_enable[pin as usize] = enable;
    }

    fn is_output_enabled(&self, pin: u8) -> bool {
        self.output_enable[pin as usize]
    }

    fn set_output_level(&mut self, pin: u8, high: bool) {
        self.output[pin as usize] = high;
    }

    fn output_level(&self, pin: u8) -> bool {
        self.output[pin as usize]
    }

    fn input_level(&self, pin: u8) -> bool {
        // Outputs read back what they drive
        if self.output_enable[pin as usize] {
            self.output[pin as usize]
        } else {
            self.input[pin as usize]
        }
    }

    fn set_trigger(&mut self, pin: u8, trigger: Trigger) {
        self.trigger[pin as usize] = trigger;
    }
}

/// Mock I2C bus with a single responding target
pub struct MockI2c {
    pub config: Option<I2cConfig>,
    /// Address that acknowledges; everything else NACKs
    pub target: u8,
    /// Fail the data phase of writes to the target
    pub nack_data: bool,
    pub written: heapless::Vec<u8, 512>,
    /// Byte returned for every read
    pub fill: u8,
}

impl MockI2c {
    pub fn new(target: u8) -> Self {
        Self {
            config: None,
            target,
            nack_data: false,
            written: heapless::Vec::new(),
            fill: 0x42,
        }
    }
}

impl I2cBus for MockI2c {
    type Error = I2cErrorKind;

    fn configure(&mut self, config: &I2cConfig) -> Result<(), Self::Error> {
        self.config = Some(*config);
        Ok(())
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        if address != self.target {
            return Err(I2cErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        if self.nack_data {
            return Err(I2cErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }
        self.written.clear();
        let _ = self.written.extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        if address != self.target {
            return Err(I2cErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        buf.fill(self.fill);
        Ok(())
    }
}

/// Mock SPI bus that loops MOSI back to MISO
pub struct MockSpi {
    pub config: SpiConfig,
    pub written: heapless::Vec<u8, 512>,
    pub fail: bool,
}

impl MockSpi {
    pub const MIN: u32 = 1_923;
    pub const MAX: u32 = 62_500_000;

    pub fn new() -> Self {
        Self {
            config: SpiConfig::default(),
            written: heapless::Vec::new(),
            fail: false,
        }
    }

    fn check(&self) -> Result<(), SpiErrorKind> {
        if self.fail {
            Err(SpiErrorKind::Other)
        } else {
            Ok(())
        }
    }
}

impl SpiBus for MockSpi {
    type Error = SpiErrorKind;

    fn configure(&mut self, config: &SpiConfig) -> u32 {
        self.config = *config;
        // Even divider of the peripheral clock
        let divider = (125_000_000 / config.frequency.max(1)).max(2) & !1;
        125_000_000 / divider
    }

    fn min_frequency(&self) -> u32 {
        Self::MIN
    }

    fn max_frequency(&self) -> u32 {
        Self::MAX
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.check()?;
        read.copy_from_slice(write);
        let _ = self.written.extend_from_slice(write);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.check()?;
        let _ = self.written.extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.check()?;
        buf.fill(0);
        Ok(())
    }
}

/// Mock ADC returning fixed raw samples
pub struct MockAdc {
    pub raw: [u16; 4],
}

impl AdcReader for MockAdc {
    type Error = ();

    fn read(&mut self, channel: u8) -> Result<u16, Self::Error> {
        self.raw.get(channel as usize).copied().ok_or(())
    }
}

/// Mock event timer recording its state
#[derive(Default)]
pub struct MockTimer {
    pub period: Option<u16>,
    pub starts: usize,
}

impl EventTimer for MockTimer {
    fn start(&mut self, period_ms: u16) {
        self.period = Some(period_ms);
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.period = None;
    }
}

/// Delay that only accumulates requested time
#[derive(Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

/// RAM-backed NOR flash
///
/// Erased bytes read 0xff and programming can only clear bits.
pub struct MemFlash {
    pub data: std::vec::Vec<u8>,
    pub fail_writes: bool,
    pub erases: usize,
}

impl MemFlash {
    pub fn new(size: usize) -> Self {
        Self {
            data: std::vec![0xff; size],
            fail_writes: false,
            erases: 0,
        }
    }
}

impl ErrorType for MemFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MemFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        bytes.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MemFlash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let (from, to) = (from as usize, to as usize);
        if from % Self::ERASE_SIZE != 0 || to % Self::ERASE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if to > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        self.data[from..to].fill(0xff);
        self.erases += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(NorFlashErrorKind::Other);
        }
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        for (cell, &b) in self.data[start..end].iter_mut().zip(bytes) {
            *cell &= b;
        }
        Ok(())
    }
}

/// Board made of the fakes above
pub struct MockBoard;

impl Board for MockBoard {
    type Gpio = MockGpio;
    type I2c = MockI2c;
    type Spi = MockSpi;
    type Adc = MockAdc;
    type Flash = MemFlash;
    type Delay = MockDelay;
    type Timer = MockTimer;
}
