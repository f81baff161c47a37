//! SPI0 master
//!
//! The clock is `clk_peri / (prescale * (postdiv + 1))` with an even
//! prescale in 2..=254 and postdiv in 0..=255.

use dlnio_hal::spi::{Phase, Polarity};
use dlnio_hal::{SpiBus, SpiConfig};
use embassy_rp::clocks::clk_peri_freq;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Blocking, Spi};

/// Blocking SPI0 master
pub struct Rp2040Spi {
    bus: Spi<'static, SPI0, Blocking>,
}

impl Rp2040Spi {
    pub fn new(bus: Spi<'static, SPI0, Blocking>) -> Self {
        Self { bus }
    }
}

/// Rate the divider settles on for a request of `freq`
///
/// Picks the same prescale and postdiv pair as the embassy driver.
fn achieved_frequency(clk_peri: u32, freq: u32) -> u32 {
    let ratio = clk_peri.div_ceil(freq * 2).clamp(1, 127 * 256);
    let presc = ratio.div_ceil(256);
    let postdiv = if presc == 1 {
        ratio
    } else {
        ratio.div_ceil(presc)
    };
    clk_peri / (presc * 2 * postdiv)
}

impl SpiBus for Rp2040Spi {
    type Error = spi::Error;

    fn configure(&mut self, config: &SpiConfig) -> u32 {
        let freq = config
            .frequency
            .clamp(self.min_frequency(), self.max_frequency());

        let mut cfg = spi::Config::default();
        cfg.frequency = freq;
        cfg.polarity = match config.polarity {
            Polarity::IdleLow => spi::Polarity::IdleLow,
            Polarity::IdleHigh => spi::Polarity::IdleHigh,
        };
        cfg.phase = match config.phase {
            Phase::CaptureOnFirstTransition => spi::Phase::CaptureOnFirstTransition,
            Phase::CaptureOnSecondTransition => spi::Phase::CaptureOnSecondTransition,
        };
        self.bus.set_config(&cfg);

        achieved_frequency(clk_peri_freq(), freq)
    }

    fn min_frequency(&self) -> u32 {
        clk_peri_freq().div_ceil(254 * 256)
    }

    fn max_frequency(&self) -> u32 {
        clk_peri_freq() / 2
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.bus.blocking_transfer(read, write)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.bus.blocking_write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.blocking_read(buf)
    }
}
