//! Peripheral pin routing
//!
//! Every RP2040 GPIO reaches a fixed signal of each peripheral block. The
//! firmware binds I2C0 and SPI0 once, so a board description may only
//! assign pins that route to those blocks.

/// I2C signal on a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cSignal {
    Sda,
    Scl,
}

/// SPI signal on a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiSignal {
    /// Controller input (RX)
    Miso,
    /// Hardware chip select, unused since chip select is driven by SIO
    Cs,
    Sck,
    /// Controller output (TX)
    Mosi,
}

/// I2C0 signal reached by `pin`
pub fn i2c0_signal(pin: u8) -> Option<I2cSignal> {
    if pin >= super::gpio::GPIO_COUNT || (pin / 2) % 2 != 0 {
        return None;
    }
    Some(if pin % 2 == 0 {
        I2cSignal::Sda
    } else {
        I2cSignal::Scl
    })
}

/// SPI0 signal reached by `pin`
pub fn spi0_signal(pin: u8) -> Option<SpiSignal> {
    // SPI0 sits on GPIO0..7 and GPIO16..23
    if !matches!(pin, 0..=7 | 16..=23) {
        return None;
    }
    Some(match pin % 4 {
        0 => SpiSignal::Miso,
        1 => SpiSignal::Cs,
        2 => SpiSignal::Sck,
        _ => SpiSignal::Mosi,
    })
}

/// ADC channel wired to `pin`
pub fn adc_channel(pin: u8) -> Option<u8> {
    match pin {
        26..=29 => Some(pin - 26),
        _ => None,
    }
}
