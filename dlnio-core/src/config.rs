//! Board configuration
//!
//! The firmware embeds `board.toml` and parses it at boot with the small
//! line-oriented reader below. Only the subset the board file uses is
//! understood:
//!
//! - `[section]` and `[section.name]` headers
//! - `key = value` with integers (decimal or `0x` hex), quoted strings,
//!   booleans and integer arrays
//! - `#` comments
//!
//! Unknown keys are ignored.

use heapless::{String as HString, Vec};

use crate::eeprom::{EepromConfig, MAX_INITIAL};
use crate::store::PAGE_SIZE;
use crate::modules::i2c::{I2cPins, MAX_DEVICES};
use crate::modules::spi::SpiPins;

/// Longest USB string descriptor kept
pub const MAX_USB_STRING: usize = 32;

/// Most pins a board can withdraw
pub const MAX_RESERVED: usize = 8;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value of the wrong type or out of range
    InvalidValue,
    /// Too many items for a fixed-capacity list
    TooManyItems,
}

/// USB identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbConfig {
    pub vid: u16,
    pub pid: u16,
    pub manufacturer: HString<MAX_USB_STRING>,
    pub product: HString<MAX_USB_STRING>,
}

/// Everything that differs between boards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub usb: UsbConfig,
    /// Pins wired to board functions, never handed to the host
    pub reserved: Vec<u8, MAX_RESERVED>,
    /// On-board LED, kept as an output
    pub led: Option<u8>,
    pub i2c: I2cPins,
    /// I2C clock in Hz
    pub i2c_frequency: u32,
    pub spi: SpiPins,
    /// Emulated EEPROMs on the I2C bus
    pub eeproms: Vec<EepromConfig, MAX_DEVICES>,
}

impl Default for BoardConfig {
    /// Raspberry Pi Pico, matching the shipped `board.toml`
    fn default() -> Self {
        let mut reserved = Vec::new();
        let _ = reserved.extend_from_slice(&[23, 24, 29]);
        let mut eeproms = Vec::new();
        let _ = eeproms.push(EepromConfig::at24c32());

        Self {
            usb: UsbConfig {
                vid: 0x1d50,
                pid: 0x6170,
                manufacturer: str_field("Raspberry Pi"),
                product: str_field("Pico USB I/O Board"),
            },
            reserved,
            led: Some(25),
            i2c: I2cPins { sda: 4, scl: 5 },
            i2c_frequency: 100_000,
            spi: SpiPins {
                sck: 18,
                mosi: 19,
                miso: 16,
                cs: 17,
            },
            eeproms,
        }
    }
}

fn str_field(s: &str) -> HString<MAX_USB_STRING> {
    let mut out = HString::new();
    let _ = out.push_str(s);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Usb,
    Gpio,
    I2c,
    Spi,
    Eeprom,
}

/// Parse a board description
///
/// Sections that are absent keep their [`BoardConfig::default`] values,
/// except the EEPROM list which holds exactly the `[eeprom.*]` sections
/// present.
pub fn parse_config(input: &str) -> Result<BoardConfig, ParseError> {
    let mut config = BoardConfig::default();
    config.eeproms.clear();
    let mut section = Section::Root;
    let mut eeprom: Option<EepromConfig> = None;

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            save_eeprom(&mut config, &mut eeprom)?;
            section = parse_section_header(&line[1..line.len() - 1])?;
            if section == Section::Eeprom {
                eeprom = Some(EepromConfig {
                    address: 0x50,
                    size: 256,
                    address_width: 1,
                    read_only: false,
                    initial: Vec::new(),
                });
            }
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config, eeprom.as_mut())?;
        }
    }

    save_eeprom(&mut config, &mut eeprom)?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    let header = header.trim();
    let (kind, name) = match header.split_once('.') {
        Some((kind, name)) => (kind, Some(name)),
        None => (header, None),
    };

    match (kind, name) {
        ("usb", None) => Ok(Section::Usb),
        ("gpio", None) => Ok(Section::Gpio),
        ("i2c", None) => Ok(Section::I2c),
        ("spi", None) => Ok(Section::Spi),
        ("eeprom", Some(name)) if !name.is_empty() => Ok(Section::Eeprom),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut BoardConfig,
    eeprom: Option<&mut EepromConfig>,
) -> Result<(), ParseError> {
    match section {
        Section::Usb => match key {
            "vid" => config.usb.vid = parse_int(value)?,
            "pid" => config.usb.pid = parse_int(value)?,
            "manufacturer" => config.usb.manufacturer = parse_hstring(value)?,
            "product" => config.usb.product = parse_hstring(value)?,
            _ => {}
        },
        Section::Gpio => match key {
            "led" => config.led = Some(parse_int(value)?),
            "reserved" => config.reserved = parse_int_array(value)?,
            _ => {}
        },
        Section::I2c => match key {
            "sda" => config.i2c.sda = parse_int(value)?,
            "scl" => config.i2c.scl = parse_int(value)?,
            "frequency" => config.i2c_frequency = parse_int(value)?,
            _ => {}
        },
        Section::Spi => match key {
            "sck" => config.spi.sck = parse_int(value)?,
            "mosi" => config.spi.mosi = parse_int(value)?,
            "miso" => config.spi.miso = parse_int(value)?,
            "cs" => config.spi.cs = parse_int(value)?,
            _ => {}
        },
        Section::Eeprom => {
            let e = eeprom.ok_or(ParseError::InvalidSection)?;
            match key {
                "address" => e.address = parse_int(value)?,
                "size" => e.size = parse_int(value)?,
                "address_width" => e.address_width = parse_int(value)?,
                "read_only" => e.read_only = parse_bool(value)?,
                "initial" => e.initial = parse_image(value)?,
                _ => {}
            }
        }
        Section::Root => {}
    }
    Ok(())
}

fn save_eeprom(
    config: &mut BoardConfig,
    eeprom: &mut Option<EepromConfig>,
) -> Result<(), ParseError> {
    let Some(e) = eeprom.take() else {
        return Ok(());
    };
    let max_size = (1usize << (8 * e.address_width as u32).min(16)).min(PAGE_SIZE);
    if e.address >= 0x80 || !(1..=2).contains(&e.address_width) || e.size > max_size {
        return Err(ParseError::InvalidValue);
    }
    config
        .eeproms
        .push(e)
        .map_err(|_| ParseError::TooManyItems)
}

/// Split `key = value`, dropping a trailing comment
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let mut value = value.trim();

    // Cut at the first '#' outside a string
    let mut in_string = false;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => {
                value = value[..i].trim();
                break;
            }
            _ => {}
        }
    }

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn parse_string(value: &str) -> Result<&str, ParseError> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ParseError::InvalidValue)
}

fn parse_hstring<const N: usize>(value: &str) -> Result<HString<N>, ParseError> {
    HString::try_from(parse_string(value)?).map_err(|_| ParseError::InvalidValue)
}

/// Parse a decimal or `0x` hex integer that fits `T`
///
/// Digits may be grouped with `_`.
fn parse_int<T: TryFrom<u32>>(value: &str) -> Result<T, ParseError> {
    let mut digits: HString<16> = HString::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue)?;
    }
    let parsed = match digits.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    parsed
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or(ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse `[a, b, ...]`
fn parse_int_array<T: TryFrom<u32>, const N: usize>(value: &str) -> Result<Vec<T, N>, ParseError> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or(ParseError::InvalidValue)?;

    let mut out = Vec::new();
    for item in inner.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        out.push(parse_int(item)?)
            .map_err(|_| ParseError::TooManyItems)?;
    }
    Ok(out)
}

/// An initial EEPROM image: a byte array or a plain string
fn parse_image(value: &str) -> Result<Vec<u8, MAX_INITIAL>, ParseError> {
    if value.starts_with('[') {
        return parse_int_array(value);
    }
    Vec::from_slice(parse_string(value)?.as_bytes()).map_err(|_| ParseError::TooManyItems)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD_TOML: &str = include_str!("../../dlnio-firmware/board.toml");

    #[test]
    fn test_shipped_board_matches_default() {
        assert_eq!(parse_config(BOARD_TOML), Ok(BoardConfig::default()));
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_int::<u16>("0x1d50"), Ok(0x1d50));
        assert_eq!(parse_int::<u32>("100_000"), Ok(100_000));
        assert_eq!(parse_int::<u8>("300"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int::<u8>("gpio4"), Err(ParseError::InvalidValue));
        assert_eq!(parse_string("\"Pico\""), Ok("Pico"));
        assert_eq!(parse_bool("yes"), Err(ParseError::InvalidValue));
        assert_eq!(
            parse_key_value("product = \"A # B\" # comment"),
            Some(("product", "\"A # B\""))
        );
        assert_eq!(
            parse_key_value("manufacturer = \"#1\""),
            Some(("manufacturer", "\"#1\""))
        );
        assert_eq!(parse_key_value("led = 25 # onboard"), Some(("led", "25")));
        assert_eq!(parse_key_value("led ="), None);
    }

    #[test]
    fn test_parse_arrays() {
        let pins: Vec<u8, 4> = parse_int_array("[1, 0x2, 3]").unwrap();
        assert_eq!(&pins[..], &[1, 2, 3]);
        let empty: Vec<u8, 4> = parse_int_array("[]").unwrap();
        assert!(empty.is_empty());
        assert_eq!(
            parse_int_array::<u8, 2>("[1, 2, 3]"),
            Err(ParseError::TooManyItems)
        );
        assert_eq!(&parse_image("\"AB\"").unwrap()[..], b"AB");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
[gpio]
led = 13

[eeprom.id]
address = 0x52
read_only = true
initial = [1, 2]
"#,
        )
        .unwrap();

        assert_eq!(config.led, Some(13));
        assert_eq!(config.spi, BoardConfig::default().spi);
        assert_eq!(config.eeproms.len(), 1);
        let e = &config.eeproms[0];
        assert_eq!(e.address, 0x52);
        assert_eq!(e.size, 256);
        assert_eq!(e.address_width, 1);
        assert!(e.read_only);
        assert_eq!(&e.initial[..], &[1, 2]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(parse_config("[uart]"), Err(ParseError::InvalidSection));
        assert_eq!(parse_config("[eeprom]"), Err(ParseError::InvalidSection));
        assert_eq!(
            parse_config("[eeprom.big]\nsize = 4096\naddress_width = 1"),
            Err(ParseError::InvalidValue)
        );
        // Two-byte offsets reach further than one store page
        assert_eq!(
            parse_config("[eeprom.big]\nsize = 4065\naddress_width = 2"),
            Err(ParseError::InvalidValue)
        );
        assert!(parse_config("[eeprom.big]\nsize = 4064\naddress_width = 2").is_ok());
        assert_eq!(
            parse_config("[eeprom.x]\naddress = 0x80"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[usb]\nvid = 0x10000"),
            Err(ParseError::InvalidValue)
        );
    }
}
