//! Build script for dlnio-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Data bytes in one flash sector of the EEPROM store
const EEPROM_PAGE_SIZE: i64 = 4096 - 32;

fn main() {
    setup_linker();
    validate_board();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Panic with a boxed error report
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|e| format!("║  • {:<62} ║", e.chars().take(62).collect::<String>()))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Validate board.toml at compile time
///
/// The firmware parses the same file at boot with a much smaller parser,
/// so this also rejects TOML the boot parser does not understand.
fn validate_board() {
    println!("cargo:rerun-if-changed=board.toml");

    let path = Path::new("board.toml");
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read board.toml", &[e.to_string()]),
    };

    let board: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in board.toml",
            &e.to_string().lines().map(String::from).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    validate_usb(&board, &mut errors);
    validate_pins(&board, &mut errors);
    validate_eeproms(&board, &mut errors);
    check_single_line_arrays(&content, &mut errors);

    if !errors.is_empty() {
        fail("Invalid board.toml", &errors);
    }

    println!("cargo:warning=board.toml validated successfully");
}

fn int_in(table: &toml::Value, key: &str, range: std::ops::RangeInclusive<i64>) -> Result<(), String> {
    match table.get(key) {
        None => Ok(()),
        Some(toml::Value::Integer(v)) if range.contains(v) => Ok(()),
        Some(_) => Err(format!(
            "'{}' must be an integer in {}..={}",
            key,
            range.start(),
            range.end()
        )),
    }
}

fn validate_usb(board: &toml::Value, errors: &mut Vec<String>) {
    let Some(usb) = board.get("usb") else {
        return;
    };
    for key in ["vid", "pid"] {
        if let Err(e) = int_in(usb, key, 0..=0xffff) {
            errors.push(format!("[usb] {}", e));
        }
    }
    for key in ["manufacturer", "product"] {
        match usb.get(key) {
            None => {}
            Some(toml::Value::String(s)) if s.len() <= 32 => {}
            Some(_) => errors.push(format!("[usb] '{}' must be a string of up to 32 bytes", key)),
        }
    }
}

fn validate_pins(board: &toml::Value, errors: &mut Vec<String>) {
    if let Some(gpio) = board.get("gpio") {
        if let Err(e) = int_in(gpio, "led", 0..=29) {
            errors.push(format!("[gpio] {}", e));
        }
        match gpio.get("reserved") {
            None => {}
            Some(toml::Value::Array(pins)) if pins.len() <= 8 => {
                if pins
                    .iter()
                    .any(|p| !matches!(p, toml::Value::Integer(n) if (0..32).contains(n)))
                {
                    errors.push("[gpio] 'reserved' entries must be pins 0..=31".into());
                }
            }
            Some(_) => errors.push("[gpio] 'reserved' must be an array of up to 8 pins".into()),
        }
    }

    // Pins must reach I2C0 and SPI0
    if let Some(i2c) = board.get("i2c") {
        for (key, parity) in [("sda", 0), ("scl", 1)] {
            if let Some(toml::Value::Integer(pin)) = i2c.get(key) {
                if !(0..30).contains(pin) || (pin / 2) % 2 != 0 || pin % 2 != parity {
                    errors.push(format!("[i2c] {} = {} is not an I2C0 {} pin", key, pin, key));
                }
            }
        }
        if let Err(e) = int_in(i2c, "frequency", 1..=1_000_000) {
            errors.push(format!("[i2c] {}", e));
        }
    }
    if let Some(spi) = board.get("spi") {
        for (key, signal) in [("miso", 0), ("sck", 2), ("mosi", 3)] {
            if let Some(toml::Value::Integer(pin)) = spi.get(key) {
                let spi0 = (0..8).contains(pin) || (16..24).contains(pin);
                if !spi0 || pin % 4 != signal {
                    errors.push(format!("[spi] {} = {} is not an SPI0 {} pin", key, pin, key));
                }
            }
        }
        if let Err(e) = int_in(spi, "cs", 0..=29) {
            errors.push(format!("[spi] {}", e));
        }
    }
}

fn validate_eeproms(board: &toml::Value, errors: &mut Vec<String>) {
    let eeproms = match board.get("eeprom") {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push("[eeprom.*] entries must be tables".into());
            return;
        }
        None => return,
    };
    if eeproms.len() > 4 {
        errors.push("At most 4 [eeprom.*] devices are supported".into());
    }

    for (name, eeprom) in eeproms {
        if let Err(e) = int_in(eeprom, "address", 0..=0x7f) {
            errors.push(format!("[eeprom.{}] {}", name, e));
        }
        if let Err(e) = int_in(eeprom, "address_width", 1..=2) {
            errors.push(format!("[eeprom.{}] {}", name, e));
        }
        let width = eeprom
            .get("address_width")
            .and_then(|w| w.as_integer())
            .unwrap_or(1)
            .clamp(1, 2);
        if let Err(e) = int_in(eeprom, "size", 1..=(1 << (8 * width)).min(EEPROM_PAGE_SIZE)) {
            errors.push(format!("[eeprom.{}] {}", name, e));
        }
        match eeprom.get("initial") {
            None => {}
            Some(toml::Value::String(s)) if s.len() <= 32 => {}
            Some(toml::Value::Array(bytes)) if bytes.len() <= 32 => {
                if bytes
                    .iter()
                    .any(|b| !matches!(b, toml::Value::Integer(n) if (0..=0xff).contains(n)))
                {
                    errors.push(format!("[eeprom.{}] 'initial' must hold bytes", name));
                }
            }
            Some(_) => errors.push(format!(
                "[eeprom.{}] 'initial' must be a string or byte array of up to 32 bytes",
                name
            )),
        }
    }
}

/// The boot parser reads one `key = value` per line
fn check_single_line_arrays(content: &str, errors: &mut Vec<String>) {
    for (n, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("");
        if line.contains('[') && !line.trim_start().starts_with('[') && !line.contains(']') {
            errors.push(format!("line {}: arrays must fit on one line", n + 1));
        }
    }
}
