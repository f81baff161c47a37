//! Pin ownership registry
//!
//! Every physical pin is owned by at most one protocol module at a time.
//! GPIO, I2C, SPI and ADC handlers request pins here before touching the
//! pad mux and free them when the host releases the function. Pins wired
//! to board functions (power control, sense inputs) are marked
//! unavailable at boot and can never be requested.

use dlnio_hal::{GpioBank, PinFunction};
use dlnio_protocol::{Module, ResultCode};

/// Number of registry entries
pub const PIN_COUNT: usize = 32;

/// Pins that do not exist on the package
const ABSENT_PINS: [u8; 2] = [30, 31];

/// Errors from the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range
    InvalidPin,
    /// Pin owned by another module or unavailable
    InUse,
    /// Pin not owned by the module releasing it
    NotOwned,
}

impl From<PinError> for ResultCode {
    fn from(e: PinError) -> Self {
        match e {
            PinError::InvalidPin => ResultCode::InvalidPinNumber,
            PinError::InUse => ResultCode::PinInUse,
            PinError::NotOwned => ResultCode::PinNotConnectedToModule,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Free,
    Module(Module),
    Unavailable,
}

/// Pin ownership table
#[derive(Debug, Clone)]
pub struct PinRegistry {
    owners: [Owner; PIN_COUNT],
}

impl Default for PinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PinRegistry {
    /// Create a registry with every existing pin free
    pub fn new() -> Self {
        let mut owners = [Owner::Free; PIN_COUNT];
        for pin in ABSENT_PINS {
            owners[pin as usize] = Owner::Unavailable;
        }
        Self { owners }
    }

    /// Permanently withdraw `pin` from use
    pub fn set_unavailable(&mut self, pin: u8) {
        if let Some(owner) = self.owners.get_mut(pin as usize) {
            *owner = Owner::Unavailable;
        }
    }

    /// Claim `pin` for `module`
    ///
    /// Claiming a pin the module already owns succeeds.
    pub fn request(&mut self, pin: u16, module: Module) -> Result<(), PinError> {
        let owner = self
            .owners
            .get_mut(pin as usize)
            .ok_or(PinError::InvalidPin)?;
        match *owner {
            Owner::Free => {
                *owner = Owner::Module(module);
                Ok(())
            }
            Owner::Module(m) if m == module => Ok(()),
            _ => Err(PinError::InUse),
        }
    }

    /// Release `pin` held by `module`
    ///
    /// Releasing a free pin succeeds.
    pub fn free(&mut self, pin: u16, module: Module) -> Result<(), PinError> {
        let owner = self
            .owners
            .get_mut(pin as usize)
            .ok_or(PinError::InvalidPin)?;
        match *owner {
            Owner::Free => Ok(()),
            Owner::Module(m) if m == module => {
                *owner = Owner::Free;
                Ok(())
            }
            _ => Err(PinError::NotOwned),
        }
    }

    /// Check if `module` currently owns `pin`
    pub fn is_owned_by(&self, pin: u16, module: Module) -> bool {
        matches!(self.owners.get(pin as usize), Some(Owner::Module(m)) if *m == module)
    }

    /// Check if `pin` can never be requested
    pub fn is_unavailable(&self, pin: u16) -> bool {
        matches!(self.owners.get(pin as usize), Some(Owner::Unavailable) | None)
    }
}

/// Registry and GPIO bank borrowed together
///
/// Module handlers that mux pins (I2C, SPI, ADC) go through this so the
/// ownership table and the pad function never disagree.
pub struct PinMux<'a, G> {
    pub registry: &'a mut PinRegistry,
    pub gpio: &'a mut G,
}

impl<'a, G: GpioBank> PinMux<'a, G> {
    pub fn new(registry: &'a mut PinRegistry, gpio: &'a mut G) -> Self {
        Self { registry, gpio }
    }

    /// Claim every pin in `pins` for `module`, in order
    ///
    /// On failure the pins claimed so far are released again and the
    /// error of the failing pin is returned.
    pub fn request_all(&mut self, pins: &[u8], module: Module) -> Result<(), PinError> {
        for (i, &pin) in pins.iter().enumerate() {
            if let Err(e) = self.registry.request(pin as u16, module) {
                for &claimed in &pins[..i] {
                    let _ = self.registry.free(claimed as u16, module);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Route every pin in `pins` to `function`
    pub fn connect(&mut self, pins: &[u8], function: PinFunction) {
        for &pin in pins {
            self.gpio.set_function(pin, function);
        }
    }

    /// Release and disconnect every pin in `pins`, stopping at the first
    /// pin `module` does not own
    pub fn release_all(&mut self, pins: &[u8], module: Module) -> Result<(), PinError> {
        for &pin in pins {
            self.registry.free(pin as u16, module)?;
            self.gpio.set_function(pin, PinFunction::Null);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_and_free() {
        let mut pins = PinRegistry::new();

        assert!(pins.request(4, Module::I2c).is_ok());
        assert!(pins.is_owned_by(4, Module::I2c));
        assert_eq!(pins.request(4, Module::Gpio), Err(PinError::InUse));
        // Re-requesting by the owner is fine
        assert!(pins.request(4, Module::I2c).is_ok());

        assert_eq!(pins.free(4, Module::Spi), Err(PinError::NotOwned));
        assert!(pins.free(4, Module::I2c).is_ok());
        assert!(!pins.is_owned_by(4, Module::I2c));
        // Freeing a free pin is fine
        assert!(pins.free(4, Module::I2c).is_ok());
    }

    #[test]
    fn test_out_of_range() {
        let mut pins = PinRegistry::new();
        assert_eq!(pins.request(32, Module::Gpio), Err(PinError::InvalidPin));
        assert_eq!(pins.free(500, Module::Gpio), Err(PinError::InvalidPin));
        assert!(!pins.is_owned_by(32, Module::Gpio));
    }

    #[test]
    fn test_unavailable_pins() {
        let mut pins = PinRegistry::new();
        pins.set_unavailable(23);

        assert_eq!(pins.request(23, Module::Gpio), Err(PinError::InUse));
        assert_eq!(pins.request(30, Module::Gpio), Err(PinError::InUse));
        assert_eq!(pins.request(31, Module::Adc), Err(PinError::InUse));
        assert_eq!(pins.free(23, Module::Gpio), Err(PinError::NotOwned));
        assert!(pins.is_unavailable(31));
        assert!(!pins.is_unavailable(22));
    }

    #[test]
    fn test_result_codes() {
        assert_eq!(ResultCode::from(PinError::InvalidPin), ResultCode::InvalidPinNumber);
        assert_eq!(ResultCode::from(PinError::InUse), ResultCode::PinInUse);
        assert_eq!(
            ResultCode::from(PinError::NotOwned),
            ResultCode::PinNotConnectedToModule
        );
    }
}
