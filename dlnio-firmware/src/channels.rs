//! Inter-task communication
//!
//! The transport engine and the device are shared behind async mutexes
//! that are only held for synchronous sections. Tasks wake each other
//! through the signals below.

use dlnio_core::events::{EdgeRing, EventTimer};
use dlnio_core::modules::gpio::PIN_COUNT;
use dlnio_core::{Device, Engine};
use dlnio_hal::Trigger;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use crate::board::PicoBoard;

/// Transport engine shared by the USB and event tasks
///
/// Lock order: engine before device.
pub type SharedEngine = Mutex<CriticalSectionRawMutex, Engine>;

/// Command handlers and the peripherals behind them
pub type SharedDevice = Mutex<CriticalSectionRawMutex, Device<PicoBoard>>;

/// GPIO edges waiting for a free slot
pub static EDGE_RING: EdgeRing = EdgeRing::new();

/// An edge was queued, or a slot freed up while edges were waiting
pub static EDGE_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Trigger changes, one signal per pin watcher
pub static PIN_TRIGGERS: [Signal<CriticalSectionRawMutex, Trigger>; PIN_COUNT as usize] =
    [const { Signal::new() }; PIN_COUNT as usize];

/// Hand a trigger change to the pin's watcher
pub fn publish_trigger(pin: u8, trigger: Trigger) {
    if let Some(signal) = PIN_TRIGGERS.get(pin as usize) {
        signal.signal(trigger);
    }
}

/// A response or event was queued for bulk IN
pub static IN_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// An IN completion re-armed the stalled OUT slot
pub static OUT_ARMED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// ADC event period in ms, or `None` to stop
pub static ADC_PERIOD: Signal<CriticalSectionRawMutex, Option<u16>> = Signal::new();

/// Forwards ADC timer requests to the ADC event task
pub struct AdcTimer;

impl EventTimer for AdcTimer {
    fn start(&mut self, period_ms: u16) {
        ADC_PERIOD.signal(Some(period_ms));
    }

    fn stop(&mut self) {
        ADC_PERIOD.signal(None);
    }
}
