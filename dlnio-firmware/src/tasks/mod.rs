//! Embassy async tasks
//!
//! Each task runs independently and communicates via the statics in
//! `channels`.

pub mod adc_event;
pub mod dln2_in;
pub mod dln2_out;
pub mod gpio_event;
pub mod gpio_pin;
pub mod usb;

pub use adc_event::adc_event_task;
pub use dln2_in::dln2_in_task;
pub use dln2_out::dln2_out_task;
pub use gpio_event::gpio_event_task;
pub use gpio_pin::gpio_pin_task;
pub use usb::{usb_task, BulkIn, BulkOut, UsbDriver};
