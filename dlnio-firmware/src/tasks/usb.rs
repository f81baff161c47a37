//! USB device task

use defmt::*;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::UsbDevice;

/// The RP2040 USB driver
pub type UsbDriver = Driver<'static, USB>;

/// Bulk OUT endpoint of the vendor interface
pub type BulkOut = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointOut;

/// Bulk IN endpoint of the vendor interface
pub type BulkIn = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointIn;

/// Runs the USB stack: enumeration, control requests, suspend
#[embassy_executor::task]
pub async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB task started");
    usb.run().await
}
