//! Bulk OUT task
//!
//! Feeds every received packet to the transport engine. While the engine
//! has no armed slot the endpoint is not read, so the host sees NAKs
//! until an IN completion frees a slot.

use defmt::*;
use dlnio_core::transport::Receive;
use dlnio_core::PACKET_SIZE;
use embassy_usb::driver::{Endpoint, EndpointError, EndpointOut};

use super::BulkOut;
use crate::channels::{SharedDevice, SharedEngine, IN_READY, OUT_ARMED};

/// Bulk OUT task - reassembles and dispatches requests
#[embassy_executor::task]
pub async fn dln2_out_task(
    mut ep: BulkOut,
    engine: &'static SharedEngine,
    device: &'static SharedDevice,
) {
    info!("Bulk OUT task started");

    let mut buf = [0u8; PACKET_SIZE];
    ep.wait_enabled().await;

    loop {
        if !engine.lock().await.is_out_armed() {
            debug!("OUT stalled, waiting for a free slot");
            OUT_ARMED.wait().await;
            continue;
        }

        let n = match ep.read(&mut buf).await {
            Ok(n) => n,
            Err(EndpointError::Disabled) => {
                debug!("Bulk OUT disabled");
                ep.wait_enabled().await;
                continue;
            }
            Err(EndpointError::BufferOverflow) => {
                warn!("Bulk OUT packet too large");
                continue;
            }
        };

        // A zero-length packet carries nothing to reassemble
        if n == 0 {
            continue;
        }

        let mut engine = engine.lock().await;
        let mut device = device.lock().await;
        match engine.receive(&buf[..n], &mut *device) {
            Receive::Pending => trace!("OUT: {} bytes, message incomplete", n),
            Receive::Dispatched => trace!("OUT: message dispatched"),
            Receive::Rejected(code) => debug!("OUT: message rejected: {}", code),
            Receive::NotArmed => warn!("OUT: packet without a slot dropped"),
        }
        if engine.has_pending() {
            IN_READY.signal(());
        }
    }
}
