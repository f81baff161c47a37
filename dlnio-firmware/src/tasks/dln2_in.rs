//! Bulk IN task
//!
//! Sends queued responses and events one at a time. A message whose size
//! is a multiple of the packet size is closed with a zero-length packet.

use defmt::*;
use dlnio_core::transport::SLOT_BUF_SIZE;
use dlnio_core::PACKET_SIZE;
use embassy_usb::driver::{Endpoint, EndpointError, EndpointIn};

use super::BulkIn;
use crate::channels::{SharedEngine, EDGE_READY, EDGE_RING, IN_READY, OUT_ARMED};

async fn send(ep: &mut BulkIn, msg: &[u8]) -> Result<(), EndpointError> {
    for chunk in msg.chunks(PACKET_SIZE) {
        ep.write(chunk).await?;
    }
    if msg.len() % PACKET_SIZE == 0 {
        ep.write(&[]).await?;
    }
    Ok(())
}

/// Bulk IN task - drains the pending queue to the host
#[embassy_executor::task]
pub async fn dln2_in_task(mut ep: BulkIn, engine: &'static SharedEngine) {
    info!("Bulk IN task started");

    let mut buf = [0u8; SLOT_BUF_SIZE];
    ep.wait_enabled().await;

    loop {
        // Copy the message out so the engine is not held across the transfer
        let len = {
            let mut engine = engine.lock().await;
            match engine.begin_in() {
                Some(msg) => {
                    buf[..msg.len()].copy_from_slice(msg);
                    msg.len()
                }
                None => 0,
            }
        };
        if len == 0 {
            IN_READY.wait().await;
            continue;
        }

        match send(&mut ep, &buf[..len]).await {
            Ok(()) => {
                trace!("IN: {} bytes sent", len);
                if engine.lock().await.in_complete() {
                    OUT_ARMED.signal(());
                }
                // The freed slot may take a waiting edge
                if !EDGE_RING.is_empty() {
                    EDGE_READY.signal(());
                }
            }
            Err(EndpointError::Disabled) => {
                // The message stays in flight and is sent again
                debug!("Bulk IN disabled");
                ep.wait_enabled().await;
            }
            Err(EndpointError::BufferOverflow) => {
                warn!("Bulk IN rejected a {} byte message", len);
                if engine.lock().await.in_complete() {
                    OUT_ARMED.signal(());
                }
            }
        }
    }
}
