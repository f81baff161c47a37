//! GPIO event task
//!
//! Moves edges from the ring into the IN queue. Edges that find no free
//! slot stay queued until the bulk IN task reports a completed transfer.

use defmt::*;

use crate::channels::{SharedEngine, EDGE_READY, EDGE_RING, IN_READY};

/// GPIO event task - edge ring to transport
#[embassy_executor::task]
pub async fn gpio_event_task(engine: &'static SharedEngine) {
    info!("GPIO event task started");

    loop {
        EDGE_READY.wait().await;
        if EDGE_RING.is_empty() {
            continue;
        }

        let mut engine = engine.lock().await;
        let sent = EDGE_RING.drain(|edge| edge.emit(&mut engine).is_ok());
        if sent > 0 {
            trace!("{} GPIO events queued", sent);
            IN_READY.signal(());
        }
    }
}
