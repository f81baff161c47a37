//! GPIO pin interrupt tasks
//!
//! One task per watched pin. It sleeps on the pin interrupt for the armed
//! trigger, decodes what fired into the edge ring and wakes the GPIO
//! event task. Trigger changes from the host arrive through the pin's
//! signal in `channels`.

use defmt::*;
use dlnio_core::events::{EdgeOutcome, PinEdges};
use dlnio_core::modules::gpio::PIN_COUNT;
use dlnio_hal::Trigger;
use dlnio_hal_rp2040::PinWatch;
use embassy_futures::select::{select, Either};

use crate::channels::{EDGE_READY, EDGE_RING, PIN_TRIGGERS};

fn report(outcome: EdgeOutcome) {
    match outcome {
        EdgeOutcome::Unchanged => {}
        EdgeOutcome::Queued(_) => EDGE_READY.signal(()),
        EdgeOutcome::Dropped(edge) => warn!("Edge ring full, dropping pin {}", edge.pin),
    }
}

/// Pin interrupt task - one per watched pin
#[embassy_executor::task(pool_size = PIN_COUNT as usize)]
pub async fn gpio_pin_task(mut watch: PinWatch) {
    let mut edges = PinEdges::new(watch.number());
    let Some(armed) = PIN_TRIGGERS.get(watch.number() as usize) else {
        return;
    };

    loop {
        let trigger = edges.trigger();
        // Edges that landed while the interrupt was re-armed were cleared
        report(edges.resync(watch.level(), &EDGE_RING));

        let flags = match select(watch.wait(trigger), armed.wait()).await {
            Either::First(flags) => flags,
            Either::Second(next) => {
                edges.arm(next, watch.level());
                trace!("GPIO{} trigger {}", edges.pin(), next);
                continue;
            }
        };
        report(edges.service(flags, || watch.level(), &EDGE_RING));

        if matches!(trigger, Trigger::LevelHigh | Trigger::LevelLow) {
            match select(watch.wait_release(trigger), armed.wait()).await {
                Either::First(()) => edges.observe(watch.level()),
                Either::Second(next) => edges.arm(next, watch.level()),
            }
        }
    }
}
