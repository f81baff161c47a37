//! ADC event task
//!
//! Emits an ADC condition event every period while the host has the
//! periodic event type configured.

use defmt::*;
use dlnio_core::events::emit_adc_event;
use dlnio_core::transport::EventSink;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};

use crate::channels::{SharedEngine, ADC_PERIOD, IN_READY};

/// ADC event task - periodic condition events
#[embassy_executor::task]
pub async fn adc_event_task(engine: &'static SharedEngine) {
    info!("ADC event task started");

    let mut period = None;

    loop {
        let Some(ms) = period else {
            period = ADC_PERIOD.wait().await;
            continue;
        };

        debug!("ADC events every {} ms", ms);
        let mut ticker = Ticker::every(Duration::from_millis(ms as u64));
        period = loop {
            match select(ticker.next(), ADC_PERIOD.wait()).await {
                Either::First(()) => {
                    let mut engine = engine.lock().await;
                    if emit_adc_event(&mut EventSink::new(&mut engine)).is_ok() {
                        IN_READY.signal(());
                    }
                }
                Either::Second(next) => break next,
            }
        };
    }
}
