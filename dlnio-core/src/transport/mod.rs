//! Message transport
//!
//! Reassembles requests from bulk OUT packets, hands them to a
//! [`Dispatch`] implementation and queues responses and events for
//! bulk IN.

mod engine;
mod slots;

pub use engine::{Census, Dispatch, Engine, EventDropped, EventSink, Receive, PACKET_SIZE};
pub use slots::{MAX_SLOTS, SLOT_BUF_SIZE};
