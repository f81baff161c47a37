//! Transport engine
//!
//! Owns the slot pool and moves slots between four places: the free
//! list, the OUT reference (the slot currently receiving a request), the
//! pending-response queue and the IN reference (the slot currently being
//! sent). The USB glue drives it with three calls:
//!
//! - [`Engine::receive`] for every packet read from bulk OUT
//! - [`Engine::begin_in`] to fetch the next message for bulk IN
//! - [`Engine::in_complete`] once that message has been written
//!
//! ```text
//!            arm_out               receive / dispatch
//!   ┌──────┐ ───────▶ ┌─────┐ ──────────────────────▶ ┌─────────┐
//!   │ free │          │ OUT │                         │ pending │
//!   └──────┘ ◀─────┐  └─────┘     emit_event ───────▶ └─────────┘
//!       ▲          │                                       │
//!       │          │            in_complete   ┌────┐  begin_in
//!       └──────────┴──────────────────────────│ IN │ ◀─────┘
//!                                             └────┘
//! ```

use dlnio_protocol::header::{read_u16, write_u16};
use dlnio_protocol::{Handle, Header, ResultCode, HEADER_SIZE, RESPONSE_HEADER_SIZE};

use super::slots::{SlotId, SlotPool, SlotQueue, MAX_SLOTS, SLOT_BUF_SIZE};

/// Bulk endpoint max packet size
pub const PACKET_SIZE: usize = 64;

/// Largest request payload that fits a slot
const REQUEST_BUF_SIZE: usize = SLOT_BUF_SIZE - HEADER_SIZE;

/// Handles a complete request
pub trait Dispatch {
    /// Execute the request and write the response payload
    ///
    /// `request` is the request payload (header stripped) and `response`
    /// is the response payload area. Returns the response payload length
    /// on success; an error becomes a response with an empty payload.
    fn dispatch(
        &mut self,
        header: &Header,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, ResultCode>;

    /// Called once the response has been queued
    ///
    /// Lets a handler emit events that must follow its response.
    fn after_response(&mut self, _events: &mut EventSink<'_>) {}
}

/// Outcome of feeding one packet to [`Engine::receive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Receive {
    /// Part of a larger message, waiting for more packets
    Pending,
    /// Message handled, response queued
    Dispatched,
    /// Message rejected, error response queued
    Rejected(ResultCode),
    /// No OUT slot was armed; the packet was discarded
    NotArmed,
}

/// An event could not be queued because no slot was free
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventDropped;

/// Slot distribution across the engine's owners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Census {
    pub free: usize,
    pub pending: usize,
    pub out: usize,
    pub in_flight: usize,
}

impl Census {
    /// Total slots accounted for
    pub fn total(&self) -> usize {
        self.free + self.pending + self.out + self.in_flight
    }
}

enum Step {
    Wait,
    Dispatch,
    Reject(ResultCode),
}

/// Protocol transport engine
pub struct Engine {
    pool: SlotPool,
    pending: SlotQueue,
    out: Option<SlotId>,
    in_flight: Option<SlotId>,
    /// Request payload copy; responses are written over the request
    request: [u8; REQUEST_BUF_SIZE],
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with an armed OUT slot
    pub fn new() -> Self {
        let mut engine = Self {
            pool: SlotPool::new(),
            pending: SlotQueue::new(),
            out: None,
            in_flight: None,
            request: [0; REQUEST_BUF_SIZE],
        };
        engine.arm_out();
        engine
    }

    /// Take a free slot for OUT if none is armed
    ///
    /// Returns false when the pool is empty; OUT then stays stalled until
    /// an IN completion frees a slot.
    pub fn arm_out(&mut self) -> bool {
        if self.out.is_none() {
            self.out = self.pool.acquire();
            if self.out.is_none() {
                warn!("Out of slots, OUT stalled");
            }
        }
        self.out.is_some()
    }

    /// Check if a slot is ready to receive
    pub fn is_out_armed(&self) -> bool {
        self.out.is_some()
    }

    /// Check if a response or event is waiting for IN
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Feed one completed bulk OUT packet
    pub fn receive<D: Dispatch + ?Sized>(&mut self, packet: &[u8], handler: &mut D) -> Receive {
        let Some(id) = self.out.take() else {
            return Receive::NotArmed;
        };

        let step = self.absorb(&id, packet);
        let result = match step {
            Step::Wait => {
                self.out = Some(id);
                return Receive::Pending;
            }
            Step::Dispatch => {
                self.dispatch(id, handler);
                Receive::Dispatched
            }
            Step::Reject(code) => {
                debug!("Rejecting message: {}", code);
                self.respond(id, 0, code);
                Receive::Rejected(code)
            }
        };

        self.arm_out();
        result
    }

    /// Append `packet` to the OUT slot and decide what happens next
    fn absorb(&mut self, id: &SlotId, packet: &[u8]) -> Step {
        let slot = self.pool.slot_mut(id);
        let n = packet.len();
        let first = slot.len == 0;

        if slot.len + n > SLOT_BUF_SIZE {
            return if first && n > PACKET_SIZE {
                Step::Reject(ResultCode::Fail)
            } else {
                Step::Reject(ResultCode::InvalidMessageSize)
            };
        }
        slot.data[slot.len..slot.len + n].copy_from_slice(packet);
        slot.len += n;

        let size = read_u16(&slot.data, 0) as usize;

        if first {
            if n < HEADER_SIZE {
                Step::Reject(ResultCode::InvalidMessageSize)
            } else if n < PACKET_SIZE {
                if size == n {
                    Step::Dispatch
                } else {
                    Step::Reject(ResultCode::InvalidMessageSize)
                }
            } else if n > PACKET_SIZE {
                Step::Reject(ResultCode::Fail)
            } else if size > SLOT_BUF_SIZE {
                Step::Reject(ResultCode::InvalidMessageSize)
            } else if size == PACKET_SIZE {
                Step::Dispatch
            } else if size < PACKET_SIZE {
                Step::Reject(ResultCode::InvalidMessageSize)
            } else {
                Step::Wait
            }
        } else if slot.len == size {
            Step::Dispatch
        } else if slot.len > size || n < PACKET_SIZE {
            // A short packet ends the USB transfer before the message did
            Step::Reject(ResultCode::InvalidMessageSize)
        } else {
            Step::Wait
        }
    }

    fn dispatch<D: Dispatch + ?Sized>(&mut self, id: SlotId, handler: &mut D) {
        let slot = self.pool.slot_mut(&id);
        let header = match Header::decode(&slot.data) {
            Ok(header) => header,
            Err(_) => {
                self.respond(id, 0, ResultCode::InvalidMessageSize);
                return;
            }
        };
        let payload_len = header.payload_len().unwrap_or(0);
        self.request[..payload_len]
            .copy_from_slice(&slot.data[HEADER_SIZE..HEADER_SIZE + payload_len]);

        trace!(
            "Request id={=u16:#x} handle={=u16} echo={=u16} len={}",
            header.id,
            header.handle,
            header.echo,
            payload_len
        );

        let response = &mut slot.data[RESPONSE_HEADER_SIZE..];
        let outcome = handler.dispatch(&header, &self.request[..payload_len], response);
        match outcome {
            Ok(len) => self.respond(id, len, ResultCode::Success),
            Err(code) => {
                debug!("Command {=u16:#x} failed: {}", header.id, code);
                self.respond(id, 0, code);
            }
        }

        handler.after_response(&mut EventSink { engine: self });
    }

    /// Turn the slot into a response and queue it for IN
    fn respond(&mut self, id: SlotId, payload_len: usize, code: ResultCode) {
        let slot = self.pool.slot_mut(&id);
        let payload_len = payload_len.min(SLOT_BUF_SIZE - RESPONSE_HEADER_SIZE);
        // The request header was received into this slot, so id, echo and
        // handle already sit in place.
        write_u16(
            &mut slot.data,
            0,
            (RESPONSE_HEADER_SIZE + payload_len) as u16,
        );
        write_u16(&mut slot.data, HEADER_SIZE, code.as_u16());
        self.pool.enqueue(&mut self.pending, id);
    }

    /// Queue an unsolicited event
    ///
    /// The event is dropped when no slot is free.
    pub fn emit_event(&mut self, id: u16, payload: &[u8]) -> Result<(), EventDropped> {
        if payload.len() > SLOT_BUF_SIZE - HEADER_SIZE {
            return Err(EventDropped);
        }
        let Some(slot_id) = self.pool.acquire() else {
            warn!("Out of slots, dropping event {=u16:#x}", id);
            return Err(EventDropped);
        };

        let slot = self.pool.slot_mut(&slot_id);
        let header = Header {
            size: (HEADER_SIZE + payload.len()) as u16,
            id,
            echo: 0,
            handle: Handle::Event.as_u16(),
        };
        // Slot buffers always hold a full header
        let _ = header.encode(&mut slot.data);
        slot.data[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);

        self.pool.enqueue(&mut self.pending, slot_id);
        Ok(())
    }

    /// Check if an event could be queued right now
    pub fn has_free_slot(&self) -> bool {
        self.pool.free_count() > 0
    }

    /// Bytes of the message to send on bulk IN
    ///
    /// Starts the next pending message if nothing is in flight. Returns
    /// `None` when there is nothing to send.
    pub fn begin_in(&mut self) -> Option<&[u8]> {
        if self.in_flight.is_none() {
            self.in_flight = self.pool.dequeue(&mut self.pending);
        }
        let id = self.in_flight.as_ref()?;
        let data = &self.pool.slot(id).data;
        let size = (read_u16(data, 0) as usize).min(SLOT_BUF_SIZE);
        Some(&data[..size])
    }

    /// Finish the in-flight IN transfer
    ///
    /// Frees its slot and re-arms OUT if it was stalled. Returns true if
    /// OUT was re-armed by this call.
    pub fn in_complete(&mut self) -> bool {
        if let Some(id) = self.in_flight.take() {
            self.pool.release(id);
        }
        if self.out.is_none() {
            self.arm_out()
        } else {
            false
        }
    }

    /// Count slots per owner
    pub fn census(&self) -> Census {
        Census {
            free: self.pool.free_count(),
            pending: self.pending.len(),
            out: self.out.is_some() as usize,
            in_flight: self.in_flight.is_some() as usize,
        }
    }

    /// Total slots managed by the engine
    pub const fn capacity() -> usize {
        MAX_SLOTS
    }
}

/// Event emitter handed to [`Dispatch::after_response`]
pub struct EventSink<'a> {
    engine: &'a mut Engine,
}

impl<'a> EventSink<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    /// Queue an unsolicited event
    pub fn emit(&mut self, id: u16, payload: &[u8]) -> Result<(), EventDropped> {
        self.engine.emit_event(id, payload)
    }
}
