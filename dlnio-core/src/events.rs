//! Event producers
//!
//! Each pin interrupt is decoded by that pin's [`PinEdges`] into an
//! [`EdgeRing`], which the transport side drains as condition-met events. ADC events are paced by an
//! [`EventTimer`] owned by the firmware.

use core::cell::RefCell;

use dlnio_hal::{EdgeFlags, Trigger};
use dlnio_protocol::commands::{adc, gpio};
use dlnio_protocol::{AdcConditionEvent, GpioConditionEvent};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Deque;

use crate::transport::{Engine, EventDropped, EventSink};

/// Edge ring depth
pub const EDGE_RING_SIZE: usize = 16;

/// A pin level change to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Edge {
    pub pin: u8,
    /// Level after the change
    pub level: bool,
}

impl Edge {
    /// Queue this edge as a GPIO condition-met event
    pub fn emit(&self, engine: &mut Engine) -> Result<(), EventDropped> {
        let event = GpioConditionEvent {
            pin: self.pin as u16,
            value: self.level as u8,
        };
        let mut payload = [0u8; GpioConditionEvent::SIZE];
        event.encode(&mut payload).map_err(|_| EventDropped)?;
        engine.emit_event(gpio::CONDITION_MET_EV, &payload)
    }
}

/// Fixed-depth edge queue shared between the sampler and the transport
///
/// Every access runs inside a critical section. The sampler pushes with
/// [`EdgeRing::try_push`]; the consumer moves edges out with
/// [`EdgeRing::drain`].
pub struct EdgeRing {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Deque<Edge, EDGE_RING_SIZE>>>,
}

impl Default for EdgeRing {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeRing {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Append an edge, returning false if the ring is full
    ///
    /// A full ring drops the new edge.
    pub fn try_push(&self, edge: Edge) -> bool {
        self.inner
            .lock(|ring| ring.borrow_mut().push_back(edge).is_ok())
    }

    /// Hand queued edges to `emit` oldest first
    ///
    /// An edge leaves the ring only when `emit` accepts it; draining stops
    /// at the first refusal. Returns the number of edges consumed.
    pub fn drain(&self, mut emit: impl FnMut(Edge) -> bool) -> usize {
        let mut count = 0;
        loop {
            let accepted = self.inner.lock(|ring| {
                let mut ring = ring.borrow_mut();
                match ring.front().copied() {
                    Some(edge) if emit(edge) => {
                        ring.pop_front();
                        true
                    }
                    _ => false,
                }
            });
            if !accepted {
                return count;
            }
            count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|ring| ring.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What one pin interrupt amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeOutcome {
    /// Same level as last notified, or nothing latched
    Unchanged,
    /// New level queued in the ring
    Queued(Edge),
    /// New level lost to a full ring
    Dropped(Edge),
}

/// Interrupt-side state of one pin
///
/// Holds the armed trigger and the last level notified, so a bounce or a
/// held level trigger reports once until the level is seen to change.
/// One instance lives with each pin's interrupt waiter; nothing else
/// touches it.
#[derive(Debug, Clone)]
pub struct PinEdges {
    pin: u8,
    trigger: Trigger,
    last: Option<bool>,
}

impl PinEdges {
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            trigger: Trigger::None,
            last: None,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Trigger currently armed
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Apply a new trigger
    ///
    /// A change trigger starts from the current `level`; level triggers
    /// report the first time they fire.
    pub fn arm(&mut self, trigger: Trigger, level: bool) {
        self.trigger = trigger;
        self.last = match trigger {
            Trigger::Change => Some(level),
            _ => None,
        };
    }

    /// Record a level seen without an interrupt
    pub fn observe(&mut self, level: bool) {
        self.last = Some(level);
    }

    /// Decode the flags of one interrupt and queue the level change
    ///
    /// `level` is only called when both edges latched together.
    pub fn service(
        &mut self,
        flags: EdgeFlags,
        level: impl FnOnce() -> bool,
        ring: &EdgeRing,
    ) -> EdgeOutcome {
        if self.trigger == Trigger::None {
            return EdgeOutcome::Unchanged;
        }

        let rise = flags.contains(EdgeFlags::EDGE_RISE);
        let fall = flags.contains(EdgeFlags::EDGE_FALL);
        let value = if rise && fall {
            level()
        } else if rise {
            true
        } else if fall {
            false
        } else if flags.contains(EdgeFlags::LEVEL_HIGH) {
            true
        } else if flags.contains(EdgeFlags::LEVEL_LOW) {
            false
        } else {
            return EdgeOutcome::Unchanged;
        };

        if self.last == Some(value) {
            return EdgeOutcome::Unchanged;
        }
        self.last = Some(value);

        let edge = Edge {
            pin: self.pin,
            level: value,
        };
        if ring.try_push(edge) {
            EdgeOutcome::Queued(edge)
        } else {
            EdgeOutcome::Dropped(edge)
        }
    }

    /// Report a change that happened while the interrupt was being re-armed
    ///
    /// Only change triggers track the level between interrupts.
    pub fn resync(&mut self, level: bool, ring: &EdgeRing) -> EdgeOutcome {
        if self.trigger != Trigger::Change {
            return EdgeOutcome::Unchanged;
        }
        let flags = if level {
            EdgeFlags::EDGE_RISE
        } else {
            EdgeFlags::EDGE_FALL
        };
        self.service(flags, || level, ring)
    }
}

/// Repeating timer that paces ADC condition events
pub trait EventTimer {
    /// Start, or restart, firing every `period_ms`
    fn start(&mut self, period_ms: u16);

    /// Stop firing
    fn stop(&mut self);
}

/// Queue one ADC condition-met event
pub fn emit_adc_event(events: &mut EventSink<'_>) -> Result<(), EventDropped> {
    let mut payload = [0u8; AdcConditionEvent::SIZE];
    AdcConditionEvent
        .encode(&mut payload)
        .map_err(|_| EventDropped)?;
    events.emit(adc::CONDITION_MET_EV, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_fifo_and_overflow() {
        let ring = EdgeRing::new();
        for pin in 0..EDGE_RING_SIZE as u8 {
            assert!(ring.try_push(Edge { pin, level: true }));
        }
        assert!(!ring.try_push(Edge { pin: 99, level: true }));
        assert_eq!(ring.len(), EDGE_RING_SIZE);

        let mut seen = heapless::Vec::<u8, EDGE_RING_SIZE>::new();
        let count = ring.drain(|edge| seen.push(edge.pin).is_ok());
        assert_eq!(count, EDGE_RING_SIZE);
        assert_eq!(seen[0], 0);
        assert_eq!(seen[EDGE_RING_SIZE - 1], EDGE_RING_SIZE as u8 - 1);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_drain_keeps_refused_edges() {
        let ring = EdgeRing::new();
        ring.try_push(Edge { pin: 1, level: true });
        ring.try_push(Edge { pin: 2, level: false });

        let mut accepted = 0;
        let count = ring.drain(|_| {
            accepted += 1;
            accepted < 2
        });
        assert_eq!(count, 1);
        assert_eq!(ring.len(), 1);

        let mut pin = None;
        ring.drain(|edge| {
            pin = Some(edge.pin);
            true
        });
        assert_eq!(pin, Some(2));
    }

    fn armed(pin: u8, trigger: Trigger, level: bool) -> PinEdges {
        let mut edges = PinEdges::new(pin);
        edges.arm(trigger, level);
        edges
    }

    #[test]
    fn test_edge_flags_to_level() {
        let ring = EdgeRing::new();
        let mut edges = armed(3, Trigger::Change, false);

        assert_eq!(
            edges.service(EdgeFlags::EDGE_RISE, || unreachable!(), &ring),
            EdgeOutcome::Queued(Edge { pin: 3, level: true })
        );
        assert_eq!(
            edges.service(EdgeFlags::EDGE_FALL, || unreachable!(), &ring),
            EdgeOutcome::Queued(Edge { pin: 3, level: false })
        );
        // Both edges latched: the pin decides
        assert_eq!(
            edges.service(EdgeFlags::EDGE_RISE | EdgeFlags::EDGE_FALL, || true, &ring),
            EdgeOutcome::Queued(Edge { pin: 3, level: true })
        );
        assert_eq!(
            edges.service(EdgeFlags::empty(), || true, &ring),
            EdgeOutcome::Unchanged
        );
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_bounce_reports_once() {
        let ring = EdgeRing::new();
        let mut edges = armed(12, Trigger::Change, false);

        edges.service(EdgeFlags::EDGE_RISE, || true, &ring);
        assert_eq!(
            edges.service(EdgeFlags::EDGE_RISE, || true, &ring),
            EdgeOutcome::Unchanged
        );
        edges.service(EdgeFlags::EDGE_FALL, || false, &ring);

        let mut seen = heapless::Vec::<Edge, 4>::new();
        ring.drain(|edge| seen.push(edge).is_ok());
        assert_eq!(
            seen,
            [Edge { pin: 12, level: true }, Edge { pin: 12, level: false }]
        );
    }

    #[test]
    fn test_short_pulse_between_interrupts() {
        let ring = EdgeRing::new();
        let mut edges = armed(6, Trigger::Change, true);

        // Falling edge wakes the waiter; the pin rises again before re-arm
        edges.service(EdgeFlags::EDGE_FALL, || false, &ring);
        assert_eq!(
            edges.resync(true, &ring),
            EdgeOutcome::Queued(Edge { pin: 6, level: true })
        );
        assert_eq!(edges.resync(true, &ring), EdgeOutcome::Unchanged);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_held_level_reports_once() {
        let ring = EdgeRing::new();
        let mut edges = armed(7, Trigger::LevelHigh, true);

        assert_eq!(
            edges.service(EdgeFlags::LEVEL_HIGH, || true, &ring),
            EdgeOutcome::Queued(Edge { pin: 7, level: true })
        );
        assert_eq!(
            edges.service(EdgeFlags::LEVEL_HIGH, || true, &ring),
            EdgeOutcome::Unchanged
        );

        // Level dropped without an event, then rose again
        edges.observe(false);
        assert!(matches!(
            edges.service(EdgeFlags::LEVEL_HIGH, || true, &ring),
            EdgeOutcome::Queued(_)
        ));
        // Level triggers do not track the pin between interrupts
        assert_eq!(edges.resync(false, &ring), EdgeOutcome::Unchanged);
    }

    #[test]
    fn test_seeded_level_suppresses_repeat() {
        let ring = EdgeRing::new();
        let mut edges = armed(2, Trigger::Change, false);
        assert_eq!(
            edges.service(EdgeFlags::EDGE_FALL, || false, &ring),
            EdgeOutcome::Unchanged
        );
        assert!(matches!(
            edges.service(EdgeFlags::EDGE_RISE, || true, &ring),
            EdgeOutcome::Queued(_)
        ));
    }

    #[test]
    fn test_disarmed_pin_is_silent() {
        let ring = EdgeRing::new();
        let mut edges = armed(4, Trigger::Change, false);
        edges.arm(Trigger::None, false);

        assert_eq!(
            edges.service(EdgeFlags::EDGE_RISE, || true, &ring),
            EdgeOutcome::Unchanged
        );
        assert!(ring.is_empty());
    }

    #[test]
    fn test_full_ring_drops_new_edge() {
        let ring = EdgeRing::new();
        for pin in 0..EDGE_RING_SIZE as u8 {
            assert!(ring.try_push(Edge { pin, level: pin % 2 == 0 }));
        }

        let mut edges = armed(20, Trigger::Change, false);
        assert_eq!(
            edges.service(EdgeFlags::EDGE_RISE, || true, &ring),
            EdgeOutcome::Dropped(Edge { pin: 20, level: true })
        );
        // The dropped level still counts as notified
        assert_eq!(
            edges.service(EdgeFlags::EDGE_RISE, || true, &ring),
            EdgeOutcome::Unchanged
        );
        assert_eq!(ring.len(), EDGE_RING_SIZE);

        let mut seen = heapless::Vec::<Edge, EDGE_RING_SIZE>::new();
        ring.drain(|edge| seen.push(edge).is_ok());
        for (i, edge) in seen.iter().enumerate() {
            assert_eq!(*edge, Edge { pin: i as u8, level: i % 2 == 0 });
        }
    }

    #[test]
    fn test_edge_event_payload() {
        let mut engine = Engine::new();
        Edge { pin: 5, level: true }.emit(&mut engine).unwrap();

        let event = engine.begin_in().unwrap();
        assert_eq!(event.len(), 14);
        assert_eq!(&event[2..4], &gpio::CONDITION_MET_EV.to_le_bytes());
        assert_eq!(&event[8..14], &[0, 0, 0, 5, 0, 1]);
    }
}
