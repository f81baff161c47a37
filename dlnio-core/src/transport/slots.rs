//! Message slot arena
//!
//! Slots live in a fixed array and are linked into FIFO queues through
//! an index stored in each slot. A [`SlotId`] is the only way to name a
//! slot from outside this module and it cannot be copied, so a slot can
//! never sit in two places at once.

use dlnio_protocol::{Handle, MAX_MESSAGE_SIZE};

/// Number of slots in the pool
pub const MAX_SLOTS: usize = 16;

/// Bytes per slot: one maximum payload plus a response header
pub const SLOT_BUF_SIZE: usize = MAX_MESSAGE_SIZE;

/// Owning reference to one slot
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(u8);

impl SlotId {
    /// Position of the slot in the arena
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One message buffer
pub struct Slot {
    pub(crate) data: [u8; SLOT_BUF_SIZE],
    /// Bytes received so far (OUT direction)
    pub(crate) len: usize,
    next: Option<u8>,
}

impl Slot {
    fn new() -> Self {
        let mut slot = Self {
            data: [0; SLOT_BUF_SIZE],
            len: 0,
            next: None,
        };
        slot.reset();
        slot
    }

    /// Clear contents and mark the header handle as unused
    pub(crate) fn reset(&mut self) {
        self.data.fill(0);
        self.data[6..8].copy_from_slice(&Handle::UNUSED.to_le_bytes());
        self.len = 0;
    }
}

/// Intrusive FIFO of slots
#[derive(Debug, Default)]
pub struct SlotQueue {
    head: Option<u8>,
    tail: Option<u8>,
    len: usize,
}

impl SlotQueue {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of queued slots
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append `id` at the tail
    pub fn push(&mut self, slots: &mut [Slot], id: SlotId) {
        let index = id.0;
        slots[index as usize].next = None;
        match self.tail {
            Some(tail) => slots[tail as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    /// Remove the head
    pub fn pop(&mut self, slots: &mut [Slot]) -> Option<SlotId> {
        let index = self.head?;
        self.head = slots[index as usize].next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Some(SlotId(index))
    }
}

/// Slot arena with its free list
pub struct SlotPool {
    slots: [Slot; MAX_SLOTS],
    free: SlotQueue,
}

impl Default for SlotPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotPool {
    /// Create a pool with every slot free
    pub fn new() -> Self {
        let mut pool = Self {
            slots: core::array::from_fn(|_| Slot::new()),
            free: SlotQueue::new(),
        };
        for index in 0..MAX_SLOTS {
            pool.free.push(&mut pool.slots, SlotId(index as u8));
        }
        pool
    }

    /// Take a free slot
    pub fn acquire(&mut self) -> Option<SlotId> {
        self.free.pop(&mut self.slots)
    }

    /// Clear a slot and return it to the free list
    pub fn release(&mut self, id: SlotId) {
        self.slots[id.index()].reset();
        self.free.push(&mut self.slots, id);
    }

    /// Number of free slots
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn slot(&self, id: &SlotId) -> &Slot {
        &self.slots[id.index()]
    }

    pub fn slot_mut(&mut self, id: &SlotId) -> &mut Slot {
        &mut self.slots[id.index()]
    }

    /// Append `id` to `queue`
    pub fn enqueue(&mut self, queue: &mut SlotQueue, id: SlotId) {
        queue.push(&mut self.slots, id);
    }

    /// Remove the head of `queue`
    pub fn dequeue(&mut self, queue: &mut SlotQueue) -> Option<SlotId> {
        queue.pop(&mut self.slots)
    }
}
