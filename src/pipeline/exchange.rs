//! Two-slot frame exchange between the producer and the display path
//!
//! The exchange does no locking of its own: it is written and read only by the
//! coordinator's loop. Sharing it across threads would need a lock or an
//! atomic read index.

use crate::capture::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }

    pub fn other(self) -> SlotId {
        match self {
            SlotId::A => SlotId::B,
            SlotId::B => SlotId::A,
        }
    }
}

/// One programmed frame and its dimensions
#[derive(Debug, Clone)]
pub struct BufferSlot {
    frame: Frame,
    width: u32,
    height: u32,
}

impl BufferSlot {
    pub fn new(frame: Frame) -> Self {
        let (width, height) = frame.dimensions();
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Double buffer handing out the slot under the read index, flipping it on
/// every successful read
#[derive(Debug)]
pub struct DualBuffer {
    slots: [Option<BufferSlot>; 2],
    next: SlotId,
}

impl DualBuffer {
    pub fn new() -> Self {
        Self {
            slots: [None, None],
            next: SlotId::A,
        }
    }

    pub fn program(&mut self, slot: SlotId, frame: Frame) {
        self.slots[slot.index()] = Some(BufferSlot::new(frame));
    }

    /// Returns `None` only if neither slot was ever programmed; the index
    /// stays put in that case. If only the other slot holds a frame, that
    /// frame is returned.
    pub fn acquire_current(&mut self) -> Option<Frame> {
        let current = self.next;
        let slot = self.slots[current.index()]
            .as_ref()
            .or(self.slots[current.other().index()].as_ref())?;

        let frame = slot.frame().clone();
        self.next = current.other();
        Some(frame)
    }

    /// Slot the next `acquire_current` reads
    pub fn next_slot(&self) -> SlotId {
        self.next
    }

    pub fn slot(&self, slot: SlotId) -> Option<&BufferSlot> {
        self.slots[slot.index()].as_ref()
    }

    /// Drop both frames and reset the read index
    pub fn clear(&mut self) {
        self.slots = [None, None];
        self.next = SlotId::A;
    }
}

impl Default for DualBuffer {
    fn default() -> Self {
        Self::new()
    }
}
