use std::collections::VecDeque;

/// One bus transaction a controller port should issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub addr: u32,
    pub is_write: bool,
    /// Byte enables, one bit per byte lane. Ignored for reads.
    pub be: u8,
    /// Ignored for reads.
    pub wdata: u32,
}

impl Request {
    pub fn read(addr: u32) -> Self {
        Self {
            addr,
            is_write: false,
            be: 0,
            wdata: 0,
        }
    }

    pub fn write(addr: u32, be: u8, wdata: u32) -> Self {
        Self {
            addr,
            is_write: true,
            be: be & 0xF,
            wdata,
        }
    }
}

/// `None` leaves the port idle for one slot.
pub type Slot = Option<Request>;

/// Slots for one port, consumed front to back.
pub type RequestSequence = VecDeque<Slot>;

/// A sequence of `len` idle slots.
pub fn idle_sequence(len: usize) -> RequestSequence {
    std::iter::repeat(None).take(len).collect()
}
