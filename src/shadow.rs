use crate::config::{AddressMap, INITIAL_PATTERN, PERIPHERAL_COUNT, PERIPHERAL_DEPTH};

/// Merges `new` into `old` byte lane by byte lane. Bit `i` of `be` selects
/// bits `8*i..8*i+8`.
pub fn merge_byte_lanes(old: u32, new: u32, be: u8) -> u32 {
    (0..4).fold(0, |acc, lane| {
        let lane_mask = 0xFFu32 << (8 * lane);
        let src = if be & (1 << lane) != 0 { new } else { old };
        acc | (src & lane_mask)
    })
}

/// Reference copy of what every peripheral word should hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowMemory {
    map: AddressMap,
    words: [[u32; PERIPHERAL_DEPTH]; PERIPHERAL_COUNT],
}

impl ShadowMemory {
    /// Memory contents right after reset.
    pub fn new(map: AddressMap) -> Self {
        Self {
            map,
            words: [INITIAL_PATTERN; PERIPHERAL_COUNT],
        }
    }

    pub fn expected(&self, addr: u32) -> u32 {
        let (peripheral, offset) = self.map.decode(addr);
        self.words[peripheral][offset]
    }

    /// Records a completed write and returns the new word.
    pub fn apply_write(&mut self, addr: u32, be: u8, wdata: u32) -> u32 {
        let (peripheral, offset) = self.map.decode(addr);
        let word = &mut self.words[peripheral][offset];
        *word = merge_byte_lanes(*word, wdata, be);
        *word
    }

    pub fn word(&self, peripheral: usize, offset: usize) -> u32 {
        self.words[peripheral][offset % PERIPHERAL_DEPTH]
    }
}
