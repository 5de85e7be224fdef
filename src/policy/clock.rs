use std::collections::HashMap;

use super::EvictionPolicy;
use crate::memory::{FrameId, FrameTable};
use crate::translation::Vpn;

/// Second-chance replacement. One hand sweeps the frame array in index
/// order; a set reference bit buys the page one more pass.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    hand: FrameId,
    referenced: HashMap<Vpn, bool>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hand(&self) -> FrameId {
        self.hand
    }

    pub fn is_referenced(&self, vpn: Vpn) -> bool {
        self.referenced.get(&vpn).copied().unwrap_or(false)
    }
}

impl EvictionPolicy for Clock {
    fn on_reference(&mut self, vpn: Vpn, resident: bool, _position: usize) {
        if resident {
            self.referenced.insert(vpn, true);
        }
    }

    fn on_load(&mut self, vpn: Vpn, _frame: FrameId, _loaded_at: u64) {
        self.referenced.insert(vpn, true);
    }

    fn select_victim(&mut self, frames: &FrameTable) -> Option<Vpn> {
        let capacity = frames.capacity();
        if capacity == 0 {
            return None;
        }

        // two full turns always suffice: the first clears every bit
        for _ in 0..=2 * capacity {
            let slot = self.hand % capacity;
            self.hand = (slot + 1) % capacity;

            let Some(vpn) = frames.occupant(slot) else {
                continue;
            };
            match self.referenced.get_mut(&vpn) {
                Some(bit) if *bit => *bit = false,
                _ => {
                    self.referenced.remove(&vpn);
                    return Some(vpn);
                }
            }
        }

        None
    }

    fn name(&self) -> &'static str {
        "clock"
    }
}
