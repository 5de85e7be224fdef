use super::ranked::RankedPages;
use super::EvictionPolicy;
use crate::memory::{FrameId, FrameTable};
use crate::translation::Vpn;

/// Not frequently used. Key is (references since load, load tick); the
/// loading reference counts as the first.
#[derive(Debug, Clone, Default)]
pub struct Nfu {
    ranked: RankedPages<(u64, u64)>,
}

impl Nfu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference_count(&self, vpn: Vpn) -> Option<u64> {
        self.ranked.key(vpn).map(|(count, _)| count)
    }
}

impl EvictionPolicy for Nfu {
    fn on_reference(&mut self, vpn: Vpn, resident: bool, _position: usize) {
        if resident {
            self.ranked
                .rekey(vpn, |(count, loaded_at)| (count.saturating_add(1), loaded_at));
        }
    }

    fn on_load(&mut self, vpn: Vpn, _frame: FrameId, loaded_at: u64) {
        self.ranked.insert(vpn, (1, loaded_at));
    }

    fn select_victim(&mut self, _frames: &FrameTable) -> Option<Vpn> {
        self.ranked.pop_min()
    }

    fn name(&self) -> &'static str {
        "nfu"
    }
}
