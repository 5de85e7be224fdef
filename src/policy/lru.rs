use super::ranked::RankedPages;
use super::EvictionPolicy;
use crate::memory::{FrameId, FrameTable};
use crate::translation::Vpn;

/// Least recently used. Key is (last access tick, load tick).
#[derive(Debug, Clone, Default)]
pub struct Lru {
    ranked: RankedPages<(u64, u64)>,
    now: u64,
}

impl Lru {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_access(&self, vpn: Vpn) -> Option<u64> {
        self.ranked.key(vpn).map(|(last, _)| last)
    }
}

impl EvictionPolicy for Lru {
    fn on_reference(&mut self, vpn: Vpn, resident: bool, position: usize) {
        self.now = position as u64;
        if resident {
            let now = self.now;
            self.ranked.rekey(vpn, |(_, loaded_at)| (now, loaded_at));
        }
    }

    fn on_load(&mut self, vpn: Vpn, _frame: FrameId, loaded_at: u64) {
        self.ranked.insert(vpn, (self.now, loaded_at));
    }

    fn select_victim(&mut self, _frames: &FrameTable) -> Option<Vpn> {
        self.ranked.pop_min()
    }

    fn name(&self) -> &'static str {
        "lru"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(lru: &mut Lru, vpn: Vpn, position: usize) {
        lru.on_reference(vpn, false, position);
        lru.on_load(vpn, position, position as u64);
    }

    #[test]
    fn test_evicts_least_recent() {
        let mut lru = Lru::new();
        let frames = FrameTable::new(3);

        load(&mut lru, 1, 0);
        load(&mut lru, 2, 1);
        load(&mut lru, 3, 2);

        // touch 1 again, so 2 becomes the oldest
        lru.on_reference(1, true, 3);
        assert_eq!(lru.last_access(1), Some(3));

        lru.on_reference(4, false, 4);
        assert_eq!(lru.select_victim(&frames), Some(2));
        assert_eq!(lru.select_victim(&frames), Some(3));
        assert_eq!(lru.select_victim(&frames), Some(1));
        assert_eq!(lru.select_victim(&frames), None);
    }

    #[test]
    fn test_load_uses_fault_time() {
        let mut lru = Lru::new();
        load(&mut lru, 9, 41);
        assert_eq!(lru.last_access(9), Some(41));
    }

    #[test]
    fn test_victim_is_forgotten() {
        let mut lru = Lru::new();
        let frames = FrameTable::new(1);

        load(&mut lru, 1, 0);
        assert_eq!(lru.select_victim(&frames), Some(1));

        // a late hit on the evicted page must not resurrect it
        lru.on_reference(1, true, 5);
        assert_eq!(lru.last_access(1), None);
    }
}
