//! Belady's optimal replacement.
//!
//! Needs the whole trace up front: [`NextUse`] is built in one pass before
//! replay and only read during it.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use super::ranked::RankedPages;
use super::EvictionPolicy;
use crate::io::TraceRecord;
use crate::memory::{FrameId, FrameTable};
use crate::translation::Vpn;

/// Next-use position of a page that is never referenced again
pub const NEVER: usize = usize::MAX;

/// For every trace position, the position of the next reference to the
/// same page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextUse {
    next: Vec<usize>,
}

impl NextUse {
    pub fn build(pages: &[Vpn]) -> Self {
        let mut next = vec![NEVER; pages.len()];
        let mut last_seen: HashMap<Vpn, usize> = HashMap::new();

        for (position, &vpn) in pages.iter().enumerate() {
            if let Some(previous) = last_seen.insert(vpn, position) {
                next[previous] = position;
            }
        }

        NextUse { next }
    }

    pub fn from_records(records: &[TraceRecord]) -> Self {
        let pages: Vec<Vpn> = records.iter().map(|r| r.vpn()).collect();
        Self::build(&pages)
    }

    /// Next reference after `position` to the page referenced there
    #[inline]
    pub fn after(&self, position: usize) -> usize {
        self.next.get(position).copied().unwrap_or(NEVER)
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}

// farthest next use sorts first; ties go to the earliest load
type OptKey = (Reverse<usize>, u64);

#[derive(Debug, Clone)]
pub struct Optimal {
    next_use: Arc<NextUse>,
    ranked: RankedPages<OptKey>,
    pending: Option<(Vpn, usize)>,
}

impl Optimal {
    pub fn new(next_use: Arc<NextUse>) -> Self {
        Optimal {
            next_use,
            ranked: RankedPages::new(),
            pending: None,
        }
    }

    /// Next-use position currently recorded for a resident page
    pub fn next_use_of(&self, vpn: Vpn) -> Option<usize> {
        self.ranked.key(vpn).map(|(Reverse(next), _)| next)
    }
}

impl EvictionPolicy for Optimal {
    fn on_reference(&mut self, vpn: Vpn, resident: bool, position: usize) {
        let next = self.next_use.after(position);
        if resident {
            self.ranked.rekey(vpn, |(_, loaded_at)| (Reverse(next), loaded_at));
        } else {
            self.pending = Some((vpn, next));
        }
    }

    fn on_load(&mut self, vpn: Vpn, _frame: FrameId, loaded_at: u64) {
        let next = match self.pending.take() {
            Some((pending, next)) if pending == vpn => next,
            _ => NEVER,
        };
        self.ranked.insert(vpn, (Reverse(next), loaded_at));
    }

    fn select_victim(&mut self, _frames: &FrameTable) -> Option<Vpn> {
        self.ranked.pop_min()
    }

    fn name(&self) -> &'static str {
        "opt"
    }
}
