//! Page replacement policies.
//!
//! Every policy sees the same three events from the simulator:
//!
//! - `on_reference` for every access, before any fault handling
//! - `on_load` once per page brought into a frame
//! - `select_victim` only when a fault finds every frame occupied
//!
//! A policy never touches the page or frame tables; the simulator applies
//! the eviction it picks. Once a page is returned as victim the policy
//! drops whatever it tracked for it.

mod clock;
mod lru;
mod nfu;
pub mod optimal;
mod ranked;

use std::sync::Arc;

use thiserror::Error;

use crate::config::Algorithm;
use crate::memory::{FrameId, FrameTable};
use crate::translation::Vpn;

pub use clock::Clock;
pub use lru::Lru;
pub use nfu::Nfu;
pub use optimal::{NextUse, Optimal, NEVER};
pub use ranked::RankedPages;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("the optimal policy needs the next-use table of the whole trace")]
    MissingLookahead,
}

pub trait EvictionPolicy {
    fn on_reference(&mut self, vpn: Vpn, resident: bool, position: usize);

    fn on_load(&mut self, vpn: Vpn, frame: FrameId, loaded_at: u64);

    /// Pick a resident page to evict. Only called when `frames` is full.
    fn select_victim(&mut self, frames: &FrameTable) -> Option<Vpn>;

    fn name(&self) -> &'static str;
}

/// The four replacement strategies behind one type
#[derive(Debug, Clone)]
pub enum Policy {
    Optimal(Optimal),
    Lru(Lru),
    Clock(Clock),
    Nfu(Nfu),
}

impl Policy {
    /// `next_use` is required for [`Algorithm::Opt`] and ignored otherwise.
    pub fn new(algorithm: Algorithm, next_use: Option<Arc<NextUse>>) -> Result<Self, PolicyError> {
        Ok(match algorithm {
            Algorithm::Opt => {
                let next_use = next_use.ok_or(PolicyError::MissingLookahead)?;
                Policy::Optimal(Optimal::new(next_use))
            }
            Algorithm::Lru => Policy::Lru(Lru::new()),
            Algorithm::Clock => Policy::Clock(Clock::new()),
            Algorithm::Nfu => Policy::Nfu(Nfu::new()),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Policy::Optimal(_) => Algorithm::Opt,
            Policy::Lru(_) => Algorithm::Lru,
            Policy::Clock(_) => Algorithm::Clock,
            Policy::Nfu(_) => Algorithm::Nfu,
        }
    }
}

impl EvictionPolicy for Policy {
    #[inline]
    fn on_reference(&mut self, vpn: Vpn, resident: bool, position: usize) {
        match self {
            Policy::Optimal(p) => p.on_reference(vpn, resident, position),
            Policy::Lru(p) => p.on_reference(vpn, resident, position),
            Policy::Clock(p) => p.on_reference(vpn, resident, position),
            Policy::Nfu(p) => p.on_reference(vpn, resident, position),
        }
    }

    #[inline]
    fn on_load(&mut self, vpn: Vpn, frame: FrameId, loaded_at: u64) {
        match self {
            Policy::Optimal(p) => p.on_load(vpn, frame, loaded_at),
            Policy::Lru(p) => p.on_load(vpn, frame, loaded_at),
            Policy::Clock(p) => p.on_load(vpn, frame, loaded_at),
            Policy::Nfu(p) => p.on_load(vpn, frame, loaded_at),
        }
    }

    fn select_victim(&mut self, frames: &FrameTable) -> Option<Vpn> {
        match self {
            Policy::Optimal(p) => p.select_victim(frames),
            Policy::Lru(p) => p.select_victim(frames),
            Policy::Clock(p) => p.select_victim(frames),
            Policy::Nfu(p) => p.select_victim(frames),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Policy::Optimal(p) => p.name(),
            Policy::Lru(p) => p.name(),
            Policy::Clock(p) => p.name(),
            Policy::Nfu(p) => p.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_requires_lookahead() {
        let err = Policy::new(Algorithm::Opt, None).unwrap_err();
        assert_eq!(err, PolicyError::MissingLookahead);

        let next_use = Arc::new(NextUse::build(&[1, 2, 1]));
        let policy = Policy::new(Algorithm::Opt, Some(next_use)).unwrap();
        assert_eq!(policy.algorithm(), Algorithm::Opt);
    }

    #[test]
    fn test_online_policies_ignore_lookahead() {
        for algorithm in [Algorithm::Lru, Algorithm::Clock, Algorithm::Nfu] {
            let policy = Policy::new(algorithm, None).unwrap();
            assert_eq!(policy.algorithm(), algorithm);
            assert_eq!(policy.name(), algorithm.as_str());
        }
    }

    #[test]
    fn test_dispatch_reaches_variant() {
        let mut policy = Policy::new(Algorithm::Nfu, None).unwrap();
        policy.on_load(3, 0, 0);
        policy.on_reference(3, true, 1);

        match &policy {
            Policy::Nfu(nfu) => assert_eq!(nfu.reference_count(3), Some(2)),
            other => panic!("unexpected variant {:?}", other.algorithm()),
        }

        let frames = FrameTable::new(1);
        assert_eq!(policy.select_victim(&frames), Some(3));
    }
}
