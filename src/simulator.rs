//! Trace replay.
//!
//! A [`Simulator`] owns everything one run mutates: the page and frame
//! tables, the replacement policy and the statistics. Runs never share
//! state, so independent configurations can be replayed in parallel with
//! [`simulate_many`].

use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{RunConfig, WriteBackMode};
use crate::io::TraceRecord;
use crate::memory::{FrameId, MemoryError, PhysicalMemory, Residency};
use crate::policy::{EvictionPolicy, NextUse, Policy, PolicyError};
use crate::report::Report;
use crate::translation::{VirtualAddress, Vpn};

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("internal invariant violated at trace position {position}: {source}")]
    Invariant {
        position: usize,
        #[source]
        source: MemoryError,
    },

    #[error("policy returned no victim at trace position {position} with all {frames} frames occupied")]
    NoVictim { position: usize, frames: usize },

    #[error("policy chose page {vpn:#x} at trace position {position} but it is not resident")]
    VictimNotResident { position: usize, vpn: Vpn },
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub faults: u64,
    pub hits: u64,
    pub reads: u64,
    pub writes: u64,
    /// Evictions counted as writes to disk under the run's write-back mode
    pub write_backs: u64,
    /// Every replacement made while all frames were occupied
    pub evictions: u64,
    /// Replacements whose victim had been written since it was loaded
    pub dirty_evictions: u64,
}

impl Statistics {
    /// Reads plus writes; an `M` record contributes one of each
    pub fn memory_accesses(&self) -> u64 {
        self.reads + self.writes
    }

    /// Records replayed so far
    pub fn references(&self) -> u64 {
        self.hits + self.faults
    }
}

/// What happened to one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Hit { frame: FrameId },
    /// Fault served from a free frame
    Fault { frame: FrameId },
    /// Fault that replaced a resident page
    Replace { frame: FrameId, victim: Vpn, dirty: bool },
}

impl Access {
    pub fn is_fault(&self) -> bool {
        !matches!(self, Access::Hit { .. })
    }
}

pub struct Simulator {
    config: RunConfig,
    memory: PhysicalMemory,
    policy: Policy,
    stats: Statistics,
    position: usize,
}

impl Simulator {
    /// `next_use` must be given when the algorithm is optimal, built from the
    /// same records that will be replayed.
    pub fn new(config: RunConfig, next_use: Option<Arc<NextUse>>) -> Result<Self, SimError> {
        let policy = Policy::new(config.algorithm(), next_use)?;
        Ok(Simulator {
            config,
            memory: PhysicalMemory::new(config.frames()),
            policy,
            stats: Statistics::default(),
            position: 0,
        })
    }

    /// Like [`Simulator::new`], building the lookahead from `records` when needed
    pub fn new_for_trace(config: RunConfig, records: &[TraceRecord]) -> Result<Self, SimError> {
        let next_use = config
            .algorithm()
            .needs_lookahead()
            .then(|| Arc::new(NextUse::from_records(records)));
        Self::new(config, next_use)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Records replayed so far; also the logical clock
    pub fn position(&self) -> usize {
        self.position
    }

    /// Replay one record
    pub fn step(&mut self, record: &TraceRecord) -> Result<Access, SimError> {
        let position = self.position;
        let tick = position as u64;
        let va = VirtualAddress::from_raw(record.address);
        let vpn = va.vpn;

        let access = match self.memory.lookup(vpn) {
            Residency::Resident(frame) => {
                self.stats.hits += 1;
                self.policy.on_reference(vpn, true, position);
                debug!(position, op = %record.op, vpn, frame, "hit");
                Access::Hit { frame }
            }
            Residency::NotResident => {
                self.stats.faults += 1;
                self.policy.on_reference(vpn, false, position);
                self.handle_fault(vpn, position, tick)?
            }
        };

        if record.op.is_read() {
            self.stats.reads += 1;
        }
        if record.op.is_write() {
            self.stats.writes += 1;
            self.memory
                .mark_dirty(vpn)
                .map_err(|source| SimError::Invariant { position, source })?;
        }

        self.position += 1;
        Ok(access)
    }

    fn handle_fault(&mut self, vpn: Vpn, position: usize, tick: u64) -> Result<Access, SimError> {
        let invariant = |source: MemoryError| SimError::Invariant { position, source };

        if let Some(frame) = self.memory.allocate_frame() {
            self.memory.bind(vpn, frame, tick).map_err(invariant)?;
            self.policy.on_load(vpn, frame, tick);
            debug!(position, vpn, frame, "page fault - no eviction");
            return Ok(Access::Fault { frame });
        }

        let victim = self
            .policy
            .select_victim(self.memory.frames())
            .ok_or(SimError::NoVictim {
                position,
                frames: self.config.frames(),
            })?;
        if self.memory.lookup(victim) == Residency::NotResident {
            return Err(SimError::VictimNotResident { position, vpn: victim });
        }

        let evicted = self.memory.unbind(victim).map_err(invariant)?;
        self.stats.evictions += 1;
        if evicted.dirty {
            self.stats.dirty_evictions += 1;
        }
        let write_back = match self.config.write_back() {
            WriteBackMode::EveryEviction => true,
            WriteBackMode::DirtyOnly => evicted.dirty,
        };
        if write_back {
            self.stats.write_backs += 1;
        }

        let frame = self.memory.allocate_frame().ok_or(SimError::NoVictim {
            position,
            frames: self.config.frames(),
        })?;
        self.memory.bind(vpn, frame, tick).map_err(invariant)?;
        self.policy.on_load(vpn, frame, tick);

        debug!(
            position,
            vpn,
            victim,
            frame,
            "page fault - evict {}",
            if evicted.dirty { "dirty" } else { "clean" }
        );

        Ok(Access::Replace {
            frame,
            victim,
            dirty: evicted.dirty,
        })
    }

    /// Replay every record in order
    pub fn run(&mut self, records: &[TraceRecord]) -> Result<&Statistics, SimError> {
        for record in records {
            self.step(record)?;
        }
        info!(
            algorithm = %self.config.algorithm(),
            frames = self.config.frames(),
            references = self.stats.references(),
            faults = self.stats.faults,
            write_backs = self.stats.write_backs,
            "simulation finished"
        );
        Ok(&self.stats)
    }

    pub fn report(&self) -> Report {
        Report::new(self.config, self.stats)
    }
}

/// Run one configuration over a whole trace
pub fn simulate(records: &[TraceRecord], config: RunConfig) -> Result<Report, SimError> {
    let mut sim = Simulator::new_for_trace(config, records)?;
    sim.run(records)?;
    Ok(sim.report())
}

/// Run several configurations over the same trace in parallel. The next-use
/// table is built once and shared. Reports come back in `configs` order.
pub fn simulate_many(records: &[TraceRecord], configs: &[RunConfig]) -> Result<Vec<Report>, SimError> {
    let next_use = configs
        .iter()
        .any(|c| c.algorithm().needs_lookahead())
        .then(|| Arc::new(NextUse::from_records(records)));

    configs
        .par_iter()
        .map(|&config| -> Result<Report, SimError> {
            let mut sim = Simulator::new(config, next_use.clone())?;
            sim.run(records)?;
            Ok(sim.report())
        })
        .collect()
}
