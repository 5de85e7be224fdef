use std::fmt;

use crate::config::{Algorithm, RunConfig, WriteBackMode};
use crate::constants::PAGE_TABLE_BYTES;
use crate::simulator::Statistics;

/// Summary of one finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub config: RunConfig,
    pub stats: Statistics,
}

impl Report {
    pub fn new(config: RunConfig, stats: Statistics) -> Self {
        Report { config, stats }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm()
    }

    pub fn frames(&self) -> usize {
        self.config.frames()
    }

    /// Size of a dense page table covering the whole address space. Does
    /// not depend on the frame count or on how many pages were touched.
    pub fn page_table_bytes(&self) -> usize {
        PAGE_TABLE_BYTES
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Algorithm: {}", self.algorithm())?;
        writeln!(f, "Number of frames:       {}", self.frames())?;
        writeln!(f, "Total memory accesses:  {}", self.stats.memory_accesses())?;
        writeln!(f, "Total page faults:      {}", self.stats.faults)?;
        writeln!(f, "Total writes to disk:   {}", self.stats.write_backs)?;
        if self.config.write_back() == WriteBackMode::DirtyOnly {
            writeln!(f, "Total evictions:        {}", self.stats.evictions)?;
        }
        write!(f, "Total size of page table: {} bytes", self.page_table_bytes())
    }
}
