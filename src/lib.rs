pub mod config;
pub mod constants;
pub mod io;
pub mod memory;
pub mod policy;
pub mod report;
pub mod simulator;
pub mod translation;

// Re-export commonly used items for convenience
pub use config::{Algorithm, ConfigError, RunConfig, WriteBackMode};
pub use constants::*;
pub use io::{TraceRecord, TraceSource};
pub use policy::{EvictionPolicy, NextUse, Policy};
pub use report::Report;
pub use simulator::{simulate, simulate_many, SimError, Simulator, Statistics};
pub use translation::{Operation, VirtualAddress, Vpn};
