use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use thiserror::Error;

use crate::constants::NUM_PAGES;

/// Problems with the run setup. All of them are fatal before replay starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("number of frames must be at least 1")]
    ZeroFrames,

    #[error("number of frames {frames} exceeds the {max} pages of the address space")]
    TooManyFrames { frames: usize, max: usize },

    #[error("unknown algorithm '{0}', expected one of: opt, clock, lru, nfu")]
    UnknownAlgorithm(String),

    #[error("trace file not found: {}", .0.display())]
    TraceNotFound(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Algorithm {
    #[value(name = "opt")]
    Opt,
    #[value(name = "clock")]
    Clock,
    #[value(name = "lru")]
    Lru,
    #[value(name = "nfu")]
    Nfu,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [Algorithm::Opt, Algorithm::Clock, Algorithm::Lru, Algorithm::Nfu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Opt => "opt",
            Algorithm::Clock => "clock",
            Algorithm::Lru => "lru",
            Algorithm::Nfu => "nfu",
        }
    }

    /// Whether the policy needs the whole trace before replay
    pub fn needs_lookahead(&self) -> bool {
        matches!(self, Algorithm::Opt)
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opt" => Ok(Algorithm::Opt),
            "clock" => Ok(Algorithm::Clock),
            "lru" => Ok(Algorithm::Lru),
            "nfu" => Ok(Algorithm::Nfu),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When an eviction counts as a write to disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WriteBackMode {
    /// Every replacement made while all frames are occupied
    #[default]
    EveryEviction,
    /// Only replacements whose victim was written since it was loaded
    DirtyOnly,
}

/// Parameters of one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunConfig {
    frames: usize,
    algorithm: Algorithm,
    write_back: WriteBackMode,
}

impl RunConfig {
    /// More frames than pages could never be filled, so the count is capped
    /// at the size of the address space.
    pub fn new(frames: usize, algorithm: Algorithm) -> Result<Self, ConfigError> {
        if frames == 0 {
            return Err(ConfigError::ZeroFrames);
        }
        if frames > NUM_PAGES {
            return Err(ConfigError::TooManyFrames {
                frames,
                max: NUM_PAGES,
            });
        }
        Ok(RunConfig {
            frames,
            algorithm,
            write_back: WriteBackMode::default(),
        })
    }

    pub fn with_write_back(mut self, write_back: WriteBackMode) -> Self {
        self.write_back = write_back;
        self
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[inline]
    pub fn write_back(&self) -> WriteBackMode {
        self.write_back
    }
}
