use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

use crate::config::ConfigError;
use crate::translation::{Operation, VirtualAddress, Vpn};

#[derive(Debug, Error)]
pub enum TraceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read trace file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a trace line is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineDefect {
    #[error("fewer than two fields")]
    TooFewFields,
    #[error("unknown operation")]
    UnknownOperation,
    #[error("missing size field")]
    MissingSize,
    #[error("size is not a decimal number")]
    BadSize,
    #[error("address is not a 32-bit hex number")]
    BadAddress,
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// One validated memory reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub op: Operation,
    pub address: u32,
}

impl TraceRecord {
    pub fn new(op: Operation, address: u32) -> Self {
        TraceRecord { op, address }
    }

    #[inline]
    pub fn vpn(&self) -> Vpn {
        VirtualAddress::from_raw(self.address).vpn
    }

    /// Parse `<op> <hexAddress>,<size>`. The size is checked but unused.
    pub fn parse_line(line: &str) -> Result<Self, LineDefect> {
        let mut fields = line.split_whitespace();
        let (Some(op), Some(location)) = (fields.next(), fields.next()) else {
            return Err(LineDefect::TooFewFields);
        };

        let op = Operation::from_symbol(op).ok_or(LineDefect::UnknownOperation)?;

        let (address, size) = location.split_once(',').ok_or(LineDefect::MissingSize)?;
        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LineDefect::BadSize);
        }

        let digits = address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .unwrap_or(address);
        let address = u64::from_str_radix(digits, 16).map_err(|_| LineDefect::BadAddress)?;
        let address = u32::try_from(address).map_err(|_| LineDefect::BadAddress)?;

        Ok(TraceRecord { op, address })
    }
}

/// Validated trace records in file order, plus how many lines were dropped
#[derive(Debug, Clone, Default)]
pub struct TraceSource {
    records: Vec<TraceRecord>,
    skipped: usize,
}

impl TraceSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::TraceNotFound(path.to_path_buf()).into());
        }
        let content = fs::read(path).map_err(|source| TraceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse_bytes(&content))
    }

    pub fn parse(content: &str) -> Self {
        Self::parse_bytes(content.as_bytes())
    }

    /// Like [`TraceSource::parse`], decoding each line on its own so that a
    /// stray non-UTF-8 byte only costs the line it sits on.
    pub fn parse_bytes(content: &[u8]) -> Self {
        let mut source = TraceSource::default();

        for (number, line) in content.split(|&b| b == b'\n').enumerate() {
            if line.trim_ascii().is_empty() {
                continue;
            }
            let parsed = std::str::from_utf8(line)
                .map_err(|_| LineDefect::InvalidUtf8)
                .and_then(TraceRecord::parse_line);
            match parsed {
                Ok(record) => source.records.push(record),
                Err(defect) => {
                    trace!(line = number + 1, %defect, "skipping trace line");
                    source.skipped += 1;
                }
            }
        }

        source
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TraceRecord> {
        self.records
    }

    /// Non-blank lines that failed validation
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
