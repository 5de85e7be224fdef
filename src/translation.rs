use std::fmt;
use std::str::FromStr;

use crate::constants::*;

/// Virtual page number (`address >> PAGE_SHIFT`)
pub type Vpn = u32;

/// Represents the decomposed components of a Virtual Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: u32,
    pub vpn: Vpn,
    pub offset: u32,
}

impl VirtualAddress {
    /// Decompose a raw VA into its page number and page offset
    pub fn from_raw(va: u32) -> Self {
        let vpn = (va >> PAGE_SHIFT) & VPN_MASK;
        let offset = va & OFFSET_MASK;

        VirtualAddress { va, vpn, offset }
    }

    /// First address of the page this VA falls in
    #[inline]
    pub fn page_base(&self) -> u32 {
        self.vpn << PAGE_SHIFT
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VA({:#010x}) = (vpn={:#x}, offset={:#x})",
            self.va, self.vpn, self.offset
        )
    }
}

/// Kind of memory reference recorded in a trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `I`: instruction fetch
    Instruction,
    /// `L`: data load
    Load,
    /// `S`: data store
    Store,
    /// `M`: data modify (load followed by store)
    Modify,
}

impl Operation {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "I" => Some(Operation::Instruction),
            "L" => Some(Operation::Load),
            "S" => Some(Operation::Store),
            "M" => Some(Operation::Modify),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operation::Instruction => 'I',
            Operation::Load => 'L',
            Operation::Store => 'S',
            Operation::Modify => 'M',
        }
    }

    /// Counts toward the read tally
    #[inline]
    pub fn is_read(&self) -> bool {
        matches!(self, Operation::Instruction | Operation::Load | Operation::Modify)
    }

    /// Counts toward the write tally and dirties the page
    #[inline]
    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Store | Operation::Modify)
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::from_symbol(s).ok_or_else(|| format!("Unknown operation: {}", s))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
