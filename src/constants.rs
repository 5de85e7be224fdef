pub const ADDRESS_BITS: u32 = 32;
pub const PAGE_SHIFT: u32 = 13;
pub const VPN_BITS: u32 = ADDRESS_BITS - PAGE_SHIFT;

pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
pub const NUM_PAGES: usize = 1 << VPN_BITS;

pub const OFFSET_MASK: u32 = (1 << PAGE_SHIFT) - 1;
pub const VPN_MASK: u32 = (1 << VPN_BITS) - 1;

// width of one page-table entry as reported, not the in-memory layout
pub const PTE_SIZE_BYTES: usize = 4;
pub const PAGE_TABLE_BYTES: usize = NUM_PAGES * PTE_SIZE_BYTES;
