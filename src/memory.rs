use std::collections::{HashMap, VecDeque};

use thiserror::Error;

use crate::translation::Vpn;

/// Index of a physical frame
pub type FrameId = usize;

/// Violations of the page/frame bijection. These are programming errors in
/// the simulator, never caused by trace content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("page {vpn:#x} is already resident in frame {frame}")]
    PageAlreadyResident { vpn: Vpn, frame: FrameId },

    #[error("frame {frame} is already occupied by page {occupant:#x}")]
    FrameOccupied { frame: FrameId, occupant: Vpn },

    #[error("frame {frame} is out of range (capacity {capacity})")]
    FrameOutOfRange { frame: FrameId, capacity: usize },

    #[error("page {0:#x} is not resident")]
    PageNotResident(Vpn),

    #[error("frame {frame} holds page {found:#x} but the page table maps it to {expected:?}")]
    Mismatch {
        frame: FrameId,
        found: Vpn,
        expected: Option<FrameId>,
    },

    #[error("frame {frame} does not hold page {vpn:#x} (occupant {occupant:?})")]
    FrameNotHeldBy {
        frame: FrameId,
        vpn: Vpn,
        occupant: Option<Vpn>,
    },

    #[error("{resident} resident pages but {occupied} occupied frames")]
    CountMismatch { resident: usize, occupied: usize },
}

/// Per-page state. Policy bookkeeping lives with the policy, not here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTableEntry {
    pub resident: bool,
    pub frame: Option<FrameId>,
    /// Logical clock tick at which the page was last loaded
    pub loaded_at: u64,
    /// Written to since it was loaded
    pub dirty: bool,
}

/// Outcome of a page table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    Resident(FrameId),
    NotResident,
}

/// Sparse page table; entries are created on first bind.
#[derive(Debug, Default)]
pub struct PageTable {
    entries: HashMap<Vpn, PageTableEntry>,
    resident: usize,
}

impl PageTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn lookup(&self, vpn: Vpn) -> Residency {
        match self.entries.get(&vpn) {
            Some(PageTableEntry {
                resident: true,
                frame: Some(frame),
                ..
            }) => Residency::Resident(*frame),
            _ => Residency::NotResident,
        }
    }

    pub fn entry(&self, vpn: Vpn) -> Option<&PageTableEntry> {
        self.entries.get(&vpn)
    }

    /// Number of pages currently resident
    pub fn resident_count(&self) -> usize {
        self.resident
    }

    /// Number of distinct pages ever loaded
    pub fn touched_count(&self) -> usize {
        self.entries.len()
    }

    pub fn resident_pages(&self) -> impl Iterator<Item = (Vpn, &PageTableEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.resident)
            .map(|(&vpn, entry)| (vpn, entry))
    }
}

/// A physical frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub index: FrameId,
    pub occupant: Option<Vpn>,
}

/// Frames available for allocation. Frames are handed out lowest index
/// first, freed frames are reused in the order they were freed. Each frame
/// appears at most once.
#[derive(Debug, Clone)]
pub struct FreeFrameList {
    free: VecDeque<FrameId>,
}

impl FreeFrameList {
    pub fn new(capacity: usize) -> Self {
        FreeFrameList {
            free: (0..capacity).collect(),
        }
    }

    #[inline]
    pub fn pop(&mut self) -> Option<FrameId> {
        self.free.pop_front()
    }

    #[inline]
    pub fn push(&mut self, frame: FrameId) {
        self.free.push_back(frame);
    }

    /// Take `frame` out of the list, wherever it is
    pub fn remove(&mut self, frame: FrameId) -> bool {
        match self.free.iter().position(|&f| f == frame) {
            Some(i) => {
                self.free.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

/// Fixed-capacity array of physical frames.
///
/// Every frame is in exactly one state: free (in the free list), reserved
/// (handed out by [`FrameTable::allocate`] and not yet bound) or occupied.
#[derive(Debug, Clone)]
pub struct FrameTable {
    frames: Vec<Frame>,
    free: FreeFrameList,
    reserved: Vec<bool>,
    occupied: usize,
}

impl FrameTable {
    pub fn new(capacity: usize) -> Self {
        let frames = (0..capacity)
            .map(|index| Frame {
                index,
                occupant: None,
            })
            .collect();

        FrameTable {
            frames,
            free: FreeFrameList::new(capacity),
            reserved: vec![false; capacity],
            occupied: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// No frame left to allocate
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Frames that [`FrameTable::allocate`] can still hand out
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    #[inline]
    pub fn occupant(&self, frame: FrameId) -> Option<Vpn> {
        self.frames.get(frame).and_then(|f| f.occupant)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Reserve a free frame, or `None` when every frame is taken. The frame
    /// stays reserved until it is bound.
    pub fn allocate(&mut self) -> Option<FrameId> {
        let frame = self.free.pop()?;
        self.reserved[frame] = true;
        Some(frame)
    }

    fn occupy(&mut self, frame: FrameId, vpn: Vpn) -> Result<(), MemoryError> {
        let capacity = self.frames.len();
        let slot = self
            .frames
            .get_mut(frame)
            .ok_or(MemoryError::FrameOutOfRange { frame, capacity })?;
        if let Some(occupant) = slot.occupant {
            return Err(MemoryError::FrameOccupied { frame, occupant });
        }
        slot.occupant = Some(vpn);
        self.occupied += 1;

        // bound without allocate: still sitting in the free list
        if !std::mem::take(&mut self.reserved[frame]) {
            self.free.remove(frame);
        }
        Ok(())
    }

    fn release(&mut self, frame: FrameId, vpn: Vpn) -> Result<(), MemoryError> {
        let capacity = self.frames.len();
        let slot = self
            .frames
            .get_mut(frame)
            .ok_or(MemoryError::FrameOutOfRange { frame, capacity })?;
        match slot.occupant {
            Some(occupant) if occupant == vpn => {
                slot.occupant = None;
                self.occupied -= 1;
                self.free.push(frame);
                Ok(())
            }
            occupant => Err(MemoryError::FrameNotHeldBy {
                frame,
                vpn,
                occupant,
            }),
        }
    }
}

/// Frame table together with the page table that maps into it.
///
/// All residency changes go through [`PhysicalMemory::bind`] and
/// [`PhysicalMemory::unbind`], which keep occupied frames and resident pages
/// in one-to-one correspondence.
#[derive(Debug)]
pub struct PhysicalMemory {
    page_table: PageTable,
    frames: FrameTable,
}

impl PhysicalMemory {
    pub fn new(num_frames: usize) -> Self {
        PhysicalMemory {
            page_table: PageTable::new(),
            frames: FrameTable::new(num_frames),
        }
    }

    #[inline]
    pub fn lookup(&self, vpn: Vpn) -> Residency {
        self.page_table.lookup(vpn)
    }

    #[inline]
    pub fn allocate_frame(&mut self) -> Option<FrameId> {
        self.frames.allocate()
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    /// Load `vpn` into `frame`, normally one just returned by
    /// [`PhysicalMemory::allocate_frame`].
    pub fn bind(&mut self, vpn: Vpn, frame: FrameId, tick: u64) -> Result<(), MemoryError> {
        if let Residency::Resident(current) = self.page_table.lookup(vpn) {
            return Err(MemoryError::PageAlreadyResident {
                vpn,
                frame: current,
            });
        }

        self.frames.occupy(frame, vpn)?;

        self.page_table.entries.insert(
            vpn,
            PageTableEntry {
                resident: true,
                frame: Some(frame),
                loaded_at: tick,
                dirty: false,
            },
        );
        self.page_table.resident += 1;
        Ok(())
    }

    /// Evict `vpn` and return its frame to the free list. Returns the entry
    /// as it was just before eviction.
    pub fn unbind(&mut self, vpn: Vpn) -> Result<PageTableEntry, MemoryError> {
        let entry = match self.page_table.entries.get_mut(&vpn) {
            Some(entry) if entry.resident => entry,
            _ => return Err(MemoryError::PageNotResident(vpn)),
        };
        let before = *entry;
        let frame = before.frame.ok_or(MemoryError::PageNotResident(vpn))?;

        self.frames.release(frame, vpn)?;

        entry.resident = false;
        entry.frame = None;
        entry.dirty = false;
        self.page_table.resident -= 1;

        Ok(before)
    }

    /// Record a write to a resident page
    pub fn mark_dirty(&mut self, vpn: Vpn) -> Result<(), MemoryError> {
        match self.page_table.entries.get_mut(&vpn) {
            Some(entry) if entry.resident => {
                entry.dirty = true;
                Ok(())
            }
            _ => Err(MemoryError::PageNotResident(vpn)),
        }
    }

    /// Verify the page/frame bijection
    pub fn check_invariants(&self) -> Result<(), MemoryError> {
        let resident = self.page_table.resident_count();
        let occupied = self.frames.occupied_count();
        let actually_occupied = self
            .frames
            .frames()
            .iter()
            .filter(|f| f.occupant.is_some())
            .count();

        if resident != occupied || occupied != actually_occupied {
            return Err(MemoryError::CountMismatch { resident, occupied });
        }

        for frame in self.frames.frames() {
            if let Some(vpn) = frame.occupant {
                let mapped = self.page_table.entry(vpn).and_then(|e| e.frame);
                if mapped != Some(frame.index) {
                    return Err(MemoryError::Mismatch {
                        frame: frame.index,
                        found: vpn,
                        expected: mapped,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_initialization() {
        let mem = PhysicalMemory::new(4);
        assert_eq!(mem.frames().capacity(), 4);
        assert_eq!(mem.frames().occupied_count(), 0);
        assert_eq!(mem.page_table().resident_count(), 0);
        assert_eq!(mem.lookup(0), Residency::NotResident);
        assert!(mem.check_invariants().is_ok());
    }

    #[test]
    fn test_allocate_until_full() {
        let mut mem = PhysicalMemory::new(3);

        // Frames come out lowest index first
        assert_eq!(mem.allocate_frame(), Some(0));
        assert_eq!(mem.allocate_frame(), Some(1));
        assert!(!mem.frames().is_full());
        assert_eq!(mem.allocate_frame(), Some(2));
        assert_eq!(mem.allocate_frame(), None);

        // reserved but unbound frames still count as taken
        assert!(mem.frames().is_full());
        assert_eq!(mem.frames().available(), 0);
        assert_eq!(mem.frames().occupied_count(), 0);

        mem.bind(5, 1, 0).unwrap();
        assert_eq!(mem.frames().occupant(1), Some(5));
        assert!(mem.frames().is_full());
    }

    #[test]
    fn test_direct_bind_keeps_free_list_exact() {
        let mut mem = PhysicalMemory::new(2);

        for vpn in [7, 8, 9] {
            mem.bind(vpn, 0, 0).unwrap();
            assert_eq!(mem.frames().available(), 1);
            mem.unbind(vpn).unwrap();
            assert_eq!(mem.frames().available(), 2);
        }

        assert_eq!(mem.allocate_frame(), Some(1));
        assert_eq!(mem.allocate_frame(), Some(0));
        assert_eq!(mem.allocate_frame(), None);
        assert!(mem.check_invariants().is_ok());
    }

    #[test]
    fn test_release_reports_actual_occupant() {
        let mut mem = PhysicalMemory::new(2);
        mem.bind(7, 0, 0).unwrap();

        let err = mem.frames.release(0, 8).unwrap_err();
        assert_eq!(
            err,
            MemoryError::FrameNotHeldBy {
                frame: 0,
                vpn: 8,
                occupant: Some(7)
            }
        );
        assert!(err.to_string().contains("occupant Some(7)"));

        let err = mem.frames.release(1, 8).unwrap_err();
        assert_eq!(
            err,
            MemoryError::FrameNotHeldBy {
                frame: 1,
                vpn: 8,
                occupant: None
            }
        );
        assert_eq!(mem.frames().occupant(0), Some(7));
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut mem = PhysicalMemory::new(2);

        let frame = mem.allocate_frame().unwrap();
        mem.bind(7, frame, 11).unwrap();

        assert_eq!(mem.lookup(7), Residency::Resident(0));
        assert_eq!(mem.frames().occupant(0), Some(7));

        let entry = mem.page_table().entry(7).unwrap();
        assert!(entry.resident);
        assert_eq!(entry.loaded_at, 11);
        assert!(!entry.dirty);
        assert!(mem.check_invariants().is_ok());
    }

    #[test]
    fn test_bind_rejects_resident_page() {
        let mut mem = PhysicalMemory::new(2);
        mem.bind(7, 0, 0).unwrap();

        let err = mem.bind(7, 1, 1).unwrap_err();
        assert_eq!(err, MemoryError::PageAlreadyResident { vpn: 7, frame: 0 });
    }

    #[test]
    fn test_bind_rejects_occupied_frame() {
        let mut mem = PhysicalMemory::new(2);
        mem.bind(7, 0, 0).unwrap();

        let err = mem.bind(8, 0, 1).unwrap_err();
        assert_eq!(err, MemoryError::FrameOccupied { frame: 0, occupant: 7 });
        assert_eq!(mem.lookup(8), Residency::NotResident);
    }

    #[test]
    fn test_bind_rejects_frame_out_of_range() {
        let mut mem = PhysicalMemory::new(2);
        let err = mem.bind(7, 5, 0).unwrap_err();
        assert_eq!(err, MemoryError::FrameOutOfRange { frame: 5, capacity: 2 });
    }

    #[test]
    fn test_unbind_frees_frame_for_reuse() {
        let mut mem = PhysicalMemory::new(1);

        let frame = mem.allocate_frame().unwrap();
        mem.bind(3, frame, 0).unwrap();
        mem.mark_dirty(3).unwrap();
        assert_eq!(mem.allocate_frame(), None);

        let evicted = mem.unbind(3).unwrap();
        assert!(evicted.dirty);
        assert_eq!(evicted.frame, Some(0));

        assert_eq!(mem.lookup(3), Residency::NotResident);
        assert_eq!(mem.frames().occupant(0), None);
        assert_eq!(mem.allocate_frame(), Some(0));
        assert!(mem.check_invariants().is_ok());
    }

    #[test]
    fn test_unbind_non_resident() {
        let mut mem = PhysicalMemory::new(1);
        assert_eq!(mem.unbind(9), Err(MemoryError::PageNotResident(9)));

        mem.bind(9, 0, 0).unwrap();
        mem.unbind(9).unwrap();
        assert_eq!(mem.unbind(9), Err(MemoryError::PageNotResident(9)));
    }

    #[test]
    fn test_mark_dirty_requires_residency() {
        let mut mem = PhysicalMemory::new(1);
        assert_eq!(mem.mark_dirty(1), Err(MemoryError::PageNotResident(1)));
    }

    #[test]
    fn test_reload_clears_dirty_and_updates_tick() {
        let mut mem = PhysicalMemory::new(1);
        mem.bind(4, 0, 1).unwrap();
        mem.mark_dirty(4).unwrap();
        mem.unbind(4).unwrap();

        let frame = mem.allocate_frame().unwrap();
        mem.bind(4, frame, 9).unwrap();

        let entry = mem.page_table().entry(4).unwrap();
        assert!(!entry.dirty);
        assert_eq!(entry.loaded_at, 9);
        assert_eq!(mem.page_table().touched_count(), 1);
    }

    #[test]
    fn test_resident_pages() {
        let mut mem = PhysicalMemory::new(3);
        mem.bind(10, 0, 0).unwrap();
        mem.bind(20, 1, 1).unwrap();
        mem.bind(30, 2, 2).unwrap();
        mem.unbind(20).unwrap();

        let mut resident: Vec<Vpn> = mem.page_table().resident_pages().map(|(vpn, _)| vpn).collect();
        resident.sort_unstable();
        assert_eq!(resident, vec![10, 30]);
        assert_eq!(mem.page_table().resident_count(), 2);
        assert_eq!(mem.frames().occupied_count(), 2);
    }
}
