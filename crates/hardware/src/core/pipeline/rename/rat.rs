//! Rename tables: speculative and committed architectural→physical maps.
//!
//! Generalizes the teacher's [`super::super::scoreboard::Scoreboard`]
//! (one producer-tag entry per architectural register) into a true rename
//! map (one physical register per architectural register), plus a second,
//! always-correct committed copy restored wholesale on an exception flush,
//! and per-branch-tag snapshots of the speculative map restored on a
//! mispredict.

use super::freelist::PhysReg;

const NUM_AREGS: usize = 32;

/// Architectural→physical mapping, duplicated as speculative (updated at
/// rename) and committed (updated only at ROB commit) copies.
pub struct RenameMap {
    speculative: [PhysReg; NUM_AREGS],
    committed: [PhysReg; NUM_AREGS],
}

impl RenameMap {
    /// `x0..x31` start mapped to physical registers `0..31` (the reserved
    /// prefix [`super::freelist::FreeList::new`] carves out).
    pub fn new() -> Self {
        let mut identity = [PhysReg(0); NUM_AREGS];
        for (i, slot) in identity.iter_mut().enumerate() {
            *slot = PhysReg(i as u32);
        }
        Self { speculative: identity, committed: identity }
    }

    pub fn lookup_speculative(&self, areg: usize) -> PhysReg {
        self.speculative[areg]
    }

    pub fn lookup_committed(&self, areg: usize) -> PhysReg {
        self.committed[areg]
    }

    /// Renames `areg` to `new_preg` at dispatch, returning the physical
    /// register it previously mapped to (the uop's "old destination
    /// physical" for the free list, per §3).  `x0` is never renamed — it is
    /// hardwired to zero and dropping writes to it avoids ever handing out
    /// a physical register for it.
    pub fn rename(&mut self, areg: usize, new_preg: PhysReg) -> PhysReg {
        if areg == 0 {
            return PhysReg(0);
        }
        let old = self.speculative[areg];
        self.speculative[areg] = new_preg;
        old
    }

    /// Commits a rename: moves the committed map forward to match what the
    /// speculative map held at dispatch time for this uop.
    pub fn commit(&mut self, areg: usize, preg: PhysReg) {
        if areg != 0 {
            self.committed[areg] = preg;
        }
    }

    /// Rolls the speculative map back to the committed map, e.g. on an
    /// exception flush where no branch-tag snapshot applies.
    pub fn restore_from_committed(&mut self) {
        self.speculative = self.committed;
    }

    /// Takes a snapshot of the speculative map for a newly allocated branch
    /// tag.
    pub fn snapshot(&self) -> [PhysReg; NUM_AREGS] {
        self.speculative
    }

    /// Restores the speculative map from a prior snapshot on mispredict.
    pub fn restore(&mut self, snapshot: [PhysReg; NUM_AREGS]) {
        self.speculative = snapshot;
    }
}

impl Default for RenameMap {
    fn default() -> Self {
        Self::new()
    }
}
