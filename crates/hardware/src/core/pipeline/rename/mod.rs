//! Physical-register renaming: free list, rename maps, and the branch-tag
//! pool that snapshots them.
//!
//! Supersedes [`super::scoreboard::Scoreboard`] for the out-of-order
//! target: the teacher's scoreboard tracks "which ROB tag will produce
//! this architectural register's next value" for an engine that reads
//! operands at issue time out of the ROB itself; true renaming instead
//! gives every in-flight definition its own physical register up front; no
//! tags need to be threaded through the scoreboard afterward.

pub mod brtag;
pub mod freelist;
pub mod rat;

use brtag::BranchTagPool;
use freelist::{FreeList, PhysReg};
use rat::RenameMap;

/// A snapshot taken when a branch is decoded: the speculative rename map
/// and free-list state needed to roll back on mispredict.
pub struct BranchSnapshot {
    pub rat: [PhysReg; 32],
    pub free_count: usize,
}

/// Ties the free list, rename map, and branch-tag pool together behind
/// the operations dispatch actually needs: allocate-and-rename a
/// destination, snapshot on a branch, and roll back on mispredict.
pub struct RenameEngine {
    pub free_list: FreeList,
    pub rat: RenameMap,
    pub br_tags: BranchTagPool,
    snapshots: [Option<BranchSnapshot>; 8],
}

impl RenameEngine {
    pub fn new(prf_size: usize, max_br_num: usize) -> Self {
        Self {
            free_list: FreeList::new(prf_size),
            rat: RenameMap::new(),
            br_tags: BranchTagPool::new(max_br_num),
            snapshots: std::array::from_fn(|_| None),
        }
    }

    /// Allocates a branch tag and snapshots the current rename state under
    /// it, per §3's "Per-branch-tag snapshots of the speculative map...
    /// restored on mispredict".
    pub fn allocate_branch(&mut self) -> Option<u8> {
        let tag = self.br_tags.allocate()?;
        self.snapshots[tag as usize] = Some(BranchSnapshot {
            rat: self.rat.snapshot(),
            free_count: self.free_list.free_count(),
        });
        Some(tag)
    }

    /// Rolls the rename map back to the state at `tag`'s snapshot and frees
    /// the tag. Physical registers allocated after the snapshot are left
    /// busy; the caller (ROB flush) is responsible for releasing them back
    /// to the free list, since only it knows which uops those were.
    pub fn rollback_branch(&mut self, tag: u8) -> Result<(), crate::common::error::FatalError> {
        let snap = self.snapshots[tag as usize]
            .take()
            .ok_or(crate::common::error::FatalError::BranchTagNotFound(tag))?;
        self.rat.restore(snap.rat);
        self.br_tags.free(tag)?;
        Ok(())
    }

    /// Frees a correctly-predicted branch's tag without rolling anything
    /// back.
    pub fn retire_branch(&mut self, tag: u8) -> Result<(), crate::common::error::FatalError> {
        self.snapshots[tag as usize] = None;
        self.br_tags.free(tag)
    }
}
