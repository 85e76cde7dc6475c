//! Store queue (STQ).
//!
//! Circular buffer allocated in program order at dispatch, grounded on
//! `core/pipeline/store_buffer.rs`'s `StoreBuffer` (head/tail/count idiom,
//! `flush_speculative`'s keep-only-committed walk). Generalized per §4.8:
//! address and data resolve independently (STA vs STD are separate
//! functional-unit roles), entries carry a `br_mask` for speculative kill
//! instead of being flushed by ROB-tag ordinal comparison, and retirement is
//! gated on the data cache accepting the write rather than an unconditional
//! drain.

use crate::common::PhysAddr;

/// Index of a slot in the store queue, stable across reallocation until the
/// slot is retired or flushed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StqIdx(pub usize);

#[derive(Clone, Debug, Default)]
struct StqEntry {
    rob_tag: u32,
    br_mask: u8,
    vaddr: u32,
    paddr: Option<PhysAddr>,
    data: u32,
    wstrb: u8,
    data_valid: bool,
    committed: bool,
    valid: bool,
}

/// A store ready to retire to memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetiredStore {
    pub paddr: PhysAddr,
    pub data: u32,
    pub wstrb: u8,
}

/// Result of a store-to-load forward lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardResult {
    /// The youngest overlapping store fully covers the load's byte lanes.
    Hit(u32),
    /// No older store's address range overlaps the load at all.
    Miss,
    /// An older store overlaps only partially; the load must wait for it to drain.
    Stall,
}

pub struct Stq {
    entries: Vec<StqEntry>,
    head: usize,
    tail: usize,
    count: usize,
}

impl Stq {
    pub fn new(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, StqEntry::default);
        Self {
            entries,
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Allocates the next slot in program order. Returns `None` if full.
    /// `tail_marker` is this allocation's index, to be handed to later loads
    /// as the forwarding boundary (see [`Self::forward`]).
    pub fn allocate(&mut self, rob_tag: u32, br_mask: u8) -> Option<StqIdx> {
        if self.is_full() {
            return None;
        }
        let idx = self.tail;
        self.entries[idx] = StqEntry {
            rob_tag,
            br_mask,
            vaddr: 0,
            paddr: None,
            data: 0,
            wstrb: 0,
            data_valid: false,
            committed: false,
            valid: true,
        };
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        Some(StqIdx(idx))
    }

    /// The index the next allocation would receive, i.e. the forwarding
    /// boundary a load dispatched this cycle should record.
    pub fn next_alloc_idx(&self) -> StqIdx {
        StqIdx(self.tail)
    }

    /// STA execute: resolves the physical address and byte-lane mask.
    pub fn resolve_addr(&mut self, idx: StqIdx, paddr: PhysAddr, wstrb: u8) {
        let e = &mut self.entries[idx.0];
        e.paddr = Some(paddr);
        e.wstrb = wstrb;
    }

    /// STD execute: resolves the store's data word.
    pub fn resolve_data(&mut self, idx: StqIdx, data: u32) {
        let e = &mut self.entries[idx.0];
        e.data = data;
        e.data_valid = true;
    }

    /// ROB commit of the store at the STQ head. Commit is always in program
    /// order and the STQ is allocated in program order, so the instruction
    /// committing a store is always the current STQ head.
    pub fn commit_head(&mut self) {
        if self.count > 0 {
            self.entries[self.head].committed = true;
        }
    }

    /// If the head entry is committed and fully resolved, pops and returns
    /// it for the caller to drive onto the cache write channel. The caller
    /// is responsible for only calling this when the cache is ready to
    /// accept the write — on backpressure, call again next cycle.
    pub fn retire(&mut self) -> Option<RetiredStore> {
        if self.count == 0 {
            return None;
        }
        let e = &self.entries[self.head];
        if !e.committed || !e.data_valid {
            return None;
        }
        let Some(paddr) = e.paddr else { return None };

        let retired = RetiredStore {
            paddr,
            data: e.data,
            wstrb: e.wstrb,
        };
        self.entries[self.head].valid = false;
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        Some(retired)
    }

    /// Store-to-load forwarding for a load whose STQ allocation boundary was
    /// `upto` (entries at or after this index postdate the load and must not
    /// be considered). Searches youngest-to-oldest among the remaining
    /// entries so the most recent overlapping store wins.
    pub fn forward(&self, paddr: PhysAddr, load_bytes: u32, upto: StqIdx) -> ForwardResult {
        let load_start = paddr.val();
        let load_end = load_start + load_bytes;

        let mut idx = if upto.0 == 0 {
            self.entries.len() - 1
        } else {
            upto.0 - 1
        };

        for _ in 0..self.entries.len() {
            if idx == self.head && self.count == 0 {
                break;
            }
            let e = &self.entries[idx];
            if e.valid {
                if let Some(store_paddr) = e.paddr {
                    let store_bytes = e.wstrb.count_ones();
                    let store_start = store_paddr.val();
                    let store_end = store_start + store_bytes.max(1);

                    if load_start < store_end && load_end > store_start {
                        if store_start <= load_start && store_end >= load_end && e.data_valid {
                            let offset = load_start - store_start;
                            return ForwardResult::Hit((e.data >> (offset * 8)) & byte_mask(load_bytes));
                        }
                        return ForwardResult::Stall;
                    }
                }
            }
            if idx == self.head {
                break;
            }
            idx = if idx == 0 { self.entries.len() - 1 } else { idx - 1 };
        }

        ForwardResult::Miss
    }

    /// Branch-mask kill: drops every uncommitted entry whose `br_mask`
    /// intersects `kill_mask`. Committed entries always survive (they're
    /// already architecturally visible and just waiting to drain).
    pub fn flush(&mut self, kill_mask: u8) {
        self.retain_matching(|e| e.committed || (e.br_mask & kill_mask) == 0);
    }

    /// Clears `clear_mask` bits from every surviving entry's `br_mask` once
    /// those branches resolve correctly.
    pub fn clear_br(&mut self, clear_mask: u8) {
        let cap = self.entries.len();
        let mut idx = self.head;
        for _ in 0..self.count {
            self.entries[idx].br_mask &= !clear_mask;
            idx = (idx + 1) % cap;
        }
    }

    /// ROB flush on exception: drop all uncommitted entries, keep committed
    /// ones to drain.
    pub fn flush_uncommitted(&mut self) {
        self.retain_matching(|e| e.committed);
    }

    fn retain_matching(&mut self, keep: impl Fn(&StqEntry) -> bool) {
        if self.count == 0 {
            return;
        }
        let cap = self.entries.len();
        let mut new_tail = self.head;
        let mut new_count = 0;
        let mut idx = self.head;

        for _ in 0..self.count {
            if self.entries[idx].valid && keep(&self.entries[idx]) {
                if idx != new_tail {
                    self.entries[new_tail] = self.entries[idx].clone();
                    self.entries[idx].valid = false;
                }
                new_tail = (new_tail + 1) % cap;
                new_count += 1;
            } else {
                self.entries[idx].valid = false;
            }
            idx = (idx + 1) % cap;
        }

        self.tail = new_tail;
        self.count = new_count;
    }
}

fn byte_mask(bytes: u32) -> u32 {
    if bytes >= 4 {
        u32::MAX
    } else {
        (1u32 << (bytes * 8)) - 1
    }
}
