//! Out-of-order issue window: wakeup/select over the whole queue.
//!
//! Unlike the in-order FIFO issuer, a blocked entry does not stall everything
//! behind it. Each cycle the whole window is scanned for entries whose
//! operands are ready (via the tags captured at rename); up to `width` are
//! selected and removed from the window. Selected entries are returned
//! sorted by ROB tag (program order) so the shared execute stage's
//! first-flush-wins short-circuit still corresponds to the oldest
//! flush-causing instruction in the batch.

use crate::core::Cpu;
use crate::core::pipeline::backend::shared::operand::read_operand_by_tag;
use crate::core::pipeline::latches::RenameIssueEntry;
use crate::core::pipeline::rob::Rob;

/// Out-of-order issue window.
pub struct O3IssueUnit {
    window: Vec<RenameIssueEntry>,
    capacity: usize,
}

impl O3IssueUnit {
    /// Creates a new issue window with the given capacity.
    ///
    /// As with the in-order issuer, capacity must be at least the ROB size
    /// so a backend stall can never force rename to drop entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            window: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Accept dispatched instructions from rename.
    pub fn dispatch(&mut self, entries: Vec<RenameIssueEntry>) {
        for entry in entries {
            if self.window.len() < self.capacity {
                self.window.push(entry);
            }
        }
    }

    /// Select up to `width` ready entries from anywhere in the window.
    ///
    /// Entries with a pending trap are always ready (they carry no real
    /// operands). Selected entries are removed from the window and returned
    /// sorted by ROB tag, oldest first.
    pub fn select(&mut self, width: usize, rob: &Rob, cpu: &Cpu) -> Vec<RenameIssueEntry> {
        if width == 0 || self.window.is_empty() {
            return Vec::new();
        }

        let mut ready_idx = Vec::with_capacity(width);
        for (i, entry) in self.window.iter().enumerate() {
            if ready_idx.len() == width {
                break;
            }
            if entry.trap.is_some() {
                ready_idx.push(i);
                continue;
            }

            let rv1 = read_operand_by_tag(entry.rs1, entry.ctrl.rs1_fp, entry.rs1_tag, rob, cpu);
            let rv2 = read_operand_by_tag(entry.rs2, entry.ctrl.rs2_fp, entry.rs2_tag, rob, cpu);
            let rv3 = if entry.ctrl.rs3_fp {
                read_operand_by_tag(entry.rs3, true, entry.rs3_tag, rob, cpu)
            } else {
                Some(0)
            };

            if rv1.is_some() && rv2.is_some() && rv3.is_some() {
                ready_idx.push(i);
            }
        }

        if ready_idx.is_empty() {
            return Vec::new();
        }

        // Remove selected indices from the window, highest index first so
        // earlier indices stay valid as we remove.
        let mut selected = Vec::with_capacity(ready_idx.len());
        for &i in ready_idx.iter().rev() {
            selected.push(self.window.swap_remove(i));
        }

        for entry in &mut selected {
            if entry.trap.is_some() {
                continue;
            }
            entry.rv1 =
                read_operand_by_tag(entry.rs1, entry.ctrl.rs1_fp, entry.rs1_tag, rob, cpu)
                    .unwrap_or(0);
            entry.rv2 =
                read_operand_by_tag(entry.rs2, entry.ctrl.rs2_fp, entry.rs2_tag, rob, cpu)
                    .unwrap_or(0);
            entry.rv3 = if entry.ctrl.rs3_fp {
                read_operand_by_tag(entry.rs3, true, entry.rs3_tag, rob, cpu).unwrap_or(0)
            } else {
                0
            };
        }

        selected.sort_by_key(|e| e.rob_tag.0);
        selected
    }

    /// How many slots are available for dispatch?
    pub fn available_slots(&self) -> usize {
        self.capacity - self.window.len()
    }

    /// Flush all entries.
    pub fn flush(&mut self) {
        self.window.clear();
    }
}
