//! Out-of-order backend: window-based issue, shared execute/memory/commit.
//!
//! Structurally this mirrors [`super::inorder::InOrderEngine`] — same ROB,
//! scoreboard, store buffer, and shared commit/writeback/memory1/memory2
//! stages. The only real difference is [`issue::O3IssueUnit`], which scans
//! the whole issue window instead of stalling on a blocked head-of-queue
//! entry. Rename still renames onto ROB tags via the scoreboard (no
//! physical register file / RAT); a tag-renaming scheme is enough to resolve
//! WAW/WAR hazards for either backend, so both share `rename_stage`.

pub mod issue;

use crate::config::Config;
use crate::core::Cpu;
use crate::core::pipeline::backend::inorder::execute;
use crate::core::pipeline::backend::shared::{commit, memory1, memory2, writeback};
use crate::core::pipeline::engine::ExecutionEngine;
use crate::core::pipeline::latches::{ExMem1Entry, Mem1Mem2Entry, Mem2WbEntry, RenameIssueEntry};
use crate::core::pipeline::rob::Rob;
use crate::core::pipeline::scoreboard::Scoreboard;
use crate::core::pipeline::store_buffer::StoreBuffer;

use self::issue::O3IssueUnit;

/// Out-of-order execution engine.
pub struct O3Engine {
    /// Reorder buffer.
    pub rob: Rob,
    /// Store buffer.
    pub store_buffer: StoreBuffer,
    /// Tag-based register scoreboard.
    pub scoreboard: Scoreboard,
    /// Window issue unit (wakeup/select over the whole queue).
    pub issuer: O3IssueUnit,
    /// Pipeline width.
    pub width: usize,
    /// Execute -> Memory1 latch.
    pub execute_mem1: Vec<ExMem1Entry>,
    /// Memory1 -> Memory2 latch.
    pub mem1_mem2: Vec<Mem1Mem2Entry>,
    /// Memory2 -> Writeback latch.
    pub mem2_wb: Vec<Mem2WbEntry>,
    /// Memory1 stall counter (D-TLB / D-cache latency).
    pub mem1_stall: u64,
}

impl O3Engine {
    /// Creates a new out-of-order engine from config.
    ///
    /// The issue window is sized to the ROB, not `issue_width`: instructions
    /// can sit in the window far longer than one cycle waiting for an
    /// operand, so the window must hold as many in-flight instructions as
    /// the ROB can.
    pub fn new(config: &Config) -> Self {
        let width = config.pipeline.issue_width;
        Self {
            rob: Rob::new(config.pipeline.rob_num),
            store_buffer: StoreBuffer::new(config.pipeline.stq_num),
            scoreboard: Scoreboard::new(),
            issuer: O3IssueUnit::new(config.pipeline.rob_num),
            width,
            execute_mem1: Vec::with_capacity(width),
            mem1_mem2: Vec::with_capacity(width),
            mem2_wb: Vec::with_capacity(width),
            mem1_stall: 0,
        }
    }
}

impl ExecutionEngine for O3Engine {
    fn tick(&mut self, cpu: &mut Cpu, rename_output: &mut Vec<RenameIssueEntry>) {
        // Backend stages run in reverse order (drain from commit to issue),
        // identical to the in-order engine — commit is always in program
        // order regardless of how issue picked instructions.

        let trap_event = commit::commit_stage(
            cpu,
            &mut self.rob,
            &mut self.store_buffer,
            &mut self.scoreboard,
            self.width,
        );

        if let Some((trap, pc)) = trap_event {
            if cpu.trace {
                eprintln!("BE  * HANDLING TRAP: {:?} at PC {:#x}", trap, pc);
            }
            self.flush(cpu);
            cpu.trap(trap, pc);
            return;
        }

        writeback::writeback_stage(cpu, &mut self.mem2_wb, &mut self.rob);

        memory2::memory2_stage(
            cpu,
            &mut self.mem1_mem2,
            &mut self.mem2_wb,
            &mut self.store_buffer,
            &mut self.rob,
        );

        if self.mem1_stall > 0 {
            self.mem1_stall -= 1;
        } else {
            memory1::memory1_stage(
                cpu,
                &mut self.execute_mem1,
                &mut self.mem1_mem2,
                &mut self.mem1_stall,
            );
        }

        let backpressured = !self.execute_mem1.is_empty();

        if cpu.trace && (backpressured || self.mem1_stall > 0) {
            eprintln!(
                "BE  backpressure={} mem1_stall={} ex_mem1={} iq={}",
                backpressured,
                self.mem1_stall,
                self.execute_mem1.len(),
                self.issuer.available_slots()
            );
        }

        // Issue + Execute: the window issuer may select instructions out of
        // program order, but always returns them sorted by ROB tag so the
        // shared execute stage's flush short-circuit still lands on the
        // oldest flush-causing instruction in the batch.
        let (results, needs_flush) = if backpressured {
            (Vec::new(), false)
        } else {
            let issued = self.issuer.select(self.width, &self.rob, cpu);
            execute::execute_inorder(cpu, issued, &mut self.rob)
        };
        self.execute_mem1.extend(results);

        if needs_flush {
            self.issuer.flush();
            rename_output.clear();
            self.mem1_stall = 0;
            if let Some(last) = self.execute_mem1.last() {
                let keep_tag = last.rob_tag;
                self.rob.flush_after(keep_tag);
                self.store_buffer.flush_after(keep_tag);
            }
            self.scoreboard.rebuild_from_rob(&self.rob);
        }

        if !needs_flush && !backpressured {
            let rename_entries = std::mem::take(rename_output);
            if !rename_entries.is_empty() {
                self.issuer.dispatch(rename_entries);
            }
        }
    }

    fn can_accept(&self) -> usize {
        let rob_free = self.rob.free_slots();
        let sb_free = self.store_buffer.free_slots();
        let issue_free = self.issuer.available_slots();
        rob_free.min(sb_free).min(issue_free).min(self.width)
    }

    fn flush(&mut self, _cpu: &mut Cpu) {
        self.rob.flush_all();
        self.store_buffer.flush_speculative();
        self.scoreboard.flush();
        self.issuer.flush();
        self.execute_mem1.clear();
        self.mem1_mem2.clear();
        self.mem2_wb.clear();
        self.mem1_stall = 0;
    }

    fn read_csr_speculative(&self, cpu: &crate::core::Cpu, addr: u32) -> u64 {
        cpu.csr_read(addr)
    }

    fn rob(&self) -> &Rob {
        &self.rob
    }

    fn rob_mut(&mut self) -> &mut Rob {
        &mut self.rob
    }

    fn store_buffer(&self) -> &StoreBuffer {
        &self.store_buffer
    }

    fn store_buffer_mut(&mut self) -> &mut StoreBuffer {
        &mut self.store_buffer
    }

    fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    fn scoreboard_mut(&mut self) -> &mut Scoreboard {
        &mut self.scoreboard
    }
}
