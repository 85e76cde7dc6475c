//! Pipeline latch structures for inter-stage communication.
//!
//! This module defines the buffers that connect the ten stages of the
//! pipeline (Fetch1, Fetch2, Decode, Rename, Issue, Execute, Memory1,
//! Memory2, Writeback, Commit). It implements:
//! 1. **Instruction Flow:** Structures for carrying state between stages.
//! 2. **Superscalar Support:** Stages operate on `Vec<Entry>` for wide-issue.
//! 3. **Trap Propagation:** Carrying architectural exceptions and interrupts
//!    through the pipeline, tagged with the stage that raised them.

use crate::common::error::Trap;
use crate::common::ExceptionStage;
use crate::core::pipeline::rob::RobTag;
use crate::core::pipeline::signals::ControlSignals;

/// Entry in the Fetch1/Fetch2 pipeline latch.
///
/// Carries a fetched PC through I-TLB translation and branch prediction,
/// before the instruction bytes themselves have been read.
#[derive(Clone, Debug)]
pub struct Fetch1Fetch2Entry {
    /// Virtual program counter of the instruction.
    pub pc: u64,
    /// Physical address after I-TLB translation (0 if `trap` is set).
    pub paddr: u64,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Trap raised during PC generation or translation, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage that raised `trap`, if any.
    pub exception_stage: Option<ExceptionStage>,
    /// Global history register snapshot at fetch, for predictor training.
    pub ghr_snapshot: u64,
}

/// Entry in the Fetch2/Decode pipeline latch (I-cache result).
///
/// Contains instruction information fetched from memory, including the raw
/// encoding and branch prediction metadata.
#[derive(Clone, Debug)]
pub struct IfIdEntry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes (2 for compressed, 4 for standard).
    pub inst_size: u64,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Trap that occurred during fetch, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage that raised `trap`, if any.
    pub exception_stage: Option<ExceptionStage>,
    /// Global history register snapshot at fetch, for predictor training.
    pub ghr_snapshot: u64,
}

/// Entry in the Decode/Rename pipeline latch (decoded signals).
///
/// Contains decoded instruction information, including register indices,
/// immediate values, and control signals.
#[derive(Clone, Default, Debug)]
pub struct IdExEntry {
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// First source register index (rs1).
    pub rs1: usize,
    /// Second source register index (rs2).
    pub rs2: usize,
    /// Third source register index (rs3).
    pub rs3: usize,
    /// Destination register index (rd).
    pub rd: usize,
    /// Sign-extended immediate value.
    pub imm: i64,
    /// Value read from rs1 register.
    pub rv1: u64,
    /// Value read from rs2 register.
    pub rv2: u64,
    /// Value read from rs3 register.
    pub rv3: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred during decode, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage that raised `trap`, if any.
    pub exception_stage: Option<ExceptionStage>,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Global history register snapshot at fetch, for predictor training.
    pub ghr_snapshot: u64,
}

/// Entry in the Rename/Issue pipeline latch.
///
/// Produced by the rename stage once a ROB tag (and, for stores, a store
/// buffer slot) has been allocated. Operand values are read later, at
/// issue, so `rv1`/`rv2`/`rv3` start zeroed; `rs*_tag` carries the
/// scoreboard producer captured at rename time so issue knows what to wait
/// on.
#[derive(Clone, Debug)]
pub struct RenameIssueEntry {
    /// ROB tag allocated for this instruction.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// First source register index (rs1).
    pub rs1: usize,
    /// Second source register index (rs2).
    pub rs2: usize,
    /// Third source register index (rs3).
    pub rs3: usize,
    /// Destination register index (rd).
    pub rd: usize,
    /// Sign-extended immediate value.
    pub imm: i64,
    /// Value read from rs1 register (filled in at issue).
    pub rv1: u64,
    /// Value read from rs2 register (filled in at issue).
    pub rv2: u64,
    /// Value read from rs3 register (filled in at issue).
    pub rv3: u64,
    /// Producer ROB tag for rs1, if a producer is still in flight.
    pub rs1_tag: Option<RobTag>,
    /// Producer ROB tag for rs2, if a producer is still in flight.
    pub rs2_tag: Option<RobTag>,
    /// Producer ROB tag for rs3, if a producer is still in flight.
    pub rs3_tag: Option<RobTag>,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred upstream, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage that raised `trap`, if any.
    pub exception_stage: Option<ExceptionStage>,
    /// Whether the branch predictor predicted this instruction as taken.
    pub pred_taken: bool,
    /// Predicted target address for branch/jump instructions.
    pub pred_target: u64,
    /// Global history register snapshot at fetch, for predictor training.
    pub ghr_snapshot: u64,
}

/// Entry in the Execute/Memory1 pipeline latch.
///
/// Contains execution results, including ALU outputs and memory operation
/// parameters.
#[derive(Clone, Debug)]
pub struct ExMem1Entry {
    /// ROB tag of the instruction.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result or effective address for memory operations.
    pub alu: u64,
    /// Data to be stored (for store instructions).
    pub store_data: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred during execute, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage that raised `trap`, if any.
    pub exception_stage: Option<ExceptionStage>,
}

/// Entry in the Memory1/Memory2 pipeline latch (post address-translation).
#[derive(Clone, Debug)]
pub struct Mem1Mem2Entry {
    /// ROB tag of the instruction.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result (for non-memory instructions).
    pub alu: u64,
    /// Virtual address (for memory instructions).
    pub vaddr: u64,
    /// Translated physical address (for memory instructions).
    pub paddr: u64,
    /// Data to be stored (for store instructions).
    pub store_data: u64,
    /// Control signals for downstream pipeline stages.
    pub ctrl: ControlSignals,
    /// Trap that occurred during address translation, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage that raised `trap`, if any.
    pub exception_stage: Option<ExceptionStage>,
}

/// Entry in the Memory2/Writeback pipeline latch.
///
/// Contains memory stage results, including loaded data and final register
/// write values.
#[derive(Clone, Debug)]
pub struct Mem2WbEntry {
    /// ROB tag of the instruction.
    pub rob_tag: RobTag,
    /// Program counter of the instruction.
    pub pc: u64,
    /// 32-bit instruction encoding.
    pub inst: u32,
    /// Size of the instruction in bytes.
    pub inst_size: u64,
    /// Destination register index (rd).
    pub rd: usize,
    /// ALU computation result (for non-load instructions).
    pub alu: u64,
    /// Data loaded from memory (for load instructions).
    pub load_data: u64,
    /// Control signals for the writeback stage.
    pub ctrl: ControlSignals,
    /// Trap that occurred during memory access, if any.
    pub trap: Option<Trap>,
    /// Pipeline stage that raised `trap`, if any.
    pub exception_stage: Option<ExceptionStage>,
}
