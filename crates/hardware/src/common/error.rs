//! Trap, fatal-error, and translation-result definitions.
//!
//! 1. **Trap Representation:** Synchronous exceptions and asynchronous interrupts,
//!    surfaced only through commit-time architectural state (never via a Rust panic).
//! 2. **Fatal Errors:** Internal invariant violations that abort the simulator.
//! 3. **Translation Results:** Outcome of a Sv32 virtual-to-physical translation.

use std::fmt;

use super::addr::PhysAddr;

/// RISC-V trap types representing exceptions and interrupts.
///
/// Traps are carried on a uop from decode/LSU and promoted to architectural
/// state only at ROB commit; nothing in this enum ever unwinds the host stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trap {
    /// Instruction address misaligned (JAL/JALR/branch target not 4-byte aligned).
    InstructionAddressMisaligned(u32),
    /// Instruction fetch access fault (address outside any claimed range).
    InstructionAccessFault(u32),
    /// Illegal instruction encoding.
    IllegalInstruction(u32),
    /// `EBREAK`.
    Breakpoint(u32),
    /// Load address misaligned.
    LoadAddressMisaligned(u32),
    /// Load access fault.
    LoadAccessFault(u32),
    /// Store/AMO address misaligned.
    StoreAddressMisaligned(u32),
    /// Store/AMO access fault.
    StoreAccessFault(u32),
    /// `ECALL` from U-mode.
    EnvironmentCallFromUMode,
    /// `ECALL` from S-mode.
    EnvironmentCallFromSMode,
    /// `ECALL` from M-mode.
    EnvironmentCallFromMMode,
    /// Instruction page fault (Sv32 walk failure on fetch).
    InstructionPageFault(u32),
    /// Load page fault.
    LoadPageFault(u32),
    /// Store/AMO page fault.
    StorePageFault(u32),
    /// Machine software interrupt.
    MachineSoftwareInterrupt,
    /// Machine timer interrupt.
    MachineTimerInterrupt,
    /// Machine external interrupt.
    MachineExternalInterrupt,
    /// Supervisor software interrupt.
    SupervisorSoftwareInterrupt,
    /// Supervisor timer interrupt.
    SupervisorTimerInterrupt,
    /// Supervisor external interrupt.
    SupervisorExternalInterrupt,
}

impl Trap {
    /// Returns the `mcause`/`scause` exception code for this trap (bit 31 clear for
    /// exceptions, set for interrupts — interrupts OR this with [`super::constants::CAUSE_INTERRUPT_BIT`]).
    pub fn cause_code(self) -> u32 {
        match self {
            Trap::InstructionAddressMisaligned(_) => 0,
            Trap::InstructionAccessFault(_) => 1,
            Trap::IllegalInstruction(_) => 2,
            Trap::Breakpoint(_) => 3,
            Trap::LoadAddressMisaligned(_) => 4,
            Trap::LoadAccessFault(_) => 5,
            Trap::StoreAddressMisaligned(_) => 6,
            Trap::StoreAccessFault(_) => 7,
            Trap::EnvironmentCallFromUMode => 8,
            Trap::EnvironmentCallFromSMode => 9,
            Trap::EnvironmentCallFromMMode => 11,
            Trap::InstructionPageFault(_) => 12,
            Trap::LoadPageFault(_) => 13,
            Trap::StorePageFault(_) => 15,
            Trap::SupervisorSoftwareInterrupt => 1,
            Trap::MachineSoftwareInterrupt => 3,
            Trap::SupervisorTimerInterrupt => 5,
            Trap::MachineTimerInterrupt => 7,
            Trap::SupervisorExternalInterrupt => 9,
            Trap::MachineExternalInterrupt => 11,
        }
    }

    /// Returns the value that belongs in `mtval`/`stval` for this trap, if any.
    pub fn tval(self) -> u32 {
        match self {
            Trap::InstructionAddressMisaligned(v)
            | Trap::InstructionAccessFault(v)
            | Trap::IllegalInstruction(v)
            | Trap::Breakpoint(v)
            | Trap::LoadAddressMisaligned(v)
            | Trap::LoadAccessFault(v)
            | Trap::StoreAddressMisaligned(v)
            | Trap::StoreAccessFault(v)
            | Trap::InstructionPageFault(v)
            | Trap::LoadPageFault(v)
            | Trap::StorePageFault(v) => v,
            _ => 0,
        }
    }

    /// Whether this trap is an asynchronous interrupt rather than a synchronous exception.
    pub fn is_interrupt(self) -> bool {
        matches!(
            self,
            Trap::MachineSoftwareInterrupt
                | Trap::MachineTimerInterrupt
                | Trap::MachineExternalInterrupt
                | Trap::SupervisorSoftwareInterrupt
                | Trap::SupervisorTimerInterrupt
                | Trap::SupervisorExternalInterrupt
        )
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::InstructionAddressMisaligned(a) => {
                write!(f, "instruction address misaligned ({a:#x})")
            }
            Trap::InstructionAccessFault(a) => write!(f, "instruction access fault ({a:#x})"),
            Trap::IllegalInstruction(i) => write!(f, "illegal instruction ({i:#010x})"),
            Trap::Breakpoint(pc) => write!(f, "breakpoint ({pc:#x})"),
            Trap::LoadAddressMisaligned(a) => write!(f, "load address misaligned ({a:#x})"),
            Trap::LoadAccessFault(a) => write!(f, "load access fault ({a:#x})"),
            Trap::StoreAddressMisaligned(a) => write!(f, "store address misaligned ({a:#x})"),
            Trap::StoreAccessFault(a) => write!(f, "store access fault ({a:#x})"),
            Trap::EnvironmentCallFromUMode => write!(f, "ecall from U-mode"),
            Trap::EnvironmentCallFromSMode => write!(f, "ecall from S-mode"),
            Trap::EnvironmentCallFromMMode => write!(f, "ecall from M-mode"),
            Trap::InstructionPageFault(a) => write!(f, "instruction page fault ({a:#x})"),
            Trap::LoadPageFault(a) => write!(f, "load page fault ({a:#x})"),
            Trap::StorePageFault(a) => write!(f, "store page fault ({a:#x})"),
            Trap::MachineSoftwareInterrupt => write!(f, "machine software interrupt"),
            Trap::MachineTimerInterrupt => write!(f, "machine timer interrupt"),
            Trap::MachineExternalInterrupt => write!(f, "machine external interrupt"),
            Trap::SupervisorSoftwareInterrupt => write!(f, "supervisor software interrupt"),
            Trap::SupervisorTimerInterrupt => write!(f, "supervisor timer interrupt"),
            Trap::SupervisorExternalInterrupt => write!(f, "supervisor external interrupt"),
        }
    }
}

impl std::error::Error for Trap {}

/// The pipeline stage that raised a trap carried on a uop.
///
/// Recorded alongside the trap itself so commit-time trap dispatch can pick
/// the right architectural PC/instruction semantics (e.g. a fetch fault's
/// faulting address is the PC itself; a memory fault's is the uop's
/// computed effective address).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionStage {
    /// Raised during Fetch1/Fetch2 (I-TLB miss, fetch access fault).
    Fetch,
    /// Raised during Decode (illegal instruction encoding).
    Decode,
    /// Raised during Execute (EBREAK, ECALL, illegal CSR/system access).
    Execute,
    /// Raised during Memory1/Memory2 (D-TLB miss, misaligned/access fault).
    Memory,
}

/// Internal invariant violations that must fail fast per the error-handling design:
/// branch-tag bookkeeping corruption, TLB/ROB/freelist overflow, and similar
/// conditions that indicate a bug in the simulator itself rather than guest
/// program behavior. These are reported via [`tracing::error!`] and abort the
/// process; they are never recoverable by squashing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FatalError {
    /// Mispredict rewind referenced a branch tag that is not currently allocated.
    BranchTagNotFound(u8),
    /// A TLB lookup matched more than one entry.
    MultipleTlbMatches { vpn1: u32 },
    /// The memory-subsystem response router produced a response with no owner tag.
    ResponseRouterUnderflow,
    /// The physical-register free list underflowed (freed more than allocated) or
    /// overflowed (all registers simultaneously free while one is referenced live).
    FreeListCorruption(&'static str),
    /// An allocation exceeded a structure's declared, fixed capacity.
    CapacityExceeded(&'static str),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::BranchTagNotFound(tag) => {
                write!(f, "branch tag {tag} not found during mispredict rewind")
            }
            FatalError::MultipleTlbMatches { vpn1 } => {
                write!(f, "multiple TLB entries matched vpn1={vpn1:#x}")
            }
            FatalError::ResponseRouterUnderflow => {
                write!(f, "memory response router received a response with no owner")
            }
            FatalError::FreeListCorruption(ctx) => write!(f, "free-list corruption: {ctx}"),
            FatalError::CapacityExceeded(what) => write!(f, "capacity exceeded: {what}"),
        }
    }
}

impl std::error::Error for FatalError {}

/// Result of a Sv32 virtual-to-physical address translation.
#[derive(Clone, Copy, Debug)]
pub struct TranslationResult {
    /// The translated physical address, or zero if translation failed.
    pub paddr: PhysAddr,
    /// Number of cycles consumed by the translation operation.
    pub cycles: u64,
    /// Trap that occurred during translation, if any.
    pub trap: Option<Trap>,
}

impl TranslationResult {
    /// Creates a successful translation result.
    #[inline]
    pub fn success(paddr: PhysAddr, cycles: u64) -> Self {
        Self {
            paddr,
            cycles,
            trap: None,
        }
    }

    /// Creates a translation result indicating a fault occurred.
    #[inline]
    pub fn fault(trap: Trap, cycles: u64) -> Self {
        Self {
            paddr: PhysAddr(0),
            cycles,
            trap: Some(trap),
        }
    }

    /// Whether this translation succeeded.
    pub fn is_ok(&self) -> bool {
        self.trap.is_none()
    }
}
