//! Address-generation functional units (LOAD-AGU, STA-AGU) and store-data
//! (STD).
//!
//! Per §4.6, LOAD-AGU/STA-AGU/STD are separate FU roles writing to distinct
//! LSU ports, even though load and store addresses are computed the same
//! way (`src1 + imm`). Kept as three thin structs rather than one, matching
//! the teacher's one-struct-per-FU-role convention in `core/units/`.

/// Computes an effective address for a load or a store.
pub struct Agu;

impl Agu {
    /// `src1 + imm`, wrapping on overflow (RISC-V address arithmetic is
    /// modulo 2^32 on RV32).
    pub fn effective_address(src1: u32, imm: i32) -> u32 {
        src1.wrapping_add(imm as u32)
    }
}

/// Passes a store's data operand through to the LSU's store-data port.
///
/// Trivial today, but kept as its own unit (rather than folded into `Agu`)
/// because the issue queue schedules STD onto a distinct port from STA,
/// and a future widening (e.g. store-data formatting for sub-word writes)
/// belongs here rather than in address generation.
pub struct Std;

impl Std {
    pub fn store_data(src2: u32) -> u32 {
        src2
    }
}
