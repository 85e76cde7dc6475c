//! RISC-V Compressed (C) Extension Constants.
//!
//! Defines the quadrants and opcodes for 16-bit compressed instructions.
//! Compressed instructions are divided into three quadrants (0, 1, 2) based
//! on the lowest 2 bits of the instruction.
//!
//! Named for RV32C with the F extension and no D: the funct3 slots an
//! RV64DC build uses for the 64-bit/double-precision variants
//! (C.LD/C.SD/C.FLD/C.FSD/C.ADDIW and friends) decode differently here —
//! C.JAL takes quadrant 1's `001` slot back from C.ADDIW (RV64/128-only),
//! and quadrant 0/2's `011`/`111` slots are RV32's C.FLW/C.FSW rather than
//! RV64's C.LD/C.SD. The `001`/`101` slots those quadrants would use for
//! C.FLD/C.FSD (valid with D regardless of XLEN) are reserved here.

/// Quadrant 0 (bits 1:0 = 00).
pub const QUADRANT_0: u16 = 0b00;
/// Quadrant 1 (bits 1:0 = 01).
pub const QUADRANT_1: u16 = 0b01;
/// Quadrant 2 (bits 1:0 = 10).
pub const QUADRANT_2: u16 = 0b10;

/// Instructions in Quadrant 0.
pub mod q0 {
    /// Compressed Add Immediate, scaled by 4, to Stack Pointer (C.ADDI4SPN).
    pub const C_ADDI4SPN: u16 = 0b000;
    /// Compressed Load Word (C.LW).
    pub const C_LW: u16 = 0b010;
    /// Compressed Floating-point Load Word (C.FLW) — RV32FC's use of this slot.
    pub const C_FLW: u16 = 0b011;
    /// Compressed Store Word (C.SW).
    pub const C_SW: u16 = 0b110;
    /// Compressed Floating-point Store Word (C.FSW) — RV32FC's use of this slot.
    pub const C_FSW: u16 = 0b111;
}

/// Instructions in Quadrant 1.
pub mod q1 {
    /// Compressed Add Immediate (C.ADDI).
    pub const C_ADDI: u16 = 0b000;
    /// Compressed Jump and Link (C.JAL) — RV32's use of this slot
    /// (RV64/128 use it for C.ADDIW instead).
    pub const C_JAL: u16 = 0b001;
    /// Compressed Load Immediate (C.LI).
    pub const C_LI: u16 = 0b010;
    /// Compressed Load Upper Immediate / Add Immediate 16 to SP (C.LUI / C.ADDI16SP).
    pub const C_LUI_ADDI16SP: u16 = 0b011;
    /// Miscellaneous ALU operations (C.SRLI, C.SRAI, C.ANDI, C.SUB, etc.).
    pub const C_MISC_ALU: u16 = 0b100;
    /// Compressed Jump (C.J).
    pub const C_J: u16 = 0b101;
    /// Compressed Branch Equal Zero (C.BEQZ).
    pub const C_BEQZ: u16 = 0b110;
    /// Compressed Branch Not Equal Zero (C.BNEZ).
    pub const C_BNEZ: u16 = 0b111;
}

/// Instructions in Quadrant 2.
pub mod q2 {
    /// Compressed Shift Left Logical Immediate (C.SLLI).
    pub const C_SLLI: u16 = 0b000;
    /// Compressed Load Word from SP (C.LWSP).
    pub const C_LWSP: u16 = 0b010;
    /// Compressed Floating-point Load Word from SP (C.FLWSP) — RV32FC's use of this slot.
    pub const C_FLWSP: u16 = 0b011;
    /// Miscellaneous ALU / Jump (C.JR, C.MV, C.EBREAK, C.JALR, C.ADD).
    pub const C_MISC_ALU: u16 = 0b100;
    /// Compressed Store Word to SP (C.SWSP).
    pub const C_SWSP: u16 = 0b110;
    /// Compressed Floating-point Store Word to SP (C.FSWSP) — RV32FC's use of this slot.
    pub const C_FSWSP: u16 = 0b111;
}
