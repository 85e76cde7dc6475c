//! Branch resolution functional unit (BR).
//!
//! Grounded on [`super::bru::branch_predictor`]'s prediction-vs-outcome shape,
//! but this unit is the *execute-stage* resolver: it compares the uop's
//! predicted direction/target (carried from the FTQ at dispatch) against the
//! computed outcome and publishes a redirect, rather than making the
//! prediction itself.

/// Conditional-branch/jump comparison performed by a BR uop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrOp {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
    /// Unconditional jump (JAL/JALR); always taken.
    Jump,
}

/// Result of resolving a branch: actual outcome compared against the
/// front end's prediction, and the redirect target if it mispredicted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchResolution {
    pub actual_taken: bool,
    pub redirect_pc: u32,
    pub mispredict: bool,
}

pub struct Br;

impl Br {
    /// Resolves a branch uop.
    ///
    /// `a`/`b` are the compared register values (ignored for `Jump`).
    /// `pc` is the branch's own address, `target` the taken-path address
    /// (branch target or jump target), `fall_through` the not-taken path
    /// (`pc + 4` for RV32, or `pc + 2` for a compressed branch).
    pub fn resolve(
        op: BrOp,
        a: u32,
        b: u32,
        target: u32,
        fall_through: u32,
        predicted_taken: bool,
        predicted_target: u32,
    ) -> BranchResolution {
        let actual_taken = match op {
            BrOp::Eq => a == b,
            BrOp::Ne => a != b,
            BrOp::Lt => (a as i32) < (b as i32),
            BrOp::Ge => (a as i32) >= (b as i32),
            BrOp::Ltu => a < b,
            BrOp::Geu => a >= b,
            BrOp::Jump => true,
        };
        let redirect_pc = if actual_taken { target } else { fall_through };
        let predicted_pc = if predicted_taken { predicted_target } else { fall_through };
        let mispredict = actual_taken != predicted_taken || (actual_taken && redirect_pc != predicted_pc);
        BranchResolution { actual_taken, redirect_pc, mispredict }
    }
}
