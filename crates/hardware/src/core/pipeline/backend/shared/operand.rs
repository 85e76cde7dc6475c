//! Tag-based operand resolution shared by every issue unit.
//!
//! Both the in-order FIFO issuer and the out-of-order window issuer resolve
//! source operands the same way: a tag captured at rename time either points
//! at an in-flight ROB entry (read via bypass if completed, stall otherwise)
//! or is absent, meaning the architectural register file already holds the
//! value.

use crate::core::Cpu;
use crate::core::pipeline::rob::{Rob, RobState, RobTag};

/// Reads a single operand value using the tag captured at rename time.
///
/// Returns `Some(value)` if the operand is ready, `None` if stalled.
pub fn read_operand_by_tag(
    reg: usize,
    is_fp: bool,
    tag: Option<RobTag>,
    rob: &Rob,
    cpu: &Cpu,
) -> Option<u64> {
    // x0 is hardwired zero
    if !is_fp && reg == 0 {
        return Some(0);
    }

    match tag {
        None => {
            // No in-flight producer at rename time — read from architectural register file
            Some(if is_fp {
                cpu.regs.read_f(reg)
            } else {
                cpu.regs.read(reg)
            })
        }
        Some(t) => {
            // In-flight producer — check if ROB entry has completed
            match rob.find_entry(t) {
                Some(entry) if entry.state == RobState::Completed => Some(entry.result),
                Some(_) => None, // Not ready — stall
                None => {
                    // ROB entry gone (already committed) — value is in register file
                    Some(if is_fp {
                        cpu.regs.read_f(reg)
                    } else {
                        cpu.regs.read(reg)
                    })
                }
            }
        }
    }
}
