//! Decode Stage: instruction-bit decode, control-signal generation, operand read.
//!
//! Consumes Fetch2->Decode entries (raw 32-bit instructions, already RVC-expanded)
//! and produces Decode->Rename entries: decoded register indices, sign-extended
//! immediate, ALU/memory/CSR control signals, and the rs1/rs2/rs3 operand values
//! read directly out of the register file. RV32IMAF only — no W-suffixed
//! (OP_IMM_32/OP_REG_32) ops and no double-precision FP.

use crate::common::ExceptionStage;
use crate::common::error::Trap;
use crate::core::Cpu;
use crate::core::pipeline::latches::{IdExEntry, IfIdEntry};
use crate::core::pipeline::signals::{AluOp, AtomicOp, ControlSignals, CsrOp, MemWidth, OpASrc, OpBSrc};
use crate::isa::decode::decode as instruction_decode;
use crate::isa::instruction::{Decoded, InstructionBits};
use crate::isa::privileged::opcodes as sys_ops;
use crate::isa::rv32a::{funct3 as a_funct3, funct5 as a_funct5, opcodes as a_opcodes};
use crate::isa::rv32f::{funct3 as f_funct3, funct7 as f_funct7, opcodes as f_opcodes};
use crate::isa::rv32i::{funct3 as i_funct3, funct7 as i_funct7, opcodes as i_opcodes};
use crate::isa::rv32m::{funct3 as m_funct3, opcodes as m_opcodes};

/// ADDI x0, x0, 0 (canonical NOP), injected by bubble/flush paths.
const INSTRUCTION_NOP: u32 = 0x0000_0013;

/// Zero instruction encoding, used as a NOP when padding a bundle.
const INSTRUCTION_ZERO: u32 = 0;

/// Bit 5 of funct7, selecting the alternate R-type/I-type encoding (SUB vs ADD, SRA vs SRL).
const FUNCT7_ALT_BIT: u32 = 0x20;

/// FP load/store funct3 selecting single-precision (word) width.
const FP_WIDTH_WORD: u32 = 0x2;

fn decode_signals(inst: u32, d: &Decoded, pc: u64) -> Result<ControlSignals, Trap> {
    let mut c = ControlSignals {
        a_src: OpASrc::Reg1,
        b_src: OpBSrc::Imm,
        alu: AluOp::Add,
        ..Default::default()
    };

    match d.opcode {
        i_opcodes::OP_LUI => {
            c.reg_write = true;
            c.a_src = OpASrc::Zero;
        }
        i_opcodes::OP_AUIPC => {
            c.reg_write = true;
            c.a_src = OpASrc::Pc;
        }
        i_opcodes::OP_JAL => {
            c.reg_write = true;
            c.jump = true;
        }
        i_opcodes::OP_JALR => {
            c.reg_write = true;
            c.jump = true;
            c.alu = AluOp::Add;
        }
        i_opcodes::OP_BRANCH => {
            c.branch = true;
            c.b_src = OpBSrc::Reg2;
        }
        i_opcodes::OP_LOAD => {
            c.reg_write = true;
            c.mem_read = true;
            c.alu = AluOp::Add;
            let (w, s) = match d.funct3 {
                i_funct3::LB => (MemWidth::Byte, true),
                i_funct3::LH => (MemWidth::Half, true),
                i_funct3::LW => (MemWidth::Word, true),
                i_funct3::LBU => (MemWidth::Byte, false),
                i_funct3::LHU => (MemWidth::Half, false),
                _ => return Err(Trap::IllegalInstruction(inst)),
            };
            c.width = w;
            c.signed_load = s;
        }
        i_opcodes::OP_STORE => {
            c.mem_write = true;
            c.b_src = OpBSrc::Imm;
            c.alu = AluOp::Add;
            c.width = match d.funct3 {
                i_funct3::SB => MemWidth::Byte,
                i_funct3::SH => MemWidth::Half,
                i_funct3::SW => MemWidth::Word,
                _ => return Err(Trap::IllegalInstruction(inst)),
            };
        }
        i_opcodes::OP_IMM => {
            c.reg_write = true;
            c.alu = match d.funct3 {
                i_funct3::ADD_SUB => AluOp::Add,
                i_funct3::SLT => AluOp::Slt,
                i_funct3::SLTU => AluOp::Sltu,
                i_funct3::XOR => AluOp::Xor,
                i_funct3::OR => AluOp::Or,
                i_funct3::AND => AluOp::And,
                i_funct3::SLL => AluOp::Sll,
                i_funct3::SRL_SRA => {
                    if (d.funct7 & FUNCT7_ALT_BIT) != 0 {
                        AluOp::Sra
                    } else {
                        AluOp::Srl
                    }
                }
                _ => return Err(Trap::IllegalInstruction(inst)),
            };
        }
        i_opcodes::OP_REG => {
            c.reg_write = true;
            c.b_src = OpBSrc::Reg2;

            if d.funct7 == m_opcodes::M_EXTENSION {
                c.alu = match d.funct3 {
                    m_funct3::MUL => AluOp::Mul,
                    m_funct3::MULH => AluOp::Mulh,
                    m_funct3::MULHSU => AluOp::Mulhsu,
                    m_funct3::MULHU => AluOp::Mulhu,
                    m_funct3::DIV => AluOp::Div,
                    m_funct3::DIVU => AluOp::Divu,
                    m_funct3::REM => AluOp::Rem,
                    m_funct3::REMU => AluOp::Remu,
                    _ => return Err(Trap::IllegalInstruction(inst)),
                };
            } else {
                c.alu = match (d.funct3, d.funct7) {
                    (i_funct3::ADD_SUB, i_funct7::DEFAULT) => AluOp::Add,
                    (i_funct3::ADD_SUB, i_funct7::SUB) => AluOp::Sub,
                    (i_funct3::SLL, i_funct7::DEFAULT) => AluOp::Sll,
                    (i_funct3::SLT, i_funct7::DEFAULT) => AluOp::Slt,
                    (i_funct3::SLTU, i_funct7::DEFAULT) => AluOp::Sltu,
                    (i_funct3::XOR, i_funct7::DEFAULT) => AluOp::Xor,
                    (i_funct3::SRL_SRA, i_funct7::DEFAULT) => AluOp::Srl,
                    (i_funct3::SRL_SRA, i_funct7::SRA) => AluOp::Sra,
                    (i_funct3::OR, i_funct7::DEFAULT) => AluOp::Or,
                    (i_funct3::AND, i_funct7::DEFAULT) => AluOp::And,
                    _ => return Err(Trap::IllegalInstruction(inst)),
                };
            }
        }
        a_opcodes::OP_AMO => {
            c.width = match d.funct3 {
                a_funct3::WIDTH_32 => MemWidth::Word,
                _ => return Err(Trap::IllegalInstruction(inst)),
            };

            let f5 = d.funct7 >> 2;
            c.atomic_op = match f5 {
                a_funct5::LR => AtomicOp::Lr,
                a_funct5::SC => AtomicOp::Sc,
                a_funct5::AMOSWAP => AtomicOp::Swap,
                a_funct5::AMOADD => AtomicOp::Add,
                a_funct5::AMOXOR => AtomicOp::Xor,
                a_funct5::AMOAND => AtomicOp::And,
                a_funct5::AMOOR => AtomicOp::Or,
                a_funct5::AMOMIN => AtomicOp::Min,
                a_funct5::AMOMAX => AtomicOp::Max,
                a_funct5::AMOMINU => AtomicOp::Minu,
                a_funct5::AMOMAXU => AtomicOp::Maxu,
                _ => return Err(Trap::IllegalInstruction(inst)),
            };

            c.alu = AluOp::Add;
            c.a_src = OpASrc::Reg1;
            c.b_src = OpBSrc::Zero;
            c.mem_read = true;
            c.mem_write = c.atomic_op != AtomicOp::Lr;
            c.reg_write = true;
        }
        f_opcodes::OP_LOAD_FP => {
            c.fp_reg_write = true;
            c.mem_read = true;
            c.alu = AluOp::Add;
            c.width = match d.funct3 {
                FP_WIDTH_WORD => MemWidth::Word,
                _ => return Err(Trap::IllegalInstruction(inst)),
            };
        }
        f_opcodes::OP_STORE_FP => {
            c.mem_write = true;
            c.rs1_fp = false;
            c.rs2_fp = true;
            c.b_src = OpBSrc::Imm;
            c.alu = AluOp::Add;
            c.width = match d.funct3 {
                FP_WIDTH_WORD => MemWidth::Word,
                _ => return Err(Trap::IllegalInstruction(inst)),
            };
        }
        f_opcodes::OP_FP => {
            let fmt = d.funct7 & 0x3;
            if fmt != 0 {
                return Err(Trap::IllegalInstruction(inst));
            }

            c.rs1_fp = true;
            c.rs2_fp = true;
            c.fp_reg_write = true;
            c.b_src = OpBSrc::Reg2;

            c.alu = match d.funct7 {
                f_funct7::FADD => AluOp::FAdd,
                f_funct7::FSUB => AluOp::FSub,
                f_funct7::FMUL => AluOp::FMul,
                f_funct7::FDIV => AluOp::FDiv,
                f_funct7::FSQRT => AluOp::FSqrt,
                f_funct7::FSGNJ => match d.funct3 {
                    f_funct3::FSGNJ => AluOp::FSgnJ,
                    f_funct3::FSGNJN => AluOp::FSgnJN,
                    f_funct3::FSGNJX => AluOp::FSgnJX,
                    _ => return Err(Trap::IllegalInstruction(inst)),
                },
                f_funct7::FMIN_MAX => match d.funct3 {
                    f_funct3::FMIN => AluOp::FMin,
                    f_funct3::FMAX => AluOp::FMax,
                    _ => return Err(Trap::IllegalInstruction(inst)),
                },
                f_funct7::FCMP => {
                    c.fp_reg_write = false;
                    c.reg_write = true;
                    match d.funct3 {
                        f_funct3::FEQ => AluOp::FEq,
                        f_funct3::FLT => AluOp::FLt,
                        f_funct3::FLE => AluOp::FLe,
                        _ => return Err(Trap::IllegalInstruction(inst)),
                    }
                }
                f_funct7::FCLASS_MV_X_F => {
                    c.fp_reg_write = false;
                    c.reg_write = true;
                    c.rs1_fp = true;
                    match d.funct3 {
                        f_funct3::FMV_X_W => AluOp::FMvToX,
                        f_funct3::FCLASS => AluOp::FClass,
                        _ => return Err(Trap::IllegalInstruction(inst)),
                    }
                }
                f_funct7::FMV_F_X => {
                    c.rs1_fp = false;
                    c.fp_reg_write = true;
                    c.a_src = OpASrc::Reg1;
                    AluOp::FMvToF
                }
                f_funct7::FCVT_W_F => {
                    c.fp_reg_write = false;
                    c.reg_write = true;
                    c.rs1_fp = true;
                    if d.rs2 == 1 {
                        AluOp::FCvtWUS
                    } else {
                        AluOp::FCvtWS
                    }
                }
                f_funct7::FCVT_F_W => {
                    c.rs1_fp = false;
                    c.fp_reg_write = true;
                    c.a_src = OpASrc::Reg1;
                    if d.rs2 == 1 {
                        AluOp::FCvtSWU
                    } else {
                        AluOp::FCvtSW
                    }
                }
                _ => return Err(Trap::IllegalInstruction(inst)),
            };
        }
        f_opcodes::OP_FMADD | f_opcodes::OP_FMSUB | f_opcodes::OP_FNMADD | f_opcodes::OP_FNMSUB => {
            let fmt = d.funct7 & 0x3;
            if fmt != 0 {
                return Err(Trap::IllegalInstruction(inst));
            }

            c.rs1_fp = true;
            c.rs2_fp = true;
            c.rs3_fp = true;
            c.fp_reg_write = true;
            c.b_src = OpBSrc::Reg2;

            c.alu = match d.opcode {
                f_opcodes::OP_FMADD => AluOp::FMAdd,
                f_opcodes::OP_FMSUB => AluOp::FMSub,
                f_opcodes::OP_FNMADD => AluOp::FNMAdd,
                f_opcodes::OP_FNMSUB => AluOp::FNMSub,
                _ => AluOp::Add,
            };
        }
        sys_ops::OP_SYSTEM => {
            c.is_system = true;
            match d.raw {
                sys_ops::ECALL => {}
                sys_ops::EBREAK => return Err(Trap::Breakpoint(pc as u32)),
                sys_ops::MRET => c.is_mret = true,
                sys_ops::SRET => c.is_sret = true,
                sys_ops::WFI => {}
                sys_ops::SFENCE_VMA => {}
                _ => {
                    if d.funct3 != 0 {
                        c.csr_addr = inst.csr();
                        c.a_src = OpASrc::Reg1;
                        c.b_src = OpBSrc::Zero;
                        c.csr_op = match d.funct3 {
                            sys_ops::CSRRW => CsrOp::Rw,
                            sys_ops::CSRRS => CsrOp::Rs,
                            sys_ops::CSRRC => CsrOp::Rc,
                            sys_ops::CSRRWI => CsrOp::Rwi,
                            sys_ops::CSRRSI => CsrOp::Rsi,
                            sys_ops::CSRRCI => CsrOp::Rci,
                            _ => CsrOp::None,
                        };
                        c.reg_write = d.rd != 0;
                    }
                }
            }
        }
        i_opcodes::OP_MISC_MEM => match d.funct3 {
            i_funct3::FENCE => {}
            i_funct3::FENCE_I => c.is_fence_i = true,
            _ => return Err(Trap::IllegalInstruction(inst)),
        },
        _ => return Err(Trap::IllegalInstruction(inst)),
    }
    Ok(c)
}

/// Executes the decode stage: bit decode, control-signal generation, operand read.
///
/// Consumes Fetch2->Decode entries and produces Decode->Rename entries.
/// Stops at the first intra-bundle hazard (a later instruction reading a
/// register an earlier one in the same bundle writes) so dependent uops
/// issue in order across cycles rather than reading stale operands.
pub fn decode_stage(cpu: &mut Cpu, input: &mut Vec<IfIdEntry>, output: &mut Vec<IdExEntry>) {
    let entries = std::mem::take(input);
    output.clear();

    let mut bundle_writes: Vec<(usize, bool)> = Vec::with_capacity(cpu.pipeline_width);

    for if_entry in entries {
        if let Some(trap) = if_entry.trap {
            output.push(IdExEntry {
                pc: if_entry.pc,
                inst: if_entry.inst,
                inst_size: if_entry.inst_size,
                trap: Some(trap),
                exception_stage: if_entry.exception_stage,
                pred_taken: if_entry.pred_taken,
                pred_target: if_entry.pred_target,
                ghr_snapshot: if_entry.ghr_snapshot,
                ..Default::default()
            });
            break;
        }

        let inst = if_entry.inst;

        if inst == INSTRUCTION_NOP || inst == INSTRUCTION_ZERO {
            continue;
        }

        let d = instruction_decode(inst);
        let (ctrl, trap, exception_stage) = match decode_signals(inst, &d, if_entry.pc) {
            Ok(c) => (c, None, None),
            Err(t) => (
                ControlSignals::default(),
                Some(t),
                Some(ExceptionStage::Decode),
            ),
        };

        let rs3_idx = inst.rs3();

        let mut hazard = false;
        if (d.rs1 != 0 || ctrl.rs1_fp) && bundle_writes.contains(&(d.rs1, ctrl.rs1_fp)) {
            hazard = true;
        }
        if (d.rs2 != 0 || ctrl.rs2_fp) && bundle_writes.contains(&(d.rs2, ctrl.rs2_fp)) {
            hazard = true;
        }
        if ctrl.rs3_fp && bundle_writes.contains(&(rs3_idx, true)) {
            hazard = true;
        }

        if hazard {
            input.push(if_entry);
            break;
        }

        if ctrl.reg_write && d.rd != 0 {
            bundle_writes.push((d.rd, false));
        }
        if ctrl.fp_reg_write {
            bundle_writes.push((d.rd, true));
        }

        let rv1 = if ctrl.rs1_fp {
            cpu.regs.read_f(d.rs1)
        } else {
            cpu.regs.read(d.rs1)
        };
        let rv2 = if ctrl.rs2_fp {
            cpu.regs.read_f(d.rs2)
        } else {
            cpu.regs.read(d.rs2)
        };
        let rv3 = if ctrl.rs3_fp {
            cpu.regs.read_f(rs3_idx)
        } else {
            0
        };

        if cpu.trace {
            eprintln!("ID  pc={:#x} inst={:#010x}", if_entry.pc, inst);
        }

        output.push(IdExEntry {
            pc: if_entry.pc,
            inst,
            inst_size: if_entry.inst_size,
            rs1: d.rs1,
            rs2: d.rs2,
            rs3: rs3_idx,
            rd: d.rd,
            imm: d.imm,
            rv1,
            rv2,
            rv3,
            ctrl,
            trap,
            exception_stage,
            pred_taken: if_entry.pred_taken,
            pred_target: if_entry.pred_target,
            ghr_snapshot: if_entry.ghr_snapshot,
        });
    }
}
