//! Structured control flow, geometry stream ops and barriers.
//!
//! DXBC control flow is structured by construction (balanced
//! `if`/`endif`, `loop`/`endloop`, `switch`/`endswitch`), so SPIR-V merge
//! and continue blocks are emitted inline, tracked by a small stack of
//! pending frames. Unbalanced streams are rejected.

use sirocco_dxbc::sm4::ShaderStage;
use sirocco_spirv::{SwitchCaseLabel, Word};

use crate::sm4::decode::Instruction;
use crate::sm4::opcode::{Opcode, SyncFlags, ZeroTest};
use crate::sm4::WriteMask;

use super::{CfFrame, Compiler, TranslateError};

impl Compiler<'_> {
    pub(crate) fn emit_control_flow(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        match ins.op {
            Opcode::If => self.emit_if(ins),
            Opcode::Else => self.emit_else(),
            Opcode::EndIf => self.emit_end_if(),
            Opcode::Loop => self.emit_loop(),
            Opcode::EndLoop => self.emit_end_loop(),
            Opcode::Break => self.emit_break(false),
            Opcode::Continue => self.emit_break(true),
            Opcode::Breakc => self.emit_breakc(ins, false),
            Opcode::Continuec => self.emit_breakc(ins, true),
            Opcode::Switch => self.emit_switch(ins),
            Opcode::Case => self.emit_case(ins),
            Opcode::Default => self.emit_default(),
            Opcode::EndSwitch => self.emit_end_switch(),
            Opcode::Ret => self.emit_ret(),
            Opcode::Retc => self.emit_retc(ins),
            Opcode::Discard => self.emit_discard(ins),
            other => Err(TranslateError::UnsupportedOpcode { op: other }),
        }
    }

    /// Loads a conditional instruction's operand and applies its zero test.
    fn emit_condition(&mut self, ins: &Instruction) -> Result<Word, TranslateError> {
        let value = self.emit_register_load(&ins.src[0], WriteMask::X)?;
        let bool_type = self.module.def_bool_type();
        let zero = self.build_const_replicant(value.vtype.ctype, 1, 0);
        let id = match ins.controls.zero_test() {
            ZeroTest::TestNz => self.module.op_ine(bool_type, value.id, zero.id),
            ZeroTest::TestZ => self.module.op_ieq(bool_type, value.id, zero.id),
        };
        Ok(id)
    }

    fn emit_if(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let condition = self.emit_condition(ins)?;

        let label_then = self.module.allocate_id();
        let label_else = self.module.allocate_id();
        let merge = self.module.allocate_id();

        self.module
            .op_selection_merge(merge, spirv::SelectionControl::NONE);
        self.module
            .op_branch_conditional(condition, label_then, label_else);
        self.module.op_label(label_then);

        self.cf_stack.push(CfFrame::If {
            merge,
            label_else,
            had_else: false,
        });
        Ok(())
    }

    fn emit_else(&mut self) -> Result<(), TranslateError> {
        match self.cf_stack.last_mut() {
            Some(CfFrame::If {
                merge,
                label_else,
                had_else,
            }) if !*had_else => {
                let merge = *merge;
                let label_else = *label_else;
                *had_else = true;
                self.module.op_branch(merge);
                self.module.op_label(label_else);
                Ok(())
            }
            _ => Err(TranslateError::InvalidStateMachine {
                context: "'else' without matching 'if'".to_owned(),
            }),
        }
    }

    fn emit_end_if(&mut self) -> Result<(), TranslateError> {
        match self.cf_stack.pop() {
            Some(CfFrame::If {
                merge,
                label_else,
                had_else,
            }) => {
                self.module.op_branch(merge);
                // An if without an else still owns the allocated label; it
                // becomes an empty false block falling through to merge.
                if !had_else {
                    self.module.op_label(label_else);
                    self.module.op_branch(merge);
                }
                self.module.op_label(merge);
                Ok(())
            }
            _ => Err(TranslateError::InvalidStateMachine {
                context: "'endif' without matching 'if'".to_owned(),
            }),
        }
    }

    fn emit_loop(&mut self) -> Result<(), TranslateError> {
        let header = self.module.allocate_id();
        let body = self.module.allocate_id();
        let continue_ = self.module.allocate_id();
        let merge = self.module.allocate_id();

        self.module.op_branch(header);
        self.module.op_label(header);
        self.module
            .op_loop_merge(merge, continue_, spirv::LoopControl::NONE);
        self.module.op_branch(body);
        self.module.op_label(body);

        self.cf_stack.push(CfFrame::Loop {
            header,
            continue_,
            merge,
        });
        Ok(())
    }

    fn emit_end_loop(&mut self) -> Result<(), TranslateError> {
        match self.cf_stack.pop() {
            Some(CfFrame::Loop {
                header,
                continue_,
                merge,
            }) => {
                self.module.op_branch(continue_);
                self.module.op_label(continue_);
                self.module.op_branch(header);
                self.module.op_label(merge);
                Ok(())
            }
            _ => Err(TranslateError::InvalidStateMachine {
                context: "'endloop' without matching 'loop'".to_owned(),
            }),
        }
    }

    /// Unconditional `break`/`continue`. The branch ends the current block,
    /// so a fresh (unreachable) block is opened for any trailing code.
    fn emit_break(&mut self, is_continue: bool) -> Result<(), TranslateError> {
        let target = self.break_target(is_continue)?;
        self.module.op_branch(target);
        let label = self.module.allocate_id();
        self.module.op_label(label);
        Ok(())
    }

    fn emit_breakc(&mut self, ins: &Instruction, is_continue: bool) -> Result<(), TranslateError> {
        let target = self.break_target(is_continue)?;
        let condition = self.emit_condition(ins)?;

        let label_taken = self.module.allocate_id();
        let label_skip = self.module.allocate_id();
        self.module
            .op_selection_merge(label_skip, spirv::SelectionControl::NONE);
        self.module
            .op_branch_conditional(condition, label_taken, label_skip);
        self.module.op_label(label_taken);
        self.module.op_branch(target);
        self.module.op_label(label_skip);
        Ok(())
    }

    /// Finds the branch target for `break`/`continue`: the innermost loop's
    /// continue/merge block, with `break` also stopping at switches.
    fn break_target(&mut self, is_continue: bool) -> Result<Word, TranslateError> {
        for frame in self.cf_stack.iter().rev() {
            match frame {
                CfFrame::Loop {
                    continue_, merge, ..
                } => {
                    return Ok(if is_continue { *continue_ } else { *merge });
                }
                CfFrame::Switch { merge, .. } if !is_continue => {
                    return Ok(*merge);
                }
                _ => {}
            }
        }
        Err(TranslateError::InvalidStateMachine {
            context: if is_continue {
                "'continue' outside of a loop".to_owned()
            } else {
                "'break' outside of a loop or switch".to_owned()
            },
        })
    }

    /// `switch` only learns its case labels when `endswitch` arrives, so
    /// the selector is evaluated now, the position remembered, and the
    /// OpSwitch inserted retroactively.
    fn emit_switch(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let selector = self.emit_register_load(&ins.src[0], WriteMask::X)?;
        let merge = self.module.allocate_id();
        let insert_at = self.module.code_insertion_point();

        self.cf_stack.push(CfFrame::Switch {
            merge,
            selector: selector.id,
            insert_at,
            cases: Vec::new(),
            default: None,
            case_open: false,
        });
        Ok(())
    }

    fn emit_case(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let literal = match ins.src[0].kind {
            crate::sm4::opcode::OperandType::Imm32 => ins.src[0].imm[0],
            _ => {
                return Err(TranslateError::InvalidOperand {
                    context: "'case' label must be an immediate".to_owned(),
                })
            }
        };

        let label = self.module.allocate_id();
        match self.cf_stack.last_mut() {
            Some(CfFrame::Switch {
                cases, case_open, ..
            }) => {
                cases.push(SwitchCaseLabel { literal, label });
                let fallthrough = *case_open;
                *case_open = true;
                if fallthrough {
                    self.module.op_branch(label);
                }
                self.module.op_label(label);
                Ok(())
            }
            _ => Err(TranslateError::InvalidStateMachine {
                context: "'case' outside of a switch".to_owned(),
            }),
        }
    }

    fn emit_default(&mut self) -> Result<(), TranslateError> {
        let label = self.module.allocate_id();
        match self.cf_stack.last_mut() {
            Some(CfFrame::Switch {
                default, case_open, ..
            }) if default.is_none() => {
                *default = Some(label);
                let fallthrough = *case_open;
                *case_open = true;
                if fallthrough {
                    self.module.op_branch(label);
                }
                self.module.op_label(label);
                Ok(())
            }
            _ => Err(TranslateError::InvalidStateMachine {
                context: "'default' outside of a switch or duplicated".to_owned(),
            }),
        }
    }

    fn emit_end_switch(&mut self) -> Result<(), TranslateError> {
        match self.cf_stack.pop() {
            Some(CfFrame::Switch {
                merge,
                selector,
                insert_at,
                cases,
                default,
                case_open,
            }) => {
                if case_open {
                    self.module.op_branch(merge);
                }
                let default = default.unwrap_or(merge);
                self.module
                    .insert_switch(insert_at, selector, merge, default, &cases);
                self.module.op_label(merge);
                Ok(())
            }
            _ => Err(TranslateError::InvalidStateMachine {
                context: "'endswitch' without matching 'switch'".to_owned(),
            }),
        }
    }

    fn emit_ret(&mut self) -> Result<(), TranslateError> {
        self.module.op_return();
        if self.cf_stack.is_empty() {
            self.stage_fn_returned = true;
        } else {
            // Mid-control-flow return; open a block for the trailing code.
            let label = self.module.allocate_id();
            self.module.op_label(label);
        }
        Ok(())
    }

    fn emit_retc(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let condition = self.emit_condition(ins)?;
        let label_taken = self.module.allocate_id();
        let label_skip = self.module.allocate_id();
        self.module
            .op_selection_merge(label_skip, spirv::SelectionControl::NONE);
        self.module
            .op_branch_conditional(condition, label_taken, label_skip);
        self.module.op_label(label_taken);
        self.module.op_return();
        self.module.op_label(label_skip);
        Ok(())
    }

    fn emit_discard(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let condition = self.emit_condition(ins)?;
        let label_taken = self.module.allocate_id();
        let label_skip = self.module.allocate_id();
        self.module
            .op_selection_merge(label_skip, spirv::SelectionControl::NONE);
        self.module
            .op_branch_conditional(condition, label_taken, label_skip);
        self.module.op_label(label_taken);

        if self.opts.defer_kill && self.stage == ShaderStage::Pixel {
            // Demoting keeps the invocation alive for derivatives; the
            // block falls through to the merge.
            self.module
                .enable_extension("SPV_EXT_demote_to_helper_invocation");
            self.module
                .enable_capability(spirv::Capability::DemoteToHelperInvocationEXT);
            self.module.op_demote_to_helper_invocation();
            self.module.op_branch(label_skip);
        } else {
            self.module.op_kill();
        }
        self.module.op_label(label_skip);
        Ok(())
    }

    // --- Geometry streams -------------------------------------------------

    pub(crate) fn emit_geometry_emit(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        if self.stage != ShaderStage::Geometry {
            return Err(TranslateError::InvalidStateMachine {
                context: format!("{:?} outside of a geometry shader", ins.op),
            });
        }
        // Only the default stream is supported; the stream-indexed forms
        // must name m0.
        if matches!(
            ins.op,
            Opcode::EmitStream | Opcode::CutStream | Opcode::EmitThenCutStream
        ) {
            let stream = ins.dst[0].index[0].offset;
            if stream != 0 {
                return Err(TranslateError::Unsupported {
                    context: format!("geometry stream m{stream}"),
                });
            }
        }

        match ins.op {
            Opcode::Emit | Opcode::EmitStream => {
                self.emit_output_setup()?;
                self.module.op_emit_vertex();
            }
            Opcode::Cut | Opcode::CutStream => {
                self.module.op_end_primitive();
            }
            Opcode::EmitThenCut | Opcode::EmitThenCutStream => {
                self.emit_output_setup()?;
                self.module.op_emit_vertex();
                self.module.op_end_primitive();
            }
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        }
        Ok(())
    }

    // --- Barriers ---------------------------------------------------------

    pub(crate) fn emit_barrier(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let flags = ins.controls.sync_flags();

        let memory_scope = if flags.contains(SyncFlags::UAV_MEMORY_GLOBAL) {
            spirv::Scope::Device
        } else {
            spirv::Scope::Workgroup
        };

        let mut semantics = spirv::MemorySemantics::NONE;
        if flags.contains(SyncFlags::THREAD_GROUP_SHARED_MEMORY) {
            semantics |= spirv::MemorySemantics::WORKGROUP_MEMORY;
        }
        if flags.contains(SyncFlags::UAV_MEMORY_GROUP) || flags.contains(SyncFlags::UAV_MEMORY_GLOBAL)
        {
            semantics |= spirv::MemorySemantics::UNIFORM_MEMORY | spirv::MemorySemantics::IMAGE_MEMORY;
        }
        if !semantics.is_empty() {
            semantics |= spirv::MemorySemantics::ACQUIRE_RELEASE;
        }

        let memory_scope_id = self.module.const_u32(memory_scope as u32);
        let semantics_id = self.module.const_u32(semantics.bits());

        if flags.contains(SyncFlags::THREADS_IN_GROUP) {
            let execution_scope_id = self.module.const_u32(spirv::Scope::Workgroup as u32);
            self.module
                .op_control_barrier(execution_scope_id, memory_scope_id, semantics_id);
        } else {
            self.module.op_memory_barrier(memory_scope_id, semantics_id);
        }
        Ok(())
    }
}
