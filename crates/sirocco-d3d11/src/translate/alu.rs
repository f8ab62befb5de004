//! Component-wise instruction lowering: vector ALU, shifts, comparisons,
//! conditional moves, dot products, extended multiplies, bit-field ops and
//! the 16-bit float conversions.

use crate::sm4::decode::Instruction;
use crate::sm4::opcode::{Opcode, OperandType, ScalarType};
use crate::sm4::WriteMask;

use super::{scalar, Compiler, RegisterValue, TranslateError, VectorType};

impl Compiler<'_> {
    fn reject_float64(&self, ins: &Instruction) -> Result<(), TranslateError> {
        let uses_f64 = ins
            .dst
            .iter()
            .chain(ins.src.iter())
            .any(|reg| matches!(reg.data_type, ScalarType::Float64));
        if uses_f64 {
            return Err(TranslateError::UnsupportedOpcode { op: ins.op });
        }
        Ok(())
    }

    pub(crate) fn emit_vector_alu(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        self.reject_float64(ins)?;

        let mask = ins.dst[0].mask;
        let mut src = Vec::with_capacity(ins.src.len());
        for reg in &ins.src {
            src.push(self.emit_register_load(reg, mask)?);
        }

        let vtype = VectorType {
            ctype: ins.dst[0].data_type,
            ccount: mask.count(),
        };
        let type_id = self.get_vector_type_id(vtype);

        let id = match ins.op {
            Opcode::Add => self.module.op_fadd(type_id, src[0].id, src[1].id),
            Opcode::Div => self.module.op_fdiv(type_id, src[0].id, src[1].id),
            Opcode::Exp => self.module.op_exp2(type_id, src[0].id),
            Opcode::Log => self.module.op_log2(type_id, src[0].id),
            Opcode::Mad => self
                .module
                .op_ffma(type_id, src[0].id, src[1].id, src[2].id),
            Opcode::Max => self.module.op_fmax(type_id, src[0].id, src[1].id),
            Opcode::Min => self.module.op_fmin(type_id, src[0].id, src[1].id),
            Opcode::Mul => self.module.op_fmul(type_id, src[0].id, src[1].id),
            Opcode::Mov => src[0].id,
            Opcode::Sqrt => self.module.op_sqrt(type_id, src[0].id),
            Opcode::Rsq => self.module.op_inverse_sqrt(type_id, src[0].id),
            Opcode::Rcp => {
                let one = self.build_const_replicant(
                    ScalarType::Float32,
                    vtype.ccount,
                    1f32.to_bits(),
                );
                self.module.op_fdiv(type_id, one.id, src[0].id)
            }
            Opcode::Frc => self.module.op_fract(type_id, src[0].id),
            Opcode::RoundNe => self.module.op_round_even(type_id, src[0].id),
            Opcode::RoundNi => self.module.op_floor(type_id, src[0].id),
            Opcode::RoundPi => self.module.op_ceil(type_id, src[0].id),
            Opcode::RoundZ => self.module.op_trunc(type_id, src[0].id),
            Opcode::IAdd => self.module.op_iadd(type_id, src[0].id, src[1].id),
            Opcode::IMad | Opcode::UMad => {
                let product = self.module.op_imul(type_id, src[0].id, src[1].id);
                self.module.op_iadd(type_id, product, src[2].id)
            }
            Opcode::IMax => self.module.op_smax(type_id, src[0].id, src[1].id),
            Opcode::IMin => self.module.op_smin(type_id, src[0].id, src[1].id),
            Opcode::INeg => self.module.op_snegate(type_id, src[0].id),
            Opcode::UMax => self.module.op_umax(type_id, src[0].id, src[1].id),
            Opcode::UMin => self.module.op_umin(type_id, src[0].id, src[1].id),
            Opcode::And => self.module.op_bitwise_and(type_id, src[0].id, src[1].id),
            Opcode::Or => self.module.op_bitwise_or(type_id, src[0].id, src[1].id),
            Opcode::Xor => self.module.op_bitwise_xor(type_id, src[0].id, src[1].id),
            Opcode::Not => self.module.op_not(type_id, src[0].id),
            Opcode::CountBits => self.module.op_bit_count(type_id, src[0].id),
            Opcode::BfRev => self.module.op_bit_reverse(type_id, src[0].id),
            Opcode::FtoI => self.module.op_convert_f_to_s(type_id, src[0].id),
            Opcode::FtoU => self.module.op_convert_f_to_u(type_id, src[0].id),
            Opcode::ItoF => self.module.op_convert_s_to_f(type_id, src[0].id),
            Opcode::UtoF => self.module.op_convert_u_to_f(type_id, src[0].id),
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };

        let value = RegisterValue { vtype, id };
        let value = self.emit_dst_modifiers(value, ins.modifiers.saturate);
        self.emit_register_store(&ins.dst[0], value)
    }

    /// Shift instructions; DXBC only honors the low five bits of the shift
    /// amount.
    pub(crate) fn emit_vector_shift(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let mask = ins.dst[0].mask;
        let value = self.emit_register_load(&ins.src[0], mask)?;
        let amount = self.emit_register_load(&ins.src[1], mask)?;

        let vtype = VectorType {
            ctype: ins.dst[0].data_type,
            ccount: mask.count(),
        };
        let type_id = self.get_vector_type_id(vtype);

        let amount_type = self.get_vector_type_id(amount.vtype);
        let thirty_one = self.build_const_replicant(ScalarType::Uint32, mask.count(), 31);
        let amount = self
            .module
            .op_bitwise_and(amount_type, amount.id, thirty_one.id);

        let id = match ins.op {
            Opcode::IShl => self.module.op_shift_left_logical(type_id, value.id, amount),
            Opcode::IShr => self
                .module
                .op_shift_right_arithmetic(type_id, value.id, amount),
            Opcode::UShr => self
                .module
                .op_shift_right_logical(type_id, value.id, amount),
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };

        self.emit_register_store(&ins.dst[0], RegisterValue { vtype, id })
    }

    pub(crate) fn emit_vector_cmp(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        self.reject_float64(ins)?;

        let mask = ins.dst[0].mask;
        let a = self.emit_register_load(&ins.src[0], mask)?;
        let b = self.emit_register_load(&ins.src[1], mask)?;

        let ccount = mask.count();
        let bool_type = {
            let bool_scalar = self.module.def_bool_type();
            if ccount > 1 {
                self.module.def_vector_type(bool_scalar, ccount)
            } else {
                bool_scalar
            }
        };

        let condition = match ins.op {
            Opcode::Eq => self.module.op_ford_eq(bool_type, a.id, b.id),
            Opcode::Ge => self.module.op_ford_ge(bool_type, a.id, b.id),
            Opcode::Lt => self.module.op_ford_lt(bool_type, a.id, b.id),
            Opcode::Ne => self.module.op_ford_ne(bool_type, a.id, b.id),
            Opcode::IEq => self.module.op_ieq(bool_type, a.id, b.id),
            Opcode::IGe => self.module.op_sge(bool_type, a.id, b.id),
            Opcode::ILt => self.module.op_slt(bool_type, a.id, b.id),
            Opcode::INe => self.module.op_ine(bool_type, a.id, b.id),
            Opcode::ULt => self.module.op_ult(bool_type, a.id, b.id),
            Opcode::UGe => self.module.op_uge(bool_type, a.id, b.id),
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };

        // D3D comparison results are all-ones / all-zeros integer masks.
        let vtype = VectorType {
            ctype: ScalarType::Uint32,
            ccount,
        };
        let type_id = self.get_vector_type_id(vtype);
        let all_ones = self.build_const_replicant(ScalarType::Uint32, ccount, !0u32);
        let zero = self.build_const_replicant(ScalarType::Uint32, ccount, 0);
        let id = self
            .module
            .op_select(type_id, condition, all_ones.id, zero.id);

        self.emit_register_store(&ins.dst[0], RegisterValue { vtype, id })
    }

    pub(crate) fn emit_vector_cmov(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        self.reject_float64(ins)?;

        match ins.op {
            Opcode::Movc => {
                let mask = ins.dst[0].mask;
                let condition = self.emit_register_load(&ins.src[0], mask)?;
                let if_true = self.emit_register_load(&ins.src[1], mask)?;
                let if_false = self.emit_register_load(&ins.src[2], mask)?;

                let vtype = VectorType {
                    ctype: ins.dst[0].data_type,
                    ccount: mask.count(),
                };
                let condition = self.emit_nonzero_test(condition);
                let type_id = self.get_vector_type_id(vtype);
                let id = self
                    .module
                    .op_select(type_id, condition, if_true.id, if_false.id);

                let value = RegisterValue { vtype, id };
                let value = self.emit_dst_modifiers(value, ins.modifiers.saturate);
                self.emit_register_store(&ins.dst[0], value)
            }
            Opcode::Swapc => {
                // Both destinations select between the same two sources
                // with swapped polarity. The source loads use each dst's
                // own mask.
                for (dst_index, flip) in [(0usize, false), (1usize, true)] {
                    let dst = &ins.dst[dst_index];
                    if dst.kind == OperandType::Null {
                        continue;
                    }
                    let mask = dst.mask;
                    let condition = self.emit_register_load(&ins.src[0], mask)?;
                    let a = self.emit_register_load(&ins.src[1], mask)?;
                    let b = self.emit_register_load(&ins.src[2], mask)?;

                    let vtype = VectorType {
                        ctype: dst.data_type,
                        ccount: mask.count(),
                    };
                    let condition = self.emit_nonzero_test(condition);
                    let type_id = self.get_vector_type_id(vtype);
                    let (if_true, if_false) = if flip { (a, b) } else { (b, a) };
                    let id =
                        self.module
                            .op_select(type_id, condition, if_true.id, if_false.id);
                    self.emit_register_store(dst, RegisterValue { vtype, id })?;
                }
                Ok(())
            }
            other => Err(TranslateError::UnsupportedOpcode { op: other }),
        }
    }

    /// Compares an integer value against zero, producing a bool (vector).
    pub(crate) fn emit_nonzero_test(&mut self, value: RegisterValue) -> sirocco_spirv::Word {
        let ccount = value.vtype.ccount;
        let bool_scalar = self.module.def_bool_type();
        let bool_type = if ccount > 1 {
            self.module.def_vector_type(bool_scalar, ccount)
        } else {
            bool_scalar
        };
        let zero = self.build_const_replicant(value.vtype.ctype, ccount, 0);
        self.module.op_ine(bool_type, value.id, zero.id)
    }

    /// Dot products read the first 2/3/4 components of both sources
    /// regardless of the destination mask and splat the scalar result.
    pub(crate) fn emit_vector_dot(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let src_mask = match ins.op {
            Opcode::Dp2 => WriteMask::XY,
            Opcode::Dp3 => WriteMask::XYZ,
            _ => WriteMask::XYZW,
        };
        let a = self.emit_register_load(&ins.src[0], src_mask)?;
        let b = self.emit_register_load(&ins.src[1], src_mask)?;

        let vtype = scalar(ins.dst[0].data_type);
        let type_id = self.get_vector_type_id(vtype);
        let id = self.module.op_dot(type_id, a.id, b.id);

        let value = RegisterValue { vtype, id };
        let value = self.emit_dst_modifiers(value, ins.modifiers.saturate);
        self.emit_register_store(&ins.dst[0], value)
    }

    /// `imul`/`umul`: full 64-bit multiply with the high half in dst0 and
    /// the low half in dst1; either destination may be null.
    pub(crate) fn emit_vector_imul(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let hi = &ins.dst[0];
        let lo = &ins.dst[1];
        let signed = ins.op == Opcode::IMul;

        if hi.kind == OperandType::Null && lo.kind == OperandType::Null {
            return Ok(());
        }

        // Low half only: a plain multiply suffices.
        if hi.kind == OperandType::Null {
            let mask = lo.mask;
            let a = self.emit_register_load(&ins.src[0], mask)?;
            let b = self.emit_register_load(&ins.src[1], mask)?;
            let vtype = VectorType {
                ctype: lo.data_type,
                ccount: mask.count(),
            };
            let type_id = self.get_vector_type_id(vtype);
            let id = self.module.op_imul(type_id, a.id, b.id);
            let value = self.emit_dst_modifiers(RegisterValue { vtype, id }, ins.modifiers.saturate);
            return self.emit_register_store(lo, value);
        }

        // Extended multiply: a struct of (low, high) vectors.
        let mask = hi.mask;
        let a = self.emit_register_load(&ins.src[0], mask)?;
        let b = self.emit_register_load(&ins.src[1], mask)?;
        let vtype = VectorType {
            ctype: hi.data_type,
            ccount: mask.count(),
        };
        let type_id = self.get_vector_type_id(vtype);
        let pair_type = self.module.def_struct_type(&[type_id, type_id]);
        let pair = if signed {
            self.module.op_smul_extended(pair_type, a.id, b.id)
        } else {
            self.module.op_umul_extended(pair_type, a.id, b.id)
        };

        let hi_id = self.module.op_composite_extract(type_id, pair, &[1]);
        self.emit_register_store(hi, RegisterValue { vtype, id: hi_id })?;
        if lo.kind != OperandType::Null {
            let lo_id = self.module.op_composite_extract(type_id, pair, &[0]);
            self.emit_register_store(lo, RegisterValue { vtype, id: lo_id })?;
        }
        Ok(())
    }

    /// `udiv`: quotient in dst0, remainder in dst1, either may be null.
    pub(crate) fn emit_vector_idiv(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let quotient = &ins.dst[0];
        let remainder = &ins.dst[1];

        if quotient.kind != OperandType::Null {
            let mask = quotient.mask;
            let a = self.emit_register_load(&ins.src[0], mask)?;
            let b = self.emit_register_load(&ins.src[1], mask)?;
            let vtype = VectorType {
                ctype: quotient.data_type,
                ccount: mask.count(),
            };
            let type_id = self.get_vector_type_id(vtype);
            let id = self.module.op_udiv(type_id, a.id, b.id);
            self.emit_register_store(quotient, RegisterValue { vtype, id })?;
        }
        if remainder.kind != OperandType::Null {
            let mask = remainder.mask;
            let a = self.emit_register_load(&ins.src[0], mask)?;
            let b = self.emit_register_load(&ins.src[1], mask)?;
            let vtype = VectorType {
                ctype: remainder.data_type,
                ccount: mask.count(),
            };
            let type_id = self.get_vector_type_id(vtype);
            let id = self.module.op_umod(type_id, a.id, b.id);
            self.emit_register_store(remainder, RegisterValue { vtype, id })?;
        }
        Ok(())
    }

    /// `sincos`: sine into dst0, cosine into dst1. (The D3D instruction has
    /// no output-sharing semantics; either destination may be null.)
    pub(crate) fn emit_vector_sin_cos(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let src = self.emit_register_load(&ins.src[0], WriteMask::XYZW)?;

        if ins.dst[0].kind != OperandType::Null {
            let input = self.emit_register_extract(src, ins.dst[0].mask);
            let type_id = self.get_vector_type_id(input.vtype);
            let id = self.module.op_sin(type_id, input.id);
            self.emit_register_store(
                &ins.dst[0],
                RegisterValue {
                    vtype: input.vtype,
                    id,
                },
            )?;
        }

        if ins.dst[1].kind != OperandType::Null {
            let input = self.emit_register_extract(src, ins.dst[1].mask);
            let type_id = self.get_vector_type_id(input.vtype);
            let id = self.module.op_cos(type_id, input.id);
            self.emit_register_store(
                &ins.dst[1],
                RegisterValue {
                    vtype: input.vtype,
                    id,
                },
            )?;
        }
        Ok(())
    }

    pub(crate) fn emit_vector_deriv(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let mask = ins.dst[0].mask;
        let src = self.emit_register_load(&ins.src[0], mask)?;
        let vtype = VectorType {
            ctype: ins.dst[0].data_type,
            ccount: mask.count(),
        };
        let type_id = self.get_vector_type_id(vtype);

        if matches!(
            ins.op,
            Opcode::DerivRtxCoarse
                | Opcode::DerivRtxFine
                | Opcode::DerivRtyCoarse
                | Opcode::DerivRtyFine
        ) {
            self.module
                .enable_capability(spirv::Capability::DerivativeControl);
        }

        let id = match ins.op {
            Opcode::DerivRtx => self.module.op_dpdx(type_id, src.id),
            Opcode::DerivRty => self.module.op_dpdy(type_id, src.id),
            Opcode::DerivRtxCoarse => self.module.op_dpdx_coarse(type_id, src.id),
            Opcode::DerivRtxFine => self.module.op_dpdx_fine(type_id, src.id),
            Opcode::DerivRtyCoarse => self.module.op_dpdy_coarse(type_id, src.id),
            Opcode::DerivRtyFine => self.module.op_dpdy_fine(type_id, src.id),
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };

        let value = self.emit_dst_modifiers(RegisterValue { vtype, id }, ins.modifiers.saturate);
        self.emit_register_store(&ins.dst[0], value)
    }

    /// `firstbit_{hi,lo,shi}`. SPIR-V counts from the LSB, D3D's `hi`
    /// variants count from the MSB, so those results are flipped except for
    /// the all-zero (-1) case.
    pub(crate) fn emit_bit_scan(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let mask = ins.dst[0].mask;
        let src = self.emit_register_load(&ins.src[0], mask)?;
        let vtype = VectorType {
            ctype: ins.dst[0].data_type,
            ccount: mask.count(),
        };
        let type_id = self.get_vector_type_id(vtype);

        let raw = match ins.op {
            Opcode::FirstBitLo => {
                let id = self.module.op_find_i_lsb(type_id, src.id);
                return self.emit_register_store(&ins.dst[0], RegisterValue { vtype, id });
            }
            Opcode::FirstBitHi => self.module.op_find_u_msb(type_id, src.id),
            Opcode::FirstBitShi => self.module.op_find_s_msb(type_id, src.id),
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };

        let bool_scalar = self.module.def_bool_type();
        let bool_type = if vtype.ccount > 1 {
            self.module.def_vector_type(bool_scalar, vtype.ccount)
        } else {
            bool_scalar
        };
        let not_found = self.build_const_replicant(vtype.ctype, vtype.ccount, !0u32);
        let thirty_one = self.build_const_replicant(vtype.ctype, vtype.ccount, 31);
        let found = self.module.op_ine(bool_type, raw, not_found.id);
        let flipped = self.module.op_isub(type_id, thirty_one.id, raw);
        let id = self.module.op_select(type_id, found, flipped, not_found.id);

        self.emit_register_store(&ins.dst[0], RegisterValue { vtype, id })
    }

    /// `ubfe`/`ibfe`: dst = extract(width=src0, offset=src1, value=src2).
    pub(crate) fn emit_bit_extract(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let mask = ins.dst[0].mask;
        let width = self.emit_register_load(&ins.src[0], mask)?;
        let offset = self.emit_register_load(&ins.src[1], mask)?;
        let value = self.emit_register_load(&ins.src[2], mask)?;

        let vtype = VectorType {
            ctype: ins.dst[0].data_type,
            ccount: mask.count(),
        };
        let type_id = self.get_vector_type_id(vtype);

        let (width, offset) = self.emit_mask_bit_counts(width, offset);
        let id = if ins.op == Opcode::IBfe {
            self.module
                .op_bit_field_s_extract(type_id, value.id, offset, width)
        } else {
            self.module
                .op_bit_field_u_extract(type_id, value.id, offset, width)
        };

        self.emit_register_store(&ins.dst[0], RegisterValue { vtype, id })
    }

    /// `bfi`: dst = insert(width=src0, offset=src1, insert=src2, base=src3).
    pub(crate) fn emit_bit_insert(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let mask = ins.dst[0].mask;
        let width = self.emit_register_load(&ins.src[0], mask)?;
        let offset = self.emit_register_load(&ins.src[1], mask)?;
        let insert = self.emit_register_load(&ins.src[2], mask)?;
        let base = self.emit_register_load(&ins.src[3], mask)?;

        let vtype = VectorType {
            ctype: ins.dst[0].data_type,
            ccount: mask.count(),
        };
        let type_id = self.get_vector_type_id(vtype);

        let (width, offset) = self.emit_mask_bit_counts(width, offset);
        let id = self
            .module
            .op_bit_field_insert(type_id, base.id, insert.id, offset, width);

        self.emit_register_store(&ins.dst[0], RegisterValue { vtype, id })
    }

    /// Masks bit-field width/offset operands to the 0..31 range the
    /// hardware honors.
    fn emit_mask_bit_counts(
        &mut self,
        width: RegisterValue,
        offset: RegisterValue,
    ) -> (sirocco_spirv::Word, sirocco_spirv::Word) {
        let mask = self.build_const_replicant(width.vtype.ctype, width.vtype.ccount, 31);
        let width_type = self.get_vector_type_id(width.vtype);
        let offset_type = self.get_vector_type_id(offset.vtype);
        let width = self.module.op_bitwise_and(width_type, width.id, mask.id);
        let offset = self.module.op_bitwise_and(offset_type, offset.id, mask.id);
        (width, offset)
    }

    /// `f32tof16` / `f16tof32`, lowered per component through the half
    /// pack/unpack extended instructions.
    pub(crate) fn emit_convert_float16(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let mask = ins.dst[0].mask;
        let src = self.emit_register_load(&ins.src[0], mask)?;
        let ccount = mask.count();

        let f32_type = self.module.def_float_type(32);
        let u32_type = self.module.def_int_type(32, 0);
        let f32x2_type = self.module.def_vector_type(f32_type, 2);

        let mut parts = [0u32; 4];
        for i in 0..ccount {
            let component = if ccount == 1 {
                src.id
            } else {
                let scalar_type = self.get_scalar_type_id(src.vtype.ctype);
                self.module.op_composite_extract(scalar_type, src.id, &[i])
            };
            parts[i as usize] = match ins.op {
                Opcode::F32toF16 => {
                    let zero = self.module.const_f32(0.0);
                    let pair = self
                        .module
                        .op_composite_construct(f32x2_type, &[component, zero]);
                    self.module.op_pack_half_2x16(u32_type, pair)
                }
                Opcode::F16toF32 => {
                    let pair = self.module.op_unpack_half_2x16(f32x2_type, component);
                    self.module.op_composite_extract(f32_type, pair, &[0])
                }
                other => return Err(TranslateError::UnsupportedOpcode { op: other }),
            };
        }

        let vtype = VectorType {
            ctype: ins.dst[0].data_type,
            ccount,
        };
        let id = if ccount == 1 {
            parts[0]
        } else {
            let type_id = self.get_vector_type_id(vtype);
            self.module
                .op_composite_construct(type_id, &parts[..ccount as usize])
        };

        self.emit_register_store(&ins.dst[0], RegisterValue { vtype, id })
    }

}
