//! Register access: typed values, operand pointers, and the load/store
//! pipeline (swizzle + mask extraction, bit-casts, operand modifiers,
//! partial writes).

use sirocco_spirv::Word;

use crate::sm4::decode::{RegIndex, Register};
use crate::sm4::opcode::{OperandModifier, OperandType, ScalarType};
use crate::sm4::{Swizzle, WriteMask};

use super::{scalar, vec4_f32, Compiler, TranslateError};

/// A value type: scalar component type plus component count (1..4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VectorType {
    pub ctype: ScalarType,
    pub ccount: u32,
}

/// Type and storage class of a variable to declare.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RegisterInfo {
    pub vtype: VectorType,
    pub storage_class: spirv::StorageClass,
}

/// An SSA value with its type.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RegisterValue {
    pub vtype: VectorType,
    pub id: Word,
}

/// A pointer into some register file or builtin.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RegisterPointer {
    pub vtype: VectorType,
    pub id: Word,
}

impl Compiler<'_> {
    // --- Type helpers -----------------------------------------------------

    pub(crate) fn get_scalar_type_id(&mut self, ctype: ScalarType) -> Word {
        match ctype {
            ScalarType::Uint32 => self.module.def_int_type(32, 0),
            ScalarType::Uint64 => self.module.def_int_type(64, 0),
            ScalarType::Sint32 => self.module.def_int_type(32, 1),
            ScalarType::Sint64 => self.module.def_int_type(64, 1),
            ScalarType::Float32 => self.module.def_float_type(32),
            ScalarType::Float64 => self.module.def_float_type(64),
            ScalarType::Bool => self.module.def_bool_type(),
        }
    }

    pub(crate) fn get_vector_type_id(&mut self, vtype: VectorType) -> Word {
        let scalar_id = self.get_scalar_type_id(vtype.ctype);
        if vtype.ccount > 1 {
            self.module.def_vector_type(scalar_id, vtype.ccount)
        } else {
            scalar_id
        }
    }

    pub(crate) fn get_pointer_type_id(&mut self, info: RegisterInfo) -> Word {
        let type_id = self.get_vector_type_id(info.vtype);
        self.module.def_pointer_type(type_id, info.storage_class)
    }

    pub(crate) fn emit_new_variable(&mut self, info: RegisterInfo) -> Word {
        let ptr_type = self.get_pointer_type_id(info);
        self.module.new_var(ptr_type, info.storage_class)
    }

    /// Constant vector with all components set to the same u32 bit pattern,
    /// typed per `ctype`.
    pub(crate) fn build_const_replicant(
        &mut self,
        ctype: ScalarType,
        ccount: u32,
        bits: u32,
    ) -> RegisterValue {
        let id = match ctype {
            ScalarType::Float32 => self
                .module
                .const_f32_replicant(f32::from_bits(bits), ccount),
            ScalarType::Sint32 => self.module.const_i32_replicant(bits as i32, ccount),
            _ => self.module.const_u32_replicant(bits, ccount),
        };
        RegisterValue {
            vtype: VectorType { ctype, ccount },
            id,
        }
    }

    // --- Value manipulation -----------------------------------------------

    /// Reinterprets a value's bit pattern as another scalar type.
    pub(crate) fn emit_register_bitcast(
        &mut self,
        value: RegisterValue,
        ctype: ScalarType,
    ) -> RegisterValue {
        if value.vtype.ctype == ctype {
            return value;
        }
        let vtype = VectorType {
            ctype,
            ccount: value.vtype.ccount,
        };
        let type_id = self.get_vector_type_id(vtype);
        RegisterValue {
            vtype,
            id: self.module.op_bitcast(type_id, value.id),
        }
    }

    /// Applies an operand swizzle under a write mask: the result has one
    /// component per set mask bit, taken from the swizzled source.
    pub(crate) fn emit_register_swizzle(
        &mut self,
        value: RegisterValue,
        swizzle: Swizzle,
        write_mask: WriteMask,
    ) -> RegisterValue {
        let mut indices = [0u32; 4];
        let mut count = 0usize;
        for i in 0..value.vtype.ccount {
            if write_mask.contains(i) {
                indices[count] = swizzle.get(i);
                count += 1;
            }
        }

        // A full identity selection needs no code.
        let is_identity = count as u32 == value.vtype.ccount
            && indices[..count].iter().enumerate().all(|(i, &c)| c as usize == i);
        if is_identity {
            return value;
        }

        let vtype = VectorType {
            ctype: value.vtype.ctype,
            ccount: count as u32,
        };
        let type_id = self.get_vector_type_id(vtype);
        let id = if count == 1 {
            if value.vtype.ccount == 1 {
                value.id
            } else {
                self.module
                    .op_composite_extract(type_id, value.id, &indices[..1])
            }
        } else {
            self.module
                .op_vector_shuffle(type_id, value.id, value.id, &indices[..count])
        };
        RegisterValue { vtype, id }
    }

    /// Extracts the masked components of a value with an identity swizzle.
    pub(crate) fn emit_register_extract(
        &mut self,
        value: RegisterValue,
        mask: WriteMask,
    ) -> RegisterValue {
        self.emit_register_swizzle(value, Swizzle::XYZW, mask)
    }

    /// Inserts `src` into the masked lanes of `dst`.
    pub(crate) fn emit_register_insert(
        &mut self,
        dst: RegisterValue,
        src: RegisterValue,
        mask: WriteMask,
    ) -> RegisterValue {
        let type_id = self.get_vector_type_id(dst.vtype);

        let id = if mask.count() == 0 {
            dst.id
        } else if dst.vtype.ccount == 1 {
            // Both scalar; the mask's first bit decides.
            if mask.contains(0) {
                src.id
            } else {
                dst.id
            }
        } else if src.vtype.ccount == 1 {
            // OpVectorShuffle needs two vectors, so insert the scalar.
            let component = mask.first();
            self.module
                .op_composite_insert(type_id, src.id, dst.id, &[component])
        } else {
            // Masked lanes pull from `src` (appended after the `dst`
            // components in shuffle index space), the rest keep `dst`.
            let mut components = [0u32; 4];
            let mut src_component = dst.vtype.ccount;
            for i in 0..dst.vtype.ccount {
                components[i as usize] = if mask.contains(i) {
                    let c = src_component;
                    src_component += 1;
                    c
                } else {
                    i
                };
            }
            self.module.op_vector_shuffle(
                type_id,
                dst.id,
                src.id,
                &components[..dst.vtype.ccount as usize],
            )
        };

        RegisterValue {
            vtype: dst.vtype,
            id,
        }
    }

    /// Replicates a scalar into an n-component vector.
    pub(crate) fn emit_register_extend(
        &mut self,
        value: RegisterValue,
        ccount: u32,
    ) -> RegisterValue {
        if ccount == 1 || value.vtype.ccount == ccount {
            return value;
        }
        let vtype = VectorType {
            ctype: value.vtype.ctype,
            ccount,
        };
        let type_id = self.get_vector_type_id(vtype);
        let parts = [value.id; 4];
        RegisterValue {
            vtype,
            id: self
                .module
                .op_composite_construct(type_id, &parts[..ccount as usize]),
        }
    }

    fn emit_register_absolute(&mut self, value: RegisterValue) -> RegisterValue {
        let type_id = self.get_vector_type_id(value.vtype);
        let id = match value.vtype.ctype {
            ScalarType::Float32 => self.module.op_fabs(type_id, value.id),
            ScalarType::Sint32 => self.module.op_sabs(type_id, value.id),
            _ => value.id,
        };
        RegisterValue { id, ..value }
    }

    fn emit_register_negate(&mut self, value: RegisterValue) -> RegisterValue {
        let type_id = self.get_vector_type_id(value.vtype);
        let id = match value.vtype.ctype {
            ScalarType::Float32 => self.module.op_fnegate(type_id, value.id),
            _ => self.module.op_snegate(type_id, value.id),
        };
        RegisterValue { id, ..value }
    }

    fn emit_src_modifiers(
        &mut self,
        value: RegisterValue,
        modifier: OperandModifier,
    ) -> RegisterValue {
        let mut value = value;
        if modifier.has_abs() {
            value = self.emit_register_absolute(value);
        }
        if modifier.has_neg() {
            value = self.emit_register_negate(value);
        }
        value
    }

    /// Applies result modifiers (saturation) before a store.
    pub(crate) fn emit_dst_modifiers(
        &mut self,
        value: RegisterValue,
        saturate: bool,
    ) -> RegisterValue {
        if saturate && value.vtype.ctype == ScalarType::Float32 {
            let type_id = self.get_vector_type_id(value.vtype);
            let zero = self.build_const_replicant(ScalarType::Float32, value.vtype.ccount, 0f32.to_bits());
            let one = self.build_const_replicant(ScalarType::Float32, value.vtype.ccount, 1f32.to_bits());
            return RegisterValue {
                vtype: value.vtype,
                id: self.module.op_fclamp(type_id, value.id, zero.id, one.id),
            };
        }
        value
    }

    // --- Operand pointers -------------------------------------------------

    /// Loads a register-index expression as a signed 32-bit scalar,
    /// emitting the add for `base + r#.c` relative forms.
    pub(crate) fn emit_index_load(
        &mut self,
        index: &RegIndex,
    ) -> Result<RegisterValue, TranslateError> {
        if let Some(relative) = &index.relative {
            let mut value = self.emit_register_load(relative, WriteMask::X)?;
            if index.offset != 0 {
                let type_id = self.get_vector_type_id(value.vtype);
                let offset = self.module.const_i32(index.offset);
                value.id = self.module.op_iadd(type_id, value.id, offset);
            }
            Ok(value)
        } else {
            Ok(RegisterValue {
                vtype: scalar(ScalarType::Sint32),
                id: self.module.const_i32(index.offset),
            })
        }
    }

    fn immediate_index(&self, index: &RegIndex, what: &str) -> Result<usize, TranslateError> {
        if !index.is_immediate() || index.offset < 0 {
            return Err(TranslateError::InvalidOperand {
                context: format!("{what} index must be a non-negative immediate"),
            });
        }
        Ok(index.offset as usize)
    }

    fn get_temp_ptr(&mut self, reg: &Register) -> Result<RegisterPointer, TranslateError> {
        let index = self.immediate_index(&reg.index[0], "temp register")?;
        let var_id = *self.r_regs.get(index).filter(|&&id| id != 0).ok_or_else(|| {
            TranslateError::InvalidOperandIndex {
                context: format!("r{index} used without matching dcl_temps"),
            }
        })?;
        Ok(RegisterPointer {
            vtype: vec4_f32(),
            id: var_id,
        })
    }

    fn get_indexable_temp_ptr(&mut self, reg: &Register) -> Result<RegisterPointer, TranslateError> {
        let array = self.immediate_index(&reg.index[0], "indexable temp")?;
        let slot = *self
            .x_regs
            .get(array)
            .filter(|slot| slot.var_id != 0)
            .ok_or_else(|| TranslateError::InvalidOperandIndex {
                context: format!("x{array} used without matching dcl_indexableTemp"),
            })?;

        if reg.index[1].is_immediate() && reg.index[1].offset as u32 >= slot.len {
            tracing::warn!(
                "x{array}[{}] indexes past the declared length {}",
                reg.index[1].offset,
                slot.len
            );
        }
        let element = self.emit_index_load(&reg.index[1])?;
        let vtype = VectorType {
            ctype: ScalarType::Float32,
            ccount: slot.component_count,
        };
        let ptr_type = self.get_pointer_type_id(RegisterInfo {
            vtype,
            storage_class: spirv::StorageClass::Private,
        });
        let id = self
            .module
            .op_access_chain(ptr_type, slot.var_id, &[element.id]);
        Ok(RegisterPointer {
            vtype,
            id,
        })
    }

    fn get_input_ptr(&mut self, reg: &Register) -> Result<RegisterPointer, TranslateError> {
        // Geometry shader inputs carry a leading vertex index.
        let (vertex, reg_dim) = match reg.index_dim {
            1 => (None, 0),
            2 => (Some(&reg.index[0]), 1),
            dim => {
                return Err(TranslateError::InvalidOperand {
                    context: format!("input register with index dimension {dim}"),
                })
            }
        };
        let index = self.immediate_index(&reg.index[reg_dim], "input register")?;
        let var = self
            .v_regs
            .get(index)
            .copied()
            .filter(|v| v.var_id != 0)
            .ok_or_else(|| TranslateError::InvalidOperandIndex {
                context: format!("v{index} used without matching declaration"),
            })?;
        let storage_class = var.storage_class.unwrap_or(spirv::StorageClass::Input);

        let id = if let Some(vertex) = vertex {
            if var.array_len == 0 {
                return Err(TranslateError::InvalidOperand {
                    context: format!("v{index} is not an arrayed input"),
                });
            }
            let vertex = self.emit_index_load(vertex)?;
            let ptr_type = self.get_pointer_type_id(RegisterInfo {
                vtype: vec4_f32(),
                storage_class,
            });
            self.module
                .op_access_chain(ptr_type, var.var_id, &[vertex.id])
        } else {
            var.var_id
        };

        Ok(RegisterPointer {
            vtype: vec4_f32(),
            id,
        })
    }

    fn get_output_ptr(&mut self, reg: &Register) -> Result<RegisterPointer, TranslateError> {
        if reg.index_dim != 1 {
            return Err(TranslateError::InvalidOperand {
                context: format!(
                    "output register with index dimension {}",
                    reg.index_dim
                ),
            });
        }
        let index = self.immediate_index(&reg.index[0], "output register")?;
        let var = self
            .o_regs
            .get(index)
            .copied()
            .filter(|v| v.var_id != 0)
            .ok_or_else(|| TranslateError::InvalidOperandIndex {
                context: format!("o{index} used without matching declaration"),
            })?;

        let vtype = if self.stage == sirocco_dxbc::sm4::ShaderStage::Pixel {
            self.ps_o_types[index]
        } else {
            vec4_f32()
        };
        Ok(RegisterPointer {
            vtype,
            id: var.var_id,
        })
    }

    fn get_constant_buffer_ptr(&mut self, reg: &Register) -> Result<RegisterPointer, TranslateError> {
        let buffer = self.immediate_index(&reg.index[0], "constant buffer")?;
        let slot = *self
            .constant_buffers
            .get(buffer)
            .filter(|slot| slot.var_id != 0)
            .ok_or_else(|| TranslateError::InvalidOperandIndex {
                context: format!("cb{buffer} used without matching declaration"),
            })?;

        if reg.index[1].is_immediate() && reg.index[1].offset as u32 >= slot.size {
            tracing::warn!(
                "cb{buffer}[{}] indexes past the declared size {}",
                reg.index[1].offset,
                slot.size
            );
        }
        let element = self.emit_index_load(&reg.index[1])?;
        let member = self.module.const_u32(0);
        let ptr_type = self.get_pointer_type_id(RegisterInfo {
            vtype: vec4_f32(),
            storage_class: spirv::StorageClass::Uniform,
        });
        let id = self
            .module
            .op_access_chain(ptr_type, slot.var_id, &[member, element.id]);
        Ok(RegisterPointer {
            vtype: vec4_f32(),
            id,
        })
    }

    fn get_immediate_cb_ptr(&mut self, reg: &Register) -> Result<RegisterPointer, TranslateError> {
        if self.icb_var == 0 {
            return Err(TranslateError::InvalidOperand {
                context: "icb used without an immediate constant buffer".to_owned(),
            });
        }
        let element = self.emit_index_load(&reg.index[0])?;
        let ptr_type = self.get_pointer_type_id(RegisterInfo {
            vtype: vec4_f32(),
            storage_class: spirv::StorageClass::Private,
        });
        let id = self
            .module
            .op_access_chain(ptr_type, self.icb_var, &[element.id]);
        Ok(RegisterPointer {
            vtype: vec4_f32(),
            id,
        })
    }

    /// Resolves an operand to a pointer into its register file.
    pub(crate) fn emit_get_operand_ptr(
        &mut self,
        reg: &Register,
    ) -> Result<RegisterPointer, TranslateError> {
        match reg.kind {
            OperandType::Temp => self.get_temp_ptr(reg),
            OperandType::IndexableTemp => self.get_indexable_temp_ptr(reg),
            OperandType::Input => self.get_input_ptr(reg),
            OperandType::Output => self.get_output_ptr(reg),
            OperandType::ConstantBuffer => self.get_constant_buffer_ptr(reg),
            OperandType::ImmediateConstantBuffer => self.get_immediate_cb_ptr(reg),
            OperandType::InputThreadId => Ok(self.builtin_var(spirv::BuiltIn::GlobalInvocationId)),
            OperandType::InputThreadGroupId => Ok(self.builtin_var(spirv::BuiltIn::WorkgroupId)),
            OperandType::InputThreadIdInGroup => {
                Ok(self.builtin_var(spirv::BuiltIn::LocalInvocationId))
            }
            OperandType::InputThreadIndexInGroup => {
                Ok(self.builtin_var(spirv::BuiltIn::LocalInvocationIndex))
            }
            OperandType::InputPrimitiveId => Ok(self.builtin_var(spirv::BuiltIn::PrimitiveId)),
            OperandType::InputGsInstanceId => Ok(self.builtin_var(spirv::BuiltIn::InvocationId)),
            OperandType::InputDomainPoint => Ok(self.builtin_var(spirv::BuiltIn::TessCoord)),
            OperandType::OutputDepth => Ok(self.builtin_var(spirv::BuiltIn::FragDepth)),
            other => Err(TranslateError::InvalidOperand {
                context: format!("operand type {other:?} is not addressable here"),
            }),
        }
    }

    // --- Loads and stores -------------------------------------------------

    pub(crate) fn emit_value_load(&mut self, ptr: RegisterPointer) -> RegisterValue {
        let type_id = self.get_vector_type_id(ptr.vtype);
        RegisterValue {
            vtype: ptr.vtype,
            id: self.module.op_load(type_id, ptr.id),
        }
    }

    pub(crate) fn emit_value_store(
        &mut self,
        ptr: RegisterPointer,
        mut value: RegisterValue,
        write_mask: WriteMask,
    ) {
        // A zero mask writes nothing.
        if write_mask.count() == 0 {
            return;
        }

        if value.vtype.ctype != ptr.vtype.ctype {
            value = self.emit_register_bitcast(value, ptr.vtype.ctype);
        }

        // Scalar sources replicate into every masked lane.
        if value.vtype.ccount == 1 {
            value = self.emit_register_extend(value, write_mask.count());
        }

        if ptr.vtype.ccount == write_mask.count() {
            self.module.op_store(ptr.id, value.id);
        } else {
            // Partial write: load, merge the masked lanes, store back.
            let current = self.emit_value_load(ptr);
            let merged = self.emit_register_insert(current, value, write_mask);
            self.module.op_store(ptr.id, merged.id);
        }
    }

    /// Loads a source operand: resolve the pointer, apply swizzle and mask,
    /// bit-cast to the instruction's scalar type, then apply abs/neg.
    pub(crate) fn emit_register_load(
        &mut self,
        reg: &Register,
        write_mask: WriteMask,
    ) -> Result<RegisterValue, TranslateError> {
        if reg.kind == OperandType::Imm32 {
            let value = self.emit_immediate_load(reg, write_mask);
            let value = self.emit_register_bitcast(value, reg.data_type);
            return Ok(self.emit_src_modifiers(value, reg.modifier));
        }

        let ptr = self.emit_get_operand_ptr(reg)?;
        let value = self.emit_value_load(ptr);
        let value = self.emit_register_swizzle(value, reg.swizzle, write_mask);
        // Bit-cast after swizzling so component counts line up.
        let value = self.emit_register_bitcast(value, reg.data_type);
        Ok(self.emit_src_modifiers(value, reg.modifier))
    }

    fn emit_immediate_load(&mut self, reg: &Register, write_mask: WriteMask) -> RegisterValue {
        use crate::sm4::opcode::ComponentCount;

        if reg.component_count == ComponentCount::C1 {
            return RegisterValue {
                vtype: scalar(ScalarType::Uint32),
                id: self.module.const_u32(reg.imm[0]),
            };
        }

        // Build a constant vector of the masked components.
        let mut parts = [0u32; 4];
        let mut count = 0usize;
        for i in 0..4 {
            if write_mask.contains(i) {
                parts[count] = self.module.const_u32(reg.imm[i as usize]);
                count += 1;
            }
        }
        if count == 1 {
            return RegisterValue {
                vtype: scalar(ScalarType::Uint32),
                id: parts[0],
            };
        }
        let vtype = VectorType {
            ctype: ScalarType::Uint32,
            ccount: count as u32,
        };
        let type_id = self.get_vector_type_id(vtype);
        RegisterValue {
            vtype,
            id: self.module.const_composite(type_id, &parts[..count]),
        }
    }

    /// Stores a computed value into a destination operand, honoring its
    /// write mask.
    pub(crate) fn emit_register_store(
        &mut self,
        reg: &Register,
        value: RegisterValue,
    ) -> Result<(), TranslateError> {
        let ptr = self.emit_get_operand_ptr(reg)?;
        self.emit_value_store(ptr, value, reg.mask);
        Ok(())
    }
}
