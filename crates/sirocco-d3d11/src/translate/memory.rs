//! Raw and structured buffer access, typed UAV loads/stores, shared-memory
//! access and atomics.
//!
//! Raw and structured resources are modelled as storage buffers holding a
//! runtime array of 32-bit words with a 4-byte stride; thread-group shared
//! memory uses a fixed-size word array in `Workgroup` storage. All byte
//! offsets coming from the shader are divided down to word indices.

use sirocco_spirv::Word;

use crate::sm4::decode::{Instruction, Register};
use crate::sm4::opcode::{Opcode, OperandType, ResourceDim, ScalarType};
use crate::sm4::WriteMask;

use super::{scalar, Compiler, ImageInfo, RegisterValue, ResourceKind, TranslateError, VectorType};

/// Where a buffer-like operand lives, and how to index it.
pub(crate) struct BufferAccess {
    pub var_id: Word,
    /// Structure stride in bytes; 4 for raw buffers.
    pub stride: u32,
    pub storage_class: spirv::StorageClass,
}

impl Compiler<'_> {
    /// Resolves a `t#`/`u#`/`g#` operand to its buffer variable. Fails for
    /// typed resources.
    fn buffer_access(&mut self, reg: &Register) -> Result<BufferAccess, TranslateError> {
        let index = reg.index[0].offset as usize;
        match reg.kind {
            OperandType::Resource | OperandType::UnorderedAccessView => {
                let is_uav = reg.kind == OperandType::UnorderedAccessView;
                let table = if is_uav { &self.uavs } else { &self.textures };
                let slot = table
                    .get(index)
                    .copied()
                    .filter(|slot| slot.var_id != 0)
                    .ok_or_else(|| TranslateError::InvalidOperandIndex {
                        context: format!(
                            "{}{index} used without matching declaration",
                            if is_uav { 'u' } else { 't' }
                        ),
                    })?;
                let stride = match slot.kind {
                    ResourceKind::RawBuffer => 4,
                    ResourceKind::StructuredBuffer { stride } => stride,
                    _ => {
                        return Err(TranslateError::InvalidOperand {
                            context: format!(
                                "{}{index} is not a raw or structured buffer",
                                if is_uav { 'u' } else { 't' }
                            ),
                        })
                    }
                };
                Ok(BufferAccess {
                    var_id: slot.var_id,
                    stride,
                    storage_class: spirv::StorageClass::Uniform,
                })
            }
            OperandType::ThreadGroupSharedMemory => {
                let slot = self
                    .tgsm
                    .get(index)
                    .copied()
                    .flatten()
                    .ok_or_else(|| TranslateError::InvalidOperandIndex {
                        context: format!("g{index} used without matching declaration"),
                    })?;
                Ok(BufferAccess {
                    var_id: slot.var_id,
                    stride: slot.stride,
                    storage_class: spirv::StorageClass::Workgroup,
                })
            }
            other => Err(TranslateError::InvalidOperand {
                context: format!("operand type {other:?} is not a buffer resource"),
            }),
        }
    }

    /// Pointer to one 32-bit word of a buffer resource.
    fn buffer_word_ptr(&mut self, access: &BufferAccess, word_index: Word) -> Word {
        let u32_type = self.module.def_int_type(32, 0);
        let ptr_type = self
            .module
            .def_pointer_type(u32_type, access.storage_class);
        if access.storage_class == spirv::StorageClass::Workgroup {
            self.module
                .op_access_chain(ptr_type, access.var_id, &[word_index])
        } else {
            let member = self.module.const_u32(0);
            self.module
                .op_access_chain(ptr_type, access.var_id, &[member, word_index])
        }
    }

    /// Converts a byte offset value to a word index (`offset >> 2`).
    fn byte_offset_to_word_index(&mut self, offset: RegisterValue) -> Word {
        let u32_type = self.module.def_int_type(32, 0);
        let offset = self.emit_register_bitcast(offset, ScalarType::Uint32);
        let two = self.module.const_u32(2);
        self.module.op_shift_right_logical(u32_type, offset.id, two)
    }

    /// Base word index for a raw access (`ld_raw`/`store_raw`/atomics on
    /// raw buffers): the first address component, in bytes.
    fn raw_base_index(&mut self, addr: &Register) -> Result<Word, TranslateError> {
        let offset = self.emit_register_load(addr, WriteMask::X)?;
        Ok(self.byte_offset_to_word_index(offset))
    }

    /// Base word index for a structured access: `index * stride/4 +
    /// byte_offset/4`, with the structure index and byte offset in separate
    /// operands (loads) or address components (atomics).
    fn structured_base_index(
        &mut self,
        index: RegisterValue,
        byte_offset: RegisterValue,
        stride: u32,
    ) -> Word {
        let u32_type = self.module.def_int_type(32, 0);
        let index = self.emit_register_bitcast(index, ScalarType::Uint32);
        let stride_words = self.module.const_u32(stride / 4);
        let base = self.module.op_imul(u32_type, index.id, stride_words);
        let offset_words = self.byte_offset_to_word_index(byte_offset);
        self.module.op_iadd(u32_type, base, offset_words)
    }

    // --- Raw / structured loads and stores --------------------------------

    pub(crate) fn emit_buffer_load(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let (resource_reg, base) = match ins.op {
            Opcode::LdRaw => {
                let base = self.raw_base_index(&ins.src[0])?;
                (&ins.src[1], base)
            }
            Opcode::LdStructured => {
                let resource = &ins.src[2];
                let access = self.buffer_access(resource)?;
                let index = self.emit_register_load(&ins.src[0], WriteMask::X)?;
                let offset = self.emit_register_load(&ins.src[1], WriteMask::X)?;
                let base = self.structured_base_index(index, offset, access.stride);
                (resource, base)
            }
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };
        let access = self.buffer_access(resource_reg)?;

        // One word per enabled destination component, addressed through the
        // resource operand's swizzle.
        let u32_type = self.module.def_int_type(32, 0);
        let mask = ins.dst[0].mask;
        let mut parts = [0u32; 4];
        let mut count = 0usize;
        for i in 0..4 {
            if !mask.contains(i) {
                continue;
            }
            let component = resource_reg.swizzle.get(i);
            let word_index = if component == 0 {
                base
            } else {
                let offset = self.module.const_u32(component);
                self.module.op_iadd(u32_type, base, offset)
            };
            let ptr = self.buffer_word_ptr(&access, word_index);
            parts[count] = self.module.op_load(u32_type, ptr);
            count += 1;
        }

        let vtype = VectorType {
            ctype: ScalarType::Uint32,
            ccount: count as u32,
        };
        let id = if count == 1 {
            parts[0]
        } else {
            let type_id = self.get_vector_type_id(vtype);
            self.module
                .op_composite_construct(type_id, &parts[..count])
        };
        self.emit_register_store(&ins.dst[0], RegisterValue { vtype, id })
    }

    pub(crate) fn emit_buffer_store(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let dst = &ins.dst[0];
        let access = self.buffer_access(dst)?;
        let (base, value_reg) = match ins.op {
            Opcode::StoreRaw => {
                let base = self.raw_base_index(&ins.src[0])?;
                (base, &ins.src[1])
            }
            Opcode::StoreStructured => {
                let index = self.emit_register_load(&ins.src[0], WriteMask::X)?;
                let offset = self.emit_register_load(&ins.src[1], WriteMask::X)?;
                let base = self.structured_base_index(index, offset, access.stride);
                (base, &ins.src[2])
            }
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };

        let mask = dst.mask;
        let value = self.emit_register_load(value_reg, mask)?;
        let value = self.emit_register_bitcast(value, ScalarType::Uint32);

        let u32_type = self.module.def_int_type(32, 0);
        let mut extracted = 0u32;
        for i in 0..4 {
            if !mask.contains(i) {
                continue;
            }
            let component = if value.vtype.ccount == 1 {
                value.id
            } else {
                self.module
                    .op_composite_extract(u32_type, value.id, &[extracted])
            };
            extracted += 1;

            let word_index = if i == 0 {
                base
            } else {
                let offset = self.module.const_u32(i);
                self.module.op_iadd(u32_type, base, offset)
            };
            let ptr = self.buffer_word_ptr(&access, word_index);
            self.module.op_store(ptr, component);
        }
        Ok(())
    }

    // --- Typed UAV access -------------------------------------------------

    fn storage_image(&mut self, reg: &Register) -> Result<(Word, ImageInfo), TranslateError> {
        let index = reg.index[0].offset as usize;
        let slot = self
            .uavs
            .get(index)
            .copied()
            .filter(|slot| slot.var_id != 0)
            .ok_or_else(|| TranslateError::InvalidOperandIndex {
                context: format!("u{index} used without matching declaration"),
            })?;
        match slot.kind {
            ResourceKind::StorageImage(info) => Ok((slot.var_id, info)),
            _ => Err(TranslateError::InvalidOperand {
                context: format!("u{index} is not a typed UAV"),
            }),
        }
    }

    pub(crate) fn emit_typed_uav_load(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let (var_id, info) = self.storage_image(&ins.src[1])?;
        let coord = self.emit_uav_coordinate(&ins.src[0], info.dim)?;

        let image_value = self.module.op_load(info.image_type_id, var_id);
        let result_type = self.get_vector_type_id(VectorType {
            ctype: info.sampled_type,
            ccount: 4,
        });
        let texel = self.module.op_image_read(
            result_type,
            image_value,
            coord,
            &sirocco_spirv::ImageOperands::default(),
        );

        let value = RegisterValue {
            vtype: VectorType {
                ctype: info.sampled_type,
                ccount: 4,
            },
            id: texel,
        };
        let value = self.emit_register_swizzle(value, ins.src[1].swizzle, ins.dst[0].mask);
        let value = self.emit_register_bitcast(value, ins.dst[0].data_type);
        self.emit_register_store(&ins.dst[0], value)
    }

    pub(crate) fn emit_typed_uav_store(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let (var_id, info) = self.storage_image(&ins.dst[0])?;
        let coord = self.emit_uav_coordinate(&ins.src[0], info.dim)?;

        let value = self.emit_register_load(&ins.src[1], WriteMask::XYZW)?;
        let value = self.emit_register_bitcast(value, info.sampled_type);

        let image_value = self.module.op_load(info.image_type_id, var_id);
        self.module.op_image_write(
            image_value,
            coord,
            value.id,
            &sirocco_spirv::ImageOperands::default(),
        );
        Ok(())
    }

    /// Loads a typed-UAV coordinate with as many components as the image
    /// dimension requires.
    fn emit_uav_coordinate(
        &mut self,
        reg: &Register,
        dim: ResourceDim,
    ) -> Result<Word, TranslateError> {
        let ccount = image_coordinate_components(dim);
        let coord = self.emit_register_load(reg, WriteMask::first_n(ccount))?;
        Ok(coord.id)
    }

    // --- Atomics ----------------------------------------------------------

    pub(crate) fn emit_atomic(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        // Immediate variants return the original value through a leading
        // feedback register.
        let has_feedback = ins.dst.len() == 2;
        let (feedback, resource) = if has_feedback {
            (Some(&ins.dst[0]), &ins.dst[1])
        } else {
            (None, &ins.dst[0])
        };
        let addr = &ins.src[0];

        let ctype = match ins.op {
            Opcode::AtomicIMax
            | Opcode::AtomicIMin
            | Opcode::ImmAtomicIMax
            | Opcode::ImmAtomicIMin => ScalarType::Sint32,
            _ => ScalarType::Uint32,
        };
        let type_id = self.get_scalar_type_id(ctype);

        let (pointer, scope, semantics) = self.atomic_pointer(resource, addr, ctype)?;
        let scope_id = self.module.const_u32(scope as u32);
        let semantics_id = self.module.const_u32(semantics.bits());

        let load_scalar = |compiler: &mut Self, reg: &Register| -> Result<Word, TranslateError> {
            let value = compiler.emit_register_load(reg, WriteMask::X)?;
            Ok(compiler.emit_register_bitcast(value, ctype).id)
        };

        let result = match ins.op {
            Opcode::AtomicIAdd | Opcode::ImmAtomicIAdd => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_iadd(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::AtomicAnd | Opcode::ImmAtomicAnd => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_and(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::AtomicOr | Opcode::ImmAtomicOr => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_or(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::AtomicXor | Opcode::ImmAtomicXor => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_xor(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::AtomicIMax | Opcode::ImmAtomicIMax => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_smax(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::AtomicIMin | Opcode::ImmAtomicIMin => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_smin(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::AtomicUMax | Opcode::ImmAtomicUMax => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_umax(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::AtomicUMin | Opcode::ImmAtomicUMin => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_umin(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::ImmAtomicExch => {
                let value = load_scalar(self, &ins.src[1])?;
                self.module
                    .op_atomic_exchange(type_id, pointer, scope_id, semantics_id, value)
            }
            Opcode::AtomicCmpStore | Opcode::ImmAtomicCmpExch => {
                let comparator = load_scalar(self, &ins.src[1])?;
                let value = load_scalar(self, &ins.src[2])?;
                self.module.op_atomic_compare_exchange(
                    type_id,
                    pointer,
                    scope_id,
                    semantics_id,
                    semantics_id,
                    value,
                    comparator,
                )
            }
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };

        if let Some(feedback) = feedback {
            if feedback.kind != OperandType::Null {
                let value = RegisterValue {
                    vtype: scalar(ctype),
                    id: result,
                };
                self.emit_register_store(feedback, value)?;
            }
        }
        Ok(())
    }

    /// Builds the pointer an atomic operates on, along with its memory
    /// scope and semantics.
    fn atomic_pointer(
        &mut self,
        resource: &Register,
        addr: &Register,
        ctype: ScalarType,
    ) -> Result<(Word, spirv::Scope, spirv::MemorySemantics), TranslateError> {
        // Typed UAVs go through an image texel pointer.
        if resource.kind == OperandType::UnorderedAccessView {
            let index = resource.index[0].offset as usize;
            if let Some(slot) = self.uavs.get(index).copied().filter(|s| s.var_id != 0) {
                if let ResourceKind::StorageImage(info) = slot.kind {
                    let coord = self.emit_uav_coordinate(addr, info.dim)?;
                    let type_id = self.get_scalar_type_id(ctype);
                    let ptr_type = self
                        .module
                        .def_pointer_type(type_id, spirv::StorageClass::Image);
                    let sample = self.module.const_u32(0);
                    let pointer = self
                        .module
                        .op_image_texel_pointer(ptr_type, slot.var_id, coord, sample);
                    return Ok((
                        pointer,
                        spirv::Scope::Device,
                        spirv::MemorySemantics::IMAGE_MEMORY,
                    ));
                }
            }
        }

        let access = self.buffer_access(resource)?;
        let word_index = if access.stride == 4 {
            // Raw storage addresses in bytes.
            self.raw_base_index(addr)?
        } else {
            // Structured storage: structure index in .x, byte offset in .y.
            let index = self.emit_register_load(addr, WriteMask::X)?;
            let offset = self.emit_register_load(addr, WriteMask::Y)?;
            self.structured_base_index(index, offset, access.stride)
        };
        let pointer = self.buffer_word_ptr(&access, word_index);

        let (scope, semantics) = if access.storage_class == spirv::StorageClass::Workgroup {
            (
                spirv::Scope::Workgroup,
                spirv::MemorySemantics::WORKGROUP_MEMORY,
            )
        } else {
            (spirv::Scope::Device, spirv::MemorySemantics::UNIFORM_MEMORY)
        };
        Ok((pointer, scope, semantics))
    }

    // --- Buffer queries ---------------------------------------------------

    pub(crate) fn emit_buffer_query(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let resource = &ins.src[0];
        let index = resource.index[0].offset as usize;

        let slot = match resource.kind {
            OperandType::Resource => self.textures.get(index).copied(),
            OperandType::UnorderedAccessView => self.uavs.get(index).copied(),
            _ => None,
        }
        .filter(|slot| slot.var_id != 0)
        .ok_or_else(|| TranslateError::InvalidOperandIndex {
            context: "bufinfo on an undeclared resource".to_owned(),
        })?;

        let u32_type = self.module.def_int_type(32, 0);
        let id = match slot.kind {
            ResourceKind::RawBuffer => {
                // Raw buffers report their size in bytes.
                let words = self.module.op_array_length(u32_type, slot.var_id, 0);
                let four = self.module.const_u32(4);
                self.module.op_imul(u32_type, words, four)
            }
            ResourceKind::StructuredBuffer { stride } => {
                let words = self.module.op_array_length(u32_type, slot.var_id, 0);
                let four = self.module.const_u32(4);
                let bytes = self.module.op_imul(u32_type, words, four);
                let stride_id = self.module.const_u32(stride);
                self.module.op_udiv(u32_type, bytes, stride_id)
            }
            ResourceKind::SampledImage(info) | ResourceKind::StorageImage(info)
                if info.dim == ResourceDim::Buffer =>
            {
                self.module
                    .enable_capability(spirv::Capability::ImageQuery);
                let image_value = self.module.op_load(info.image_type_id, slot.var_id);
                self.module.op_image_query_size(u32_type, image_value)
            }
            _ => {
                return Err(TranslateError::InvalidOperand {
                    context: "bufinfo on a non-buffer resource".to_owned(),
                })
            }
        };

        let value = RegisterValue {
            vtype: scalar(ScalarType::Uint32),
            id,
        };
        self.emit_register_store(&ins.dst[0], value)
    }
}

/// Number of coordinate components an image access needs (including the
/// array layer).
pub(crate) fn image_coordinate_components(dim: ResourceDim) -> u32 {
    match dim {
        ResourceDim::Buffer | ResourceDim::Texture1D => 1,
        ResourceDim::Texture1DArr
        | ResourceDim::Texture2D
        | ResourceDim::Texture2DMs => 2,
        ResourceDim::Texture2DArr
        | ResourceDim::Texture2DMsArr
        | ResourceDim::Texture3D
        | ResourceDim::TextureCube => 3,
        ResourceDim::TextureCubeArr => 4,
        // Raw/structured shapes never reach image coordinate handling.
        _ => 4,
    }
}
