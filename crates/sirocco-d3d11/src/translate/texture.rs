//! Texture sampling, fetch, gather and query lowering.

use sirocco_spirv::{ImageOperands, Word};

use crate::sm4::decode::{Instruction, Register, SampleControls};
use crate::sm4::opcode::{Opcode, OperandType, ResinfoType, ResourceDim, ScalarType};
use crate::sm4::WriteMask;

use super::memory::image_coordinate_components;
use super::{scalar, Compiler, ImageInfo, RegisterValue, ResourceKind, TranslateError, VectorType};

/// Coordinate components excluding the array layer; the dimensionality of
/// texel offsets and gradients.
fn image_offset_components(dim: ResourceDim) -> u32 {
    match dim {
        ResourceDim::Texture1D | ResourceDim::Texture1DArr => 1,
        ResourceDim::Texture2D
        | ResourceDim::Texture2DArr
        | ResourceDim::Texture2DMs
        | ResourceDim::Texture2DMsArr => 2,
        ResourceDim::Texture3D => 3,
        ResourceDim::TextureCube | ResourceDim::TextureCubeArr => 3,
        _ => 0,
    }
}

impl Compiler<'_> {
    fn sampled_texture(&mut self, reg: &Register) -> Result<(Word, ImageInfo), TranslateError> {
        let index = reg.index[0].offset as usize;
        let slot = self
            .textures
            .get(index)
            .copied()
            .filter(|slot| slot.var_id != 0)
            .ok_or_else(|| TranslateError::InvalidOperandIndex {
                context: format!("t{index} used without matching declaration"),
            })?;
        match slot.kind {
            ResourceKind::SampledImage(info) => Ok((slot.var_id, info)),
            _ => Err(TranslateError::InvalidOperand {
                context: format!("t{index} is not a sampled texture"),
            }),
        }
    }

    fn sampler(&mut self, reg: &Register) -> Result<super::SamplerSlot, TranslateError> {
        let index = reg.index[0].offset as usize;
        self.samplers
            .get(index)
            .copied()
            .filter(|slot| slot.var_id != 0)
            .ok_or_else(|| TranslateError::InvalidOperandIndex {
                context: format!("s{index} used without matching declaration"),
            })
    }

    /// Loads the texture and sampler and combines them into a sampled
    /// image value.
    fn emit_sampled_image(
        &mut self,
        texture_var: Word,
        info: &ImageInfo,
        sampler: super::SamplerSlot,
    ) -> Word {
        let image_value = self.module.op_load(info.image_type_id, texture_var);
        let sampler_value = self.module.op_load(sampler.type_id, sampler.var_id);
        let sampled_image_type = self.module.def_sampled_image_type(info.image_type_id);
        self.module
            .op_sampled_image(sampled_image_type, image_value, sampler_value)
    }

    /// Loads a floating-point texture coordinate with exactly the
    /// component count the image dimension requires.
    fn emit_coordinate(
        &mut self,
        reg: &Register,
        dim: ResourceDim,
    ) -> Result<RegisterValue, TranslateError> {
        let ccount = image_coordinate_components(dim);
        self.emit_register_load(reg, WriteMask::first_n(ccount))
    }

    /// Immediate texel offset from the instruction's sample controls, or
    /// `None` when all offsets are zero or the dimension takes no offset.
    fn emit_const_offset(
        &mut self,
        controls: &SampleControls,
        dim: ResourceDim,
    ) -> Option<Word> {
        let ccount = match dim {
            // Cube sampling takes no offsets.
            ResourceDim::TextureCube | ResourceDim::TextureCubeArr => return None,
            other => image_offset_components(other),
        };
        if ccount == 0 || controls.is_zero() {
            return None;
        }

        let values = [controls.u, controls.v, controls.w];
        let mut parts = [0u32; 3];
        for i in 0..ccount as usize {
            parts[i] = self.module.const_i32(values[i]);
        }
        Some(if ccount == 1 {
            parts[0]
        } else {
            let i32_type = self.module.def_int_type(32, 1);
            let vec_type = self.module.def_vector_type(i32_type, ccount);
            self.module
                .const_composite(vec_type, &parts[..ccount as usize])
        })
    }

    /// Applies the resource swizzle and destination mask to a four
    /// component texture result, bit-casts to the destination type, and
    /// stores.
    fn store_texture_result(
        &mut self,
        ins: &Instruction,
        result: RegisterValue,
        resource_reg: &Register,
    ) -> Result<(), TranslateError> {
        let value = self.emit_register_swizzle(result, resource_reg.swizzle, ins.dst[0].mask);
        let value = self.emit_register_bitcast(value, ins.dst[0].data_type);
        self.emit_register_store(&ins.dst[0], value)
    }

    // --- sample family ----------------------------------------------------

    pub(crate) fn emit_sample(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        // Operands: dst, coordinates, texture, sampler, then the
        // variant-specific extra (dref / lod / bias / gradients).
        let texture_reg = &ins.src[1];
        let sampler_reg = &ins.src[2];
        let (texture_var, info) = self.sampled_texture(texture_reg)?;
        let sampler = self.sampler(sampler_reg)?;

        let coord = self.emit_coordinate(&ins.src[0], info.dim)?;
        let sampled_image = self.emit_sampled_image(texture_var, &info, sampler);

        let mut operands = ImageOperands::default();
        if let Some(offset) = self.emit_const_offset(&ins.sample_controls, info.dim) {
            operands.flags |= spirv::ImageOperands::CONST_OFFSET;
            operands.const_offset = offset;
        }

        let result_vtype = VectorType {
            ctype: info.sampled_type,
            ccount: 4,
        };
        let result_type = self.get_vector_type_id(result_vtype);

        let is_dref = matches!(ins.op, Opcode::SampleC | Opcode::SampleClz);
        let id = match ins.op {
            Opcode::Sample => self.module.op_image_sample_implicit_lod(
                result_type,
                sampled_image,
                coord.id,
                &operands,
            ),
            Opcode::SampleB => {
                let bias = self.emit_register_load(&ins.src[3], WriteMask::X)?;
                operands.flags |= spirv::ImageOperands::BIAS;
                operands.lod_bias = bias.id;
                self.module.op_image_sample_implicit_lod(
                    result_type,
                    sampled_image,
                    coord.id,
                    &operands,
                )
            }
            Opcode::SampleL => {
                let lod = self.emit_register_load(&ins.src[3], WriteMask::X)?;
                operands.flags |= spirv::ImageOperands::LOD;
                operands.lod = lod.id;
                self.module.op_image_sample_explicit_lod(
                    result_type,
                    sampled_image,
                    coord.id,
                    &operands,
                )
            }
            Opcode::SampleD => {
                let grad_mask = WriteMask::first_n(image_offset_components(info.dim).max(1));
                let ddx = self.emit_register_load(&ins.src[3], grad_mask)?;
                let ddy = self.emit_register_load(&ins.src[4], grad_mask)?;
                operands.flags |= spirv::ImageOperands::GRAD;
                operands.grad_x = ddx.id;
                operands.grad_y = ddy.id;
                self.module.op_image_sample_explicit_lod(
                    result_type,
                    sampled_image,
                    coord.id,
                    &operands,
                )
            }
            Opcode::SampleC => {
                let reference = self.emit_register_load(&ins.src[3], WriteMask::X)?;
                let f32_type = self.module.def_float_type(32);
                self.module.op_image_sample_dref_implicit_lod(
                    f32_type,
                    sampled_image,
                    coord.id,
                    reference.id,
                    &operands,
                )
            }
            Opcode::SampleClz => {
                let reference = self.emit_register_load(&ins.src[3], WriteMask::X)?;
                let f32_type = self.module.def_float_type(32);
                operands.flags |= spirv::ImageOperands::LOD;
                operands.lod = self.module.const_f32(0.0);
                self.module.op_image_sample_dref_explicit_lod(
                    f32_type,
                    sampled_image,
                    coord.id,
                    reference.id,
                    &operands,
                )
            }
            other => return Err(TranslateError::UnsupportedOpcode { op: other }),
        };

        if is_dref {
            // Depth comparisons produce a scalar; the store splats it into
            // the masked lanes.
            let value = RegisterValue {
                vtype: scalar(ScalarType::Float32),
                id,
            };
            let value = self.emit_register_bitcast(value, ins.dst[0].data_type);
            self.emit_register_store(&ins.dst[0], value)
        } else {
            self.store_texture_result(
                ins,
                RegisterValue {
                    vtype: result_vtype,
                    id,
                },
                texture_reg,
            )
        }
    }

    // --- ld / ld_ms -------------------------------------------------------

    pub(crate) fn emit_texture_fetch(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let texture_reg = &ins.src[1];
        let (texture_var, info) = self.sampled_texture(texture_reg)?;

        let ccount = image_coordinate_components(info.dim);
        let coord = self.emit_register_load(&ins.src[0], WriteMask::first_n(ccount))?;

        let mut operands = ImageOperands::default();
        if let Some(offset) = self.emit_const_offset(&ins.sample_controls, info.dim) {
            operands.flags |= spirv::ImageOperands::OFFSET;
            operands.offset = offset;
            self.module
                .enable_capability(spirv::Capability::ImageGatherExtended);
        }

        match info.dim {
            ResourceDim::Buffer => {}
            ResourceDim::Texture2DMs | ResourceDim::Texture2DMsArr => {
                // Sample index is a separate operand on ld_ms.
                if ins.op != Opcode::LdMs {
                    return Err(TranslateError::InvalidOperand {
                        context: "ld on a multisampled texture (expected ld_ms)".to_owned(),
                    });
                }
                let sample = self.emit_register_load(&ins.src[2], WriteMask::X)?;
                operands.flags |= spirv::ImageOperands::SAMPLE;
                operands.sample = sample.id;
            }
            _ => {
                // The mip level rides in the address register's w
                // component.
                let lod = self.emit_register_load(&ins.src[0], WriteMask::W)?;
                operands.flags |= spirv::ImageOperands::LOD;
                operands.lod = lod.id;
            }
        }

        let result_vtype = VectorType {
            ctype: info.sampled_type,
            ccount: 4,
        };
        let result_type = self.get_vector_type_id(result_vtype);
        let image_value = self.module.op_load(info.image_type_id, texture_var);
        let id = self
            .module
            .op_image_fetch(result_type, image_value, coord.id, &operands);

        self.store_texture_result(
            ins,
            RegisterValue {
                vtype: result_vtype,
                id,
            },
            texture_reg,
        )
    }

    // --- gather4 family ---------------------------------------------------

    pub(crate) fn emit_texture_gather(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        // The programmable-offset variants shift the operand layout by one.
        let has_po = matches!(ins.op, Opcode::Gather4Po | Opcode::Gather4PoC);
        let is_dref = matches!(ins.op, Opcode::Gather4C | Opcode::Gather4PoC);

        let coord_reg = &ins.src[0];
        let offset_reg = has_po.then(|| &ins.src[1]);
        let base = if has_po { 2 } else { 1 };
        let texture_reg = &ins.src[base];
        let sampler_reg = &ins.src[base + 1];
        let dref_reg = is_dref.then(|| &ins.src[base + 2]);

        let (texture_var, info) = self.sampled_texture(texture_reg)?;
        let sampler = self.sampler(sampler_reg)?;

        let coord = self.emit_coordinate(coord_reg, info.dim)?;
        let sampled_image = self.emit_sampled_image(texture_var, &info, sampler);

        let mut operands = ImageOperands::default();
        if let Some(offset_reg) = offset_reg {
            let ccount = image_offset_components(info.dim).max(1);
            let offset = self.emit_register_load(offset_reg, WriteMask::first_n(ccount))?;
            operands.flags |= spirv::ImageOperands::OFFSET;
            operands.offset = offset.id;
            self.module
                .enable_capability(spirv::Capability::ImageGatherExtended);
        } else if let Some(offset) = self.emit_const_offset(&ins.sample_controls, info.dim) {
            operands.flags |= spirv::ImageOperands::CONST_OFFSET;
            operands.const_offset = offset;
        }

        let result_vtype = VectorType {
            ctype: info.sampled_type,
            ccount: 4,
        };
        let result_type = self.get_vector_type_id(result_vtype);

        let id = if let Some(dref_reg) = dref_reg {
            let reference = self.emit_register_load(dref_reg, WriteMask::X)?;
            self.module.op_image_dref_gather(
                result_type,
                sampled_image,
                coord.id,
                reference.id,
                &operands,
            )
        } else {
            // The gathered component comes from the sampler operand's
            // swizzle.
            let component = self.module.const_u32(sampler_reg.swizzle.get(0));
            self.module
                .op_image_gather(result_type, sampled_image, coord.id, component, &operands)
        };

        self.store_texture_result(
            ins,
            RegisterValue {
                vtype: result_vtype,
                id,
            },
            texture_reg,
        )
    }

    // --- resinfo ----------------------------------------------------------

    pub(crate) fn emit_texture_query(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let texture_reg = &ins.src[1];
        let (texture_var, info) = self.sampled_texture(texture_reg)?;
        self.module.enable_capability(spirv::Capability::ImageQuery);

        let u32_type = self.module.def_int_type(32, 0);
        let image_value = self.module.op_load(info.image_type_id, texture_var);

        // Number of size components the query returns (width, height or
        // layers, depth or layers).
        let (size_ccount, has_lod) = match info.dim {
            ResourceDim::Texture1D => (1, true),
            ResourceDim::Texture1DArr | ResourceDim::Texture2D => (2, true),
            ResourceDim::Texture2DMs => (2, false),
            ResourceDim::Texture2DArr | ResourceDim::Texture3D => (3, true),
            ResourceDim::Texture2DMsArr => (3, false),
            ResourceDim::TextureCube => (2, true),
            ResourceDim::TextureCubeArr => (3, true),
            other => {
                return Err(TranslateError::InvalidOperand {
                    context: format!("resinfo on resource dimension {other:?}"),
                })
            }
        };
        let size_type = if size_ccount > 1 {
            self.module.def_vector_type(u32_type, size_ccount)
        } else {
            u32_type
        };

        let size_id = if has_lod {
            let lod = self.emit_register_load(&ins.src[0], WriteMask::X)?;
            let lod = self.emit_register_bitcast(lod, ScalarType::Sint32);
            self.module
                .op_image_query_size_lod(size_type, image_value, lod.id)
        } else {
            self.module.op_image_query_size(size_type, image_value)
        };

        let mip_count = if has_lod {
            self.module.op_image_query_levels(u32_type, image_value)
        } else {
            self.module.const_u32(1)
        };

        // Assemble (sizes..., 0-padding, mip count) as a uint4.
        let zero = self.module.const_u32(0);
        let mut parts = [zero; 4];
        for i in 0..size_ccount {
            parts[i as usize] = if size_ccount == 1 {
                size_id
            } else {
                self.module
                    .op_composite_extract(u32_type, size_id, &[i])
            };
        }
        parts[3] = mip_count;

        let uint4 = VectorType {
            ctype: ScalarType::Uint32,
            ccount: 4,
        };
        let uint4_type = self.get_vector_type_id(uint4);
        let raw = self.module.op_composite_construct(uint4_type, &parts);

        let result = match ins.controls.resinfo_type() {
            ResinfoType::Uint => RegisterValue {
                vtype: uint4,
                id: raw,
            },
            ResinfoType::Float | ResinfoType::RcpFloat => {
                let float4 = VectorType {
                    ctype: ScalarType::Float32,
                    ccount: 4,
                };
                let float4_type = self.get_vector_type_id(float4);
                let mut id = self.module.op_convert_u_to_f(float4_type, raw);
                if ins.controls.resinfo_type() == ResinfoType::RcpFloat {
                    // Reciprocal applies to the size components only; the
                    // mip count lane is restored afterwards.
                    let one = self.build_const_replicant(ScalarType::Float32, 4, 1f32.to_bits());
                    let rcp = self.module.op_fdiv(float4_type, one.id, id);
                    let f32_type = self.module.def_float_type(32);
                    let mips = self.module.op_composite_extract(f32_type, id, &[3]);
                    id = self.module.op_composite_insert(float4_type, mips, rcp, &[3]);
                }
                RegisterValue { vtype: float4, id }
            }
        };

        self.store_texture_result(ins, result, texture_reg)
    }

    // --- lod --------------------------------------------------------------

    pub(crate) fn emit_texture_query_lod(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let texture_reg = &ins.src[1];
        let sampler_reg = &ins.src[2];
        let (texture_var, info) = self.sampled_texture(texture_reg)?;
        let sampler = self.sampler(sampler_reg)?;
        self.module.enable_capability(spirv::Capability::ImageQuery);

        // The implicit-lod query only uses the unlayered coordinate part.
        let ccount = image_offset_components(info.dim).max(1);
        let coord = self.emit_register_load(&ins.src[0], WriteMask::first_n(ccount))?;
        let sampled_image = self.emit_sampled_image(texture_var, &info, sampler);

        let f32_type = self.module.def_float_type(32);
        let vec2_type = self.module.def_vector_type(f32_type, 2);
        let lods = self
            .module
            .op_image_query_lod(vec2_type, sampled_image, coord.id);

        // dst.x = clamped lod, dst.y = unclamped lod, zw = 0.
        let zero = self.module.const_f32(0.0);
        let clamped = self.module.op_composite_extract(f32_type, lods, &[0]);
        let unclamped = self.module.op_composite_extract(f32_type, lods, &[1]);
        let float4 = VectorType {
            ctype: ScalarType::Float32,
            ccount: 4,
        };
        let float4_type = self.get_vector_type_id(float4);
        let id = self
            .module
            .op_composite_construct(float4_type, &[clamped, unclamped, zero, zero]);

        self.store_texture_result(ins, RegisterValue { vtype: float4, id }, texture_reg)
    }

    // --- sampleinfo -------------------------------------------------------

    pub(crate) fn emit_texture_query_ms(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let texture_reg = &ins.src[0];
        let (texture_var, info) = self.sampled_texture(texture_reg)?;
        self.module.enable_capability(spirv::Capability::ImageQuery);

        let u32_type = self.module.def_int_type(32, 0);
        let image_value = self.module.op_load(info.image_type_id, texture_var);
        let samples = self.module.op_image_query_samples(u32_type, image_value);

        let value = if ins.controls.returns_uint() {
            RegisterValue {
                vtype: scalar(ScalarType::Uint32),
                id: samples,
            }
        } else {
            let f32_type = self.module.def_float_type(32);
            RegisterValue {
                vtype: scalar(ScalarType::Float32),
                id: self.module.op_convert_u_to_f(f32_type, samples),
            }
        };
        let value = self.emit_register_bitcast(value, ins.dst[0].data_type);
        self.emit_register_store(&ins.dst[0], value)
    }

    // --- samplepos --------------------------------------------------------

    /// Standard sample positions for 1/2/4/8/16-sample patterns, packed
    /// into one array. The block for sample count `n` starts at `n - 1`.
    const SAMPLE_POSITIONS: [(f32, f32); 31] = [
        (0.0 / 16.0, 0.0 / 16.0),
        // 2x
        (4.0 / 16.0, 4.0 / 16.0),
        (-4.0 / 16.0, -4.0 / 16.0),
        // 4x
        (-2.0 / 16.0, -6.0 / 16.0),
        (6.0 / 16.0, -2.0 / 16.0),
        (-6.0 / 16.0, 2.0 / 16.0),
        (2.0 / 16.0, 6.0 / 16.0),
        // 8x
        (1.0 / 16.0, -3.0 / 16.0),
        (-1.0 / 16.0, 3.0 / 16.0),
        (5.0 / 16.0, 1.0 / 16.0),
        (-3.0 / 16.0, -5.0 / 16.0),
        (-5.0 / 16.0, 5.0 / 16.0),
        (-7.0 / 16.0, -1.0 / 16.0),
        (3.0 / 16.0, 7.0 / 16.0),
        (7.0 / 16.0, -7.0 / 16.0),
        // 16x
        (1.0 / 16.0, 1.0 / 16.0),
        (-1.0 / 16.0, -3.0 / 16.0),
        (-3.0 / 16.0, 2.0 / 16.0),
        (4.0 / 16.0, -1.0 / 16.0),
        (-5.0 / 16.0, -2.0 / 16.0),
        (2.0 / 16.0, 5.0 / 16.0),
        (5.0 / 16.0, 3.0 / 16.0),
        (3.0 / 16.0, -5.0 / 16.0),
        (-2.0 / 16.0, 6.0 / 16.0),
        (0.0 / 16.0, -7.0 / 16.0),
        (-4.0 / 16.0, -6.0 / 16.0),
        (-6.0 / 16.0, 4.0 / 16.0),
        (-8.0 / 16.0, 0.0 / 16.0),
        (7.0 / 16.0, -4.0 / 16.0),
        (6.0 / 16.0, 7.0 / 16.0),
        (-7.0 / 16.0, -8.0 / 16.0),
    ];

    pub(crate) fn emit_texture_query_ms_pos(
        &mut self,
        ins: &Instruction,
    ) -> Result<(), TranslateError> {
        let texture_reg = &ins.src[0];
        if texture_reg.kind != OperandType::Resource {
            return Err(TranslateError::Unsupported {
                context: "samplepos on the rasterizer".to_owned(),
            });
        }
        let (texture_var, info) = self.sampled_texture(texture_reg)?;
        self.module.enable_capability(spirv::Capability::ImageQuery);

        // Build the constant position table.
        let f32_type = self.module.def_float_type(32);
        let vec2_type = self.module.def_vector_type(f32_type, 2);
        let mut elements = Vec::with_capacity(Self::SAMPLE_POSITIONS.len());
        for (x, y) in Self::SAMPLE_POSITIONS {
            let x = self.module.const_f32(x);
            let y = self.module.const_f32(y);
            elements.push(self.module.const_composite(vec2_type, &[x, y]));
        }
        let len = self.module.const_u32(elements.len() as u32);
        let array_type = self.module.def_array_type(vec2_type, len);
        let init = self.module.const_composite(array_type, &elements);
        let ptr_type = self
            .module
            .def_pointer_type(array_type, spirv::StorageClass::Private);
        let table = self
            .module
            .new_var_init(ptr_type, spirv::StorageClass::Private, init);

        // index = (count - 1) + min(sample, count - 1); out-of-range sample
        // indices clamp to the last slot of the block.
        let u32_type = self.module.def_int_type(32, 0);
        let image_value = self.module.op_load(info.image_type_id, texture_var);
        let count = self.module.op_image_query_samples(u32_type, image_value);
        let one = self.module.const_u32(1);
        let base = self.module.op_isub(u32_type, count, one);
        let sample = self.emit_register_load(&ins.src[1], WriteMask::X)?;
        let sample = self.emit_register_bitcast(sample, ScalarType::Uint32);
        let clamped = self.module.op_umin(u32_type, sample.id, base);
        let index = self.module.op_iadd(u32_type, base, clamped);

        let vec2_ptr_type = self
            .module
            .def_pointer_type(vec2_type, spirv::StorageClass::Private);
        let element_ptr = self.module.op_access_chain(vec2_ptr_type, table, &[index]);
        let position = self.module.op_load(vec2_type, element_ptr);

        let x = self.module.op_composite_extract(f32_type, position, &[0]);
        let y = self.module.op_composite_extract(f32_type, position, &[1]);
        let zero = self.module.const_f32(0.0);
        let float4 = VectorType {
            ctype: ScalarType::Float32,
            ccount: 4,
        };
        let float4_type = self.get_vector_type_id(float4);
        let id = self
            .module
            .op_composite_construct(float4_type, &[x, y, zero, zero]);

        self.store_texture_result(ins, RegisterValue { vtype: float4, id }, texture_reg)
    }
}
