//! Declaration handlers: interface registers, resources, thread groups and
//! the various per-stage execution-mode declarations.

use num_traits::FromPrimitive;
use sirocco_dxbc::sm4::ShaderStage;
use sirocco_spirv::Word;

use crate::sm4::decode::Instruction;
use crate::sm4::opcode::{
    CustomDataClass, GlobalFlags, InterpolationMode, Opcode, OperandType, Primitive,
    PrimitiveTopology, ResourceDim, ResourceReturnType, ScalarType, SystemValue, TessDomain,
    TessOutputPrimitive, TessPartitioning,
};
use crate::sm4::WriteMask;

use super::{
    scalar_from_component_type, vec4_f32, BindingClass, BindingKind, Compiler, ConstantBufferSlot,
    ImageInfo, IndexableTemp, InterfaceVar, RegisterInfo, ResourceKind, ResourceVar, SamplerSlot,
    SvMapping, TgsmSlot, TranslateError, VectorType, MAX_INTERFACE_REGS,
};

impl Compiler<'_> {
    pub(crate) fn emit_dcl(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        match ins.op {
            Opcode::DclGlobalFlags => self.emit_dcl_global_flags(ins),
            Opcode::DclTemps => self.emit_dcl_temps(ins),
            Opcode::DclIndexableTemp => self.emit_dcl_indexable_temp(ins),
            Opcode::DclInput
            | Opcode::DclInputSgv
            | Opcode::DclInputSiv
            | Opcode::DclInputPs
            | Opcode::DclInputPsSgv
            | Opcode::DclInputPsSiv
            | Opcode::DclOutput
            | Opcode::DclOutputSgv
            | Opcode::DclOutputSiv => self.emit_dcl_interface_reg(ins),
            Opcode::DclConstantBuffer => self.emit_dcl_constant_buffer(ins),
            Opcode::DclSampler => self.emit_dcl_sampler(ins),
            Opcode::DclResource => self.emit_dcl_resource(ins),
            Opcode::DclResourceRaw => self.emit_dcl_buffer_resource(ins, None, false),
            Opcode::DclResourceStructured => {
                self.emit_dcl_buffer_resource(ins, Some(ins.imm[0]), false)
            }
            Opcode::DclUavTyped => self.emit_dcl_uav_typed(ins),
            Opcode::DclUavRaw => self.emit_dcl_buffer_resource(ins, None, true),
            Opcode::DclUavStructured => self.emit_dcl_buffer_resource(ins, Some(ins.imm[0]), true),
            Opcode::DclThreadGroupSharedMemoryRaw => self.emit_dcl_tgsm(ins, 4, ins.imm[0] / 4),
            Opcode::DclThreadGroupSharedMemoryStructured => {
                self.emit_dcl_tgsm(ins, ins.imm[0], ins.imm[0] / 4 * ins.imm[1])
            }
            Opcode::DclThreadGroup => {
                self.module
                    .set_local_size(self.entry_point_id, ins.imm[0], ins.imm[1], ins.imm[2]);
                Ok(())
            }
            Opcode::DclGsInputPrimitive => self.emit_dcl_gs_input_primitive(ins),
            Opcode::DclGsOutputPrimitiveTopology => self.emit_dcl_gs_output_topology(ins),
            Opcode::DclMaxOutputVertexCount => {
                self.module
                    .set_output_vertices(self.entry_point_id, ins.imm[0]);
                Ok(())
            }
            Opcode::DclGsInstanceCount => {
                self.module.set_invocations(self.entry_point_id, ins.imm[0]);
                Ok(())
            }
            Opcode::DclTessDomain => self.emit_dcl_tess_domain(ins),
            Opcode::DclTessPartitioning => self.emit_dcl_tess_partitioning(ins),
            Opcode::DclTessOutputPrimitive => self.emit_dcl_tess_output_primitive(ins),
            Opcode::DclInputControlPointCount => Ok(()),
            Opcode::DclOutputControlPointCount => {
                if self.stage == ShaderStage::Hull {
                    self.module.set_output_vertices(
                        self.entry_point_id,
                        ins.controls.control_point_count(),
                    );
                }
                Ok(())
            }
            Opcode::DclStream => {
                let index = ins.dst[0].index[0].offset;
                if index != 0 {
                    return Err(TranslateError::Unsupported {
                        context: format!("geometry stream m{index} (only stream 0 is supported)"),
                    });
                }
                Ok(())
            }
            // Range hints and tess factor bounds carry no semantics here.
            Opcode::DclIndexRange | Opcode::DclHsMaxTessFactor => Ok(()),
            other => Err(TranslateError::UnsupportedOpcode { op: other }),
        }
    }

    fn emit_dcl_global_flags(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let flags = ins.controls.global_flags();
        if flags.contains(GlobalFlags::DOUBLE_PRECISION) {
            self.module.enable_capability(spirv::Capability::Float64);
        }
        if flags.contains(GlobalFlags::EARLY_FRAGMENT_TESTS) && self.stage == ShaderStage::Pixel {
            self.module.set_execution_mode(
                self.entry_point_id,
                spirv::ExecutionMode::EarlyFragmentTests,
                &[],
            );
        }
        Ok(())
    }

    fn emit_dcl_temps(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let new_count = ins.imm[0] as usize;
        let old_count = self.r_regs.len();
        if new_count <= old_count {
            return Ok(());
        }
        self.r_regs.resize(new_count, 0);
        for i in old_count..new_count {
            let var_id = self.emit_new_variable(RegisterInfo {
                vtype: vec4_f32(),
                storage_class: spirv::StorageClass::Private,
            });
            self.module.set_debug_name(var_id, &format!("r{i}"));
            self.r_regs[i] = var_id;
        }
        Ok(())
    }

    fn emit_dcl_indexable_temp(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let index = ins.imm[0] as usize;
        let len = ins.imm[1];
        let component_count = ins.imm[2].clamp(1, 4);

        if index >= self.x_regs.len() {
            self.x_regs.resize(index + 1, IndexableTemp::default());
        }

        let element_type = self.get_vector_type_id(VectorType {
            ctype: ScalarType::Float32,
            ccount: component_count,
        });
        let len_id = self.module.const_u32(len);
        let array_type = self.module.def_array_type(element_type, len_id);
        let ptr_type = self
            .module
            .def_pointer_type(array_type, spirv::StorageClass::Private);
        let var_id = self.module.new_var(ptr_type, spirv::StorageClass::Private);
        self.module.set_debug_name(var_id, &format!("x{index}"));

        self.x_regs[index] = IndexableTemp {
            var_id,
            component_count,
            len,
        };
        Ok(())
    }

    fn emit_dcl_interface_reg(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let dst = &ins.dst[0];

        // Special operand kinds (oDepth, thread ids, coverage) have no
        // register index and declare no variable; their builtins are
        // created on first use.
        if !matches!(dst.kind, OperandType::Input | OperandType::Output) {
            return Ok(());
        }

        // Vertex/pixel interface registers are indexed directly; other
        // stages may declare fixed-size register arrays with the array
        // length in the leading index.
        let (array_len, reg_index) = match dst.index_dim {
            1 => (0, dst.index[0].offset as u32),
            2 => {
                let len = dst.index[0].offset as u32;
                if self.gs_vertex_count != 0 && len != self.gs_vertex_count {
                    tracing::warn!(
                        "arrayed input declares {len} vertices, input primitive has {}",
                        self.gs_vertex_count
                    );
                }
                (len, dst.index[1].offset as u32)
            }
            dim => {
                return Err(TranslateError::InvalidOperand {
                    context: format!("interface declaration with index dimension {dim}"),
                })
            }
        };
        if reg_index as usize >= MAX_INTERFACE_REGS {
            return Err(TranslateError::InvalidOperandIndex {
                context: format!("interface register {reg_index} out of range"),
            });
        }

        let sv = match ins.op {
            Opcode::DclInputSgv
            | Opcode::DclInputSiv
            | Opcode::DclInputPsSgv
            | Opcode::DclInputPsSiv
            | Opcode::DclOutputSgv
            | Opcode::DclOutputSiv => {
                SystemValue::from_u32(ins.imm[0]).unwrap_or(SystemValue::None)
            }
            _ => SystemValue::None,
        };

        let interpolation = match ins.op {
            Opcode::DclInputPs | Opcode::DclInputPsSgv | Opcode::DclInputPsSiv => {
                ins.controls.interpolation()
            }
            _ => InterpolationMode::Undefined,
        };

        match dst.kind {
            OperandType::Input => {
                self.emit_dcl_input(reg_index, array_len, dst.mask, sv, interpolation)
            }
            OperandType::Output => self.emit_dcl_output(reg_index, dst.mask, sv),
            _ => unreachable!(),
        }
    }

    fn emit_dcl_input(
        &mut self,
        reg_index: u32,
        array_len: u32,
        mask: WriteMask,
        sv: SystemValue,
        interpolation: InterpolationMode,
    ) -> Result<(), TranslateError> {
        let index = reg_index as usize;

        if self.v_regs[index].var_id == 0 {
            // System-value inputs in the vertex and pixel stages are fed
            // from builtins by the entry-point prologue, so they live in
            // private storage instead of an Input location.
            let use_private = sv != SystemValue::None
                && matches!(self.stage, ShaderStage::Vertex | ShaderStage::Pixel);

            let ctype = if self.stage == ShaderStage::Pixel && !use_private {
                self.isgn
                    .as_ref()
                    .and_then(|sig| sig.find_by_register(reg_index))
                    .map(|e| scalar_from_component_type(e.component_type))
                    .unwrap_or(ScalarType::Float32)
            } else {
                ScalarType::Float32
            };
            let vtype = VectorType { ctype, ccount: 4 };

            let storage_class = if use_private {
                spirv::StorageClass::Private
            } else {
                spirv::StorageClass::Input
            };

            let var_id = if array_len > 0 {
                let element_type = self.get_vector_type_id(vtype);
                let len_id = self.module.const_u32(array_len);
                let array_type = self.module.def_array_type(element_type, len_id);
                let ptr_type = self.module.def_pointer_type(array_type, storage_class);
                self.module.new_var(ptr_type, storage_class)
            } else {
                self.emit_new_variable(RegisterInfo {
                    vtype,
                    storage_class,
                })
            };

            if storage_class == spirv::StorageClass::Input {
                self.module.decorate_location(var_id, reg_index);
                self.interfaces.push(var_id);

                match interpolation {
                    InterpolationMode::Constant => {
                        self.module.decorate(var_id, spirv::Decoration::Flat);
                    }
                    InterpolationMode::LinearCentroid => {
                        self.module.decorate(var_id, spirv::Decoration::Centroid);
                    }
                    InterpolationMode::LinearNoPerspective => {
                        self.module
                            .decorate(var_id, spirv::Decoration::NoPerspective);
                    }
                    InterpolationMode::LinearNoPerspectiveCentroid => {
                        self.module
                            .decorate(var_id, spirv::Decoration::NoPerspective);
                        self.module.decorate(var_id, spirv::Decoration::Centroid);
                    }
                    InterpolationMode::LinearSample => {
                        self.module
                            .enable_capability(spirv::Capability::SampleRateShading);
                        self.module.decorate(var_id, spirv::Decoration::Sample);
                    }
                    InterpolationMode::LinearNoPerspectiveSample => {
                        self.module
                            .enable_capability(spirv::Capability::SampleRateShading);
                        self.module
                            .decorate(var_id, spirv::Decoration::NoPerspective);
                        self.module.decorate(var_id, spirv::Decoration::Sample);
                    }
                    _ => {}
                }
            }

            self.module.set_debug_name(var_id, &format!("v{reg_index}"));
            self.v_regs[index] = InterfaceVar {
                var_id,
                storage_class: Some(storage_class),
                array_len,
            };
        }

        if sv != SystemValue::None {
            self.v_mappings.push(SvMapping {
                reg: reg_index,
                mask,
                sv,
            });
        }
        Ok(())
    }

    fn emit_dcl_output(
        &mut self,
        reg_index: u32,
        mask: WriteMask,
        sv: SystemValue,
    ) -> Result<(), TranslateError> {
        let index = reg_index as usize;

        // Pixel shader outputs are normally pre-declared from the output
        // signature; everything else (and a signature-less pixel shader)
        // gets a plain float4 output here.
        if self.o_regs[index].var_id == 0 {
            let var_id = self.emit_new_variable(RegisterInfo {
                vtype: vec4_f32(),
                storage_class: spirv::StorageClass::Output,
            });
            self.module.decorate_location(var_id, reg_index);
            self.module.set_debug_name(var_id, &format!("o{reg_index}"));
            self.interfaces.push(var_id);
            self.o_regs[index] = InterfaceVar {
                var_id,
                storage_class: Some(spirv::StorageClass::Output),
                array_len: 0,
            };
            if self.stage == ShaderStage::Pixel {
                self.ps_o_types[index] = vec4_f32();
            }
        }

        if sv != SystemValue::None {
            self.o_mappings.push(SvMapping {
                reg: reg_index,
                mask,
                sv,
            });
        }
        Ok(())
    }

    fn emit_dcl_constant_buffer(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        // The operand carries two indices: the cb register and the vector
        // count.
        let dst = &ins.dst[0];
        if dst.index_dim != 2 {
            return Err(TranslateError::InvalidOperand {
                context: format!(
                    "dcl_constantbuffer with index dimension {}",
                    dst.index_dim
                ),
            });
        }
        let buffer = dst.index[0].offset as usize;
        let len = dst.index[1].offset as u32;
        if buffer >= self.constant_buffers.len() {
            return Err(TranslateError::InvalidOperandIndex {
                context: format!("cb{buffer} out of range"),
            });
        }

        // A fixed-size array of float4 with an explicit 16-byte stride,
        // wrapped in a block struct as SPIR-V requires for uniform data.
        let vec4_type = self.get_vector_type_id(vec4_f32());
        let len_id = self.module.const_u32(len);
        let array_type = self.module.def_array_type_unique(vec4_type, len_id);
        self.module.decorate_array_stride(array_type, 16);

        let struct_type = self.module.def_struct_type_unique(&[array_type]);
        self.module.member_decorate_offset(struct_type, 0, 0);
        self.module.decorate_block(struct_type);

        let ptr_type = self
            .module
            .def_pointer_type(struct_type, spirv::StorageClass::Uniform);
        let var_id = self.module.new_var(ptr_type, spirv::StorageClass::Uniform);
        self.module.set_debug_name(var_id, &format!("cb{buffer}"));

        self.constant_buffers[buffer] = ConstantBufferSlot { var_id, size: len };
        self.add_binding(
            var_id,
            BindingClass::ConstantBuffer,
            BindingKind::UniformBuffer,
            buffer as u32,
        );
        Ok(())
    }

    fn emit_dcl_sampler(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let index = ins.dst[0].index[0].offset as usize;
        if index >= self.samplers.len() {
            return Err(TranslateError::InvalidOperandIndex {
                context: format!("s{index} out of range"),
            });
        }

        let type_id = self.module.def_sampler_type();
        let ptr_type = self
            .module
            .def_pointer_type(type_id, spirv::StorageClass::UniformConstant);
        let var_id = self
            .module
            .new_var(ptr_type, spirv::StorageClass::UniformConstant);
        self.module.set_debug_name(var_id, &format!("s{index}"));

        self.samplers[index] = SamplerSlot { var_id, type_id };
        self.add_binding(
            var_id,
            BindingClass::ImageSampler,
            BindingKind::Sampler,
            index as u32,
        );
        Ok(())
    }

    fn emit_dcl_resource(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let index = ins.dst[0].index[0].offset as usize;
        if index >= self.textures.len() {
            return Err(TranslateError::InvalidOperandIndex {
                context: format!("t{index} out of range"),
            });
        }

        let dim = ins
            .controls
            .resource_dim()
            .filter(|dim| *dim != ResourceDim::Unknown)
            .ok_or(TranslateError::UnknownResourceDim {
                value: (ins.controls.0 >> 11) & 0x1f,
            })?;
        let sampled_type = self.resource_return_type(ins.imm[0])?;

        let sampled_type_id = self.get_scalar_type_id(sampled_type);
        let image_type_id = self.def_texture_image_type(sampled_type_id, dim, 1)?;

        let ptr_type = self
            .module
            .def_pointer_type(image_type_id, spirv::StorageClass::UniformConstant);
        let var_id = self
            .module
            .new_var(ptr_type, spirv::StorageClass::UniformConstant);
        self.module.set_debug_name(var_id, &format!("t{index}"));

        self.textures[index] = ResourceVar {
            var_id,
            kind: ResourceKind::SampledImage(ImageInfo {
                image_type_id,
                sampled_type,
                dim,
            }),
        };
        let kind = if dim == ResourceDim::Buffer {
            BindingKind::UniformTexelBuffer
        } else {
            BindingKind::SampledImage
        };
        self.add_binding(var_id, BindingClass::ShaderResource, kind, index as u32);
        Ok(())
    }

    fn emit_dcl_uav_typed(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let index = ins.dst[0].index[0].offset as usize;
        if index >= self.uavs.len() {
            return Err(TranslateError::InvalidOperandIndex {
                context: format!("u{index} out of range"),
            });
        }

        let dim = ins
            .controls
            .resource_dim()
            .filter(|dim| *dim != ResourceDim::Unknown)
            .ok_or(TranslateError::UnknownResourceDim {
                value: (ins.controls.0 >> 11) & 0x1f,
            })?;
        let sampled_type = self.resource_return_type(ins.imm[0])?;

        // Formatless access; read/write capabilities cover it.
        self.module
            .enable_capability(spirv::Capability::StorageImageReadWithoutFormat);
        self.module
            .enable_capability(spirv::Capability::StorageImageWriteWithoutFormat);

        let sampled_type_id = self.get_scalar_type_id(sampled_type);
        let image_type_id = self.def_texture_image_type(sampled_type_id, dim, 2)?;

        let ptr_type = self
            .module
            .def_pointer_type(image_type_id, spirv::StorageClass::UniformConstant);
        let var_id = self
            .module
            .new_var(ptr_type, spirv::StorageClass::UniformConstant);
        self.module.set_debug_name(var_id, &format!("u{index}"));

        self.uavs[index] = ResourceVar {
            var_id,
            kind: ResourceKind::StorageImage(ImageInfo {
                image_type_id,
                sampled_type,
                dim,
            }),
        };
        let kind = if dim == ResourceDim::Buffer {
            BindingKind::StorageTexelBuffer
        } else {
            BindingKind::StorageImage
        };
        self.add_binding(
            var_id,
            BindingClass::UnorderedAccessView,
            kind,
            index as u32,
        );
        Ok(())
    }

    /// Declares a raw or structured buffer resource (`t#` SRV or `u#` UAV)
    /// as a storage buffer holding a runtime array of words.
    fn emit_dcl_buffer_resource(
        &mut self,
        ins: &Instruction,
        structured_stride: Option<u32>,
        is_uav: bool,
    ) -> Result<(), TranslateError> {
        let index = ins.dst[0].index[0].offset as usize;
        let limit = if is_uav {
            self.uavs.len()
        } else {
            self.textures.len()
        };
        if index >= limit {
            return Err(TranslateError::InvalidOperandIndex {
                context: format!(
                    "{}{index} out of range",
                    if is_uav { 'u' } else { 't' }
                ),
            });
        }

        let u32_type = self.module.def_int_type(32, 0);
        let array_type = self.module.def_runtime_array_type_unique(u32_type);
        self.module.decorate_array_stride(array_type, 4);

        let struct_type = self.module.def_struct_type_unique(&[array_type]);
        self.module.member_decorate_offset(struct_type, 0, 0);
        self.module.decorate_buffer_block(struct_type);

        let ptr_type = self
            .module
            .def_pointer_type(struct_type, spirv::StorageClass::Uniform);
        let var_id = self.module.new_var(ptr_type, spirv::StorageClass::Uniform);
        let prefix = if is_uav { 'u' } else { 't' };
        self.module.set_debug_name(var_id, &format!("{prefix}{index}"));
        if !is_uav {
            self.module.decorate(var_id, spirv::Decoration::NonWritable);
        }

        let kind = match structured_stride {
            Some(stride) => ResourceKind::StructuredBuffer { stride },
            None => ResourceKind::RawBuffer,
        };
        let slot = ResourceVar { var_id, kind };
        let (class, registers) = if is_uav {
            self.uavs[index] = slot;
            (BindingClass::UnorderedAccessView, index as u32)
        } else {
            self.textures[index] = slot;
            (BindingClass::ShaderResource, index as u32)
        };
        self.add_binding(var_id, class, BindingKind::StorageBuffer, registers);
        Ok(())
    }

    /// Declares a thread-group shared memory register as a `Workgroup`
    /// array of `word_count` words.
    fn emit_dcl_tgsm(
        &mut self,
        ins: &Instruction,
        stride: u32,
        word_count: u32,
    ) -> Result<(), TranslateError> {
        let index = ins.dst[0].index[0].offset as usize;
        if index >= self.tgsm.len() {
            self.tgsm.resize(index + 1, None);
        }

        let u32_type = self.module.def_int_type(32, 0);
        let len_id = self.module.const_u32(word_count.max(1));
        let array_type = self.module.def_array_type(u32_type, len_id);
        let ptr_type = self
            .module
            .def_pointer_type(array_type, spirv::StorageClass::Workgroup);
        let var_id = self
            .module
            .new_var(ptr_type, spirv::StorageClass::Workgroup);
        self.module.set_debug_name(var_id, &format!("g{index}"));

        self.tgsm[index] = Some(TgsmSlot { var_id, stride });
        Ok(())
    }

    fn emit_dcl_gs_input_primitive(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let primitive =
            ins.controls
                .gs_input_primitive()
                .ok_or_else(|| TranslateError::InvalidOperand {
                    context: "unknown geometry input primitive".to_owned(),
                })?;
        let mode = match primitive {
            Primitive::Point => spirv::ExecutionMode::InputPoints,
            Primitive::Line => spirv::ExecutionMode::InputLines,
            Primitive::Triangle => spirv::ExecutionMode::Triangles,
            Primitive::LineAdj => spirv::ExecutionMode::InputLinesAdjacency,
            Primitive::TriangleAdj => spirv::ExecutionMode::InputTrianglesAdjacency,
            Primitive::Undefined => {
                return Err(TranslateError::InvalidOperand {
                    context: "undefined geometry input primitive".to_owned(),
                })
            }
        };
        self.gs_vertex_count = primitive.vertex_count();
        self.module.set_execution_mode(self.entry_point_id, mode, &[]);
        Ok(())
    }

    fn emit_dcl_gs_output_topology(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let topology =
            ins.controls
                .gs_output_topology()
                .ok_or_else(|| TranslateError::InvalidOperand {
                    context: "unknown geometry output topology".to_owned(),
                })?;
        let mode = match topology {
            PrimitiveTopology::PointList => spirv::ExecutionMode::OutputPoints,
            PrimitiveTopology::LineStrip => spirv::ExecutionMode::OutputLineStrip,
            PrimitiveTopology::TriangleStrip => spirv::ExecutionMode::OutputTriangleStrip,
            other => {
                return Err(TranslateError::Unsupported {
                    context: format!("geometry output topology {other:?}"),
                })
            }
        };
        self.module.set_execution_mode(self.entry_point_id, mode, &[]);
        Ok(())
    }

    fn emit_dcl_tess_domain(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let mode = match ins.controls.tess_domain() {
            Some(TessDomain::Isolines) => spirv::ExecutionMode::Isolines,
            Some(TessDomain::Triangles) => spirv::ExecutionMode::Triangles,
            Some(TessDomain::Quads) => spirv::ExecutionMode::Quads,
            _ => {
                return Err(TranslateError::InvalidOperand {
                    context: "undefined tessellator domain".to_owned(),
                })
            }
        };
        self.module.set_execution_mode(self.entry_point_id, mode, &[]);
        Ok(())
    }

    fn emit_dcl_tess_partitioning(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let mode = match ins.controls.tess_partitioning() {
            Some(TessPartitioning::Integer) | Some(TessPartitioning::Pow2) => {
                spirv::ExecutionMode::SpacingEqual
            }
            Some(TessPartitioning::FractOdd) => spirv::ExecutionMode::SpacingFractionalOdd,
            Some(TessPartitioning::FractEven) => spirv::ExecutionMode::SpacingFractionalEven,
            _ => {
                return Err(TranslateError::InvalidOperand {
                    context: "undefined tessellator partitioning".to_owned(),
                })
            }
        };
        self.module.set_execution_mode(self.entry_point_id, mode, &[]);
        Ok(())
    }

    fn emit_dcl_tess_output_primitive(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        match ins.controls.tess_output_primitive() {
            Some(TessOutputPrimitive::Point) => {
                self.module
                    .set_execution_mode(self.entry_point_id, spirv::ExecutionMode::PointMode, &[]);
            }
            Some(TessOutputPrimitive::Line) => {}
            Some(TessOutputPrimitive::TriangleCw) => {
                self.module.set_execution_mode(
                    self.entry_point_id,
                    spirv::ExecutionMode::VertexOrderCw,
                    &[],
                );
            }
            Some(TessOutputPrimitive::TriangleCcw) => {
                self.module.set_execution_mode(
                    self.entry_point_id,
                    spirv::ExecutionMode::VertexOrderCcw,
                    &[],
                );
            }
            _ => {
                return Err(TranslateError::InvalidOperand {
                    context: "undefined tessellator output primitive".to_owned(),
                })
            }
        }
        Ok(())
    }

    /// Maps a packed resource return-type token to the sampled type. All
    /// four components must agree; normalized formats sample as float.
    fn resource_return_type(&mut self, token: u32) -> Result<ScalarType, TranslateError> {
        let x = token & 0xf;
        for shift in [4, 8, 12] {
            let other = (token >> shift) & 0xf;
            if other != x && other != ResourceReturnType::Unused as u32 && other != 0 {
                tracing::warn!("mixed resource return types {token:#x}; using component x");
                break;
            }
        }
        match ResourceReturnType::from_u32(x) {
            Some(ResourceReturnType::Float)
            | Some(ResourceReturnType::Unorm)
            | Some(ResourceReturnType::Snorm) => Ok(ScalarType::Float32),
            Some(ResourceReturnType::Sint) => Ok(ScalarType::Sint32),
            Some(ResourceReturnType::Uint) => Ok(ScalarType::Uint32),
            _ => Err(TranslateError::UnknownResourceReturnType { value: x }),
        }
    }

    /// Builds the image type for a texture resource dimension. `sampled` is
    /// 1 for sampled images (SRVs) and 2 for storage images (UAVs).
    fn def_texture_image_type(
        &mut self,
        sampled_type_id: Word,
        dim: ResourceDim,
        sampled: u32,
    ) -> Result<Word, TranslateError> {
        let (spv_dim, arrayed, ms) = match dim {
            ResourceDim::Buffer => (spirv::Dim::DimBuffer, 0, 0),
            ResourceDim::Texture1D => (spirv::Dim::Dim1D, 0, 0),
            ResourceDim::Texture1DArr => (spirv::Dim::Dim1D, 1, 0),
            ResourceDim::Texture2D => (spirv::Dim::Dim2D, 0, 0),
            ResourceDim::Texture2DArr => (spirv::Dim::Dim2D, 1, 0),
            ResourceDim::Texture2DMs => (spirv::Dim::Dim2D, 0, 1),
            ResourceDim::Texture2DMsArr => (spirv::Dim::Dim2D, 1, 1),
            ResourceDim::Texture3D => (spirv::Dim::Dim3D, 0, 0),
            ResourceDim::TextureCube => (spirv::Dim::DimCube, 0, 0),
            ResourceDim::TextureCubeArr => (spirv::Dim::DimCube, 1, 0),
            other => {
                return Err(TranslateError::UnknownResourceDim {
                    value: other as u32,
                })
            }
        };

        match spv_dim {
            spirv::Dim::Dim1D if sampled == 1 => {
                self.module.enable_capability(spirv::Capability::Sampled1D);
            }
            spirv::Dim::Dim1D => {
                self.module.enable_capability(spirv::Capability::Image1D);
            }
            spirv::Dim::DimBuffer if sampled == 1 => {
                self.module
                    .enable_capability(spirv::Capability::SampledBuffer);
            }
            spirv::Dim::DimBuffer => {
                self.module.enable_capability(spirv::Capability::ImageBuffer);
            }
            spirv::Dim::DimCube if arrayed == 1 && sampled == 1 => {
                self.module
                    .enable_capability(spirv::Capability::SampledCubeArray);
            }
            _ => {}
        }
        if ms == 1 && sampled == 2 {
            self.module
                .enable_capability(spirv::Capability::StorageImageMultisample);
        }

        Ok(self.module.def_image_type(
            sampled_type_id,
            spv_dim,
            0,
            arrayed,
            ms,
            sampled,
            spirv::ImageFormat::Unknown,
        ))
    }

    /// `CustomData` blocks: the immediate constant buffer becomes a private
    /// constant array of float4; comments and debug info are dropped.
    pub(crate) fn emit_custom_data(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        let data = ins.custom_data.as_ref().expect("custom-data instruction");
        match data.class {
            CustomDataClass::ImmConstBuf => {
                if self.icb_var != 0 {
                    return Err(TranslateError::InvalidStateMachine {
                        context: "multiple immediate constant buffers".to_owned(),
                    });
                }
                let vec_count = data.payload.len() / 4;
                if vec_count == 0 {
                    return Ok(());
                }

                let vec4_type = self.get_vector_type_id(vec4_f32());
                let mut elements = Vec::with_capacity(vec_count);
                for chunk in data.payload.chunks_exact(4) {
                    let mut parts = [0u32; 4];
                    for (part, &word) in parts.iter_mut().zip(chunk) {
                        *part = self.module.const_f32(f32::from_bits(word));
                    }
                    elements.push(self.module.const_composite(vec4_type, &parts));
                }

                let len_id = self.module.const_u32(vec_count as u32);
                let array_type = self.module.def_array_type(vec4_type, len_id);
                let init = self.module.const_composite(array_type, &elements);
                let ptr_type = self
                    .module
                    .def_pointer_type(array_type, spirv::StorageClass::Private);
                self.icb_var =
                    self.module
                        .new_var_init(ptr_type, spirv::StorageClass::Private, init);
                self.module.set_debug_name(self.icb_var, "icb");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
