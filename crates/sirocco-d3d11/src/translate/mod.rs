//! DXBC → SPIR-V lowering.
//!
//! [`translate`] drives the whole pipeline: parse the container, decode the
//! instruction stream, and feed each instruction through a [`Compiler`]
//! that emits SPIR-V through [`sirocco_spirv::Module`].
//!
//! The compiler is single-pass. Shader code is emitted into a stage-local
//! function while declarations accumulate module-level state; `finalize`
//! then writes the real entry point, which copies system-value inputs into
//! the register file, calls the stage function, and copies system-value
//! outputs back out.

mod alu;
mod decl;
mod flow;
mod memory;
mod reg;
mod texture;

use std::collections::HashMap;

use sirocco_dxbc::sm4::{ShaderModel, ShaderStage, Sm4Error, Sm4Program};
use sirocco_dxbc::{DxbcError, DxbcFile, FourCC, Signature};
use sirocco_spirv::{Module, Word};
use thiserror::Error;

use crate::sm4::decode::{decode_program, DecodeError, Instruction};
use crate::sm4::format::InstClass;
use crate::sm4::opcode::{Opcode, ResourceDim, ScalarType, SystemValue};
use crate::sm4::WriteMask;

pub(crate) use reg::{RegisterInfo, RegisterPointer, RegisterValue, VectorType};

pub(crate) const MAX_INTERFACE_REGS: usize = 32;
const MAX_CONSTANT_BUFFERS: usize = 16;
const MAX_SAMPLERS: usize = 16;
const MAX_TEXTURES: usize = 128;
const MAX_UAVS: usize = 64;

/// Generator magic written into the SPIR-V header by default.
pub const GENERATOR_MAGIC: u32 = 0x0053_0001;

/// Resource class used to compute binding slots, mirroring how the host
/// API groups bindings per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingClass {
    ConstantBuffer,
    ShaderResource,
    ImageSampler,
    UnorderedAccessView,
}

/// Vulkan descriptor kind of one declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    UniformBuffer,
    Sampler,
    SampledImage,
    StorageImage,
    StorageBuffer,
    UniformTexelBuffer,
    StorageTexelBuffer,
}

/// One entry of the binding descriptor list, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSlot {
    pub slot: u32,
    pub kind: BindingKind,
}

/// Default slot convention: disjoint per-stage ranges with fixed offsets
/// per resource class, so any (stage, class, register) triple maps to a
/// unique flat binding index.
pub fn default_resource_slot(stage: ShaderStage, class: BindingClass, register: u32) -> u32 {
    let stage_base = 192 * match stage {
        ShaderStage::Pixel => 0,
        ShaderStage::Vertex => 1,
        ShaderStage::Geometry => 2,
        ShaderStage::Hull => 3,
        ShaderStage::Domain => 4,
        ShaderStage::Compute => 5,
    };
    let class_base = match class {
        BindingClass::ConstantBuffer => 0,
        BindingClass::ImageSampler => 16,
        BindingClass::ShaderResource => 32,
        BindingClass::UnorderedAccessView => 160,
    };
    stage_base + class_base + register
}

/// Translation options.
#[derive(Clone)]
pub struct TranslateOptions {
    /// SPIR-V version word for the module header.
    pub spirv_version: u32,
    /// Generator magic for the module header.
    pub generator: u32,
    /// Computes the binding slot for a declared resource.
    pub resource_slot: fn(ShaderStage, BindingClass, u32) -> u32,
    /// Lower `discard` to demote-to-helper-invocation instead of `OpKill`,
    /// preserving derivative validity in non-uniform control flow.
    pub defer_kill: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            spirv_version: 0x0001_0000,
            generator: GENERATOR_MAGIC,
            resource_slot: default_resource_slot,
            defer_kill: false,
        }
    }
}

/// A successfully translated shader.
#[derive(Debug)]
pub struct TranslatedShader {
    /// The complete SPIR-V word stream.
    pub spirv: Vec<u32>,
    /// Binding descriptors, one per declared resource, in declaration
    /// order.
    pub bindings: Vec<BindingSlot>,
    pub stage: ShaderStage,
    pub model: ShaderModel,
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Container(#[from] DxbcError),

    #[error(transparent)]
    Program(#[from] Sm4Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("unsupported opcode {op:?}")]
    UnsupportedOpcode { op: Opcode },

    #[error("register index out of range: {context}")]
    InvalidOperandIndex { context: String },

    #[error("invalid operand: {context}")]
    InvalidOperand { context: String },

    #[error("unbalanced control flow: {context}")]
    InvalidStateMachine { context: String },

    #[error("unknown resource dimension {value}")]
    UnknownResourceDim { value: u32 },

    #[error("unknown resource return type {value}")]
    UnknownResourceReturnType { value: u32 },

    #[error("unsupported: {context}")]
    Unsupported { context: String },
}

/// Translates a DXBC blob into a SPIR-V module and its binding list.
///
/// Any failure aborts the translation; partial modules are never returned.
pub fn translate(
    bytes: &[u8],
    options: &TranslateOptions,
) -> Result<TranslatedShader, TranslateError> {
    let dxbc = DxbcFile::parse(bytes)?;
    let isgn = dxbc.get_signature(FourCC(*b"ISGN")).transpose()?;
    let osgn = dxbc.get_signature(FourCC(*b"OSGN")).transpose()?;
    let program = Sm4Program::parse_from_dxbc(&dxbc)?;
    let instructions = decode_program(program.body())?;

    let mut compiler = Compiler::new(&program, isgn, osgn, options)?;
    for ins in &instructions {
        compiler.process_instruction(ins)?;
    }
    compiler.finalize()
}

// --- Compiler state -------------------------------------------------------

/// A declared interface register (`v#`/`o#`).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct InterfaceVar {
    pub var_id: Word,
    pub storage_class: Option<spirv::StorageClass>,
    /// Array length for geometry shader inputs; 0 when not an array.
    pub array_len: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct IndexableTemp {
    pub var_id: Word,
    pub component_count: u32,
    pub len: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ConstantBufferSlot {
    pub var_id: Word,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SamplerSlot {
    pub var_id: Word,
    pub type_id: Word,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageInfo {
    pub image_type_id: Word,
    pub sampled_type: ScalarType,
    pub dim: ResourceDim,
}

/// Shape of a declared `t#`/`u#` resource.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) enum ResourceKind {
    #[default]
    None,
    SampledImage(ImageInfo),
    StorageImage(ImageInfo),
    RawBuffer,
    StructuredBuffer {
        stride: u32,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ResourceVar {
    pub var_id: Word,
    pub kind: ResourceKind,
}

/// Thread-group shared memory register (`g#`), stored as a word array.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TgsmSlot {
    pub var_id: Word,
    /// Structure stride in bytes; 4 for raw storage.
    pub stride: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SvMapping {
    pub reg: u32,
    pub mask: WriteMask,
    pub sv: SystemValue,
}

/// Structured control-flow frame.
pub(crate) enum CfFrame {
    If {
        merge: Word,
        label_else: Word,
        had_else: bool,
    },
    Loop {
        header: Word,
        continue_: Word,
        merge: Word,
    },
    Switch {
        merge: Word,
        selector: Word,
        insert_at: usize,
        cases: Vec<sirocco_spirv::SwitchCaseLabel>,
        default: Option<Word>,
        case_open: bool,
    },
}

pub(crate) struct Compiler<'a> {
    pub(crate) stage: ShaderStage,
    pub(crate) model: ShaderModel,
    pub(crate) opts: &'a TranslateOptions,
    pub(crate) module: Module,
    pub(crate) isgn: Option<Signature>,
    pub(crate) osgn: Option<Signature>,

    pub(crate) bindings: Vec<BindingSlot>,
    pub(crate) entry_point_id: Word,
    pub(crate) interfaces: Vec<Word>,

    pub(crate) r_regs: Vec<Word>,
    pub(crate) x_regs: Vec<IndexableTemp>,
    pub(crate) v_regs: [InterfaceVar; MAX_INTERFACE_REGS],
    pub(crate) o_regs: [InterfaceVar; MAX_INTERFACE_REGS],
    pub(crate) v_mappings: Vec<SvMapping>,
    pub(crate) o_mappings: Vec<SvMapping>,
    pub(crate) ps_o_types: [VectorType; MAX_INTERFACE_REGS],

    pub(crate) constant_buffers: [ConstantBufferSlot; MAX_CONSTANT_BUFFERS],
    pub(crate) samplers: [SamplerSlot; MAX_SAMPLERS],
    pub(crate) textures: Vec<ResourceVar>,
    pub(crate) uavs: Vec<ResourceVar>,
    pub(crate) tgsm: Vec<Option<TgsmSlot>>,
    pub(crate) icb_var: Word,

    pub(crate) per_vertex_out: Word,
    pub(crate) stage_fn_id: Word,
    pub(crate) stage_fn_returned: bool,
    pub(crate) cf_stack: Vec<CfFrame>,
    pub(crate) builtins: HashMap<spirv::BuiltIn, RegisterPointer>,
    pub(crate) gs_vertex_count: u32,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        program: &Sm4Program,
        isgn: Option<Signature>,
        osgn: Option<Signature>,
        opts: &'a TranslateOptions,
    ) -> Result<Self, TranslateError> {
        let mut module = Module::new(opts.spirv_version, opts.generator);
        // Allocated up front so execution modes can reference the entry
        // point before it is defined.
        let entry_point_id = module.allocate_id();
        module.set_memory_model(spirv::AddressingModel::Logical, spirv::MemoryModel::GLSL450);

        let mut compiler = Self {
            stage: program.stage,
            model: program.model,
            opts,
            module,
            isgn,
            osgn,
            bindings: Vec::new(),
            entry_point_id,
            interfaces: Vec::new(),
            r_regs: Vec::new(),
            x_regs: Vec::new(),
            v_regs: [InterfaceVar::default(); MAX_INTERFACE_REGS],
            o_regs: [InterfaceVar::default(); MAX_INTERFACE_REGS],
            v_mappings: Vec::new(),
            o_mappings: Vec::new(),
            ps_o_types: [VectorType {
                ctype: ScalarType::Float32,
                ccount: 0,
            }; MAX_INTERFACE_REGS],
            constant_buffers: [ConstantBufferSlot::default(); MAX_CONSTANT_BUFFERS],
            samplers: [SamplerSlot::default(); MAX_SAMPLERS],
            textures: vec![ResourceVar::default(); MAX_TEXTURES],
            uavs: vec![ResourceVar::default(); MAX_UAVS],
            tgsm: Vec::new(),
            icb_var: 0,
            per_vertex_out: 0,
            stage_fn_id: 0,
            stage_fn_returned: false,
            cf_stack: Vec::new(),
            builtins: HashMap::new(),
            gs_vertex_count: 0,
        };

        compiler.module.enable_capability(spirv::Capability::Shader);
        match compiler.stage {
            ShaderStage::Vertex => compiler.emit_vs_init(),
            ShaderStage::Pixel => compiler.emit_ps_init(),
            ShaderStage::Geometry => compiler.emit_gs_init(),
            ShaderStage::Hull => compiler.emit_hs_init(),
            ShaderStage::Domain => compiler.emit_ds_init(),
            ShaderStage::Compute => compiler.emit_cs_init(),
        }
        Ok(compiler)
    }

    pub(crate) fn process_instruction(&mut self, ins: &Instruction) -> Result<(), TranslateError> {
        match ins.class {
            InstClass::Declaration => self.emit_dcl(ins),
            InstClass::CustomData => self.emit_custom_data(ins),
            InstClass::NoOperation => Ok(()),
            InstClass::VectorAlu => self.emit_vector_alu(ins),
            InstClass::VectorShift => self.emit_vector_shift(ins),
            InstClass::VectorCmov => self.emit_vector_cmov(ins),
            InstClass::VectorCmp => self.emit_vector_cmp(ins),
            InstClass::VectorDeriv => self.emit_vector_deriv(ins),
            InstClass::VectorDot => self.emit_vector_dot(ins),
            InstClass::VectorIdiv => self.emit_vector_idiv(ins),
            InstClass::VectorImul => self.emit_vector_imul(ins),
            InstClass::VectorSinCos => self.emit_vector_sin_cos(ins),
            InstClass::BitExtract => self.emit_bit_extract(ins),
            InstClass::BitInsert => self.emit_bit_insert(ins),
            InstClass::BitScan => self.emit_bit_scan(ins),
            InstClass::ConvertFloat16 => self.emit_convert_float16(ins),
            InstClass::ControlFlow => self.emit_control_flow(ins),
            InstClass::GeometryEmit => self.emit_geometry_emit(ins),
            InstClass::Barrier => self.emit_barrier(ins),
            InstClass::TextureSample => self.emit_sample(ins),
            InstClass::TextureFetch => self.emit_texture_fetch(ins),
            InstClass::TextureGather => self.emit_texture_gather(ins),
            InstClass::TextureQuery => self.emit_texture_query(ins),
            InstClass::TextureQueryLod => self.emit_texture_query_lod(ins),
            InstClass::TextureQueryMs => self.emit_texture_query_ms(ins),
            InstClass::TextureQueryMsPos => self.emit_texture_query_ms_pos(ins),
            InstClass::BufferQuery => self.emit_buffer_query(ins),
            InstClass::BufferLoad => self.emit_buffer_load(ins),
            InstClass::BufferStore => self.emit_buffer_store(ins),
            InstClass::TypedUavLoad => self.emit_typed_uav_load(ins),
            InstClass::TypedUavStore => self.emit_typed_uav_store(ins),
            InstClass::Atomic => self.emit_atomic(ins),
            InstClass::HullShaderInstCnt
            | InstClass::HullShaderPhase
            | InstClass::AtomicCounter
            | InstClass::Interpolate
            | InstClass::ConvertFloat64
            | InstClass::VectorMsad
            | InstClass::Undefined => Err(TranslateError::UnsupportedOpcode { op: ins.op }),
        }
    }

    pub(crate) fn finalize(mut self) -> Result<TranslatedShader, TranslateError> {
        if !self.cf_stack.is_empty() {
            return Err(TranslateError::InvalidStateMachine {
                context: format!(
                    "{} unterminated control flow block(s) at end of shader",
                    self.cf_stack.len()
                ),
            });
        }

        // Close the stage-local function.
        if !self.stage_fn_returned {
            self.module.op_return();
        }
        self.module.function_end();

        // The real entry point: prologue, stage call, epilogue.
        let void_type = self.module.def_void_type();
        let fn_type = self.module.def_function_type(void_type, &[]);
        self.module.function_begin(
            void_type,
            self.entry_point_id,
            fn_type,
            spirv::FunctionControl::NONE,
        );
        let label = self.module.allocate_id();
        self.module.op_label(label);

        self.emit_input_setup()?;
        let void_type = self.module.def_void_type();
        self.module
            .op_function_call(void_type, self.stage_fn_id, &[]);
        if self.stage != ShaderStage::Geometry {
            self.emit_output_setup()?;
        }

        self.module.op_return();
        self.module.function_end();

        let execution_model = match self.stage {
            ShaderStage::Pixel => spirv::ExecutionModel::Fragment,
            ShaderStage::Vertex => spirv::ExecutionModel::Vertex,
            ShaderStage::Geometry => spirv::ExecutionModel::Geometry,
            ShaderStage::Hull => spirv::ExecutionModel::TessellationControl,
            ShaderStage::Domain => spirv::ExecutionModel::TessellationEvaluation,
            ShaderStage::Compute => spirv::ExecutionModel::GLCompute,
        };
        let interfaces = std::mem::take(&mut self.interfaces);
        self.module
            .add_entry_point(self.entry_point_id, execution_model, "main", &interfaces);
        self.module.set_debug_name(self.entry_point_id, "main");

        Ok(TranslatedShader {
            spirv: self.module.finalize(),
            bindings: self.bindings,
            stage: self.stage,
            model: self.model,
        })
    }

    // --- Stage initialisation ---------------------------------------------

    /// Opens the stage-local function that instruction code is emitted
    /// into. Kept separate from the entry point so I/O setup code wraps it.
    fn begin_stage_function(&mut self, name: &str) {
        let void_type = self.module.def_void_type();
        let fn_type = self.module.def_function_type(void_type, &[]);
        self.stage_fn_id = self.module.allocate_id();
        self.module.set_debug_name(self.stage_fn_id, name);
        self.module.function_begin(
            void_type,
            self.stage_fn_id,
            fn_type,
            spirv::FunctionControl::NONE,
        );
        let label = self.module.allocate_id();
        self.module.op_label(label);
    }

    /// Declares the `gl_PerVertex` output block: position, point size and
    /// the clip/cull distance arrays with their builtin decorations.
    fn emit_per_vertex_output(&mut self, name: &str) {
        let f32_type = self.module.def_float_type(32);
        let vec4_type = self.module.def_vector_type(f32_type, 4);
        let dist_len = self.module.const_u32(PER_VERTEX_DIST_ARRAY_LEN);
        let f32_dist_arr = self.module.def_array_type(f32_type, dist_len);

        let members = [vec4_type, f32_type, f32_dist_arr, f32_dist_arr];
        let struct_type = self.module.def_struct_type_unique(&members);
        self.module
            .member_decorate_builtin(struct_type, PER_VERTEX_POSITION, spirv::BuiltIn::Position);
        self.module
            .member_decorate_builtin(struct_type, PER_VERTEX_POINT_SIZE, spirv::BuiltIn::PointSize);
        self.module.member_decorate_builtin(
            struct_type,
            PER_VERTEX_CULL_DIST,
            spirv::BuiltIn::CullDistance,
        );
        self.module.member_decorate_builtin(
            struct_type,
            PER_VERTEX_CLIP_DIST,
            spirv::BuiltIn::ClipDistance,
        );
        self.module.decorate_block(struct_type);
        self.module.set_debug_name(struct_type, "per_vertex");
        self.module
            .set_debug_member_name(struct_type, PER_VERTEX_POSITION, "position");
        self.module
            .set_debug_member_name(struct_type, PER_VERTEX_POINT_SIZE, "point_size");
        self.module
            .set_debug_member_name(struct_type, PER_VERTEX_CULL_DIST, "cull_dist");
        self.module
            .set_debug_member_name(struct_type, PER_VERTEX_CLIP_DIST, "clip_dist");

        let pointer_type = self
            .module
            .def_pointer_type(struct_type, spirv::StorageClass::Output);
        self.per_vertex_out = self
            .module
            .new_var(pointer_type, spirv::StorageClass::Output);
        self.module.set_debug_name(self.per_vertex_out, name);
        self.interfaces.push(self.per_vertex_out);
    }

    fn emit_vs_init(&mut self) {
        self.module
            .enable_capability(spirv::Capability::ClipDistance);
        self.module
            .enable_capability(spirv::Capability::CullDistance);
        self.emit_per_vertex_output("vs_vertex_out");
        self.begin_stage_function("vs_main");
    }

    fn emit_ps_init(&mut self) {
        self.module.set_origin_upper_left(self.entry_point_id);

        // Pixel shader outputs must match the render target types, so they
        // are pre-declared from the output signature instead of waiting for
        // `dcl_output`.
        if let Some(osgn) = self.osgn.take() {
            for entry in &osgn.entries {
                // Color targets are regular outputs whether the signature
                // tags them as such or with the explicit Target value.
                let is_target =
                    entry.system_value == 0 || entry.system_value == SystemValue::Target as u32;
                if !is_target {
                    continue;
                }
                let reg = entry.register as usize;
                if reg >= MAX_INTERFACE_REGS || self.o_regs[reg].var_id != 0 {
                    continue;
                }
                let vtype = VectorType {
                    ctype: scalar_from_component_type(entry.component_type),
                    ccount: (entry.mask as u32).count_ones().max(1),
                };
                let var_id = self.emit_new_variable(RegisterInfo {
                    vtype,
                    storage_class: spirv::StorageClass::Output,
                });
                self.module.decorate_location(var_id, entry.register);
                self.module
                    .set_debug_name(var_id, &format!("o{}", entry.register));
                self.interfaces.push(var_id);
                self.o_regs[reg] = InterfaceVar {
                    var_id,
                    storage_class: Some(spirv::StorageClass::Output),
                    array_len: 0,
                };
                self.ps_o_types[reg] = vtype;
            }
            self.osgn = Some(osgn);
        }

        self.begin_stage_function("ps_main");
    }

    fn emit_gs_init(&mut self) {
        self.module.enable_capability(spirv::Capability::Geometry);
        self.module
            .enable_capability(spirv::Capability::ClipDistance);
        self.module
            .enable_capability(spirv::Capability::CullDistance);
        self.emit_per_vertex_output("gs_vertex_out");
        self.begin_stage_function("gs_main");
    }

    fn emit_hs_init(&mut self) {
        self.module
            .enable_capability(spirv::Capability::Tessellation);
        self.begin_stage_function("hs_main");
    }

    fn emit_ds_init(&mut self) {
        self.module
            .enable_capability(spirv::Capability::Tessellation);
        self.module
            .enable_capability(spirv::Capability::ClipDistance);
        self.module
            .enable_capability(spirv::Capability::CullDistance);
        self.emit_per_vertex_output("ds_vertex_out");
        self.begin_stage_function("ds_main");
    }

    fn emit_cs_init(&mut self) {
        self.begin_stage_function("cs_main");
    }

    // --- Entry point prologue / epilogue ----------------------------------

    /// Copies system-value inputs into their private register-file slots.
    fn emit_input_setup(&mut self) -> Result<(), TranslateError> {
        let mappings = self.v_mappings.clone();
        for mapping in mappings {
            let target = self.v_regs[mapping.reg as usize];
            if target.var_id == 0 || target.storage_class != Some(spirv::StorageClass::Private) {
                continue;
            }
            let value = match self.load_sv_input(mapping.sv)? {
                Some(value) => value,
                None => continue,
            };
            let ptr = RegisterPointer {
                vtype: VectorType {
                    ctype: ScalarType::Float32,
                    ccount: 4,
                },
                id: target.var_id,
            };
            self.emit_value_store(ptr, value, mapping.mask);
        }
        Ok(())
    }

    /// Produces the value of a system-value input from the matching SPIR-V
    /// builtin. Returns `None` (with a warning) for values this stage does
    /// not wire up.
    fn load_sv_input(&mut self, sv: SystemValue) -> Result<Option<RegisterValue>, TranslateError> {
        let value = match sv {
            SystemValue::VertexId => {
                let ptr = self.builtin_var(spirv::BuiltIn::VertexIndex);
                Some(self.emit_value_load(ptr))
            }
            SystemValue::InstanceId => {
                let ptr = self.builtin_var(spirv::BuiltIn::InstanceIndex);
                Some(self.emit_value_load(ptr))
            }
            SystemValue::Position => {
                let ptr = self.builtin_var(spirv::BuiltIn::FragCoord);
                Some(self.emit_value_load(ptr))
            }
            SystemValue::PrimitiveId => {
                let ptr = self.builtin_var(spirv::BuiltIn::PrimitiveId);
                Some(self.emit_value_load(ptr))
            }
            SystemValue::SampleIndex => {
                let ptr = self.builtin_var(spirv::BuiltIn::SampleId);
                Some(self.emit_value_load(ptr))
            }
            SystemValue::IsFrontFace => {
                let ptr = self.builtin_var(spirv::BuiltIn::FrontFacing);
                let flag = self.emit_value_load(ptr);
                let u32_type = self.module.def_int_type(32, 0);
                let all_ones = self.module.const_u32(!0u32);
                let zero = self.module.const_u32(0);
                let id = self.module.op_select(u32_type, flag.id, all_ones, zero);
                Some(RegisterValue {
                    vtype: VectorType {
                        ctype: ScalarType::Uint32,
                        ccount: 1,
                    },
                    id,
                })
            }
            other => {
                tracing::warn!("unhandled system-value input {other:?}");
                None
            }
        };
        Ok(value)
    }

    /// Copies system-value outputs from the register file into the
    /// `gl_PerVertex` members / builtin variables. Also used before each
    /// vertex emit in geometry shaders.
    pub(crate) fn emit_output_setup(&mut self) -> Result<(), TranslateError> {
        let mappings = self.o_mappings.clone();
        for mapping in mappings {
            match mapping.sv {
                SystemValue::Position => {
                    let src = self.o_regs[mapping.reg as usize];
                    if src.var_id == 0 {
                        continue;
                    }
                    let vtype = VectorType {
                        ctype: ScalarType::Float32,
                        ccount: 4,
                    };
                    let ptr_type = self.get_pointer_type_id(RegisterInfo {
                        vtype,
                        storage_class: spirv::StorageClass::Output,
                    });
                    let member = self.module.const_u32(PER_VERTEX_POSITION);
                    let dst_id =
                        self.module
                            .op_access_chain(ptr_type, self.per_vertex_out, &[member]);
                    let dst_ptr = RegisterPointer {
                        vtype,
                        id: dst_id,
                    };
                    let src_ptr = RegisterPointer {
                        vtype,
                        id: src.var_id,
                    };
                    let value = self.emit_value_load(src_ptr);
                    self.emit_value_store(dst_ptr, value, WriteMask::XYZW);
                }
                SystemValue::ClipDistance | SystemValue::CullDistance => {
                    let src = self.o_regs[mapping.reg as usize];
                    if src.var_id == 0 {
                        continue;
                    }
                    let member = if mapping.sv == SystemValue::ClipDistance {
                        PER_VERTEX_CLIP_DIST
                    } else {
                        PER_VERTEX_CULL_DIST
                    };
                    // The semantic index selects which half of the distance
                    // array this register covers (SV_ClipDistance0 writes
                    // elements from 0, SV_ClipDistance1 from 1).
                    let base = self.distance_array_base(mapping.reg, mapping.sv);

                    let src_ptr = RegisterPointer {
                        vtype: vec4_f32(),
                        id: src.var_id,
                    };
                    let value = self.emit_value_load(src_ptr);
                    let value = self.emit_register_extract(value, mapping.mask);

                    let f32_type = self.module.def_float_type(32);
                    let ptr_type = self
                        .module
                        .def_pointer_type(f32_type, spirv::StorageClass::Output);
                    let member_id = self.module.const_u32(member);

                    for lane in 0..value.vtype.ccount {
                        let element = base + lane;
                        if element >= PER_VERTEX_DIST_ARRAY_LEN {
                            tracing::warn!(
                                "distance output o{} exceeds the {}-element array",
                                mapping.reg,
                                PER_VERTEX_DIST_ARRAY_LEN
                            );
                            break;
                        }
                        let component = if value.vtype.ccount == 1 {
                            value.id
                        } else {
                            self.module
                                .op_composite_extract(f32_type, value.id, &[lane])
                        };
                        let element_id = self.module.const_u32(element);
                        let dst = self.module.op_access_chain(
                            ptr_type,
                            self.per_vertex_out,
                            &[member_id, element_id],
                        );
                        self.module.op_store(dst, component);
                    }
                }
                SystemValue::Depth => {
                    let src = self.o_regs[mapping.reg as usize];
                    if src.var_id == 0 {
                        continue;
                    }
                    let src_ptr = RegisterPointer {
                        vtype: self.ps_o_types[mapping.reg as usize],
                        id: src.var_id,
                    };
                    let value = self.emit_value_load(src_ptr);
                    let dst = self.builtin_var(spirv::BuiltIn::FragDepth);
                    self.emit_value_store(dst, value, WriteMask::X);
                }
                // Color targets write straight through their output
                // variables; nothing to bridge here.
                SystemValue::Target => {}
                other => {
                    tracing::warn!("unhandled system-value output {other:?}");
                }
            }
        }
        Ok(())
    }

    /// Starting element in the clip/cull distance array for a register,
    /// from the output signature's semantic index (`SV_ClipDistance1` maps
    /// to the upper half). Registers absent from the signature start at 0.
    fn distance_array_base(&self, reg: u32, sv: SystemValue) -> u32 {
        self.osgn
            .as_ref()
            .and_then(|sig| {
                sig.entries
                    .iter()
                    .find(|e| e.register == reg && e.system_value == sv as u32)
            })
            .map(|e| e.semantic_index)
            .unwrap_or(0)
    }

    // --- Builtin variables ------------------------------------------------

    /// Returns the variable for a SPIR-V builtin, declaring it (and any
    /// capability or execution mode it needs) on first use.
    pub(crate) fn builtin_var(&mut self, builtin: spirv::BuiltIn) -> RegisterPointer {
        if let Some(&ptr) = self.builtins.get(&builtin) {
            return ptr;
        }

        let (vtype, storage_class, name): (VectorType, spirv::StorageClass, &str) = match builtin {
            spirv::BuiltIn::VertexIndex => (scalar(ScalarType::Sint32), spirv::StorageClass::Input, "vertex_index"),
            spirv::BuiltIn::InstanceIndex => (scalar(ScalarType::Sint32), spirv::StorageClass::Input, "instance_index"),
            spirv::BuiltIn::FragCoord => (vec4_f32(), spirv::StorageClass::Input, "frag_coord"),
            spirv::BuiltIn::FrontFacing => (scalar(ScalarType::Bool), spirv::StorageClass::Input, "is_front_face"),
            spirv::BuiltIn::SampleId => (scalar(ScalarType::Sint32), spirv::StorageClass::Input, "sample_id"),
            spirv::BuiltIn::PrimitiveId => (scalar(ScalarType::Sint32), spirv::StorageClass::Input, "primitive_id"),
            spirv::BuiltIn::InvocationId => (scalar(ScalarType::Sint32), spirv::StorageClass::Input, "invocation_id"),
            spirv::BuiltIn::GlobalInvocationId => (vec3_u32(), spirv::StorageClass::Input, "global_invocation_id"),
            spirv::BuiltIn::LocalInvocationId => (vec3_u32(), spirv::StorageClass::Input, "local_invocation_id"),
            spirv::BuiltIn::WorkgroupId => (vec3_u32(), spirv::StorageClass::Input, "workgroup_id"),
            spirv::BuiltIn::LocalInvocationIndex => (scalar(ScalarType::Uint32), spirv::StorageClass::Input, "local_invocation_index"),
            spirv::BuiltIn::TessCoord => (vec3_f32(), spirv::StorageClass::Input, "tess_coord"),
            spirv::BuiltIn::FragDepth => (scalar(ScalarType::Float32), spirv::StorageClass::Output, "frag_depth"),
            other => {
                // Callers only request the builtins above.
                unreachable!("unexpected builtin request {other:?}")
            }
        };

        match builtin {
            spirv::BuiltIn::SampleId => {
                self.module
                    .enable_capability(spirv::Capability::SampleRateShading);
            }
            spirv::BuiltIn::PrimitiveId => {
                self.module.enable_capability(spirv::Capability::Geometry);
            }
            spirv::BuiltIn::FragDepth => {
                self.module
                    .set_execution_mode(self.entry_point_id, spirv::ExecutionMode::DepthReplacing, &[]);
            }
            _ => {}
        }

        let var_id = self.emit_new_variable(RegisterInfo {
            vtype,
            storage_class,
        });
        self.module.decorate_builtin(var_id, builtin);
        self.module.set_debug_name(var_id, name);
        self.interfaces.push(var_id);

        let ptr = RegisterPointer {
            vtype,
            id: var_id,
        };
        self.builtins.insert(builtin, ptr);
        ptr
    }

    /// Registers a resource binding: decorates the variable and records the
    /// descriptor for the caller.
    pub(crate) fn add_binding(
        &mut self,
        var_id: Word,
        class: BindingClass,
        kind: BindingKind,
        register: u32,
    ) -> u32 {
        let slot = (self.opts.resource_slot)(self.stage, class, register);
        self.module.decorate_descriptor_set(var_id, 0);
        self.module.decorate_binding(var_id, slot);
        self.bindings.push(BindingSlot { slot, kind });
        slot
    }
}

pub(crate) const PER_VERTEX_POSITION: u32 = 0;
pub(crate) const PER_VERTEX_POINT_SIZE: u32 = 1;
pub(crate) const PER_VERTEX_CULL_DIST: u32 = 2;
pub(crate) const PER_VERTEX_CLIP_DIST: u32 = 3;

/// Length of the clip/cull distance arrays in the `gl_PerVertex` block.
pub(crate) const PER_VERTEX_DIST_ARRAY_LEN: u32 = 2;

pub(crate) fn scalar(ctype: ScalarType) -> VectorType {
    VectorType { ctype, ccount: 1 }
}

fn vec3_u32() -> VectorType {
    VectorType {
        ctype: ScalarType::Uint32,
        ccount: 3,
    }
}

fn vec3_f32() -> VectorType {
    VectorType {
        ctype: ScalarType::Float32,
        ccount: 3,
    }
}

pub(crate) fn vec4_f32() -> VectorType {
    VectorType {
        ctype: ScalarType::Float32,
        ccount: 4,
    }
}

pub(crate) fn scalar_from_component_type(
    ctype: sirocco_dxbc::RegisterComponentType,
) -> ScalarType {
    use sirocco_dxbc::RegisterComponentType;
    match ctype {
        RegisterComponentType::Uint32 => ScalarType::Uint32,
        RegisterComponentType::Sint32 => ScalarType::Sint32,
        RegisterComponentType::Float32 | RegisterComponentType::Unknown => ScalarType::Float32,
    }
}
