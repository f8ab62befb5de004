use std::collections::HashSet;

use spirv::{Op, Word};

use crate::CodeBuffer;

/// Optional image operands for sampling/fetch/gather instructions.
///
/// Set `flags` to the union of the operands present and fill the matching
/// id fields. The emitter writes the bitmask word only when `flags` is
/// non-empty, followed by the operand ids in bitmask-bit order as the
/// SPIR-V spec requires (bias, lod, grad, const-offset, offset,
/// const-offsets, sample, min-lod).
#[derive(Clone, Copy)]
pub struct ImageOperands {
    pub flags: spirv::ImageOperands,
    pub lod_bias: Word,
    pub lod: Word,
    pub grad_x: Word,
    pub grad_y: Word,
    pub const_offset: Word,
    pub offset: Word,
    pub const_offsets: Word,
    pub sample: Word,
    pub min_lod: Word,
}

impl Default for ImageOperands {
    fn default() -> Self {
        Self {
            flags: spirv::ImageOperands::empty(),
            lod_bias: 0,
            lod: 0,
            grad_x: 0,
            grad_y: 0,
            const_offset: 0,
            offset: 0,
            const_offsets: 0,
            sample: 0,
            min_lod: 0,
        }
    }
}

impl ImageOperands {
    fn word_count(&self) -> u16 {
        if self.flags.is_empty() {
            return 0;
        }
        let f = self.flags;
        let mut n = 1; // the bitmask word itself
        n += f.contains(spirv::ImageOperands::BIAS) as u16;
        n += f.contains(spirv::ImageOperands::LOD) as u16;
        n += 2 * f.contains(spirv::ImageOperands::GRAD) as u16;
        n += f.contains(spirv::ImageOperands::CONST_OFFSET) as u16;
        n += f.contains(spirv::ImageOperands::OFFSET) as u16;
        n += f.contains(spirv::ImageOperands::CONST_OFFSETS) as u16;
        n += f.contains(spirv::ImageOperands::SAMPLE) as u16;
        n += f.contains(spirv::ImageOperands::MIN_LOD) as u16;
        n
    }

    fn put(&self, buf: &mut CodeBuffer) {
        if self.flags.is_empty() {
            return;
        }
        buf.put_word(self.flags.bits());
        if self.flags.contains(spirv::ImageOperands::BIAS) {
            buf.put_word(self.lod_bias);
        }
        if self.flags.contains(spirv::ImageOperands::LOD) {
            buf.put_word(self.lod);
        }
        if self.flags.contains(spirv::ImageOperands::GRAD) {
            buf.put_word(self.grad_x);
            buf.put_word(self.grad_y);
        }
        if self.flags.contains(spirv::ImageOperands::CONST_OFFSET) {
            buf.put_word(self.const_offset);
        }
        if self.flags.contains(spirv::ImageOperands::OFFSET) {
            buf.put_word(self.offset);
        }
        if self.flags.contains(spirv::ImageOperands::CONST_OFFSETS) {
            buf.put_word(self.const_offsets);
        }
        if self.flags.contains(spirv::ImageOperands::SAMPLE) {
            buf.put_word(self.sample);
        }
        if self.flags.contains(spirv::ImageOperands::MIN_LOD) {
            buf.put_word(self.min_lod);
        }
    }
}

/// One `OpSwitch` case: literal selector value and target label.
#[derive(Clone, Copy)]
pub struct SwitchCaseLabel {
    pub literal: u32,
    pub label: Word,
}

fn switch_words(selector: Word, default: Word, cases: &[SwitchCaseLabel]) -> Vec<Word> {
    let len = 3 + 2 * cases.len() as u32;
    let mut words = vec![(Op::Switch as u32) | (len << 16), selector, default];
    for case in cases {
        words.push(case.literal);
        words.push(case.label);
    }
    words
}

/// A SPIR-V module under construction.
///
/// Eleven append-only sections are kept separate and concatenated by
/// [`finalize`](Module::finalize) in the order required for a valid module:
/// capabilities, extensions, ext-inst imports, memory model, entry points,
/// execution modes, debug names, annotations, types/constants, global
/// variables, function code.
///
/// The GLSL.std.450 instruction set is imported on construction; the
/// wrappers for `FMax`, `InverseSqrt` and friends use it implicitly.
pub struct Module {
    version: u32,
    generator: u32,
    id_bound: Word,
    glsl450: Word,

    capabilities: CodeBuffer,
    extensions: CodeBuffer,
    ext_inst_imports: CodeBuffer,
    memory_model: CodeBuffer,
    entry_points: CodeBuffer,
    exec_modes: CodeBuffer,
    debug_names: CodeBuffer,
    annotations: CodeBuffer,
    type_const_defs: CodeBuffer,
    variables: CodeBuffer,
    code: CodeBuffer,

    /// Ids of late-bound constants; excluded from constant dedup so a
    /// placeholder is never returned for an ordinary constant request.
    late_consts: HashSet<Word>,
}

impl Module {
    /// Creates an empty module targeting the given SPIR-V version word
    /// (e.g. `0x0001_0000` for 1.0) with a caller-chosen generator magic.
    pub fn new(version: u32, generator: u32) -> Self {
        let mut module = Self {
            version,
            generator,
            id_bound: 1,
            glsl450: 0,
            capabilities: CodeBuffer::new(),
            extensions: CodeBuffer::new(),
            ext_inst_imports: CodeBuffer::new(),
            memory_model: CodeBuffer::new(),
            entry_points: CodeBuffer::new(),
            exec_modes: CodeBuffer::new(),
            debug_names: CodeBuffer::new(),
            annotations: CodeBuffer::new(),
            type_const_defs: CodeBuffer::new(),
            variables: CodeBuffer::new(),
            code: CodeBuffer::new(),
            late_consts: HashSet::new(),
        };
        module.glsl450 = module.import_glsl_std_450();
        module
    }

    /// Produces the final word stream: the five-word header followed by all
    /// sections in SPIR-V order. The id bound is the next unallocated id.
    pub fn finalize(&self) -> Vec<Word> {
        let mut out = Vec::with_capacity(
            5 + self.capabilities.len()
                + self.extensions.len()
                + self.ext_inst_imports.len()
                + self.memory_model.len()
                + self.entry_points.len()
                + self.exec_modes.len()
                + self.debug_names.len()
                + self.annotations.len()
                + self.type_const_defs.len()
                + self.variables.len()
                + self.code.len(),
        );
        out.push(spirv::MAGIC_NUMBER);
        out.push(self.version);
        out.push(self.generator);
        out.push(self.id_bound);
        out.push(0);
        for section in [
            &self.capabilities,
            &self.extensions,
            &self.ext_inst_imports,
            &self.memory_model,
            &self.entry_points,
            &self.exec_modes,
            &self.debug_names,
            &self.annotations,
            &self.type_const_defs,
            &self.variables,
            &self.code,
        ] {
            out.extend_from_slice(section.words());
        }
        out
    }

    /// Allocates a fresh result id. Id 0 is reserved and never returned.
    pub fn allocate_id(&mut self) -> Word {
        let id = self.id_bound;
        self.id_bound += 1;
        id
    }

    /// The id of the GLSL.std.450 instruction-set import.
    pub fn glsl_std_450(&self) -> Word {
        self.glsl450
    }

    fn import_glsl_std_450(&mut self) -> Word {
        let id = self.allocate_id();
        let name = "GLSL.std.450";
        self.ext_inst_imports
            .put_ins(Op::ExtInstImport, 2 + CodeBuffer::str_word_count(name));
        self.ext_inst_imports.put_word(id);
        self.ext_inst_imports.put_str(name);
        id
    }

    pub fn has_capability(&self, capability: spirv::Capability) -> bool {
        self.capabilities
            .instructions()
            .any(|ins| ins.is(Op::Capability) && ins.arg(1) == capability as u32)
    }

    /// Enables a capability; idempotent.
    pub fn enable_capability(&mut self, capability: spirv::Capability) {
        if !self.has_capability(capability) {
            self.capabilities.put_ins(Op::Capability, 2);
            self.capabilities.put_word(capability as u32);
        }
    }

    pub fn enable_extension(&mut self, name: &str) {
        self.extensions
            .put_ins(Op::Extension, 1 + CodeBuffer::str_word_count(name));
        self.extensions.put_str(name);
    }

    /// Sets the module's memory model; call exactly once.
    pub fn set_memory_model(
        &mut self,
        addressing: spirv::AddressingModel,
        memory: spirv::MemoryModel,
    ) {
        self.memory_model.put_ins(Op::MemoryModel, 3);
        self.memory_model.put_word(addressing as u32);
        self.memory_model.put_word(memory as u32);
    }

    pub fn add_entry_point(
        &mut self,
        entry_point_id: Word,
        execution_model: spirv::ExecutionModel,
        name: &str,
        interfaces: &[Word],
    ) {
        self.entry_points.put_ins(
            Op::EntryPoint,
            3 + CodeBuffer::str_word_count(name) + interfaces.len() as u16,
        );
        self.entry_points.put_word(execution_model as u32);
        self.entry_points.put_word(entry_point_id);
        self.entry_points.put_str(name);
        self.entry_points.put_words(interfaces);
    }

    pub fn set_execution_mode(
        &mut self,
        entry_point_id: Word,
        mode: spirv::ExecutionMode,
        args: &[u32],
    ) {
        self.exec_modes
            .put_ins(Op::ExecutionMode, 3 + args.len() as u16);
        self.exec_modes.put_word(entry_point_id);
        self.exec_modes.put_word(mode as u32);
        self.exec_modes.put_words(args);
    }

    pub fn set_local_size(&mut self, entry_point_id: Word, x: u32, y: u32, z: u32) {
        self.set_execution_mode(entry_point_id, spirv::ExecutionMode::LocalSize, &[x, y, z]);
    }

    pub fn set_output_vertices(&mut self, entry_point_id: Word, count: u32) {
        self.set_execution_mode(entry_point_id, spirv::ExecutionMode::OutputVertices, &[count]);
    }

    pub fn set_invocations(&mut self, entry_point_id: Word, count: u32) {
        self.set_execution_mode(entry_point_id, spirv::ExecutionMode::Invocations, &[count]);
    }

    pub fn set_origin_upper_left(&mut self, entry_point_id: Word) {
        self.set_execution_mode(entry_point_id, spirv::ExecutionMode::OriginUpperLeft, &[]);
    }

    pub fn set_debug_name(&mut self, id: Word, name: &str) {
        self.debug_names
            .put_ins(Op::Name, 2 + CodeBuffer::str_word_count(name));
        self.debug_names.put_word(id);
        self.debug_names.put_str(name);
    }

    pub fn set_debug_member_name(&mut self, struct_id: Word, member: u32, name: &str) {
        self.debug_names
            .put_ins(Op::MemberName, 3 + CodeBuffer::str_word_count(name));
        self.debug_names.put_word(struct_id);
        self.debug_names.put_word(member);
        self.debug_names.put_str(name);
    }

    // --- Decorations ------------------------------------------------------

    pub fn decorate(&mut self, id: Word, decoration: spirv::Decoration) {
        self.decorate_with_args(id, decoration, &[]);
    }

    pub fn decorate_with_args(&mut self, id: Word, decoration: spirv::Decoration, args: &[u32]) {
        self.annotations.put_ins(Op::Decorate, 3 + args.len() as u16);
        self.annotations.put_word(id);
        self.annotations.put_word(decoration as u32);
        self.annotations.put_words(args);
    }

    pub fn decorate_array_stride(&mut self, id: Word, stride: u32) {
        self.decorate_with_args(id, spirv::Decoration::ArrayStride, &[stride]);
    }

    pub fn decorate_block(&mut self, id: Word) {
        self.decorate(id, spirv::Decoration::Block);
    }

    pub fn decorate_buffer_block(&mut self, id: Word) {
        self.decorate(id, spirv::Decoration::BufferBlock);
    }

    pub fn decorate_builtin(&mut self, id: Word, builtin: spirv::BuiltIn) {
        self.decorate_with_args(id, spirv::Decoration::BuiltIn, &[builtin as u32]);
    }

    pub fn decorate_location(&mut self, id: Word, location: u32) {
        self.decorate_with_args(id, spirv::Decoration::Location, &[location]);
    }

    pub fn decorate_component(&mut self, id: Word, component: u32) {
        self.decorate_with_args(id, spirv::Decoration::Component, &[component]);
    }

    pub fn decorate_descriptor_set(&mut self, id: Word, set: u32) {
        self.decorate_with_args(id, spirv::Decoration::DescriptorSet, &[set]);
    }

    pub fn decorate_binding(&mut self, id: Word, binding: u32) {
        self.decorate_with_args(id, spirv::Decoration::Binding, &[binding]);
    }

    pub fn member_decorate_builtin(&mut self, struct_id: Word, member: u32, builtin: spirv::BuiltIn) {
        self.member_decorate_with_args(
            struct_id,
            member,
            spirv::Decoration::BuiltIn,
            &[builtin as u32],
        );
    }

    pub fn member_decorate_offset(&mut self, struct_id: Word, member: u32, offset: u32) {
        self.member_decorate_with_args(struct_id, member, spirv::Decoration::Offset, &[offset]);
    }

    pub fn member_decorate_with_args(
        &mut self,
        struct_id: Word,
        member: u32,
        decoration: spirv::Decoration,
        args: &[u32],
    ) {
        self.annotations
            .put_ins(Op::MemberDecorate, 4 + args.len() as u16);
        self.annotations.put_word(struct_id);
        self.annotations.put_word(member);
        self.annotations.put_word(decoration as u32);
        self.annotations.put_words(args);
    }

    // --- Types ------------------------------------------------------------

    /// Defines a type, reusing a previous definition with identical opcode
    /// and arguments if one exists.
    fn def_type(&mut self, op: Op, args: &[Word]) -> Word {
        // Result ids of type definitions are stored as argument 1; scan the
        // emitted section for a structural match.
        for ins in self.type_const_defs.instructions() {
            if ins.is(op) && ins.len() == 2 + args.len() && &ins.args()[1..] == args {
                return ins.arg(1);
            }
        }
        let id = self.allocate_id();
        self.type_const_defs.put_ins(op, 2 + args.len() as u16);
        self.type_const_defs.put_word(id);
        self.type_const_defs.put_words(args);
        id
    }

    /// Defines a type unconditionally, bypassing dedup. Needed for struct
    /// types that carry member decorations: two block structs with the same
    /// members must stay distinct.
    fn def_type_unique(&mut self, op: Op, args: &[Word]) -> Word {
        let id = self.allocate_id();
        self.type_const_defs.put_ins(op, 2 + args.len() as u16);
        self.type_const_defs.put_word(id);
        self.type_const_defs.put_words(args);
        id
    }

    pub fn def_void_type(&mut self) -> Word {
        self.def_type(Op::TypeVoid, &[])
    }

    pub fn def_bool_type(&mut self) -> Word {
        self.def_type(Op::TypeBool, &[])
    }

    pub fn def_int_type(&mut self, width: u32, signed: u32) -> Word {
        self.def_type(Op::TypeInt, &[width, signed])
    }

    pub fn def_float_type(&mut self, width: u32) -> Word {
        self.def_type(Op::TypeFloat, &[width])
    }

    pub fn def_vector_type(&mut self, component_type: Word, count: u32) -> Word {
        self.def_type(Op::TypeVector, &[component_type, count])
    }

    pub fn def_matrix_type(&mut self, column_type: Word, count: u32) -> Word {
        self.def_type(Op::TypeMatrix, &[column_type, count])
    }

    pub fn def_array_type(&mut self, element_type: Word, length_const: Word) -> Word {
        self.def_type(Op::TypeArray, &[element_type, length_const])
    }

    /// Array type exempt from dedup, for arrays that will be decorated with
    /// a stride.
    pub fn def_array_type_unique(&mut self, element_type: Word, length_const: Word) -> Word {
        self.def_type_unique(Op::TypeArray, &[element_type, length_const])
    }

    pub fn def_runtime_array_type(&mut self, element_type: Word) -> Word {
        self.def_type(Op::TypeRuntimeArray, &[element_type])
    }

    pub fn def_runtime_array_type_unique(&mut self, element_type: Word) -> Word {
        self.def_type_unique(Op::TypeRuntimeArray, &[element_type])
    }

    pub fn def_function_type(&mut self, return_type: Word, arg_types: &[Word]) -> Word {
        let mut args = Vec::with_capacity(1 + arg_types.len());
        args.push(return_type);
        args.extend_from_slice(arg_types);
        self.def_type(Op::TypeFunction, &args)
    }

    pub fn def_struct_type(&mut self, members: &[Word]) -> Word {
        self.def_type(Op::TypeStruct, members)
    }

    /// Struct type exempt from dedup, for decorated (block) structs.
    pub fn def_struct_type_unique(&mut self, members: &[Word]) -> Word {
        self.def_type_unique(Op::TypeStruct, members)
    }

    pub fn def_pointer_type(&mut self, pointee: Word, storage_class: spirv::StorageClass) -> Word {
        self.def_type(Op::TypePointer, &[storage_class as u32, pointee])
    }

    pub fn def_sampler_type(&mut self) -> Word {
        self.def_type(Op::TypeSampler, &[])
    }

    #[allow(clippy::too_many_arguments)]
    pub fn def_image_type(
        &mut self,
        sampled_type: Word,
        dim: spirv::Dim,
        depth: u32,
        arrayed: u32,
        multisampled: u32,
        sampled: u32,
        format: spirv::ImageFormat,
    ) -> Word {
        self.def_type(
            Op::TypeImage,
            &[
                sampled_type,
                dim as u32,
                depth,
                arrayed,
                multisampled,
                sampled,
                format as u32,
            ],
        )
    }

    pub fn def_sampled_image_type(&mut self, image_type: Word) -> Word {
        self.def_type(Op::TypeSampledImage, &[image_type])
    }

    // --- Constants --------------------------------------------------------

    /// Defines a constant, reusing an identical prior definition. Late
    /// constants are never candidates for reuse.
    fn def_const(&mut self, op: Op, type_id: Word, args: &[Word]) -> Word {
        for ins in self.type_const_defs.instructions() {
            if ins.is(op)
                && ins.len() == 3 + args.len()
                && ins.arg(1) == type_id
                && &ins.args()[2..] == args
            {
                let id = ins.arg(2);
                if !self.late_consts.contains(&id) {
                    return id;
                }
            }
        }
        let id = self.allocate_id();
        self.type_const_defs.put_ins(op, 3 + args.len() as u16);
        self.type_const_defs.put_word(type_id);
        self.type_const_defs.put_word(id);
        self.type_const_defs.put_words(args);
        id
    }

    pub fn const_bool(&mut self, value: bool) -> Word {
        let type_id = self.def_bool_type();
        let op = if value {
            Op::ConstantTrue
        } else {
            Op::ConstantFalse
        };
        self.def_const(op, type_id, &[])
    }

    pub fn const_u32(&mut self, value: u32) -> Word {
        let type_id = self.def_int_type(32, 0);
        self.def_const(Op::Constant, type_id, &[value])
    }

    pub fn const_i32(&mut self, value: i32) -> Word {
        let type_id = self.def_int_type(32, 1);
        self.def_const(Op::Constant, type_id, &[value as u32])
    }

    pub fn const_u64(&mut self, value: u64) -> Word {
        let type_id = self.def_int_type(64, 0);
        self.def_const(Op::Constant, type_id, &[value as u32, (value >> 32) as u32])
    }

    pub fn const_i64(&mut self, value: i64) -> Word {
        let type_id = self.def_int_type(64, 1);
        let bits = value as u64;
        self.def_const(Op::Constant, type_id, &[bits as u32, (bits >> 32) as u32])
    }

    pub fn const_f32(&mut self, value: f32) -> Word {
        let type_id = self.def_float_type(32);
        self.def_const(Op::Constant, type_id, &[value.to_bits()])
    }

    pub fn const_f64(&mut self, value: f64) -> Word {
        let type_id = self.def_float_type(64);
        let bits = value.to_bits();
        self.def_const(Op::Constant, type_id, &[bits as u32, (bits >> 32) as u32])
    }

    pub fn const_composite(&mut self, type_id: Word, constituents: &[Word]) -> Word {
        self.def_const(Op::ConstantComposite, type_id, constituents)
    }

    fn const_replicant(&mut self, scalar_const: Word, scalar_type: Word, count: u32) -> Word {
        if count <= 1 {
            return scalar_const;
        }
        let vec_type = self.def_vector_type(scalar_type, count);
        let parts = [scalar_const; 4];
        self.const_composite(vec_type, &parts[..count as usize])
    }

    /// Vector constant with `value` replicated into `count` lanes; a plain
    /// scalar constant when `count` is 1.
    pub fn const_f32_replicant(&mut self, value: f32, count: u32) -> Word {
        let scalar_const = self.const_f32(value);
        let scalar_type = self.def_float_type(32);
        self.const_replicant(scalar_const, scalar_type, count)
    }

    pub fn const_u32_replicant(&mut self, value: u32, count: u32) -> Word {
        let scalar_const = self.const_u32(value);
        let scalar_type = self.def_int_type(32, 0);
        self.const_replicant(scalar_const, scalar_type, count)
    }

    pub fn const_i32_replicant(&mut self, value: i32, count: u32) -> Word {
        let scalar_const = self.const_i32(value);
        let scalar_type = self.def_int_type(32, 1);
        self.const_replicant(scalar_const, scalar_type, count)
    }

    pub fn const_undef(&mut self, type_id: Word) -> Word {
        self.def_const(Op::Undef, type_id, &[])
    }

    /// Allocates a 32-bit constant whose value is not known yet. The
    /// placeholder is emitted with literal 0 and excluded from dedup;
    /// [`set_late_const`](Module::set_late_const) patches it later.
    pub fn late_const_u32(&mut self, type_id: Word) -> Word {
        let id = self.allocate_id();
        self.late_consts.insert(id);
        self.type_const_defs.put_ins(Op::Constant, 4);
        self.type_const_defs.put_word(type_id);
        self.type_const_defs.put_word(id);
        self.type_const_defs.put_word(0);
        id
    }

    /// Overwrites the literal argument(s) of a late constant.
    pub fn set_late_const(&mut self, const_id: Word, args: &[u32]) {
        let mut target = None;
        for ins in self.type_const_defs.instructions() {
            if (ins.is(Op::Constant) || ins.is(Op::ConstantComposite)) && ins.arg(2) == const_id {
                target = Some((ins.offset(), ins.len()));
                break;
            }
        }
        if let Some((offset, len)) = target {
            debug_assert_eq!(len, 3 + args.len());
            for (i, &arg) in args.iter().enumerate() {
                self.type_const_defs.set_word(offset + 3 + i, arg);
            }
        }
    }

    // --- Variables and functions ------------------------------------------

    /// Declares a variable. Function-storage variables are emitted into the
    /// current function's code, everything else into the globals section.
    pub fn new_var(&mut self, pointer_type: Word, storage_class: spirv::StorageClass) -> Word {
        let id = self.allocate_id();
        let buf = if storage_class == spirv::StorageClass::Function {
            &mut self.code
        } else {
            &mut self.variables
        };
        buf.put_ins(Op::Variable, 4);
        buf.put_word(pointer_type);
        buf.put_word(id);
        buf.put_word(storage_class as u32);
        id
    }

    pub fn new_var_init(
        &mut self,
        pointer_type: Word,
        storage_class: spirv::StorageClass,
        initializer: Word,
    ) -> Word {
        let id = self.allocate_id();
        let buf = if storage_class == spirv::StorageClass::Function {
            &mut self.code
        } else {
            &mut self.variables
        };
        buf.put_ins(Op::Variable, 5);
        buf.put_word(pointer_type);
        buf.put_word(id);
        buf.put_word(storage_class as u32);
        buf.put_word(initializer);
        id
    }

    pub fn function_begin(
        &mut self,
        return_type: Word,
        function_id: Word,
        function_type: Word,
        control: spirv::FunctionControl,
    ) {
        self.code.put_ins(Op::Function, 5);
        self.code.put_word(return_type);
        self.code.put_word(function_id);
        self.code.put_word(control.bits());
        self.code.put_word(function_type);
    }

    pub fn function_parameter(&mut self, parameter_type: Word) -> Word {
        let id = self.allocate_id();
        self.code.put_ins(Op::FunctionParameter, 3);
        self.code.put_word(parameter_type);
        self.code.put_word(id);
        id
    }

    pub fn function_end(&mut self) {
        self.code.put_ins(Op::FunctionEnd, 1);
    }

    // --- Instruction emission helpers -------------------------------------

    /// Emits `op` with a result type and fresh result id followed by `args`.
    fn op_result(&mut self, op: Op, result_type: Word, args: &[Word]) -> Word {
        let id = self.allocate_id();
        self.code.put_ins(op, 3 + args.len() as u16);
        self.code.put_word(result_type);
        self.code.put_word(id);
        self.code.put_words(args);
        id
    }

    /// Emits `op` with no result.
    fn op_plain(&mut self, op: Op, args: &[Word]) {
        self.code.put_ins(op, 1 + args.len() as u16);
        self.code.put_words(args);
    }

    /// Emits a GLSL.std.450 extended instruction.
    pub fn op_glsl_ext(&mut self, result_type: Word, ext_op: spirv::GLOp, args: &[Word]) -> Word {
        let id = self.allocate_id();
        self.code.put_ins(Op::ExtInst, 5 + args.len() as u16);
        self.code.put_word(result_type);
        self.code.put_word(id);
        self.code.put_word(self.glsl450);
        self.code.put_word(ext_op as u32);
        self.code.put_words(args);
        id
    }

    // --- Memory and composites --------------------------------------------

    pub fn op_access_chain(&mut self, ptr_type: Word, base: Word, indices: &[Word]) -> Word {
        let mut args = Vec::with_capacity(1 + indices.len());
        args.push(base);
        args.extend_from_slice(indices);
        self.op_result(Op::AccessChain, ptr_type, &args)
    }

    pub fn op_load(&mut self, result_type: Word, pointer: Word) -> Word {
        self.op_result(Op::Load, result_type, &[pointer])
    }

    pub fn op_store(&mut self, pointer: Word, value: Word) {
        self.op_plain(Op::Store, &[pointer, value]);
    }

    pub fn op_array_length(&mut self, result_type: Word, structure: Word, member: u32) -> Word {
        self.op_result(Op::ArrayLength, result_type, &[structure, member])
    }

    pub fn op_composite_construct(&mut self, result_type: Word, constituents: &[Word]) -> Word {
        self.op_result(Op::CompositeConstruct, result_type, constituents)
    }

    pub fn op_composite_extract(
        &mut self,
        result_type: Word,
        composite: Word,
        indices: &[u32],
    ) -> Word {
        let mut args = Vec::with_capacity(1 + indices.len());
        args.push(composite);
        args.extend_from_slice(indices);
        self.op_result(Op::CompositeExtract, result_type, &args)
    }

    pub fn op_composite_insert(
        &mut self,
        result_type: Word,
        object: Word,
        composite: Word,
        indices: &[u32],
    ) -> Word {
        let mut args = Vec::with_capacity(2 + indices.len());
        args.push(object);
        args.push(composite);
        args.extend_from_slice(indices);
        self.op_result(Op::CompositeInsert, result_type, &args)
    }

    pub fn op_vector_shuffle(
        &mut self,
        result_type: Word,
        vector_1: Word,
        vector_2: Word,
        components: &[u32],
    ) -> Word {
        let mut args = Vec::with_capacity(2 + components.len());
        args.push(vector_1);
        args.push(vector_2);
        args.extend_from_slice(components);
        self.op_result(Op::VectorShuffle, result_type, &args)
    }

    pub fn op_vector_extract_dynamic(
        &mut self,
        result_type: Word,
        vector: Word,
        index: Word,
    ) -> Word {
        self.op_result(Op::VectorExtractDynamic, result_type, &[vector, index])
    }

    pub fn op_select(
        &mut self,
        result_type: Word,
        condition: Word,
        if_true: Word,
        if_false: Word,
    ) -> Word {
        self.op_result(Op::Select, result_type, &[condition, if_true, if_false])
    }

    pub fn op_bitcast(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::Bitcast, result_type, &[operand])
    }

    // --- Arithmetic -------------------------------------------------------

    pub fn op_iadd(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::IAdd, result_type, &[a, b])
    }

    pub fn op_isub(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::ISub, result_type, &[a, b])
    }

    pub fn op_imul(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::IMul, result_type, &[a, b])
    }

    pub fn op_sdiv(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::SDiv, result_type, &[a, b])
    }

    pub fn op_udiv(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::UDiv, result_type, &[a, b])
    }

    pub fn op_umod(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::UMod, result_type, &[a, b])
    }

    pub fn op_fadd(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::FAdd, result_type, &[a, b])
    }

    pub fn op_fsub(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::FSub, result_type, &[a, b])
    }

    pub fn op_fmul(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::FMul, result_type, &[a, b])
    }

    pub fn op_fdiv(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::FDiv, result_type, &[a, b])
    }

    pub fn op_snegate(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::SNegate, result_type, &[operand])
    }

    pub fn op_fnegate(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::FNegate, result_type, &[operand])
    }

    pub fn op_dot(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::Dot, result_type, &[a, b])
    }

    /// `result_type` must be a struct of (low, high) halves.
    pub fn op_umul_extended(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::UMulExtended, result_type, &[a, b])
    }

    pub fn op_smul_extended(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::SMulExtended, result_type, &[a, b])
    }

    // --- Bit manipulation -------------------------------------------------

    pub fn op_not(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::Not, result_type, &[operand])
    }

    pub fn op_bitwise_and(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::BitwiseAnd, result_type, &[a, b])
    }

    pub fn op_bitwise_or(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::BitwiseOr, result_type, &[a, b])
    }

    pub fn op_bitwise_xor(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::BitwiseXor, result_type, &[a, b])
    }

    pub fn op_shift_left_logical(&mut self, result_type: Word, base: Word, shift: Word) -> Word {
        self.op_result(Op::ShiftLeftLogical, result_type, &[base, shift])
    }

    pub fn op_shift_right_logical(&mut self, result_type: Word, base: Word, shift: Word) -> Word {
        self.op_result(Op::ShiftRightLogical, result_type, &[base, shift])
    }

    pub fn op_shift_right_arithmetic(
        &mut self,
        result_type: Word,
        base: Word,
        shift: Word,
    ) -> Word {
        self.op_result(Op::ShiftRightArithmetic, result_type, &[base, shift])
    }

    pub fn op_bit_count(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::BitCount, result_type, &[operand])
    }

    pub fn op_bit_reverse(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::BitReverse, result_type, &[operand])
    }

    pub fn op_bit_field_insert(
        &mut self,
        result_type: Word,
        base: Word,
        insert: Word,
        offset: Word,
        count: Word,
    ) -> Word {
        self.op_result(Op::BitFieldInsert, result_type, &[base, insert, offset, count])
    }

    pub fn op_bit_field_s_extract(
        &mut self,
        result_type: Word,
        base: Word,
        offset: Word,
        count: Word,
    ) -> Word {
        self.op_result(Op::BitFieldSExtract, result_type, &[base, offset, count])
    }

    pub fn op_bit_field_u_extract(
        &mut self,
        result_type: Word,
        base: Word,
        offset: Word,
        count: Word,
    ) -> Word {
        self.op_result(Op::BitFieldUExtract, result_type, &[base, offset, count])
    }

    pub fn op_find_i_lsb(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::FindILsb, &[operand])
    }

    pub fn op_find_s_msb(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::FindSMsb, &[operand])
    }

    pub fn op_find_u_msb(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::FindUMsb, &[operand])
    }

    // --- Conversions ------------------------------------------------------

    pub fn op_convert_f_to_s(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::ConvertFToS, result_type, &[operand])
    }

    pub fn op_convert_f_to_u(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::ConvertFToU, result_type, &[operand])
    }

    pub fn op_convert_s_to_f(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::ConvertSToF, result_type, &[operand])
    }

    pub fn op_convert_u_to_f(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::ConvertUToF, result_type, &[operand])
    }

    pub fn op_pack_half_2x16(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::PackHalf2x16, &[operand])
    }

    pub fn op_unpack_half_2x16(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::UnpackHalf2x16, &[operand])
    }

    // --- GLSL.std.450 math ------------------------------------------------

    pub fn op_fabs(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::FAbs, &[operand])
    }

    pub fn op_sabs(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::SAbs, &[operand])
    }

    pub fn op_fmax(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::FMax, &[a, b])
    }

    pub fn op_fmin(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::FMin, &[a, b])
    }

    pub fn op_smax(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::SMax, &[a, b])
    }

    pub fn op_smin(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::SMin, &[a, b])
    }

    pub fn op_umax(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::UMax, &[a, b])
    }

    pub fn op_umin(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::UMin, &[a, b])
    }

    pub fn op_fclamp(&mut self, result_type: Word, x: Word, lo: Word, hi: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::FClamp, &[x, lo, hi])
    }

    pub fn op_ffma(&mut self, result_type: Word, a: Word, b: Word, c: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Fma, &[a, b, c])
    }

    pub fn op_sqrt(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Sqrt, &[operand])
    }

    pub fn op_inverse_sqrt(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::InverseSqrt, &[operand])
    }

    pub fn op_sin(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Sin, &[operand])
    }

    pub fn op_cos(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Cos, &[operand])
    }

    pub fn op_exp2(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Exp2, &[operand])
    }

    pub fn op_log2(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Log2, &[operand])
    }

    pub fn op_fract(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Fract, &[operand])
    }

    pub fn op_round_even(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::RoundEven, &[operand])
    }

    pub fn op_ceil(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Ceil, &[operand])
    }

    pub fn op_floor(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Floor, &[operand])
    }

    pub fn op_trunc(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_glsl_ext(result_type, spirv::GLOp::Trunc, &[operand])
    }

    // --- Comparisons ------------------------------------------------------

    pub fn op_ieq(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::IEqual, result_type, &[a, b])
    }

    pub fn op_ine(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::INotEqual, result_type, &[a, b])
    }

    pub fn op_slt(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::SLessThan, result_type, &[a, b])
    }

    pub fn op_sge(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::SGreaterThanEqual, result_type, &[a, b])
    }

    pub fn op_ult(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::ULessThan, result_type, &[a, b])
    }

    pub fn op_uge(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::UGreaterThanEqual, result_type, &[a, b])
    }

    pub fn op_ford_eq(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::FOrdEqual, result_type, &[a, b])
    }

    pub fn op_ford_ne(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::FOrdNotEqual, result_type, &[a, b])
    }

    pub fn op_ford_lt(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::FOrdLessThan, result_type, &[a, b])
    }

    pub fn op_ford_ge(&mut self, result_type: Word, a: Word, b: Word) -> Word {
        self.op_result(Op::FOrdGreaterThanEqual, result_type, &[a, b])
    }

    // --- Derivatives ------------------------------------------------------

    pub fn op_dpdx(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::DPdx, result_type, &[operand])
    }

    pub fn op_dpdy(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::DPdy, result_type, &[operand])
    }

    pub fn op_dpdx_coarse(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::DPdxCoarse, result_type, &[operand])
    }

    pub fn op_dpdy_coarse(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::DPdyCoarse, result_type, &[operand])
    }

    pub fn op_dpdx_fine(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::DPdxFine, result_type, &[operand])
    }

    pub fn op_dpdy_fine(&mut self, result_type: Word, operand: Word) -> Word {
        self.op_result(Op::DPdyFine, result_type, &[operand])
    }

    // --- Images -----------------------------------------------------------

    pub fn op_sampled_image(&mut self, result_type: Word, image: Word, sampler: Word) -> Word {
        self.op_result(Op::SampledImage, result_type, &[image, sampler])
    }

    pub fn op_image(&mut self, result_type: Word, sampled_image: Word) -> Word {
        self.op_result(Op::Image, result_type, &[sampled_image])
    }

    fn op_image_with_operands(
        &mut self,
        op: Op,
        result_type: Word,
        args: &[Word],
        operands: &ImageOperands,
    ) -> Word {
        let id = self.allocate_id();
        self.code
            .put_ins(op, 3 + args.len() as u16 + operands.word_count());
        self.code.put_word(result_type);
        self.code.put_word(id);
        self.code.put_words(args);
        operands.put(&mut self.code);
        id
    }

    pub fn op_image_sample_implicit_lod(
        &mut self,
        result_type: Word,
        sampled_image: Word,
        coordinate: Word,
        operands: &ImageOperands,
    ) -> Word {
        self.op_image_with_operands(
            Op::ImageSampleImplicitLod,
            result_type,
            &[sampled_image, coordinate],
            operands,
        )
    }

    pub fn op_image_sample_explicit_lod(
        &mut self,
        result_type: Word,
        sampled_image: Word,
        coordinate: Word,
        operands: &ImageOperands,
    ) -> Word {
        self.op_image_with_operands(
            Op::ImageSampleExplicitLod,
            result_type,
            &[sampled_image, coordinate],
            operands,
        )
    }

    pub fn op_image_sample_dref_implicit_lod(
        &mut self,
        result_type: Word,
        sampled_image: Word,
        coordinate: Word,
        reference: Word,
        operands: &ImageOperands,
    ) -> Word {
        self.op_image_with_operands(
            Op::ImageSampleDrefImplicitLod,
            result_type,
            &[sampled_image, coordinate, reference],
            operands,
        )
    }

    pub fn op_image_sample_dref_explicit_lod(
        &mut self,
        result_type: Word,
        sampled_image: Word,
        coordinate: Word,
        reference: Word,
        operands: &ImageOperands,
    ) -> Word {
        self.op_image_with_operands(
            Op::ImageSampleDrefExplicitLod,
            result_type,
            &[sampled_image, coordinate, reference],
            operands,
        )
    }

    pub fn op_image_fetch(
        &mut self,
        result_type: Word,
        image: Word,
        coordinate: Word,
        operands: &ImageOperands,
    ) -> Word {
        self.op_image_with_operands(Op::ImageFetch, result_type, &[image, coordinate], operands)
    }

    pub fn op_image_gather(
        &mut self,
        result_type: Word,
        sampled_image: Word,
        coordinate: Word,
        component: Word,
        operands: &ImageOperands,
    ) -> Word {
        self.op_image_with_operands(
            Op::ImageGather,
            result_type,
            &[sampled_image, coordinate, component],
            operands,
        )
    }

    pub fn op_image_dref_gather(
        &mut self,
        result_type: Word,
        sampled_image: Word,
        coordinate: Word,
        reference: Word,
        operands: &ImageOperands,
    ) -> Word {
        self.op_image_with_operands(
            Op::ImageDrefGather,
            result_type,
            &[sampled_image, coordinate, reference],
            operands,
        )
    }

    pub fn op_image_read(
        &mut self,
        result_type: Word,
        image: Word,
        coordinate: Word,
        operands: &ImageOperands,
    ) -> Word {
        self.op_image_with_operands(Op::ImageRead, result_type, &[image, coordinate], operands)
    }

    pub fn op_image_write(
        &mut self,
        image: Word,
        coordinate: Word,
        texel: Word,
        operands: &ImageOperands,
    ) {
        self.code
            .put_ins(Op::ImageWrite, 4 + operands.word_count());
        self.code.put_word(image);
        self.code.put_word(coordinate);
        self.code.put_word(texel);
        operands.put(&mut self.code);
    }

    pub fn op_image_texel_pointer(
        &mut self,
        result_ptr_type: Word,
        image_var: Word,
        coordinate: Word,
        sample: Word,
    ) -> Word {
        self.op_result(
            Op::ImageTexelPointer,
            result_ptr_type,
            &[image_var, coordinate, sample],
        )
    }

    pub fn op_image_query_size(&mut self, result_type: Word, image: Word) -> Word {
        self.op_result(Op::ImageQuerySize, result_type, &[image])
    }

    pub fn op_image_query_size_lod(&mut self, result_type: Word, image: Word, lod: Word) -> Word {
        self.op_result(Op::ImageQuerySizeLod, result_type, &[image, lod])
    }

    pub fn op_image_query_levels(&mut self, result_type: Word, image: Word) -> Word {
        self.op_result(Op::ImageQueryLevels, result_type, &[image])
    }

    pub fn op_image_query_lod(&mut self, result_type: Word, sampled_image: Word, coord: Word) -> Word {
        self.op_result(Op::ImageQueryLod, result_type, &[sampled_image, coord])
    }

    pub fn op_image_query_samples(&mut self, result_type: Word, image: Word) -> Word {
        self.op_result(Op::ImageQuerySamples, result_type, &[image])
    }

    // --- Atomics ----------------------------------------------------------

    fn op_atomic(
        &mut self,
        op: Op,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        extra: &[Word],
    ) -> Word {
        let mut args = Vec::with_capacity(3 + extra.len());
        args.push(pointer);
        args.push(scope);
        args.push(semantics);
        args.extend_from_slice(extra);
        self.op_result(op, result_type, &args)
    }

    pub fn op_atomic_load(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicLoad, result_type, pointer, scope, semantics, &[])
    }

    pub fn op_atomic_store(&mut self, pointer: Word, scope: Word, semantics: Word, value: Word) {
        self.op_plain(Op::AtomicStore, &[pointer, scope, semantics, value]);
    }

    pub fn op_atomic_exchange(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(
            Op::AtomicExchange,
            result_type,
            pointer,
            scope,
            semantics,
            &[value],
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn op_atomic_compare_exchange(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics_equal: Word,
        semantics_unequal: Word,
        value: Word,
        comparator: Word,
    ) -> Word {
        self.op_atomic(
            Op::AtomicCompareExchange,
            result_type,
            pointer,
            scope,
            semantics_equal,
            &[semantics_unequal, value, comparator],
        )
    }

    pub fn op_atomic_iincrement(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
    ) -> Word {
        self.op_atomic(
            Op::AtomicIIncrement,
            result_type,
            pointer,
            scope,
            semantics,
            &[],
        )
    }

    pub fn op_atomic_idecrement(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
    ) -> Word {
        self.op_atomic(
            Op::AtomicIDecrement,
            result_type,
            pointer,
            scope,
            semantics,
            &[],
        )
    }

    pub fn op_atomic_iadd(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicIAdd, result_type, pointer, scope, semantics, &[value])
    }

    pub fn op_atomic_smin(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicSMin, result_type, pointer, scope, semantics, &[value])
    }

    pub fn op_atomic_smax(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicSMax, result_type, pointer, scope, semantics, &[value])
    }

    pub fn op_atomic_umin(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicUMin, result_type, pointer, scope, semantics, &[value])
    }

    pub fn op_atomic_umax(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicUMax, result_type, pointer, scope, semantics, &[value])
    }

    pub fn op_atomic_and(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicAnd, result_type, pointer, scope, semantics, &[value])
    }

    pub fn op_atomic_or(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicOr, result_type, pointer, scope, semantics, &[value])
    }

    pub fn op_atomic_xor(
        &mut self,
        result_type: Word,
        pointer: Word,
        scope: Word,
        semantics: Word,
        value: Word,
    ) -> Word {
        self.op_atomic(Op::AtomicXor, result_type, pointer, scope, semantics, &[value])
    }

    // --- Barriers ---------------------------------------------------------

    pub fn op_control_barrier(&mut self, execution: Word, memory: Word, semantics: Word) {
        self.op_plain(Op::ControlBarrier, &[execution, memory, semantics]);
    }

    pub fn op_memory_barrier(&mut self, memory: Word, semantics: Word) {
        self.op_plain(Op::MemoryBarrier, &[memory, semantics]);
    }

    // --- Control flow -----------------------------------------------------

    pub fn op_label(&mut self, label_id: Word) {
        self.op_plain(Op::Label, &[label_id]);
    }

    pub fn op_selection_merge(&mut self, merge_block: Word, control: spirv::SelectionControl) {
        self.op_plain(Op::SelectionMerge, &[merge_block, control.bits()]);
    }

    pub fn op_loop_merge(
        &mut self,
        merge_block: Word,
        continue_target: Word,
        control: spirv::LoopControl,
    ) {
        self.op_plain(Op::LoopMerge, &[merge_block, continue_target, control.bits()]);
    }

    pub fn op_branch(&mut self, label: Word) {
        self.op_plain(Op::Branch, &[label]);
    }

    pub fn op_branch_conditional(&mut self, condition: Word, true_label: Word, false_label: Word) {
        self.op_plain(Op::BranchConditional, &[condition, true_label, false_label]);
    }

    pub fn op_switch(&mut self, selector: Word, default: Word, cases: &[SwitchCaseLabel]) {
        let words = switch_words(selector, default, cases);
        self.code.put_words(&words);
    }

    /// Current length of the function-code section; a position for
    /// [`Self::insert_switch`].
    pub fn code_insertion_point(&self) -> usize {
        self.code.len()
    }

    /// Inserts an `OpSelectionMerge` + `OpSwitch` pair at a position saved
    /// before the case blocks were emitted. DXBC only reveals the case
    /// labels after the switch instruction, so the branch is patched in
    /// once the matching `endswitch` arrives.
    pub fn insert_switch(
        &mut self,
        at: usize,
        selector: Word,
        merge_block: Word,
        default: Word,
        cases: &[SwitchCaseLabel],
    ) {
        let mut words = vec![
            (Op::SelectionMerge as u32) | (3 << 16),
            merge_block,
            spirv::SelectionControl::NONE.bits(),
        ];
        words.extend_from_slice(&switch_words(selector, default, cases));
        self.code.insert_words(at, &words);
    }

    pub fn op_function_call(
        &mut self,
        result_type: Word,
        function: Word,
        arguments: &[Word],
    ) -> Word {
        let mut args = Vec::with_capacity(1 + arguments.len());
        args.push(function);
        args.extend_from_slice(arguments);
        self.op_result(Op::FunctionCall, result_type, &args)
    }

    pub fn op_return(&mut self) {
        self.op_plain(Op::Return, &[]);
    }

    pub fn op_kill(&mut self) {
        self.op_plain(Op::Kill, &[]);
    }

    pub fn op_demote_to_helper_invocation(&mut self) {
        self.op_plain(Op::DemoteToHelperInvocationEXT, &[]);
    }

    pub fn op_emit_vertex(&mut self) {
        self.op_plain(Op::EmitVertex, &[]);
    }

    pub fn op_end_primitive(&mut self) {
        self.op_plain(Op::EndPrimitive, &[]);
    }

    pub fn op_emit_stream_vertex(&mut self, stream: Word) {
        self.op_plain(Op::EmitStreamVertex, &[stream]);
    }

    pub fn op_end_stream_primitive(&mut self, stream: Word) {
        self.op_plain(Op::EndStreamPrimitive, &[stream]);
    }
}
