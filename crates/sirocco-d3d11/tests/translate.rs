//! End-to-end translation tests: hand-assembled DXBC containers in,
//! SPIR-V word streams and binding lists out.

use sirocco_d3d11::sm4::opcode::*;
use sirocco_d3d11::{
    default_resource_slot, translate, BindingClass, BindingKind, ShaderStage, TranslateError,
    TranslateOptions, WriteMask,
};
use sirocco_dxbc::test_utils::{build_container, tokens_to_bytes};
use sirocco_dxbc::FourCC;

// --- token stream builders ------------------------------------------------

fn version_token(stage: u16, major: u8, minor: u8) -> u32 {
    ((stage as u32) << 16) | ((major as u32) << 4) | minor as u32
}

fn program(stage: u16, body: &[u32]) -> Vec<u32> {
    let mut tokens = vec![version_token(stage, 5, 0), 2 + body.len() as u32];
    tokens.extend_from_slice(body);
    tokens
}

fn opcode_token(opcode: Opcode, len: u32) -> u32 {
    (opcode as u32) | (len << OPCODE_LEN_SHIFT)
}

fn operand_token(
    ty: OperandType,
    num_components: u32,
    selection_mode: u32,
    component_sel: u32,
    index_dim: u32,
) -> u32 {
    ((ty as u32) << OPERAND_TYPE_SHIFT)
        | (num_components & OPERAND_NUM_COMPONENTS_MASK)
        | ((selection_mode & OPERAND_SELECTION_MODE_MASK) << OPERAND_SELECTION_MODE_SHIFT)
        | ((component_sel & OPERAND_COMPONENT_SELECTION_MASK)
            << OPERAND_COMPONENT_SELECTION_SHIFT)
        | ((index_dim & OPERAND_INDEX_DIMENSION_MASK) << OPERAND_INDEX_DIMENSION_SHIFT)
}

fn identity_swizzle_bits() -> u32 {
    0 | (1 << 2) | (2 << 4) | (3 << 6)
}

fn dst(ty: OperandType, index: u32, mask: WriteMask) -> Vec<u32> {
    vec![
        operand_token(ty, 2, OPERAND_SEL_MASK, mask.0 as u32, 1),
        index,
    ]
}

fn src(ty: OperandType, index: u32) -> Vec<u32> {
    vec![
        operand_token(ty, 2, OPERAND_SEL_SWIZZLE, identity_swizzle_bits(), 1),
        index,
    ]
}

fn src_swizzled(ty: OperandType, index: u32, swizzle: [u32; 4]) -> Vec<u32> {
    let bits = swizzle[0] | (swizzle[1] << 2) | (swizzle[2] << 4) | (swizzle[3] << 6);
    vec![operand_token(ty, 2, OPERAND_SEL_SWIZZLE, bits, 1), index]
}

fn src_no_components(ty: OperandType, index: u32) -> Vec<u32> {
    vec![operand_token(ty, 0, OPERAND_SEL_MASK, 0, 1), index]
}

fn imm_vec4(values: [f32; 4]) -> Vec<u32> {
    let mut out = vec![operand_token(
        OperandType::Imm32,
        2,
        OPERAND_SEL_SWIZZLE,
        identity_swizzle_bits(),
        0,
    )];
    out.extend(values.map(f32::to_bits));
    out
}

fn dcl_temps(count: u32) -> Vec<u32> {
    vec![opcode_token(Opcode::DclTemps, 2), count]
}

fn dcl_input(index: u32, mask: WriteMask) -> Vec<u32> {
    let mut out = vec![opcode_token(Opcode::DclInput, 3)];
    out.extend(dst(OperandType::Input, index, mask));
    out
}

fn dcl_input_ps(index: u32, mask: WriteMask, interpolation: u32) -> Vec<u32> {
    let mut out = vec![opcode_token(Opcode::DclInputPs, 3) | (interpolation << 11)];
    out.extend(dst(OperandType::Input, index, mask));
    out
}

fn dcl_output(index: u32, mask: WriteMask) -> Vec<u32> {
    let mut out = vec![opcode_token(Opcode::DclOutput, 3)];
    out.extend(dst(OperandType::Output, index, mask));
    out
}

fn dcl_output_siv(index: u32, mask: WriteMask, sv: SystemValue) -> Vec<u32> {
    let mut out = vec![opcode_token(Opcode::DclOutputSiv, 4)];
    out.extend(dst(OperandType::Output, index, mask));
    out.push(sv as u32);
    out
}

fn dcl_constant_buffer(index: u32, vec_count: u32) -> Vec<u32> {
    let mut out = vec![opcode_token(Opcode::DclConstantBuffer, 4)];
    let mut token = operand_token(OperandType::ConstantBuffer, 2, OPERAND_SEL_SWIZZLE, identity_swizzle_bits(), 2);
    token |= OPERAND_INDEX_REP_IMMEDIATE32 << OPERAND_INDEX1_REP_SHIFT;
    out.push(token);
    out.push(index);
    out.push(vec_count);
    out
}

fn dcl_sampler(index: u32) -> Vec<u32> {
    let mut out = vec![opcode_token(Opcode::DclSampler, 3)];
    out.extend(src_no_components(OperandType::Sampler, index));
    out
}

fn dcl_resource_texture2d(index: u32) -> Vec<u32> {
    let mut out =
        vec![opcode_token(Opcode::DclResource, 4) | ((ResourceDim::Texture2D as u32) << 11)];
    out.extend(src_no_components(OperandType::Resource, index));
    // Return type token: float in all four components.
    out.push(0x5555);
    out
}

fn ret() -> Vec<u32> {
    vec![opcode_token(Opcode::Ret, 1)]
}

/// Base-layout output signature chunk with one float4 SV_Target on
/// register 0.
fn ps_osgn_chunk() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_le_bytes()); // element count
    bytes.extend_from_slice(&8u32.to_le_bytes());
    let name_offset = 8 + 24u32;
    bytes.extend_from_slice(&name_offset.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // semantic index
    bytes.extend_from_slice(&0u32.to_le_bytes()); // system value
    bytes.extend_from_slice(&3u32.to_le_bytes()); // float32
    bytes.extend_from_slice(&0u32.to_le_bytes()); // register
    bytes.extend_from_slice(&0x0f0fu32.to_le_bytes());
    bytes.extend_from_slice(b"SV_Target\0");
    bytes
}

fn build_shader(stage: u16, body: &[u32], extra_chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    let tokens = program(stage, body);
    let shex = tokens_to_bytes(&tokens);
    let mut chunks: Vec<(FourCC, &[u8])> = Vec::new();
    chunks.extend_from_slice(extra_chunks);
    chunks.push((FourCC(*b"SHEX"), &shex));
    build_container(&chunks)
}

// --- SPIR-V inspection helpers --------------------------------------------

struct SpirvModule {
    header: Vec<u32>,
    instructions: Vec<(u32, Vec<u32>)>,
}

fn disassemble(words: &[u32]) -> SpirvModule {
    assert!(words.len() >= 5, "module too short");
    assert_eq!(words[0], 0x0723_0203, "bad SPIR-V magic");
    let header = words[..5].to_vec();
    let mut instructions = Vec::new();
    let mut i = 5;
    while i < words.len() {
        let opcode = words[i] & 0xffff;
        let len = (words[i] >> 16) as usize;
        assert!(len > 0, "zero-length instruction at {i}");
        assert!(i + len <= words.len(), "truncated instruction at {i}");
        instructions.push((opcode, words[i + 1..i + len].to_vec()));
        i += len;
    }
    SpirvModule {
        header,
        instructions,
    }
}

impl SpirvModule {
    fn count(&self, op: spirv::Op) -> usize {
        self.instructions
            .iter()
            .filter(|(opcode, _)| *opcode == op as u32)
            .count()
    }

    fn find_all(&self, op: spirv::Op) -> Vec<&Vec<u32>> {
        self.instructions
            .iter()
            .filter(|(opcode, _)| *opcode == op as u32)
            .map(|(_, args)| args)
            .collect()
    }

    fn has_const_u32(&self, value: u32) -> bool {
        // OpConstant args: type, result, literal...
        self.find_all(spirv::Op::Constant)
            .iter()
            .any(|args| args.len() == 3 && args[2] == value)
    }

    fn has_ext_inst(&self, glsl_op: spirv::GLOp) -> bool {
        // OpExtInst args: type, result, set, instruction, operands...
        self.find_all(spirv::Op::ExtInst)
            .iter()
            .any(|args| args[3] == glsl_op as u32)
    }

    fn entry_point(&self) -> &Vec<u32> {
        let entries = self.find_all(spirv::Op::EntryPoint);
        assert_eq!(entries.len(), 1, "expected exactly one entry point");
        entries[0]
    }

    /// Member index a builtin decoration is attached to, if any.
    fn builtin_member_index(&self, builtin: spirv::BuiltIn) -> Option<u32> {
        self.find_all(spirv::Op::MemberDecorate)
            .iter()
            .find(|args| {
                args[2] == spirv::Decoration::BuiltIn as u32 && args[3] == builtin as u32
            })
            .map(|args| args[1])
    }

    /// Literal of the `OpConstant` with the given result id.
    fn constant_literal(&self, id: u32) -> Option<u32> {
        self.find_all(spirv::Op::Constant)
            .iter()
            .find(|args| args.len() == 3 && args[1] == id)
            .map(|args| args[2])
    }

    /// True if some `OpStore` targets an access chain selecting
    /// `[member][element]` of a structure (the `gl_PerVertex` store shape).
    fn stores_to_member_element(&self, member: u32, element: u32) -> bool {
        let stored_pointers: Vec<u32> = self
            .find_all(spirv::Op::Store)
            .iter()
            .map(|args| args[0])
            .collect();
        self.find_all(spirv::Op::AccessChain).iter().any(|args| {
            // args: type, result, base, indices...
            args.len() == 5
                && self.constant_literal(args[3]) == Some(member)
                && self.constant_literal(args[4]) == Some(element)
                && stored_pointers.contains(&args[1])
        })
    }
}

fn translate_ok(bytes: &[u8]) -> sirocco_d3d11::TranslatedShader {
    translate(bytes, &TranslateOptions::default()).expect("translation should succeed")
}

// --- scenarios ------------------------------------------------------------

#[test]
fn passthrough_vertex_shader() {
    // dcl_input v0.xyzw
    // dcl_output_siv o0.xyzw, position
    // dcl_temps 1
    // mov o0.xyzw, v0.xyzw
    // ret
    let mut body = Vec::new();
    body.extend(dcl_input(0, WriteMask::XYZW));
    body.extend(dcl_output_siv(0, WriteMask::XYZW, SystemValue::Position));
    body.extend(dcl_temps(1));
    let mut mov = vec![opcode_token(Opcode::Mov, 5)];
    mov.extend(dst(OperandType::Output, 0, WriteMask::XYZW));
    mov.extend(src(OperandType::Input, 0));
    body.extend(mov);
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let shader = translate_ok(&bytes);

    assert_eq!(shader.stage, ShaderStage::Vertex);
    assert!(shader.bindings.is_empty());

    let module = disassemble(&shader.spirv);
    // Header: magic, version, generator, bound, 0.
    assert_eq!(module.header[1], 0x0001_0000);
    assert_eq!(module.header[4], 0);

    // Vertex execution model.
    let entry = module.entry_point();
    assert_eq!(entry[0], spirv::ExecutionModel::Vertex as u32);

    // The input is located at v0, and the per-vertex block carries the
    // builtins at their fixed member indices; the epilogue writes Position
    // through member 0.
    let locations = module.find_all(spirv::Op::Decorate);
    assert!(locations
        .iter()
        .any(|args| args[1] == spirv::Decoration::Location as u32 && args[2] == 0));
    assert_eq!(module.builtin_member_index(spirv::BuiltIn::Position), Some(0));
    assert_eq!(module.builtin_member_index(spirv::BuiltIn::PointSize), Some(1));
    assert_eq!(
        module.builtin_member_index(spirv::BuiltIn::CullDistance),
        Some(2)
    );
    assert_eq!(
        module.builtin_member_index(spirv::BuiltIn::ClipDistance),
        Some(3)
    );

    // mov o0, v0 plus the epilogue copy into gl_PerVertex.
    assert!(module.count(spirv::Op::Load) >= 2);
    assert!(module.count(spirv::Op::Store) >= 2);
    assert!(module.count(spirv::Op::FunctionCall) == 1);
    assert!(module.count(spirv::Op::Return) >= 2);

    // Entry point interface must list every Input/Output global.
    let variables = module.find_all(spirv::Op::Variable);
    let io_vars: Vec<u32> = variables
        .iter()
        .filter(|args| {
            args[2] == spirv::StorageClass::Input as u32
                || args[2] == spirv::StorageClass::Output as u32
        })
        .map(|args| args[1])
        .collect();
    let interface = &entry[2..];
    for var in io_vars {
        assert!(
            interface.contains(&var),
            "I/O variable {var} missing from the entry point interface"
        );
    }
}

#[test]
fn constant_buffer_lookup_pixel_shader() {
    // dcl_constantbuffer cb0[16]
    // dcl_output o0.xyzw
    // mov o0.xyzw, cb0[5].xyzw
    // ret
    let mut body = Vec::new();
    body.extend(dcl_constant_buffer(0, 16));
    body.extend(dcl_output(0, WriteMask::XYZW));

    let mut mov = vec![opcode_token(Opcode::Mov, 6)];
    mov.extend(dst(OperandType::Output, 0, WriteMask::XYZW));
    let mut cb = operand_token(
        OperandType::ConstantBuffer,
        2,
        OPERAND_SEL_SWIZZLE,
        identity_swizzle_bits(),
        2,
    );
    cb |= OPERAND_INDEX_REP_IMMEDIATE32 << OPERAND_INDEX1_REP_SHIFT;
    mov.push(cb);
    mov.push(0);
    mov.push(5);
    body.extend(mov);
    body.extend(ret());

    let osgn = ps_osgn_chunk();
    let bytes = build_shader(0, &body, &[(FourCC(*b"OSGN"), &osgn)]);
    let shader = translate_ok(&bytes);

    assert_eq!(shader.stage, ShaderStage::Pixel);
    assert_eq!(shader.bindings.len(), 1);
    assert_eq!(shader.bindings[0].kind, BindingKind::UniformBuffer);
    assert_eq!(
        shader.bindings[0].slot,
        default_resource_slot(ShaderStage::Pixel, BindingClass::ConstantBuffer, 0)
    );

    let module = disassemble(&shader.spirv);
    let entry = module.entry_point();
    assert_eq!(entry[0], spirv::ExecutionModel::Fragment as u32);

    // Uniform block plumbing: stride-16 array in a Block struct, bound to
    // descriptor set 0.
    let decorations = module.find_all(spirv::Op::Decorate);
    assert!(decorations.iter().any(|args| {
        args[1] == spirv::Decoration::ArrayStride as u32 && args[2] == 16
    }));
    assert!(decorations
        .iter()
        .any(|args| args[1] == spirv::Decoration::Block as u32));
    assert!(decorations.iter().any(|args| {
        args[1] == spirv::Decoration::DescriptorSet as u32 && args[2] == 0
    }));
    assert!(decorations.iter().any(|args| {
        args[1] == spirv::Decoration::Binding as u32 && args[2] == shader.bindings[0].slot
    }));

    // The load goes through member 0, element 5.
    assert!(module.count(spirv::Op::AccessChain) >= 1);
    assert!(module.has_const_u32(0));
    let constants = module.find_all(spirv::Op::Constant);
    assert!(constants
        .iter()
        .any(|args| args.len() == 3 && args[2] == 5));

    // Pixel shaders run with origin-upper-left.
    let modes = module.find_all(spirv::Op::ExecutionMode);
    assert!(modes
        .iter()
        .any(|args| args[1] == spirv::ExecutionMode::OriginUpperLeft as u32));
}

#[test]
fn texture_sample_pixel_shader() {
    // dcl_resource_texture2d t0
    // dcl_sampler s0
    // dcl_input_ps linear v0.xy
    // dcl_output o0.xyzw
    // sample o0.xyzw, v0.xyxx, t0.xyzw, s0
    // ret
    let mut body = Vec::new();
    body.extend(dcl_resource_texture2d(0));
    body.extend(dcl_sampler(0));
    body.extend(dcl_input_ps(
        0,
        WriteMask::XY,
        InterpolationMode::Linear as u32,
    ));
    body.extend(dcl_output(0, WriteMask::XYZW));

    let mut sample = vec![opcode_token(Opcode::Sample, 9)];
    sample.extend(dst(OperandType::Output, 0, WriteMask::XYZW));
    sample.extend(src_swizzled(OperandType::Input, 0, [0, 1, 0, 0]));
    sample.extend(src_no_components(OperandType::Resource, 0));
    sample.extend(src_no_components(OperandType::Sampler, 0));
    body.extend(sample);
    body.extend(ret());

    let osgn = ps_osgn_chunk();
    let bytes = build_shader(0, &body, &[(FourCC(*b"OSGN"), &osgn)]);
    let shader = translate_ok(&bytes);

    assert_eq!(shader.bindings.len(), 2);
    assert_eq!(shader.bindings[0].kind, BindingKind::SampledImage);
    assert_eq!(
        shader.bindings[0].slot,
        default_resource_slot(ShaderStage::Pixel, BindingClass::ShaderResource, 0)
    );
    assert_eq!(shader.bindings[1].kind, BindingKind::Sampler);
    assert_eq!(
        shader.bindings[1].slot,
        default_resource_slot(ShaderStage::Pixel, BindingClass::ImageSampler, 0)
    );

    let module = disassemble(&shader.spirv);
    assert_eq!(module.count(spirv::Op::TypeImage), 1);
    assert_eq!(module.count(spirv::Op::TypeSampler), 1);
    assert_eq!(module.count(spirv::Op::TypeSampledImage), 1);
    assert_eq!(module.count(spirv::Op::SampledImage), 1);
    assert_eq!(module.count(spirv::Op::ImageSampleImplicitLod), 1);
}

#[test]
fn saturated_add_clamps_result() {
    // dcl_temps 1
    // add_sat r0.xyz, r0.xyzx, r0.xyzx
    // ret
    let mut body = Vec::new();
    body.extend(dcl_temps(1));
    let mut add = vec![opcode_token(Opcode::Add, 7) | OPCODE_SATURATE_BIT];
    add.extend(dst(OperandType::Temp, 0, WriteMask::XYZ));
    add.extend(src(OperandType::Temp, 0));
    add.extend(src(OperandType::Temp, 0));
    body.extend(add);
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    assert_eq!(module.count(spirv::Op::FAdd), 1);
    assert!(module.has_ext_inst(spirv::GLOp::FClamp));

    // The clamp bounds are literal 0.0 and 1.0 constants.
    let constants = module.find_all(spirv::Op::Constant);
    assert!(constants
        .iter()
        .any(|args| args.len() == 3 && args[2] == 0f32.to_bits()));
    assert!(constants
        .iter()
        .any(|args| args.len() == 3 && args[2] == 1f32.to_bits()));

    // Partial write: the unwritten w lane forces a load-merge-store.
    assert!(module.count(spirv::Op::VectorShuffle) >= 1);
}

#[test]
fn if_else_emits_structured_selection() {
    // dcl_temps 1
    // if_nz r0.x
    //   mov o0.x, l(1.0)
    // else
    //   mov o0.x, l(0.0)
    // endif
    // ret
    let zero_test_nz = 1u32 << 18;

    let mut body = Vec::new();
    body.extend(dcl_temps(1));
    body.extend(dcl_output(0, WriteMask::X));

    let mut ifnz = vec![opcode_token(Opcode::If, 3) | zero_test_nz];
    ifnz.push(operand_token(OperandType::Temp, 2, OPERAND_SEL_SELECT1, 0, 1));
    ifnz.push(0);
    body.extend(ifnz);

    let mut mov = vec![opcode_token(Opcode::Mov, 8)];
    mov.extend(dst(OperandType::Output, 0, WriteMask::X));
    mov.extend(imm_vec4([1.0, 1.0, 1.0, 1.0]));
    body.extend(mov);

    body.push(opcode_token(Opcode::Else, 1));

    let mut mov = vec![opcode_token(Opcode::Mov, 8)];
    mov.extend(dst(OperandType::Output, 0, WriteMask::X));
    mov.extend(imm_vec4([0.0, 0.0, 0.0, 0.0]));
    body.extend(mov);

    body.push(opcode_token(Opcode::EndIf, 1));
    body.extend(ret());

    let osgn = ps_osgn_chunk();
    let bytes = build_shader(0, &body, &[(FourCC(*b"OSGN"), &osgn)]);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    assert_eq!(module.count(spirv::Op::SelectionMerge), 1);
    assert_eq!(module.count(spirv::Op::BranchConditional), 1);
    assert!(module.count(spirv::Op::Label) >= 3);
    assert!(module.count(spirv::Op::Store) >= 2);

    // The conditional branch targets distinct then/else labels.
    let branch = &module.find_all(spirv::Op::BranchConditional)[0];
    assert_ne!(branch[1], branch[2]);
}

#[test]
fn relative_constant_buffer_index_adds_offset() {
    // dcl_constantbuffer cb0[16]
    // dcl_temps 1
    // mov o0.xyzw, cb0[r0.y + 2].xyzw
    // ret
    let mut body = Vec::new();
    body.extend(dcl_constant_buffer(0, 16));
    body.extend(dcl_temps(1));
    body.extend(dcl_output(0, WriteMask::XYZW));

    let mut mov = vec![opcode_token(Opcode::Mov, 8)];
    mov.extend(dst(OperandType::Output, 0, WriteMask::XYZW));
    let mut cb = operand_token(
        OperandType::ConstantBuffer,
        2,
        OPERAND_SEL_SWIZZLE,
        identity_swizzle_bits(),
        2,
    );
    cb |= OPERAND_INDEX_REP_IMMEDIATE32_RELATIVE << OPERAND_INDEX1_REP_SHIFT;
    mov.push(cb);
    mov.push(0); // cb index
    mov.push(2); // element offset
    mov.push(operand_token(OperandType::Temp, 2, OPERAND_SEL_SELECT1, 1, 1));
    mov.push(0); // r0
    body.extend(mov);
    body.extend(ret());

    let osgn = ps_osgn_chunk();
    let bytes = build_shader(0, &body, &[(FourCC(*b"OSGN"), &osgn)]);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    // The dynamic element index is r0.y (bitcast to int) plus 2.
    assert!(module.count(spirv::Op::IAdd) >= 1);
    assert!(module.count(spirv::Op::Bitcast) >= 1);
    let constants = module.find_all(spirv::Op::Constant);
    assert!(constants
        .iter()
        .any(|args| args.len() == 3 && args[2] == 2));
    assert!(module.count(spirv::Op::AccessChain) >= 1);
}

/// Vertex shader writing a position and one distance output:
/// `dcl_output_siv o1.x, <sv>` followed by stores into both registers.
fn build_distance_output_shader(sv: SystemValue) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(dcl_output_siv(0, WriteMask::XYZW, SystemValue::Position));
    body.extend(dcl_output_siv(1, WriteMask::X, sv));

    let mut mov = vec![opcode_token(Opcode::Mov, 8)];
    mov.extend(dst(OperandType::Output, 0, WriteMask::XYZW));
    mov.extend(imm_vec4([0.0, 0.0, 0.0, 1.0]));
    body.extend(mov);

    let mut mov = vec![opcode_token(Opcode::Mov, 8)];
    mov.extend(dst(OperandType::Output, 1, WriteMask::X));
    mov.extend(imm_vec4([0.5, 0.0, 0.0, 0.0]));
    body.extend(mov);

    body.extend(ret());
    build_shader(1, &body, &[])
}

#[test]
fn clip_distance_output_writes_per_vertex_array() {
    let bytes = build_distance_output_shader(SystemValue::ClipDistance);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    // Canonical block layout: cull distances on member 2, clip on 3.
    assert_eq!(
        module.builtin_member_index(spirv::BuiltIn::ClipDistance),
        Some(3)
    );
    // The epilogue stores o1.x into clip_dist[0] as well as the position
    // into member 0.
    assert!(module.stores_to_member_element(3, 0));
    assert!(!module.stores_to_member_element(2, 0));
}

#[test]
fn cull_distance_output_writes_per_vertex_array() {
    let bytes = build_distance_output_shader(SystemValue::CullDistance);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    assert_eq!(
        module.builtin_member_index(spirv::BuiltIn::CullDistance),
        Some(2)
    );
    assert!(module.stores_to_member_element(2, 0));
    assert!(!module.stores_to_member_element(3, 0));
}

// --- additional behaviours ------------------------------------------------

#[test]
fn sincos_uses_both_sin_and_cos() {
    // dcl_temps 2
    // sincos r0.x, r1.x, r0.y
    // ret
    let mut body = Vec::new();
    body.extend(dcl_temps(2));

    let mut sincos = vec![opcode_token(Opcode::SinCos, 7)];
    sincos.extend(dst(OperandType::Temp, 0, WriteMask::X));
    sincos.extend(dst(OperandType::Temp, 1, WriteMask::X));
    sincos.extend(src(OperandType::Temp, 0));
    body.extend(sincos);
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    assert!(module.has_ext_inst(spirv::GLOp::Sin));
    assert!(
        module.has_ext_inst(spirv::GLOp::Cos),
        "the cosine output must use Cos, not Sin"
    );
}

#[test]
fn comparison_produces_integer_mask_constants() {
    // dcl_temps 2
    // eq r0.x, r0.x, r1.x
    // ret
    let mut body = Vec::new();
    body.extend(dcl_temps(2));
    let mut eq = vec![opcode_token(Opcode::Eq, 7)];
    eq.extend(dst(OperandType::Temp, 0, WriteMask::X));
    eq.extend(src(OperandType::Temp, 0));
    eq.extend(src(OperandType::Temp, 1));
    body.extend(eq);
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    assert_eq!(module.count(spirv::Op::FOrdEqual), 1);
    assert_eq!(module.count(spirv::Op::Select), 1);
    assert!(module.has_const_u32(!0u32));
    assert!(module.has_const_u32(0));
}

#[test]
fn loop_with_break_emits_loop_merge() {
    // dcl_temps 1
    // loop
    //   breakc_nz r0.x
    // endloop
    // ret
    let zero_test_nz = 1u32 << 18;

    let mut body = Vec::new();
    body.extend(dcl_temps(1));
    body.push(opcode_token(Opcode::Loop, 1));
    let mut brk = vec![opcode_token(Opcode::Breakc, 3) | zero_test_nz];
    brk.push(operand_token(OperandType::Temp, 2, OPERAND_SEL_SELECT1, 0, 1));
    brk.push(0);
    body.extend(brk);
    body.push(opcode_token(Opcode::EndLoop, 1));
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    assert_eq!(module.count(spirv::Op::LoopMerge), 1);
    assert_eq!(module.count(spirv::Op::SelectionMerge), 1);
    assert_eq!(module.count(spirv::Op::BranchConditional), 1);
}

#[test]
fn switch_emits_case_labels_retroactively() {
    // dcl_temps 1
    // switch r0.x
    //   case l(1): break
    //   default: break
    // endswitch
    // ret
    let mut body = Vec::new();
    body.extend(dcl_temps(1));

    let mut switch = vec![opcode_token(Opcode::Switch, 3)];
    switch.push(operand_token(OperandType::Temp, 2, OPERAND_SEL_SELECT1, 0, 1));
    switch.push(0);
    body.extend(switch);

    let mut case = vec![opcode_token(Opcode::Case, 3)];
    case.push(operand_token(OperandType::Imm32, 1, 0, 0, 0));
    case.push(1);
    body.extend(case);
    body.push(opcode_token(Opcode::Break, 1));

    body.push(opcode_token(Opcode::Default, 1));
    body.push(opcode_token(Opcode::Break, 1));

    body.push(opcode_token(Opcode::EndSwitch, 1));
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let shader = translate_ok(&bytes);

    let module = disassemble(&shader.spirv);
    let switches = module.find_all(spirv::Op::Switch);
    assert_eq!(switches.len(), 1);
    // selector, default, then (literal, label) pairs.
    let args = switches[0];
    assert_eq!(args.len(), 4);
    assert_eq!(args[2], 1, "case literal");
    assert_ne!(args[1], args[3], "default and case targets are distinct");
    assert_eq!(module.count(spirv::Op::SelectionMerge), 1);
}

#[test]
fn compute_shader_thread_group_and_builtins() {
    // dcl_thread_group 8 4 1
    // dcl_temps 1
    // mov r0.xyz, vThreadID.xyzx
    // ret
    let mut body = Vec::new();
    body.push(opcode_token(Opcode::DclThreadGroup, 4));
    body.extend([8, 4, 1]);
    body.extend(dcl_temps(1));

    // Thread-id operands carry no register index, so the instruction is a
    // word shorter than a temp-to-temp mov.
    let mut mov = vec![opcode_token(Opcode::Mov, 4)];
    mov.extend(dst(OperandType::Temp, 0, WriteMask::XYZ));
    mov.push(operand_token(
        OperandType::InputThreadId,
        2,
        OPERAND_SEL_SWIZZLE,
        identity_swizzle_bits(),
        0,
    ));
    body.extend(mov);
    body.extend(ret());

    let bytes = build_shader(5, &body, &[]);
    let shader = translate_ok(&bytes);
    assert_eq!(shader.stage, ShaderStage::Compute);

    let module = disassemble(&shader.spirv);
    let entry = module.entry_point();
    assert_eq!(entry[0], spirv::ExecutionModel::GLCompute as u32);

    let modes = module.find_all(spirv::Op::ExecutionMode);
    let local_size = modes
        .iter()
        .find(|args| args[1] == spirv::ExecutionMode::LocalSize as u32)
        .expect("missing LocalSize");
    assert_eq!(&local_size[2..], &[8, 4, 1]);

    let decorations = module.find_all(spirv::Op::Decorate);
    assert!(decorations.iter().any(|args| {
        args[1] == spirv::Decoration::BuiltIn as u32
            && args[2] == spirv::BuiltIn::GlobalInvocationId as u32
    }));
}

// --- failure paths --------------------------------------------------------

#[test]
fn unbalanced_if_is_rejected() {
    let zero_test_nz = 1u32 << 18;
    let mut body = Vec::new();
    body.extend(dcl_temps(1));
    let mut ifnz = vec![opcode_token(Opcode::If, 3) | zero_test_nz];
    ifnz.push(operand_token(OperandType::Temp, 2, OPERAND_SEL_SELECT1, 0, 1));
    ifnz.push(0);
    body.extend(ifnz);
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let err = translate(&bytes, &TranslateOptions::default()).unwrap_err();
    assert!(matches!(err, TranslateError::InvalidStateMachine { .. }));
}

#[test]
fn else_without_if_is_rejected() {
    let mut body = Vec::new();
    body.push(opcode_token(Opcode::Else, 1));
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let err = translate(&bytes, &TranslateOptions::default()).unwrap_err();
    assert!(matches!(err, TranslateError::InvalidStateMachine { .. }));
}

#[test]
fn undeclared_temp_register_is_rejected() {
    // mov r0, r1 without dcl_temps.
    let mut body = Vec::new();
    let mut mov = vec![opcode_token(Opcode::Mov, 5)];
    mov.extend(dst(OperandType::Temp, 0, WriteMask::XYZW));
    mov.extend(src(OperandType::Temp, 1));
    body.extend(mov);
    body.extend(ret());

    let bytes = build_shader(1, &body, &[]);
    let err = translate(&bytes, &TranslateOptions::default()).unwrap_err();
    assert!(matches!(err, TranslateError::InvalidOperandIndex { .. }));
}

#[test]
fn hull_phase_opcodes_are_rejected() {
    let mut body = Vec::new();
    body.push(opcode_token(Opcode::HsDecls, 1));
    body.extend(ret());

    let bytes = build_shader(3, &body, &[]);
    let err = translate(&bytes, &TranslateOptions::default()).unwrap_err();
    assert!(matches!(err, TranslateError::UnsupportedOpcode { .. }));
}

#[test]
fn decode_errors_surface_through_translate() {
    // Truncated mov.
    let mut body = vec![opcode_token(Opcode::Mov, 9)];
    body.extend(dst(OperandType::Temp, 0, WriteMask::XYZW));

    // Manually assemble: the declared program length must cover the body,
    // but the instruction claims more words than exist.
    let tokens = program(1, &body);
    let shex = tokens_to_bytes(&tokens);
    let bytes = build_container(&[(FourCC(*b"SHEX"), &shex)]);

    let err = translate(&bytes, &TranslateOptions::default()).unwrap_err();
    assert!(matches!(err, TranslateError::Decode(_)));
}

#[test]
fn missing_shader_chunk_is_rejected() {
    let bytes = build_container(&[(FourCC(*b"JUNK"), &[0, 0, 0, 0])]);
    let err = translate(&bytes, &TranslateOptions::default()).unwrap_err();
    assert!(matches!(err, TranslateError::Program(_)));
}

#[test]
fn defer_kill_uses_demote() {
    // discard_nz r0.x
    let zero_test_nz = 1u32 << 18;
    let mut body = Vec::new();
    body.extend(dcl_temps(1));
    let mut discard = vec![opcode_token(Opcode::Discard, 3) | zero_test_nz];
    discard.push(operand_token(OperandType::Temp, 2, OPERAND_SEL_SELECT1, 0, 1));
    discard.push(0);
    body.extend(discard);
    body.extend(ret());

    let osgn = ps_osgn_chunk();
    let bytes = build_shader(0, &body, &[(FourCC(*b"OSGN"), &osgn)]);

    let shader = translate_ok(&bytes);
    let module = disassemble(&shader.spirv);
    assert_eq!(module.count(spirv::Op::Kill), 1);

    let options = TranslateOptions {
        defer_kill: true,
        ..Default::default()
    };
    let shader = translate(&bytes, &options).expect("translation should succeed");
    let module = disassemble(&shader.spirv);
    assert_eq!(module.count(spirv::Op::Kill), 0);
    assert_eq!(module.count(spirv::Op::DemoteToHelperInvocationEXT), 1);
}
