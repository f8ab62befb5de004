use pretty_assertions::assert_eq;
use sirocco_d3d11::sm4::decode::{decode_program, DecodeErrorKind, RegIndex};
use sirocco_d3d11::sm4::format::InstClass;
use sirocco_d3d11::sm4::opcode::*;
use sirocco_d3d11::{Swizzle, WriteMask};

fn opcode_token(opcode: Opcode, len: u32) -> u32 {
    (opcode as u32) | (len << OPCODE_LEN_SHIFT)
}

fn operand_token(
    ty: u32,
    num_components: u32,
    selection_mode: u32,
    component_sel: u32,
    index_dim: u32,
) -> u32 {
    let mut token = 0u32;
    token |= num_components & OPERAND_NUM_COMPONENTS_MASK;
    token |= (selection_mode & OPERAND_SELECTION_MODE_MASK) << OPERAND_SELECTION_MODE_SHIFT;
    token |= (component_sel & OPERAND_COMPONENT_SELECTION_MASK)
        << OPERAND_COMPONENT_SELECTION_SHIFT;
    token |= (ty & OPERAND_TYPE_MASK) << OPERAND_TYPE_SHIFT;
    token |= (index_dim & OPERAND_INDEX_DIMENSION_MASK) << OPERAND_INDEX_DIMENSION_SHIFT;
    token
}

fn swizzle_bits(swizzle: [u8; 4]) -> u32 {
    (swizzle[0] as u32)
        | ((swizzle[1] as u32) << 2)
        | ((swizzle[2] as u32) << 4)
        | ((swizzle[3] as u32) << 6)
}

/// `r<index>.<mask>` destination operand (2 words).
fn reg_dst(index: u32, mask: WriteMask) -> Vec<u32> {
    vec![
        operand_token(
            OperandType::Temp as u32,
            ComponentCount::C4 as u32,
            OPERAND_SEL_MASK,
            mask.0 as u32,
            1,
        ),
        index,
    ]
}

/// `r<index>.<swizzle>` source operand (2 words).
fn reg_src(index: u32, swizzle: Swizzle) -> Vec<u32> {
    vec![
        operand_token(
            OperandType::Temp as u32,
            ComponentCount::C4 as u32,
            OPERAND_SEL_SWIZZLE,
            swizzle_bits(swizzle.0),
            1,
        ),
        index,
    ]
}

/// Four-component immediate operand (5 words).
fn imm32_vec4(values: [u32; 4]) -> Vec<u32> {
    let mut out = vec![operand_token(
        OperandType::Imm32 as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SWIZZLE,
        swizzle_bits([0, 1, 2, 3]),
        0,
    )];
    out.extend_from_slice(&values);
    out
}

#[test]
fn decodes_mov_with_mask_and_swizzle() {
    let mut body = vec![opcode_token(Opcode::Mov, 5)];
    body.extend(reg_dst(3, WriteMask::XY));
    body.extend(reg_src(1, Swizzle([2, 2, 0, 1])));

    let ins = decode_program(&body).expect("decode");
    assert_eq!(ins.len(), 1);
    let mov = &ins[0];

    assert_eq!(mov.op, Opcode::Mov);
    assert_eq!(mov.class, InstClass::VectorAlu);
    assert_eq!(mov.dst.len(), 1);
    assert_eq!(mov.src.len(), 1);

    assert_eq!(mov.dst[0].kind, OperandType::Temp);
    assert_eq!(mov.dst[0].mask, WriteMask::XY);
    assert_eq!(mov.dst[0].swizzle, Swizzle::XYZW);
    assert_eq!(mov.dst[0].index[0], RegIndex::immediate(3));
    assert_eq!(mov.dst[0].data_type, ScalarType::Float32);

    assert_eq!(mov.src[0].mask, WriteMask::XYZW);
    assert_eq!(mov.src[0].swizzle, Swizzle([2, 2, 0, 1]));
    assert_eq!(mov.src[0].index[0], RegIndex::immediate(1));
}

#[test]
fn select1_normalises_to_mask_and_replicated_swizzle() {
    let mut body = vec![opcode_token(Opcode::Mov, 5)];
    body.extend(reg_dst(0, WriteMask::X));
    body.push(operand_token(
        OperandType::Temp as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SELECT1,
        2, // z
        1,
    ));
    body.push(0);

    let ins = decode_program(&body).expect("decode");
    let src = &ins[0].src[0];
    assert_eq!(src.mask, WriteMask::Z);
    assert_eq!(src.swizzle, Swizzle::replicate(2));
}

#[test]
fn saturate_and_precise_bits_are_recorded() {
    let mut body = vec![opcode_token(Opcode::Add, 7) | OPCODE_SATURATE_BIT];
    body.extend(reg_dst(0, WriteMask::XYZW));
    body.extend(reg_src(0, Swizzle::XYZW));
    body.extend(reg_src(1, Swizzle::XYZW));

    let ins = decode_program(&body).expect("decode");
    assert!(ins[0].modifiers.saturate);
    assert!(!ins[0].modifiers.precise);
}

#[test]
fn extended_opcode_sample_controls_sign_extend() {
    // sample with an aoffimmi(-2, 7, -8) extension. The extended token adds
    // one word to the instruction.
    let ext = 1u32 // SampleControls
        | ((-2i32 as u32 & 0xf) << 9)
        | ((7u32) << 13)
        | ((-8i32 as u32 & 0xf) << 17);

    let mut body = vec![
        opcode_token(Opcode::Sample, 10) | OPCODE_EXTENDED_BIT,
        ext,
    ];
    body.extend(reg_dst(0, WriteMask::XYZW));
    body.extend(reg_src(0, Swizzle::XYZW)); // coord
    // texture t0 (no components, 1 index)
    body.push(operand_token(
        OperandType::Resource as u32,
        ComponentCount::C0 as u32,
        OPERAND_SEL_MASK,
        0,
        1,
    ));
    body.push(0);
    // sampler s0
    body.push(operand_token(
        OperandType::Sampler as u32,
        ComponentCount::C0 as u32,
        OPERAND_SEL_MASK,
        0,
        1,
    ));
    body.push(0);

    let ins = decode_program(&body).expect("decode");
    assert_eq!(ins[0].sample_controls.u, -2);
    assert_eq!(ins[0].sample_controls.v, 7);
    assert_eq!(ins[0].sample_controls.w, -8);
    assert_eq!(ins[0].src.len(), 3);
    assert_eq!(ins[0].src[1].kind, OperandType::Resource);
    assert_eq!(ins[0].src[2].kind, OperandType::Sampler);
}

#[test]
fn extended_operand_modifiers_decode() {
    for (bits, expected) in [
        (1u32, OperandModifier::Neg),
        (2, OperandModifier::Abs),
        (3, OperandModifier::AbsNeg),
    ] {
        let mut body = vec![opcode_token(Opcode::Mov, 6)];
        body.extend(reg_dst(0, WriteMask::XYZW));
        body.push(
            operand_token(
                OperandType::Temp as u32,
                ComponentCount::C4 as u32,
                OPERAND_SEL_SWIZZLE,
                swizzle_bits([0, 1, 2, 3]),
                1,
            ) | OPERAND_EXTENDED_BIT,
        );
        body.push(bits << OPERAND_EXT_MODIFIER_SHIFT | 1); // OperandModifier ext
        body.push(0);

        let ins = decode_program(&body).expect("decode");
        assert_eq!(ins[0].src[0].modifier, expected);
    }
}

#[test]
fn immediate_operands_capture_all_words() {
    let mut body = vec![opcode_token(Opcode::Mov, 8)];
    body.extend(reg_dst(0, WriteMask::XYZW));
    body.extend(imm32_vec4([
        1f32.to_bits(),
        2f32.to_bits(),
        3f32.to_bits(),
        4f32.to_bits(),
    ]));

    let ins = decode_program(&body).expect("decode");
    let imm = &ins[0].src[0];
    assert_eq!(imm.kind, OperandType::Imm32);
    assert_eq!(imm.component_count, ComponentCount::C4);
    assert_eq!(imm.imm, [1f32.to_bits(), 2f32.to_bits(), 3f32.to_bits(), 4f32.to_bits()]);
}

#[test]
fn relative_constant_buffer_index_decodes() {
    // mov r0.xyzw, cb0[r1.y + 3].xyzw
    let mut body = vec![opcode_token(Opcode::Mov, 8)];
    body.extend(reg_dst(0, WriteMask::XYZW));

    let mut cb_token = operand_token(
        OperandType::ConstantBuffer as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SWIZZLE,
        swizzle_bits([0, 1, 2, 3]),
        2,
    );
    cb_token |= OPERAND_INDEX_REP_IMMEDIATE32 << OPERAND_INDEX0_REP_SHIFT;
    cb_token |= OPERAND_INDEX_REP_IMMEDIATE32_RELATIVE << OPERAND_INDEX1_REP_SHIFT;
    body.push(cb_token);
    body.push(0); // cb register
    body.push(3); // element offset
    body.push(operand_token(
        OperandType::Temp as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SELECT1,
        1, // y
        1,
    ));
    body.push(1); // r1

    let ins = decode_program(&body).expect("decode");
    let cb = &ins[0].src[0];
    assert_eq!(cb.kind, OperandType::ConstantBuffer);
    assert_eq!(cb.index_dim, 2);
    assert_eq!(cb.index[0], RegIndex::immediate(0));
    assert_eq!(cb.index[1].offset, 3);

    let relative = cb.index[1].relative.as_ref().expect("relative part");
    assert_eq!(relative.kind, OperandType::Temp);
    assert_eq!(relative.mask, WriteMask::Y);
    assert_eq!(relative.swizzle, Swizzle::replicate(1));
    assert_eq!(relative.index[0], RegIndex::immediate(1));
    assert_eq!(relative.data_type, ScalarType::Sint32);
}

#[test]
fn relative_index_must_select_one_temp_component() {
    // Relative part referencing an *input* register is rejected.
    let mut body = vec![opcode_token(Opcode::Mov, 7)];
    body.extend(reg_dst(0, WriteMask::XYZW));

    let mut cb_token = operand_token(
        OperandType::ConstantBuffer as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SWIZZLE,
        swizzle_bits([0, 1, 2, 3]),
        2,
    );
    cb_token |= OPERAND_INDEX_REP_RELATIVE << OPERAND_INDEX1_REP_SHIFT;
    body.push(cb_token);
    body.push(0); // cb register
    body.push(operand_token(
        OperandType::Input as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SELECT1,
        0,
        1,
    ));
    body.push(0);

    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(err.kind, DecodeErrorKind::InvalidRelativeRegister));
}

#[test]
fn relative_index_rejects_full_swizzles() {
    // A relative part selecting all four components is rejected.
    let mut body = vec![opcode_token(Opcode::Mov, 7)];
    body.extend(reg_dst(0, WriteMask::XYZW));

    let mut cb_token = operand_token(
        OperandType::ConstantBuffer as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SWIZZLE,
        swizzle_bits([0, 1, 2, 3]),
        2,
    );
    cb_token |= OPERAND_INDEX_REP_RELATIVE << OPERAND_INDEX1_REP_SHIFT;
    body.push(cb_token);
    body.push(0);
    body.push(operand_token(
        OperandType::Temp as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SWIZZLE,
        swizzle_bits([0, 1, 2, 3]),
        1,
    ));
    body.push(0);

    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(err.kind, DecodeErrorKind::InvalidRelativeRegister));
}

#[test]
fn imm64_index_representation_is_rejected() {
    let mut body = vec![opcode_token(Opcode::Mov, 6)];
    body.extend(reg_dst(0, WriteMask::XYZW));

    let mut src_token = operand_token(
        OperandType::ConstantBuffer as u32,
        ComponentCount::C4 as u32,
        OPERAND_SEL_SWIZZLE,
        swizzle_bits([0, 1, 2, 3]),
        2,
    );
    src_token |= OPERAND_INDEX_REP_IMMEDIATE64 << OPERAND_INDEX1_REP_SHIFT;
    body.push(src_token);
    body.push(0);
    body.push(0);

    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(
        err.kind,
        DecodeErrorKind::UnsupportedIndexRepresentation { rep: 1 }
    ));
}

#[test]
fn imm64_operands_are_rejected() {
    let mut body = vec![opcode_token(Opcode::Mov, 4)];
    body.extend(reg_dst(0, WriteMask::X));
    body.push(operand_token(
        OperandType::Imm64 as u32,
        ComponentCount::C1 as u32,
        0,
        0,
        0,
    ));

    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(
        err.kind,
        DecodeErrorKind::Unsupported64BitImmediate
    ));
}

#[test]
fn custom_data_blocks_carry_their_payload() {
    // Immediate constant buffer with two float4 vectors; the block length
    // lives in the second token.
    let class = CustomDataClass::ImmConstBuf as u32;
    let mut body = vec![(Opcode::CustomData as u32) | (class << 11), 10];
    for i in 0..8u32 {
        body.push(i);
    }
    body.push(opcode_token(Opcode::Ret, 1));

    let ins = decode_program(&body).expect("decode");
    assert_eq!(ins.len(), 2);
    assert_eq!(ins[0].op, Opcode::CustomData);
    assert_eq!(ins[0].class, InstClass::CustomData);

    let data = ins[0].custom_data.as_ref().expect("payload");
    assert_eq!(data.class, CustomDataClass::ImmConstBuf);
    assert_eq!(data.payload, (0..8).collect::<Vec<u32>>());
    assert_eq!(ins[1].op, Opcode::Ret);
}

#[test]
fn invalid_custom_data_length_is_rejected() {
    let body = vec![Opcode::CustomData as u32, 1];
    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(
        err.kind,
        DecodeErrorKind::InvalidCustomDataLength { len: 1 }
    ));
}

#[test]
fn truncated_instruction_is_end_of_stream() {
    // mov declares 5 words but only 3 are present.
    let mut body = vec![opcode_token(Opcode::Mov, 5)];
    body.extend(reg_dst(0, WriteMask::XYZW));

    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(err.kind, DecodeErrorKind::EndOfStream));
}

#[test]
fn truncated_operand_is_end_of_stream() {
    // Declared length covers the opcode token only, but the format expects
    // operands.
    let body = vec![opcode_token(Opcode::Mov, 1)];
    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(err.kind, DecodeErrorKind::EndOfStream));
}

#[test]
fn unknown_opcode_is_rejected() {
    let body = vec![0x7ff | (1 << OPCODE_LEN_SHIFT)];
    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(
        err.kind,
        DecodeErrorKind::UnknownOpcode { opcode: 0x7ff }
    ));
}

#[test]
fn zero_length_instruction_is_rejected() {
    let body = vec![Opcode::Mov as u32];
    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(err.kind, DecodeErrorKind::ZeroLengthInstruction));
}

#[test]
fn reserved_opcodes_are_rejected() {
    let body = vec![opcode_token(Opcode::Abort, 1)];
    let err = decode_program(&body).expect_err("decode should fail");
    assert!(matches!(err.kind, DecodeErrorKind::UnknownOpcode { .. }));
}

#[test]
fn dcl_temps_takes_a_bare_immediate() {
    let body = vec![opcode_token(Opcode::DclTemps, 2), 4];
    let ins = decode_program(&body).expect("decode");
    assert_eq!(ins[0].op, Opcode::DclTemps);
    assert_eq!(ins[0].class, InstClass::Declaration);
    assert_eq!(ins[0].imm, vec![4]);
    assert!(ins[0].dst.is_empty());
}

#[test]
fn decoder_walks_consecutive_instructions() {
    let mut body = Vec::new();
    body.push(opcode_token(Opcode::DclTemps, 2));
    body.push(2);
    let mut mov = vec![opcode_token(Opcode::Mov, 5)];
    mov.extend(reg_dst(0, WriteMask::XYZW));
    mov.extend(reg_src(1, Swizzle::XYZW));
    body.extend(mov);
    body.push(opcode_token(Opcode::Ret, 1));

    let ins = decode_program(&body).expect("decode");
    assert_eq!(ins.len(), 3);
    assert_eq!(ins[0].op, Opcode::DclTemps);
    assert_eq!(ins[1].op, Opcode::Mov);
    assert_eq!(ins[2].op, Opcode::Ret);
}
