use sirocco_dxbc::sm4::{ShaderModel, ShaderStage, Sm4Error, Sm4Program};
use sirocco_dxbc::test_utils::{build_container, tokens_to_bytes};
use sirocco_dxbc::{DxbcFile, FourCC};

fn version_token(program_type: u16, major: u8, minor: u8) -> u32 {
    ((program_type as u32) << 16) | ((major as u32) << 4) | minor as u32
}

#[test]
fn parses_version_token_stage_and_model() {
    let tokens = [version_token(1, 4, 0), 2];
    let bytes = build_container(&[(FourCC(*b"SHDR"), &tokens_to_bytes(&tokens))]);

    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");
    let program = Sm4Program::parse_from_dxbc(&dxbc).expect("program parse");

    assert_eq!(program.stage, ShaderStage::Vertex);
    assert_eq!(program.model, ShaderModel { major: 4, minor: 0 });
    assert_eq!(program.tokens.len(), 2);
    assert!(program.body().is_empty());
}

#[test]
fn prefers_shex_over_shdr() {
    let shdr = tokens_to_bytes(&[version_token(1, 4, 0), 2]);
    let shex = tokens_to_bytes(&[version_token(0, 5, 0), 2]);
    let bytes = build_container(&[(FourCC(*b"SHDR"), &shdr), (FourCC(*b"SHEX"), &shex)]);

    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");
    let program = Sm4Program::parse_from_dxbc(&dxbc).expect("program parse");

    assert_eq!(program.stage, ShaderStage::Pixel);
    assert_eq!(program.model.major, 5);
}

#[test]
fn rejects_misaligned_token_stream() {
    let bytes = build_container(&[(FourCC(*b"SHDR"), &[0u8; 5])]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::MisalignedTokens { len: 5 }));
}

#[test]
fn rejects_too_short_token_stream() {
    let bytes = build_container(&[(FourCC(*b"SHDR"), &[0u8; 4])]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::TooShort { dwords: 1 }));
}

#[test]
fn rejects_declared_length_out_of_bounds() {
    let tokens = [version_token(0, 4, 0), 3];
    let bytes = build_container(&[(FourCC(*b"SHDR"), &tokens_to_bytes(&tokens))]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(
        err,
        Sm4Error::DeclaredLengthOutOfBounds {
            declared: 3,
            available: 2
        }
    ));
}

#[test]
fn rejects_declared_length_below_header() {
    let tokens = [version_token(0, 4, 0), 1];
    let bytes = build_container(&[(FourCC(*b"SHDR"), &tokens_to_bytes(&tokens))]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::DeclaredLengthTooSmall { declared: 1 }));
}

#[test]
fn declared_length_truncates_trailing_tokens() {
    let tokens = [version_token(1, 4, 0), 2, 0xdead_beef, 0x1234_5678];
    let bytes = build_container(&[(FourCC(*b"SHDR"), &tokens_to_bytes(&tokens))]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let program = Sm4Program::parse_from_dxbc(&dxbc).expect("program parse");
    assert_eq!(program.tokens, &tokens[..2]);
}

#[test]
fn rejects_unknown_program_type() {
    let tokens = [version_token(9, 4, 0), 2];
    let bytes = build_container(&[(FourCC(*b"SHDR"), &tokens_to_bytes(&tokens))]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::UnknownProgramType { value: 9 }));
}

#[test]
fn missing_shader_chunk_is_error() {
    let bytes = build_container(&[(FourCC(*b"JUNK"), &[1, 2, 3, 4])]);
    let dxbc = DxbcFile::parse(&bytes).expect("DXBC parse");

    let err = Sm4Program::parse_from_dxbc(&dxbc).unwrap_err();
    assert!(matches!(err, Sm4Error::MissingShaderChunk));
}
