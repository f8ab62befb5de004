use sirocco_dxbc::test_utils::build_container;
use sirocco_dxbc::{
    parse_signature_chunk, DxbcError, DxbcFile, FourCC, RegisterComponentType, Signature,
};

/// Base-layout signature chunk with two entries:
/// POSITION0 on register 0 (xyzw, float) and TEXCOORD0 on register 1 (xy).
fn build_base_signature_chunk() -> Vec<u8> {
    let mut bytes = Vec::new();

    let element_count = 2u32;
    bytes.extend_from_slice(&element_count.to_le_bytes());
    bytes.extend_from_slice(&8u32.to_le_bytes()); // param offset

    let table_end = 8 + 24 * element_count as usize;
    let pos_name = table_end as u32;
    let tex_name = pos_name + "POSITION\0".len() as u32;

    // POSITION, register 0, mask xyzw, rw xyzw
    bytes.extend_from_slice(&pos_name.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // semantic_index
    bytes.extend_from_slice(&0u32.to_le_bytes()); // system_value
    bytes.extend_from_slice(&3u32.to_le_bytes()); // component_type = float32
    bytes.extend_from_slice(&0u32.to_le_bytes()); // register
    bytes.extend_from_slice(&0x0f0fu32.to_le_bytes()); // mask | rw << 8

    // TEXCOORD, register 1, mask xy, rw xy
    bytes.extend_from_slice(&tex_name.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&3u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0x0303u32.to_le_bytes());

    bytes.extend_from_slice(b"POSITION\0");
    bytes.extend_from_slice(b"TEXCOORD\0");
    bytes
}

/// `ISG1`-layout chunk with one entry carrying stream and precision words.
fn build_v1_signature_chunk(stream: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&8u32.to_le_bytes());

    let table_end = 8 + 32;
    bytes.extend_from_slice(&stream.to_le_bytes());
    bytes.extend_from_slice(&(table_end as u32).to_le_bytes()); // name offset
    bytes.extend_from_slice(&2u32.to_le_bytes()); // semantic_index
    bytes.extend_from_slice(&0u32.to_le_bytes()); // system_value
    bytes.extend_from_slice(&1u32.to_le_bytes()); // component_type = uint32
    bytes.extend_from_slice(&3u32.to_le_bytes()); // register
    bytes.extend_from_slice(&0x010fu32.to_le_bytes()); // mask xyzw, rw x
    bytes.extend_from_slice(&0u32.to_le_bytes()); // min precision
    bytes.extend_from_slice(b"TEXCOORD\0");
    bytes
}

#[test]
fn parses_base_layout_entries() {
    let sig = parse_signature_chunk(&build_base_signature_chunk()).expect("parse");
    assert_eq!(sig.entries.len(), 2);

    let e = &sig.entries[0];
    assert_eq!(e.semantic_name, "POSITION");
    assert_eq!(e.semantic_index, 0);
    assert_eq!(e.register, 0);
    assert_eq!(e.system_value, 0);
    assert_eq!(e.component_type, RegisterComponentType::Float32);
    assert_eq!(e.mask, 0xf);
    assert_eq!(e.read_write_mask, 0xf);
    assert_eq!(e.stream, 0);

    let e = &sig.entries[1];
    assert_eq!(e.semantic_name, "TEXCOORD");
    assert_eq!(e.register, 1);
    assert_eq!(e.mask, 0x3);
}

#[test]
fn parses_v1_layout_with_stream_and_precision() {
    let sig = Signature::parse(&build_v1_signature_chunk(1), FourCC(*b"ISG1")).expect("parse");
    assert_eq!(sig.entries.len(), 1);
    assert_eq!(sig.entries[0].stream, 1);
    assert_eq!(sig.entries[0].semantic_name, "TEXCOORD");
    assert_eq!(sig.entries[0].semantic_index, 2);
    assert_eq!(sig.entries[0].component_type, RegisterComponentType::Uint32);
    assert_eq!(sig.entries[0].mask, 0xf);
    assert_eq!(sig.entries[0].read_write_mask, 0x1);
}

#[test]
fn empty_signature_is_ok() {
    // Patch-constant signatures may legitimately be empty.
    let sig = parse_signature_chunk(&[0u8; 8]).expect("empty signature should parse");
    assert!(sig.entries.is_empty());
    assert_eq!(sig.max_register_count(), 0);
}

#[test]
fn lookup_is_case_insensitive_and_stream_aware() {
    let sig = parse_signature_chunk(&build_base_signature_chunk()).expect("parse");

    assert!(sig.find("position", 0, 0).is_some());
    assert!(sig.find("TexCoord", 0, 0).is_some());
    assert!(sig.find("TEXCOORD", 1, 0).is_none());
    assert!(sig.find("TEXCOORD", 0, 1).is_none());
    assert!(sig.find("NORMAL", 0, 0).is_none());

    assert_eq!(sig.find_by_register(1).unwrap().semantic_name, "TEXCOORD");
    assert_eq!(sig.max_register_count(), 2);
}

#[test]
fn register_mask_is_union_over_shared_register() {
    // Two semantics packed into register 0: .xy and .zw.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&8u32.to_le_bytes());

    let table_end = 8 + 48;
    for (i, mask) in [(0u32, 0x3u32), (1, 0xc)] {
        bytes.extend_from_slice(&(table_end as u32).to_le_bytes());
        bytes.extend_from_slice(&i.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(mask | (mask << 8)).to_le_bytes());
    }
    bytes.extend_from_slice(b"TEXCOORD\0");

    let sig = parse_signature_chunk(&bytes).expect("parse");
    assert_eq!(sig.register_mask(0), 0xf);
    assert_eq!(sig.register_mask(1), 0);
}

#[test]
fn container_signature_lookup_accepts_either_tag_spelling() {
    let sig_bytes = build_base_signature_chunk();
    let dxbc_bytes = build_container(&[(FourCC(*b"ISGN"), &sig_bytes)]);
    let dxbc = DxbcFile::parse(&dxbc_bytes).expect("parse");

    // Asking for the v1 spelling still finds the base chunk.
    let sig = dxbc
        .get_signature(FourCC(*b"ISG1"))
        .expect("signature present")
        .expect("signature parses");
    assert_eq!(sig.entries.len(), 2);

    // And the other way round.
    let v1_bytes = build_v1_signature_chunk(0);
    let dxbc_bytes = build_container(&[(FourCC(*b"ISG1"), &v1_bytes)]);
    let dxbc = DxbcFile::parse(&dxbc_bytes).expect("parse");
    let sig = dxbc
        .get_signature(FourCC(*b"ISGN"))
        .expect("signature present")
        .expect("signature parses");
    assert_eq!(sig.entries.len(), 1);
    assert_eq!(sig.entries[0].semantic_name, "TEXCOORD");
}

#[test]
fn truncated_entry_table_is_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&8u32.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 4]); // far too short for one entry

    let err = parse_signature_chunk(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }));
    assert!(err.context().contains("signature table"));
}

#[test]
fn semantic_name_offset_into_table_is_rejected() {
    let mut bytes = build_base_signature_chunk();
    bytes[8..12].copy_from_slice(&8u32.to_le_bytes());

    let err = parse_signature_chunk(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }));
    assert!(err.context().contains("points into signature table"));
}

#[test]
fn semantic_name_offset_out_of_bounds_is_rejected() {
    let mut bytes = build_base_signature_chunk();
    bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());

    let err = parse_signature_chunk(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }));
    assert!(err.context().contains("semantic_name"));
}

#[test]
fn unterminated_semantic_name_is_rejected() {
    let mut bytes = build_base_signature_chunk();
    let last = bytes.len() - 1;
    bytes[last] = b'X'; // clobber the final null terminator

    let err = parse_signature_chunk(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }));
    assert!(err.context().contains("null terminator"));
}

#[test]
fn non_utf8_semantic_name_is_rejected() {
    let mut bytes = build_base_signature_chunk();
    let pos = bytes
        .windows(9)
        .position(|w| w == b"POSITION\0")
        .expect("name table should contain POSITION");
    bytes[pos] = 0xff;

    let err = parse_signature_chunk(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::InvalidChunk { .. }));
    assert!(err.context().contains("UTF-8"));
}
