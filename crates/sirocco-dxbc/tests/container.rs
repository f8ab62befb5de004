use sirocco_dxbc::test_utils::build_container;
use sirocco_dxbc::{DxbcError, DxbcFile, FourCC};

const OFFSET_TABLE_POS: usize = 4 + 16 + 4 + 4 + 4;
const TOTAL_SIZE_POS: usize = 4 + 16 + 4;

#[test]
fn parses_minimal_container_and_iterates_chunks() {
    let bytes = build_container(&[
        (FourCC(*b"SHEX"), &[1, 2, 3, 4]),
        (FourCC(*b"JUNK"), &[0xaa, 0xbb]),
    ]);

    let file = DxbcFile::parse(&bytes).expect("parse should succeed");
    assert_eq!(file.header().magic, FourCC(*b"DXBC"));
    assert_eq!(file.header().total_size as usize, bytes.len());
    assert_eq!(file.header().chunk_count, 2);

    let chunks: Vec<_> = file.chunks().collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].fourcc, FourCC(*b"SHEX"));
    assert_eq!(chunks[0].data, &[1, 2, 3, 4]);
    assert_eq!(chunks[1].fourcc, FourCC(*b"JUNK"));
    assert_eq!(chunks[1].data, &[0xaa, 0xbb]);

    assert_eq!(file.get_chunk(FourCC(*b"JUNK")).unwrap().data, &[0xaa, 0xbb]);
    assert_eq!(file.get_chunks(FourCC(*b"JUNK")).count(), 1);
    assert!(file.get_chunk(FourCC(*b"NOPE")).is_none());

    let summary = file.debug_summary();
    assert!(summary.contains("SHEX"));
    assert!(summary.contains("JUNK"));
}

#[test]
fn shader_chunk_lookup_prefers_shex_over_shdr() {
    let bytes = build_container(&[
        (FourCC(*b"SHDR"), &[1, 0, 0, 0]),
        (FourCC(*b"SHEX"), &[2, 0, 0, 0]),
    ]);
    let file = DxbcFile::parse(&bytes).expect("parse should succeed");
    assert_eq!(
        file.find_first_shader_chunk().unwrap().fourcc,
        FourCC(*b"SHEX")
    );

    let bytes = build_container(&[(FourCC(*b"SHDR"), &[1, 0, 0, 0])]);
    let file = DxbcFile::parse(&bytes).expect("parse should succeed");
    assert_eq!(
        file.find_first_shader_chunk().unwrap().fourcc,
        FourCC(*b"SHDR")
    );
}

#[test]
fn misaligned_chunk_offsets_are_accepted() {
    // Chunk starts are not required to be 4-byte aligned; odd payload sizes
    // push later chunks onto unaligned offsets.
    let bytes = build_container(&[(FourCC(*b"SHDR"), &[1]), (FourCC(*b"JUNK"), &[2, 3])]);

    let second_off = u32::from_le_bytes(
        bytes[OFFSET_TABLE_POS + 4..OFFSET_TABLE_POS + 8]
            .try_into()
            .unwrap(),
    );
    assert_ne!(second_off % 4, 0);

    let file = DxbcFile::parse(&bytes).expect("parse should succeed");
    assert_eq!(file.chunks().count(), 2);
}

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = build_container(&[(FourCC(*b"SHEX"), &[1, 2, 3])]);
    bytes[0..4].copy_from_slice(b"NOPE");

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedHeader { .. }));
    assert!(err.context().contains("bad magic"));
}

#[test]
fn truncated_header_is_rejected() {
    let err = DxbcFile::parse(&[0u8; 10]).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedHeader { .. }));
    assert!(err.context().contains("need at least"));
}

#[test]
fn total_size_smaller_than_header_is_rejected() {
    let mut bytes = build_container(&[]);
    bytes[TOTAL_SIZE_POS..TOTAL_SIZE_POS + 4].copy_from_slice(&0u32.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedHeader { .. }));
    assert!(err.context().contains("smaller than header"));
}

#[test]
fn total_size_beyond_buffer_is_rejected() {
    let mut bytes = build_container(&[]);
    let bad = bytes.len() as u32 + 1;
    bytes[TOTAL_SIZE_POS..TOTAL_SIZE_POS + 4].copy_from_slice(&bad.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
    assert!(err.context().contains("exceeds buffer length"));
}

#[test]
fn total_size_is_authoritative_for_chunk_bounds() {
    // The buffer keeps its length, but the declared total_size shrinks to
    // cut off the final payload byte.
    let mut bytes = build_container(&[(FourCC(*b"SHEX"), &[1, 2, 3, 4])]);
    let bad = bytes.len() as u32 - 1;
    bytes[TOTAL_SIZE_POS..TOTAL_SIZE_POS + 4].copy_from_slice(&bad.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
    assert!(err.context().contains("chunk 0"));
    assert!(err.context().contains("SHEX"));
    assert!(err.context().contains("outside total_size"));
}

#[test]
fn truncated_offset_table_is_rejected() {
    // Header declares one chunk but total_size ends before the table entry.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"DXBC");
    bytes.extend_from_slice(&[0u8; 16]);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&32u32.to_le_bytes()); // total_size
    bytes.extend_from_slice(&1u32.to_le_bytes()); // chunk_count
    assert_eq!(bytes.len(), 32);

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedOffsets { .. }));
    assert!(err.context().contains("chunk offset table"));
}

#[test]
fn excessive_chunk_count_is_rejected() {
    let mut bytes = build_container(&[]);
    bytes[28..32].copy_from_slice(&u32::MAX.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedOffsets { .. }));
    assert!(err.context().contains("exceeds maximum"));
}

#[test]
fn chunk_offset_into_header_is_rejected() {
    let mut bytes = build_container(&[(FourCC(*b"SHEX"), &[1, 2, 3])]);
    bytes[OFFSET_TABLE_POS..OFFSET_TABLE_POS + 4].copy_from_slice(&0u32.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedOffsets { .. }));
    assert!(err.context().contains("chunk 0"));
    assert!(err.context().contains("points into DXBC header"));
}

#[test]
fn chunk_offset_into_offset_table_is_rejected() {
    let mut bytes = build_container(&[
        (FourCC(*b"SHEX"), &[1, 2, 3]),
        (FourCC(*b"JUNK"), &[4]),
    ]);
    // Two chunks: the offset table spans 32..40. Point the second chunk
    // into the middle of it and make sure the index is reported.
    let bad = 36u32;
    bytes[OFFSET_TABLE_POS + 4..OFFSET_TABLE_POS + 8].copy_from_slice(&bad.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::MalformedOffsets { .. }));
    assert!(err.context().contains("chunk 1"));
    assert!(err.context().contains("points into chunk offset table"));
}

#[test]
fn chunk_offset_at_container_end_is_rejected() {
    // No room for the 8-byte chunk header.
    let mut bytes = build_container(&[(FourCC(*b"SHEX"), &[1, 2, 3])]);
    let bad = bytes.len() as u32;
    bytes[OFFSET_TABLE_POS..OFFSET_TABLE_POS + 4].copy_from_slice(&bad.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
    assert!(err.context().contains("chunk 0"));
    assert!(err.context().contains("header"));
    assert!(err.context().contains("outside total_size"));
}

#[test]
fn chunk_offset_integer_wrap_is_rejected() {
    let mut bytes = build_container(&[(FourCC(*b"SHEX"), &[1, 2, 3])]);
    bytes[OFFSET_TABLE_POS..OFFSET_TABLE_POS + 4].copy_from_slice(&u32::MAX.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(
        err,
        DxbcError::MalformedOffsets { .. } | DxbcError::OutOfBounds { .. }
    ));
    assert!(err.context().contains("chunk 0"));
}

#[test]
fn chunk_size_past_container_end_is_rejected() {
    let mut bytes = build_container(&[(FourCC(*b"SHEX"), &[1, 2, 3, 4])]);

    let chunk_offset = u32::from_le_bytes(
        bytes[OFFSET_TABLE_POS..OFFSET_TABLE_POS + 4]
            .try_into()
            .unwrap(),
    ) as usize;
    let data_start = chunk_offset + 8;
    let bad_size = (bytes.len() - data_start + 1) as u32;
    bytes[chunk_offset + 4..chunk_offset + 8].copy_from_slice(&bad_size.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(err, DxbcError::OutOfBounds { .. }));
    assert!(err.context().contains("chunk 0"));
    assert!(err.context().contains("SHEX"));
    assert!(err.context().contains("data"));
    assert!(err.context().contains("outside total_size"));
}

#[test]
fn huge_chunk_size_is_rejected() {
    let mut bytes = build_container(&[(FourCC(*b"SHEX"), &[1, 2, 3])]);

    let chunk_offset = u32::from_le_bytes(
        bytes[OFFSET_TABLE_POS..OFFSET_TABLE_POS + 4]
            .try_into()
            .unwrap(),
    ) as usize;
    bytes[chunk_offset + 4..chunk_offset + 8].copy_from_slice(&u32::MAX.to_le_bytes());

    let err = DxbcFile::parse(&bytes).unwrap_err();
    assert!(matches!(
        err,
        DxbcError::MalformedOffsets { .. } | DxbcError::OutOfBounds { .. }
    ));
    assert!(err.context().contains("chunk 0"));
}

#[test]
fn unknown_chunk_tags_are_retained_not_fatal() {
    let bytes = build_container(&[
        (FourCC(*b"ABCD"), &[1]),
        (FourCC(*b"SHEX"), &[2, 0, 0, 0]),
    ]);
    let file = DxbcFile::parse(&bytes).expect("unknown tags are not fatal");
    assert_eq!(file.chunks().count(), 2);
    assert!(file.find_first_shader_chunk().is_some());
}
