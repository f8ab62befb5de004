//! Helpers for building structurally-valid DXBC containers in tests.

use crate::FourCC;

/// Builds a minimal DXBC container around the given chunks.
///
/// The header gets a correct offset table and `total_size`; the checksum
/// field stays zeroed, since parsing never validates it.
pub fn build_container(chunks: &[(FourCC, &[u8])]) -> Vec<u8> {
    let header_len = 4 + 16 + 4 + 4 + 4 + 4 * chunks.len();
    let total_size = header_len
        + chunks
            .iter()
            .map(|(_, data)| 8 + data.len())
            .sum::<usize>();

    let mut out = Vec::with_capacity(total_size);
    out.extend_from_slice(b"DXBC");
    out.extend_from_slice(&[0u8; 16]); // checksum, unchecked
    out.extend_from_slice(&1u32.to_le_bytes()); // reserved
    out.extend_from_slice(&u32::try_from(total_size).unwrap().to_le_bytes());
    out.extend_from_slice(&u32::try_from(chunks.len()).unwrap().to_le_bytes());

    let mut offset = header_len;
    for (_, data) in chunks {
        out.extend_from_slice(&u32::try_from(offset).unwrap().to_le_bytes());
        offset += 8 + data.len();
    }

    for (fourcc, data) in chunks {
        out.extend_from_slice(&fourcc.0);
        out.extend_from_slice(&u32::try_from(data.len()).unwrap().to_le_bytes());
        out.extend_from_slice(data);
    }

    debug_assert_eq!(out.len(), total_size);
    out
}

/// Serializes a DWORD stream to little-endian bytes, e.g. for a `SHEX`
/// chunk payload.
pub fn tokens_to_bytes(tokens: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(tokens.len() * 4);
    for &t in tokens {
        bytes.extend_from_slice(&t.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DxbcFile;

    #[test]
    fn built_container_roundtrips_through_parser() {
        let payload = [9u8, 8, 7];
        let bytes = build_container(&[(FourCC(*b"SHEX"), &payload)]);

        let file = DxbcFile::parse(&bytes).expect("built container should parse");
        assert_eq!(file.header().magic, FourCC(*b"DXBC"));
        assert_eq!(file.header().total_size as usize, bytes.len());
        assert_eq!(file.header().chunk_count, 1);
        assert_eq!(file.get_chunk(FourCC(*b"SHEX")).unwrap().data, &payload);
    }
}
