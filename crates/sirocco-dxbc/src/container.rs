use crate::signature::Signature;
use crate::{DxbcError, FourCC, Reader};

/// Size of the fixed DXBC header: magic, checksum, reserved word,
/// `total_size` and `chunk_count`.
const HEADER_SIZE: usize = 4 + 16 + 4 + 4 + 4;

/// Upper bound on the declared chunk count. Real containers hold a handful
/// of chunks; anything past this is a corrupt or hostile input and is
/// rejected before the offset table is touched.
const MAX_CHUNK_COUNT: u32 = 4096;

const TAG_DXBC: FourCC = FourCC(*b"DXBC");
const TAG_SHDR: FourCC = FourCC(*b"SHDR");
const TAG_SHEX: FourCC = FourCC(*b"SHEX");

/// Fixed header of a DXBC container.
#[derive(Debug, Clone, Copy)]
pub struct DxbcHeader {
    pub magic: FourCC,
    /// Declared container size in bytes. Authoritative for all bounds
    /// checks; trailing bytes beyond it are ignored.
    pub total_size: u32,
    pub chunk_count: u32,
}

/// A single chunk: four-character tag plus its payload bytes.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub fourcc: FourCC,
    pub data: &'a [u8],
}

/// A parsed DXBC container.
///
/// Chunk payloads are borrowed from the input buffer; no bytes are copied.
/// The 128-bit checksum is not validated.
#[derive(Debug)]
pub struct DxbcFile<'a> {
    header: DxbcHeader,
    chunks: Vec<Chunk<'a>>,
}

impl<'a> DxbcFile<'a> {
    /// Parses and validates the container structure.
    ///
    /// Chunk offsets must point past the header and offset table, and every
    /// chunk header and payload must lie inside the declared `total_size`.
    /// Chunk starts are not required to be 4-byte aligned.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, DxbcError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DxbcError::MalformedHeader {
                context: format!(
                    "need at least {HEADER_SIZE} bytes, got {}",
                    bytes.len()
                ),
            });
        }

        let mut r = Reader::new(bytes);
        let magic = r.read_tag()?;
        if magic != TAG_DXBC {
            return Err(DxbcError::MalformedHeader {
                context: format!("bad magic {magic:?}, expected 'DXBC'"),
            });
        }

        r.skip(16)?; // checksum, not validated
        let _reserved = r.read_u32()?; // usually 1, not validated
        let total_size = r.read_u32()?;
        let chunk_count = r.read_u32()?;

        if (total_size as usize) < HEADER_SIZE {
            return Err(DxbcError::MalformedHeader {
                context: format!(
                    "total_size {total_size} is smaller than header ({HEADER_SIZE} bytes)"
                ),
            });
        }
        if total_size as usize > bytes.len() {
            return Err(DxbcError::OutOfBounds {
                context: format!(
                    "total_size {total_size} exceeds buffer length {}",
                    bytes.len()
                ),
            });
        }
        if chunk_count > MAX_CHUNK_COUNT {
            return Err(DxbcError::MalformedOffsets {
                context: format!(
                    "chunk_count {chunk_count} exceeds maximum {MAX_CHUNK_COUNT}"
                ),
            });
        }

        let total_size_usize = total_size as usize;
        let offset_table_end = HEADER_SIZE + 4 * chunk_count as usize;
        if offset_table_end > total_size_usize {
            return Err(DxbcError::MalformedOffsets {
                context: format!(
                    "chunk offset table ({chunk_count} entries) ends at {offset_table_end}, \
                     outside total_size {total_size}"
                ),
            });
        }

        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for i in 0..chunk_count {
            let offset = r.read_u32()? as usize;

            if offset < HEADER_SIZE {
                return Err(DxbcError::MalformedOffsets {
                    context: format!("chunk {i} offset {offset} points into DXBC header"),
                });
            }
            if offset < offset_table_end {
                return Err(DxbcError::MalformedOffsets {
                    context: format!(
                        "chunk {i} offset {offset} points into chunk offset table"
                    ),
                });
            }
            let Some(data_start) = offset.checked_add(8) else {
                return Err(DxbcError::MalformedOffsets {
                    context: format!("chunk {i} offset {offset} overflows"),
                });
            };
            if data_start > total_size_usize {
                return Err(DxbcError::OutOfBounds {
                    context: format!(
                        "chunk {i} header (8 bytes at offset {offset}) lies \
                         outside total_size {total_size}"
                    ),
                });
            }

            let mut chunk_reader = r.clone_at(offset)?;
            let fourcc = chunk_reader.read_tag()?;
            let size = chunk_reader.read_u32()? as usize;

            let Some(data_end) = data_start.checked_add(size) else {
                return Err(DxbcError::MalformedOffsets {
                    context: format!("chunk {i} ({fourcc}) size {size} overflows"),
                });
            };
            if data_end > total_size_usize {
                return Err(DxbcError::OutOfBounds {
                    context: format!(
                        "chunk {i} ({fourcc}) data ({size} bytes at offset {data_start}) \
                         lies outside total_size {total_size}"
                    ),
                });
            }

            if !is_known_tag(fourcc) {
                tracing::debug!("ignoring unknown DXBC chunk {fourcc} ({size} bytes)");
            }

            chunks.push(Chunk {
                fourcc,
                data: &bytes[data_start..data_end],
            });
        }

        Ok(Self {
            header: DxbcHeader {
                magic,
                total_size,
                chunk_count,
            },
            chunks,
        })
    }

    pub fn header(&self) -> &DxbcHeader {
        &self.header
    }

    /// All chunks in offset-table order. Unknown tags are retained; callers
    /// that don't recognize a tag simply skip it.
    pub fn chunks(&self) -> impl Iterator<Item = Chunk<'a>> + '_ {
        self.chunks.iter().copied()
    }

    /// First chunk with the given tag, if any.
    pub fn get_chunk(&self, fourcc: FourCC) -> Option<Chunk<'a>> {
        self.chunks.iter().copied().find(|c| c.fourcc == fourcc)
    }

    /// All chunks with the given tag.
    pub fn get_chunks(&self, fourcc: FourCC) -> impl Iterator<Item = Chunk<'a>> + '_ {
        self.chunks
            .iter()
            .copied()
            .filter(move |c| c.fourcc == fourcc)
    }

    /// The shader-program chunk, preferring `SHEX` (SM5 encoding) over
    /// `SHDR` when a container carries both.
    pub fn find_first_shader_chunk(&self) -> Option<Chunk<'a>> {
        self.get_chunk(TAG_SHEX).or_else(|| self.get_chunk(TAG_SHDR))
    }

    /// Parses the signature chunk with the given tag.
    ///
    /// Toolchains disagree on whether to emit the base tags (`ISGN`/`OSGN`)
    /// or the versioned ones (`ISG1`/`OSG1`/`OSG5`); the lookup accepts
    /// either spelling and falls back to the other.
    ///
    /// Returns `None` if no matching chunk exists, `Some(Err(_))` if a
    /// matching chunk fails to parse.
    pub fn get_signature(&self, fourcc: FourCC) -> Option<Result<Signature, DxbcError>> {
        if let Some(chunk) = self.get_chunk(fourcc) {
            return Some(Signature::parse(chunk.data, fourcc));
        }
        for &tag in signature_tag_aliases(fourcc).iter() {
            if let Some(chunk) = self.get_chunk(tag) {
                return Some(Signature::parse(chunk.data, tag));
            }
        }
        None
    }

    /// One line per chunk, for diagnostics.
    pub fn debug_summary(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "DXBC container: total_size={}, {} chunk(s)",
            self.header.total_size, self.header.chunk_count
        );
        for (i, c) in self.chunks.iter().enumerate() {
            let _ = writeln!(out, "  chunk {i}: {} ({} bytes)", c.fourcc, c.data.len());
        }
        out
    }
}

/// Tags this crate either parses or knows to be common tool output (RDEF
/// reflection, STAT statistics, debug chunks). Anything else is logged once
/// at parse time and otherwise ignored.
fn is_known_tag(fourcc: FourCC) -> bool {
    matches!(
        &fourcc.0,
        b"ISGN" | b"ISG1" | b"OSGN" | b"OSG1" | b"OSG5" | b"PSG1" | b"SHDR" | b"SHEX"
            | b"RDEF" | b"STAT" | b"SDBG" | b"SFI0" | b"IFCE" | b"Aon9"
    )
}

/// Alternative spellings of a signature tag, tried when the requested tag
/// is absent from the container.
fn signature_tag_aliases(fourcc: FourCC) -> Vec<FourCC> {
    match &fourcc.0 {
        b"ISGN" => vec![FourCC(*b"ISG1")],
        b"ISG1" => vec![FourCC(*b"ISGN")],
        b"OSGN" => vec![FourCC(*b"OSG1"), FourCC(*b"OSG5")],
        b"OSG1" => vec![FourCC(*b"OSGN"), FourCC(*b"OSG5")],
        b"OSG5" => vec![FourCC(*b"OSGN"), FourCC(*b"OSG1")],
        _ => vec![],
    }
}
