use crate::{DxbcError, FourCC, Reader};

/// Data type of a signature register component.
///
/// The on-disk encoding is a small integer; values outside the known set map
/// to [`RegisterComponentType::Unknown`] rather than failing the parse, so a
/// shader using an exotic type still loads and later stages can decide what
/// to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterComponentType {
    Unknown,
    Uint32,
    Sint32,
    Float32,
}

impl RegisterComponentType {
    fn from_u32(value: u32) -> Self {
        match value {
            1 => RegisterComponentType::Uint32,
            2 => RegisterComponentType::Sint32,
            3 => RegisterComponentType::Float32,
            _ => RegisterComponentType::Unknown,
        }
    }
}

/// One element of an input/output/patch-constant signature.
#[derive(Debug, Clone)]
pub struct SignatureEntry {
    /// Geometry shader output stream; 0 for tags without a stream field.
    pub stream: u32,
    pub semantic_name: String,
    pub semantic_index: u32,
    /// Raw D3D system-value enum; 0 means no system value.
    pub system_value: u32,
    pub component_type: RegisterComponentType,
    pub register: u32,
    /// Components the element occupies (bits 0..3 = xyzw).
    pub mask: u8,
    /// Components actually read (outputs) or written (inputs).
    pub read_write_mask: u8,
}

/// A parsed signature chunk: the register-to-semantic mapping for one
/// shader interface (inputs, outputs or patch constants).
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub entries: Vec<SignatureEntry>,
}

/// Parses a signature chunk using the base (`ISGN`/`OSGN`) entry layout,
/// without stream or precision fields.
pub fn parse_signature_chunk(bytes: &[u8]) -> Result<Signature, DxbcError> {
    Signature::parse(bytes, FourCC(*b"ISGN"))
}

impl Signature {
    /// Parses a signature chunk payload.
    ///
    /// Entry layout is six 32-bit words (name offset, semantic index, system
    /// value, component type, register, packed masks). The versioned tags
    /// extend it: `ISG1`/`OSG1`/`PSG1`/`OSG5` prepend a stream id, and
    /// `ISG1`/`OSG1`/`PSG1` append a precision word (read and discarded).
    /// Semantic name offsets are relative to the chunk start and must point
    /// past the entry table.
    pub fn parse(bytes: &[u8], tag: FourCC) -> Result<Signature, DxbcError> {
        let has_stream = matches!(&tag.0, b"ISG1" | b"OSG1" | b"PSG1" | b"OSG5");
        let has_precision = matches!(&tag.0, b"ISG1" | b"OSG1" | b"PSG1");

        let mut r = Reader::new(bytes);
        let element_count = r.read_u32().map_err(truncated_table)?;
        let _param_offset = r.read_u32().map_err(truncated_table)?;

        let entry_size = 24 + 4 * (has_stream as usize) + 4 * (has_precision as usize);
        let table_end = 8 + entry_size * element_count as usize;
        if table_end > bytes.len() {
            return Err(DxbcError::InvalidChunk {
                context: format!(
                    "signature table ({element_count} entries, {entry_size} bytes each) \
                     ends at {table_end}, chunk is {} bytes",
                    bytes.len()
                ),
            });
        }

        let mut entries = Vec::with_capacity(element_count as usize);
        for i in 0..element_count {
            let stream = if has_stream { r.read_u32()? } else { 0 };

            let name_offset = r.read_u32()? as usize;
            // Name strings live in a table after the entries; an offset into
            // the header or entry table means the chunk is corrupt.
            if name_offset < table_end {
                return Err(DxbcError::InvalidChunk {
                    context: format!(
                        "entry {i} semantic_name offset {name_offset} points into \
                         signature table (ends at {table_end})"
                    ),
                });
            }
            if name_offset >= bytes.len() {
                return Err(DxbcError::InvalidChunk {
                    context: format!(
                        "entry {i} semantic_name offset {name_offset} exceeds \
                         chunk size {}",
                        bytes.len()
                    ),
                });
            }
            let semantic_name = r.clone_at(name_offset)?.read_string().map_err(|e| {
                DxbcError::InvalidChunk {
                    context: format!("entry {i} semantic_name: {}", e.context()),
                }
            })?;

            let semantic_index = r.read_u32()?;
            let system_value = r.read_u32()?;
            let component_type = RegisterComponentType::from_u32(r.read_u32()?);
            let register = r.read_u32()?;
            let masks = r.read_u32()?;
            if has_precision {
                r.read_u32()?;
            }

            entries.push(SignatureEntry {
                stream,
                semantic_name,
                semantic_index,
                system_value,
                component_type,
                register,
                mask: (masks & 0xf) as u8,
                read_write_mask: ((masks >> 8) & 0xf) as u8,
            });
        }

        Ok(Signature { entries })
    }

    /// Looks up an element by semantic name (case-insensitively), semantic
    /// index and stream.
    pub fn find(&self, semantic_name: &str, semantic_index: u32, stream: u32) -> Option<&SignatureEntry> {
        self.entries.iter().find(|e| {
            e.semantic_index == semantic_index
                && e.stream == stream
                && e.semantic_name.eq_ignore_ascii_case(semantic_name)
        })
    }

    /// First element mapped to the given register.
    pub fn find_by_register(&self, register: u32) -> Option<&SignatureEntry> {
        self.entries.iter().find(|e| e.register == register)
    }

    /// Union of the component masks of all elements on a register. Multiple
    /// semantics may share one register with disjoint masks.
    pub fn register_mask(&self, register: u32) -> u8 {
        self.entries
            .iter()
            .filter(|e| e.register == register)
            .fold(0, |mask, e| mask | e.mask)
    }

    /// Highest used register index plus one.
    pub fn max_register_count(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| e.register + 1)
            .max()
            .unwrap_or(0)
    }
}

fn truncated_table(e: DxbcError) -> DxbcError {
    DxbcError::InvalidChunk {
        context: format!("signature table header: {}", e.context()),
    }
}
