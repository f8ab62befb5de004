use thiserror::Error;

/// Errors produced while parsing a DXBC container or one of its chunks.
///
/// Every variant carries a human-readable `context` string naming the exact
/// field (and, for chunk-level errors, the chunk index and tag) that failed
/// validation. The variants classify the failure:
///
/// * [`MalformedHeader`](DxbcError::MalformedHeader): the fixed 32-byte
///   header is truncated or inconsistent (bad magic, bogus `total_size`).
/// * [`MalformedOffsets`](DxbcError::MalformedOffsets): the chunk offset
///   table is truncated, or an offset points somewhere a chunk cannot live.
/// * [`OutOfBounds`](DxbcError::OutOfBounds): a chunk header or payload
///   extends past the declared `total_size`.
/// * [`InvalidChunk`](DxbcError::InvalidChunk): a recognized chunk's
///   payload is internally inconsistent.
/// * [`EndOfStream`](DxbcError::EndOfStream): a typed read ran off the end
///   of its slice.
#[derive(Debug, Clone, Error)]
pub enum DxbcError {
    #[error("malformed DXBC header: {context}")]
    MalformedHeader { context: String },

    #[error("malformed DXBC chunk offsets: {context}")]
    MalformedOffsets { context: String },

    #[error("DXBC data out of bounds: {context}")]
    OutOfBounds { context: String },

    #[error("invalid DXBC chunk: {context}")]
    InvalidChunk { context: String },

    #[error("unexpected end of stream: {context}")]
    EndOfStream { context: String },
}

impl DxbcError {
    /// The context string describing what exactly failed.
    pub fn context(&self) -> &str {
        match self {
            DxbcError::MalformedHeader { context }
            | DxbcError::MalformedOffsets { context }
            | DxbcError::OutOfBounds { context }
            | DxbcError::InvalidChunk { context }
            | DxbcError::EndOfStream { context } => context,
        }
    }
}
