//! DXBC container parsing.
//!
//! A compiled Direct3D shader blob is a chunked container: a fixed header
//! (`DXBC` magic, MD5 checksum, total size) followed by a chunk offset table
//! and a set of tagged chunks. The chunks this crate understands are the
//! input/output signature tables (`ISGN`/`OSGN`/`PSG1` and their versioned
//! variants) and the shader program itself (`SHDR`/`SHEX`).
//!
//! Parsing never copies chunk payloads; [`DxbcFile`] borrows the input
//! buffer and hands out sub-slices. All reads are bounds-checked against the
//! *declared* `total_size`, which must itself fit inside the input buffer.

mod container;
mod error;
mod reader;
mod signature;

pub mod sm4;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use container::{Chunk, DxbcFile, DxbcHeader};
pub use error::DxbcError;
pub use reader::Reader;
pub use signature::{
    parse_signature_chunk, RegisterComponentType, Signature, SignatureEntry,
};

use std::fmt;

/// Four-character chunk identifier, e.g. `DXBC`, `ISGN`, `SHEX`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}
