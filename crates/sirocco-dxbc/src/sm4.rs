//! Shader-program chunk (`SHDR`/`SHEX`) parsing.
//!
//! The chunk payload is a little-endian DWORD stream. The first token packs
//! the program type and shader model, the second is the declared length of
//! the whole program in DWORDs (including both header tokens). Everything
//! after that is the instruction stream, decoded elsewhere.

use thiserror::Error;

use crate::DxbcFile;

/// Program type of a shader, from the version token's high word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Pixel,
    Vertex,
    Geometry,
    Hull,
    Domain,
    Compute,
}

impl ShaderStage {
    pub fn from_program_type(value: u16) -> Option<Self> {
        match value {
            0 => Some(ShaderStage::Pixel),
            1 => Some(ShaderStage::Vertex),
            2 => Some(ShaderStage::Geometry),
            3 => Some(ShaderStage::Hull),
            4 => Some(ShaderStage::Domain),
            5 => Some(ShaderStage::Compute),
            _ => None,
        }
    }
}

/// Shader model version, e.g. 4.0 or 5.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShaderModel {
    pub major: u8,
    pub minor: u8,
}

#[derive(Debug, Clone, Error)]
pub enum Sm4Error {
    #[error("shader chunk length {len} is not a multiple of 4 bytes")]
    MisalignedTokens { len: usize },

    #[error("shader chunk has {dwords} DWORD(s), need at least 2")]
    TooShort { dwords: usize },

    #[error("declared program length {declared} is below the 2-DWORD header")]
    DeclaredLengthTooSmall { declared: u32 },

    #[error("declared program length {declared} exceeds the {available} DWORD(s) present")]
    DeclaredLengthOutOfBounds { declared: u32, available: usize },

    #[error("unknown program type {value}")]
    UnknownProgramType { value: u16 },

    #[error("container has no SHDR/SHEX chunk")]
    MissingShaderChunk,
}

/// A parsed shader program: stage, model and the owned token stream.
///
/// `tokens` retains the two header DWORDs, so instruction decoding starts at
/// `tokens[2]` (see [`Sm4Program::body`]). Trailing DWORDs past the declared
/// length are dropped.
#[derive(Debug, Clone)]
pub struct Sm4Program {
    pub stage: ShaderStage,
    pub model: ShaderModel,
    pub tokens: Vec<u32>,
}

impl Sm4Program {
    /// Extracts and parses the shader chunk of a DXBC container, preferring
    /// `SHEX` over `SHDR`.
    pub fn parse_from_dxbc(dxbc: &DxbcFile<'_>) -> Result<Self, Sm4Error> {
        let chunk = dxbc
            .find_first_shader_chunk()
            .ok_or(Sm4Error::MissingShaderChunk)?;
        Self::parse_program_tokens(chunk.data)
    }

    /// Parses a raw shader chunk payload.
    pub fn parse_program_tokens(bytes: &[u8]) -> Result<Self, Sm4Error> {
        if bytes.len() % 4 != 0 {
            return Err(Sm4Error::MisalignedTokens { len: bytes.len() });
        }
        let available = bytes.len() / 4;
        if available < 2 {
            return Err(Sm4Error::TooShort { dwords: available });
        }

        let word = |i: usize| {
            u32::from_le_bytes([
                bytes[4 * i],
                bytes[4 * i + 1],
                bytes[4 * i + 2],
                bytes[4 * i + 3],
            ])
        };

        // Version token: program type in bits 16.., major version in bits
        // 4..7, minor version in bits 0..3.
        let version = word(0);
        let program_type = (version >> 16) as u16;
        let stage = ShaderStage::from_program_type(program_type)
            .ok_or(Sm4Error::UnknownProgramType {
                value: program_type,
            })?;
        let model = ShaderModel {
            major: ((version >> 4) & 0xf) as u8,
            minor: (version & 0xf) as u8,
        };

        let declared = word(1);
        if declared < 2 {
            return Err(Sm4Error::DeclaredLengthTooSmall { declared });
        }
        if declared as usize > available {
            return Err(Sm4Error::DeclaredLengthOutOfBounds {
                declared,
                available,
            });
        }

        let tokens = (0..declared as usize).map(word).collect();
        Ok(Sm4Program {
            stage,
            model,
            tokens,
        })
    }

    /// The instruction stream, without the two header tokens.
    pub fn body(&self) -> &[u32] {
        &self.tokens[2..]
    }
}
