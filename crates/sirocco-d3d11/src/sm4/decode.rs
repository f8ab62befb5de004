//! Token-stream instruction decoder.
//!
//! The stream is self-describing: every instruction starts with an opcode
//! token carrying its own length in DWORDs, so the decoder walks it in a
//! single pass. Operands are parsed according to the static format table in
//! [`super::format`], which also gives each register operand the scalar
//! type the instruction interprets it as.

use num_traits::FromPrimitive;
use thiserror::Error;

use super::format::{instruction_format, InstClass, OperandKind};
use super::opcode::*;
use super::{Swizzle, WriteMask};

/// Maximum register index dimension (e.g. constant buffers use two).
pub const MAX_REG_INDEX_DIM: usize = 3;

/// Bounds-checked reader over the 32-bit instruction words.
#[derive(Clone, Copy)]
pub struct CodeSlice<'a> {
    words: &'a [u32],
    pos: usize,
    /// Word offset of `words[0]` within the whole program, for errors.
    base: usize,
}

impl<'a> CodeSlice<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Self {
            words,
            pos: 0,
            base: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.words.len()
    }

    fn err(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError {
            kind,
            word_offset: self.offset(),
        }
    }

    /// Word at `pos + id` without advancing.
    pub fn at(&self, id: usize) -> Result<u32, DecodeError> {
        self.words
            .get(self.pos + id)
            .copied()
            .ok_or_else(|| self.err(DecodeErrorKind::EndOfStream))
    }

    pub fn read(&mut self) -> Result<u32, DecodeError> {
        let word = self.at(0)?;
        self.pos += 1;
        Ok(word)
    }

    /// Splits off the next `n` words as an independent slice.
    pub fn take(&self, n: usize) -> Result<CodeSlice<'a>, DecodeError> {
        if self.pos + n > self.words.len() {
            return Err(self.err(DecodeErrorKind::EndOfStream));
        }
        Ok(CodeSlice {
            words: &self.words[self.pos..self.pos + n],
            pos: 0,
            base: self.base + self.pos,
        })
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        if self.pos + n > self.words.len() {
            return Err(self.err(DecodeErrorKind::EndOfStream));
        }
        self.pos += n;
        Ok(())
    }

    fn remaining_words(&self) -> &'a [u32] {
        &self.words[self.pos..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("unexpected end of token stream")]
    EndOfStream,

    #[error("unknown opcode {opcode}")]
    UnknownOpcode { opcode: u32 },

    #[error("instruction has zero length")]
    ZeroLengthInstruction,

    #[error("custom-data block length {len} is invalid")]
    InvalidCustomDataLength { len: u32 },

    #[error("operand has invalid format: {context}")]
    InvalidOperandFormat { context: String },

    #[error("64-bit immediates are not supported")]
    Unsupported64BitImmediate,

    #[error("unsupported register index representation {rep}")]
    UnsupportedIndexRepresentation { rep: u32 },

    #[error("relative index register must be a single-component temp")]
    InvalidRelativeRegister,
}

/// A decode failure, positioned at the word where it was detected.
#[derive(Debug, Clone, Error)]
#[error("{kind} (at word {word_offset})")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub word_offset: usize,
}

/// One register-index dimension: immediate offset plus an optional
/// relative part referencing a single temp component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegIndex {
    pub offset: i32,
    pub relative: Option<Box<Register>>,
}

impl RegIndex {
    pub fn immediate(offset: i32) -> Self {
        Self {
            offset,
            relative: None,
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.relative.is_none()
    }
}

/// A fully decoded operand.
///
/// The component selection is normalised so consumers can treat every
/// operand as a four-component vector: `Select1` becomes a one-bit mask
/// plus a replicating swizzle, one-component operands get mask `.x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub kind: OperandType,
    /// Scalar type the instruction reads/writes this operand as.
    pub data_type: ScalarType,
    pub component_count: ComponentCount,
    pub index_dim: u32,
    pub index: [RegIndex; MAX_REG_INDEX_DIM],
    pub mask: WriteMask,
    pub swizzle: Swizzle,
    pub modifier: OperandModifier,
    /// Raw immediate words; valid when `kind` is `Imm32`.
    pub imm: [u32; 4],
}

impl Register {
    fn new(kind: OperandType, data_type: ScalarType) -> Self {
        Self {
            kind,
            data_type,
            component_count: ComponentCount::C0,
            index_dim: 0,
            index: Default::default(),
            mask: WriteMask::NONE,
            swizzle: Swizzle::XYZW,
            modifier: OperandModifier::None,
            imm: [0; 4],
        }
    }
}

/// Immediate-constant-buffer or debug payload attached to a `CustomData`
/// instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomData {
    pub class: CustomDataClass,
    pub payload: Vec<u32>,
}

/// Result modifiers shared by ALU instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpModifiers {
    pub saturate: bool,
    pub precise: bool,
}

/// Sign-extended 4-bit immediate texel offsets from an extended
/// `SampleControls` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleControls {
    pub u: i32,
    pub v: i32,
    pub w: i32,
}

impl SampleControls {
    pub fn is_zero(&self) -> bool {
        self.u == 0 && self.v == 0 && self.w == 0
    }
}

/// A fully decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Opcode,
    pub class: InstClass,
    pub modifiers: OpModifiers,
    pub controls: OpcodeControls,
    pub sample_controls: SampleControls,
    pub dst: Vec<Register>,
    pub src: Vec<Register>,
    pub imm: Vec<u32>,
    pub custom_data: Option<CustomData>,
}

/// Single-pass decoder over a shader program body.
pub struct Decoder<'a> {
    code: CodeSlice<'a>,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over the instruction tokens (the program body,
    /// without the two version/length header words).
    pub fn new(body: &'a [u32]) -> Self {
        Self {
            code: CodeSlice::new(body),
        }
    }

    fn decode_instruction(&mut self) -> Result<Instruction, DecodeError> {
        let token0 = self.code.at(0)?;
        let opcode_bits = token0 & OPCODE_MASK;
        let op: Opcode = Opcode::from_u32(opcode_bits)
            .ok_or_else(|| self.code.err(DecodeErrorKind::UnknownOpcode { opcode: opcode_bits }))?;

        // Custom-data blocks store their length in the second token and
        // carry a verbatim payload instead of operands.
        if op == Opcode::CustomData {
            let len = self.code.at(1)?;
            if len < 2 {
                return Err(self
                    .code
                    .err(DecodeErrorKind::InvalidCustomDataLength { len }));
            }
            let block = self.code.take(len as usize)?;
            let class = CustomDataClass::from_u32((token0 >> 11) & 0x1f_ffff)
                .unwrap_or(CustomDataClass::Opaque);
            let payload = block.remaining_words()[2..].to_vec();
            self.code.skip(len as usize)?;

            return Ok(Instruction {
                op,
                class: InstClass::CustomData,
                modifiers: OpModifiers::default(),
                controls: OpcodeControls::default(),
                sample_controls: SampleControls::default(),
                dst: Vec::new(),
                src: Vec::new(),
                imm: Vec::new(),
                custom_data: Some(CustomData { class, payload }),
            });
        }

        let len = (token0 >> OPCODE_LEN_SHIFT) & OPCODE_LEN_MASK;
        if len == 0 {
            return Err(self.code.err(DecodeErrorKind::ZeroLengthInstruction));
        }
        let mut body = self.code.take(len as usize)?;
        let ins = decode_operation(op, &mut body)?;
        self.code.skip(len as usize)?;
        Ok(ins)
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.code.at_end() {
            return None;
        }
        Some(self.decode_instruction())
    }
}

/// Decodes a whole program body into an instruction list.
pub fn decode_program(body: &[u32]) -> Result<Vec<Instruction>, DecodeError> {
    Decoder::new(body).collect()
}

fn decode_operation(op: Opcode, code: &mut CodeSlice<'_>) -> Result<Instruction, DecodeError> {
    let mut token = code.read()?;

    let modifiers = OpModifiers {
        saturate: token & OPCODE_SATURATE_BIT != 0,
        precise: (token >> 19) & 0xf != 0,
    };
    let controls = OpcodeControls(token);
    let mut sample_controls = SampleControls::default();

    // Extended opcode tokens chain while bit 31 stays set.
    while token & OPCODE_EXTENDED_BIT != 0 {
        token = code.read()?;
        match ExtOpcode::from_u32(token & EXT_OPCODE_MASK) {
            Some(ExtOpcode::SampleControls) => {
                // Three 4-bit signed texel offsets.
                sample_controls = SampleControls {
                    u: sign_extend_4(token >> 9),
                    v: sign_extend_4(token >> 13),
                    w: sign_extend_4(token >> 17),
                };
            }
            // Carried on the parent declaration's control bits.
            Some(ExtOpcode::ResourceDim) | Some(ExtOpcode::ResourceReturnType) => {}
            other => {
                tracing::warn!(
                    "ignoring unhandled extended opcode token {:?} ({})",
                    other,
                    token & EXT_OPCODE_MASK
                );
            }
        }
    }

    let format = instruction_format(op);
    if format.class == InstClass::Undefined {
        return Err(code.err(DecodeErrorKind::UnknownOpcode {
            opcode: op as u32,
        }));
    }

    let mut ins = Instruction {
        op,
        class: format.class,
        modifiers,
        controls,
        sample_controls,
        dst: Vec::new(),
        src: Vec::new(),
        imm: Vec::new(),
        custom_data: None,
    };

    for operand in &format.operands[..format.operand_count as usize] {
        match operand.kind {
            OperandKind::DstReg => {
                let reg = decode_register(code, operand.scalar)?;
                ins.dst.push(reg);
            }
            OperandKind::SrcReg => {
                let reg = decode_register(code, operand.scalar)?;
                ins.src.push(reg);
            }
            OperandKind::Imm32 => {
                ins.imm.push(code.read()?);
            }
        }
    }

    Ok(ins)
}

fn sign_extend_4(bits: u32) -> i32 {
    ((bits & 0xf) as i32) << 28 >> 28
}

fn decode_register(
    code: &mut CodeSlice<'_>,
    data_type: ScalarType,
) -> Result<Register, DecodeError> {
    let token = code.read()?;

    let kind_bits = (token >> OPERAND_TYPE_SHIFT) & OPERAND_TYPE_MASK;
    let kind = OperandType::from_u32(kind_bits).ok_or_else(|| {
        code.err(DecodeErrorKind::InvalidOperandFormat {
            context: format!("unknown operand type {kind_bits}"),
        })
    })?;

    let mut reg = Register::new(kind, data_type);
    decode_component_selection(&mut reg, token, code)?;
    decode_operand_extensions(&mut reg, token, code)?;
    decode_operand_immediates(&mut reg, code)?;
    decode_operand_indices(&mut reg, token, code)?;
    Ok(reg)
}

/// Normalises the component selection so that every operand carries both a
/// mask and a swizzle, regardless of how it was encoded.
fn decode_component_selection(
    reg: &mut Register,
    token: u32,
    code: &CodeSlice<'_>,
) -> Result<(), DecodeError> {
    let count_bits = token & OPERAND_NUM_COMPONENTS_MASK;
    reg.component_count = ComponentCount::from_u32(count_bits).ok_or_else(|| {
        code.err(DecodeErrorKind::InvalidOperandFormat {
            context: format!("invalid component count code {count_bits}"),
        })
    })?;

    match reg.component_count {
        // No components: samplers, resources and friends.
        ComponentCount::C0 => {
            reg.mask = WriteMask::NONE;
            reg.swizzle = Swizzle([0; 4]);
        }
        // One component: scalar immediates and some builtins.
        ComponentCount::C1 => {
            reg.mask = WriteMask::X;
            reg.swizzle = Swizzle([0; 4]);
        }
        ComponentCount::C4 => {
            let mode = (token >> OPERAND_SELECTION_MODE_SHIFT) & OPERAND_SELECTION_MODE_MASK;
            match mode {
                OPERAND_SEL_MASK => {
                    reg.mask = WriteMask(((token >> 4) & 0xf) as u8);
                    reg.swizzle = Swizzle::XYZW;
                }
                OPERAND_SEL_SWIZZLE => {
                    reg.mask = WriteMask::XYZW;
                    reg.swizzle = Swizzle([
                        ((token >> 4) & 0x3) as u8,
                        ((token >> 6) & 0x3) as u8,
                        ((token >> 8) & 0x3) as u8,
                        ((token >> 10) & 0x3) as u8,
                    ]);
                }
                OPERAND_SEL_SELECT1 => {
                    let n = (token >> 4) & 0x3;
                    reg.mask = WriteMask::select(n);
                    reg.swizzle = Swizzle::replicate(n);
                }
                _ => {
                    return Err(code.err(DecodeErrorKind::InvalidOperandFormat {
                        context: format!("invalid component selection mode {mode}"),
                    }));
                }
            }
        }
    }
    Ok(())
}

fn decode_operand_extensions(
    reg: &mut Register,
    mut token: u32,
    code: &mut CodeSlice<'_>,
) -> Result<(), DecodeError> {
    while token & OPERAND_EXTENDED_BIT != 0 {
        token = code.read()?;
        let ext_type = token & OPERAND_EXT_TYPE_MASK;
        // OperandModifier is the only extension defined by the encoding.
        if ext_type == 1 {
            let bits = (token >> OPERAND_EXT_MODIFIER_SHIFT) & OPERAND_EXT_MODIFIER_MASK;
            reg.modifier = OperandModifier::from_bits(bits).ok_or_else(|| {
                code.err(DecodeErrorKind::InvalidOperandFormat {
                    context: format!("unknown operand modifier {bits}"),
                })
            })?;
        } else {
            tracing::warn!("ignoring unhandled extended operand token type {ext_type}");
        }
    }
    Ok(())
}

fn decode_operand_immediates(
    reg: &mut Register,
    code: &mut CodeSlice<'_>,
) -> Result<(), DecodeError> {
    match reg.kind {
        OperandType::Imm32 => match reg.component_count {
            ComponentCount::C1 => {
                reg.imm[0] = code.read()?;
            }
            ComponentCount::C4 => {
                for i in 0..4 {
                    reg.imm[i] = code.read()?;
                }
            }
            ComponentCount::C0 => {
                return Err(code.err(DecodeErrorKind::InvalidOperandFormat {
                    context: "immediate operand with zero components".to_owned(),
                }));
            }
        },
        OperandType::Imm64 => {
            return Err(code.err(DecodeErrorKind::Unsupported64BitImmediate));
        }
        _ => {}
    }
    Ok(())
}

fn decode_operand_indices(
    reg: &mut Register,
    token: u32,
    code: &mut CodeSlice<'_>,
) -> Result<(), DecodeError> {
    reg.index_dim = (token >> OPERAND_INDEX_DIMENSION_SHIFT) & OPERAND_INDEX_DIMENSION_MASK;

    for dim in 0..reg.index_dim as usize {
        let rep = (token >> (OPERAND_INDEX0_REP_SHIFT + 3 * dim as u32)) & OPERAND_INDEX_REP_MASK;
        reg.index[dim] = match rep {
            OPERAND_INDEX_REP_IMMEDIATE32 => RegIndex::immediate(code.read()? as i32),
            OPERAND_INDEX_REP_RELATIVE => RegIndex {
                offset: 0,
                relative: Some(decode_relative_register(code)?),
            },
            OPERAND_INDEX_REP_IMMEDIATE32_RELATIVE => {
                let offset = code.read()? as i32;
                RegIndex {
                    offset,
                    relative: Some(decode_relative_register(code)?),
                }
            }
            other => {
                return Err(code.err(DecodeErrorKind::UnsupportedIndexRepresentation {
                    rep: other,
                }));
            }
        };
    }
    Ok(())
}

/// Parses the nested operand of a relative index. The encoding permits one
/// level of nesting and only a single selected component of a temp
/// register; anything else is rejected.
fn decode_relative_register(code: &mut CodeSlice<'_>) -> Result<Box<Register>, DecodeError> {
    let reg = decode_register(code, ScalarType::Sint32)?;

    let is_temp = reg.kind == OperandType::Temp;
    let selects_one = reg.mask.count() == 1;
    let no_nested_relative = reg.index.iter().all(RegIndex::is_immediate);

    if !is_temp || !selects_one || !no_nested_relative {
        return Err(code.err(DecodeErrorKind::InvalidRelativeRegister));
    }
    Ok(Box::new(reg))
}
