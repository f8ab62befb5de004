//! Declarative per-opcode operand formats.
//!
//! The decoder is driven entirely by this table: for each opcode it parses
//! exactly `operand_count` operands of the listed kinds, tagging register
//! operands with the scalar type the instruction interprets them as.
//! Opcodes with an [`InstClass::Undefined`] row exist in the encoding but
//! have no defined operand layout here; decoding them fails.

use super::opcode::{Opcode, ScalarType, OPCODE_COUNT};

/// How one operand of an instruction is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Destination register operand.
    DstReg,
    /// Source register operand.
    SrcReg,
    /// Bare immediate DWORD (no operand token).
    Imm32,
}

/// Coarse instruction classification used to route lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstClass {
    Declaration,
    CustomData,
    NoOperation,
    VectorAlu,
    VectorCmov,
    VectorCmp,
    VectorDeriv,
    VectorDot,
    VectorIdiv,
    VectorImul,
    VectorMsad,
    VectorShift,
    VectorSinCos,
    BitExtract,
    BitInsert,
    BitScan,
    ConvertFloat16,
    ConvertFloat64,
    ControlFlow,
    GeometryEmit,
    HullShaderPhase,
    HullShaderInstCnt,
    Interpolate,
    TextureSample,
    TextureFetch,
    TextureGather,
    TextureQuery,
    TextureQueryLod,
    TextureQueryMs,
    TextureQueryMsPos,
    BufferQuery,
    BufferLoad,
    BufferStore,
    TypedUavLoad,
    TypedUavStore,
    Atomic,
    AtomicCounter,
    Barrier,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandFormat {
    pub kind: OperandKind,
    pub scalar: ScalarType,
}

/// Operand layout of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct InstFormat {
    pub operand_count: u32,
    pub class: InstClass,
    pub operands: [OperandFormat; MAX_OPERAND_COUNT],
}

pub const MAX_OPERAND_COUNT: usize = 8;

const FILL: OperandFormat = OperandFormat {
    kind: OperandKind::SrcReg,
    scalar: ScalarType::Uint32,
};

const fn dst(scalar: ScalarType) -> OperandFormat {
    OperandFormat {
        kind: OperandKind::DstReg,
        scalar,
    }
}

const fn src(scalar: ScalarType) -> OperandFormat {
    OperandFormat {
        kind: OperandKind::SrcReg,
        scalar,
    }
}

const fn imm(scalar: ScalarType) -> OperandFormat {
    OperandFormat {
        kind: OperandKind::Imm32,
        scalar,
    }
}

const fn row<const N: usize>(class: InstClass, ops: [OperandFormat; N]) -> InstFormat {
    let mut operands = [FILL; MAX_OPERAND_COUNT];
    let mut i = 0;
    while i < N {
        operands[i] = ops[i];
        i += 1;
    }
    InstFormat {
        operand_count: N as u32,
        class,
        operands,
    }
}

const fn none(class: InstClass) -> InstFormat {
    row(class, [])
}

/// Looks up the operand format for an opcode.
pub fn instruction_format(op: Opcode) -> &'static InstFormat {
    &INSTRUCTION_FORMATS[op as usize]
}

use InstClass::*;
use ScalarType::{Float32 as F32, Float64 as F64, Sint32 as I32, Uint32 as U32};

/// One row per opcode, indexed by opcode value.
static INSTRUCTION_FORMATS: [InstFormat; OPCODE_COUNT] = [
    /* Add                                  */ row(VectorAlu, [dst(F32), src(F32), src(F32)]),
    /* And                                  */ row(VectorAlu, [dst(U32), src(U32), src(U32)]),
    /* Break                                */ none(ControlFlow),
    /* Breakc                               */ row(ControlFlow, [src(U32)]),
    /* Call                                 */ row(ControlFlow, [src(U32)]),
    /* Callc                                */ row(ControlFlow, [src(U32), src(U32)]),
    /* Case                                 */ row(ControlFlow, [src(U32)]),
    /* Continue                             */ none(ControlFlow),
    /* Continuec                            */ row(ControlFlow, [src(U32)]),
    /* Cut                                  */ none(GeometryEmit),
    /* Default                              */ none(ControlFlow),
    /* DerivRtx                             */ row(VectorDeriv, [dst(F32), src(F32)]),
    /* DerivRty                             */ row(VectorDeriv, [dst(F32), src(F32)]),
    /* Discard                              */ row(ControlFlow, [src(U32)]),
    /* Div                                  */ row(VectorAlu, [dst(F32), src(F32), src(F32)]),
    /* Dp2                                  */ row(VectorDot, [dst(F32), src(F32), src(F32)]),
    /* Dp3                                  */ row(VectorDot, [dst(F32), src(F32), src(F32)]),
    /* Dp4                                  */ row(VectorDot, [dst(F32), src(F32), src(F32)]),
    /* Else                                 */ none(ControlFlow),
    /* Emit                                 */ none(GeometryEmit),
    /* EmitThenCut                          */ none(GeometryEmit),
    /* EndIf                                */ none(ControlFlow),
    /* EndLoop                              */ none(ControlFlow),
    /* EndSwitch                            */ none(ControlFlow),
    /* Eq                                   */ row(VectorCmp, [dst(U32), src(F32), src(F32)]),
    /* Exp                                  */ row(VectorAlu, [dst(F32), src(F32)]),
    /* Frc                                  */ row(VectorAlu, [dst(F32), src(F32)]),
    /* FtoI                                 */ row(VectorAlu, [dst(I32), src(F32)]),
    /* FtoU                                 */ row(VectorAlu, [dst(U32), src(F32)]),
    /* Ge                                   */ row(VectorCmp, [dst(U32), src(F32), src(F32)]),
    /* IAdd                                 */ row(VectorAlu, [dst(I32), src(I32), src(I32)]),
    /* If                                   */ row(ControlFlow, [src(U32)]),
    /* IEq                                  */ row(VectorCmp, [dst(I32), src(I32), src(I32)]),
    /* IGe                                  */ row(VectorCmp, [dst(I32), src(I32), src(I32)]),
    /* ILt                                  */ row(VectorCmp, [dst(I32), src(I32), src(I32)]),
    /* IMad                                 */ row(VectorAlu, [dst(I32), src(I32), src(I32), src(I32)]),
    /* IMax                                 */ row(VectorAlu, [dst(I32), src(I32), src(I32)]),
    /* IMin                                 */ row(VectorAlu, [dst(I32), src(I32), src(I32)]),
    /* IMul                                 */ row(VectorImul, [dst(I32), dst(I32), src(I32), src(I32)]),
    /* INe                                  */ row(VectorCmp, [dst(I32), src(I32), src(I32)]),
    /* INeg                                 */ row(VectorAlu, [dst(I32), src(I32)]),
    /* IShl                                 */ row(VectorShift, [dst(I32), src(I32), src(U32)]),
    /* IShr                                 */ row(VectorShift, [dst(I32), src(I32), src(U32)]),
    /* ItoF                                 */ row(VectorAlu, [dst(F32), src(I32)]),
    /* Label                                */ row(ControlFlow, [dst(U32)]),
    /* Ld                                   */ row(TextureFetch, [dst(F32), src(I32), src(F32)]),
    /* LdMs                                 */ row(TextureFetch, [dst(F32), src(I32), src(F32), src(I32)]),
    /* Log                                  */ row(VectorAlu, [dst(F32), src(F32)]),
    /* Loop                                 */ none(ControlFlow),
    /* Lt                                   */ row(VectorCmp, [dst(U32), src(F32), src(F32)]),
    /* Mad                                  */ row(VectorAlu, [dst(F32), src(F32), src(F32), src(F32)]),
    /* Min                                  */ row(VectorAlu, [dst(F32), src(F32), src(F32)]),
    /* Max                                  */ row(VectorAlu, [dst(F32), src(F32), src(F32)]),
    /* CustomData                           */ none(CustomData),
    /* Mov                                  */ row(VectorAlu, [dst(F32), src(F32)]),
    /* Movc                                 */ row(VectorCmov, [dst(F32), src(U32), src(F32), src(F32)]),
    /* Mul                                  */ row(VectorAlu, [dst(F32), src(F32), src(F32)]),
    /* Ne                                   */ row(VectorCmp, [dst(U32), src(F32), src(F32)]),
    /* Nop                                  */ none(NoOperation),
    /* Not                                  */ row(VectorAlu, [dst(U32), src(U32)]),
    /* Or                                   */ row(VectorAlu, [dst(U32), src(U32), src(U32)]),
    /* ResInfo                              */ row(TextureQuery, [dst(F32), src(I32), src(F32)]),
    /* Ret                                  */ none(ControlFlow),
    /* Retc                                 */ row(ControlFlow, [src(U32)]),
    /* RoundNe                              */ row(VectorAlu, [dst(F32), src(F32)]),
    /* RoundNi                              */ row(VectorAlu, [dst(F32), src(F32)]),
    /* RoundPi                              */ row(VectorAlu, [dst(F32), src(F32)]),
    /* RoundZ                               */ row(VectorAlu, [dst(F32), src(F32)]),
    /* Rsq                                  */ row(VectorAlu, [dst(F32), src(F32)]),
    /* Sample                               */ row(TextureSample, [dst(F32), src(F32), src(F32), src(F32)]),
    /* SampleC                              */ row(TextureSample, [dst(F32), src(F32), src(F32), src(F32), src(F32)]),
    /* SampleClz                            */ row(TextureSample, [dst(F32), src(F32), src(F32), src(F32), src(F32)]),
    /* SampleL                              */ row(TextureSample, [dst(F32), src(F32), src(F32), src(F32), src(F32)]),
    /* SampleD                              */ row(TextureSample, [dst(F32), src(F32), src(F32), src(F32), src(F32), src(F32)]),
    /* SampleB                              */ row(TextureSample, [dst(F32), src(F32), src(F32), src(F32), src(F32)]),
    /* Sqrt                                 */ row(VectorAlu, [dst(F32), src(F32)]),
    /* Switch                               */ row(ControlFlow, [src(U32)]),
    /* SinCos                               */ row(VectorSinCos, [dst(F32), dst(F32), src(F32)]),
    /* UDiv                                 */ row(VectorIdiv, [dst(U32), dst(U32), src(U32), src(U32)]),
    /* ULt                                  */ row(VectorCmp, [dst(U32), src(U32), src(U32)]),
    /* UGe                                  */ row(VectorCmp, [dst(U32), src(U32), src(U32)]),
    /* UMul                                 */ row(VectorImul, [dst(U32), dst(U32), src(U32), src(U32)]),
    /* UMad                                 */ row(VectorAlu, [dst(U32), src(U32), src(U32), src(U32)]),
    /* UMax                                 */ row(VectorAlu, [dst(U32), src(U32), src(U32)]),
    /* UMin                                 */ row(VectorAlu, [dst(U32), src(U32), src(U32)]),
    /* UShr                                 */ row(VectorShift, [dst(U32), src(U32), src(U32)]),
    /* UtoF                                 */ row(VectorAlu, [dst(F32), src(U32)]),
    /* Xor                                  */ row(VectorAlu, [dst(U32), src(U32), src(U32)]),
    /* DclResource                          */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclConstantBuffer                    */ row(Declaration, [dst(F32)]),
    /* DclSampler                           */ row(Declaration, [dst(F32)]),
    /* DclIndexRange                        */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclGsOutputPrimitiveTopology         */ none(Declaration),
    /* DclGsInputPrimitive                  */ none(Declaration),
    /* DclMaxOutputVertexCount              */ row(Declaration, [imm(U32)]),
    /* DclInput                             */ row(Declaration, [dst(F32)]),
    /* DclInputSgv                          */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclInputSiv                          */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclInputPs                           */ row(Declaration, [dst(F32)]),
    /* DclInputPsSgv                        */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclInputPsSiv                        */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclOutput                            */ row(Declaration, [dst(F32)]),
    /* DclOutputSgv                         */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclOutputSiv                         */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclTemps                             */ row(Declaration, [imm(U32)]),
    /* DclIndexableTemp                     */ row(Declaration, [imm(U32), imm(U32), imm(U32)]),
    /* DclGlobalFlags                       */ none(Declaration),
    /* Reserved0                            */ none(Undefined),
    /* Lod                                  */ row(TextureQueryLod, [dst(F32), src(F32), src(F32), src(F32)]),
    /* Gather4                              */ row(TextureGather, [dst(F32), src(F32), src(F32), src(F32)]),
    /* SamplePos                            */ row(TextureQueryMsPos, [dst(F32), src(U32), src(U32)]),
    /* SampleInfo                           */ row(TextureQueryMs, [dst(U32), src(F32)]),
    /* Reserved1                            */ none(Undefined),
    /* HsDecls                              */ none(HullShaderPhase),
    /* HsControlPointPhase                  */ none(HullShaderPhase),
    /* HsForkPhase                          */ none(HullShaderPhase),
    /* HsJoinPhase                          */ none(HullShaderPhase),
    /* EmitStream                           */ row(GeometryEmit, [dst(U32)]),
    /* CutStream                            */ row(GeometryEmit, [dst(U32)]),
    /* EmitThenCutStream                    */ row(GeometryEmit, [dst(U32)]),
    /* InterfaceCall                        */ none(Undefined),
    /* BufInfo                              */ row(BufferQuery, [dst(F32), src(I32)]),
    /* DerivRtxCoarse                       */ row(VectorDeriv, [dst(F32), src(F32)]),
    /* DerivRtxFine                         */ row(VectorDeriv, [dst(F32), src(F32)]),
    /* DerivRtyCoarse                       */ row(VectorDeriv, [dst(F32), src(F32)]),
    /* DerivRtyFine                         */ row(VectorDeriv, [dst(F32), src(F32)]),
    /* Gather4C                             */ row(TextureGather, [dst(F32), src(F32), src(F32), src(F32), src(F32)]),
    /* Gather4Po                            */ row(TextureGather, [dst(F32), src(F32), src(I32), src(F32), src(F32)]),
    /* Gather4PoC                           */ row(TextureGather, [dst(F32), src(F32), src(I32), src(F32), src(F32), src(F32)]),
    /* Rcp                                  */ row(VectorAlu, [dst(F32), src(F32)]),
    /* F32toF16                             */ row(ConvertFloat16, [dst(U32), src(F32)]),
    /* F16toF32                             */ row(ConvertFloat16, [dst(F32), src(U32)]),
    /* UAddc                                */ none(Undefined),
    /* USubb                                */ none(Undefined),
    /* CountBits                            */ row(VectorAlu, [dst(U32), src(U32)]),
    /* FirstBitHi                           */ row(BitScan, [dst(U32), src(U32)]),
    /* FirstBitLo                           */ row(BitScan, [dst(U32), src(U32)]),
    /* FirstBitShi                          */ row(BitScan, [dst(U32), src(U32)]),
    /* UBfe                                 */ row(BitExtract, [dst(U32), src(I32), src(I32), src(U32)]),
    /* IBfe                                 */ row(BitExtract, [dst(I32), src(I32), src(I32), src(I32)]),
    /* Bfi                                  */ row(BitInsert, [dst(U32), src(I32), src(I32), src(U32), src(U32)]),
    /* BfRev                                */ row(VectorAlu, [dst(U32), src(U32)]),
    /* Swapc                                */ row(VectorCmov, [dst(F32), dst(F32), src(U32), src(F32), src(F32)]),
    /* DclStream                            */ row(Declaration, [dst(U32)]),
    /* DclFunctionBody                      */ none(Undefined),
    /* DclFunctionTable                     */ none(Undefined),
    /* DclInterface                         */ none(Undefined),
    /* DclInputControlPointCount            */ none(Declaration),
    /* DclOutputControlPointCount           */ none(Declaration),
    /* DclTessDomain                        */ none(Declaration),
    /* DclTessPartitioning                  */ none(Declaration),
    /* DclTessOutputPrimitive               */ none(Declaration),
    /* DclHsMaxTessFactor                   */ row(Declaration, [imm(F32)]),
    /* DclHsForkPhaseInstanceCount          */ row(HullShaderInstCnt, [imm(U32)]),
    /* DclHsJoinPhaseInstanceCount          */ row(HullShaderInstCnt, [imm(U32)]),
    /* DclThreadGroup                       */ row(Declaration, [imm(U32), imm(U32), imm(U32)]),
    /* DclUavTyped                          */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclUavRaw                            */ row(Declaration, [dst(F32)]),
    /* DclUavStructured                     */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclThreadGroupSharedMemoryRaw        */ row(Declaration, [dst(F32), imm(U32)]),
    /* DclThreadGroupSharedMemoryStructured */ row(Declaration, [dst(F32), imm(U32), imm(U32)]),
    /* DclResourceRaw                       */ row(Declaration, [dst(F32)]),
    /* DclResourceStructured                */ row(Declaration, [dst(F32), imm(U32)]),
    /* LdUavTyped                           */ row(TypedUavLoad, [dst(F32), src(I32), src(U32)]),
    /* StoreUavTyped                        */ row(TypedUavStore, [dst(U32), src(I32), src(F32)]),
    /* LdRaw                                */ row(BufferLoad, [dst(U32), src(I32), src(U32)]),
    /* StoreRaw                             */ row(BufferStore, [dst(U32), src(I32), src(U32)]),
    /* LdStructured                         */ row(BufferLoad, [dst(U32), src(I32), src(I32), src(U32)]),
    /* StoreStructured                      */ row(BufferStore, [dst(U32), src(I32), src(I32), src(U32)]),
    /* AtomicAnd                            */ row(Atomic, [dst(U32), src(I32), src(U32)]),
    /* AtomicOr                             */ row(Atomic, [dst(U32), src(I32), src(U32)]),
    /* AtomicXor                            */ row(Atomic, [dst(U32), src(I32), src(U32)]),
    /* AtomicCmpStore                       */ row(Atomic, [dst(U32), src(I32), src(U32), src(U32)]),
    /* AtomicIAdd                           */ row(Atomic, [dst(U32), src(I32), src(U32)]),
    /* AtomicIMax                           */ row(Atomic, [dst(I32), src(I32), src(I32)]),
    /* AtomicIMin                           */ row(Atomic, [dst(I32), src(I32), src(I32)]),
    /* AtomicUMax                           */ row(Atomic, [dst(U32), src(I32), src(U32)]),
    /* AtomicUMin                           */ row(Atomic, [dst(U32), src(I32), src(U32)]),
    /* ImmAtomicAlloc                       */ row(AtomicCounter, [dst(U32), dst(U32)]),
    /* ImmAtomicConsume                     */ row(AtomicCounter, [dst(U32), dst(U32)]),
    /* ImmAtomicIAdd                        */ row(Atomic, [dst(U32), dst(U32), src(I32), src(U32)]),
    /* ImmAtomicAnd                         */ row(Atomic, [dst(U32), dst(U32), src(I32), src(U32)]),
    /* ImmAtomicOr                          */ row(Atomic, [dst(U32), dst(U32), src(I32), src(U32)]),
    /* ImmAtomicXor                         */ row(Atomic, [dst(U32), dst(U32), src(I32), src(U32)]),
    /* ImmAtomicExch                        */ row(Atomic, [dst(U32), dst(U32), src(I32), src(U32)]),
    /* ImmAtomicCmpExch                     */ row(Atomic, [dst(U32), dst(U32), src(I32), src(U32), src(U32)]),
    /* ImmAtomicIMax                        */ row(Atomic, [dst(I32), dst(I32), src(I32), src(I32)]),
    /* ImmAtomicIMin                        */ row(Atomic, [dst(I32), dst(I32), src(I32), src(I32)]),
    /* ImmAtomicUMax                        */ row(Atomic, [dst(U32), dst(U32), src(I32), src(U32)]),
    /* ImmAtomicUMin                        */ row(Atomic, [dst(U32), dst(U32), src(I32), src(U32)]),
    /* Sync                                 */ none(Barrier),
    /* DAdd                                 */ row(VectorAlu, [dst(F64), src(F64), src(F64)]),
    /* DMax                                 */ row(VectorAlu, [dst(F64), src(F64), src(F64)]),
    /* DMin                                 */ row(VectorAlu, [dst(F64), src(F64), src(F64)]),
    /* DMul                                 */ row(VectorAlu, [dst(F64), src(F64), src(F64)]),
    /* DEq                                  */ row(VectorCmp, [dst(U32), src(F64), src(F64)]),
    /* DGe                                  */ row(VectorCmp, [dst(U32), src(F64), src(F64)]),
    /* DLt                                  */ row(VectorCmp, [dst(U32), src(F64), src(F64)]),
    /* DNe                                  */ row(VectorCmp, [dst(U32), src(F64), src(F64)]),
    /* DMov                                 */ row(VectorAlu, [dst(F64), src(F64)]),
    /* DMovc                                */ row(VectorCmov, [dst(F64), src(U32), src(F64), src(F64)]),
    /* DtoF                                 */ row(ConvertFloat64, [dst(F32), src(F64)]),
    /* FtoD                                 */ row(ConvertFloat64, [dst(F64), src(F32)]),
    /* EvalSnapped                          */ row(Interpolate, [dst(F32), src(F32), src(F32)]),
    /* EvalSampleIndex                      */ row(Interpolate, [dst(F32), src(F32), src(I32)]),
    /* EvalCentroid                         */ row(Interpolate, [dst(F32), src(F32)]),
    /* DclGsInstanceCount                   */ row(Declaration, [imm(U32)]),
    /* Abort                                */ none(Undefined),
    /* DebugBreak                           */ none(Undefined),
    /* ReservedBegin11_1                    */ none(Undefined),
    /* DDiv                                 */ row(VectorAlu, [dst(F64), src(F64), src(F64)]),
    /* DFma                                 */ row(VectorAlu, [dst(F64), src(F64), src(F64), src(F64)]),
    /* DRcp                                 */ row(VectorAlu, [dst(F64), src(F64)]),
    /* Msad                                 */ row(VectorMsad, [dst(U32), src(U32), src(U32), src(U32)]),
    /* DtoI                                 */ row(ConvertFloat64, [dst(I32), src(F64)]),
    /* DtoU                                 */ row(ConvertFloat64, [dst(U32), src(F64)]),
    /* ItoD                                 */ row(ConvertFloat64, [dst(F64), src(I32)]),
    /* UtoD                                 */ row(ConvertFloat64, [dst(F64), src(U32)]),
];
