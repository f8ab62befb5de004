//! SM4/SM5 token vocabulary: opcodes, operand types and the bit layout of
//! opcode and operand tokens.
//!
//! Bit-layout constants are exported so tests can assemble token streams by
//! hand; the decoder itself goes through [`crate::sm4::decode`].

use num_derive::FromPrimitive;

// Opcode token layout (word 0 of every instruction).
pub const OPCODE_MASK: u32 = 0x7ff;
pub const OPCODE_CONTROL_SHIFT: u32 = 11;
pub const OPCODE_CONTROL_MASK: u32 = 0x1fff;
pub const OPCODE_LEN_SHIFT: u32 = 24;
pub const OPCODE_LEN_MASK: u32 = 0x7f;
pub const OPCODE_EXTENDED_BIT: u32 = 1 << 31;
pub const OPCODE_SATURATE_BIT: u32 = 1 << 13;

// Extended opcode token layout.
pub const EXT_OPCODE_MASK: u32 = 0x3f;
pub const EXT_OPCODE_CONTROL_SHIFT: u32 = 6;

// Operand token layout.
pub const OPERAND_NUM_COMPONENTS_MASK: u32 = 0x3;
pub const OPERAND_SELECTION_MODE_SHIFT: u32 = 2;
pub const OPERAND_SELECTION_MODE_MASK: u32 = 0x3;
pub const OPERAND_COMPONENT_SELECTION_SHIFT: u32 = 4;
pub const OPERAND_COMPONENT_SELECTION_MASK: u32 = 0xff;
pub const OPERAND_TYPE_SHIFT: u32 = 12;
pub const OPERAND_TYPE_MASK: u32 = 0xff;
pub const OPERAND_INDEX_DIMENSION_SHIFT: u32 = 20;
pub const OPERAND_INDEX_DIMENSION_MASK: u32 = 0x3;
pub const OPERAND_INDEX0_REP_SHIFT: u32 = 22;
pub const OPERAND_INDEX1_REP_SHIFT: u32 = 25;
pub const OPERAND_INDEX2_REP_SHIFT: u32 = 28;
pub const OPERAND_INDEX_REP_MASK: u32 = 0x7;
pub const OPERAND_EXTENDED_BIT: u32 = 1 << 31;

// Component selection modes for 4-component operands.
pub const OPERAND_SEL_MASK: u32 = 0;
pub const OPERAND_SEL_SWIZZLE: u32 = 1;
pub const OPERAND_SEL_SELECT1: u32 = 2;

// Index representations.
pub const OPERAND_INDEX_REP_IMMEDIATE32: u32 = 0;
pub const OPERAND_INDEX_REP_IMMEDIATE64: u32 = 1;
pub const OPERAND_INDEX_REP_RELATIVE: u32 = 2;
pub const OPERAND_INDEX_REP_IMMEDIATE32_RELATIVE: u32 = 3;
pub const OPERAND_INDEX_REP_IMMEDIATE64_RELATIVE: u32 = 4;

// Extended operand token layout.
pub const OPERAND_EXT_TYPE_MASK: u32 = 0x3f;
pub const OPERAND_EXT_MODIFIER_SHIFT: u32 = 6;
pub const OPERAND_EXT_MODIFIER_MASK: u32 = 0xff;

/// SM4/SM5 instruction opcodes (low 11 bits of the opcode token).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u32)]
pub enum Opcode {
    Add = 0,
    And = 1,
    Break = 2,
    Breakc = 3,
    Call = 4,
    Callc = 5,
    Case = 6,
    Continue = 7,
    Continuec = 8,
    Cut = 9,
    Default = 10,
    DerivRtx = 11,
    DerivRty = 12,
    Discard = 13,
    Div = 14,
    Dp2 = 15,
    Dp3 = 16,
    Dp4 = 17,
    Else = 18,
    Emit = 19,
    EmitThenCut = 20,
    EndIf = 21,
    EndLoop = 22,
    EndSwitch = 23,
    Eq = 24,
    Exp = 25,
    Frc = 26,
    FtoI = 27,
    FtoU = 28,
    Ge = 29,
    IAdd = 30,
    If = 31,
    IEq = 32,
    IGe = 33,
    ILt = 34,
    IMad = 35,
    IMax = 36,
    IMin = 37,
    IMul = 38,
    INe = 39,
    INeg = 40,
    IShl = 41,
    IShr = 42,
    ItoF = 43,
    Label = 44,
    Ld = 45,
    LdMs = 46,
    Log = 47,
    Loop = 48,
    Lt = 49,
    Mad = 50,
    Min = 51,
    Max = 52,
    CustomData = 53,
    Mov = 54,
    Movc = 55,
    Mul = 56,
    Ne = 57,
    Nop = 58,
    Not = 59,
    Or = 60,
    ResInfo = 61,
    Ret = 62,
    Retc = 63,
    RoundNe = 64,
    RoundNi = 65,
    RoundPi = 66,
    RoundZ = 67,
    Rsq = 68,
    Sample = 69,
    SampleC = 70,
    SampleClz = 71,
    SampleL = 72,
    SampleD = 73,
    SampleB = 74,
    Sqrt = 75,
    Switch = 76,
    SinCos = 77,
    UDiv = 78,
    ULt = 79,
    UGe = 80,
    UMul = 81,
    UMad = 82,
    UMax = 83,
    UMin = 84,
    UShr = 85,
    UtoF = 86,
    Xor = 87,
    DclResource = 88,
    DclConstantBuffer = 89,
    DclSampler = 90,
    DclIndexRange = 91,
    DclGsOutputPrimitiveTopology = 92,
    DclGsInputPrimitive = 93,
    DclMaxOutputVertexCount = 94,
    DclInput = 95,
    DclInputSgv = 96,
    DclInputSiv = 97,
    DclInputPs = 98,
    DclInputPsSgv = 99,
    DclInputPsSiv = 100,
    DclOutput = 101,
    DclOutputSgv = 102,
    DclOutputSiv = 103,
    DclTemps = 104,
    DclIndexableTemp = 105,
    DclGlobalFlags = 106,
    Reserved0 = 107,
    Lod = 108,
    Gather4 = 109,
    SamplePos = 110,
    SampleInfo = 111,
    Reserved1 = 112,
    HsDecls = 113,
    HsControlPointPhase = 114,
    HsForkPhase = 115,
    HsJoinPhase = 116,
    EmitStream = 117,
    CutStream = 118,
    EmitThenCutStream = 119,
    InterfaceCall = 120,
    BufInfo = 121,
    DerivRtxCoarse = 122,
    DerivRtxFine = 123,
    DerivRtyCoarse = 124,
    DerivRtyFine = 125,
    Gather4C = 126,
    Gather4Po = 127,
    Gather4PoC = 128,
    Rcp = 129,
    F32toF16 = 130,
    F16toF32 = 131,
    UAddc = 132,
    USubb = 133,
    CountBits = 134,
    FirstBitHi = 135,
    FirstBitLo = 136,
    FirstBitShi = 137,
    UBfe = 138,
    IBfe = 139,
    Bfi = 140,
    BfRev = 141,
    Swapc = 142,
    DclStream = 143,
    DclFunctionBody = 144,
    DclFunctionTable = 145,
    DclInterface = 146,
    DclInputControlPointCount = 147,
    DclOutputControlPointCount = 148,
    DclTessDomain = 149,
    DclTessPartitioning = 150,
    DclTessOutputPrimitive = 151,
    DclHsMaxTessFactor = 152,
    DclHsForkPhaseInstanceCount = 153,
    DclHsJoinPhaseInstanceCount = 154,
    DclThreadGroup = 155,
    DclUavTyped = 156,
    DclUavRaw = 157,
    DclUavStructured = 158,
    DclThreadGroupSharedMemoryRaw = 159,
    DclThreadGroupSharedMemoryStructured = 160,
    DclResourceRaw = 161,
    DclResourceStructured = 162,
    LdUavTyped = 163,
    StoreUavTyped = 164,
    LdRaw = 165,
    StoreRaw = 166,
    LdStructured = 167,
    StoreStructured = 168,
    AtomicAnd = 169,
    AtomicOr = 170,
    AtomicXor = 171,
    AtomicCmpStore = 172,
    AtomicIAdd = 173,
    AtomicIMax = 174,
    AtomicIMin = 175,
    AtomicUMax = 176,
    AtomicUMin = 177,
    ImmAtomicAlloc = 178,
    ImmAtomicConsume = 179,
    ImmAtomicIAdd = 180,
    ImmAtomicAnd = 181,
    ImmAtomicOr = 182,
    ImmAtomicXor = 183,
    ImmAtomicExch = 184,
    ImmAtomicCmpExch = 185,
    ImmAtomicIMax = 186,
    ImmAtomicIMin = 187,
    ImmAtomicUMax = 188,
    ImmAtomicUMin = 189,
    Sync = 190,
    DAdd = 191,
    DMax = 192,
    DMin = 193,
    DMul = 194,
    DEq = 195,
    DGe = 196,
    DLt = 197,
    DNe = 198,
    DMov = 199,
    DMovc = 200,
    DtoF = 201,
    FtoD = 202,
    EvalSnapped = 203,
    EvalSampleIndex = 204,
    EvalCentroid = 205,
    DclGsInstanceCount = 206,
    Abort = 207,
    DebugBreak = 208,
    ReservedBegin11_1 = 209,
    DDiv = 210,
    DFma = 211,
    DRcp = 212,
    Msad = 213,
    DtoI = 214,
    DtoU = 215,
    ItoD = 216,
    UtoD = 217,
}

pub const OPCODE_COUNT: usize = 218;

/// Extended opcode token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum ExtOpcode {
    Empty = 0,
    SampleControls = 1,
    ResourceDim = 2,
    ResourceReturnType = 3,
}

/// Register file / operand source selected by an operand token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u32)]
pub enum OperandType {
    Temp = 0,
    Input = 1,
    Output = 2,
    IndexableTemp = 3,
    Imm32 = 4,
    Imm64 = 5,
    Sampler = 6,
    Resource = 7,
    ConstantBuffer = 8,
    ImmediateConstantBuffer = 9,
    Label = 10,
    InputPrimitiveId = 11,
    OutputDepth = 12,
    Null = 13,
    Rasterizer = 14,
    OutputCoverageMask = 15,
    Stream = 16,
    FunctionBody = 17,
    FunctionTable = 18,
    Interface = 19,
    FunctionInput = 20,
    FunctionOutput = 21,
    OutputControlPointId = 22,
    InputForkInstanceId = 23,
    InputJoinInstanceId = 24,
    InputControlPoint = 25,
    OutputControlPoint = 26,
    InputPatchConstant = 27,
    InputDomainPoint = 28,
    ThisPointer = 29,
    UnorderedAccessView = 30,
    ThreadGroupSharedMemory = 31,
    InputThreadId = 32,
    InputThreadGroupId = 33,
    InputThreadIdInGroup = 34,
    InputCoverageMask = 35,
    InputThreadIndexInGroup = 36,
    InputGsInstanceId = 37,
    OutputDepthGe = 38,
    OutputDepthLe = 39,
    CycleCounter = 40,
    OutputStencilRef = 41,
}

/// Operand component count code (bits 0..1 of the operand token).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum ComponentCount {
    C0 = 0,
    C1 = 1,
    C4 = 2,
}

/// Source operand modifier from an extended operand token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperandModifier {
    #[default]
    None,
    Neg,
    Abs,
    AbsNeg,
}

impl OperandModifier {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(OperandModifier::None),
            1 => Some(OperandModifier::Neg),
            2 => Some(OperandModifier::Abs),
            3 => Some(OperandModifier::AbsNeg),
            _ => None,
        }
    }

    pub fn has_neg(self) -> bool {
        matches!(self, OperandModifier::Neg | OperandModifier::AbsNeg)
    }

    pub fn has_abs(self) -> bool {
        matches!(self, OperandModifier::Abs | OperandModifier::AbsNeg)
    }
}

/// Scalar interpretation of a register component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Float32,
    Float64,
    Bool,
}

/// Resource shape from a `dcl_resource`-family instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum ResourceDim {
    Unknown = 0,
    Buffer = 1,
    Texture1D = 2,
    Texture2D = 3,
    Texture2DMs = 4,
    Texture3D = 5,
    TextureCube = 6,
    Texture1DArr = 7,
    Texture2DArr = 8,
    Texture2DMsArr = 9,
    TextureCubeArr = 10,
    RawBuffer = 11,
    StructuredBuffer = 12,
}

/// Per-component data type of resource read results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum ResourceReturnType {
    Unorm = 1,
    Snorm = 2,
    Sint = 3,
    Uint = 4,
    Float = 5,
    Mixed = 6,
    Double = 7,
    Continued = 8,
    Unused = 9,
}

/// System values attached to signature elements and `dcl_*_s?v`
/// declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum SystemValue {
    None = 0,
    Position = 1,
    ClipDistance = 2,
    CullDistance = 3,
    RenderTargetId = 4,
    ViewportId = 5,
    VertexId = 6,
    PrimitiveId = 7,
    InstanceId = 8,
    IsFrontFace = 9,
    SampleIndex = 10,
    FinalQuadUeq0EdgeTessFactor = 11,
    FinalQuadVeq0EdgeTessFactor = 12,
    FinalQuadUeq1EdgeTessFactor = 13,
    FinalQuadVeq1EdgeTessFactor = 14,
    FinalQuadUInsideTessFactor = 15,
    FinalQuadVInsideTessFactor = 16,
    FinalTriUeq0EdgeTessFactor = 17,
    FinalTriVeq0EdgeTessFactor = 18,
    FinalTriWeq0EdgeTessFactor = 19,
    FinalTriInsideTessFactor = 20,
    FinalLineDetailTessFactor = 21,
    FinalLineDensityTessFactor = 22,
    Target = 64,
    Depth = 65,
    Coverage = 66,
    DepthGe = 67,
    DepthLe = 68,
}

/// Pixel shader input interpolation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum InterpolationMode {
    Undefined = 0,
    Constant = 1,
    Linear = 2,
    LinearCentroid = 3,
    LinearNoPerspective = 4,
    LinearNoPerspectiveCentroid = 5,
    LinearSample = 6,
    LinearNoPerspectiveSample = 7,
}

/// Zero test for conditional instructions (`if_z` / `if_nz` etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroTest {
    TestZ,
    TestNz,
}

/// Return type control of the `resinfo` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResinfoType {
    Float,
    RcpFloat,
    Uint,
}

bitflags::bitflags! {
    /// `dcl_globalFlags` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GlobalFlags: u32 {
        const REFACTORING_ALLOWED    = 1 << 0;
        const DOUBLE_PRECISION       = 1 << 1;
        const EARLY_FRAGMENT_TESTS   = 1 << 2;
        const RAW_STRUCTURED_BUFFERS = 1 << 3;
    }
}

bitflags::bitflags! {
    /// `sync` instruction flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SyncFlags: u32 {
        const THREADS_IN_GROUP          = 1 << 0;
        const THREAD_GROUP_SHARED_MEMORY = 1 << 1;
        const UAV_MEMORY_GROUP          = 1 << 2;
        const UAV_MEMORY_GLOBAL         = 1 << 3;
    }
}

/// Geometry shader input primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum Primitive {
    Undefined = 0,
    Point = 1,
    Line = 2,
    Triangle = 3,
    LineAdj = 6,
    TriangleAdj = 7,
}

impl Primitive {
    /// Number of vertices per input primitive.
    pub fn vertex_count(self) -> u32 {
        match self {
            Primitive::Undefined => 0,
            Primitive::Point => 1,
            Primitive::Line => 2,
            Primitive::Triangle => 3,
            Primitive::LineAdj => 4,
            Primitive::TriangleAdj => 6,
        }
    }
}

/// Geometry shader output topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum PrimitiveTopology {
    Undefined = 0,
    PointList = 1,
    LineList = 2,
    LineStrip = 3,
    TriangleList = 4,
    TriangleStrip = 5,
    LineListAdj = 10,
    LineStripAdj = 11,
    TriangleListAdj = 12,
    TriangleStripAdj = 13,
}

/// Tessellator domain (`dcl_tessellator_domain`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum TessDomain {
    Undefined = 0,
    Isolines = 1,
    Triangles = 2,
    Quads = 3,
}

/// Tessellator partitioning (`dcl_tessellator_partitioning`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum TessPartitioning {
    Undefined = 0,
    Integer = 1,
    Pow2 = 2,
    FractOdd = 3,
    FractEven = 4,
}

/// Tessellator output primitive (`dcl_tessellator_output_primitive`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum TessOutputPrimitive {
    Undefined = 0,
    Point = 1,
    Line = 2,
    TriangleCw = 3,
    TriangleCcw = 4,
}

/// Payload class of a `CustomData` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum CustomDataClass {
    Comment = 0,
    DebugInfo = 1,
    Opaque = 2,
    ImmConstBuf = 3,
}

/// Instruction-specific control bits (bits 11..23 of the opcode token).
///
/// Which accessors are meaningful depends on the instruction; the raw token
/// is kept so each instruction handler extracts what it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpcodeControls(pub u32);

impl OpcodeControls {
    fn bits(self, lo: u32, hi: u32) -> u32 {
        (self.0 >> lo) & ((1 << (hi - lo + 1)) - 1)
    }

    /// Conditional instructions: pass on zero vs. non-zero.
    pub fn zero_test(self) -> ZeroTest {
        if self.bits(18, 18) != 0 {
            ZeroTest::TestNz
        } else {
            ZeroTest::TestZ
        }
    }

    /// `sync` flag bits.
    pub fn sync_flags(self) -> SyncFlags {
        SyncFlags::from_bits_truncate(self.bits(11, 14))
    }

    /// Resource dimension of `dcl_resource` / `dcl_uav_typed`.
    pub fn resource_dim(self) -> Option<ResourceDim> {
        num_traits::FromPrimitive::from_u32(self.bits(11, 15))
    }

    /// Sample count encoded alongside multisampled resource dims.
    pub fn resource_sample_count(self) -> u32 {
        self.bits(16, 22)
    }

    /// `resinfo` return type.
    pub fn resinfo_type(self) -> ResinfoType {
        match self.bits(11, 12) {
            1 => ResinfoType::RcpFloat,
            2 => ResinfoType::Uint,
            _ => ResinfoType::Float,
        }
    }

    /// `sampleinfo` return type: uint when set, float otherwise.
    pub fn returns_uint(self) -> bool {
        self.bits(11, 11) != 0
    }

    /// Interpolation mode of `dcl_input_ps*`.
    pub fn interpolation(self) -> InterpolationMode {
        num_traits::FromPrimitive::from_u32(self.bits(11, 14))
            .unwrap_or(InterpolationMode::Undefined)
    }

    /// `dcl_globalFlags` bits.
    pub fn global_flags(self) -> GlobalFlags {
        GlobalFlags::from_bits_truncate(self.bits(11, 14))
    }

    /// UAV declarations: globally coherent access.
    pub fn uav_globally_coherent(self) -> bool {
        self.bits(16, 16) != 0
    }

    /// Geometry shader input primitive of `dcl_inputPrimitive`.
    pub fn gs_input_primitive(self) -> Option<Primitive> {
        num_traits::FromPrimitive::from_u32(self.bits(11, 16))
    }

    /// Output topology of `dcl_outputTopology`.
    pub fn gs_output_topology(self) -> Option<PrimitiveTopology> {
        num_traits::FromPrimitive::from_u32(self.bits(11, 16))
    }

    /// Tessellator domain of `dcl_tessellator_domain`.
    pub fn tess_domain(self) -> Option<TessDomain> {
        num_traits::FromPrimitive::from_u32(self.bits(11, 12))
    }

    /// Tessellator partitioning of `dcl_tessellator_partitioning`.
    pub fn tess_partitioning(self) -> Option<TessPartitioning> {
        num_traits::FromPrimitive::from_u32(self.bits(11, 13))
    }

    /// Tessellator output primitive.
    pub fn tess_output_primitive(self) -> Option<TessOutputPrimitive> {
        num_traits::FromPrimitive::from_u32(self.bits(11, 13))
    }

    /// Control point count of `dcl_input/output_control_point_count`.
    pub fn control_point_count(self) -> u32 {
        self.bits(11, 16)
    }
}
