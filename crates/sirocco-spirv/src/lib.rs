//! SPIR-V module assembly.
//!
//! [`Module`] builds a SPIR-V 1.x binary at the word level. Instructions are
//! appended to per-section buffers which [`Module::finalize`] concatenates
//! in the order the SPIR-V spec mandates, so callers can interleave type
//! declarations, decorations and function code freely. Types and constants
//! are deduplicated by scanning the already-emitted words; ids are handed
//! out by a monotonic counter starting at 1.
//!
//! Enum and opcode values come from the `spirv` headers crate; this crate
//! adds no opcode tables of its own.

mod code_buffer;
mod module;

pub use code_buffer::{CodeBuffer, Instruction};
pub use module::{ImageOperands, Module, SwitchCaseLabel};

pub use spirv::Word;
