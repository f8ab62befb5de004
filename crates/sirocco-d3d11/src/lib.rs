//! SM4/SM5 shader translation: decodes DXBC token streams and lowers them
//! to SPIR-V.
//!
//! The usual entry point is [`translate`], which takes a complete DXBC
//! container and produces a SPIR-V word stream plus the list of resource
//! bindings the module expects:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("shader.dxbc")?;
//! let options = sirocco_d3d11::TranslateOptions::default();
//! let shader = sirocco_d3d11::translate(&bytes, &options)?;
//! assert_eq!(shader.spirv[0], 0x0723_0203); // SPIR-V magic
//! # Ok(())
//! # }
//! ```
//!
//! The lower layers are exposed for tools and tests: [`sm4::decode`] turns
//! raw tokens into structured instructions without generating any code.

pub mod sm4;
pub mod translate;

pub use sirocco_dxbc::sm4::{ShaderModel, ShaderStage};
pub use sirocco_dxbc::{DxbcError, DxbcFile, FourCC};

pub use sm4::{Swizzle, WriteMask};

pub use translate::{
    default_resource_slot, translate, BindingClass, BindingKind, BindingSlot, TranslateError,
    TranslateOptions, TranslatedShader,
};
