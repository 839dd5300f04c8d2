//! Program analysis over the [`ir`](crate::ir).
//!
//! These are read-only queries shared by the passes in [`crate::compiler`]:
//!
//! - [`callgraph`] - direct call edges and call-site enumeration
//! - [`globals`] - free-global collection and pointer-argument escape checks
//! - [`purity`] - side-effect oracles
//!
//! # Usage
//!
//! ```rust
//! use memoscope::analysis::{CallGraph, PurityOracle, SideEffectAnalysis};
//! use memoscope::ir::{Function, IrType, Module};
//!
//! # fn main() -> memoscope::Result<()> {
//! let mut module = Module::new("unit");
//! let ext = module.add_function(Function::new("ext", Vec::new(), IrType::Void))?;
//!
//! let purity = SideEffectAnalysis::analyze(&module);
//! assert!(!purity.is_side_effect_free(&module, ext));
//! assert!(CallGraph::build(&module).is_uncalled(ext));
//! # Ok(())
//! # }
//! ```

pub mod callgraph;
pub mod globals;
pub mod purity;

pub use callgraph::{call_sites_of, CallGraph, CallSite};
pub use globals::{
    escaping_pointer_arguments, pointer_argument_is_safe, referenced_globals, GlobalAccess,
};
pub use purity::{AttributeOracle, PurityOracle, SideEffectAnalysis};
