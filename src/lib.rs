// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # memoscope
//!
//! A compile-time function memoization pass. Given a program lowered to a
//! small SSA-style IR, `memoscope` decides which functions can have their
//! calls replaced by cache lookups, and rewrites the program so that every
//! call of such a function goes through a `_memoized__<name>` entry point with
//! a canonical, type-sorted parameter list. Literal arguments are folded out
//! of the runtime parameters into a symbolic key, and one descriptor per
//! memoized function is handed to a downstream cache generator.
//!
//! ## Features
//!
//! - **Eligibility classification** - structural, pointer-argument, global-state
//!   and call-graph checks with a bounded, depth-threaded recursive walk
//! - **Canonical signatures** - explicit parameters plus free globals, sorted
//!   by a total order over types
//! - **Constant folding** - literals passed at every call site become key
//!   fragments instead of runtime arguments
//! - **Plan-then-commit rewriting** - a failed rewrite leaves the module unchanged
//! - **Descriptor sinks** - in-memory collection or JSON lines
//!
//! ## Quick Start
//!
//! ```rust
//! use memoscope::prelude::*;
//!
//! # fn main() -> memoscope::Result<()> {
//! let mut module = Module::new("unit");
//! let g = module.add_global(GlobalVariable::new("g", IrType::i32()));
//!
//! let add = module.add_function(Function::new(
//!     "add",
//!     vec![
//!         Parameter::new("a", IrType::i32()),
//!         Parameter::new("b", IrType::ptr(IrType::i32())),
//!     ],
//!     IrType::i32(),
//! ))?;
//! FunctionBuilder::define(&mut module, add, |f| {
//!     f.block("entry");
//!     let (a, b) = (f.arg(0), f.arg(1));
//!     let b = f.load(b);
//!     let g = f.load(Value::Global(g));
//!     let sum = f.add(a, b);
//!     let sum = f.add(sum, g);
//!     f.ret(sum);
//! })?;
//!
//! let main = module.add_function(Function::new("main", Vec::new(), IrType::i32()))?;
//! FunctionBuilder::define(&mut module, main, |f| {
//!     f.block("entry");
//!     let y = f.alloca(IrType::i32());
//!     let r = f.call(add, vec![Value::i32(3), y]);
//!     f.ret(r);
//! })?;
//!
//! let mut ctx = CompilerContext::new();
//! MemoizePass::new().run_on_module(&mut module, &mut ctx)?;
//!
//! let descriptor = &ctx.descriptors()[0];
//! assert_eq!(descriptor.memoized_name, "_memoized__add");
//! assert_eq!(descriptor.constant_key_fragments, vec!["3"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - the program representation: modules, functions, blocks, values
//! - [`analysis`] - call graph, free globals, purity oracles
//! - [`compiler`] - pass framework, event log and the memoization pass
//! - [`metadata`] - descriptors and sinks for the downstream cache generator
//! - [`prelude`] - convenient re-exports
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! A function that cannot be memoized is not an error; the classifier reports
//! a [`compiler::Rejection`] with a stable reason tag. Errors are reserved for
//! inconsistent IR, stale approvals and sink failures:
//!
//! ```rust
//! use memoscope::{compiler::MemoizePass, compiler::CompilerContext, ir::Module, Error};
//!
//! let mut module = Module::new("unit");
//! match MemoizePass::new().run_on_module(&mut module, &mut CompilerContext::new()) {
//!     Ok(report) => println!("memoized {} functions", report.memoized_count()),
//!     Err(Error::ArityMismatch { caller, callee, .. }) => println!("{caller} miscalls {callee}"),
//!     Err(e) => println!("error: {e}"),
//! }
//! ```
//!
//! ## Logging
//!
//! Trace output goes through [`tracing`]: the program unit and each memoized
//! function at `info`, visits, recognitions and rejections at `debug`. The same
//! information is recorded in the [`compiler::EventLog`] of the
//! [`compiler::CompilerContext`].

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use memoscope::prelude::*;
///
/// let module = Module::new("unit");
/// let pass = MemoizePass::with_config(MemoizeConfig::default());
/// assert_eq!(pass.config().max_call_depth, 10);
/// # let _ = module;
/// ```
pub mod prelude;

/// Program representation consumed and rewritten by the passes.
///
/// # Key Types
///
/// - [`ir::Module`] - functions and globals in declaration order
/// - [`ir::Function`] - parameters, flags, linkage and basic blocks
/// - [`ir::Instruction`] / [`ir::Opcode`] - operations and their operands
/// - [`ir::Value`] - arguments, constants, globals and instruction results
/// - [`ir::FunctionBuilder`] - programmatic body construction
pub mod ir;

/// Read-only analyses over the program representation.
pub mod analysis;

/// Pass framework and the memoization pass.
pub mod compiler;

/// Memoization descriptors and their sinks.
pub mod metadata;

/// `memoscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `memoscope` Error type
///
/// The main error type for all operations in this crate. See
/// [`compiler::Rejection`] for ineligibility, which is not an error.
pub use error::Error;
