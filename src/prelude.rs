//! # memoscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the memoscope library. Import this module to get quick access to the essential
//! types for building modules and running the memoization pass.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all memoscope operations
pub use crate::Error;

/// The result type used throughout memoscope
pub use crate::Result;

// ================================================================================================
// Program Representation
// ================================================================================================

/// Modules, functions and their contents
pub use crate::ir::{
    BasicBlock, Function, FunctionFlags, GlobalVariable, Instruction, Linkage, Module, Opcode,
    Parameter,
};

/// Values and types
pub use crate::ir::{Constant, FuncId, GlobalId, InstId, IrType, TypeKind, Value};

/// Body construction
pub use crate::ir::FunctionBuilder;

// ================================================================================================
// Analysis
// ================================================================================================

/// Purity oracles
pub use crate::analysis::{AttributeOracle, PurityOracle, SideEffectAnalysis};

/// Call graph queries
pub use crate::analysis::{call_sites_of, CallGraph, CallSite};

// ================================================================================================
// Compiler
// ================================================================================================

/// Pass framework
pub use crate::compiler::{CompilerContext, EventKind, EventLog, ModulePass, PassScheduler};

/// Memoization pass and its configuration
pub use crate::compiler::{MemoizeConfig, MemoizePass, MemoizeReport, UncalledPolicy};

/// Classification and rewriting
pub use crate::compiler::{
    Approval, ApprovalBasis, CallSiteRewriter, EligibilityClassifier, Rejection, Verdict,
};

// ================================================================================================
// Metadata
// ================================================================================================

/// Descriptors and sinks
pub use crate::metadata::{CollectingSink, JsonLinesSink, MemoDescriptor, MetadataSink};
