//! Typed program representation.
//!
//! A deliberately small IR: a [`Module`] owns [`Function`]s and
//! [`GlobalVariable`]s, a function owns its [`BasicBlock`]s, and blocks own
//! [`Instruction`]s whose operands are [`Value`]s.
//!
//! ```text
//! Module ─┬─ GlobalVariable*       (value type, linkage)
//!         └─ Function*             (params, ret, flags, linkage)
//!               └─ BasicBlock*
//!                     └─ Instruction*  (InstId, Opcode, result type, metadata)
//!                           └─ Value*  Argument | Constant | Global | Result
//! ```
//!
//! Ids ([`FuncId`], [`GlobalId`]) are declaration-order indices. Bodies are
//! constructed with [`FunctionBuilder`].

mod block;
mod builder;
mod function;
mod global;
mod instruction;
mod module;
mod types;
mod value;

pub use block::BasicBlock;
pub use builder::FunctionBuilder;
pub use function::{Function, FunctionFlags, Linkage, Parameter, Use};
pub use global::GlobalVariable;
pub use instruction::{BinaryOp, BlockIndex, ComparePredicate, Instruction, Opcode};
pub use module::Module;
pub use types::{IrType, TypeKind};
pub use value::{Constant, FuncId, GlobalId, InstId, Value};
