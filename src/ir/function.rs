//! Functions, parameters, attribute flags and linkage.
//!
//! A [`Function`] is a *declaration* when it has no basic blocks and a
//! *definition* otherwise. Attribute bits live in [`FunctionFlags`]; the
//! [`Linkage`] decides whether the body seen here is the one that runs.
//!
//! # Use Queries
//!
//! Values do not track their users. [`Function::uses_of`] scans the body in
//! block and instruction order, returning one [`Use`] per operand slot that
//! holds the value, and [`Function::replace_all_uses`] rewrites those slots.

use std::fmt;

use bitflags::bitflags;
use strum::IntoStaticStr;

use crate::ir::{BasicBlock, FuncId, InstId, Instruction, IrType, Opcode, Value};

bitflags! {
    /// Function attribute flags.
    ///
    /// The purity attributes mirror what an optimizer front end infers:
    ///
    /// - [`SPECULATABLE`](Self::SPECULATABLE) - may be executed speculatively,
    ///   so it has no side effects and no undefined behavior
    /// - [`READ_NONE`](Self::READ_NONE) - does not read or write memory
    /// - [`WILL_RETURN`](Self::WILL_RETURN) - always returns to its caller
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u32 {
        /// Accepts a variable number of arguments.
        const VARARG = 0x0001;
        /// Compiler intrinsic.
        const INTRINSIC = 0x0002;
        /// Safe to execute speculatively.
        const SPECULATABLE = 0x0004;
        /// Neither reads nor writes memory.
        const READ_NONE = 0x0008;
        /// Always returns.
        const WILL_RETURN = 0x0010;
        /// Synthesized memoized entry point.
        const MEMO_ENTRY = 0x0100;
    }
}

/// Link-time linkage of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Linkage {
    /// Visible only within the defining unit, not in the symbol table.
    Private,
    /// Visible only within the defining unit.
    Internal,
    /// Globally visible; exactly one definition exists.
    #[default]
    External,
    /// An externally provided definition may replace this copy.
    AvailableExternally,
    /// Merged with equally named definitions; any copy may win.
    LinkOnce,
    /// Merged with equally named definitions known to be equivalent.
    LinkOnceOdr,
    /// May be replaced by a strong definition elsewhere.
    Weak,
    /// Weak, but all definitions are known to be equivalent.
    WeakOdr,
    /// Tentative definition.
    Common,
    /// Weak reference that may resolve to nothing.
    ExternWeak,
}

impl Linkage {
    /// Returns `true` if the definition in this unit may be replaced at link
    /// time by a different one.
    ///
    /// The `*_odr` flavours are exempt: every replacement is guaranteed to
    /// behave identically.
    #[must_use]
    pub const fn may_be_overridden(self) -> bool {
        match self {
            Self::Private
            | Self::Internal
            | Self::External
            | Self::LinkOnceOdr
            | Self::WeakOdr => false,
            Self::AvailableExternally
            | Self::LinkOnce
            | Self::Weak
            | Self::Common
            | Self::ExternWeak => true,
        }
    }

    /// Returns the linkage keyword.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name (may be empty).
    pub name: String,
    /// Parameter type.
    pub ty: IrType,
}

impl Parameter {
    /// Creates a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One operand slot holding a particular value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    /// Block containing the user.
    pub block: usize,
    /// Index of the user within the block.
    pub index: usize,
    /// Position of the value in the user's operand list.
    pub operand: usize,
}

/// A function declaration or definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    id: FuncId,
    name: String,
    params: Vec<Parameter>,
    ret: IrType,
    flags: FunctionFlags,
    linkage: Linkage,
    blocks: Vec<BasicBlock>,
    next_inst: u32,
}

impl Function {
    /// Creates a bodiless function with external linkage.
    ///
    /// The id is assigned by [`Module::add_function`](crate::ir::Module::add_function).
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<Parameter>, ret: IrType) -> Self {
        Self {
            id: FuncId(0),
            name: name.into(),
            params,
            ret,
            flags: FunctionFlags::empty(),
            linkage: Linkage::External,
            blocks: Vec::new(),
            next_inst: 0,
        }
    }

    /// Builder-style flag setter.
    #[must_use]
    pub fn with_flags(mut self, flags: FunctionFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Builder-style linkage setter.
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub(crate) fn set_id(&mut self, id: FuncId) {
        self.id = id;
    }

    /// Returns the function id.
    #[must_use]
    pub const fn id(&self) -> FuncId {
        self.id
    }

    /// Returns the symbol name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the formal parameters.
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Returns the parameter at `index`.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    /// Returns the return type.
    #[must_use]
    pub const fn return_type(&self) -> &IrType {
        &self.ret
    }

    /// Returns the attribute flags.
    #[must_use]
    pub const fn flags(&self) -> FunctionFlags {
        self.flags
    }

    /// Returns mutable access to the attribute flags.
    pub fn flags_mut(&mut self) -> &mut FunctionFlags {
        &mut self.flags
    }

    /// Returns the linkage.
    #[must_use]
    pub const fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Returns `true` if the function has no body.
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns `true` if the function accepts variadic arguments.
    #[must_use]
    pub const fn is_vararg(&self) -> bool {
        self.flags.contains(FunctionFlags::VARARG)
    }

    /// Returns `true` for compiler intrinsics.
    #[must_use]
    pub const fn is_intrinsic(&self) -> bool {
        self.flags.contains(FunctionFlags::INTRINSIC)
    }

    /// Returns `true` if another definition may replace this one at link time.
    #[must_use]
    pub const fn may_be_overridden(&self) -> bool {
        self.linkage.may_be_overridden()
    }

    /// Returns `true` if this is a non-variadic function taking exactly
    /// `params` and returning `ret`.
    #[must_use]
    pub fn same_signature(&self, params: &[IrType], ret: &IrType) -> bool {
        self.ret == *ret
            && !self.is_vararg()
            && self.params.len() == params.len()
            && self.params.iter().zip(params).all(|(p, ty)| p.ty == *ty)
    }

    /// Returns the basic blocks.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns mutable access to the basic blocks.
    pub fn blocks_mut(&mut self) -> &mut Vec<BasicBlock> {
        &mut self.blocks
    }

    /// Returns the block at `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> Option<&BasicBlock> {
        self.blocks.get(index)
    }

    /// Appends a block and returns its index.
    pub fn add_block(&mut self, block: BasicBlock) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    pub(crate) const fn next_inst(&self) -> u32 {
        self.next_inst
    }

    pub(crate) fn extend_body(&mut self, blocks: Vec<BasicBlock>, next_inst: u32) {
        self.blocks.extend(blocks);
        self.next_inst = self.next_inst.max(next_inst);
    }

    /// Allocates a fresh instruction id.
    pub fn fresh_inst_id(&mut self) -> InstId {
        let id = InstId(self.next_inst);
        self.next_inst += 1;
        id
    }

    /// Returns the instruction at `(block, index)`.
    #[must_use]
    pub fn instruction(&self, block: usize, index: usize) -> Option<&Instruction> {
        self.blocks.get(block)?.instructions().get(index)
    }

    /// Returns the instruction producing `id`.
    #[must_use]
    pub fn instruction_by_id(&self, id: InstId) -> Option<&Instruction> {
        self.iter_instructions()
            .find(|(_, _, inst)| inst.id() == id)
            .map(|(_, _, inst)| inst)
    }

    /// Iterates over all instructions as `(block, index, instruction)`.
    pub fn iter_instructions(&self) -> impl Iterator<Item = (usize, usize, &Instruction)> + '_ {
        self.blocks.iter().enumerate().flat_map(|(block_idx, block)| {
            block
                .instructions()
                .iter()
                .enumerate()
                .map(move |(instr_idx, inst)| (block_idx, instr_idx, inst))
        })
    }

    /// Returns every operand slot holding `value`, in body order.
    #[must_use]
    pub fn uses_of(&self, value: &Value) -> Vec<Use> {
        let mut uses = Vec::new();
        for (block, index, inst) in self.iter_instructions() {
            for (operand, op) in inst.op().operands().into_iter().enumerate() {
                if op == value {
                    uses.push(Use {
                        block,
                        index,
                        operand,
                    });
                }
            }
        }
        uses
    }

    /// Rewrites every operand slot holding `from` to hold `to`.
    ///
    /// Returns the number of rewritten slots.
    pub fn replace_all_uses(&mut self, from: &Value, to: &Value) -> usize {
        let mut replaced = 0;
        for block in &mut self.blocks {
            for inst in block.instructions_mut() {
                for operand in inst.op_mut().operands_mut() {
                    if operand == from {
                        *operand = to.clone();
                        replaced += 1;
                    }
                }
            }
        }
        replaced
    }

    /// Returns the type of an operand value in this function.
    ///
    /// Globals are not resolved here since their types live in the module;
    /// see [`Module::value_type`](crate::ir::Module::value_type).
    #[must_use]
    pub fn local_value_type(&self, value: &Value) -> Option<IrType> {
        match value {
            Value::Argument(index) => self.params.get(*index as usize).map(|p| p.ty.clone()),
            Value::Constant(c) => Some(c.ty().clone()),
            Value::Result(id) => self.instruction_by_id(*id).map(|inst| inst.ty().clone()),
            Value::Global(_) => None,
        }
    }

    /// Returns `true` if any instruction is a call through a computed address.
    #[must_use]
    pub fn has_indirect_calls(&self) -> bool {
        self.iter_instructions()
            .any(|(_, _, inst)| matches!(inst.op(), Opcode::CallIndirect { .. }))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = if self.is_declaration() {
            "declare"
        } else {
            "define"
        };
        write!(f, "{keyword} {} {} @{}(", self.linkage.name(), self.ret, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.ty)?;
            if !param.name.is_empty() {
                write!(f, " %{}", param.name)?;
            }
        }
        if self.is_vararg() {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")?;

        if self.is_declaration() {
            return writeln!(f);
        }

        writeln!(f, " {{")?;
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        writeln!(f, "}}")
    }
}
