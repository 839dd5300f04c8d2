//! Builder for programmatic function bodies.
//!
//! Bodies are attached to a function that has already been added to the
//! module, so the body may call the function itself or any function declared
//! before it is defined:
//!
//! ```rust
//! use memoscope::ir::{Function, FunctionBuilder, IrType, Module, Parameter, Value};
//!
//! # fn main() -> memoscope::Result<()> {
//! let mut module = Module::new("unit");
//! let sq = module.add_function(Function::new(
//!     "square",
//!     vec![Parameter::new("x", IrType::i32())],
//!     IrType::i32(),
//! ))?;
//!
//! FunctionBuilder::define(&mut module, sq, |f| {
//!     f.block("entry");
//!     let x = f.arg(0);
//!     let y = f.mul(x.clone(), x);
//!     f.ret(y);
//! })?;
//!
//! assert!(!module.function(sq).map_or(true, |f| f.is_declaration()));
//! # Ok(())
//! # }
//! ```
//!
//! Result types are inferred: loads produce the pointee type of their
//! address, calls the callee's return type. An instruction whose operand
//! types cannot be inferred makes [`FunctionBuilder::define`] fail with a
//! [`Malformed`](crate::Error::Malformed) error.

use std::collections::HashMap;

use crate::{
    ir::{
        BasicBlock, BinaryOp, BlockIndex, ComparePredicate, FuncId, InstId, Instruction, IrType,
        Module, Opcode, Parameter, Value,
    },
    Error, Result,
};

/// Appends instructions to a function body.
pub struct FunctionBuilder<'m> {
    module: &'m Module,
    func: FuncId,
    params: &'m [Parameter],
    blocks: Vec<BasicBlock>,
    types: HashMap<InstId, IrType>,
    next_inst: u32,
    error: Option<Error>,
}

impl<'m> FunctionBuilder<'m> {
    /// Builds the body of the function `id` with `build`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FunctionNotFound`] for an unknown id, or
    /// [`Error::Malformed`] if the closure emitted an instruction without an
    /// open block or with operands of uninferable type.
    pub fn define<F>(module: &mut Module, id: FuncId, build: F) -> Result<()>
    where
        F: FnOnce(&mut FunctionBuilder<'_>),
    {
        let (blocks, next_inst) = {
            let func = module.try_function(id)?;
            if !func.is_declaration() {
                return Err(malformed_error!("{} already has a body", func.name()));
            }
            let mut builder = FunctionBuilder {
                module: &*module,
                func: id,
                params: func.params(),
                blocks: Vec::new(),
                types: HashMap::new(),
                next_inst: func.next_inst(),
                error: None,
            };
            build(&mut builder);
            if let Some(err) = builder.error {
                return Err(err);
            }
            (builder.blocks, builder.next_inst)
        };

        module
            .function_mut(id)
            .ok_or(Error::FunctionNotFound(id))?
            .extend_body(blocks, next_inst);
        Ok(())
    }

    /// Returns the id of the function being built.
    #[must_use]
    pub const fn func(&self) -> FuncId {
        self.func
    }

    /// Returns the argument value at `index`.
    #[must_use]
    pub fn arg(&self, index: u32) -> Value {
        Value::arg(index)
    }

    /// Opens a new block and makes it current. Returns its index.
    pub fn block(&mut self, name: impl Into<String>) -> BlockIndex {
        self.blocks.push(BasicBlock::new(name));
        self.blocks.len() - 1
    }

    /// Reads the value behind `ptr`.
    pub fn load(&mut self, ptr: Value) -> Value {
        let ty = self
            .type_of(&ptr)
            .and_then(|ty| ty.pointee().cloned());
        match ty {
            Some(ty) => self.emit(Opcode::Load { ptr }, ty),
            None => self.fail(format!("load through non-pointer {ptr}")),
        }
    }

    /// Writes `value` through `ptr`.
    pub fn store(&mut self, value: Value, ptr: Value) {
        self.emit(Opcode::Store { value, ptr }, IrType::Void);
    }

    /// Emits a binary operation typed like its left operand.
    pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        match self.type_of(&lhs) {
            Some(ty) => self.emit(Opcode::Binary { op, lhs, rhs }, ty),
            None => self.fail(format!("untyped operand {lhs}")),
        }
    }

    /// Integer addition.
    pub fn add(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    /// Integer multiplication.
    pub fn mul(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    /// Emits a comparison producing an `i1`.
    pub fn compare(&mut self, pred: ComparePredicate, lhs: Value, rhs: Value) -> Value {
        self.emit(Opcode::Compare { pred, lhs, rhs }, IrType::i1())
    }

    /// Converts `value` to `target`.
    pub fn cast(&mut self, value: Value, target: IrType) -> Value {
        self.emit(Opcode::Cast { value }, target)
    }

    /// Computes an address from `base`, keeping the base type.
    pub fn element_ptr(&mut self, base: Value, indices: Vec<Value>) -> Value {
        match self.type_of(&base) {
            Some(ty) if ty.is_pointer() => self.emit(Opcode::ElementPtr { base, indices }, ty),
            _ => self.fail(format!("address arithmetic on non-pointer {base}")),
        }
    }

    /// Allocates a stack slot for one `allocated` value.
    pub fn alloca(&mut self, allocated: IrType) -> Value {
        let ty = IrType::ptr(allocated.clone());
        self.emit(Opcode::Alloca { allocated }, ty)
    }

    /// Calls `callee` directly and returns its result.
    ///
    /// For `void` callees the returned value has no definition and must not
    /// be used.
    pub fn call(&mut self, callee: FuncId, args: Vec<Value>) -> Value {
        match self.module.function(callee) {
            Some(target) => {
                let ret = target.return_type().clone();
                self.emit(Opcode::Call { callee, args }, ret)
            }
            None => self.fail(format!("call to unknown function {callee}")),
        }
    }

    /// Calls through the function address `callee`.
    pub fn call_indirect(&mut self, callee: Value, args: Vec<Value>, ret: IrType) -> Value {
        self.emit(Opcode::CallIndirect { callee, args }, ret)
    }

    /// Jumps to `target`.
    pub fn jump(&mut self, target: BlockIndex) {
        self.emit(Opcode::Jump { target }, IrType::Void);
    }

    /// Branches on `cond`.
    pub fn branch(&mut self, cond: Value, then_block: BlockIndex, else_block: BlockIndex) {
        self.emit(
            Opcode::Branch {
                cond,
                then_block,
                else_block,
            },
            IrType::Void,
        );
    }

    /// Returns `value`.
    pub fn ret(&mut self, value: Value) {
        self.emit(Opcode::Return { value: Some(value) }, IrType::Void);
    }

    /// Returns from a `void` function.
    pub fn ret_void(&mut self) {
        self.emit(Opcode::Return { value: None }, IrType::Void);
    }

    /// Marks the end of the current block as unreachable.
    pub fn unreachable(&mut self) {
        self.emit(Opcode::Unreachable, IrType::Void);
    }

    /// Attaches a metadata entry to the most recently emitted instruction.
    pub fn annotate(&mut self, key: &str, value: &str) {
        if let Some(inst) = self
            .blocks
            .last_mut()
            .and_then(|b| b.instructions_mut().last_mut())
        {
            inst.set_metadata(key, value);
        }
    }

    fn type_of(&self, value: &Value) -> Option<IrType> {
        match value {
            Value::Argument(index) => self.params.get(*index as usize).map(|p| p.ty.clone()),
            Value::Constant(c) => Some(c.ty().clone()),
            Value::Global(g) => self.module.global(*g).map(|g| g.pointer_type()),
            Value::Result(id) => self.types.get(id).cloned(),
        }
    }

    fn emit(&mut self, op: Opcode, ty: IrType) -> Value {
        let id = InstId(self.next_inst);
        self.next_inst += 1;

        let Some(block) = self.blocks.last_mut() else {
            return self.fail(format!("{} emitted outside a block", op.mnemonic()));
        };
        block.push(Instruction::new(id, op, ty.clone()));
        self.types.insert(id, ty);
        Value::Result(id)
    }

    fn fail(&mut self, message: String) -> Value {
        if self.error.is_none() {
            self.error = Some(malformed_error!(message));
        }
        Value::Constant(crate::ir::Constant::Undef(IrType::Void))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Function, GlobalVariable};

    #[test]
    fn test_inferred_types() -> Result<()> {
        let mut module = Module::new("unit");
        let g = module.add_global(GlobalVariable::new("counter", IrType::F64));
        let f = module.add_function(Function::new(
            "read",
            vec![Parameter::new("p", IrType::ptr(IrType::i64()))],
            IrType::F64,
        ))?;

        FunctionBuilder::define(&mut module, f, |b| {
            b.block("entry");
            let from_param = b.load(b.arg(0));
            let from_global = b.load(Value::Global(g));
            b.store(from_param, b.arg(0));
            b.ret(from_global);
        })?;

        let func = module.try_function(f)?;
        let types: Vec<&IrType> = func.iter_instructions().map(|(_, _, i)| i.ty()).collect();
        assert_eq!(
            types,
            vec![&IrType::i64(), &IrType::F64, &IrType::Void, &IrType::Void]
        );
        Ok(())
    }

    #[test]
    fn test_self_call_uses_declared_return_type() -> Result<()> {
        let mut module = Module::new("unit");
        let f = module.add_function(Function::new(
            "fact",
            vec![Parameter::new("n", IrType::i32())],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, f, |b| {
            b.block("entry");
            let r = b.call(f, vec![b.arg(0)]);
            b.ret(r);
        })?;

        let func = module.try_function(f)?;
        assert_eq!(func.instruction(0, 0).map(Instruction::ty), Some(&IrType::i32()));
        Ok(())
    }

    #[test]
    fn test_malformed_body_is_rejected() -> Result<()> {
        let mut module = Module::new("unit");
        let f = module.add_function(Function::new(
            "bad",
            vec![Parameter::new("x", IrType::i32())],
            IrType::i32(),
        ))?;

        let result = FunctionBuilder::define(&mut module, f, |b| {
            b.block("entry");
            let v = b.load(b.arg(0));
            b.ret(v);
        });
        assert!(matches!(result, Err(Error::Malformed { .. })));
        assert!(module.try_function(f)?.is_declaration());
        Ok(())
    }
}
