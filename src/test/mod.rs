//! Shared module fixtures for unit tests.

use crate::{
    ir::{
        FuncId, Function, FunctionBuilder, GlobalId, GlobalVariable, InstId, IrType, Module,
        Parameter, Value,
    },
    Result,
};

/// Adds `name(i32 %x) -> i32 { ret x * x }`.
pub fn leaf(module: &mut Module, name: &str) -> Result<FuncId> {
    let id = module.add_function(Function::new(
        name,
        vec![Parameter::new("x", IrType::i32())],
        IrType::i32(),
    ))?;
    FunctionBuilder::define(module, id, |b| {
        b.block("entry");
        let x = b.arg(0);
        let v = b.mul(x.clone(), x);
        b.ret(v);
    })?;
    Ok(id)
}

/// Builds `c0 -> c1 -> ... -> c<calls>`, where `c<calls>` is a leaf.
///
/// Returns the module and `c0`. Classifying `c0` walks `calls` nested
/// non-pure calls.
pub fn call_chain(calls: usize) -> Result<(Module, FuncId)> {
    let mut module = Module::new("chain");
    let mut callee = leaf(&mut module, &format!("c{calls}"))?;
    for level in (0..calls).rev() {
        let id = module.add_function(Function::new(
            format!("c{level}"),
            vec![Parameter::new("x", IrType::i32())],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, id, |b| {
            b.block("entry");
            let x = b.arg(0);
            let v = b.call(callee, vec![x]);
            b.ret(v);
        })?;
        callee = id;
    }
    Ok((module, callee))
}

/// `add(i32 %a, i32* %b)` reading `@g`, called once as `add(3, %y)`.
///
/// ```text
/// @g = global i32
///
/// define i32 @add(i32 %a, i32* %b) {
///   %0 = load %b
///   %1 = load @g
///   %2 = add %a, %0
///   %3 = add %2, %1
///   ret %3
/// }
///
/// define i32 @main() {
///   %0 = alloca i32
///   store 4, %0
///   %1 = call @add(3, %0)
///   ret %1
/// }
/// ```
pub struct AddScenario {
    pub module: Module,
    pub add: FuncId,
    pub caller: FuncId,
    pub g: GlobalId,
    /// The `%y` stack slot passed at the call.
    pub y: Value,
    /// The original call instruction.
    pub call: InstId,
}

impl AddScenario {
    pub fn build() -> Result<Self> {
        let mut module = Module::new("scenario");
        let g = module.add_global(GlobalVariable::new("g", IrType::i32()));

        let add = module.add_function(Function::new(
            "add",
            vec![
                Parameter::new("a", IrType::i32()),
                Parameter::new("b", IrType::ptr(IrType::i32())),
            ],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, add, |f| {
            f.block("entry");
            let (a, b) = (f.arg(0), f.arg(1));
            let b = f.load(b);
            let gv = f.load(Value::Global(g));
            let sum = f.add(a, b);
            let total = f.add(sum, gv);
            f.ret(total);
        })?;

        let caller = module.add_function(Function::new("main", Vec::new(), IrType::i32()))?;
        let mut slot = None;
        let mut result = None;
        FunctionBuilder::define(&mut module, caller, |f| {
            f.block("entry");
            let y = f.alloca(IrType::i32());
            f.store(Value::i32(4), y.clone());
            let r = f.call(add, vec![Value::i32(3), y.clone()]);
            slot = Some(y);
            result = Some(r.clone());
            f.ret(r);
        })?;

        let (Some(y), Some(Value::Result(call))) = (slot, result) else {
            return Err(malformed_error!("main has no call to add"));
        };
        Ok(Self {
            module,
            add,
            caller,
            g,
            y,
            call,
        })
    }
}
