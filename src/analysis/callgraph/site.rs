//! Call site representation.

use crate::ir::{FuncId, InstId, Module, Opcode, Value};

/// A direct call instruction within a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Function containing the call.
    pub caller: FuncId,
    /// Block index of the call instruction.
    pub block: usize,
    /// Position of the call instruction within its block.
    pub index: usize,
    /// Id of the call instruction.
    pub inst: InstId,
    /// Called function.
    pub callee: FuncId,
    /// Actual arguments in call order.
    pub args: Vec<Value>,
}

impl CallSite {
    /// Returns the result value of the call.
    #[must_use]
    pub const fn result(&self) -> Value {
        Value::Result(self.inst)
    }
}

/// Enumerates every direct call to `callee`.
///
/// Sites are returned in module declaration order: by caller id, then block,
/// then position in block.
///
/// # Arguments
///
/// * `module` - The module to scan
/// * `callee` - The function whose callers are wanted
///
/// # Returns
///
/// All call sites targeting `callee`, possibly empty.
#[must_use]
pub fn call_sites_of(module: &Module, callee: FuncId) -> Vec<CallSite> {
    let mut sites = Vec::new();
    for caller in module.functions() {
        for (block, index, inst) in caller.iter_instructions() {
            if let Opcode::Call {
                callee: target,
                args,
            } = inst.op()
            {
                if *target == callee {
                    sites.push(CallSite {
                        caller: caller.id(),
                        block,
                        index,
                        inst: inst.id(),
                        callee,
                        args: args.clone(),
                    });
                }
            }
        }
    }
    sites
}
