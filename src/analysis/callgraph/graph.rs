//! Module-wide call graph.
//!
//! Edges are collected from direct call instructions. Functions containing
//! indirect calls are tracked separately since their targets are unknown.

use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{FuncId, Module, Opcode};

/// Direct call relationships between the functions of a module.
///
/// # Example
///
/// ```rust
/// use memoscope::analysis::CallGraph;
/// use memoscope::ir::Module;
///
/// let module = Module::new("empty");
/// let graph = CallGraph::build(&module);
/// assert_eq!(graph.edge_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    callees: BTreeMap<FuncId, BTreeSet<FuncId>>,
    callers: BTreeMap<FuncId, BTreeSet<FuncId>>,
    indirect: BTreeSet<FuncId>,
}

impl CallGraph {
    /// Scans every function body of `module`.
    #[must_use]
    pub fn build(module: &Module) -> Self {
        let mut graph = Self::default();
        for func in module.functions() {
            let caller = func.id();
            graph.callees.entry(caller).or_default();
            for (_, _, inst) in func.iter_instructions() {
                match inst.op() {
                    Opcode::Call { callee, .. } => {
                        graph.callees.entry(caller).or_default().insert(*callee);
                        graph.callers.entry(*callee).or_default().insert(caller);
                    }
                    Opcode::CallIndirect { .. } => {
                        graph.indirect.insert(caller);
                    }
                    _ => {}
                }
            }
        }
        graph
    }

    /// Returns the functions `func` calls directly.
    pub fn callees(&self, func: FuncId) -> impl Iterator<Item = FuncId> + '_ {
        self.callees.get(&func).into_iter().flatten().copied()
    }

    /// Returns the functions calling `func` directly.
    pub fn callers(&self, func: FuncId) -> impl Iterator<Item = FuncId> + '_ {
        self.callers.get(&func).into_iter().flatten().copied()
    }

    /// Returns `true` if `func` contains a call through a computed address.
    #[must_use]
    pub fn has_indirect_calls(&self, func: FuncId) -> bool {
        self.indirect.contains(&func)
    }

    /// Returns `true` if `func` has no direct callers.
    #[must_use]
    pub fn is_uncalled(&self, func: FuncId) -> bool {
        self.callers(func).next().is_none()
    }

    /// Returns the number of distinct caller/callee pairs.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.callees.values().map(BTreeSet::len).sum()
    }
}
