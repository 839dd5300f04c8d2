//! Free-global collection and pointer-argument escape checks.
//!
//! Both queries are single linear scans over a function body. They classify
//! each operand slot by where it sits in its user:
//!
//! ```text
//! load  <ptr>           address slot    -> read
//! store <val>, <ptr>    address slot    -> write
//!                       value slot      -> escape
//! anything else                         -> escape
//! ```

use std::collections::BTreeMap;

use crate::ir::{Function, GlobalId, Opcode, Value};

/// How a function touches one global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalAccess {
    /// Loads through the global's address.
    pub loads: usize,
    /// Stores through the global's address.
    pub stores: usize,
    /// Any other use of the address (escapes, arithmetic, call arguments).
    pub other: usize,
}

impl GlobalAccess {
    /// Returns `true` if the global is written.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        self.stores > 0
    }

    /// Returns `true` if the address is only ever loaded from or stored to.
    #[must_use]
    pub const fn is_direct(&self) -> bool {
        self.other == 0
    }
}

/// Collects every global referenced in `func`, keyed by id.
///
/// The map is ordered by global id, which is the module declaration order.
#[must_use]
pub fn referenced_globals(func: &Function) -> BTreeMap<GlobalId, GlobalAccess> {
    let mut globals: BTreeMap<GlobalId, GlobalAccess> = BTreeMap::new();

    for (_, _, inst) in func.iter_instructions() {
        for (position, operand) in inst.op().operands().into_iter().enumerate() {
            let Value::Global(id) = operand else {
                continue;
            };
            let access = globals.entry(*id).or_default();
            match (inst.op(), position) {
                (Opcode::Load { .. }, 0) => access.loads += 1,
                (Opcode::Store { .. }, 1) => access.stores += 1,
                _ => access.other += 1,
            }
        }
    }

    globals
}

/// Checks that the pointer parameter at `index` is only dereferenced.
///
/// Every use must be the address of a load, or the address of a store whose
/// stored value is not the pointer itself. Address arithmetic, casts,
/// comparisons, returns, call arguments and storing the pointer all count
/// as escapes.
#[must_use]
pub fn pointer_argument_is_safe(func: &Function, index: u32) -> bool {
    let arg = Value::arg(index);

    func.uses_of(&arg).iter().all(|u| {
        let Some(inst) = func.instruction(u.block, u.index) else {
            return false;
        };
        matches!(
            (inst.op(), u.operand),
            (Opcode::Load { .. }, 0) | (Opcode::Store { .. }, 1)
        )
    })
}

/// Returns the indices of pointer parameters that escape.
#[must_use]
pub fn escaping_pointer_arguments(func: &Function) -> Vec<u32> {
    func.params()
        .iter()
        .enumerate()
        .filter(|(_, p)| p.ty.is_pointer())
        .filter_map(|(i, _)| {
            let index = u32::try_from(i).ok()?;
            (!pointer_argument_is_safe(func, index)).then_some(index)
        })
        .collect()
}
