//! Canonical parameter order for memoized entry points.
//!
//! A memoized entry point takes the original parameters plus one pointer per
//! free global, sorted by [`IrType::canonical_cmp`]. Sorting is stable, so
//! slots of equal type keep their declaration order (parameters first, then
//! globals by id).
//!
//! ```text
//! add(i32 %a, i32* %b)  reading  @g: i32
//!
//! slots    a:i32  b:i32*  @g:i32*
//! sorted   a:i32  b:i32*  @g:i32*
//! add(3, &y) folds slot a -> runtime (&y, @g), key "3"
//! ```
//!
//! A parameter slot is folded only when every call site passes a numeric
//! literal in it, so all sites agree on one runtime signature.

use std::fmt;

use crate::{
    analysis::CallSite,
    compiler::passes::memoize::Approval,
    ir::{GlobalId, IrType, Module, Value},
    Result,
};

/// Origin of a canonical slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Declared parameter at this index.
    Param(u32),
    /// Implicit pointer to a free global.
    Global(GlobalId),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param(index) => write!(f, "%arg{index}"),
            Self::Global(id) => write!(f, "{id}"),
        }
    }
}

/// One entry of a [`CanonicalSignature`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSlot {
    /// Where the slot's value comes from.
    pub slot: Slot,
    /// Type of the slot.
    pub ty: IrType,
    /// Whether call sites pass this slot as part of the key instead of at
    /// runtime.
    pub folded: bool,
}

/// A call site's arguments rearranged for the memoized entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrangedCall {
    /// Runtime arguments in canonical order.
    pub args: Vec<Value>,
    /// Decimal text of the folded literals joined by `,`; empty if none.
    pub key: String,
}

/// Sorted parameter list of a memoized entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSignature {
    slots: Vec<CanonicalSlot>,
    return_type: IrType,
}

impl CanonicalSignature {
    /// Builds the sorted slot list of an approved function.
    ///
    /// No slot is folded yet; see [`fold_across`](Self::fold_across).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FunctionNotFound`] or
    /// [`crate::Error::GlobalNotFound`] if the approval refers to ids
    /// missing from `module`.
    pub fn new(module: &Module, approval: &Approval) -> Result<Self> {
        let function = module.try_function(approval.function())?;

        let mut slots: Vec<CanonicalSlot> = (0u32..)
            .zip(function.params())
            .map(|(index, param)| CanonicalSlot {
                slot: Slot::Param(index),
                ty: param.ty.clone(),
                folded: false,
            })
            .collect();
        for global in approval.free_globals() {
            slots.push(CanonicalSlot {
                slot: Slot::Global(*global),
                ty: module.try_global(*global)?.pointer_type(),
                folded: false,
            });
        }
        slots.sort_by(|a, b| a.ty.canonical_cmp(&b.ty));

        Ok(Self {
            slots,
            return_type: function.return_type().clone(),
        })
    }

    /// Marks every parameter slot that all `sites` pass as a numeric literal.
    ///
    /// With no sites nothing is folded.
    pub fn fold_across(&mut self, sites: &[CallSite]) {
        if sites.is_empty() {
            return;
        }
        for entry in &mut self.slots {
            if let Slot::Param(index) = entry.slot {
                entry.folded = sites
                    .iter()
                    .all(|site| site.args.get(index as usize).is_some_and(Value::is_literal));
            }
        }
    }

    /// Returns all slots in canonical order.
    #[must_use]
    pub fn slots(&self) -> &[CanonicalSlot] {
        &self.slots
    }

    /// Returns the return type of the entry point.
    #[must_use]
    pub const fn return_type(&self) -> &IrType {
        &self.return_type
    }

    /// Returns the types of the slots passed at runtime.
    #[must_use]
    pub fn runtime_types(&self) -> Vec<IrType> {
        self.slots
            .iter()
            .filter(|s| !s.folded)
            .map(|s| s.ty.clone())
            .collect()
    }

    /// Returns the number of folded slots.
    #[must_use]
    pub fn folded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.folded).count()
    }

    /// Rearranges one call site's actual arguments.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a slot refers to an argument the
    /// call does not pass, or a folded slot holds no numeric literal.
    pub fn arrange(&self, actuals: &[Value]) -> Result<ArrangedCall> {
        let mut args = Vec::with_capacity(self.slots.len());
        let mut key = Vec::new();

        for entry in &self.slots {
            let value = match entry.slot {
                Slot::Param(index) => actuals
                    .get(index as usize)
                    .cloned()
                    .ok_or_else(|| malformed_error!("call passes no argument {}", index))?,
                Slot::Global(id) => Value::Global(id),
            };

            if entry.folded {
                let text = value
                    .as_constant()
                    .and_then(|c| c.decimal_text())
                    .ok_or_else(|| malformed_error!("folded slot {} is not a literal", entry.slot))?;
                key.push(text);
            } else {
                args.push(value);
            }
        }

        Ok(ArrangedCall {
            args,
            key: key.join(","),
        })
    }
}

impl fmt::Display for CanonicalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, entry) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", entry.ty, entry.slot)?;
            if entry.folded {
                write!(f, " folded")?;
            }
        }
        write!(f, ") -> {}", self.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{call_sites_of, AttributeOracle},
        compiler::{passes::memoize::EligibilityClassifier, MemoizeConfig},
        ir::{FuncId, Function, FunctionBuilder, Parameter},
        test::AddScenario,
    };

    fn signature_of(module: &Module, func: FuncId) -> Result<CanonicalSignature> {
        let config = MemoizeConfig::default();
        let approval = EligibilityClassifier::new(module, &config, &AttributeOracle)
            .classify(func)
            .map_err(|r| malformed_error!("rejected: {}", r))?;
        CanonicalSignature::new(module, &approval)
    }

    #[test]
    fn test_globals_follow_parameters_of_equal_type() -> Result<()> {
        let scenario = AddScenario::build()?;
        let sig = signature_of(&scenario.module, scenario.add)?;
        let order: Vec<Slot> = sig.slots().iter().map(|s| s.slot).collect();
        assert_eq!(
            order,
            vec![Slot::Param(0), Slot::Param(1), Slot::Global(scenario.g)]
        );
        assert_eq!(sig.folded_count(), 0);
        Ok(())
    }

    #[test]
    fn test_sorted_by_type_rank() -> Result<()> {
        let mut module = Module::new("unit");
        let f = module.add_function(Function::new(
            "mixed",
            vec![
                Parameter::new("p", IrType::ptr(IrType::F64)),
                Parameter::new("d", IrType::F64),
                Parameter::new("n", IrType::i64()),
                Parameter::new("s", IrType::F32),
                Parameter::new("m", IrType::i32()),
            ],
            IrType::Void,
        ))?;
        FunctionBuilder::define(&mut module, f, |b| {
            b.block("entry");
            b.ret_void();
        })?;

        let sig = signature_of(&module, f)?;
        let types: Vec<IrType> = sig.slots().iter().map(|s| s.ty.clone()).collect();
        assert_eq!(
            types,
            vec![
                IrType::i32(),
                IrType::i64(),
                IrType::F32,
                IrType::F64,
                IrType::ptr(IrType::F64),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_fold_requires_literal_at_every_site() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = crate::test::leaf(&mut module, "sq")?;
        let user = module.add_function(Function::new(
            "user",
            vec![Parameter::new("x", IrType::i32())],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, user, |b| {
            b.block("entry");
            let x = b.arg(0);
            b.call(sq, vec![Value::i32(5)]);
            let v = b.call(sq, vec![x]);
            b.ret(v);
        })?;

        let mut sig = signature_of(&module, sq)?;
        let sites = call_sites_of(&module, sq);
        sig.fold_across(&sites);
        assert_eq!(sig.folded_count(), 0);
        assert_eq!(sig.arrange(&sites[0].args)?.key, "");

        sig.fold_across(&sites[..1]);
        let arranged = sig.arrange(&sites[0].args)?;
        assert!(arranged.args.is_empty());
        assert_eq!(arranged.key, "5");
        assert!(sig.arrange(&sites[1].args).is_err());
        Ok(())
    }
}
