//! Memoization eligibility.
//!
//! The classifier decides whether every call to a function can be replaced
//! by a cache lookup. The checks run in a fixed order and stop at the first
//! failure:
//!
//! 1. structural disqualifiers (declaration, intrinsic, variadic, overridable)
//! 2. already-memoized entry points are approved as-is
//! 3. pointer parameters must only be dereferenced
//! 4. referenced globals must be plain scalars, and few enough of them
//! 5. every non-pure callee must itself be memoizable, within a depth bound
//!
//! Step 5 recurses. The depth is a call-stack depth threaded through the walk,
//! so two sibling calls from the same function are both evaluated one level
//! below their caller.

use std::{collections::HashMap, fmt};

use strum::IntoStaticStr;
use tracing::debug;

use crate::{
    analysis::{pointer_argument_is_safe, referenced_globals, PurityOracle},
    compiler::{config::MemoizeConfig, events::EventKind, EventLog},
    ir::{FuncId, Function, GlobalId, Module, Opcode},
};

/// How an [`Approval`] was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ApprovalBasis {
    /// The function is a memoized entry point by name.
    AlreadyMemoized,
    /// The function passed argument, global and call-graph checks.
    Analyzed,
}

/// Proof that a function was classified as memoizable.
///
/// Only the classifier creates approvals. The rewriter accepts nothing else
/// and re-checks the token against the module before mutating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    function: FuncId,
    name: String,
    basis: ApprovalBasis,
    free_globals: Vec<GlobalId>,
}

impl Approval {
    /// Returns the approved function.
    #[must_use]
    pub const fn function(&self) -> FuncId {
        self.function
    }

    /// Returns the function name at classification time.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns how the approval was reached.
    #[must_use]
    pub const fn basis(&self) -> ApprovalBasis {
        self.basis
    }

    /// Returns the globals the function references, in declaration order.
    #[must_use]
    pub fn free_globals(&self) -> &[GlobalId] {
        &self.free_globals
    }

    /// Returns `true` for memoized entry points recognized by name.
    #[must_use]
    pub fn is_already_memoized(&self) -> bool {
        self.basis == ApprovalBasis::AlreadyMemoized
    }
}

/// Why a function cannot be memoized.
///
/// Every variant has a stable kebab-case tag, see [`Rejection::tag`].
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Rejection {
    /// The function id does not exist in the module.
    UnknownFunction {
        /// The dangling id
        id: FuncId,
    },
    /// The function has no body.
    Declaration,
    /// The function is a compiler intrinsic.
    Intrinsic,
    /// The function takes variadic arguments.
    Variadic,
    /// The linkage allows another definition to replace this one.
    Overridable,
    /// A pointer parameter is used for something other than load or store.
    UnsafePointerArgument {
        /// Parameter index
        index: u32,
    },
    /// A referenced global is not an integer, `float` or `double`.
    NonScalarGlobal {
        /// The offending global
        global: GlobalId,
    },
    /// More distinct globals are referenced than allowed.
    TooManyGlobals {
        /// Number of distinct globals referenced
        count: usize,
    },
    /// The function calls through a computed address.
    IndirectCall,
    /// The call chain reached the depth bound.
    StackDepthExceeded {
        /// Depth of the call that hit the bound
        depth: usize,
    },
    /// A non-pure callee is not memoizable.
    CalleeNotMemoizable {
        /// The rejected callee
        callee: FuncId,
        /// Why the callee was rejected
        reason: Box<Rejection>,
    },
}

impl Rejection {
    /// Returns the stable reason tag, e.g. `stack-depth-exceeded`.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.into()
    }

    /// Follows [`CalleeNotMemoizable`](Self::CalleeNotMemoizable) links to the
    /// innermost reason.
    #[must_use]
    pub fn root_cause(&self) -> &Rejection {
        let mut current = self;
        while let Self::CalleeNotMemoizable { reason, .. } = current {
            current = reason;
        }
        current
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFunction { id } => write!(f, "{}: {id}", self.tag()),
            Self::UnsafePointerArgument { index } => write!(f, "{}: %arg{index}", self.tag()),
            Self::NonScalarGlobal { global } => write!(f, "{}: {global}", self.tag()),
            Self::TooManyGlobals { count } => write!(f, "{}: {count}", self.tag()),
            Self::StackDepthExceeded { depth } => write!(f, "{} at depth {depth}", self.tag()),
            Self::CalleeNotMemoizable { callee, reason } => {
                write!(f, "{}: {callee} ({reason})", self.tag())
            }
            _ => f.write_str(self.tag()),
        }
    }
}

/// Outcome of classifying one function.
pub type Verdict = std::result::Result<Approval, Rejection>;

/// Read-only memoization eligibility check over one module.
///
/// # Examples
///
/// ```rust
/// use memoscope::analysis::AttributeOracle;
/// use memoscope::compiler::{EligibilityClassifier, MemoizeConfig, Rejection};
/// use memoscope::ir::{Function, IrType, Module};
///
/// # fn main() -> memoscope::Result<()> {
/// let mut module = Module::new("unit");
/// let ext = module.add_function(Function::new("ext", Vec::new(), IrType::i32()))?;
///
/// let config = MemoizeConfig::default();
/// let classifier = EligibilityClassifier::new(&module, &config, &AttributeOracle);
/// assert_eq!(classifier.classify(ext), Err(Rejection::Declaration));
/// # Ok(())
/// # }
/// ```
pub struct EligibilityClassifier<'a> {
    module: &'a Module,
    config: &'a MemoizeConfig,
    oracle: &'a dyn PurityOracle,
    events: Option<&'a EventLog>,
}

type VerdictCache = HashMap<(FuncId, usize), Verdict>;

impl<'a> EligibilityClassifier<'a> {
    /// Creates a classifier over `module`.
    ///
    /// # Arguments
    ///
    /// * `module` - The module holding the functions to classify
    /// * `config` - Depth bound, global limit and memoized prefix
    /// * `oracle` - Decides which callees can be ignored
    #[must_use]
    pub fn new(module: &'a Module, config: &'a MemoizeConfig, oracle: &'a dyn PurityOracle) -> Self {
        Self {
            module,
            config,
            oracle,
            events: None,
        }
    }

    /// Records recognitions and verdicts to `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Returns `true` if `func` can be memoized.
    #[must_use]
    pub fn is_memoizable(&self, func: FuncId) -> bool {
        self.classify(func).is_ok()
    }

    /// Classifies `func` as the root of a fresh call-graph walk.
    ///
    /// Callee verdicts are cached for the duration of this call only.
    pub fn classify(&self, func: FuncId) -> Verdict {
        let mut cache = VerdictCache::new();
        let verdict = self.classify_at(func, 0, &mut cache);

        match &verdict {
            Ok(approval) => {
                let basis: &'static str = approval.basis.into();
                debug!(function = approval.name(), basis, "approved");
                if let Some(events) = self.events {
                    events
                        .record(EventKind::FunctionApproved)
                        .function(func)
                        .message(format!("{} ({basis})", approval.name()));
                }
            }
            Err(rejection) => {
                let name = self.module.function(func).map_or("?", Function::name);
                debug!(function = name, reason = rejection.tag(), "rejected");
                if let Some(events) = self.events {
                    events
                        .record(EventKind::FunctionRejected)
                        .function(func)
                        .message(format!("{name}: {rejection}"));
                }
            }
        }
        verdict
    }

    fn classify_at(&self, id: FuncId, depth: usize, cache: &mut VerdictCache) -> Verdict {
        if let Some(verdict) = cache.get(&(id, depth)) {
            return verdict.clone();
        }
        let verdict = self.evaluate(id, depth, cache);
        cache.insert((id, depth), verdict.clone());
        verdict
    }

    fn evaluate(&self, id: FuncId, depth: usize, cache: &mut VerdictCache) -> Verdict {
        let Some(func) = self.module.function(id) else {
            return Err(Rejection::UnknownFunction { id });
        };

        if func.is_declaration() {
            return Err(Rejection::Declaration);
        }
        if func.is_intrinsic() {
            return Err(Rejection::Intrinsic);
        }
        if func.is_vararg() {
            return Err(Rejection::Variadic);
        }
        if func.may_be_overridden() {
            return Err(Rejection::Overridable);
        }

        let globals = referenced_globals(func);
        let approval = |basis| Approval {
            function: id,
            name: func.name().to_string(),
            basis,
            free_globals: globals.keys().copied().collect(),
        };

        if self.config.is_memoized_name(func.name()) {
            debug!(function = func.name(), "already memoized");
            if let Some(events) = self.events {
                events
                    .record(EventKind::AlreadyMemoized)
                    .function(id)
                    .message(func.name());
            }
            return Ok(approval(ApprovalBasis::AlreadyMemoized));
        }

        for (index, param) in (0u32..).zip(func.params()) {
            if param.ty.is_pointer() && !pointer_argument_is_safe(func, index) {
                return Err(Rejection::UnsafePointerArgument { index });
            }
        }

        for global in globals.keys() {
            let scalar = self
                .module
                .global(*global)
                .is_some_and(|g| g.value_type().is_plain_scalar());
            if !scalar {
                return Err(Rejection::NonScalarGlobal { global: *global });
            }
        }
        if globals.len() > self.config.max_free_globals {
            return Err(Rejection::TooManyGlobals {
                count: globals.len(),
            });
        }

        self.check_calls(func, depth, cache)?;
        Ok(approval(ApprovalBasis::Analyzed))
    }

    fn check_calls(&self, func: &Function, depth: usize, cache: &mut VerdictCache) -> Result<(), Rejection> {
        for (_, index, inst) in func.iter_instructions() {
            let callee = match inst.op() {
                Opcode::Call { callee, .. } => *callee,
                Opcode::CallIndirect { .. } => return Err(Rejection::IndirectCall),
                _ => continue,
            };

            if self.oracle.is_side_effect_free(self.module, callee) {
                let name = self.module.function(callee).map_or("?", Function::name);
                debug!(caller = func.name(), callee = name, "pure function");
                if let Some(events) = self.events {
                    events
                        .record(EventKind::PureCallSkipped)
                        .at(func.id(), index)
                        .message(format!("{} -> {name}", func.name()));
                }
                continue;
            }

            let next = depth + 1;
            if next >= self.config.max_call_depth {
                return Err(Rejection::StackDepthExceeded { depth: next });
            }

            match self.classify_at(callee, next, cache) {
                Ok(_) => {}
                Err(exceeded @ Rejection::StackDepthExceeded { .. }) => return Err(exceeded),
                Err(reason) => {
                    return Err(Rejection::CalleeNotMemoizable {
                        callee,
                        reason: Box::new(reason),
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::AttributeOracle,
        ir::{FunctionBuilder, FunctionFlags, GlobalVariable, IrType, Linkage, Parameter, Value},
        test::{call_chain, leaf},
        Result,
    };

    fn classify(module: &Module, func: FuncId) -> Verdict {
        let config = MemoizeConfig::default();
        EligibilityClassifier::new(module, &config, &AttributeOracle).classify(func)
    }

    #[test]
    fn test_structural_disqualifiers() -> Result<()> {
        let mut module = Module::new("unit");
        let decl = module.add_function(Function::new("decl", Vec::new(), IrType::i32()))?;
        let vararg = module.add_function(
            Function::new("va", Vec::new(), IrType::i32()).with_flags(FunctionFlags::VARARG),
        )?;
        let weak = module.add_function(
            Function::new("weak", Vec::new(), IrType::i32()).with_linkage(Linkage::Weak),
        )?;
        for id in [vararg, weak] {
            FunctionBuilder::define(&mut module, id, |b| {
                b.block("entry");
                b.ret(Value::i32(0));
            })?;
        }

        assert_eq!(classify(&module, decl), Err(Rejection::Declaration));
        assert_eq!(classify(&module, vararg), Err(Rejection::Variadic));
        assert_eq!(classify(&module, weak), Err(Rejection::Overridable));
        assert_eq!(
            classify(&module, FuncId(99)),
            Err(Rejection::UnknownFunction { id: FuncId(99) })
        );
        Ok(())
    }

    #[test]
    fn test_memoized_prefix_skips_analysis() -> Result<()> {
        let mut module = Module::new("unit");
        let g = module.add_global(GlobalVariable::new("table", IrType::array(IrType::i32(), 4)));
        let id = module.add_function(Function::new(
            "_memoized__f",
            vec![Parameter::new("p", IrType::ptr(IrType::i32()))],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, id, |b| {
            b.block("entry");
            let cast = b.cast(Value::Global(g), IrType::i64());
            b.ret(cast);
        })?;

        let approval = classify(&module, id).map_err(|r| malformed_error!("rejected: {}", r))?;
        assert!(approval.is_already_memoized());
        assert_eq!(approval.name(), "_memoized__f");
        Ok(())
    }

    #[test]
    fn test_global_limits() -> Result<()> {
        let mut module = Module::new("unit");
        let a = module.add_global(GlobalVariable::new("a", IrType::i32()));
        let b = module.add_global(GlobalVariable::new("b", IrType::F64));
        let arr = module.add_global(GlobalVariable::new("arr", IrType::array(IrType::i8(), 8)));

        let one = module.add_function(Function::new("one", Vec::new(), IrType::i32()))?;
        FunctionBuilder::define(&mut module, one, |bld| {
            bld.block("entry");
            let v = bld.load(Value::Global(a));
            bld.store(v.clone(), Value::Global(a));
            bld.ret(v);
        })?;
        let two = module.add_function(Function::new("two", Vec::new(), IrType::i32()))?;
        FunctionBuilder::define(&mut module, two, |bld| {
            bld.block("entry");
            let v = bld.load(Value::Global(a));
            bld.load(Value::Global(b));
            bld.ret(v);
        })?;
        let aggregate = module.add_function(Function::new("aggregate", Vec::new(), IrType::i8()))?;
        FunctionBuilder::define(&mut module, aggregate, |bld| {
            bld.block("entry");
            let v = bld.load(Value::Global(arr));
            bld.ret(v);
        })?;

        let approval = classify(&module, one).map_err(|r| malformed_error!("rejected: {}", r))?;
        assert_eq!(approval.free_globals(), &[a]);
        assert_eq!(
            classify(&module, two),
            Err(Rejection::TooManyGlobals { count: 2 })
        );
        assert_eq!(
            classify(&module, aggregate),
            Err(Rejection::NonScalarGlobal { global: arr })
        );

        let relaxed = MemoizeConfig {
            max_free_globals: 2,
            ..MemoizeConfig::default()
        };
        let classifier = EligibilityClassifier::new(&module, &relaxed, &AttributeOracle);
        assert!(classifier.is_memoizable(two));
        Ok(())
    }

    #[test]
    fn test_depth_bound() -> Result<()> {
        let (module, head) = call_chain(9)?;
        assert!(classify(&module, head).is_ok());

        let (module, head) = call_chain(10)?;
        assert_eq!(
            classify(&module, head),
            Err(Rejection::StackDepthExceeded { depth: 10 })
        );
        Ok(())
    }

    #[test]
    fn test_depth_is_configurable() -> Result<()> {
        let (module, head) = call_chain(3)?;
        let config = MemoizeConfig {
            max_call_depth: 3,
            ..MemoizeConfig::default()
        };
        let classifier = EligibilityClassifier::new(&module, &config, &AttributeOracle);
        assert!(!classifier.is_memoizable(head));
        Ok(())
    }

    #[test]
    fn test_callee_rejection_is_wrapped() -> Result<()> {
        let mut module = Module::new("unit");
        let ext = module.add_function(Function::new("ext", Vec::new(), IrType::i32()))?;
        let caller = module.add_function(Function::new("caller", Vec::new(), IrType::i32()))?;
        FunctionBuilder::define(&mut module, caller, |b| {
            b.block("entry");
            let v = b.call(ext, Vec::new());
            b.ret(v);
        })?;

        let rejection = classify(&module, caller).err();
        assert_eq!(
            rejection,
            Some(Rejection::CalleeNotMemoizable {
                callee: ext,
                reason: Box::new(Rejection::Declaration),
            })
        );
        let rejection = rejection.ok_or_else(|| malformed_error!("expected rejection"))?;
        assert_eq!(rejection.tag(), "callee-not-memoizable");
        assert_eq!(rejection.root_cause().tag(), "declaration");
        Ok(())
    }

    #[test]
    fn test_pure_callee_is_transparent() -> Result<()> {
        let mut module = Module::new("unit");
        let sqrt = module.add_function(
            Function::new("sqrt", vec![Parameter::new("x", IrType::F64)], IrType::F64)
                .with_flags(FunctionFlags::SPECULATABLE),
        )?;
        let f = module.add_function(Function::new(
            "f",
            vec![Parameter::new("x", IrType::F64)],
            IrType::F64,
        ))?;
        FunctionBuilder::define(&mut module, f, |b| {
            b.block("entry");
            let x = b.arg(0);
            let v = b.call(sqrt, vec![x]);
            b.ret(v);
        })?;

        let events = EventLog::new();
        let config = MemoizeConfig::default();
        let classifier =
            EligibilityClassifier::new(&module, &config, &AttributeOracle).with_events(&events);
        assert!(classifier.is_memoizable(f));
        assert_eq!(events.count_kind(EventKind::PureCallSkipped), 1);
        assert_eq!(events.count_kind(EventKind::FunctionApproved), 1);
        Ok(())
    }

    #[test]
    fn test_recursion_hits_depth_bound() -> Result<()> {
        let mut module = Module::new("unit");
        let fact = module.add_function(Function::new(
            "fact",
            vec![Parameter::new("n", IrType::i32())],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, fact, |b| {
            b.block("entry");
            let n = b.arg(0);
            let v = b.call(fact, vec![n]);
            b.ret(v);
        })?;
        assert_eq!(
            classify(&module, fact),
            Err(Rejection::StackDepthExceeded { depth: 10 })
        );
        Ok(())
    }

    #[test]
    fn test_leaf_fixture_is_memoizable() -> Result<()> {
        let mut module = Module::new("unit");
        let id = leaf(&mut module, "sq")?;
        assert!(classify(&module, id).is_ok());
        Ok(())
    }
}
