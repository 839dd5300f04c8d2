//! Redirecting call sites to memoized entry points.
//!
//! Rewriting one function happens in two phases. Planning reads the module
//! only: it re-validates the approval, checks every call's arity, computes the
//! canonical signature and arranges each call's arguments. Committing then
//! inserts the entry point and swaps the call instructions. Every check runs
//! during planning. Inserting the entry point is the first mutation and the
//! only fallible one, and swapping calls cannot fail, so a failed rewrite
//! leaves the module untouched.
//!
//! ```text
//! before   %4 = call i32 @add(i32 3, i32* %y)
//! after    %9 = call i32 @_memoized__add(i32* %y, i32* @g) !memo.key "3"
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::{
    analysis::{call_sites_of, referenced_globals, CallSite},
    compiler::{
        config::{MemoizeConfig, UncalledPolicy, MEMO_KEY_METADATA},
        events::EventKind,
        passes::memoize::{
            signature::{ArrangedCall, CanonicalSignature, Slot},
            Approval,
        },
        EventLog,
    },
    ir::{
        BasicBlock, FuncId, Function, FunctionFlags, Instruction, IrType, Linkage, Module, Opcode,
        Parameter, Value,
    },
    metadata::MemoDescriptor,
    Error, Result,
};

/// Result of rewriting one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// The function whose calls were redirected.
    pub function: FuncId,
    /// The memoized entry point now called instead.
    pub memoized: FuncId,
    /// Whether the entry point was created by this rewrite.
    pub synthesized: bool,
    /// Descriptor for the downstream cache generator.
    pub descriptor: MemoDescriptor,
}

/// Where redirected calls go.
enum EntryPoint {
    /// A compatible entry point already in the module.
    Existing(FuncId),
    /// A stub to insert, whose name is known to be free.
    Synthesize(Function),
}

/// Everything the commit phase needs, computed without mutation.
struct RewritePlan {
    function: FuncId,
    original_name: String,
    memoized_name: String,
    parameter_order: Vec<IrType>,
    return_type: IrType,
    calls: Vec<(CallSite, ArrangedCall)>,
}

/// Redirects every call of an approved function to its memoized entry point.
pub struct CallSiteRewriter<'a> {
    config: &'a MemoizeConfig,
    events: Option<&'a EventLog>,
}

impl<'a> CallSiteRewriter<'a> {
    /// Creates a rewriter using `config` for naming, folding and the
    /// uncalled-function policy.
    #[must_use]
    pub fn new(config: &'a MemoizeConfig) -> Self {
        Self {
            config,
            events: None,
        }
    }

    /// Records rewrites to `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Rewrites the calls of the function named by `approval`.
    ///
    /// # Arguments
    ///
    /// * `module` - The module to mutate
    /// * `approval` - Classification result for the function
    ///
    /// # Returns
    ///
    /// `None` if nothing was done: the function is already a memoized entry
    /// point, or it has no call sites and the policy is
    /// [`UncalledPolicy::Skip`].
    ///
    /// # Errors
    ///
    /// - [`Error::NotApproved`] if the approval does not match the module
    /// - [`Error::ArityMismatch`] if any call passes the wrong argument count
    /// - [`Error::DuplicateSymbol`] if the memoized name is taken by a
    ///   function with a different signature
    ///
    /// The module is unchanged when an error is returned.
    pub fn rewrite(&self, module: &mut Module, approval: &Approval) -> Result<Option<RewriteOutcome>> {
        if approval.is_already_memoized() {
            return Ok(None);
        }
        let Some((entry, plan)) = self.plan(module, approval)? else {
            return Ok(None);
        };
        let (memoized, synthesized) = self.install_entry(module, entry, &plan.memoized_name)?;
        Ok(Some(self.commit(module, plan, memoized, synthesized)))
    }

    fn plan(&self, module: &Module, approval: &Approval) -> Result<Option<(EntryPoint, RewritePlan)>> {
        let function = module
            .function(approval.function())
            .filter(|f| f.name() == approval.name() && !f.is_declaration())
            .ok_or_else(|| Error::NotApproved(approval.name().to_string()))?;
        let current: Vec<_> = referenced_globals(function).into_keys().collect();
        if current != approval.free_globals() {
            return Err(Error::NotApproved(approval.name().to_string()));
        }

        let sites = call_sites_of(module, function.id());
        for site in &sites {
            if site.args.len() != function.params().len() {
                let caller = module.try_function(site.caller)?;
                return Err(Error::ArityMismatch {
                    caller: caller.name().to_string(),
                    callee: function.name().to_string(),
                    expected: function.params().len(),
                    found: site.args.len(),
                });
            }
        }
        if sites.is_empty() && self.config.uncalled_policy == UncalledPolicy::Skip {
            debug!(function = function.name(), "no call sites");
            if let Some(events) = self.events {
                events.info(format!("{}: no call sites", function.name()));
            }
            return Ok(None);
        }

        let mut signature = CanonicalSignature::new(module, approval)?;
        if self.config.fold_constants {
            signature.fold_across(&sites);
        }

        let memoized_name = self.config.memoized_name(function.name());
        let runtime = signature.runtime_types();
        let existing = match module.function_by_name(&memoized_name) {
            Some(f) if f.same_signature(&runtime, signature.return_type()) => Some(f.id()),
            Some(_) => return Err(Error::DuplicateSymbol(memoized_name)),
            None => None,
        };

        let mut params = Vec::with_capacity(runtime.len());
        for entry in signature.slots().iter().filter(|s| !s.folded) {
            let name = match entry.slot {
                Slot::Param(index) => function
                    .param(index as usize)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                Slot::Global(id) => module.try_global(id)?.name().to_string(),
            };
            params.push(Parameter::new(name, entry.ty.clone()));
        }

        let mut calls = Vec::with_capacity(sites.len());
        for site in sites {
            let arranged = signature.arrange(&site.args)?;
            calls.push((site, arranged));
        }

        let parameter_order = params.iter().map(|p| p.ty.clone()).collect();
        let entry = match existing {
            Some(id) => EntryPoint::Existing(id),
            None => EntryPoint::Synthesize(memo_entry(
                &memoized_name,
                params,
                signature.return_type().clone(),
            )),
        };

        let plan = RewritePlan {
            function: function.id(),
            original_name: function.name().to_string(),
            memoized_name,
            parameter_order,
            return_type: signature.return_type().clone(),
            calls,
        };
        Ok(Some((entry, plan)))
    }

    /// Inserts the planned stub, the first and only fallible mutation.
    ///
    /// Planning has already checked that the memoized name is free, so a
    /// failure here leaves the module as it was.
    fn install_entry(&self, module: &mut Module, entry: EntryPoint, name: &str) -> Result<(FuncId, bool)> {
        let stub = match entry {
            EntryPoint::Existing(id) => return Ok((id, false)),
            EntryPoint::Synthesize(stub) => stub,
        };
        let id = module.add_function(stub)?;
        if let Some(events) = self.events {
            events
                .record(EventKind::FunctionSynthesized)
                .function(id)
                .message(name);
        }
        Ok((id, true))
    }

    /// Swaps every planned call for a call to `memoized`.
    ///
    /// Calls are matched by instruction id while walking each caller, so
    /// nothing here can fail. Uses of the old results are rewired only after
    /// all of a caller's calls are swapped, which also covers a redirected
    /// call whose argument is the result of another one.
    fn commit(&self, module: &mut Module, plan: RewritePlan, memoized: FuncId, synthesized: bool) -> RewriteOutcome {
        let mut by_caller: BTreeMap<FuncId, Vec<&(CallSite, ArrangedCall)>> = BTreeMap::new();
        for call in &plan.calls {
            by_caller.entry(call.0.caller).or_default().push(call);
        }

        for caller in module.functions_mut() {
            let Some(calls) = by_caller.get(&caller.id()) else {
                continue;
            };

            let mut replacements = HashMap::with_capacity(calls.len());
            let mut renames = Vec::with_capacity(calls.len());
            for (site, arranged) in calls.iter().copied() {
                let id = caller.fresh_inst_id();
                let mut call = Instruction::new(
                    id,
                    Opcode::Call {
                        callee: memoized,
                        args: arranged.args.clone(),
                    },
                    plan.return_type.clone(),
                );
                if !arranged.key.is_empty() {
                    call.set_metadata(MEMO_KEY_METADATA, arranged.key.clone());
                }
                replacements.insert(site.inst, call);
                renames.push((site.result(), Value::Result(id)));
            }

            for block in caller.blocks_mut() {
                for inst in block.instructions_mut() {
                    if let Some(call) = replacements.remove(&inst.id()) {
                        *inst = call;
                    }
                }
            }
            if !plan.return_type.is_void() {
                for (old, new) in &renames {
                    caller.replace_all_uses(old, new);
                }
            }
        }

        let mut fragments: Vec<String> = Vec::new();
        for (site, arranged) in &plan.calls {
            if !arranged.key.is_empty() && !fragments.contains(&arranged.key) {
                fragments.push(arranged.key.clone());
            }
            if let Some(events) = self.events {
                events
                    .record(EventKind::CallSiteRewritten)
                    .at(site.caller, site.block)
                    .message(format!("{} -> {}", site.inst, plan.memoized_name));
                if !arranged.key.is_empty() {
                    events
                        .record(EventKind::ConstantFolded)
                        .at(site.caller, site.block)
                        .message(format!("{} key {}", plan.original_name, arranged.key));
                }
            }
        }

        info!(
            function = %plan.original_name,
            memoized = %plan.memoized_name,
            call_sites = plan.calls.len(),
            "memoized function"
        );

        RewriteOutcome {
            function: plan.function,
            memoized,
            synthesized,
            descriptor: MemoDescriptor {
                original_name: plan.original_name,
                memoized_name: plan.memoized_name,
                parameter_order: plan.parameter_order,
                constant_key_fragments: fragments,
                call_sites: plan.calls.len(),
            },
        }
    }
}

/// Builds the entry point definition: a single block ending in `unreachable`.
///
/// The lookup body is generated downstream from the emitted descriptor.
fn memo_entry(name: &str, params: Vec<Parameter>, ret: IrType) -> Function {
    let mut entry = Function::new(name, params, ret)
        .with_flags(FunctionFlags::MEMO_ENTRY)
        .with_linkage(Linkage::External);
    let id = entry.fresh_inst_id();
    let mut block = BasicBlock::new("entry");
    block.push(Instruction::new(id, Opcode::Unreachable, IrType::Void));
    entry.add_block(block);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::AttributeOracle,
        compiler::passes::memoize::EligibilityClassifier,
        ir::{FunctionBuilder, GlobalVariable},
        test::{leaf, AddScenario},
    };

    fn approve(module: &Module, config: &MemoizeConfig, func: FuncId) -> Result<Approval> {
        EligibilityClassifier::new(module, config, &AttributeOracle)
            .classify(func)
            .map_err(|r| malformed_error!("rejected: {}", r))
    }

    #[test]
    fn test_add_scenario() -> Result<()> {
        let AddScenario {
            mut module,
            add,
            caller,
            g,
            y,
            call,
        } = AddScenario::build()?;
        let config = MemoizeConfig::default();
        let approval = approve(&module, &config, add)?;
        assert_eq!(approval.free_globals(), &[g]);

        let outcome = CallSiteRewriter::new(&config)
            .rewrite(&mut module, &approval)?
            .ok_or_else(|| malformed_error!("no rewrite"))?;
        assert!(outcome.synthesized);
        assert_eq!(outcome.descriptor.memoized_name, "_memoized__add");
        assert_eq!(outcome.descriptor.constant_key_fragments, vec!["3".to_string()]);
        assert_eq!(
            outcome.descriptor.parameter_order,
            vec![IrType::ptr(IrType::i32()), IrType::ptr(IrType::i32())]
        );

        let memo = module.try_function(outcome.memoized)?;
        assert!(memo.flags().contains(FunctionFlags::MEMO_ENTRY));
        assert!(!memo.is_declaration());

        let caller_fn = module.try_function(caller)?;
        let (_, _, inst) = caller_fn
            .iter_instructions()
            .find(|(_, _, i)| i.op().as_call().is_some())
            .ok_or_else(|| malformed_error!("call missing"))?;
        assert_ne!(inst.id(), call);
        assert_eq!(
            inst.op().as_call(),
            Some((outcome.memoized, &[y, Value::Global(g)][..]))
        );
        assert_eq!(inst.metadata(MEMO_KEY_METADATA), Some("3"));
        assert!(caller_fn.uses_of(&Value::Result(call)).is_empty());
        Ok(())
    }

    #[test]
    fn test_nested_calls_rewire_to_new_results() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = leaf(&mut module, "sq")?;
        let user = module.add_function(Function::new(
            "user",
            vec![Parameter::new("x", IrType::i32())],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, user, |b| {
            b.block("entry");
            let x = b.arg(0);
            let inner = b.call(sq, vec![x]);
            let outer = b.call(sq, vec![inner]);
            b.ret(outer);
        })?;
        let config = MemoizeConfig::default();
        let approval = approve(&module, &config, sq)?;

        let outcome = CallSiteRewriter::new(&config)
            .rewrite(&mut module, &approval)?
            .ok_or_else(|| malformed_error!("no rewrite"))?;
        assert_eq!(outcome.descriptor.call_sites, 2);

        let body = module.try_function(user)?;
        let calls: Vec<&Instruction> = body
            .iter_instructions()
            .map(|(_, _, inst)| inst)
            .filter(|inst| inst.op().as_call().is_some())
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].op().as_call(),
            Some((outcome.memoized, &[Value::arg(0)][..]))
        );
        assert_eq!(
            calls[1].op().as_call(),
            Some((outcome.memoized, &[Value::Result(calls[0].id())][..]))
        );

        for (_, _, inst) in body.iter_instructions() {
            for operand in inst.op().operands() {
                if let Value::Result(id) = operand {
                    assert!(body.instruction_by_id(*id).is_some(), "{inst} uses erased {id}");
                }
            }
        }
        let (_, _, ret) = body
            .iter_instructions()
            .last()
            .ok_or_else(|| malformed_error!("empty body"))?;
        assert_eq!(ret.op().operands(), vec![&Value::Result(calls[1].id())]);
        Ok(())
    }

    #[test]
    fn test_arity_mismatch_leaves_module_untouched() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = leaf(&mut module, "sq")?;
        let bad = module.add_function(Function::new("bad", Vec::new(), IrType::i32()))?;
        FunctionBuilder::define(&mut module, bad, |b| {
            b.block("entry");
            let v = b.call(sq, Vec::new());
            b.ret(v);
        })?;
        let config = MemoizeConfig::default();
        let approval = approve(&module, &config, sq)?;
        let before = module.clone();

        let result = CallSiteRewriter::new(&config).rewrite(&mut module, &approval);
        assert!(matches!(
            result,
            Err(Error::ArityMismatch {
                expected: 1,
                found: 0,
                ..
            })
        ));
        assert_eq!(module, before);
        Ok(())
    }

    #[test]
    fn test_stale_approval_is_refused() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = leaf(&mut module, "sq")?;
        let config = MemoizeConfig::default();
        let approval = approve(&module, &config, sq)?;

        let mut other = Module::new("other");
        other.add_function(Function::new("different", Vec::new(), IrType::Void))?;
        let result = CallSiteRewriter::new(&config).rewrite(&mut other, &approval);
        assert!(matches!(result, Err(Error::NotApproved(name)) if name == "sq"));
        Ok(())
    }

    #[test]
    fn test_changed_globals_invalidate_approval() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = leaf(&mut module, "sq")?;
        let config = MemoizeConfig::default();
        let approval = approve(&module, &config, sq)?;

        let g = module.add_global(GlobalVariable::new("g", IrType::i32()));
        let f = module.function_mut(sq).ok_or(Error::FunctionNotFound(sq))?;
        let id = f.fresh_inst_id();
        f.blocks_mut()[0]
            .instructions_mut()
            .insert(0, Instruction::new(id, Opcode::Load { ptr: Value::Global(g) }, IrType::i32()));

        let result = CallSiteRewriter::new(&config).rewrite(&mut module, &approval);
        assert!(matches!(result, Err(Error::NotApproved(_))));
        Ok(())
    }

    #[test]
    fn test_compatible_memo_symbol_is_reused() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = leaf(&mut module, "sq")?;
        let user = module.add_function(Function::new(
            "user",
            vec![Parameter::new("x", IrType::i32())],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, user, |b| {
            b.block("entry");
            let x = b.arg(0);
            let v = b.call(sq, vec![x]);
            b.ret(v);
        })?;
        let existing = module.add_function(memo_entry(
            "_memoized__sq",
            vec![Parameter::new("x", IrType::i32())],
            IrType::i32(),
        ))?;
        let config = MemoizeConfig::default();
        let approval = approve(&module, &config, sq)?;

        let outcome = CallSiteRewriter::new(&config)
            .rewrite(&mut module, &approval)?
            .ok_or_else(|| malformed_error!("no rewrite"))?;
        assert!(!outcome.synthesized);
        assert_eq!(outcome.memoized, existing);
        assert_eq!(module.function_count(), 3);
        let body = module.try_function(user)?;
        assert!(body
            .iter_instructions()
            .any(|(_, _, inst)| inst.op().as_call().is_some_and(|(callee, _)| callee == existing)));
        Ok(())
    }

    #[test]
    fn test_incompatible_memo_symbol() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = leaf(&mut module, "sq")?;
        let user = module.add_function(Function::new("user", Vec::new(), IrType::i32()))?;
        FunctionBuilder::define(&mut module, user, |b| {
            b.block("entry");
            let v = b.call(sq, vec![Value::i32(2)]);
            b.ret(v);
        })?;
        module.add_function(Function::new("_memoized__sq", Vec::new(), IrType::F64))?;
        let config = MemoizeConfig::default();
        let approval = approve(&module, &config, sq)?;
        let before = module.clone();

        let result = CallSiteRewriter::new(&config).rewrite(&mut module, &approval);
        assert!(matches!(result, Err(Error::DuplicateSymbol(name)) if name == "_memoized__sq"));
        assert_eq!(module, before);
        Ok(())
    }

    #[test]
    fn test_uncalled_policy() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = leaf(&mut module, "sq")?;
        let skip = MemoizeConfig::default();
        let approval = approve(&module, &skip, sq)?;
        assert_eq!(CallSiteRewriter::new(&skip).rewrite(&mut module, &approval)?, None);
        assert_eq!(module.function_count(), 1);

        let synthesize = MemoizeConfig {
            uncalled_policy: UncalledPolicy::Synthesize,
            ..MemoizeConfig::default()
        };
        let outcome = CallSiteRewriter::new(&synthesize)
            .rewrite(&mut module, &approval)?
            .ok_or_else(|| malformed_error!("no rewrite"))?;
        assert_eq!(outcome.descriptor.call_sites, 0);
        assert!(outcome.descriptor.constant_key_fragments.is_empty());
        assert_eq!(outcome.descriptor.parameter_order, vec![IrType::i32()]);
        assert_eq!(module.function_count(), 2);
        Ok(())
    }

    #[test]
    fn test_folding_disabled() -> Result<()> {
        let mut module = Module::new("unit");
        let sq = leaf(&mut module, "sq")?;
        let user = module.add_function(Function::new("user", Vec::new(), IrType::i32()))?;
        FunctionBuilder::define(&mut module, user, |b| {
            b.block("entry");
            let v = b.call(sq, vec![Value::i32(7)]);
            b.ret(v);
        })?;
        let config = MemoizeConfig {
            fold_constants: false,
            ..MemoizeConfig::default()
        };
        let approval = approve(&module, &config, sq)?;
        let outcome = CallSiteRewriter::new(&config)
            .rewrite(&mut module, &approval)?
            .ok_or_else(|| malformed_error!("no rewrite"))?;
        assert!(!outcome.descriptor.has_folded_constants());
        assert_eq!(outcome.descriptor.parameter_order, vec![IrType::i32()]);
        Ok(())
    }
}
