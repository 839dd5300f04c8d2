//! Benchmarks for the memoization pass.
//!
//! Measures:
//! - Classification of deep call chains (the bounded recursive walk)
//! - Classification of wide call fans (verdict caching across siblings)
//! - A full pass over a module with many memoizable leaves and callers

extern crate memoscope;

use criterion::{criterion_group, criterion_main, Criterion};
use memoscope::prelude::*;
use std::hint::black_box;

fn leaf(module: &mut Module, name: &str) -> Result<FuncId> {
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

/// Chain of `calls` nested calls ending in a leaf.
fn chain_module(calls: usize) -> Result<(Module, FuncId)> {
    let mut module = Module::new("chain");
    let mut callee = leaf(&mut module, "leaf")?;
    for level in 0..calls {
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

/// Two-level fan: `root` calls `width` functions, each calling the same leaf.
fn fan_module(width: usize) -> Result<(Module, FuncId)> {
    let mut module = Module::new("fan");
    let shared = leaf(&mut module, "shared")?;
    let mut middles = Vec::with_capacity(width);
    for i in 0..width {
        let id = module.add_function(Function::new(
            format!("m{i}"),
            vec![Parameter::new("x", IrType::i32())],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, id, |b| {
            b.block("entry");
            let x = b.arg(0);
            let v = b.call(shared, vec![x]);
            b.ret(v);
        })?;
        middles.push(id);
    }
    let root = module.add_function(Function::new(
        "root",
        vec![Parameter::new("x", IrType::i32())],
        IrType::i32(),
    ))?;
    FunctionBuilder::define(&mut module, root, |b| {
        b.block("entry");
        let x = b.arg(0);
        let mut acc = Value::i32(0);
        for m in &middles {
            let v = b.call(*m, vec![x.clone()]);
            acc = b.add(v, acc);
        }
        b.ret(acc);
    })?;
    Ok((module, root))
}

/// `count` leaves, each called from its own caller with a literal and a runtime value.
fn program_module(count: usize) -> Result<Module> {
    let mut module = Module::new("program");
    let g = module.add_global(GlobalVariable::new("scale", IrType::i32()));
    for i in 0..count {
        let f = module.add_function(Function::new(
            format!("f{i}"),
            vec![
                Parameter::new("k", IrType::i32()),
                Parameter::new("x", IrType::F64),
            ],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, f, |b| {
            b.block("entry");
            let k = b.arg(0);
            let s = b.load(Value::Global(g));
            let v = b.mul(k, s);
            b.ret(v);
        })?;
        let caller = module.add_function(Function::new(
            format!("caller{i}"),
            vec![Parameter::new("x", IrType::F64)],
            IrType::i32(),
        ))?;
        FunctionBuilder::define(&mut module, caller, |b| {
            b.block("entry");
            let x = b.arg(0);
            let a = b.call(f, vec![Value::i32(3), x.clone()]);
            let c = b.call(f, vec![Value::i32(4), x]);
            let v = b.add(a, c);
            b.ret(v);
        })?;
    }
    Ok(module)
}

/// Benchmark classifying a chain just below the depth bound.
fn bench_classify_chain(c: &mut Criterion) {
    let Ok((module, head)) = chain_module(9) else {
        return;
    };
    let config = MemoizeConfig::default();

    c.bench_function("classify_chain_9", |b| {
        b.iter(|| {
            let classifier = EligibilityClassifier::new(&module, &config, &AttributeOracle);
            black_box(classifier.classify(black_box(head)))
        });
    });
}

/// Benchmark classifying a chain rejected by the depth bound.
fn bench_classify_chain_rejected(c: &mut Criterion) {
    let Ok((module, head)) = chain_module(64) else {
        return;
    };
    let config = MemoizeConfig::default();

    c.bench_function("classify_chain_64_rejected", |b| {
        b.iter(|| {
            let classifier = EligibilityClassifier::new(&module, &config, &AttributeOracle);
            black_box(classifier.classify(black_box(head)))
        });
    });
}

/// Benchmark classifying a wide fan sharing one leaf.
fn bench_classify_fan(c: &mut Criterion) {
    let Ok((module, root)) = fan_module(256) else {
        return;
    };
    let config = MemoizeConfig::default();

    c.bench_function("classify_fan_256", |b| {
        b.iter(|| {
            let classifier = EligibilityClassifier::new(&module, &config, &AttributeOracle);
            black_box(classifier.classify(black_box(root)))
        });
    });
}

/// Benchmark a full pass: classification, rewriting and descriptor emission.
fn bench_memoize_pass(c: &mut Criterion) {
    let Ok(module) = program_module(200) else {
        return;
    };

    c.bench_function("memoize_pass_200", |b| {
        b.iter(|| {
            let mut module = module.clone();
            let mut ctx = CompilerContext::new();
            let report = MemoizePass::new().run_on_module(&mut module, &mut ctx);
            black_box(report.map(|r| r.memoized_count()))
        });
    });
}

/// Benchmark the side-effect fixpoint over a long chain.
fn bench_side_effect_analysis(c: &mut Criterion) {
    let Ok((module, _)) = chain_module(256) else {
        return;
    };

    c.bench_function("side_effect_analysis_chain_256", |b| {
        b.iter(|| black_box(SideEffectAnalysis::analyze(black_box(&module))));
    });
}

criterion_group!(
    benches,
    bench_classify_chain,
    bench_classify_chain_rejected,
    bench_classify_fan,
    bench_memoize_pass,
    bench_side_effect_analysis,
);
criterion_main!(benches);
