use cellar::{Environment, Symbol, Value, eval, read, read_all, standard_env};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::rc::Rc;
use std::time::Duration;

fn define(env: &Rc<Environment>, source: &str) {
    for form in read_all(source).unwrap().iter() {
        eval(form, env).unwrap();
    }
}

// ============================================================================
// Reader Benchmarks
// ============================================================================

fn bench_read_small(c: &mut Criterion) {
    c.bench_function("read small expr", |b| {
        b.iter(|| black_box(read("(cons 1 2)").unwrap()))
    });
}

fn bench_read_large_list(c: &mut Criterion) {
    let source = format!(
        "(list {})",
        (0..1000).map(|i| i.to_string()).collect::<Vec<_>>().join(" ")
    );
    c.bench_function("read large list (1000 elements)", |b| {
        b.iter(|| black_box(read(&source).unwrap()))
    });
}

// ============================================================================
// Evaluation Benchmarks
// ============================================================================

fn bench_factorial(c: &mut Criterion) {
    let env = standard_env();
    define(&env, "(def! fact (fn* (n) (if (<= n 1) 1 (* n (fact (- n 1))))))");
    let call = read("(fact 20)").unwrap();
    c.bench_function("factorial 20", |b| {
        b.iter(|| black_box(eval(call.clone(), &env).unwrap()))
    });
}

fn bench_tail_recursion(c: &mut Criterion) {
    let env = standard_env();
    define(
        &env,
        "(def! count-down (fn* (n) (if (= n 0) :done (count-down (- n 1)))))",
    );
    let call = read("(count-down 10000)").unwrap();
    c.bench_function("tail recursion (10000 iterations)", |b| {
        b.iter(|| black_box(eval(call.clone(), &env).unwrap()))
    });
}

fn bench_quasiquote(c: &mut Criterion) {
    let env = standard_env();
    define(&env, "(def! xs '(1 2 3))");
    let form = read("`(a ~xs ~@xs [b ~@xs])").unwrap();
    c.bench_function("quasiquote expansion and evaluation", |b| {
        b.iter(|| black_box(eval(form.clone(), &env).unwrap()))
    });
}

// ============================================================================
// Environment Benchmarks
// ============================================================================

fn bench_lookup(c: &mut Criterion) {
    let env = standard_env();
    for i in 0..100 {
        env.set(Symbol::new(&format!("var{i}")), Value::Int(i));
    }
    let oldest = Symbol::new("var0");
    let builtin = Symbol::new("+");
    c.bench_function("lookup oldest of 100 bindings", |b| {
        b.iter(|| black_box(env.get(oldest).unwrap()))
    });
    c.bench_function("lookup builtin behind 100 bindings", |b| {
        b.iter(|| black_box(env.get(builtin).unwrap()))
    });
}

fn bench_nested_scope_lookup(c: &mut Criterion) {
    let mut env = standard_env();
    for _ in 0..50 {
        env = Environment::with_outer(&env);
    }
    let symbol = Symbol::new("car");
    c.bench_function("lookup through 50 scopes", |b| {
        b.iter(|| black_box(env.get(symbol).unwrap()))
    });
}

criterion_group!(reader_benches, bench_read_small, bench_read_large_list);

criterion_group! {
    name = eval_benches;
    config = Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_factorial,
        bench_tail_recursion,
        bench_quasiquote
}

criterion_group!(environment_benches, bench_lookup, bench_nested_scope_lookup);

criterion_main!(reader_benches, eval_benches, environment_benches);
