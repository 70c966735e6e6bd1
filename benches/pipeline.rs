//! Benchmarks the lex → parse → expand → transpile pipeline on a
//! handful of representative programs. Macro expansion runs against
//! [`NoBridge`] since no real host process is available in a benchmark
//! harness; none of these programs use `,(...)`, so the bridge is never
//! actually called.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wisp::compiler::compile;
use wisp::macros::NoBridge;

const ARITHMETIC: &str = "(+ 1 1 1)";

const FUNCTION_DEFINITION: &str = "(fn add [x y] (+ x y)) (add 1 2)";

const RECURSIVE_PROGRAM: &str = r#"
(fn fib [n]
  (if (< n 2)
    n
    (+ (fib (- n 1)) (fib (- n 2)))))

(fn main []
  (do
    (var i 0)
    (while (< i 10)
      (do
        (println (fib i))
        (set i (+ i 1))))))
"#;

fn bench_arithmetic(c: &mut Criterion) {
    c.bench_function("compile arithmetic", |b| {
        b.iter(|| compile(black_box(ARITHMETIC), &mut NoBridge).unwrap())
    });
}

fn bench_function_definition(c: &mut Criterion) {
    c.bench_function("compile function definition", |b| {
        b.iter(|| compile(black_box(FUNCTION_DEFINITION), &mut NoBridge).unwrap())
    });
}

fn bench_recursive_program(c: &mut Criterion) {
    c.bench_function("compile recursive program", |b| {
        b.iter(|| compile(black_box(RECURSIVE_PROGRAM), &mut NoBridge).unwrap())
    });
}

criterion_group!(
    benches,
    bench_arithmetic,
    bench_function_definition,
    bench_recursive_program
);
criterion_main!(benches);
