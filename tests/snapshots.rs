//! Golden-fixture tests for the larger, multi-form programs where a
//! literal `assert_eq!` string would be unwieldy to read or maintain.
//! Uses inline snapshots (the expected JavaScript lives right in the
//! test, not in a side-car `.snap` file) so a reviewer can see what
//! changed without round-tripping through `cargo insta review`.

use wisp::compiler::compile;
use wisp::macros::NoBridge;

#[test]
fn recursive_fibonacci_program() {
    let js = compile(
        r#"
(fn fib [n]
  (if (< n 2)
    n
    (+ (fib (- n 1)) (fib (- n 2)))))

(fib 10)
"#,
        &mut NoBridge,
    )
    .unwrap();
    insta::assert_snapshot!(js, @r###"
    function fib(n) { return (() => (n < 2) ? n : (fib((n - 1)) + fib((n - 2))))() }

    fib(10);
    "###);
}

#[test]
fn named_function_returning_a_vector_literal() {
    let js = compile(
        r#"
(fn make-pair [a b] [a b])
(make-pair 1 2)
"#,
        &mut NoBridge,
    )
    .unwrap();
    insta::assert_snapshot!(js, @r###"
    function make_pair(a, b) { return [a, b] }

    make_pair(1, 2);
    "###);
}

#[test]
fn destructured_param_in_a_named_function() {
    let js = compile(
        r#"
(fn sum-pair [[a b]] (+ a b))
(sum-pair [1 2])
"#,
        &mut NoBridge,
    )
    .unwrap();
    insta::assert_snapshot!(js, @r###"
    function sum_pair([a, b]) { return (a + b) }

    sum_pair([1, 2]);
    "###);
}
