//! Exercises the CLI's output-file layout (compiled program, banner,
//! embedded stdlib) against a real temporary file, the way
//! `src/bin/wisp.rs::run_compile` writes it — without needing to spawn
//! the binary itself or a JavaScript host.

use std::fs;

use tempfile::tempdir;
use wisp::compiler::compile;
use wisp::macros::NoBridge;
use wisp::stdlib;

#[test]
fn output_file_layout_is_program_then_banner_then_stdlib() {
    let js = compile("(fn add [x y] (+ x y)) (add 1 2)", &mut NoBridge).unwrap();
    let full_output = stdlib::with_banner(&js);

    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.js");
    fs::write(&out_path, &full_output).unwrap();

    let written = fs::read_to_string(&out_path).unwrap();
    let banner_at = written.find(stdlib::BANNER).expect("banner present");
    let program_at = written.find("add(1, 2);").expect("program present");
    let stdlib_at = written.find("const nil = null;").expect("stdlib present");

    assert!(program_at < banner_at, "program must precede the banner");
    assert!(banner_at < stdlib_at, "banner must precede the stdlib");
}
