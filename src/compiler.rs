//! The compiler driver: wires lexer → parser → expander → transpiler
//! into the single-call entry points used by both the CLI (whole-file
//! compiles) and the macro expander's eval bridge (single-expression
//! round trips through the running JavaScript host).
//!
//! Every function here is re-entrant — a fresh [`crate::lexer::Lexer`]
//! and [`crate::parser::Parser`] are constructed per call, and no
//! process-wide mutable state is kept — because the eval bridge calls
//! back into this module from the middle of an already-running
//! expansion.

use crate::error::WispError;
use crate::expr::Expr;
use crate::lexer;
use crate::macros::{EvalBridge, Expander};
use crate::parser::Parser;
use crate::pp::HostFrame;
use crate::runtime::{Runtime, RuntimeConfig};
use crate::transpiler;

/// Lexes and parses `source`, without expansion. Exposed for
/// `--debug` token/expression dumps.
pub fn parse(source: &str) -> Result<Vec<Expr>, WispError> {
    let tokens = lexer::lex(source.as_bytes())?;
    Ok(Parser::parse(tokens)?)
}

/// True if any expression in `exprs` contains an `Unquote` or
/// `UnquoteSplicing` node anywhere in its tree — i.e. expansion will
/// need a live [`EvalBridge`] to resolve at least one compile-time
/// evaluation. Used by the CLI to decide whether compiling a file
/// requires spawning the host process at all.
///
/// A plain text search for `,(` is not enough: the eval bridge fires
/// for `,n` (an unquoted identifier, as in the worked `(macro inc [n]
/// `(+ ,n 1))` example) just as much as for `,(...)`, so this walks the
/// parsed tree instead of guessing from source bytes.
pub fn needs_eval_bridge(exprs: &[Expr]) -> bool {
    exprs.iter().any(expr_needs_eval_bridge)
}

fn expr_needs_eval_bridge(e: &Expr) -> bool {
    match e {
        Expr::Unquote { .. } | Expr::UnquoteSplicing { .. } => true,
        Expr::List { items, .. } | Expr::Vec { items, .. } => {
            items.iter().any(expr_needs_eval_bridge)
        }
        Expr::Map { entries, .. } => entries.iter().any(expr_needs_eval_bridge),
        Expr::Fn { body, .. } | Expr::AnonymousFn { body, .. } | Expr::Macro { body, .. } => {
            expr_needs_eval_bridge(body)
        }
        Expr::If { cond, then, els, .. } => {
            expr_needs_eval_bridge(cond) || expr_needs_eval_bridge(then) || expr_needs_eval_bridge(els)
        }
        Expr::While { cond, body, .. } => {
            expr_needs_eval_bridge(cond) || expr_needs_eval_bridge(body)
        }
        Expr::Do { exprs, .. } => exprs.iter().any(expr_needs_eval_bridge),
        Expr::Var { value, .. } | Expr::Set { value, .. } => expr_needs_eval_bridge(value),
        Expr::Get { expr, index, .. } => {
            expr_needs_eval_bridge(expr) || expr_needs_eval_bridge(index)
        }
        Expr::DotList { chain, .. } => chain.iter().any(expr_needs_eval_bridge),
        Expr::Quote { expr, .. } | Expr::Quasiquote { expr, .. } => expr_needs_eval_bridge(expr),
        _ => false,
    }
}

/// Lexes, parses, and expands `source` against `bridge`, returning the
/// macro-free expression tree.
pub fn expand(source: &str, bridge: &mut dyn EvalBridge) -> Result<Vec<Expr>, WispError> {
    let exprs = parse(source)?;
    Ok(Expander::expand(exprs, bridge)?)
}

/// Full pipeline: lex, parse, expand, transpile. This is what both the
/// CLI's file compilation and the REPL's per-line evaluation call.
pub fn compile(source: &str, bridge: &mut dyn EvalBridge) -> Result<String, WispError> {
    let expanded = expand(source, bridge)?;
    Ok(transpiler::transpile(&expanded)?)
}

/// A live connection to the external JavaScript host, doubling as the
/// macro expander's [`EvalBridge`].
///
/// Evaluating `,(...)` inside a quasiquote lowers the unquoted
/// argument to JavaScript with [`transpiler::transpile_one`], wraps it
/// in `console.log(...)`, sends it to the host, and re-lexes +
/// re-parses the single line of text that comes back — exactly the
/// re-entrant round trip the eval bridge requires.
pub struct HostDriver {
    runtime: Runtime,
}

impl HostDriver {
    /// Spawns the host process, priming it with the embedded stdlib.
    pub fn spawn(config: RuntimeConfig) -> Result<Self, WispError> {
        let runtime = Runtime::spawn(config, crate::stdlib::SOURCE)?;
        Ok(Self { runtime })
    }

    /// Sends already-transpiled JavaScript to the host directly, for
    /// `--run` and the REPL's post-submit execution.
    pub fn run_js(&mut self, program_js: &str) -> Result<HostFrame, WispError> {
        Ok(self.runtime.send(program_js)?)
    }
}

impl EvalBridge for HostDriver {
    fn eval(&mut self, expr: &Expr) -> Result<Expr, String> {
        let js = transpiler::transpile_one(expr).map_err(|e| e.to_string())?;
        let wrapped = format!("console.log({js});\n");
        let frame = self.runtime.send(&wrapped).map_err(|e| e.to_string())?;
        let text = match frame {
            HostFrame::Result(text) => text,
            HostFrame::Error(message) => return Err(message),
        };
        let tokens = lexer::lex(text.as_bytes()).map_err(|e| e.to_string())?;
        let exprs = Parser::parse(tokens).map_err(|e| e.to_string())?;
        match <[Expr; 1]>::try_from(exprs) {
            Ok([only]) => Ok(only),
            Err(exprs) => Err(format!(
                "eval bridge expected exactly one expression back from the host, got {}",
                exprs.len()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::NoBridge;

    #[test]
    fn compile_without_macros_lowers_to_js() {
        let js = compile("(+ 1 1 1)", &mut NoBridge).unwrap();
        assert_eq!(js, "(1 + 1 + 1)");
    }

    #[test]
    fn parse_exposes_the_raw_tree_for_debug_dumps() {
        let exprs = parse("(add 1 1)").unwrap();
        assert_eq!(exprs.len(), 1);
    }

    /// A stub bridge recording the JS it was asked to evaluate and
    /// answering with a fixed expression, used to test [`HostDriver`]'s
    /// re-lex/re-parse contract without a real host process.
    struct StubBridge {
        answer: &'static str,
    }

    impl EvalBridge for StubBridge {
        fn eval(&mut self, _expr: &Expr) -> Result<Expr, String> {
            let tokens = lexer::lex(self.answer.as_bytes()).unwrap();
            let mut exprs = Parser::parse(tokens).unwrap();
            Ok(exprs.remove(0))
        }
    }

    #[test]
    fn quasiquote_unquote_round_trips_through_a_bridge() {
        let mut bridge = StubBridge { answer: "2" };
        let exprs = expand("`,(+ 1 1)", &mut bridge).unwrap();
        assert!(matches!(exprs[0], Expr::Int { value: 2, .. }));
    }

    #[test]
    fn needs_eval_bridge_detects_an_unquoted_bare_identifier() {
        let exprs = parse("(macro inc [n] `(+ ,n 1)) (var x 0) (inc x)").unwrap();
        assert!(needs_eval_bridge(&exprs));
    }

    #[test]
    fn needs_eval_bridge_is_false_for_macro_free_source() {
        let exprs = parse("(fn add [x y] (+ x y)) (add 1 2)").unwrap();
        assert!(!needs_eval_bridge(&exprs));
    }

    #[test]
    fn needs_eval_bridge_is_false_for_quotation_with_no_unquote() {
        let exprs = parse("'(1 2 3) `(4 5 6)").unwrap();
        assert!(!needs_eval_bridge(&exprs));
    }
}
