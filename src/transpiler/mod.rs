//! Lowers an expanded expression tree to JavaScript source text.

mod state;

use crate::error::TranspileError;
use crate::expr::{Expr, Param};
use crate::token::is_operator_word;
use state::{State, TranspileState};

/// Transpiles a whole program: every top-level expression, concatenated
/// in order. Fresh state per call, so repeated or nested invocations
/// (the macro eval bridge calls this mid-expansion) never see stale
/// state left over from a previous run.
pub fn transpile(exprs: &[Expr]) -> Result<String, TranspileError> {
    let mut t = Transpiler::new();
    let mut out = String::new();
    for e in exprs {
        out.push_str(&t.transpile_expr(e)?);
    }
    Ok(out)
}

/// Transpiles a single expression. Used by the macro eval bridge, which
/// only ever needs to lower one argument expression at a time.
pub fn transpile_one(expr: &Expr) -> Result<String, TranspileError> {
    let mut t = Transpiler::new();
    t.transpile_expr(expr)
}

struct Transpiler {
    state: TranspileState,
}

impl Transpiler {
    fn new() -> Self {
        Self {
            state: TranspileState::new(),
        }
    }

    fn transpile_expr(&mut self, e: &Expr) -> Result<String, TranspileError> {
        match e {
            Expr::Nil { .. } => Ok("nil".to_string()),
            Expr::Int { value, .. } => Ok(value.to_string()),
            Expr::Float { value, .. } => Ok(format_float(*value)),
            Expr::Bool { value, .. } => Ok(value.to_string()),
            Expr::String { value, .. } => Ok(format!("{value:?}")),
            Expr::Identifier { name, .. } => Ok(fix_name(name)),
            Expr::Atom { name, .. } => Ok(format!("{:?}", format!(":{name}"))),
            Expr::Op { pos, .. } => Err(TranspileError::MisplacedOperator { span: *pos }),
            Expr::List { items, .. } => self.transpile_list(items),
            Expr::Vec { items, .. } => self.transpile_vec(items),
            Expr::Map { entries, .. } => self.transpile_map(entries),
            Expr::Fn {
                name, params, body, ..
            } => self.transpile_fn(name.as_deref(), params, body),
            Expr::AnonymousFn { params, body, .. } => self.transpile_anonymous_fn(params, body),
            Expr::If {
                cond, then, els, ..
            } => self.transpile_if(cond, then, els),
            Expr::While { cond, body, .. } => self.transpile_while(cond, body),
            Expr::Do { exprs, .. } => self.transpile_do(exprs),
            Expr::Var { name, value, .. } => self.transpile_var(name, value),
            Expr::Set { name, value, .. } => self.transpile_set(name, value),
            Expr::Get { expr, index, .. } => self.transpile_get(expr, index),
            Expr::DotList { chain, .. } => self.transpile_dotlist(chain),
            Expr::Macro { .. } => Ok(self.transpile_macro_comment(e)),
            Expr::Quote { expr, .. } => Ok(expr.to_source()),
            Expr::Quasiquote { expr, .. } | Expr::Unquote { expr, .. } | Expr::UnquoteSplicing { expr, .. } => {
                // Only reachable if expansion was skipped; fall back to
                // the residual source text, same as a leftover `Quote`.
                Ok(expr.to_source())
            }
        }
    }

    fn transpile_list(&mut self, items: &[Expr]) -> Result<String, TranspileError> {
        if items.is_empty() {
            return Ok("()".to_string());
        }
        if let Expr::Op { symbol, .. } = &items[0] {
            if is_operator_word(symbol) {
                return self.transpile_binary_operation(symbol, &items[1..]);
            }
        }
        self.transpile_call(items)
    }

    fn transpile_call(&mut self, items: &[Expr]) -> Result<String, TranspileError> {
        if let Expr::Identifier { name, .. } = &items[0] {
            let mut s = String::new();
            s.push_str(&fix_name(name));
            s.push('(');
            {
                let _guard = self.state.enter(State::NoSemicolon);
                let rest = &items[1..];
                for (i, item) in rest.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    s.push_str(&self.transpile_expr(item)?);
                }
            }
            if self.state.current() == State::NoSemicolon {
                s.push(')');
            } else {
                s.push_str(");");
            }
            return Ok(s);
        }
        // Non-identifier head: the whole list becomes an array literal.
        let mut s = String::new();
        s.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                s.push_str(", ");
            }
            s.push_str(&self.transpile_expr(item)?);
        }
        s.push(']');
        Ok(s)
    }

    fn transpile_binary_operation(&mut self, op: &str, operands: &[Expr]) -> Result<String, TranspileError> {
        let _guard = self.state.enter(State::NoSemicolon);
        let opstr = match op {
            "=" => "==",
            "and" => "&&",
            "or" => "||",
            other => other,
        };
        let mut s = String::from("(");
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                s.push(' ');
                s.push_str(opstr);
                s.push(' ');
            }
            s.push_str(&self.transpile_expr(operand)?);
        }
        s.push(')');
        Ok(s)
    }

    fn transpile_dotlist(&mut self, chain: &[Expr]) -> Result<String, TranspileError> {
        let _guard = self.state.enter(State::NoSemicolon);
        let mut s = String::new();
        for (i, item) in chain.iter().enumerate() {
            if i > 0 {
                s.push('.');
            }
            s.push_str(&self.transpile_expr(item)?);
        }
        Ok(s)
    }

    fn transpile_fn(&mut self, name: Option<&str>, params: &[Param], body: &Expr) -> Result<String, TranspileError> {
        let mut s = String::new();
        s.push_str("function ");
        s.push_str(&fix_name(name.unwrap_or("")));
        s.push('(');
        self.push_params(&mut s, params);
        s.push_str(") { return ");
        s.push_str(&self.transpile_expr(body)?);
        s.push_str(" }\n\n");
        Ok(s)
    }

    fn transpile_anonymous_fn(&mut self, params: &[Param], body: &Expr) -> Result<String, TranspileError> {
        let mut s = String::from("(");
        self.push_params(&mut s, params);
        s.push_str(") => ");
        s.push_str(&self.transpile_expr(body)?);
        Ok(s)
    }

    fn push_params(&self, s: &mut String, params: &[Param]) {
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                s.push_str(", ");
            }
            s.push_str(&self.transpile_param(p));
        }
    }

    fn transpile_param(&self, p: &Param) -> String {
        match p {
            Param::Identifier { name, .. } => fix_name(name),
            Param::VariableArg { name, .. } => format!("...{}", fix_name(name)),
            Param::Destructure { names, .. } => {
                let inner: Vec<String> = names.iter().map(|n| self.transpile_param(n)).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }

    fn transpile_if(&mut self, cond: &Expr, then: &Expr, els: &Expr) -> Result<String, TranspileError> {
        let _guard = self.state.enter(State::NoSemicolon);
        let cond_s = self.transpile_expr(cond)?;
        let then_s = self.transpile_expr(then)?;
        let els_s = self.transpile_expr(els)?;
        Ok(format!("(() => {cond_s} ? {then_s} : {els_s})()"))
    }

    fn transpile_while(&mut self, cond: &Expr, body: &Expr) -> Result<String, TranspileError> {
        let cond_s = self.transpile_expr(cond)?;
        let body_s = self.transpile_expr(body)?;
        Ok(format!("(() => {{ while ({cond_s}) {{ {body_s} }} }})();"))
    }

    fn transpile_do(&mut self, exprs: &[Expr]) -> Result<String, TranspileError> {
        let mut s = String::from("(() => { ");
        {
            let _guard = self.state.enter(State::NoSemicolon);
            for (i, e) in exprs.iter().enumerate() {
                let code = self.transpile_expr(e)?;
                if i == exprs.len() - 1 {
                    s.push_str("return ");
                }
                s.push_str(&code);
                s.push_str("; ");
            }
        }
        s.push_str("})()");
        if self.state.current() != State::NoSemicolon {
            s.push(';');
        }
        Ok(s)
    }

    fn transpile_var(&mut self, name: &str, value: &Expr) -> Result<String, TranspileError> {
        let v = self.transpile_expr(value)?;
        let name = fix_name(name);
        if self.state.current() == State::NoSemicolon {
            Ok(format!("let {name} = {v}"))
        } else {
            Ok(format!("let {name} = {v};"))
        }
    }

    fn transpile_set(&mut self, name: &str, value: &Expr) -> Result<String, TranspileError> {
        let v = self.transpile_expr(value)?;
        let name = fix_name(name);
        if self.state.current() == State::NoSemicolon {
            Ok(format!("{name} = {v}"))
        } else {
            Ok(format!("{name} = {v};"))
        }
    }

    fn transpile_get(&mut self, expr: &Expr, index: &Expr) -> Result<String, TranspileError> {
        let e = self.transpile_expr(expr)?;
        let i = self.transpile_expr(index)?;
        Ok(format!("{e}[{i}]"))
    }

    fn transpile_map(&mut self, entries: &[Expr]) -> Result<String, TranspileError> {
        let mut s = String::from("({");
        let mut pairs = entries.chunks(2);
        let mut first = true;
        for pair in &mut pairs {
            if !first {
                s.push_str(", ");
            }
            first = false;
            let k = self.transpile_expr(&pair[0])?;
            let v = self.transpile_expr(&pair[1])?;
            s.push_str(&k);
            s.push_str(": ");
            s.push_str(&v);
        }
        s.push_str("})");
        Ok(s)
    }

    fn transpile_vec(&mut self, items: &[Expr]) -> Result<String, TranspileError> {
        let mut s = String::from("[");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                s.push_str(", ");
            }
            s.push_str(&self.transpile_expr(item)?);
        }
        s.push(']');
        Ok(s)
    }

    fn transpile_macro_comment(&self, e: &Expr) -> String {
        let src = e.to_source();
        let commented: Vec<String> = src.lines().map(|l| format!("// {l}")).collect();
        format!("{}\n\n", commented.join("\n"))
    }
}

/// Rewrites an identifier into a valid JavaScript name. Order matters:
/// `->` must be rewritten before the lone `-` rule, or an arrow
/// identifier would be mangled twice.
fn fix_name(name: &str) -> String {
    name.replace("->", "_arrow_")
        .replace('-', "_")
        .replace('?', "P")
        .replace('!', "Ex")
}

fn format_float(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::macros::{Expander, NoBridge};
    use crate::parser::Parser;

    fn compile(src: &str) -> String {
        let tokens = lex(src.as_bytes()).unwrap();
        let exprs = Parser::parse(tokens).unwrap();
        let expanded = Expander::expand(exprs, &mut NoBridge).unwrap();
        transpile(&expanded).unwrap()
    }

    #[test]
    fn arithmetic_call() {
        assert_eq!(compile("(+ 1 1 1)"), "(1 + 1 + 1)");
    }

    #[test]
    fn function_call_gets_semicolon() {
        assert_eq!(compile("(add 1 1)"), "add(1, 1);");
    }

    #[test]
    fn named_function() {
        assert_eq!(
            compile("(fn add [x y] (+ x y))"),
            "function add(x, y) { return (x + y) }\n\n"
        );
    }

    #[test]
    fn mangles_arrow_identifier() {
        assert_eq!(
            compile("(fn pair->sum [[x y]] (+ x y))"),
            "function pair_arrow_sum([x, y]) { return (x + y) }\n\n"
        );
    }

    #[test]
    fn dotlist_chain() {
        assert_eq!(
            compile("(. (Array 10) (fill 1) (map (fn [_ i] i)))"),
            "Array(10).fill(1).map((_, i) => i)"
        );
    }

    #[test]
    fn if_expression() {
        assert_eq!(compile("(if (< 1 2) 1 2)"), "(() => (1 < 2) ? 1 : 2)()");
    }

    #[test]
    fn do_block() {
        assert_eq!(compile("(do 1 2 3)"), "(() => { 1; 2; return 3; })();");
    }

    #[test]
    fn while_loop() {
        assert_eq!(
            compile(r#"(while (< 1 2) (println "infinite loop!"))"#),
            "(() => { while ((1 < 2)) { println(\"infinite loop!\"); } })();"
        );
    }

    #[test]
    fn misplaced_operator_is_an_error() {
        let tokens = lex(b"+").unwrap();
        let exprs = Parser::parse(tokens).unwrap();
        let err = transpile(&exprs).unwrap_err();
        assert!(matches!(err, TranspileError::MisplacedOperator { .. }));
    }
}
