//! The expression tree produced by the parser and consumed by the macro
//! expander and transpiler.
//!
//! Every variant carries its own `pos: Position` field, following the
//! same convention as [`crate::token::Token`]. Variants marked *special*
//! in the spec (`If`, `While`, `Do`, `Var`, `Set`, `Get`, `DotList`,
//! `Macro`) are produced only by the parser's desugaring of a
//! recognized head symbol — they never appear as raw, un-desugared
//! lists once parsing has finished.

use crate::position::Position;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single function/macro parameter: a plain name, a destructuring
/// vector of names, or a trailing `& rest` marker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Param {
    Identifier { name: String, pos: Position },
    Destructure { names: Vec<Param>, pos: Position },
    VariableArg { name: String, pos: Position },
}

impl Param {
    pub fn pos(&self) -> Position {
        match self {
            Param::Identifier { pos, .. } => *pos,
            Param::Destructure { pos, .. } => *pos,
            Param::VariableArg { pos, .. } => *pos,
        }
    }
}

/// A parsed (and, after expansion, macro-free) expression node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Expr {
    Nil {
        pos: Position,
    },
    Int {
        value: i64,
        pos: Position,
    },
    Float {
        value: f64,
        pos: Position,
    },
    Bool {
        value: bool,
        pos: Position,
    },
    String {
        value: String,
        pos: Position,
    },
    Identifier {
        name: String,
        pos: Position,
    },
    /// A keyword-like atom, printed as `:name`.
    Atom {
        name: String,
        pos: Position,
    },
    /// A bare operator symbol appearing outside of a call head — only
    /// valid as the head of a list; any other position is a
    /// [`crate::error::TranspileError::MisplacedOperator`].
    Op {
        symbol: String,
        pos: Position,
    },

    List {
        items: Vec<Expr>,
        pos: Position,
    },
    Vec {
        items: Vec<Expr>,
        pos: Position,
    },
    /// A flat, even-length key/value sequence; insertion order is
    /// preserved and matters for emission.
    Map {
        entries: Vec<Expr>,
        pos: Position,
    },

    Fn {
        name: Option<String>,
        params: Vec<Param>,
        doc: Option<String>,
        body: Box<Expr>,
        pos: Position,
    },
    AnonymousFn {
        params: Vec<Param>,
        body: Box<Expr>,
        pos: Position,
    },

    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
        pos: Position,
    },
    While {
        cond: Box<Expr>,
        body: Box<Expr>,
        pos: Position,
    },
    Do {
        exprs: Vec<Expr>,
        pos: Position,
    },
    Var {
        name: String,
        value: Box<Expr>,
        pos: Position,
    },
    Set {
        name: String,
        value: Box<Expr>,
        pos: Position,
    },
    Get {
        expr: Box<Expr>,
        index: Box<Expr>,
        pos: Position,
    },
    /// `(. recv m1 m2 ...)`, at least two elements in `chain`.
    DotList {
        chain: Vec<Expr>,
        pos: Position,
    },
    Macro {
        name: String,
        params: Vec<Param>,
        body: Box<Expr>,
        pos: Position,
    },

    Quote {
        expr: Box<Expr>,
        pos: Position,
    },
    Quasiquote {
        expr: Box<Expr>,
        pos: Position,
    },
    Unquote {
        expr: Box<Expr>,
        pos: Position,
    },
    UnquoteSplicing {
        expr: Box<Expr>,
        pos: Position,
    },
}

impl Expr {
    pub fn pos(&self) -> Position {
        use Expr::*;
        match self {
            Nil { pos }
            | Int { pos, .. }
            | Float { pos, .. }
            | Bool { pos, .. }
            | String { pos, .. }
            | Identifier { pos, .. }
            | Atom { pos, .. }
            | Op { pos, .. }
            | List { pos, .. }
            | Vec { pos, .. }
            | Map { pos, .. }
            | Fn { pos, .. }
            | AnonymousFn { pos, .. }
            | If { pos, .. }
            | While { pos, .. }
            | Do { pos, .. }
            | Var { pos, .. }
            | Set { pos, .. }
            | Get { pos, .. }
            | DotList { pos, .. }
            | Macro { pos, .. }
            | Quote { pos, .. }
            | Quasiquote { pos, .. }
            | Unquote { pos, .. }
            | UnquoteSplicing { pos, .. } => *pos,
        }
    }

    /// True if this is an `Identifier` naming `name`.
    pub fn is_identifier(&self, name: &str) -> bool {
        matches!(self, Expr::Identifier { name: n, .. } if n == name)
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Renders the canonical source-language text for this expression.
    /// Used by residual `Quote` transpilation and by the macro eval
    /// bridge's re-lex/re-parse round trip.
    pub fn to_source(&self) -> String {
        let mut s = std::string::String::new();
        write_source(self, &mut s);
        s
    }
}

fn write_params(params: &[Param], out: &mut std::string::String) {
    out.push('[');
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_param(p, out);
    }
    out.push(']');
}

fn write_param(p: &Param, out: &mut std::string::String) {
    match p {
        Param::Identifier { name, .. } => out.push_str(name),
        Param::VariableArg { name, .. } => {
            out.push('&');
            out.push(' ');
            out.push_str(name);
        }
        Param::Destructure { names, .. } => {
            out.push('[');
            for (i, n) in names.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_param(n, out);
            }
            out.push(']');
        }
    }
}

fn write_list(items: &[Expr], out: &mut std::string::String) {
    out.push('(');
    for (i, e) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_source(e, out);
    }
    out.push(')');
}

fn write_source(e: &Expr, out: &mut std::string::String) {
    use Expr::*;
    match e {
        Nil { .. } => out.push_str("nil"),
        Int { value, .. } => out.push_str(&value.to_string()),
        Float { value, .. } => out.push_str(&value.to_string()),
        Bool { value, .. } => out.push_str(&value.to_string()),
        String { value, .. } => {
            out.push('"');
            out.push_str(value);
            out.push('"');
        }
        Identifier { name, .. } => out.push_str(name),
        Atom { name, .. } => {
            out.push(':');
            out.push_str(name);
        }
        Op { symbol, .. } => out.push_str(symbol),
        List { items, .. } => write_list(items, out),
        Vec { items, .. } => {
            out.push('[');
            for (i, e) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_source(e, out);
            }
            out.push(']');
        }
        Map { entries, .. } => {
            out.push('{');
            for (i, e) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_source(e, out);
            }
            out.push('}');
        }
        Fn {
            name, params, body, ..
        } => {
            out.push_str("(fn ");
            if let Some(n) = name {
                out.push_str(n);
                out.push(' ');
            }
            write_params(params, out);
            out.push(' ');
            write_source(body, out);
            out.push(')');
        }
        AnonymousFn { params, body, .. } => {
            out.push_str("(fn ");
            write_params(params, out);
            out.push(' ');
            write_source(body, out);
            out.push(')');
        }
        If {
            cond, then, els, ..
        } => {
            out.push_str("(if ");
            write_source(cond, out);
            out.push(' ');
            write_source(then, out);
            out.push(' ');
            write_source(els, out);
            out.push(')');
        }
        While { cond, body, .. } => {
            out.push_str("(while ");
            write_source(cond, out);
            out.push(' ');
            write_source(body, out);
            out.push(')');
        }
        Do { exprs, .. } => {
            out.push_str("(do");
            for e in exprs {
                out.push(' ');
                write_source(e, out);
            }
            out.push(')');
        }
        Var { name, value, .. } => {
            out.push_str("(var ");
            out.push_str(name);
            out.push(' ');
            write_source(value, out);
            out.push(')');
        }
        Set { name, value, .. } => {
            out.push_str("(set ");
            out.push_str(name);
            out.push(' ');
            write_source(value, out);
            out.push(')');
        }
        Get { expr, index, .. } => {
            out.push_str("(get ");
            write_source(expr, out);
            out.push(' ');
            write_source(index, out);
            out.push(')');
        }
        DotList { chain, .. } => {
            out.push_str("(.");
            for e in chain {
                out.push(' ');
                write_source(e, out);
            }
            out.push(')');
        }
        Macro {
            name, params, body, ..
        } => {
            out.push_str("(macro ");
            out.push_str(name);
            out.push(' ');
            write_params(params, out);
            out.push(' ');
            write_source(body, out);
            out.push(')');
        }
        Quote { expr, .. } => {
            out.push('\'');
            write_source(expr, out);
        }
        Quasiquote { expr, .. } => {
            out.push('`');
            write_source(expr, out);
        }
        Unquote { expr, .. } => {
            out.push(',');
            write_source(expr, out);
        }
        UnquoteSplicing { expr, .. } => {
            out.push_str(",@");
            write_source(expr, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Expr {
        Expr::Identifier {
            name: name.into(),
            pos: Position::new(0, 1),
        }
    }

    #[test]
    fn list_source_round_trips() {
        let list = Expr::List {
            items: vec![id("+"), Expr::Int { value: 1, pos: Position::new(0, 1) }],
            pos: Position::new(0, 1),
        };
        assert_eq!(list.to_source(), "(+ 1)");
    }

    #[test]
    fn pos_is_accessible_uniformly() {
        let e = Expr::Nil {
            pos: Position::new(3, 4),
        };
        assert_eq!(e.pos(), Position::new(3, 4));
    }
}
