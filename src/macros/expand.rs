//! Two-phase macro expansion: forward-declare every top-level `macro`,
//! then walk the tree top-down, recognizing and rewriting calls whose
//! head names a known macro, and resolving quotation wrappers along
//! the way.

use crate::error::ExpandError;
use crate::expr::{Expr, Param};
use crate::position::Position;
use std::collections::HashMap;

/// Bridge to the running JavaScript host, used to evaluate `,(...)`
/// at macro-expansion time. The expander only needs the result
/// expressed back as source-language text; [`crate::compiler`] wires
/// the real transpiler + runtime host + pretty-printer behind this
/// trait, and tests can substitute a stub.
pub trait EvalBridge {
    fn eval(&mut self, expr: &Expr) -> Result<Expr, String>;
}

/// An `EvalBridge` that always fails; useful for tests that exercise
/// expansion paths with no compile-time evaluation.
pub struct NoBridge;

impl EvalBridge for NoBridge {
    fn eval(&mut self, expr: &Expr) -> Result<Expr, String> {
        Err(format!("no eval bridge configured for {:?}", expr.pos()))
    }
}

/// Bounds the macro re-expansion fixpoint loop. A macro that expands
/// to a call on itself (directly or through a cycle) hits this instead
/// of recursing forever.
const MAX_EXPANSION_DEPTH: usize = 512;

#[derive(Debug, Clone)]
struct MacroDef {
    params: Vec<Param>,
    body: Expr,
}

pub struct Expander {
    macros: HashMap<String, MacroDef>,
    quasi_depth: usize,
    expansion_depth: usize,
}

impl Expander {
    pub fn new() -> Self {
        Self {
            macros: HashMap::new(),
            quasi_depth: 0,
            expansion_depth: 0,
        }
    }

    /// Expands a whole program: forward-declares top-level macros,
    /// then expands every top-level expression in order.
    pub fn expand(
        exprs: Vec<Expr>,
        bridge: &mut dyn EvalBridge,
    ) -> Result<Vec<Expr>, ExpandError> {
        let mut expander = Expander::new();
        expander.forward_declare(&exprs);
        exprs
            .into_iter()
            .map(|e| expander.expand_expr(e, bridge))
            .collect()
    }

    fn forward_declare(&mut self, exprs: &[Expr]) {
        for e in exprs {
            if let Expr::Macro {
                name, params, body, ..
            } = e
            {
                self.macros.insert(
                    name.clone(),
                    MacroDef {
                        params: params.clone(),
                        body: (**body).clone(),
                    },
                );
            }
        }
    }

    fn eval_bridge(
        &mut self,
        expr: &Expr,
        pos: Position,
        bridge: &mut dyn EvalBridge,
    ) -> Result<Expr, ExpandError> {
        bridge
            .eval(expr)
            .map_err(|message| ExpandError::EvalBridge { message, span: pos })
    }

    /// Top-down expansion outside of any quasiquote. Lists are
    /// expanded inner-first (arguments before head recognition) so
    /// macro invocations see fully expanded arguments.
    fn expand_expr(&mut self, e: Expr, bridge: &mut dyn EvalBridge) -> Result<Expr, ExpandError> {
        match e {
            Expr::Quote { expr, .. } => Ok(*expr),
            Expr::Quasiquote { expr, pos } => {
                self.quasi_depth += 1;
                let result = self.expand_quasi(*expr, bridge);
                self.quasi_depth -= 1;
                let _ = pos;
                result
            }
            Expr::Unquote { pos, .. } => {
                Err(ExpandError::UnquoteOutsideQuasiquote { span: pos })
            }
            Expr::UnquoteSplicing { pos, .. } => {
                Err(ExpandError::UnquoteOutsideQuasiquote { span: pos })
            }
            Expr::List { items, pos } => {
                let mut expanded = Vec::with_capacity(items.len());
                for item in items {
                    expanded.push(self.expand_expr(item, bridge)?);
                }
                if let Some(name) = expanded.first().and_then(Expr::as_identifier) {
                    if let Some(mac) = self.macros.get(name).cloned() {
                        return self.apply_and_reexpand(&mac, &expanded[1..], pos, bridge);
                    }
                }
                Ok(Expr::List { items: expanded, pos })
            }
            Expr::Vec { items, pos } => Ok(Expr::Vec {
                items: self.expand_all(items, bridge)?,
                pos,
            }),
            Expr::Map { entries, pos } => Ok(Expr::Map {
                entries: self.expand_all(entries, bridge)?,
                pos,
            }),
            Expr::Fn {
                name,
                params,
                doc,
                body,
                pos,
            } => Ok(Expr::Fn {
                name,
                params,
                doc,
                body: Box::new(self.expand_expr(*body, bridge)?),
                pos,
            }),
            Expr::AnonymousFn { params, body, pos } => Ok(Expr::AnonymousFn {
                params,
                body: Box::new(self.expand_expr(*body, bridge)?),
                pos,
            }),
            Expr::If {
                cond,
                then,
                els,
                pos,
            } => Ok(Expr::If {
                cond: Box::new(self.expand_expr(*cond, bridge)?),
                then: Box::new(self.expand_expr(*then, bridge)?),
                els: Box::new(self.expand_expr(*els, bridge)?),
                pos,
            }),
            Expr::While { cond, body, pos } => Ok(Expr::While {
                cond: Box::new(self.expand_expr(*cond, bridge)?),
                body: Box::new(self.expand_expr(*body, bridge)?),
                pos,
            }),
            Expr::Do { exprs, pos } => Ok(Expr::Do {
                exprs: self.expand_all(exprs, bridge)?,
                pos,
            }),
            Expr::Var { name, value, pos } => Ok(Expr::Var {
                name,
                value: Box::new(self.expand_expr(*value, bridge)?),
                pos,
            }),
            Expr::Set { name, value, pos } => Ok(Expr::Set {
                name,
                value: Box::new(self.expand_expr(*value, bridge)?),
                pos,
            }),
            Expr::Get { expr, index, pos } => Ok(Expr::Get {
                expr: Box::new(self.expand_expr(*expr, bridge)?),
                index: Box::new(self.expand_expr(*index, bridge)?),
                pos,
            }),
            Expr::DotList { chain, pos } => Ok(Expr::DotList {
                chain: self.expand_all(chain, bridge)?,
                pos,
            }),
            // Macro definitions are registered, never themselves expanded;
            // the transpiler turns them into a source-text comment.
            other @ Expr::Macro { .. } => Ok(other),
            atom => Ok(atom),
        }
    }

    fn expand_all(
        &mut self,
        items: Vec<Expr>,
        bridge: &mut dyn EvalBridge,
    ) -> Result<Vec<Expr>, ExpandError> {
        items.into_iter().map(|e| self.expand_expr(e, bridge)).collect()
    }

    /// Expansion while inside a quasiquote template. `Unquote` of a
    /// `List` (`,(...)`) escapes to compile-time evaluation, per the
    /// eval bridge's own definition; an unquote of anything else
    /// (an identifier or a literal, as in `,n` once a macro parameter
    /// has been substituted) just splices in that already-expanded
    /// expression directly, with no host round trip. `UnquoteSplicing`
    /// only makes sense as a direct list/vec element, handled in those
    /// two arms. Everything else recurses through the ordinary
    /// expander, per the rule that quasiquoted content is still
    /// macro-expanded.
    fn expand_quasi(&mut self, e: Expr, bridge: &mut dyn EvalBridge) -> Result<Expr, ExpandError> {
        match e {
            Expr::Unquote { expr, pos } => {
                if matches!(*expr, Expr::List { .. }) {
                    self.eval_bridge(&expr, pos, bridge)
                } else {
                    self.expand_expr(*expr, bridge)
                }
            }
            Expr::UnquoteSplicing { pos, .. } => {
                Err(ExpandError::SpliceNotAList { span: pos })
            }
            Expr::List { items, pos } => {
                let items = self.splice_quasi_items(items, bridge)?;
                Ok(Expr::List { items, pos })
            }
            Expr::Vec { items, pos } => {
                let items = self.splice_quasi_items(items, bridge)?;
                Ok(Expr::Vec { items, pos })
            }
            Expr::Quasiquote { expr, pos } => {
                self.quasi_depth += 1;
                let inner = self.expand_quasi(*expr, bridge);
                self.quasi_depth -= 1;
                Ok(Expr::Quasiquote {
                    expr: Box::new(inner?),
                    pos,
                })
            }
            other => self.expand_expr(other, bridge),
        }
    }

    fn splice_quasi_items(
        &mut self,
        items: Vec<Expr>,
        bridge: &mut dyn EvalBridge,
    ) -> Result<Vec<Expr>, ExpandError> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let Expr::UnquoteSplicing { expr, pos } = item {
                let value = self.eval_bridge(&expr, pos, bridge)?;
                match value {
                    Expr::List { items, .. } | Expr::Vec { items, .. } => out.extend(items),
                    _ => return Err(ExpandError::SpliceNotAList { span: pos }),
                }
            } else {
                out.push(self.expand_quasi(item, bridge)?);
            }
        }
        Ok(out)
    }

    fn apply_and_reexpand(
        &mut self,
        mac: &MacroDef,
        args: &[Expr],
        call_pos: Position,
        bridge: &mut dyn EvalBridge,
    ) -> Result<Expr, ExpandError> {
        self.expansion_depth += 1;
        if self.expansion_depth > MAX_EXPANSION_DEPTH {
            self.expansion_depth -= 1;
            return Err(ExpandError::DepthExceeded { span: call_pos });
        }
        let substituted = apply_macro(mac, args, call_pos)?;
        let result = self.expand_expr(substituted, bridge);
        self.expansion_depth -= 1;
        result
    }
}

impl Default for Expander {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds `args` against `mac.params` and substitutes every bound
/// identifier into a deep clone of the macro body.
fn apply_macro(mac: &MacroDef, args: &[Expr], call_pos: Position) -> Result<Expr, ExpandError> {
    let variadic = matches!(mac.params.last(), Some(Param::VariableArg { .. }));
    let fixed = if variadic {
        mac.params.len() - 1
    } else {
        mac.params.len()
    };
    if variadic {
        if args.len() < fixed {
            return Err(ExpandError::Arity {
                macro_name: macro_name_for_error(mac),
                span: call_pos,
            });
        }
    } else if args.len() != fixed {
        return Err(ExpandError::Arity {
            macro_name: macro_name_for_error(mac),
            span: call_pos,
        });
    }

    let mut bindings = HashMap::new();
    for (param, arg) in mac.params.iter().take(fixed).zip(args.iter()) {
        bind_param(param, arg, &mut bindings, call_pos)?;
    }
    if variadic {
        let rest = args[fixed..].to_vec();
        if let Some(Param::VariableArg { name, .. }) = mac.params.last() {
            bindings.insert(
                name.clone(),
                Expr::List {
                    items: rest,
                    pos: call_pos,
                },
            );
        }
    }

    Ok(substitute(mac.body.clone(), &bindings))
}

fn macro_name_for_error(mac: &MacroDef) -> String {
    // The call site already names the macro in source; the definition
    // itself doesn't carry its own name once forward-declared into a
    // `MacroDef`, so report the arity shape instead.
    format!("<{} param(s)>", mac.params.len())
}

fn bind_param(
    param: &Param,
    arg: &Expr,
    bindings: &mut HashMap<String, Expr>,
    call_pos: Position,
) -> Result<(), ExpandError> {
    match param {
        Param::Identifier { name, .. } => {
            bindings.insert(name.clone(), arg.clone());
            Ok(())
        }
        Param::VariableArg { name, .. } => {
            bindings.insert(name.clone(), arg.clone());
            Ok(())
        }
        Param::Destructure { names, .. } => {
            let items = match arg {
                Expr::Vec { items, .. } => items,
                _ => return Err(ExpandError::DestructureShape { span: call_pos }),
            };
            if items.len() != names.len() {
                return Err(ExpandError::DestructureShape { span: call_pos });
            }
            for (p, a) in names.iter().zip(items.iter()) {
                bind_param(p, a, bindings, call_pos)?;
            }
            Ok(())
        }
    }
}

/// Deep-clones `e`, replacing every `Identifier` bound in `bindings`.
/// Never mutates the macro definition's stored body; each call starts
/// from `mac.body.clone()`.
fn substitute(e: Expr, bindings: &HashMap<String, Expr>) -> Expr {
    match e {
        Expr::Identifier { name, pos } => bindings
            .get(&name)
            .cloned()
            .unwrap_or(Expr::Identifier { name, pos }),
        Expr::List { items, pos } => Expr::List {
            items: substitute_all(items, bindings),
            pos,
        },
        Expr::Vec { items, pos } => Expr::Vec {
            items: substitute_all(items, bindings),
            pos,
        },
        Expr::Map { entries, pos } => Expr::Map {
            entries: substitute_all(entries, bindings),
            pos,
        },
        Expr::Fn {
            name,
            params,
            doc,
            body,
            pos,
        } => Expr::Fn {
            name,
            params,
            doc,
            body: Box::new(substitute(*body, bindings)),
            pos,
        },
        Expr::AnonymousFn { params, body, pos } => Expr::AnonymousFn {
            params,
            body: Box::new(substitute(*body, bindings)),
            pos,
        },
        Expr::If {
            cond,
            then,
            els,
            pos,
        } => Expr::If {
            cond: Box::new(substitute(*cond, bindings)),
            then: Box::new(substitute(*then, bindings)),
            els: Box::new(substitute(*els, bindings)),
            pos,
        },
        Expr::While { cond, body, pos } => Expr::While {
            cond: Box::new(substitute(*cond, bindings)),
            body: Box::new(substitute(*body, bindings)),
            pos,
        },
        Expr::Do { exprs, pos } => Expr::Do {
            exprs: substitute_all(exprs, bindings),
            pos,
        },
        Expr::Var { name, value, pos } => Expr::Var {
            name,
            value: Box::new(substitute(*value, bindings)),
            pos,
        },
        Expr::Set { name, value, pos } => Expr::Set {
            name,
            value: Box::new(substitute(*value, bindings)),
            pos,
        },
        Expr::Get { expr, index, pos } => Expr::Get {
            expr: Box::new(substitute(*expr, bindings)),
            index: Box::new(substitute(*index, bindings)),
            pos,
        },
        Expr::DotList { chain, pos } => Expr::DotList {
            chain: substitute_all(chain, bindings),
            pos,
        },
        Expr::Quote { expr, pos } => Expr::Quote {
            expr: Box::new(substitute(*expr, bindings)),
            pos,
        },
        Expr::Quasiquote { expr, pos } => Expr::Quasiquote {
            expr: Box::new(substitute(*expr, bindings)),
            pos,
        },
        Expr::Unquote { expr, pos } => Expr::Unquote {
            expr: Box::new(substitute(*expr, bindings)),
            pos,
        },
        Expr::UnquoteSplicing { expr, pos } => Expr::UnquoteSplicing {
            expr: Box::new(substitute(*expr, bindings)),
            pos,
        },
        other => other,
    }
}

fn substitute_all(items: Vec<Expr>, bindings: &HashMap<String, Expr>) -> Vec<Expr> {
    items.into_iter().map(|e| substitute(e, bindings)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;

    fn expand_src(src: &str) -> Vec<Expr> {
        let tokens = lex(src.as_bytes()).unwrap();
        let exprs = Parser::parse(tokens).unwrap();
        Expander::expand(exprs, &mut NoBridge).expect("expansion should succeed")
    }

    #[test]
    fn quote_strips_to_inner_list() {
        let exprs = expand_src("'(1 2 3)");
        assert_eq!(exprs[0].to_source(), "(1 2 3)");
    }

    #[test]
    fn quasiquote_without_unquote_is_literal() {
        let exprs = expand_src("`(1 2 3)");
        assert_eq!(exprs[0].to_source(), "(1 2 3)");
    }

    #[test]
    fn unquote_outside_quasiquote_is_an_error() {
        let tokens = lex(b",(+ 1 1)").unwrap();
        let exprs = Parser::parse(tokens).unwrap();
        let err = Expander::expand(exprs, &mut NoBridge).unwrap_err();
        assert!(matches!(err, ExpandError::UnquoteOutsideQuasiquote { .. }));
    }

    #[test]
    fn simple_macro_is_expanded_inline() {
        let exprs = expand_src("(macro inc [n] `(+ ,n 1)) (inc 41)");
        // Macro definition passes through, second expr is the expansion.
        assert!(matches!(exprs[0], Expr::Macro { .. }));
        let Expr::List { items, .. } = &exprs[1] else {
            panic!("expected list, got {:?}", exprs[1]);
        };
        assert!(matches!(&items[0], Expr::Op { symbol, .. } if symbol == "+"));
    }

    #[test]
    fn macro_arity_mismatch_is_an_error() {
        let tokens = lex(b"(macro twice [a b] a) (twice 1)").unwrap();
        let exprs = Parser::parse(tokens).unwrap();
        let err = Expander::expand(exprs, &mut NoBridge).unwrap_err();
        assert!(matches!(err, ExpandError::Arity { .. }));
    }

    #[test]
    fn destructuring_param_binds_each_element() {
        let exprs = expand_src("(macro fst [[a b]] a) (fst [10 20])");
        assert!(matches!(exprs[1], Expr::Int { value: 10, .. }));
    }

    #[test]
    fn variadic_param_collects_remaining_args_as_list() {
        let exprs = expand_src("(macro wrap [& rest] rest) (wrap 1 2 3)");
        let Expr::List { items, .. } = &exprs[1] else {
            panic!("expected list, got {:?}", exprs[1]);
        };
        assert_eq!(items.len(), 3);
    }
}
