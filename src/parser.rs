//! Recursive-descent parser: tokens to an [`Expr`] tree.
//!
//! Special forms are not recognized by the lexer; `parse_list` reads a
//! balanced list generically or dispatches to a per-form reader keyed on
//! the head token, matching the shape each form needs. A small state
//! stack relaxes arity checks while inside a threading macro (`->`,
//! `->>`), whose inner forms are legitimately incomplete until they are
//! rewritten.

use crate::error::ParseError;
use crate::expr::{Expr, Param};
use crate::lexer;
use crate::position::Position;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Threading,
}

/// A re-entrant recursive-descent parser.
///
/// Re-entrant because the macro expander's eval bridge and `match`
/// desugaring both re-lex and re-parse generated text mid-expansion;
/// neither holds process-wide state, so a fresh `Parser` per buffer is
/// always correct.
pub struct Parser {
    tokens: Vec<Token>,
    i: usize,
    state: Vec<State>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            i: 0,
            state: vec![State::Normal],
        }
    }

    /// Parses every expression in the token stream.
    pub fn parse(tokens: Vec<Token>) -> Result<Vec<Expr>, ParseError> {
        let mut parser = Parser::new(tokens);
        let mut exprs = Vec::new();
        while parser.in_range() {
            exprs.push(parser.parse_expr()?);
        }
        Ok(exprs)
    }

    /// Parses exactly one expression, ignoring anything left over. Used
    /// by the macro eval bridge and by `match`'s inner re-parse of
    /// generated text, both of which expect the input to hold one
    /// complete expression.
    pub fn parse_one(tokens: Vec<Token>) -> Result<Expr, ParseError> {
        let mut parser = Parser::new(tokens);
        parser.parse_expr()
    }

    fn in_range(&self) -> bool {
        self.i < self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.i)
    }

    fn last_pos(&self) -> Position {
        self.tokens
            .get(self.i.saturating_sub(1))
            .map(|t| t.position())
            .unwrap_or_default()
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        if !self.in_range() {
            return Err(ParseError::UnexpectedEof {
                span: self.last_pos(),
            });
        }
        let t = self.tokens[self.i].clone();
        self.i += 1;
        Ok(t)
    }

    fn threading(&self) -> bool {
        matches!(self.state.last(), Some(State::Threading))
    }

    fn push_state(&mut self, s: State) {
        self.state.push(s);
    }

    fn pop_state(&mut self) {
        self.state.pop();
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let tok = self.next()?;
        match tok {
            Token::Nil(pos) => Ok(Expr::Nil { pos }),
            Token::Int(v, pos) => Ok(Expr::Int { value: v, pos }),
            Token::Float(v, pos) => Ok(Expr::Float { value: v, pos }),
            Token::Bool(v, pos) => Ok(Expr::Bool { value: v, pos }),
            Token::String(v, pos) => Ok(Expr::String { value: v, pos }),
            Token::Atom(v, pos) => Ok(Expr::Atom { name: v, pos }),
            Token::Operator(v, pos) => Ok(Expr::Op { symbol: v, pos }),
            Token::Identifier(v, pos) => Ok(Expr::Identifier { name: v, pos }),
            Token::LeftParen(pos) => self.parse_list(pos),
            Token::LeftBracket(pos) => self.parse_vec(pos),
            Token::LeftBrace(pos) => self.parse_map(pos),
            Token::Quote(pos) => {
                let inner = self.parse_expr()?;
                let span = Position::between(pos, inner.pos());
                Ok(Expr::Quote {
                    expr: Box::new(inner),
                    pos: span,
                })
            }
            Token::Quasiquote(pos) => {
                let inner = self.parse_expr()?;
                let span = Position::between(pos, inner.pos());
                Ok(Expr::Quasiquote {
                    expr: Box::new(inner),
                    pos: span,
                })
            }
            Token::Comma(pos) => {
                if matches!(self.peek(), Some(Token::AtSign(_))) {
                    self.next()?;
                    let inner = self.parse_expr()?;
                    let span = Position::between(pos, inner.pos());
                    return Ok(Expr::UnquoteSplicing {
                        expr: Box::new(inner),
                        pos: span,
                    });
                }
                let inner = self.parse_expr()?;
                let span = Position::between(pos, inner.pos());
                Ok(Expr::Unquote {
                    expr: Box::new(inner),
                    pos: span,
                })
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.kind_name().to_string(),
                span: other.position(),
            }),
        }
    }

    fn parse_vec(&mut self, open: Position) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RightBracket(_)) => break,
                None => {
                    return Err(ParseError::UnexpectedEof {
                        span: self.last_pos(),
                    })
                }
                _ => items.push(self.parse_expr()?),
            }
        }
        let Token::RightBracket(close) = self.next()? else {
            unreachable!()
        };
        Ok(Expr::Vec {
            items,
            pos: Position::between(open, close),
        })
    }

    fn parse_map(&mut self, open: Position) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RightBrace(_)) => break,
                None => {
                    return Err(ParseError::UnexpectedEof {
                        span: self.last_pos(),
                    })
                }
                _ => entries.push(self.parse_expr()?),
            }
        }
        let Token::RightBrace(close) = self.next()? else {
            unreachable!()
        };
        Ok(Expr::Map {
            entries,
            pos: Position::between(open, close),
        })
    }

    /// Reads a balanced `(...)`, dispatching on the head token.
    fn parse_list(&mut self, open: Position) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Identifier(name, _)) => {
                let name = name.clone();
                match name.as_str() {
                    "fn" => return self.parse_fn(open),
                    "if" => return self.parse_fixed_arity(open, "if", 3, "if requires three expressions"),
                    "while" => {
                        return self.parse_fixed_arity(open, "while", 2, "while requires a condition and a body")
                    }
                    "do" => return self.parse_do(open),
                    "var" => return self.parse_fixed_arity(open, "var", 2, "var requires a name and a value"),
                    "set" => return self.parse_fixed_arity(open, "set", 2, "set requires a name and a value"),
                    "get" => return self.parse_fixed_arity(open, "get", 2, "get requires an expression and an index"),
                    "macro" => return self.parse_macro(open),
                    "match" => return self.parse_match(open),
                    "->" => return self.parse_threading(open, true),
                    "->>" => return self.parse_threading(open, false),
                    _ => {}
                }
            }
            Some(Token::Dot(_)) => return self.parse_dotlist(open),
            None => {
                return Err(ParseError::UnexpectedEof {
                    span: self.last_pos(),
                })
            }
            _ => {}
        }
        self.parse_call(open)
    }

    /// Collects every sub-expression up to the closing paren, returning
    /// the items and the full list span.
    fn parse_items_until_close(&mut self) -> Result<(Vec<Expr>, Position), ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RightParen(_)) => break,
                None => {
                    return Err(ParseError::UnexpectedEof {
                        span: self.last_pos(),
                    })
                }
                _ => items.push(self.parse_expr()?),
            }
        }
        let Token::RightParen(close) = self.next()? else {
            unreachable!()
        };
        Ok((items, close))
    }

    fn parse_call(&mut self, open: Position) -> Result<Expr, ParseError> {
        let (items, close) = self.parse_items_until_close()?;
        Ok(Expr::List {
            items,
            pos: Position::between(open, close),
        })
    }

    fn parse_fixed_arity(
        &mut self,
        open: Position,
        form: &'static str,
        arity: usize,
        message: &str,
    ) -> Result<Expr, ParseError> {
        let head_pos = self.next()?.position(); // head identifier
        let (items, close) = self.parse_items_until_close()?;
        let span = Position::between(open, close);
        if self.threading() {
            // Under a threading macro this form may still be missing
            // the argument the rewrite is about to supply. Keep it as
            // a raw list, head re-attached, so `thread_into` can finish
            // it; `repromote` turns the completed list back into the
            // typed node once the chain is rewritten.
            let mut raw = Vec::with_capacity(items.len() + 1);
            raw.push(Expr::Identifier {
                name: form.to_string(),
                pos: head_pos,
            });
            raw.extend(items);
            return Ok(Expr::List { items: raw, pos: span });
        }
        if items.len() != arity {
            return Err(ParseError::Arity {
                form,
                message: message.to_string(),
                span,
            });
        }
        build_fixed_arity_node(form, items, span)
    }

    /// `(do e1 e2 ... en)`, requiring at least one body expression.
    fn parse_do(&mut self, open: Position) -> Result<Expr, ParseError> {
        self.next()?; // `do`
        let (exprs, close) = self.parse_items_until_close()?;
        let span = Position::between(open, close);
        if !self.threading() && exprs.is_empty() {
            return Err(ParseError::Arity {
                form: "do",
                message: "expected body for do".to_string(),
                span,
            });
        }
        Ok(Expr::Do { exprs, pos: span })
    }

    fn parse_dotlist(&mut self, open: Position) -> Result<Expr, ParseError> {
        self.next()?; // the `.` token
        let (chain, close) = self.parse_items_until_close()?;
        let span = Position::between(open, close);
        if !self.threading() && chain.len() < 2 {
            return Err(ParseError::Arity {
                form: ".",
                message: "expected arguments for dot list".to_string(),
                span,
            });
        }
        Ok(Expr::DotList { chain, pos: span })
    }

    fn parse_params_vector(&mut self) -> Result<Vec<Param>, ParseError> {
        let Token::LeftBracket(_) = self.peek().ok_or(ParseError::UnexpectedEof {
            span: self.last_pos(),
        })? else {
            return Err(ParseError::ExpectedParams {
                span: self.peek().map(|t| t.position()).unwrap_or(self.last_pos()),
            });
        };
        self.next()?;
        let mut params = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RightBracket(_)) => break,
                Some(Token::Ampersand(_)) => {
                    self.next()?;
                    let Token::Identifier(name, pos) = self.next()? else {
                        return Err(ParseError::ExpectedIdentifier {
                            span: self.last_pos(),
                        });
                    };
                    params.push(Param::VariableArg { name, pos });
                }
                Some(Token::LeftBracket(pos)) => {
                    let p = *pos;
                    self.next()?;
                    let mut names = Vec::new();
                    loop {
                        match self.peek() {
                            Some(Token::RightBracket(_)) => break,
                            Some(Token::Identifier(name, ip)) => {
                                let (name, ip) = (name.clone(), *ip);
                                self.next()?;
                                names.push(Param::Identifier { name, pos: ip });
                            }
                            _ => {
                                return Err(ParseError::ExpectedIdentifier {
                                    span: self.peek().map(|t| t.position()).unwrap_or(p),
                                })
                            }
                        }
                    }
                    let Token::RightBracket(close) = self.next()? else {
                        unreachable!()
                    };
                    params.push(Param::Destructure {
                        names,
                        pos: Position::between(p, close),
                    });
                }
                Some(Token::Identifier(name, pos)) => {
                    let (name, pos) = (name.clone(), *pos);
                    self.next()?;
                    params.push(Param::Identifier { name, pos });
                }
                None => {
                    return Err(ParseError::UnexpectedEof {
                        span: self.last_pos(),
                    })
                }
                Some(other) => {
                    return Err(ParseError::ExpectedIdentifier {
                        span: other.position(),
                    })
                }
            }
        }
        self.next()?; // closing `]`
        Ok(params)
    }

    /// `(fn name? params body)` or `(fn params body)` for anonymous
    /// functions, disambiguated by whether the token right after `fn`
    /// opens a params vector.
    fn parse_fn(&mut self, open: Position) -> Result<Expr, ParseError> {
        self.next()?; // `fn`
        let anonymous = matches!(self.peek(), Some(Token::LeftBracket(_)));
        if anonymous {
            let params = self.parse_params_vector()?;
            let body = self.parse_fn_body(open)?;
            let close = self.expect_close(open)?;
            return Ok(Expr::AnonymousFn {
                params,
                body: Box::new(body),
                pos: Position::between(open, close),
            });
        }
        let name = match self.peek() {
            Some(Token::Identifier(n, _)) => {
                let n = n.clone();
                self.next()?;
                n
            }
            other => {
                return Err(ParseError::ExpectedIdentifier {
                    span: other.map(|t| t.position()).unwrap_or(self.last_pos()),
                })
            }
        };
        let params = self.parse_params_vector()?;
        let doc = match self.peek() {
            Some(Token::String(s, _)) if !self.peek_body_is_last() => {
                let s = s.clone();
                self.next()?;
                Some(s)
            }
            _ => None,
        };
        let body = self.parse_fn_body(open)?;
        let close = self.expect_close(open)?;
        Ok(Expr::Fn {
            name: Some(name),
            params,
            doc,
            body: Box::new(body),
            pos: Position::between(open, close),
        })
    }

    /// Best-effort check used only to decide whether a leading string
    /// literal is a doc comment or the function's only body expression;
    /// a string is treated as the body when nothing else follows it.
    fn peek_body_is_last(&self) -> bool {
        matches!(self.tokens.get(self.i + 1), Some(Token::RightParen(_)))
    }

    fn parse_fn_body(&mut self, open: Position) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::RightParen(close)) => Err(ParseError::ExpectedBody { span: *close }),
            None => Err(ParseError::UnexpectedEof {
                span: self.last_pos(),
            }),
            _ => self.parse_expr().map_err(|e| match e {
                ParseError::UnexpectedEof { .. } => ParseError::ExpectedBody { span: open },
                other => other,
            }),
        }
    }

    fn expect_close(&mut self, open: Position) -> Result<Position, ParseError> {
        match self.next() {
            Ok(Token::RightParen(p)) => Ok(p),
            Ok(other) => Err(ParseError::UnexpectedToken {
                found: other.kind_name().to_string(),
                span: other.position(),
            }),
            Err(_) => Err(ParseError::UnexpectedEof { span: open }),
        }
    }

    fn parse_macro(&mut self, open: Position) -> Result<Expr, ParseError> {
        self.next()?; // `macro`
        let name = match self.peek() {
            Some(Token::Identifier(n, _)) => {
                let n = n.clone();
                self.next()?;
                n
            }
            other => {
                return Err(ParseError::ExpectedIdentifier {
                    span: other.map(|t| t.position()).unwrap_or(self.last_pos()),
                })
            }
        };
        let params = self.parse_params_vector()?;
        let body = self.parse_fn_body(open)?;
        let close = self.expect_close(open)?;
        Ok(Expr::Macro {
            name,
            params,
            body: Box::new(body),
            pos: Position::between(open, close),
        })
    }

    /// `(-> seed form...)` / `(->> seed form...)`. Inner forms parse
    /// under relaxed arity (they're completed by the rewrite below),
    /// then each is rewritten to insert `seed`'s running result as the
    /// second argument (`->`) or last argument (`->>`).
    fn parse_threading(&mut self, open: Position, thread_first: bool) -> Result<Expr, ParseError> {
        self.next()?; // `->` or `->>`
        self.push_state(State::Threading);
        let result = self.parse_items_until_close();
        self.pop_state();
        let (items, close) = result?;
        let span = Position::between(open, close);
        if items.is_empty() {
            return Err(ParseError::Arity {
                form: if thread_first { "->" } else { "->>" },
                message: "threading macro requires a seed expression".to_string(),
                span,
            });
        }
        let mut iter = items.into_iter();
        let mut acc = iter.next().unwrap();
        for form in iter {
            acc = thread_into(form, acc, thread_first);
        }
        Ok(repromote(acc))
    }

    /// `(match scrutinee (pattern body)... :else body)`, rewritten to a
    /// nested `if`/`and`/`=`/`get`/`length` chain and re-parsed from
    /// freshly generated source text, so that `match` can nest.
    fn parse_match(&mut self, open: Position) -> Result<Expr, ParseError> {
        self.next()?; // `match`
        let (items, close) = self.parse_items_until_close()?;
        let span = Position::between(open, close);
        let mut it = items.into_iter();
        let scrutinee = it
            .next()
            .ok_or(ParseError::MalformedMatchPattern { span })?;
        let rest: Vec<Expr> = it.collect();
        if rest.len() < 2 {
            return Err(ParseError::MalformedMatchPattern { span });
        }
        let (cases, else_body) = split_match_cases(&rest, span)?;

        let scrut_src = scrutinee.to_source();
        let mut generated = else_body.to_source();
        for (pattern, body) in cases.iter().rev() {
            generated = render_match_case(pattern, body, &scrut_src, &generated)?;
        }
        let tokens = lexer::lex(generated.as_bytes())
            .map_err(|_| ParseError::MalformedMatchPattern { span })?;
        Parser::parse_one(tokens).map_err(|_| ParseError::MalformedMatchPattern { span })
    }
}

fn ident_name(e: &Expr, fallback: Position) -> Result<String, ParseError> {
    match e {
        Expr::Identifier { name, .. } => Ok(name.clone()),
        _ => Err(ParseError::ExpectedIdentifier { span: fallback }),
    }
}

/// Forms `parse_fixed_arity` dispatches, paired with their arity.
const FIXED_ARITY_FORMS: &[(&str, usize)] =
    &[("if", 3), ("while", 2), ("var", 2), ("set", 2), ("get", 2)];

/// Builds the typed node for one of [`FIXED_ARITY_FORMS`] from its
/// already-arity-checked argument list.
fn build_fixed_arity_node(form: &str, mut items: Vec<Expr>, span: Position) -> Result<Expr, ParseError> {
    Ok(match form {
        "if" => Expr::If {
            cond: Box::new(items.remove(0)),
            then: Box::new(items.remove(0)),
            els: Box::new(items.remove(0)),
            pos: span,
        },
        "while" => Expr::While {
            cond: Box::new(items.remove(0)),
            body: Box::new(items.remove(0)),
            pos: span,
        },
        "var" => Expr::Var {
            name: ident_name(&items.remove(0), span)?,
            value: Box::new(items.remove(0)),
            pos: span,
        },
        "set" => Expr::Set {
            name: ident_name(&items.remove(0), span)?,
            value: Box::new(items.remove(0)),
            pos: span,
        },
        "get" => Expr::Get {
            expr: Box::new(items.remove(0)),
            index: Box::new(items.remove(0)),
            pos: span,
        },
        _ => unreachable!(),
    })
}

/// Walks the whole subtree produced by a threading macro's rewrite —
/// every form inside `(-> ...)`/`(->> ...)` parses under relaxed arity,
/// not just its immediate chain — and promotes any completed
/// `if`/`while`/`var`/`set`/`get` list, one that `parse_fixed_arity`
/// deferred while its arity was still short, back into its typed node.
/// Lists headed by anything else are ordinary calls and pass through
/// untouched.
fn repromote(e: Expr) -> Expr {
    match e {
        Expr::List { items, pos } => {
            let mut items: Vec<Expr> = items.into_iter().map(repromote).collect();
            let promoted = match items.first() {
                Some(Expr::Identifier { name, .. }) => FIXED_ARITY_FORMS
                    .iter()
                    .find(|(form, arity)| *form == name && items.len() - 1 == *arity)
                    .map(|(form, _)| *form),
                _ => None,
            };
            match promoted {
                Some(form) => {
                    let head = items.remove(0);
                    let args = items.clone();
                    match build_fixed_arity_node(form, items, pos) {
                        Ok(node) => node,
                        Err(_) => {
                            let mut restored = args;
                            restored.insert(0, head);
                            Expr::List { items: restored, pos }
                        }
                    }
                }
                None => Expr::List { items, pos },
            }
        }
        Expr::Vec { items, pos } => Expr::Vec {
            items: items.into_iter().map(repromote).collect(),
            pos,
        },
        Expr::Map { entries, pos } => Expr::Map {
            entries: entries.into_iter().map(repromote).collect(),
            pos,
        },
        Expr::Do { exprs, pos } => Expr::Do {
            exprs: exprs.into_iter().map(repromote).collect(),
            pos,
        },
        Expr::DotList { chain, pos } => Expr::DotList {
            chain: chain.into_iter().map(repromote).collect(),
            pos,
        },
        Expr::Fn { name, params, doc, body, pos } => Expr::Fn {
            name,
            params,
            doc,
            body: Box::new(repromote(*body)),
            pos,
        },
        Expr::AnonymousFn { params, body, pos } => Expr::AnonymousFn {
            params,
            body: Box::new(repromote(*body)),
            pos,
        },
        Expr::If { cond, then, els, pos } => Expr::If {
            cond: Box::new(repromote(*cond)),
            then: Box::new(repromote(*then)),
            els: Box::new(repromote(*els)),
            pos,
        },
        Expr::While { cond, body, pos } => Expr::While {
            cond: Box::new(repromote(*cond)),
            body: Box::new(repromote(*body)),
            pos,
        },
        Expr::Var { name, value, pos } => Expr::Var {
            name,
            value: Box::new(repromote(*value)),
            pos,
        },
        Expr::Set { name, value, pos } => Expr::Set {
            name,
            value: Box::new(repromote(*value)),
            pos,
        },
        Expr::Get { expr, index, pos } => Expr::Get {
            expr: Box::new(repromote(*expr)),
            index: Box::new(repromote(*index)),
            pos,
        },
        Expr::Quote { expr, pos } => Expr::Quote {
            expr: Box::new(repromote(*expr)),
            pos,
        },
        Expr::Quasiquote { expr, pos } => Expr::Quasiquote {
            expr: Box::new(repromote(*expr)),
            pos,
        },
        Expr::Unquote { expr, pos } => Expr::Unquote {
            expr: Box::new(repromote(*expr)),
            pos,
        },
        Expr::UnquoteSplicing { expr, pos } => Expr::UnquoteSplicing {
            expr: Box::new(repromote(*expr)),
            pos,
        },
        other => other,
    }
}

fn thread_into(form: Expr, prior: Expr, thread_first: bool) -> Expr {
    match form {
        Expr::List { mut items, pos } => {
            if thread_first {
                let insert_at = items.len().min(1);
                items.insert(insert_at, prior);
            } else {
                items.push(prior);
            }
            Expr::List { items, pos }
        }
        // A bare head with no argument list: `(-> x f)` appends prior.
        other => {
            let pos = Position::between(other.pos(), prior.pos());
            Expr::List {
                items: vec![other, prior],
                pos,
            }
        }
    }
}

fn split_match_cases(
    rest: &[Expr],
    span: Position,
) -> Result<(Vec<(Expr, Expr)>, Expr), ParseError> {
    if rest.len() < 2 || rest.len() % 2 != 0 {
        return Err(ParseError::MalformedMatchPattern { span });
    }
    let else_pattern = &rest[rest.len() - 2];
    let is_else = matches!(else_pattern, Expr::Atom { name, .. } if name == "else");
    if !is_else {
        return Err(ParseError::MalformedMatchPattern { span });
    }
    let else_body = rest[rest.len() - 1].clone();
    let mut cases = Vec::new();
    for pair in rest[..rest.len() - 2].chunks_exact(2) {
        let (pattern, body) = (&pair[0], &pair[1]);
        match pattern {
            Expr::List { .. } | Expr::Vec { .. } => cases.push((pattern.clone(), body.clone())),
            _ => return Err(ParseError::MalformedMatchPattern { span }),
        }
    }
    Ok((cases, else_body))
}

fn render_match_case(
    pattern: &Expr,
    body: &Expr,
    scrut_src: &str,
    outer_else_src: &str,
) -> Result<String, ParseError> {
    let items = match pattern {
        Expr::List { items, .. } | Expr::Vec { items, .. } => items,
        _ => {
            return Err(ParseError::MalformedMatchPattern { span: pattern.pos() });
        }
    };
    let pattern_for_length = render_pattern_wildcards_as_zero(items);
    let length_check = format!(
        "(= (length {scrut_src}) (length {pattern_for_length}))",
    );
    let mut conjuncts = vec![length_check];
    for (i, elem) in items.iter().enumerate() {
        if elem.is_identifier("_") {
            continue;
        }
        conjuncts.push(format!("(= {} (get {} {}))", elem.to_source(), scrut_src, i));
    }
    let cond = if conjuncts.len() == 1 {
        conjuncts.into_iter().next().unwrap()
    } else {
        format!("(and {})", conjuncts.join(" "))
    };
    Ok(format!(
        "(if {} {} {})",
        cond,
        body.to_source(),
        outer_else_src
    ))
}

/// Renders a pattern's vector literal with every `_` wildcard written
/// as `0`, matching the original's textual-substitution trick for the
/// generated `(length PATTERN')` expression. Substitution walks the
/// tree rather than the text so identifiers like `_x` are untouched.
fn render_pattern_wildcards_as_zero(items: &[Expr]) -> String {
    let mut out = String::from("[");
    for (i, e) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if e.is_identifier("_") {
            out.push('0');
        } else {
            out.push_str(&e.to_source());
        }
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> Vec<Expr> {
        Parser::parse(lex(src.as_bytes()).unwrap()).expect("parse should succeed")
    }

    #[test]
    fn parses_a_simple_call() {
        let exprs = parse_src("(+ 1 1 1)");
        let Expr::List { items, .. } = &exprs[0] else {
            panic!()
        };
        assert_eq!(items.len(), 4);
        assert!(matches!(items[0], Expr::Op { .. }));
    }

    #[test]
    fn named_fn_with_params_and_body() {
        let exprs = parse_src("(fn add [x y] (+ x y))");
        let Expr::Fn { name, params, .. } = &exprs[0] else {
            panic!()
        };
        assert_eq!(name.as_deref(), Some("add"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn unexpected_right_paren_at_span_zero_one() {
        let err = Parser::parse(lex(b")").unwrap()).unwrap_err();
        match err {
            ParseError::UnexpectedToken { span, .. } => {
                assert_eq!(span, Position::new(0, 1))
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn unexpected_eof_on_bare_open_paren() {
        let err = Parser::parse(lex(b"(").unwrap()).unwrap_err();
        match err {
            ParseError::UnexpectedEof { span } => assert_eq!(span, Position::new(0, 1)),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn fn_missing_name_reports_expected_identifier() {
        let err = Parser::parse(lex(b"(fn)").unwrap()).unwrap_err();
        match err {
            ParseError::ExpectedIdentifier { span } => assert_eq!(span, Position::new(3, 4)),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn fn_missing_body_reports_expected_body() {
        let err = Parser::parse(lex(b"(fn add [])").unwrap()).unwrap_err();
        match err {
            ParseError::ExpectedBody { span } => assert_eq!(span, Position::new(10, 11)),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn if_arity_mismatch_spans_whole_list() {
        let err = Parser::parse(lex(b"(if)").unwrap()).unwrap_err();
        match err {
            ParseError::Arity { span, message, .. } => {
                assert_eq!(span, Position::new(0, 4));
                assert!(message.contains("if requires three expressions"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn do_arity_mismatch_spans_whole_list() {
        let err = Parser::parse(lex(b"(do)").unwrap()).unwrap_err();
        match err {
            ParseError::Arity { span, .. } => assert_eq!(span, Position::new(0, 4)),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn dotlist_arity_mismatch_spans_whole_list() {
        let err = Parser::parse(lex(b"(.)").unwrap()).unwrap_err();
        match err {
            ParseError::Arity { span, message, .. } => {
                assert_eq!(span, Position::new(0, 3));
                assert!(message.contains("expected arguments for dot list"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn thread_first_inserts_as_second_argument() {
        let exprs = parse_src("(-> x (f a) (g))");
        let Expr::List { items, .. } = &exprs[0] else {
            panic!()
        };
        let Expr::List { items: f_items, .. } = &items[0] else {
            panic!()
        };
        assert!(matches!(&f_items[0], Expr::Identifier{name, ..} if name == "f"));
        assert!(matches!(&f_items[1], Expr::Identifier{name, ..} if name == "x"));
    }

    #[test]
    fn match_desugars_to_nested_if() {
        let exprs = parse_src(r#"(match [1 2] [_ 2] "two" :else "unknown")"#);
        assert!(matches!(exprs[0], Expr::If { .. }));
    }

    #[test]
    fn quote_quasiquote_unquote_splicing() {
        let exprs = parse_src("'x `y ,z ,@w");
        assert!(matches!(exprs[0], Expr::Quote { .. }));
        assert!(matches!(exprs[1], Expr::Quasiquote { .. }));
        assert!(matches!(exprs[2], Expr::Unquote { .. }));
        assert!(matches!(exprs[3], Expr::UnquoteSplicing { .. }));
    }
}
