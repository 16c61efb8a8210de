//! Compiles [`Expr`] predicates into the repository's content query text.
//!
//! A predicate lowers to a tree of clauses, each required (`+`), optional
//! or prohibited (`-`):
//!
//! | expression            | query text                 |
//! |-----------------------|----------------------------|
//! | `a.and(b).and(c)`     | `+a +b +c`                 |
//! | `a.or(b)`             | `a b`                      |
//! | `!a`                  | `-a`                       |
//! | `a.and(b.or(c))`      | `+a +(b c)`                |
//! | `field("X").eq(true)` | `X:yes`                    |
//! | `field("X").ne(5)`    | `-X:5`                     |
//! | `type_is("Folder")`   | `TypeIs:folder`            |
//!
//! Anything that cannot be expressed exactly is rejected.

use std::sync::Arc;

use chrono::Utc;
use repolink_model::{ContentTypeDescriptor, ContentTypeRegistry, PropertyType, TypeHandle};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::expr::{ArithmeticOp, CompareOp, Expr, FieldRef, Literal};

/// Characters that force a value into quotes (or escapes, inside wildcards).
const META_CHARS: &[char] = &[
    ':', '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '\'', '~', '*', '?', '\\', '/', '<', '>', '=',
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sort key of a [`ContentQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: FieldRef,
    pub descending: bool,
}

/// A content query: optional type narrowing, an optional predicate and
/// the query settings appended as `.KEYWORD` terms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentQuery {
    pub of_type: Option<TypeHandle>,
    pub predicate: Option<Expr>,
    pub sort: Vec<SortKey>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
    pub auto_filters: Option<bool>,
    pub lifespan: Option<bool>,
    pub count_only: bool,
}

impl ContentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrows results to `local_type`; typed fields resolve against it.
    pub fn of_type(mut self, local_type: impl Into<TypeHandle>) -> Self {
        self.of_type = Some(local_type.into());
        self
    }

    /// Adds a predicate, AND-ed with any existing one.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn sort_by(mut self, property: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: FieldRef::Property(property.into()),
            descending: false,
        });
        self
    }

    pub fn sort_by_desc(mut self, property: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: FieldRef::Property(property.into()),
            descending: true,
        });
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn auto_filters(mut self, enabled: bool) -> Self {
        self.auto_filters = Some(enabled);
        self
    }

    pub fn lifespan(mut self, enabled: bool) -> Self {
        self.lifespan = Some(enabled);
        self
    }

    pub fn count_only(mut self) -> Self {
        self.count_only = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occur {
    Must,
    Should,
    MustNot,
}

impl Occur {
    fn prefix(self) -> &'static str {
        match self {
            Occur::Must => "+",
            Occur::Should => "",
            Occur::MustNot => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Term(String),
    Negated(Box<Clause>),
    Group(Vec<(Occur, Clause)>),
}

impl Clause {
    fn render(&self) -> String {
        match self {
            Clause::Term(text) => text.clone(),
            Clause::Negated(inner) => format!("-{}", inner.operand()),
            Clause::Group(clauses) => clauses
                .iter()
                .map(|(occur, clause)| format!("{}{}", occur.prefix(), clause.operand()))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Rendering as the operand of an occurrence prefix.
    fn operand(&self) -> String {
        match self {
            Clause::Term(text) => text.clone(),
            other => format!("({})", other.render()),
        }
    }
}

/// Compiles predicates against one registry.
pub struct QueryCompiler<'a> {
    registry: &'a ContentTypeRegistry,
    root: Option<Arc<ContentTypeDescriptor>>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(registry: &'a ContentTypeRegistry) -> Self {
        Self { registry, root: None }
    }

    /// Resolves typed fields against `local_type`'s descriptor.
    pub fn for_type(mut self, local_type: &TypeHandle) -> Self {
        self.root = self.registry.descriptor(local_type);
        self
    }

    /// Compiles a bare predicate.
    pub fn compile_predicate(&self, predicate: &Expr) -> QueryResult<String> {
        let text = self.lower(predicate, self.root.as_deref())?.render();
        debug!(query = %text, "predicate compiled");
        Ok(text)
    }

    /// Compiles a full content query, keywords included.
    pub fn compile(&self, query: &ContentQuery) -> QueryResult<String> {
        let narrowed = match &query.of_type {
            Some(local_type) => self.registry.descriptor(local_type),
            None => None,
        };
        let root = narrowed.as_deref().or(self.root.as_deref());

        let mut parts = Vec::new();
        let body = match &query.predicate {
            Some(predicate) => Some(self.lower(predicate, root)?),
            None => None,
        };
        match (&query.of_type, body) {
            (Some(local_type), body) => {
                parts.push(format!("+{}", self.type_term(local_type)?));
                if let Some(body) = body {
                    parts.push(format!("+{}", body.operand()));
                }
            }
            (None, Some(body)) => parts.push(body.render()),
            (None, None) => {}
        }

        for key in &query.sort {
            let keyword = if key.descending { ".REVERSESORT" } else { ".SORT" };
            parts.push(format!("{keyword}:{}", field_name(&key.field, root)?));
        }
        if let Some(top) = query.top {
            parts.push(format!(".TOP:{top}"));
        }
        if let Some(skip) = query.skip {
            parts.push(format!(".SKIP:{skip}"));
        }
        if let Some(enabled) = query.auto_filters {
            parts.push(format!(".AUTOFILTERS:{}", on_off(enabled)));
        }
        if let Some(enabled) = query.lifespan {
            parts.push(format!(".LIFESPAN:{}", on_off(enabled)));
        }
        if query.count_only {
            parts.push(".COUNTONLY".to_string());
        }

        let text = parts.join(" ");
        debug!(query = %text, "content query compiled");
        Ok(text)
    }

    fn lower(&self, expr: &Expr, root: Option<&ContentTypeDescriptor>) -> QueryResult<Clause> {
        match expr {
            Expr::And(..) => {
                let mut operands = Vec::new();
                flatten(expr, true, &mut operands);
                let mut clauses = Vec::with_capacity(operands.len());
                for operand in operands {
                    clauses.push(match self.lower(operand, root)? {
                        Clause::Negated(inner) => (Occur::MustNot, *inner),
                        clause => (Occur::Must, clause),
                    });
                }
                Ok(Clause::Group(clauses))
            }
            Expr::Or(..) => {
                let mut operands = Vec::new();
                flatten(expr, false, &mut operands);
                let clauses = operands
                    .into_iter()
                    .map(|operand| Ok((Occur::Should, self.lower(operand, root)?)))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(Clause::Group(clauses))
            }
            Expr::Not(inner) => Ok(match self.lower(inner, root)? {
                Clause::Negated(clause) => *clause,
                clause => Clause::Negated(Box::new(clause)),
            }),
            Expr::TypeIs(local_type) => Ok(Clause::Term(self.type_term(local_type)?)),
            Expr::Compare { op, left, right } => lower_comparison(*op, left, right, root),
            Expr::Field(field) => {
                if let (FieldRef::Property(name), Some(descriptor)) = (field, root) {
                    if let Some(property) = descriptor.property(name) {
                        if property.property_type != PropertyType::Bool {
                            return Err(unsupported(format!(
                                "field '{name}' is not boolean and cannot stand alone as a predicate"
                            )));
                        }
                    }
                }
                Ok(Clause::Term(format!("{}:yes", field_name(field, root)?)))
            }
            Expr::Call { method, target, args } => lower_call(method, target.as_deref(), args, root),
            Expr::Literal(literal) => Err(unsupported(format!(
                "a {} literal cannot stand alone as a predicate",
                literal.kind()
            ))),
            Expr::Arithmetic { .. } => Err(unsupported("an arithmetic expression is not a predicate")),
        }
    }

    fn type_term(&self, local_type: &TypeHandle) -> QueryResult<String> {
        let name = self.registry.resolve_name(Some(local_type))?;
        Ok(format!("TypeIs:{}", name.to_lowercase()))
    }
}

fn flatten<'e>(expr: &'e Expr, and: bool, out: &mut Vec<&'e Expr>) {
    match (expr, and) {
        (Expr::And(left, right), true) | (Expr::Or(left, right), false) => {
            flatten(left, and, out);
            flatten(right, and, out);
        }
        _ => out.push(expr),
    }
}

fn lower_comparison(
    op: CompareOp,
    left: &Expr,
    right: &Expr,
    root: Option<&ContentTypeDescriptor>,
) -> QueryResult<Clause> {
    let (op, field, value) = match (left, right) {
        (Expr::Field(field), other) => (op, field, reduce(other)?),
        (other, Expr::Field(field)) => (op.flipped(), field, reduce(other)?),
        _ => {
            return Err(unsupported(
                "a comparison needs a field on exactly one side and a constant on the other",
            ));
        }
    };
    let name = field_name(field, root)?;

    if let Literal::Bool(flag) = value {
        let flag = match op {
            CompareOp::Eq => flag,
            CompareOp::Ne => !flag,
            _ => return Err(unsupported(format!("ordering comparison on boolean field '{name}'"))),
        };
        return Ok(Clause::Term(format!("{name}:{}", yes_no(flag))));
    }

    let rendered = render_literal(&value)?;
    let term = |symbol: &str| Clause::Term(format!("{name}:{symbol}{rendered}"));
    Ok(match op {
        CompareOp::Eq => term(""),
        CompareOp::Ne => Clause::Negated(Box::new(term(""))),
        CompareOp::Gt => term(">"),
        CompareOp::Ge => term(">="),
        CompareOp::Lt => term("<"),
        CompareOp::Le => term("<="),
    })
}

fn lower_call(
    method: &str,
    target: Option<&Expr>,
    args: &[Expr],
    root: Option<&ContentTypeDescriptor>,
) -> QueryResult<Clause> {
    let argument = || -> QueryResult<String> {
        match args {
            [arg] => match reduce(arg)? {
                Literal::String(s) => Ok(s),
                other => Err(unsupported(format!("{method} expects a string argument, got {}", other.kind()))),
            },
            _ => Err(unsupported(format!("{method} expects exactly one argument, got {}", args.len()))),
        }
    };
    let target_field = || -> QueryResult<String> {
        match target {
            Some(Expr::Field(field)) => field_name(field, root),
            _ => Err(unsupported(format!("{method} must be called on a field"))),
        }
    };

    let term = match method {
        "StartsWith" => format!("{}:{}*", target_field()?, escape(&argument()?)),
        "EndsWith" => format!("{}:*{}", target_field()?, escape(&argument()?)),
        "Contains" => format!("{}:*{}*", target_field()?, escape(&argument()?)),
        "InTree" | "InFolder" => {
            if target.is_some() {
                return Err(unsupported(format!("{method} takes no target")));
            }
            format!("{method}:{}", quote(&argument()?))
        }
        other => return Err(unsupported(format!("method '{other}' is not supported"))),
    };
    Ok(Clause::Term(term))
}

/// Resolves the wire name of a field.
fn field_name(field: &FieldRef, root: Option<&ContentTypeDescriptor>) -> QueryResult<String> {
    match (field, root) {
        (FieldRef::Key(key), _) => Ok(key.clone()),
        (FieldRef::Property(name), None) => Ok(name.clone()),
        (FieldRef::Property(name), Some(descriptor)) => descriptor
            .property(name)
            .map(|p| p.wire_name.clone())
            .ok_or_else(|| QueryError::UnknownProperty {
                local_type: descriptor.local_type.to_string(),
                property: name.clone(),
            }),
    }
}

/// Reduces a constant expression to a literal.
fn reduce(expr: &Expr) -> QueryResult<Literal> {
    match expr {
        Expr::Literal(Literal::Null) => Err(unsupported("comparison against null")),
        Expr::Literal(literal) => Ok(literal.clone()),
        Expr::Arithmetic { op, left, right } => fold(*op, reduce(left)?, reduce(right)?),
        Expr::Field(_) => Err(unsupported("comparison between two fields")),
        other => Err(unsupported(format!("{} is not a constant", describe(other)))),
    }
}

fn fold(op: ArithmeticOp, left: Literal, right: Literal) -> QueryResult<Literal> {
    use Literal::{Decimal as Dec, Float, Integer, String as Str};

    let overflow = || unsupported(format!("constant {op:?} overflows or divides by zero"));
    match (left, right) {
        (Integer(a), Integer(b)) => match op {
            ArithmeticOp::Add => a.checked_add(b),
            ArithmeticOp::Sub => a.checked_sub(b),
            ArithmeticOp::Mul => a.checked_mul(b),
            ArithmeticOp::Div => a.checked_div(b),
        }
        .map(Integer)
        .ok_or_else(overflow),
        (Dec(a), Integer(b)) => fold_decimal(op, a, Decimal::from(b)),
        (Integer(a), Dec(b)) => fold_decimal(op, Decimal::from(a), b),
        (Dec(a), Dec(b)) => fold_decimal(op, a, b),
        (a @ (Integer(_) | Float(_)), b @ (Integer(_) | Float(_))) => {
            let (a, b) = (as_f64(&a), as_f64(&b));
            let value = match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Sub => a - b,
                ArithmeticOp::Mul => a * b,
                ArithmeticOp::Div => a / b,
            };
            if value.is_finite() { Ok(Float(value)) } else { Err(overflow()) }
        }
        (Str(a), Str(b)) if op == ArithmeticOp::Add => Ok(Str(a + &b)),
        (a, b) => Err(unsupported(format!("cannot apply {op:?} to {} and {}", a.kind(), b.kind()))),
    }
}

fn fold_decimal(op: ArithmeticOp, a: Decimal, b: Decimal) -> QueryResult<Literal> {
    match op {
        ArithmeticOp::Add => a.checked_add(b),
        ArithmeticOp::Sub => a.checked_sub(b),
        ArithmeticOp::Mul => a.checked_mul(b),
        ArithmeticOp::Div => a.checked_div(b),
    }
    .map(Literal::Decimal)
    .ok_or_else(|| unsupported(format!("constant {op:?} overflows or divides by zero")))
}

fn as_f64(literal: &Literal) -> f64 {
    match literal {
        Literal::Integer(i) => *i as f64,
        Literal::Float(f) => *f,
        _ => f64::NAN,
    }
}

fn render_literal(literal: &Literal) -> QueryResult<String> {
    Ok(match literal {
        Literal::Null => return Err(unsupported("comparison against null")),
        Literal::Bool(flag) => yes_no(*flag).to_string(),
        Literal::Integer(i) => i.to_string(),
        Literal::Float(f) => f.to_string(),
        Literal::Decimal(d) => d.normalize().to_string(),
        Literal::String(s) => quote(s),
        Literal::DateTime(dt) => format!("'{}'", dt.with_timezone(&Utc).format(DATE_FORMAT)),
    })
}

/// Quotes a value when it contains whitespace or query syntax.
fn quote(value: &str) -> String {
    if !value.is_empty() && !value.chars().any(|c| c.is_whitespace() || META_CHARS.contains(&c)) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Escapes a value used inside a wildcard term, where quotes are not allowed.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_whitespace() || META_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Field(_) => "field access",
        Expr::Literal(_) => "literal",
        Expr::Compare { .. } => "comparison",
        Expr::And(..) | Expr::Or(..) | Expr::Not(_) => "boolean expression",
        Expr::TypeIs(_) => "type check",
        Expr::Arithmetic { .. } => "arithmetic",
        Expr::Call { .. } => "method call",
    }
}

fn unsupported(message: impl Into<String>) -> QueryError {
    QueryError::UnsupportedExpression(message.into())
}
