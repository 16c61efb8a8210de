//! Query expression AST.
//!
//! Calling code builds predicates directly:
//!
//! ```
//! use repolink_query::{field, key, type_is};
//!
//! let predicate = type_is("Workspace")
//!     .and(field("IsWallContainer").eq(true))
//!     .and(key("Rating").gt(3).or(!field("Hidden")));
//! ```

use std::ops;

use chrono::{DateTime, FixedOffset, Utc};
use repolink_model::TypeHandle;
use rust_decimal::Decimal;

/// A field on the queried content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// A typed property by its local name; compiled to its wire name.
    Property(String),
    /// A dynamic field by its literal wire key.
    Key(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<FixedOffset>),
}

impl Literal {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "bool",
            Literal::Integer(_) => "integer",
            Literal::Float(_) => "float",
            Literal::Decimal(_) => "decimal",
            Literal::String(_) => "string",
            Literal::DateTime(_) => "datetime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// The operator seen from the other side: `a < b` is `b > a`.
    pub fn flipped(self) -> Self {
        match self {
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Predicate expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(FieldRef),
    Literal(Literal),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Restricts results to a content type and its subtypes.
    TypeIs(TypeHandle),
    /// Only reducible when both sides are literals.
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Method call such as `StartsWith` on a field, or `InTree` with a path.
    Call {
        method: String,
        target: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
}

pub fn field(name: impl Into<String>) -> Expr {
    Expr::Field(FieldRef::Property(name.into()))
}

pub fn key(name: impl Into<String>) -> Expr {
    Expr::Field(FieldRef::Key(name.into()))
}

pub fn lit(value: impl Into<Literal>) -> Expr {
    Expr::Literal(value.into())
}

pub fn type_is(local_type: impl Into<TypeHandle>) -> Expr {
    Expr::TypeIs(local_type.into())
}

/// Content located anywhere below `path`.
pub fn in_tree(path: impl Into<String>) -> Expr {
    call("InTree", None, vec![lit(path.into())])
}

/// Content located directly in `path`.
pub fn in_folder(path: impl Into<String>) -> Expr {
    call("InFolder", None, vec![lit(path.into())])
}

pub fn call(method: impl Into<String>, target: Option<Expr>, args: Vec<Expr>) -> Expr {
    Expr::Call {
        method: method.into(),
        target: target.map(Box::new),
        args,
    }
}

impl Expr {
    fn compare(self, op: CompareOp, other: impl Into<Expr>) -> Expr {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Eq, other)
    }

    pub fn ne(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ne, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Gt, other)
    }

    pub fn ge(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ge, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Lt, other)
    }

    pub fn le(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Le, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Expr {
        call("StartsWith", Some(self), vec![lit(prefix.into())])
    }

    pub fn ends_with(self, suffix: impl Into<String>) -> Expr {
        call("EndsWith", Some(self), vec![lit(suffix.into())])
    }

    pub fn contains(self, needle: impl Into<String>) -> Expr {
        call("Contains", Some(self), vec![lit(needle.into())])
    }

    fn arithmetic(self, op: ArithmeticOp, other: Expr) -> Expr {
        Expr::Arithmetic {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }
}

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl<T: Into<Expr>> ops::Add<T> for Expr {
    type Output = Expr;

    fn add(self, other: T) -> Expr {
        self.arithmetic(ArithmeticOp::Add, other.into())
    }
}

impl<T: Into<Expr>> ops::Sub<T> for Expr {
    type Output = Expr;

    fn sub(self, other: T) -> Expr {
        self.arithmetic(ArithmeticOp::Sub, other.into())
    }
}

impl<T: Into<Expr>> ops::Mul<T> for Expr {
    type Output = Expr;

    fn mul(self, other: T) -> Expr {
        self.arithmetic(ArithmeticOp::Mul, other.into())
    }
}

impl<T: Into<Expr>> ops::Div<T> for Expr {
    type Output = Expr;

    fn div(self, other: T) -> Expr {
        self.arithmetic(ArithmeticOp::Div, other.into())
    }
}

// ── Literal conversions ──────────────────────────────────────────

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Integer(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Integer(i64::from(v))
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<Decimal> for Literal {
    fn from(v: Decimal) -> Self {
        Literal::Decimal(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl From<DateTime<FixedOffset>> for Literal {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Literal::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(v: DateTime<Utc>) -> Self {
        Literal::DateTime(v.fixed_offset())
    }
}

impl From<Literal> for Expr {
    fn from(v: Literal) -> Self {
        Expr::Literal(v)
    }
}

macro_rules! literal_expr {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(v: $t) -> Self {
                    Expr::Literal(v.into())
                }
            }
        )*
    };
}

literal_expr!(bool, i64, i32, f64, Decimal, &str, String, DateTime<FixedOffset>, DateTime<Utc>);
