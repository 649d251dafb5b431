//! Query expression AST nodes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the member through which custom data is indexed
pub const CUSTOM_DATA_MEMBER: &str = "customData";

/// Literal constant in a query expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v as i64)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
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

impl From<DateTime<Utc>> for Literal {
    fn from(v: DateTime<Utc>) -> Self {
        Literal::DateTime(v)
    }
}

/// Static type of a member, used where the translator needs it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberType {
    #[default]
    Unknown,
    String,
    Number,
    Bool,
    DateTime,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    AndAlso,
    OrElse,
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value
    Constant(Literal),

    /// Member access on the queried resource (e.g. `x.email`)
    Member { name: String, ty: MemberType },

    /// Indexer call (e.g. `x.customData["isAdmin"]`)
    Index {
        target: Box<Expression>,
        key: Box<Expression>,
    },

    /// Type cast, ignored by the translator
    Convert(Box<Expression>),

    /// Binary operation
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },

    /// Method call; `target` is None for free functions such as `within`
    MethodCall {
        target: Option<Box<Expression>>,
        method: String,
        args: Vec<Expression>,
    },

    /// Predicate lambda (`x => body`)
    Lambda(Box<Expression>),
}

impl Expression {
    /// Create a literal expression
    pub fn constant(value: impl Into<Literal>) -> Self {
        Expression::Constant(value.into())
    }

    /// Create a member access with unknown type
    pub fn member(name: impl Into<String>) -> Self {
        Expression::Member {
            name: name.into(),
            ty: MemberType::Unknown,
        }
    }

    /// Create a typed member access
    pub fn typed_member(name: impl Into<String>, ty: MemberType) -> Self {
        Expression::Member {
            name: name.into(),
            ty,
        }
    }

    /// Create a custom data indexer access (`customData[key]`)
    pub fn custom_data_index(key: impl Into<String>) -> Self {
        Expression::Index {
            target: Box::new(Expression::member(CUSTOM_DATA_MEMBER)),
            key: Box::new(Expression::Constant(Literal::String(key.into()))),
        }
    }

    /// Wrap in a cast
    pub fn convert(inner: Expression) -> Self {
        Expression::Convert(Box::new(inner))
    }

    /// Create a binary expression
    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a method call on a target
    pub fn call(target: Expression, method: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::MethodCall {
            target: Some(Box::new(target)),
            method: method.into(),
            args,
        }
    }

    /// Create a free function call
    pub fn function(method: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::MethodCall {
            target: None,
            method: method.into(),
            args,
        }
    }

    /// Wrap as a lambda body
    pub fn lambda(body: Expression) -> Self {
        Expression::Lambda(Box::new(body))
    }

    /// Combine with another predicate (`self && other`)
    pub fn and(self, other: Expression) -> Self {
        Expression::binary(self, BinaryOp::AndAlso, other)
    }

    /// Combine with another predicate (`self || other`)
    pub fn or(self, other: Expression) -> Self {
        Expression::binary(self, BinaryOp::OrElse, other)
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Expression::Constant(_) => "Constant".to_string(),
            Expression::Member { name, .. } => format!("Member({})", name),
            Expression::Index { .. } => "Index".to_string(),
            Expression::Convert(_) => "Convert".to_string(),
            Expression::Binary { op, .. } => format!("Binary({:?})", op),
            Expression::MethodCall { method, .. } => format!("MethodCall({})", method),
            Expression::Lambda(_) => "Lambda".to_string(),
        }
    }
}

/// Start a fluent predicate on a member
pub fn field(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder {
        target: Expression::member(name),
    }
}

/// Start a fluent predicate on a custom data key
pub fn custom_data(key: impl Into<String>) -> FieldBuilder {
    FieldBuilder {
        target: Expression::custom_data_index(key),
    }
}

/// Date-part match on a datetime member: `within(createdAt, [2015, 1])`
pub fn within(name: impl Into<String>, parts: &[i64]) -> Expression {
    let mut args = vec![Expression::typed_member(name, MemberType::DateTime)];
    args.extend(parts.iter().map(|p| Expression::Constant(Literal::Int(*p))));
    Expression::function("within", args)
}

/// Fluent builder producing comparison expressions against one field
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    target: Expression,
}

impl FieldBuilder {
    fn compare(self, op: BinaryOp, value: impl Into<Literal>) -> Expression {
        Expression::binary(self.target, op, Expression::constant(value))
    }

    fn method(self, method: &str, value: impl Into<Literal>) -> Expression {
        Expression::call(self.target, method, vec![Expression::constant(value)])
    }

    pub fn eq(self, value: impl Into<Literal>) -> Expression {
        self.compare(BinaryOp::Equal, value)
    }

    pub fn gt(self, value: impl Into<Literal>) -> Expression {
        self.compare(BinaryOp::GreaterThan, value)
    }

    pub fn ge(self, value: impl Into<Literal>) -> Expression {
        self.compare(BinaryOp::GreaterThanOrEqual, value)
    }

    pub fn lt(self, value: impl Into<Literal>) -> Expression {
        self.compare(BinaryOp::LessThan, value)
    }

    pub fn le(self, value: impl Into<Literal>) -> Expression {
        self.compare(BinaryOp::LessThanOrEqual, value)
    }

    pub fn equals(self, value: impl Into<Literal>) -> Expression {
        self.method("equals", value)
    }

    pub fn starts_with(self, value: impl Into<Literal>) -> Expression {
        self.method("startsWith", value)
    }

    pub fn ends_with(self, value: impl Into<Literal>) -> Expression {
        self.method("endsWith", value)
    }

    pub fn contains(self, value: impl Into<Literal>) -> Expression {
        self.method("contains", value)
    }

    /// The field expression itself, for ordering
    pub fn into_expression(self) -> Expression {
        self.target
    }
}
