//! Query expressions for collection resources
//!
//! - `expression`: the expression AST and a fluent builder over it
//! - `clause`: translated where/order clauses
//! - `translator`: expression tree -> ordered clauses
//! - `compiler`: clauses -> REST query string

pub mod clause;
pub mod compiler;
pub mod expression;
pub mod translator;

pub use clause::{Comparison, DatePartMatch, OrderClause, OrderDirection, WhereClause, WhereValue};
pub use compiler::CollectionQuery;
pub use expression::{
    custom_data, field, within, BinaryOp, Expression, FieldBuilder, Literal, MemberType,
};
pub use translator::{translate_order, translate_where};
