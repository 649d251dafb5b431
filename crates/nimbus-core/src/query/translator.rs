//! Expression translator
//!
//! Walks a predicate expression and flattens it into where clauses.
//! AND nodes contribute their right subtree before their left one, so
//! `a == 1 && b == 2` yields `[b == 2, a == 1]`. Query strings built
//! downstream depend on this order.

use super::clause::{Comparison, DatePartMatch, OrderClause, OrderDirection, WhereClause, WhereValue};
use super::expression::{BinaryOp, Expression, Literal, MemberType, CUSTOM_DATA_MEMBER};
use crate::error::{QueryError, Result};

/// Translate a predicate into an ordered list of where clauses
pub fn translate_where(predicate: &Expression) -> Result<Vec<WhereClause>> {
    let mut clauses = Vec::new();
    WhereTranslator::visit(predicate, &mut clauses)?;
    log::trace!("Translated predicate into {} where clause(s)", clauses.len());
    Ok(clauses)
}

/// Translate an ordering key selector
pub fn translate_order(selector: &Expression, direction: OrderDirection) -> Result<OrderClause> {
    let body = match selector {
        Expression::Lambda(body) => body.as_ref(),
        other => other,
    };

    let field = WhereTranslator::field_name(body).ok_or_else(|| {
        QueryError::Unsupported(format!(
            "The ordering expression {} is not a field access",
            body.describe()
        ))
    })?;

    Ok(OrderClause { field, direction })
}

struct WhereTranslator;

impl WhereTranslator {
    fn visit(expr: &Expression, out: &mut Vec<WhereClause>) -> Result<()> {
        match expr {
            Expression::Lambda(body) => {
                // `x => true` carries no clause
                if matches!(body.as_ref(), Expression::Constant(_)) {
                    return Err(QueryError::Unsupported(
                        "A predicate body consisting only of a constant is not supported".to_string(),
                    ));
                }
                Self::visit(body, out)
            }

            Expression::Binary { left, op, right } => Self::visit_binary(left, *op, right, out),

            Expression::MethodCall {
                target,
                method,
                args,
            } => Self::visit_method_call(target.as_deref(), method, args, out),

            other => Err(QueryError::Unsupported(format!(
                "The expression {} is not a supported predicate",
                other.describe()
            ))),
        }
    }

    fn visit_binary(
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
        out: &mut Vec<WhereClause>,
    ) -> Result<()> {
        let comparison = match op {
            BinaryOp::AndAlso => {
                Self::visit(right, out)?;
                return Self::visit(left, out);
            }
            BinaryOp::Equal => Comparison::Equal,
            BinaryOp::GreaterThan => Comparison::GreaterThan,
            BinaryOp::GreaterThanOrEqual => Comparison::GreaterOrEqual,
            BinaryOp::LessThan => Comparison::LessThan,
            BinaryOp::LessThanOrEqual => Comparison::LessOrEqual,
            BinaryOp::NotEqual | BinaryOp::OrElse => {
                return Err(QueryError::Unsupported(format!(
                    "The comparison operator {:?} is not supported",
                    op
                )));
            }
        };

        // Either `x.foo == 5` or `5 == x.foo`
        let (constant, other) = match (left, right) {
            (Expression::Constant(value), other) => (value, other),
            (other, Expression::Constant(value)) => (value, other),
            _ => {
                return Err(QueryError::Unsupported(format!(
                    "A {:?} comparison must have one constant operand and one field access, found {} and {}",
                    op,
                    left.describe(),
                    right.describe()
                )));
            }
        };

        let field = Self::field_name(other).ok_or_else(|| {
            QueryError::Unsupported(format!(
                "A {:?} comparison must have one constant operand and one field access, found {}",
                op,
                other.describe()
            ))
        })?;

        out.push(WhereClause::new(
            field,
            comparison,
            WhereValue::Literal(constant.clone()),
        ));
        Ok(())
    }

    fn visit_method_call(
        target: Option<&Expression>,
        method: &str,
        args: &[Expression],
        out: &mut Vec<WhereClause>,
    ) -> Result<()> {
        if method.eq_ignore_ascii_case("within") {
            return Self::visit_within(args, out);
        }

        let value = match args {
            [Expression::Constant(value)] => value.clone(),
            _ => {
                return Err(QueryError::Unsupported(format!(
                    "The '{}' method with these arguments is not supported",
                    method
                )));
            }
        };

        let comparison = match method.to_ascii_lowercase().as_str() {
            "equals" => Comparison::Equal,
            "startswith" => Comparison::StartsWith,
            "endswith" => Comparison::EndsWith,
            "contains" => Comparison::Contains,
            _ => {
                return Err(QueryError::Unsupported(format!(
                    "The method '{}' is not supported",
                    method
                )));
            }
        };

        let field = target.and_then(Self::field_name).ok_or_else(|| {
            QueryError::Unsupported(format!(
                "The target of method '{}' could not be parsed",
                method
            ))
        })?;

        out.push(WhereClause::new(field, comparison, WhereValue::Literal(value)));
        Ok(())
    }

    fn visit_within(args: &[Expression], out: &mut Vec<WhereClause>) -> Result<()> {
        let (field, parts) = match args.split_first() {
            Some((
                Expression::Member {
                    name,
                    ty: MemberType::DateTime,
                },
                parts,
            )) => (name.clone(), parts),
            _ => {
                return Err(QueryError::Unsupported(
                    "within must be used on a datetime field".to_string(),
                ));
            }
        };

        if parts.is_empty() || parts.len() > 6 {
            return Err(QueryError::Unsupported(format!(
                "within takes 1 to 6 date parts, found {}",
                parts.len()
            )));
        }

        let parts = parts
            .iter()
            .map(|part| match part {
                Expression::Constant(Literal::Int(v)) => Ok(*v),
                other => Err(QueryError::Unsupported(format!(
                    "within date parts must be integer constants, found {}",
                    other.describe()
                ))),
            })
            .collect::<Result<Vec<i64>>>()?;

        let shorthand = DatePartMatch::from_parts(&parts)?;
        out.push(WhereClause::new(
            field,
            Comparison::Equal,
            WhereValue::DatePart(shorthand),
        ));
        Ok(())
    }

    /// Field name of a member access or custom data indexer, casts unwrapped
    fn field_name(expr: &Expression) -> Option<String> {
        match expr {
            Expression::Member { name, .. } => Some(name.clone()),
            Expression::Convert(inner) => Self::custom_data_field(inner),
            Expression::Index { .. } => Self::custom_data_field(expr),
            _ => None,
        }
    }

    fn custom_data_field(expr: &Expression) -> Option<String> {
        match expr {
            Expression::Index { target, key } => {
                let on_custom_data = matches!(
                    target.as_ref(),
                    Expression::Member { name, .. } if name == CUSTOM_DATA_MEMBER
                );
                match key.as_ref() {
                    Expression::Constant(Literal::String(key)) if on_custom_data && !key.is_empty() => {
                        Some(format!("{}.{}", CUSTOM_DATA_MEMBER, key))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expression::{custom_data, field, within};

    #[test]
    fn test_member_equal() {
        let clauses = translate_where(&field("email").eq("han@solo.me")).unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].field, "email");
        assert_eq!(clauses[0].comparison, Comparison::Equal);
        assert_eq!(clauses[0].value, WhereValue::Literal(Literal::from("han@solo.me")));
    }

    #[test]
    fn test_constant_on_left() {
        let expr = Expression::binary(
            Expression::constant(5),
            BinaryOp::LessThan,
            Expression::member("count"),
        );
        let clauses = translate_where(&expr).unwrap();
        assert_eq!(clauses[0].field, "count");
        assert_eq!(clauses[0].comparison, Comparison::LessThan);
    }

    #[test]
    fn test_custom_data_with_cast() {
        let expr = Expression::binary(
            Expression::convert(Expression::custom_data_index("level")),
            BinaryOp::Equal,
            Expression::constant("admin"),
        );
        let clauses = translate_where(&expr).unwrap();
        assert_eq!(clauses[0].field, "customData.level");

        let via_builder = translate_where(&custom_data("level").starts_with("adm")).unwrap();
        assert_eq!(via_builder[0].field, "customData.level");
        assert_eq!(via_builder[0].comparison, Comparison::StartsWith);
    }

    #[test]
    fn test_indexer_on_other_member_rejected() {
        let expr = Expression::binary(
            Expression::Index {
                target: Box::new(Expression::member("providerData")),
                key: Box::new(Expression::constant("x")),
            },
            BinaryOp::Equal,
            Expression::constant(1),
        );
        assert!(matches!(translate_where(&expr), Err(QueryError::Unsupported(_))));
    }

    #[test]
    fn test_within_produces_date_part() {
        let clauses = translate_where(&within("createdAt", &[2015, 1])).unwrap();
        assert_eq!(clauses[0].comparison, Comparison::Equal);
        assert_eq!(clauses[0].value.render(), "2015-01");
    }

    #[test]
    fn test_within_requires_datetime_member() {
        let expr = Expression::function(
            "within",
            vec![Expression::member("createdAt"), Expression::constant(2015)],
        );
        let err = translate_where(&expr).unwrap_err();
        assert!(err.to_string().contains("datetime"));
    }

    #[test]
    fn test_method_with_two_args_rejected() {
        let expr = Expression::call(
            Expression::member("email"),
            "startsWith",
            vec![Expression::constant("a"), Expression::constant("b")],
        );
        let err = translate_where(&expr).unwrap_err();
        assert!(err.to_string().contains("startsWith"));
    }

    #[test]
    fn test_order_translation() {
        let clause = translate_order(
            &Expression::lambda(Expression::member("surname")),
            OrderDirection::Descending,
        )
        .unwrap();
        assert_eq!(clause.field, "surname");
        assert_eq!(clause.direction, OrderDirection::Descending);

        assert!(translate_order(&Expression::constant(1), OrderDirection::Ascending).is_err());
    }
}
