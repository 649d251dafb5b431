//! Collection query compiler
//!
//! Turns translated clauses plus paging/expansion options into the query
//! string of a collection request.

use super::clause::{Comparison, OrderClause, OrderDirection, WhereClause};
use super::expression::Expression;
use super::translator::{translate_order, translate_where};
use crate::error::{QueryError, Result};
use crate::http::QueryString;
use std::collections::HashMap;

/// Query against a collection resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionQuery {
    clauses: Vec<WhereClause>,
    order: Vec<OrderClause>,
    filter: Option<String>,
    expand: Vec<String>,
    offset: Option<u64>,
    limit: Option<u64>,
}

#[derive(Default)]
struct Range {
    lower: Option<(String, bool)>,
    upper: Option<(String, bool)>,
}

impl CollectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the clauses of a predicate expression
    pub fn where_expr(mut self, predicate: &Expression) -> Result<Self> {
        self.clauses.extend(translate_where(predicate)?);
        Ok(self)
    }

    /// Add an already translated clause
    pub fn with_clause(mut self, clause: WhereClause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Order by a key selector expression
    pub fn order_by_expr(mut self, selector: &Expression, direction: OrderDirection) -> Result<Self> {
        self.order.push(translate_order(selector, direction)?);
        Ok(self)
    }

    /// Order by a field name
    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order.push(OrderClause {
            field: field.into(),
            direction,
        });
        self
    }

    /// Free-text filter (`q=`)
    pub fn filter(mut self, text: impl Into<String>) -> Self {
        self.filter = Some(text.into());
        self
    }

    /// Expand a linked resource inline
    pub fn expand(mut self, link: impl Into<String>) -> Self {
        self.expand.push(link.into());
        self
    }

    pub fn skip(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn take(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn clauses(&self) -> &[WhereClause] {
        &self.clauses
    }

    pub fn ordering(&self) -> &[OrderClause] {
        &self.order
    }

    /// Compile into query parameters.
    ///
    /// Bounds on one field merge into a single range; any other repeated
    /// constraint on a field is rejected.
    pub fn to_query_string(&self) -> Result<QueryString> {
        let mut query = QueryString::new();
        let mut ranges: HashMap<&str, Range> = HashMap::new();
        let mut range_order: Vec<&str> = Vec::new();

        for clause in &self.clauses {
            let rendered = clause.value.render();
            let field = clause.field.as_str();

            let bound = match clause.comparison {
                Comparison::GreaterThan => Some((true, false)),
                Comparison::GreaterOrEqual => Some((true, true)),
                Comparison::LessThan => Some((false, false)),
                Comparison::LessOrEqual => Some((false, true)),
                _ => None,
            };

            if let Some((is_lower, inclusive)) = bound {
                if query.contains_key(field) {
                    return Err(Self::conflict(field));
                }
                if !ranges.contains_key(field) {
                    range_order.push(field);
                }
                let range = ranges.entry(field).or_default();
                let slot = if is_lower { &mut range.lower } else { &mut range.upper };
                if slot.is_some() {
                    return Err(Self::conflict(field));
                }
                *slot = Some((rendered, inclusive));
                continue;
            }

            if query.contains_key(field) || ranges.contains_key(field) {
                return Err(Self::conflict(field));
            }

            let value = match clause.comparison {
                Comparison::StartsWith => format!("{}*", rendered),
                Comparison::EndsWith => format!("*{}", rendered),
                Comparison::Contains => format!("*{}*", rendered),
                _ => rendered,
            };
            query.insert(field, value);
        }

        for field in range_order {
            if let Some(range) = ranges.remove(field) {
                query.insert(field, Self::render_range(&range));
            }
        }

        if let Some(filter) = &self.filter {
            query.insert("q", filter.clone());
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            query.insert("orderBy", order);
        }

        if !self.expand.is_empty() {
            query.insert("expand", self.expand.join(","));
        }

        if let Some(offset) = self.offset {
            query.insert("offset", offset.to_string());
        }

        if let Some(limit) = self.limit {
            query.insert("limit", limit.to_string());
        }

        Ok(query)
    }

    fn render_range(range: &Range) -> String {
        let (open, lower) = match &range.lower {
            Some((value, true)) => ('[', value.as_str()),
            Some((value, false)) => ('(', value.as_str()),
            None => ('[', ""),
        };
        let (close, upper) = match &range.upper {
            Some((value, true)) => (']', value.as_str()),
            Some((value, false)) => (')', value.as_str()),
            None => (']', ""),
        };
        format!("{}{},{}{}", open, lower, upper, close)
    }

    fn conflict(field: &str) -> QueryError {
        QueryError::Unsupported(format!(
            "The field '{}' is constrained more than once",
            field
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expression::{custom_data, field, within};

    #[test]
    fn test_string_matchers() {
        let query = CollectionQuery::new()
            .where_expr(&field("email").starts_with("han").and(field("surname").ends_with("olo")))
            .unwrap()
            .where_expr(&field("givenName").contains("a"))
            .unwrap()
            .to_query_string()
            .unwrap();

        assert_eq!(query.get("email"), Some("han*"));
        assert_eq!(query.get("surname"), Some("*olo"));
        assert_eq!(query.get("givenName"), Some("*a*"));
    }

    #[test]
    fn test_bounds_merge_into_range() {
        let query = CollectionQuery::new()
            .where_expr(&field("age").ge(18).and(field("age").lt(65)))
            .unwrap()
            .to_query_string()
            .unwrap();
        assert_eq!(query.get("age"), Some("[18,65)"));

        let open_ended = CollectionQuery::new()
            .where_expr(&field("age").gt(18))
            .unwrap()
            .to_query_string()
            .unwrap();
        assert_eq!(open_ended.get("age"), Some("(18,]"));
    }

    #[test]
    fn test_conflicting_constraints_rejected() {
        let query = CollectionQuery::new()
            .where_expr(&field("email").eq("a").and(field("email").eq("b")))
            .unwrap();
        assert!(query.to_query_string().is_err());
    }

    #[test]
    fn test_paging_ordering_and_expansion() {
        let query = CollectionQuery::new()
            .where_expr(&within("createdAt", &[2015, 7]))
            .unwrap()
            .where_expr(&custom_data("isAdmin").eq(true))
            .unwrap()
            .order_by("surname", OrderDirection::Descending)
            .order_by("givenName", OrderDirection::Ascending)
            .expand("customData")
            .filter("solo")
            .skip(10)
            .take(25)
            .to_query_string()
            .unwrap();

        assert_eq!(query.get("createdAt"), Some("2015-07"));
        assert_eq!(query.get("customData.isAdmin"), Some("true"));
        assert_eq!(query.get("orderBy"), Some("surname desc,givenName"));
        assert_eq!(query.get("expand"), Some("customData"));
        assert_eq!(query.get("q"), Some("solo"));
        assert_eq!(query.get("offset"), Some("10"));
        assert_eq!(query.get("limit"), Some("25"));
    }
}
