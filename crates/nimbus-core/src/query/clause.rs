//! Translated query clauses

use super::expression::Literal;
use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison of a where clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Equal,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    StartsWith,
    EndsWith,
    Contains,
}

/// Partial date/time match: every unit after the first `None` is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePartMatch {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

impl DatePartMatch {
    /// Build from 1-6 parts (year, month, day, hour, minute, second)
    pub fn from_parts(parts: &[i64]) -> Result<Self> {
        if parts.is_empty() || parts.len() > 6 {
            return Err(QueryError::InvalidDatePart(format!(
                "expected 1 to 6 date parts, got {}",
                parts.len()
            )));
        }

        let year = i32::try_from(parts[0])
            .map_err(|_| QueryError::InvalidDatePart(format!("year {}", parts[0])))?;
        let unit = |index: usize, name: &str, min: i64, max: i64| -> Result<Option<u32>> {
            match parts.get(index) {
                None => Ok(None),
                Some(v) if (min..=max).contains(v) => Ok(Some(*v as u32)),
                Some(v) => Err(QueryError::InvalidDatePart(format!("{} {}", name, v))),
            }
        };

        Ok(Self {
            year,
            month: unit(1, "month", 1, 12)?,
            day: unit(2, "day", 1, 31)?,
            hour: unit(3, "hour", 0, 23)?,
            minute: unit(4, "minute", 0, 59)?,
            second: unit(5, "second", 0, 59)?,
        })
    }
}

impl fmt::Display for DatePartMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        let Some(month) = self.month else { return Ok(()) };
        write!(f, "-{:02}", month)?;
        let Some(day) = self.day else { return Ok(()) };
        write!(f, "-{:02}", day)?;
        let Some(hour) = self.hour else { return Ok(()) };
        write!(f, "T{:02}", hour)?;
        let Some(minute) = self.minute else { return Ok(()) };
        write!(f, ":{:02}", minute)?;
        let Some(second) = self.second else { return Ok(()) };
        write!(f, ":{:02}", second)
    }
}

/// Right-hand side of a where clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WhereValue {
    Literal(Literal),
    DatePart(DatePartMatch),
}

impl WhereValue {
    /// Render as it appears in a query string
    pub fn render(&self) -> String {
        match self {
            WhereValue::DatePart(parts) => parts.to_string(),
            WhereValue::Literal(Literal::Null) => "null".to_string(),
            WhereValue::Literal(Literal::Bool(b)) => b.to_string(),
            WhereValue::Literal(Literal::Int(i)) => i.to_string(),
            WhereValue::Literal(Literal::Float(f)) => f.to_string(),
            WhereValue::Literal(Literal::String(s)) => s.clone(),
            WhereValue::Literal(Literal::DateTime(dt)) => {
                dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            }
        }
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    /// Field name; custom data keys are `customData.<key>`
    pub field: String,
    pub comparison: Comparison,
    pub value: WhereValue,
}

impl WhereClause {
    pub fn new(field: impl Into<String>, comparison: Comparison, value: WhereValue) -> Self {
        Self {
            field: field.into(),
            comparison,
            value,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

/// A single ordering term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderClause {
    pub field: String,
    pub direction: OrderDirection,
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            OrderDirection::Ascending => f.write_str(&self.field),
            OrderDirection::Descending => write!(f, "{} desc", self.field),
        }
    }
}
