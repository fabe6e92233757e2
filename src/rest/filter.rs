//! Filter and sort expressions and their query parameter encoding.
//!
//! Expressions are built from [`field`] and combined with `&` (logical AND)
//! and `!` (negation):
//!
//! ```rust
//! use restmap::rest::field;
//!
//! let expr = field("tags").contains("nuti") & !field("name").eq("Flutes");
//! let params = expr.encode().unwrap();
//!
//! assert_eq!(
//!     params,
//!     vec![
//!         ("tags.contains".to_string(), "nuti".to_string()),
//!         ("name.!eq".to_string(), "Flutes".to_string()),
//!     ]
//! );
//! ```
//!
//! # Wire encoding
//!
//! Each comparison emits one parameter `<field>.<operator>`; a negated
//! comparison emits `<field>.!<operator>`. Multi-value operands are joined
//! with `,`. Sorts emit a single `sort` parameter of `[-]field` tokens.
//! A negated conjunction has no encoding and is rejected.

use std::fmt;
use std::ops::{BitAnd, Not};

use crate::rest::value::FieldValue;

/// Comparison operators understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal.
    Eq,
    /// Contains (substring or list membership, as the API defines it).
    Contains,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// One of several values.
    In,
    /// Starts with.
    StartsWith,
    /// Ends with.
    EndsWith,
    /// SQL-style pattern match.
    Like,
    /// Case-insensitive SQL-style pattern match.
    ILike,
}

impl Operator {
    /// Returns the operator's wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Contains => "contains",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Like => "like",
            Self::ILike => "ilike",
        }
    }

    /// Returns `true` if the operator takes a list of operands.
    #[must_use]
    pub const fn is_multi_valued(&self) -> bool {
        matches!(self, Self::In)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter expression. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `field op value(s)`.
    Compare {
        /// A dotted field path.
        field: String,
        /// The operator.
        op: Operator,
        /// The operands (exactly one unless the operator is multi-valued).
        values: Vec<FieldValue>,
    },
    /// Negation of an expression.
    Not(Box<FilterExpr>),
    /// Conjunction of expressions.
    And(Vec<FilterExpr>),
}

/// One encodable comparison after flattening.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    pub(crate) field: String,
    pub(crate) op: Operator,
    pub(crate) negated: bool,
    pub(crate) values: Vec<FieldValue>,
}

impl Predicate {
    pub(crate) fn key(&self) -> String {
        let bang = if self.negated { "!" } else { "" };
        format!("{}.{bang}{}", self.field, self.op)
    }

    pub(crate) fn value(&self) -> String {
        self.values
            .iter()
            .map(FieldValue::to_query_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Why an expression cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EncodeError {
    pub(crate) field: String,
    pub(crate) reason: String,
}

impl FilterExpr {
    /// Conjunction of several expressions.
    #[must_use]
    pub fn and(exprs: impl IntoIterator<Item = Self>) -> Self {
        Self::And(exprs.into_iter().collect())
    }

    /// Returns every field path the expression mentions.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Compare { field, .. } => vec![field.as_str()],
            Self::Not(inner) => inner.fields(),
            Self::And(exprs) => exprs.iter().flat_map(Self::fields).collect(),
        }
    }

    /// Flattens the expression into comparisons. Nested conjunctions are
    /// inlined and double negations cancel.
    pub(crate) fn flatten(&self) -> Result<Vec<Predicate>, EncodeError> {
        let mut out = Vec::new();
        self.flatten_into(false, &mut out)?;
        Ok(out)
    }

    fn flatten_into(&self, negated: bool, out: &mut Vec<Predicate>) -> Result<(), EncodeError> {
        match self {
            Self::Compare { field, op, values } => {
                if values.is_empty() {
                    return Err(EncodeError {
                        field: field.clone(),
                        reason: format!("{op} needs an operand"),
                    });
                }
                if values.len() > 1 && !op.is_multi_valued() {
                    return Err(EncodeError {
                        field: field.clone(),
                        reason: format!("{op} takes a single operand"),
                    });
                }
                out.push(Predicate {
                    field: field.clone(),
                    op: *op,
                    negated,
                    values: values.clone(),
                });
                Ok(())
            }
            Self::Not(inner) => inner.flatten_into(!negated, out),
            Self::And(_) if negated => Err(EncodeError {
                field: self.fields().join(","),
                reason: "a negated conjunction cannot be encoded".to_string(),
            }),
            Self::And(exprs) => exprs
                .iter()
                .try_for_each(|expr| expr.flatten_into(false, out)),
        }
    }

    /// Encodes the expression as ordered query parameters, without
    /// validating field paths against a resource type.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the expression negates a
    /// conjunction or has the wrong number of operands.
    pub fn encode(&self) -> Result<Vec<(String, String)>, String> {
        self.flatten()
            .map(|predicates| predicates.iter().map(|p| (p.key(), p.value())).collect())
            .map_err(|e| format!("{}: {}", e.field, e.reason))
    }
}

impl Not for FilterExpr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

impl BitAnd for FilterExpr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        match self {
            Self::And(mut exprs) => {
                exprs.push(rhs);
                Self::And(exprs)
            }
            lhs => Self::And(vec![lhs, rhs]),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Ascending (default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// A dotted field path.
    pub field: String,
    /// The direction.
    pub direction: Direction,
}

impl SortKey {
    /// Returns the key with its direction inverted.
    #[must_use]
    pub fn reverse(mut self) -> Self {
        self.direction = match self.direction {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        };
        self
    }

    /// Returns the wire token (`field` or `-field`).
    #[must_use]
    pub fn token(&self) -> String {
        match self.direction {
            Direction::Asc => self.field.clone(),
            Direction::Desc => format!("-{}", self.field),
        }
    }
}

/// Encodes sort keys as the value of the `sort` parameter.
#[must_use]
pub fn encode_sorts(keys: &[SortKey]) -> Option<String> {
    if keys.is_empty() {
        None
    } else {
        Some(keys.iter().map(SortKey::token).collect::<Vec<_>>().join(","))
    }
}

/// A field path, the starting point of filters and sorts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    path: String,
}

/// Starts an expression on a (dotted) field path.
#[must_use]
pub fn field(path: impl Into<String>) -> Field {
    Field { path: path.into() }
}

impl Field {
    /// Returns the field path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn compare(&self, op: Operator, value: impl Into<FieldValue>) -> FilterExpr {
        FilterExpr::Compare {
            field: self.path.clone(),
            op,
            values: vec![value.into()],
        }
    }

    /// `field == value`.
    #[must_use]
    pub fn eq(&self, value: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::Eq, value)
    }

    /// `field != value`, encoded as a negated `eq`.
    #[must_use]
    pub fn ne(&self, value: impl Into<FieldValue>) -> FilterExpr {
        !self.eq(value)
    }

    /// `field > value`.
    #[must_use]
    pub fn gt(&self, value: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::Gt, value)
    }

    /// `field >= value`.
    #[must_use]
    pub fn gte(&self, value: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::Gte, value)
    }

    /// `field < value`.
    #[must_use]
    pub fn lt(&self, value: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::Lt, value)
    }

    /// `field <= value`.
    #[must_use]
    pub fn lte(&self, value: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::Lte, value)
    }

    /// `field contains value`.
    #[must_use]
    pub fn contains(&self, value: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::Contains, value)
    }

    /// `field in (values...)`.
    #[must_use]
    pub fn one_of<V: Into<FieldValue>>(&self, values: impl IntoIterator<Item = V>) -> FilterExpr {
        FilterExpr::Compare {
            field: self.path.clone(),
            op: Operator::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `field` starts with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::StartsWith, prefix)
    }

    /// `field` ends with `suffix`.
    #[must_use]
    pub fn ends_with(&self, suffix: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::EndsWith, suffix)
    }

    /// `field LIKE pattern`.
    #[must_use]
    pub fn like(&self, pattern: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::Like, pattern)
    }

    /// `field ILIKE pattern`.
    #[must_use]
    pub fn ilike(&self, pattern: impl Into<FieldValue>) -> FilterExpr {
        self.compare(Operator::ILike, pattern)
    }

    /// Ascending sort on this field.
    #[must_use]
    pub fn asc(&self) -> SortKey {
        SortKey {
            field: self.path.clone(),
            direction: Direction::Asc,
        }
    }

    /// Descending sort on this field.
    #[must_use]
    pub fn desc(&self) -> SortKey {
        SortKey {
            field: self.path.clone(),
            direction: Direction::Desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(expr: &FilterExpr) -> Vec<(String, String)> {
        expr.encode().unwrap()
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_operator_wire_names() {
        let cases = [
            (field("a").eq(1), "a.eq"),
            (field("a").contains("x"), "a.contains"),
            (field("a").gt(1), "a.gt"),
            (field("a").gte(1), "a.gte"),
            (field("a").lt(1), "a.lt"),
            (field("a").lte(1), "a.lte"),
            (field("a").starts_with("x"), "a.startswith"),
            (field("a").ends_with("x"), "a.endswith"),
            (field("a").like("x%"), "a.like"),
            (field("a").ilike("x%"), "a.ilike"),
        ];
        for (expr, key) in cases {
            assert_eq!(encode(&expr)[0].0, key);
        }
    }

    #[test]
    fn test_multi_value_operands_are_comma_joined() {
        assert_eq!(
            encode(&field("genre").one_of(["jazz", "folk"])),
            vec![pair("genre.in", "jazz,folk")]
        );
    }

    #[test]
    fn test_negation_encoding() {
        assert_eq!(
            encode(&field("name").ne("Flutes")),
            vec![pair("name.!eq", "Flutes")]
        );
        assert_eq!(
            encode(&!field("tags").contains("nuti")),
            vec![pair("tags.!contains", "nuti")]
        );
    }

    #[test]
    fn test_double_negation_cancels() {
        assert_eq!(
            encode(&!!field("name").eq("Flutes")),
            vec![pair("name.eq", "Flutes")]
        );
    }

    #[test]
    fn test_negated_conjunction_is_rejected() {
        let expr = !(field("a").eq(1) & field("b").eq(2));
        let error = expr.encode().unwrap_err();
        assert!(error.contains("negated conjunction"));
    }

    #[test]
    fn test_nested_conjunctions_flatten_in_order() {
        let expr = FilterExpr::and([
            field("a").eq(1),
            FilterExpr::and([field("b").gt(2), field("c").lt(3)]),
        ]);
        assert_eq!(
            encode(&expr),
            vec![pair("a.eq", "1"), pair("b.gt", "2"), pair("c.lt", "3")]
        );
    }

    #[test]
    fn test_bitand_appends() {
        let expr = field("a").eq(1) & field("b").eq(2) & field("c").eq(3);
        assert_eq!(expr.fields(), vec!["a", "b", "c"]);
        assert!(matches!(&expr, FilterExpr::And(exprs) if exprs.len() == 3));
    }

    #[test]
    fn test_single_valued_operator_rejects_lists_of_operands() {
        let expr = FilterExpr::Compare {
            field: "a".to_string(),
            op: Operator::Eq,
            values: vec![FieldValue::from(1), FieldValue::from(2)],
        };
        assert!(expr.encode().is_err());

        let expr = field("a").one_of(Vec::<String>::new());
        assert!(expr.encode().is_err());
    }

    #[test]
    fn test_sort_tokens() {
        let keys = vec![field("created_at").desc(), field("name").asc()];
        assert_eq!(encode_sorts(&keys).as_deref(), Some("-created_at,name"));
        assert_eq!(field("name").asc().reverse().token(), "-name");
        assert_eq!(field("name").desc().reverse().token(), "name");
        assert_eq!(encode_sorts(&[]), None);
    }
}
