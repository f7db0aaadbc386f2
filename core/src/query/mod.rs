use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

use crate::storage::point::Point;

pub use self::covering::{Covering, RegionCoveringClient};
pub use self::exactness::ExactnessFilter;
pub use self::range_query::{RangeQueryBuilder, Strategy, CELL_ID_FIELD};
pub use self::value::Value;

pub mod covering;
pub mod exactness;
pub mod json;
pub mod range_query;
pub mod value;

/// Specifies the logical combinator used to combine a list of predicates
#[derive(Debug, Clone, PartialEq)]
pub enum Logical {
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
}

/// Specifies how the value of a field should be compared to a constant
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    /// The values must equal
    Eq,

    /// The field's value must be greater than or equal to the constant
    Gte,

    /// The field's value must be less than or equal to the constant
    Lte,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::Gte => write!(f, ">="),
            Operator::Lte => write!(f, "<="),
        }
    }
}

/// A condition on the fields of a [`Point`]
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Logical(Logical),
    Comparison {
        operator: Operator,
        key: String,
        value: Value,
    },
}

impl From<Logical> for Predicate {
    fn from(logic: Logical) -> Self {
        Predicate::Logical(logic)
    }
}

impl Predicate {
    pub fn comparison(operator: Operator, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Comparison {
            operator,
            key: key.into(),
            value: value.into(),
        }
    }

    /// `key >= min AND key <= max`
    pub fn between(key: &str, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Predicate::and(vec![
            Predicate::comparison(Operator::Gte, key, min),
            Predicate::comparison(Operator::Lte, key, max),
        ])
    }

    pub fn and(parts: Vec<Predicate>) -> Self {
        Predicate::Logical(Logical::And(parts))
    }

    pub fn or(parts: Vec<Predicate>) -> Self {
        Predicate::Logical(Logical::Or(parts))
    }

    /// Evaluate the predicate against a point. Comparisons of values with
    /// different types and comparisons of missing fields never match.
    pub fn matches(&self, point: &Point) -> bool {
        match self {
            Predicate::Logical(Logical::And(parts)) => parts.iter().all(|p| p.matches(point)),
            Predicate::Logical(Logical::Or(parts)) => parts.iter().any(|p| p.matches(point)),
            Predicate::Comparison {
                operator,
                key,
                value,
            } => {
                let Some(ordering) = point.field(key).and_then(|v| v.compare(value)) else {
                    return false;
                };
                match operator {
                    Operator::Eq => ordering == Ordering::Equal,
                    Operator::Gte => ordering != Ordering::Less,
                    Operator::Lte => ordering != Ordering::Greater,
                }
            }
        }
    }

    /// Compute sorted and disjoint intervals of unsigned integers that the
    /// field `key` of every matching point must lie in. Returns `None` if the
    /// predicate does not constrain the field.
    pub fn ranges_on(&self, key: &str) -> Option<Vec<(u64, u64)>> {
        match self {
            Predicate::Comparison {
                operator,
                key: k,
                value,
            } => {
                if k != key {
                    return None;
                }
                let r = match (value, operator) {
                    (Value::Integer(i), Operator::Gte) if *i < 0 => vec![(0, u64::MAX)],
                    (Value::Integer(i), _) if *i < 0 => vec![],
                    (v, op) => match v.as_u64() {
                        Some(v) => match op {
                            Operator::Eq => vec![(v, v)],
                            Operator::Gte => vec![(v, u64::MAX)],
                            Operator::Lte => vec![(0, v)],
                        },
                        // strings and floats never compare with integers
                        None => vec![],
                    },
                };
                Some(r)
            }

            Predicate::Logical(Logical::And(parts)) => parts
                .iter()
                .filter_map(|p| p.ranges_on(key))
                .reduce(|a, b| intersect(&a, &b)),

            Predicate::Logical(Logical::Or(parts)) => {
                let mut all = Vec::new();
                for p in parts {
                    all.extend(p.ranges_on(key)?);
                }
                Some(union(all))
            }
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Comparison {
                operator,
                key,
                value,
            } => write!(f, "{key} {operator} {value}"),

            Predicate::Logical(logical) => {
                let (parts, sep, empty) = match logical {
                    Logical::And(parts) => (parts, " AND ", "TRUE"),
                    Logical::Or(parts) => (parts, " OR ", "FALSE"),
                };
                if parts.is_empty() {
                    return write!(f, "{empty}");
                }
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    match p {
                        Predicate::Logical(_) => write!(f, "({p})")?,
                        Predicate::Comparison { .. } => write!(f, "{p}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

fn union(mut ranges: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    ranges.sort_unstable();
    let mut result: Vec<(u64, u64)> = Vec::with_capacity(ranges.len());
    for (min, max) in ranges {
        match result.last_mut() {
            Some(last) if min <= last.1.saturating_add(1) => last.1 = last.1.max(max),
            _ => result.push((min, max)),
        }
    }
    result
}

fn intersect(a: &[(u64, u64)], b: &[(u64, u64)]) -> Vec<(u64, u64)> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let min = a[i].0.max(b[j].0);
        let max = a[i].1.min(b[j].1);
        if min <= max {
            result.push((min, max));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

#[cfg(test)]
macro_rules! and {
    ($($x:expr),* $(,)?) => {
        $crate::query::Predicate::Logical(
            $crate::query::Logical::And(vec![$($x.into(),)*]))
    };
}

#[cfg(test)]
macro_rules! or {
    ($($x:expr),* $(,)?) => {
        $crate::query::Predicate::Logical(
            $crate::query::Logical::Or(vec![$($x.into(),)*]))
    };
}

#[cfg(test)]
macro_rules! eq {
    ($key:expr, $value:expr) => {{
        let key = $key.into();
        let value = $value.into();
        $crate::query::Predicate::Comparison {
            operator: $crate::query::Operator::Eq,
            key,
            value,
        }
    }};
}

#[cfg(test)]
macro_rules! gte {
    ($key:expr, $value:expr) => {{
        let key = $key.into();
        let value = $value.into();
        $crate::query::Predicate::Comparison {
            operator: $crate::query::Operator::Gte,
            key,
            value,
        }
    }};
}

#[cfg(test)]
macro_rules! lte {
    ($key:expr, $value:expr) => {{
        let key = $key.into();
        let value = $value.into();
        $crate::query::Predicate::Comparison {
            operator: $crate::query::Operator::Lte,
            key,
            value,
        }
    }};
}

#[cfg(test)]
pub(crate) use and;
#[cfg(test)]
pub(crate) use eq;
#[cfg(test)]
pub(crate) use gte;
#[cfg(test)]
pub(crate) use lte;
#[cfg(test)]
pub(crate) use or;

#[cfg(test)]
mod tests {
    use assertor::{assert_that, BooleanAssertion, EqualityAssertion, OptionAssertion};
    use serde_json::json;

    use crate::storage::point::Point;

    use super::Predicate;

    fn point(id: &str, cell_id: u64, kind: &str) -> Point {
        Point {
            id: id.to_string(),
            cell_id,
            payload: json!({ "type": kind, "runways": 3 }),
            location: None,
        }
    }

    #[test]
    fn matches() {
        let p = point("a", 15, "International");
        assert_that!(Predicate::between("cellId", 10u64, 20u64).matches(&p)).is_true();
        assert_that!(Predicate::between("cellId", 16u64, 20u64).matches(&p)).is_false();
        assert_that!(or![
            Predicate::between("cellId", 0u64, 5u64),
            Predicate::between("cellId", 15u64, 15u64)
        ]
        .matches(&p))
        .is_true();
        assert_that!(and![gte!("cellId", 10u64), eq!("value.type", "International")].matches(&p))
            .is_true();
        assert_that!(eq!("value.type", "Regional").matches(&p)).is_false();
        assert_that!(eq!("value.runways", 3i64).matches(&p)).is_true();
        assert_that!(eq!("value.runways", 3.0).matches(&p)).is_false();
        assert_that!(eq!("value.missing", 3i64).matches(&p)).is_false();
        assert_that!(and![].matches(&p)).is_true();
        assert_that!(or![].matches(&p)).is_false();
    }

    #[test]
    fn ranges() {
        let q = or![
            Predicate::between("cellId", 30u64, 40u64),
            Predicate::between("cellId", 10u64, 20u64),
            Predicate::between("cellId", 21u64, 25u64),
        ];
        assert_that!(q.ranges_on("cellId")).has_value(vec![(10, 25), (30, 40)]);

        let q = and![q, eq!("value.type", "International")];
        assert_that!(q.ranges_on("cellId")).has_value(vec![(10, 25), (30, 40)]);
        assert_that!(q.ranges_on("_id")).is_none();

        let q = and![gte!("cellId", 15u64), lte!("cellId", 35u64), q];
        assert_that!(q.ranges_on("cellId")).has_value(vec![(15, 25), (30, 35)]);

        assert_that!(lte!("cellId", -1i64).ranges_on("cellId")).has_value(vec![]);
        assert_that!(eq!("cellId", "x").ranges_on("cellId")).has_value(vec![]);
        assert_that!(or![eq!("_id", "x"), eq!("cellId", 1u64)].ranges_on("cellId")).is_none();
    }

    #[test]
    fn display() {
        let q = and![
            or![
                Predicate::between("cellId", 1u64, 2u64),
                Predicate::between("cellId", 5u64, 9u64)
            ],
            eq!("value.type", "International")
        ];
        assert_that!(q.to_string()).is_equal_to(
            r#"((cellId >= 1 AND cellId <= 2) OR (cellId >= 5 AND cellId <= 9)) AND value.type = "International""#
                .to_string(),
        );
    }
}
