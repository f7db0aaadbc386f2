//! JSON condition documents. A predicate is rendered as nested objects with
//! a single operator key each:
//!
//! ```json
//! {"$or":[{"$and":[{"$ge":{"cellId":10}},{"$le":{"cellId":20}}]}]}
//! ```

use anyhow::{bail, Context, Result};
use serde_json::{json, Map};

use super::{Logical, Operator, Predicate, Value};

impl Operator {
    fn json_key(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Gte => "$ge",
            Operator::Lte => "$le",
        }
    }
}

impl Predicate {
    /// Render this predicate as a JSON condition document
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Predicate::Logical(Logical::And(parts)) => {
                json!({ "$and": parts.iter().map(Predicate::to_json).collect::<Vec<_>>() })
            }
            Predicate::Logical(Logical::Or(parts)) => {
                json!({ "$or": parts.iter().map(Predicate::to_json).collect::<Vec<_>>() })
            }
            Predicate::Comparison {
                operator,
                key,
                value,
            } => {
                let mut inner = Map::new();
                inner.insert(key.clone(), value.to_json());
                let mut outer = Map::new();
                outer.insert(operator.json_key().to_string(), inner.into());
                outer.into()
            }
        }
    }

    /// Parse a JSON condition document
    pub fn from_json(doc: &serde_json::Value) -> Result<Predicate> {
        let obj = doc
            .as_object()
            .context("Condition must be a JSON object")?;
        if obj.len() != 1 {
            bail!("Condition must have exactly one operator, found {}", obj.len());
        }
        let Some((op, arg)) = obj.iter().next() else {
            bail!("Condition must have exactly one operator");
        };

        match op.as_str() {
            "$and" | "$or" => {
                let parts = arg
                    .as_array()
                    .with_context(|| format!("Operands of `{op}' must be an array"))?
                    .iter()
                    .map(Predicate::from_json)
                    .collect::<Result<Vec<_>>>()?;
                if op == "$and" {
                    Ok(Predicate::and(parts))
                } else {
                    Ok(Predicate::or(parts))
                }
            }

            "$eq" | "$ge" | "$le" => {
                let operator = match op.as_str() {
                    "$eq" => Operator::Eq,
                    "$ge" => Operator::Gte,
                    _ => Operator::Lte,
                };
                let field = arg
                    .as_object()
                    .filter(|o| o.len() == 1)
                    .with_context(|| {
                        format!("Operand of `{op}' must be an object with exactly one field")
                    })?;
                let Some((key, value)) = field.iter().next() else {
                    bail!("Operand of `{op}' must not be empty");
                };
                Ok(Predicate::comparison(operator, key.as_str(), json_value(value)?))
            }

            _ => bail!("Unknown operator `{op}'"),
        }
    }
}

fn json_value(v: &serde_json::Value) -> Result<Value> {
    match v {
        serde_json::Value::String(s) => Ok(Value::String(s.clone())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Unsigned(u))
            } else {
                n.as_f64().map(Value::Float).context("Unsupported number")
            }
        }
        _ => bail!("Only strings and numbers can be compared, got `{v}'"),
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion, ResultAssertion};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::query::{and, eq, Predicate};

    #[test]
    fn range_disjunction() {
        let q = Predicate::or(vec![
            Predicate::between("cellId", 10u64, 20u64),
            Predicate::between("cellId", 30u64, 40u64),
        ]);
        assert_eq!(
            q.to_json(),
            json!({"$or": [
                {"$and": [{"$ge": {"cellId": 10}}, {"$le": {"cellId": 20}}]},
                {"$and": [{"$ge": {"cellId": 30}}, {"$le": {"cellId": 40}}]}
            ]})
        );
    }

    #[test]
    fn parse() {
        let doc = json!({"$and": [
            {"$ge": {"cellId": 10}},
            {"$eq": {"value.type": "International"}}
        ]});
        let q = Predicate::from_json(&doc).unwrap();
        assert_that!(q.clone()).is_equal_to(and![
            Predicate::comparison(crate::query::Operator::Gte, "cellId", 10i64),
            eq!("value.type", "International")
        ]);
        assert_eq!(q.to_json(), doc);
    }

    #[test]
    fn parse_errors() {
        assert_that!(Predicate::from_json(&json!([]))).is_err();
        assert_that!(Predicate::from_json(&json!({"$gt": {"a": 1}}))).is_err();
        assert_that!(Predicate::from_json(&json!({"$eq": {"a": 1, "b": 2}}))).is_err();
        assert_that!(Predicate::from_json(&json!({"$eq": {"a": true}}))).is_err();
        assert_that!(Predicate::from_json(&json!({"$and": {"a": 1}}))).is_err();
        assert_that!(Predicate::from_json(&json!({}))).is_err();
    }
}
