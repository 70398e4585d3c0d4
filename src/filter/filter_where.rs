use serde_json::Value;

use super::error::FilterError;
use super::is_valid_identifier;
use super::types::{FilterOp, WhereNode};

/// Parses WHERE documents into a [`WhereNode`] tree and renders the tree as
/// parameterized PostgreSQL.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Render `where_data` with placeholders numbered after `starting_param_index`.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let node = Self::parse(where_data)?;
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.render(&node)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        Self::parse(where_data).map(|_| ())
    }

    pub fn parse(where_data: &Value) -> Result<WhereNode, FilterError> {
        match where_data {
            Value::Null => Ok(WhereNode::And(vec![])),
            Value::Object(obj) => {
                let mut nodes = Vec::with_capacity(obj.len());
                for (key, value) in obj {
                    if key.starts_with('$') {
                        nodes.push(Self::parse_logical_operator(key, value)?);
                    } else {
                        Self::parse_field_condition(key, value, &mut nodes)?;
                    }
                }
                Ok(WhereNode::And(nodes))
            }
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<WhereNode, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let children = arr.iter().map(Self::parse).collect::<Result<Vec<_>, _>>()?;
                Ok(if op == "$and" { WhereNode::And(children) } else { WhereNode::Or(children) })
            }
            "$not" => Ok(WhereNode::Not(Box::new(Self::parse(value)?))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value, out: &mut Vec<WhereNode>) -> Result<(), FilterError> {
        if !is_valid_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }

        match value {
            Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => {
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    out.push(WhereNode::Condition {
                        column: field.to_string(),
                        operator,
                        data: op_val.clone(),
                    });
                }
            }
            // Implicit equality: { field: value }
            _ => out.push(WhereNode::Condition {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            }),
        }
        Ok(())
    }

    fn render(&mut self, node: &WhereNode) -> Result<String, FilterError> {
        match node {
            WhereNode::And(children) => self.render_group(children, " AND ", "1=1"),
            WhereNode::Or(children) => self.render_group(children, " OR ", "1=0"),
            WhereNode::Not(inner) => Ok(format!("NOT ({})", self.render(inner)?)),
            WhereNode::Condition { column, operator, data } => self.render_condition(column, *operator, data),
        }
    }

    fn render_group(&mut self, children: &[WhereNode], joiner: &str, empty: &str) -> Result<String, FilterError> {
        if children.is_empty() {
            return Ok(empty.to_string());
        }
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            let sql = self.render(child)?;
            match child {
                WhereNode::Condition { .. } | WhereNode::Not(_) => parts.push(sql),
                _ => parts.push(format!("({})", sql)),
            }
        }
        Ok(parts.join(joiner))
    }

    fn render_condition(&mut self, column: &str, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", column);
        match operator {
            FilterOp::Eq => {
                if data.is_null() { Ok(format!("{} IS NULL", quoted_column)) }
                else { Ok(format!("{} = {}", quoted_column, self.param(data.clone()))) }
            }
            FilterOp::Neq => {
                if data.is_null() { Ok(format!("{} IS NOT NULL", quoted_column)) }
                else { Ok(format!("{} IS DISTINCT FROM {}", quoted_column, self.param(data.clone()))) }
            }
            FilterOp::Gt => Ok(format!("{} > {}", quoted_column, self.param(data.clone()))),
            FilterOp::Gte => Ok(format!("{} >= {}", quoted_column, self.param(data.clone()))),
            FilterOp::Lt => Ok(format!("{} < {}", quoted_column, self.param(data.clone()))),
            FilterOp::Lte => Ok(format!("{} <= {}", quoted_column, self.param(data.clone()))),
            FilterOp::Like => Ok(format!("{} LIKE {}", quoted_column, self.param(data.clone()))),
            FilterOp::ILike => Ok(format!("{} ILIKE {}", quoted_column, self.param(data.clone()))),
            FilterOp::In => {
                let values = as_list(data);
                if values.is_empty() { return Ok("1=0".to_string()); }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                Ok(format!("{} IN ({})", quoted_column, params.join(", ")))
            }
            FilterOp::NIn => {
                // Excluding an empty set excludes nothing.
                let values = as_list(data);
                if values.is_empty() { return Ok("1=1".to_string()); }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                Ok(format!("({} IS NULL OR {} NOT IN ({}))", quoted_column, quoted_column, params.join(", ")))
            }
            FilterOp::Between => {
                match data.as_array() {
                    Some(values) if values.len() == 2 => Ok(format!(
                        "{} BETWEEN {} AND {}",
                        quoted_column,
                        self.param(values[0].clone()),
                        self.param(values[1].clone())
                    )),
                    _ => Err(FilterError::InvalidOperatorData("$between requires array with 2 values".to_string())),
                }
            }
            FilterOp::Null => match data.as_bool() {
                Some(true) => Ok(format!("{} IS NULL", quoted_column)),
                Some(false) => Ok(format!("{} IS NOT NULL", quoted_column)),
                None => Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// `$in` / `$nin` accept either an array or a single scalar.
pub(crate) fn as_list(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(values) => values.clone(),
        Value::Null => vec![],
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_and_params() {
        let (sql, params) = FilterWhere::generate(&json!({ "project_id": "p1", "role": "dev" }), 0).unwrap();
        assert_eq!(sql, "\"project_id\" = $1 AND \"role\" = $2");
        assert_eq!(params, vec![json!("p1"), json!("dev")]);
    }

    #[test]
    fn starting_index_is_respected() {
        let (sql, _) = FilterWhere::generate(&json!({ "id": "x" }), 1).unwrap();
        assert_eq!(sql, "\"id\" = $2");
    }

    #[test]
    fn empty_not_in_excludes_nothing() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$nin": [] } }), 0).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, _) = FilterWhere::generate(&json!({ "id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "1=0");
    }

    #[test]
    fn not_in_keeps_null_rows() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$nin": ["a", "b"] } }), 0).unwrap();
        assert_eq!(sql, "(\"id\" IS NULL OR \"id\" NOT IN ($1, $2))");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn nested_logical_operators() {
        let where_data = json!({
            "project_id": "p",
            "$or": [ { "status": "pending" }, { "$not": { "status": "completed" } } ]
        });
        let (sql, params) = FilterWhere::generate(&where_data, 0).unwrap();
        // serde_json maps iterate in key order, so `$or` sorts first
        assert_eq!(sql, "(\"status\" = $1 OR NOT (\"status\" = $2)) AND \"project_id\" = $3");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn rejects_bad_columns_and_operators() {
        assert!(matches!(
            FilterWhere::generate(&json!({ "bad col": 1 }), 0),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&json!({ "id": { "$regex": "x" } }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(FilterWhere::validate(&json!("raw sql")).is_err());
    }
}
