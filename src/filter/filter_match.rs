//! In-memory evaluation of filters against JSON rows.
//!
//! Semantics mirror the SQL rendering in `filter_where`: NULL never compares,
//! `$neq` behaves like `IS DISTINCT FROM`, `$in []` matches nothing and
//! `$nin []` excludes nothing.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter::Filter;
use super::filter_where::as_list;
use super::types::{FilterOp, FilterOrderInfo, SortDirection, WhereNode};

pub struct FilterMatcher;

impl FilterMatcher {
    /// Apply WHERE, ORDER BY, OFFSET/LIMIT and projection to `rows`.
    pub fn apply<'a, I>(filter: &Filter, rows: I) -> Result<Vec<Map<String, Value>>, FilterError>
    where
        I: IntoIterator<Item = &'a Map<String, Value>>,
    {
        let mut matched = Vec::new();
        for row in rows {
            if Self::matches(filter.where_node(), row)? {
                matched.push(row.clone());
            }
        }

        Self::sort(&mut matched, filter.order_infos());

        let (limit, offset) = filter.limit_offset();
        let offset = offset.unwrap_or(0).max(0) as usize;
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        let paged = matched.into_iter().skip(offset).take(limit);

        let columns = filter.select_columns();
        if columns.is_empty() || columns.iter().any(|c| c == "*") {
            return Ok(paged.collect());
        }
        Ok(paged
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect()
            })
            .collect())
    }

    pub fn matches(node: &WhereNode, row: &Map<String, Value>) -> Result<bool, FilterError> {
        match node {
            WhereNode::And(children) => {
                for child in children {
                    if !Self::matches(child, row)? { return Ok(false); }
                }
                Ok(true)
            }
            WhereNode::Or(children) => {
                for child in children {
                    if Self::matches(child, row)? { return Ok(true); }
                }
                Ok(false)
            }
            WhereNode::Not(inner) => Ok(!Self::matches(inner, row)?),
            WhereNode::Condition { column, operator, data } => {
                let field = row.get(column).unwrap_or(&Value::Null);
                Self::condition(field, *operator, data)
            }
        }
    }

    fn condition(field: &Value, operator: FilterOp, data: &Value) -> Result<bool, FilterError> {
        Ok(match operator {
            FilterOp::Eq => {
                if data.is_null() { field.is_null() } else { !field.is_null() && values_equal(field, data) }
            }
            FilterOp::Neq => {
                if data.is_null() { !field.is_null() } else { field.is_null() || !values_equal(field, data) }
            }
            FilterOp::Gt => compare(field, data) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(compare(field, data), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => compare(field, data) == Some(Ordering::Less),
            FilterOp::Lte => matches!(compare(field, data), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Like => like(field, data, false),
            FilterOp::ILike => like(field, data, true),
            FilterOp::In => !field.is_null() && as_list(data).iter().any(|v| values_equal(field, v)),
            FilterOp::NIn => field.is_null() || !as_list(data).iter().any(|v| values_equal(field, v)),
            FilterOp::Between => match data.as_array() {
                Some(bounds) if bounds.len() == 2 => {
                    matches!(compare(field, &bounds[0]), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(compare(field, &bounds[1]), Some(Ordering::Less | Ordering::Equal))
                }
                _ => return Err(FilterError::InvalidOperatorData("$between requires array with 2 values".to_string())),
            },
            FilterOp::Null => match data.as_bool() {
                Some(want_null) => field.is_null() == want_null,
                None => return Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
        })
    }

    /// Stable sort by each order column in turn; NULLs sort last ascending, like PostgreSQL.
    pub fn sort(rows: &mut [Map<String, Value>], order: &[FilterOrderInfo]) {
        if order.is_empty() { return; }
        rows.sort_by(|a, b| {
            for info in order {
                let left = a.get(&info.column).unwrap_or(&Value::Null);
                let right = b.get(&info.column).unwrap_or(&Value::Null);
                let ordering = match (left.is_null(), right.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
                };
                let ordering = match info.sort {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal { return ordering; }
            }
            Ordering::Equal
        });
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn like(field: &Value, pattern: &Value, case_insensitive: bool) -> bool {
    let (Some(text), Some(pattern)) = (field.as_str(), pattern.as_str()) else {
        return false;
    };
    if case_insensitive {
        like_match(&text.to_lowercase().chars().collect::<Vec<_>>(), &pattern.to_lowercase().chars().collect::<Vec<_>>())
    } else {
        like_match(&text.chars().collect::<Vec<_>>(), &pattern.chars().collect::<Vec<_>>())
    }
}

/// SQL LIKE: `%` matches any run, `_` matches one character.
fn like_match(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|skip| like_match(&text[skip..], rest)),
        Some(('_', rest)) => !text.is_empty() && like_match(&text[1..], rest),
        Some((c, rest)) => text.first() == Some(c) && like_match(&text[1..], rest),
    }
}
