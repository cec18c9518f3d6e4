//! Evaluation of [`Condition`]s against JSON-encoded rows.

use crate::{DatabaseError, Record};
use serde_json::Value;
use std::cmp::Ordering;
use topo_domain::constants::DEFAULT_SORT_FIELD;
use topo_domain::models::{Condition, Operator, SortKey};

/// Rejects filter and sort fields the table does not have.
pub(crate) fn validate_fields<T: Record>(condition: &Condition) -> Result<(), DatabaseError> {
    let filter_fields = condition.constraints.iter().map(|c| c.field.as_str());
    let sort_fields =
        condition.page.iter().flat_map(|page| page.sort.iter().map(|key| key.field.as_str()));

    for field in filter_fields.chain(sort_fields) {
        if !T::FIELDS.contains(&field) {
            return Err(DatabaseError::InvalidInput {
                message: format!("unknown field '{field}'").into(),
                context: Some(T::TABLE.into()),
            });
        }
    }
    Ok(())
}

/// Whether every constraint of `condition` holds for `doc`.
pub(crate) fn matches(doc: &Value, condition: &Condition) -> bool {
    condition.constraints.iter().all(|constraint| {
        let actual = doc.get(&constraint.field).filter(|v| !v.is_null());
        constraint.operators.iter().all(|op| holds(op, actual))
    })
}

fn holds(op: &Operator, actual: Option<&Value>) -> bool {
    let ordered = |expected: &Value, accept: fn(Ordering) -> bool| {
        actual.and_then(|value| compare(value, expected)).is_some_and(accept)
    };

    match op {
        Operator::Eq(expected) => equals(actual, expected),
        Operator::Ne(expected) => !equals(actual, expected),
        Operator::In(options) => options.iter().any(|expected| equals(actual, expected)),
        Operator::Nin(options) => !options.iter().any(|expected| equals(actual, expected)),
        Operator::Lt(expected) => ordered(expected, Ordering::is_lt),
        Operator::Lte(expected) => ordered(expected, Ordering::is_le),
        Operator::Gt(expected) => ordered(expected, Ordering::is_gt),
        Operator::Gte(expected) => ordered(expected, Ordering::is_ge),
        Operator::Exists(wanted) => actual.is_some() == *wanted,
    }
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(value) => compare(value, expected) == Some(Ordering::Equal),
    }
}

/// Orders scalars of the same kind; numbers compare by value regardless of representation.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

const fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn sort_order(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    let field_order = |key: &SortKey| {
        let x = a.get(&key.field).unwrap_or(&Value::Null);
        let y = b.get(&key.field).unwrap_or(&Value::Null);
        let order = compare(x, y).unwrap_or_else(|| kind_rank(x).cmp(&kind_rank(y)));
        if key.descending { order.reverse() } else { order }
    };

    keys.iter()
        .map(&field_order)
        .find(|order| order.is_ne())
        // `id` breaks ties so pages never overlap.
        .unwrap_or_else(|| field_order(&SortKey::asc(DEFAULT_SORT_FIELD)))
}

/// Filters, sorts and paginates already-visible rows.
pub(crate) fn select<'a, T, I>(rows: I, condition: &Condition) -> Result<Vec<T>, DatabaseError>
where
    T: Record + 'a,
    I: IntoIterator<Item = &'a T>,
{
    validate_fields::<T>(condition)?;

    let mut hits = Vec::new();
    for row in rows {
        let doc = serde_json::to_value(row)?;
        if matches(&doc, condition) {
            hits.push((doc, row));
        }
    }

    let (start, limit, keys) = match &condition.page {
        Some(page) => (page.start, page.limit, page.sort.as_slice()),
        None => (0, None, &[][..]),
    };
    hits.sort_by(|(a, _), (b, _)| sort_order(a, b, keys));

    let start = usize::try_from(start).unwrap_or(usize::MAX);
    let limit = limit.map_or(usize::MAX, |l| l as usize);
    Ok(hits.into_iter().skip(start).take(limit).map(|(_, row)| row.clone()).collect())
}
