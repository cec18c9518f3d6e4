//! Parsing of raw filter bodies into [`Condition`]s.

use serde_json::{Map, Value};
use std::borrow::Cow;
use topo_domain::constants::{MAX_PAGE_LIMIT, PAGE_KEY};
use topo_domain::models::{Condition, FieldConstraint, Operator, Page, SortKey};

#[topo_derive::topo_error]
pub enum ConditionError {
    #[error("Malformed filter{}: {message}", format_context(.context))]
    Malformed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn malformed(message: impl Into<Cow<'static, str>>) -> ConditionError {
    ConditionError::Malformed { message: message.into(), context: None }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionBuilder;

impl ConditionBuilder {
    /// Splits `raw` into pagination and field constraints.
    ///
    /// The reserved `page` key is removed first, so a field named `page` can never be
    /// filtered on. Every other key becomes one constraint: a bare value means equality,
    /// an object of `$`-operators applies each of them.
    ///
    /// # Errors
    /// [`ConditionError::Malformed`] for an invalid page block, unknown or ill-typed
    /// operators, empty operator objects or blank field names.
    pub fn parse(mut raw: Map<String, Value>) -> Result<Condition, ConditionError> {
        let page = raw.remove(PAGE_KEY).map(parse_page).transpose().context(PAGE_KEY)?;

        let constraints = raw
            .into_iter()
            .map(|(field, value)| {
                let context = field.clone();
                parse_constraint(field, value).context(context)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Condition { constraints, page })
    }
}

fn parse_page(value: Value) -> Result<Page, ConditionError> {
    let Value::Object(fields) = value else {
        return Err(malformed("page must be an object"));
    };

    let mut page = Page::default();
    for (key, value) in fields {
        match key.as_str() {
            "start" => {
                page.start = value.as_u64().ok_or_else(|| malformed("start must be >= 0"))?;
            }
            "limit" => {
                let limit = value
                    .as_u64()
                    .and_then(|l| u32::try_from(l).ok())
                    .filter(|l| (1..=MAX_PAGE_LIMIT).contains(l))
                    .ok_or_else(|| {
                        malformed(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"))
                    })?;
                page.limit = Some(limit);
            }
            "sort" => {
                let sort = value.as_str().ok_or_else(|| malformed("sort must be a string"))?;
                page.sort = parse_sort(sort)?;
            }
            other => return Err(malformed(format!("unknown page key '{other}'"))),
        }
    }
    Ok(page)
}

/// `"order,-name"` sorts by `order` ascending, then `name` descending.
fn parse_sort(sort: &str) -> Result<Vec<SortKey>, ConditionError> {
    if sort.trim().is_empty() {
        return Ok(Vec::new());
    }

    sort.split(',')
        .map(|segment| {
            let segment = segment.trim();
            let (field, descending) = segment
                .strip_prefix('-')
                .map_or((segment, false), |field| (field.trim(), true));
            if field.is_empty() {
                return Err(malformed(format!("empty sort segment in '{sort}'")));
            }
            Ok(SortKey { field: field.to_owned(), descending })
        })
        .collect()
}

fn parse_constraint(field: String, value: Value) -> Result<FieldConstraint, ConditionError> {
    if field.trim().is_empty() || field.starts_with('$') {
        return Err(malformed(format!("invalid field name '{field}'")));
    }

    let operators = match value {
        Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) || ops.is_empty() => {
            if ops.is_empty() {
                return Err(malformed("empty operator object"));
            }
            ops.into_iter().map(|(name, operand)| parse_operator(&name, operand)).collect::<Result<_, _>>()?
        }
        literal => vec![Operator::Eq(literal)],
    };

    Ok(FieldConstraint { field, operators })
}

fn parse_operator(name: &str, operand: Value) -> Result<Operator, ConditionError> {
    let scalar = |operand: Value| {
        if operand.is_array() || operand.is_object() || operand.is_null() {
            Err(malformed(format!("{name} expects a number or string")))
        } else {
            Ok(operand)
        }
    };
    let list = |operand: Value| match operand {
        Value::Array(items) => Ok(items),
        _ => Err(malformed(format!("{name} expects an array"))),
    };

    match name {
        "$eq" => Ok(Operator::Eq(operand)),
        "$ne" => Ok(Operator::Ne(operand)),
        "$in" => list(operand).map(Operator::In),
        "$nin" => list(operand).map(Operator::Nin),
        "$lt" => scalar(operand).map(Operator::Lt),
        "$lte" => scalar(operand).map(Operator::Lte),
        "$gt" => scalar(operand).map(Operator::Gt),
        "$gte" => scalar(operand).map(Operator::Gte),
        "$exists" => operand
            .as_bool()
            .map(Operator::Exists)
            .ok_or_else(|| malformed("$exists expects a boolean")),
        other if other.starts_with('$') => Err(malformed(format!("unknown operator '{other}'"))),
        other => Err(malformed(format!("'{other}' mixed with operators"))),
    }
}
