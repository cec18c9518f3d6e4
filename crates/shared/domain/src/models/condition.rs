use serde_json::Value;

/// A typed query descriptor: field constraints (all must hold) plus optional pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    pub constraints: Vec<FieldConstraint>,
    pub page: Option<Page>,
}

impl Condition {
    /// Matches exactly one identity.
    #[must_use]
    pub fn by_id(id: i64) -> Self {
        Self::default().and(FieldConstraint::equals("id", id))
    }

    #[must_use]
    pub fn and(mut self, constraint: FieldConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// The same constraints without pagination, for identity-scoped mutations.
    #[must_use]
    pub fn without_page(&self) -> Self {
        Self { constraints: self.constraints.clone(), page: None }
    }
}

/// All operators of one field; they are combined with logical AND.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConstraint {
    pub field: String,
    pub operators: Vec<Operator>,
}

impl FieldConstraint {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), operators: vec![Operator::Eq(value.into())] }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Exists(bool),
}

/// Offset pagination with an ordered sort key list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub start: u64,
    /// `None` returns everything after `start`.
    pub limit: Option<u32>,
    pub sort: Vec<SortKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: false }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: true }
    }
}
