mod audit;
mod classification;
mod condition;
mod scope;

pub use audit::{AuditAction, AuditRecord};
pub use classification::{
    Classification, ClassificationAttrs, ClassificationPatch, ClassificationWithObjects,
    ObjectSummary,
};
pub use condition::{Condition, FieldConstraint, Operator, Page, SortKey};
pub use scope::ScopeTag;
