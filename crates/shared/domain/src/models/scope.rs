use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque tenant tag stored in an entity's `metadata`.
///
/// An unscoped query observes only unscoped entities; a query under scope `A`
/// observes unscoped entities and those tagged `A`, never those tagged `B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(try_from = "String", into = "String")]
pub struct ScopeTag(String);

impl ScopeTag {
    /// Returns `None` for blank tags.
    pub fn new(tag: impl Into<String>) -> Option<Self> {
        let tag = tag.into();
        if tag.trim().is_empty() { None } else { Some(Self(tag)) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an entity tagged `entity` is visible to a query under `query`.
    #[must_use]
    pub fn is_visible(entity: Option<&Self>, query: Option<&Self>) -> bool {
        match (entity, query) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(entity), Some(query)) => entity == query,
        }
    }
}

impl TryFrom<String> for ScopeTag {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("scope tag must not be blank")
    }
}

impl From<ScopeTag> for String {
    fn from(tag: ScopeTag) -> Self {
        tag.0
    }
}

impl fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
