use super::ScopeTag;
use serde::{Deserialize, Serialize};

/// A grouping record that model objects are attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Assigned by storage, immutable.
    pub id: i64,
    /// Unique string key, immutable after creation.
    pub classification_id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    /// `inner` for built-ins, empty otherwise.
    #[serde(default)]
    pub kind: String,
    /// Display order of the group.
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ScopeTag>,
}

impl Classification {
    #[must_use]
    pub fn from_attrs(id: i64, attrs: ClassificationAttrs, metadata: Option<ScopeTag>) -> Self {
        Self {
            id,
            classification_id: attrs.classification_id,
            name: attrs.name,
            icon: attrs.icon,
            kind: attrs.kind,
            order: attrs.order,
            metadata,
        }
    }

    /// Applies the updatable subset; identity and scope stay untouched.
    pub fn apply(&mut self, patch: &ClassificationPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(icon) = &patch.icon {
            self.icon.clone_from(icon);
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

/// Attributes accepted on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClassificationAttrs {
    pub classification_id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub order: i64,
}

/// Attributes accepted on update. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClassificationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// A model object definition attached to a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub id: i64,
    pub object_id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub classification_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ScopeTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClassificationWithObjects {
    #[serde(flatten)]
    pub classification: Classification,
    pub objects: Vec<ObjectSummary>,
}
