use crate::{ClassificationError, ClassificationStore};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use topo_audit::SnapshotSource;
use topo_domain::models::{
    Classification, ClassificationAttrs, ClassificationPatch, ClassificationWithObjects, Condition,
    ScopeTag,
};
use tracing::{debug, instrument};

const MAX_ID_LEN: usize = 32;
const MAX_NAME_LEN: usize = 64;

/// Sole owner of classification storage.
#[derive(Debug, Clone)]
pub struct ClassificationRepository {
    store: Arc<dyn ClassificationStore>,
}

impl ClassificationRepository {
    pub fn new(store: Arc<dyn ClassificationStore>) -> Self {
        Self { store }
    }

    /// # Errors
    /// [`ClassificationError::InvalidInput`] for invalid attributes or a duplicate
    /// `classificationId`/`name`.
    #[instrument(skip(self, attrs), fields(key = %attrs.classification_id))]
    pub async fn create(
        &self,
        attrs: ClassificationAttrs,
        scope: Option<ScopeTag>,
    ) -> Result<Classification, ClassificationError> {
        validate(&attrs)?;
        let created = self.store.insert(Classification::from_attrs(0, attrs, scope)).await?;
        debug!(id = created.id, "Classification created");
        Ok(created)
    }

    /// Matches are sorted by the condition's sort keys (by `id` when there are none),
    /// then windowed by `start`/`limit`.
    pub async fn find(
        &self,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Vec<Classification>, ClassificationError> {
        self.store.select(condition, scope).await
    }

    /// [`Self::find`] with the visible objects of every match attached.
    pub async fn find_with_related(
        &self,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Vec<ClassificationWithObjects>, ClassificationError> {
        let classifications = self.find(condition, scope).await?;
        let keys: Vec<String> =
            classifications.iter().map(|c| c.classification_id.clone()).collect();
        let objects = self.store.objects(&keys, scope).await?;

        Ok(classifications
            .into_iter()
            .map(|classification| ClassificationWithObjects {
                objects: objects
                    .iter()
                    .filter(|o| o.classification_id == classification.classification_id)
                    .cloned()
                    .collect(),
                classification,
            })
            .collect())
    }

    /// # Errors
    /// [`ClassificationError::NotFound`] when absent or not visible under `scope`.
    pub async fn get(&self, id: i64, scope: Option<&ScopeTag>) -> Result<Classification, ClassificationError> {
        self.store
            .select(&Condition::by_id(id), scope)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClassificationError::not_found(id))
    }

    /// # Errors
    /// * [`ClassificationError::NotFound`] when `id` does not match `condition` under `scope`.
    /// * [`ClassificationError::InvalidInput`] for an invalid or duplicate name.
    #[instrument(skip(self, patch, condition))]
    pub async fn update(
        &self,
        id: i64,
        patch: &ClassificationPatch,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Classification, ClassificationError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        self.store.update(id, patch, condition, scope).await
    }

    /// # Errors
    /// * [`ClassificationError::NotFound`] when `id` does not match `condition` under `scope`.
    /// * [`ClassificationError::InvalidInput`] for built-in classifications and those
    ///   still owning objects.
    #[instrument(skip(self, condition))]
    pub async fn delete(
        &self,
        id: i64,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Classification, ClassificationError> {
        self.store.delete(id, condition, scope).await
    }
}

#[async_trait]
impl SnapshotSource for ClassificationRepository {
    type Error = ClassificationError;

    async fn snapshot(
        &self,
        resource_id: i64,
        scope: Option<&ScopeTag>,
    ) -> Result<Option<Value>, ClassificationError> {
        match self.get(resource_id, scope).await {
            Ok(classification) => Ok(Some(serde_json::to_value(classification)?)),
            Err(ClassificationError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn validate(attrs: &ClassificationAttrs) -> Result<(), ClassificationError> {
    let key = attrs.classification_id.as_str();
    if key.is_empty() || key.len() > MAX_ID_LEN {
        return Err(ClassificationError::invalid(format!(
            "classificationId must be 1 to {MAX_ID_LEN} characters"
        )));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(ClassificationError::invalid(format!(
            "classificationId '{key}' may only contain letters, digits, '_' and '-'"
        )));
    }
    validate_name(&attrs.name)
}

fn validate_name(name: &str) -> Result<(), ClassificationError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(ClassificationError::invalid(format!("name must be 1 to {MAX_NAME_LEN} characters")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(key: &str, name: &str) -> ClassificationAttrs {
        ClassificationAttrs {
            classification_id: key.to_owned(),
            name: name.to_owned(),
            ..ClassificationAttrs::default()
        }
    }

    #[test]
    fn attribute_validation() {
        assert!(validate(&attrs("bk_host", "Host")).is_ok());
        assert!(validate(&attrs("", "Host")).is_err());
        assert!(validate(&attrs("bk host", "Host")).is_err());
        assert!(validate(&attrs(&"x".repeat(MAX_ID_LEN + 1), "Host")).is_err());
        assert!(validate(&attrs("bk_host", "   ")).is_err());
        assert!(validate(&attrs("bk_host", &"n".repeat(MAX_NAME_LEN + 1))).is_err());
    }
}
