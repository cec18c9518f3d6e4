use crate::ClassificationError;
use async_trait::async_trait;
use std::fmt::Debug;
use topo_database::{Database, DatabaseError, Rows};
use topo_domain::constants::INNER_KIND;
use topo_domain::models::{
    Classification, ClassificationPatch, Condition, FieldConstraint, ObjectSummary, ScopeTag,
};

/// Storage of classifications and read access to the objects attached to them.
///
/// Each method is atomic with respect to the others.
#[async_trait]
pub trait ClassificationStore: Debug + Send + Sync {
    /// Stores `classification` under a fresh id.
    ///
    /// Rejects a `classificationId` already in use anywhere and a `name` already in use
    /// among the classifications visible under its scope.
    async fn insert(&self, classification: Classification) -> Result<Classification, ClassificationError>;

    async fn select(
        &self,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Vec<Classification>, ClassificationError>;

    /// Applies `patch` to the entity `id` if it also satisfies `condition`.
    async fn update(
        &self,
        id: i64,
        patch: &ClassificationPatch,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Classification, ClassificationError>;

    /// Removes the entity `id` if it also satisfies `condition`, is not built in and owns
    /// no objects.
    async fn delete(
        &self,
        id: i64,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Classification, ClassificationError>;

    /// Objects attached to any of `classification_ids`, visible under `scope`.
    async fn objects(
        &self,
        classification_ids: &[String],
        scope: Option<&ScopeTag>,
    ) -> Result<Vec<ObjectSummary>, ClassificationError>;
}

/// The entity `id`, provided it also matches `condition` and is visible under `scope`.
fn target(
    rows: &Rows<Classification>,
    id: i64,
    condition: &Condition,
    scope: Option<&ScopeTag>,
) -> Result<Option<Classification>, DatabaseError> {
    let scoped = condition.without_page().and(FieldConstraint::equals("id", id));
    Ok(rows.select(&scoped, scope)?.into_iter().next())
}

fn name_taken(
    rows: &Rows<Classification>,
    name: &str,
    scope: Option<&ScopeTag>,
    except: Option<i64>,
) -> bool {
    rows.visible(scope).any(|c| c.name == name && Some(c.id) != except)
}

#[async_trait]
impl ClassificationStore for Database {
    async fn insert(&self, classification: Classification) -> Result<Classification, ClassificationError> {
        self.classifications.write(|rows| {
            if rows.iter().any(|c| c.classification_id == classification.classification_id) {
                return Ok(Err(ClassificationError::invalid(format!(
                    "classificationId '{}' already exists",
                    classification.classification_id
                ))));
            }
            if name_taken(rows, &classification.name, classification.metadata.as_ref(), None) {
                return Ok(Err(ClassificationError::invalid(format!(
                    "name '{}' already exists",
                    classification.name
                ))));
            }
            Ok(Ok(rows.insert(classification)))
        })?
    }

    async fn select(
        &self,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Vec<Classification>, ClassificationError> {
        Ok(self.classifications.read(|rows| rows.select(condition, scope))?)
    }

    async fn update(
        &self,
        id: i64,
        patch: &ClassificationPatch,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Classification, ClassificationError> {
        self.classifications.write(|rows| {
            let Some(current) = target(rows, id, condition, scope)? else {
                return Ok(Err(ClassificationError::not_found(id)));
            };
            if let Some(name) = &patch.name
                && name_taken(rows, name, current.metadata.as_ref(), Some(id))
            {
                return Ok(Err(ClassificationError::invalid(format!("name '{name}' already exists"))));
            }

            let mut updated = current;
            updated.apply(patch);
            if let Some(slot) = rows.get_mut(id) {
                slot.clone_from(&updated);
            }
            Ok(Ok(updated))
        })?
    }

    async fn delete(
        &self,
        id: i64,
        condition: &Condition,
        scope: Option<&ScopeTag>,
    ) -> Result<Classification, ClassificationError> {
        self.classifications.write(|rows| {
            let Some(current) = target(rows, id, condition, scope)? else {
                return Ok(Err(ClassificationError::not_found(id)));
            };
            if current.kind == INNER_KIND {
                return Ok(Err(ClassificationError::invalid(format!(
                    "built-in classification '{}' cannot be deleted",
                    current.classification_id
                ))));
            }
            let key = current.classification_id.clone();
            let owned = self.objects.read(|objects| {
                Ok(objects.iter().filter(|o| o.classification_id == key).count())
            })?;
            if owned > 0 {
                return Ok(Err(ClassificationError::invalid(format!(
                    "classification '{key}' still owns {owned} object(s)"
                ))));
            }

            Ok(rows.remove(id).ok_or_else(|| ClassificationError::not_found(id)))
        })?
    }

    async fn objects(
        &self,
        classification_ids: &[String],
        scope: Option<&ScopeTag>,
    ) -> Result<Vec<ObjectSummary>, ClassificationError> {
        Ok(self.objects.read(|rows| {
            Ok(rows
                .visible(scope)
                .filter(|o| classification_ids.contains(&o.classification_id))
                .cloned()
                .collect())
        })?)
    }
}
