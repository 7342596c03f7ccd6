use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::{FlatstoreError, Result};
use crate::model::{
    AccessMatrix, Action, Audience, Collection, EntityDefinition, EntityMeta, Identity, Models,
    Record,
};
use crate::query::{
    find_where, pick_included_deep, IncludeOptions, IncludedRecord, SelectionResults, WhereClause,
};
use crate::repository::{NoHooks, Repository};
use crate::schema::{build_external_schema, EntitySchema};

/// Title of the combined external schema document
pub const EXTERNAL_SCHEMA_TITLE: &str = "flatstore";

/// In-memory snapshot of one project: schemas, access rules, meta and records
///
/// Built in one go by the loader and replaced wholesale on refresh. The only
/// in-place changes go through a [`Repository`] over one of its collections.
/// Not thread-safe on its own; share it behind a lock.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub(crate) schemas: BTreeMap<String, Arc<EntitySchema>>,
    pub(crate) access: BTreeMap<String, AccessMatrix>,
    pub(crate) meta: BTreeMap<String, EntityMeta>,
    pub(crate) models: Models,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity with its admitted records
    ///
    /// Replaces any previous definition of the same name.
    pub fn insert_entity(&mut self, definition: EntityDefinition, records: Collection) {
        let EntityDefinition {
            name,
            schema,
            access,
            meta,
        } = definition;
        self.schemas.insert(name.clone(), schema);
        self.access.insert(name.clone(), access);
        self.meta.insert(name.clone(), meta);
        self.models.insert(name, records);
    }

    /// Entity names in sorted order
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn contains_entity(&self, entity: &str) -> bool {
        self.schemas.contains_key(entity)
    }

    fn entity_not_found(entity: &str) -> FlatstoreError {
        FlatstoreError::EntityNotFound {
            entity: entity.to_string(),
        }
    }

    /// Compiled schema of `entity`
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not configured.
    pub fn schema(&self, entity: &str) -> Result<&Arc<EntitySchema>> {
        self.schemas
            .get(entity)
            .ok_or_else(|| Self::entity_not_found(entity))
    }

    /// Access matrix of `entity`; unknown entities grant nothing
    pub fn access(&self, entity: &str) -> AccessMatrix {
        self.access.get(entity).copied().unwrap_or_default()
    }

    pub fn meta(&self, entity: &str) -> Option<&EntityMeta> {
        self.meta.get(entity)
    }

    /// Everything known about `entity` except its records
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not configured.
    pub fn definition(&self, entity: &str) -> Result<EntityDefinition> {
        Ok(EntityDefinition {
            name: entity.to_string(),
            schema: Arc::clone(self.schema(entity)?),
            access: self.access(entity),
            meta: self.meta(entity).cloned().unwrap_or_default(),
        })
    }

    pub fn models(&self) -> &Models {
        &self.models
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not configured.
    pub fn collection(&self, entity: &str) -> Result<&Collection> {
        self.models
            .get(entity)
            .ok_or_else(|| Self::entity_not_found(entity))
    }

    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not configured.
    pub fn collection_mut(&mut self, entity: &str) -> Result<&mut Collection> {
        self.models
            .get_mut(entity)
            .ok_or_else(|| Self::entity_not_found(entity))
    }

    /// Total number of records across all entities
    pub fn record_count(&self) -> usize {
        self.models.values().map(Collection::len).sum()
    }

    /// Plain in-memory repository over one entity (no pipeline, no writer)
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not configured.
    pub fn repository(&mut self, entity: &str) -> Result<Repository<'_, NoHooks>> {
        let storage = self.collection_mut(entity)?;
        Ok(Repository::plain(entity, storage))
    }

    /// Whether `audience` may perform `action` on `entity`
    ///
    /// Public grants count for everyone; authenticated callers never have
    /// less than the public.
    pub fn has_access(&self, entity: &str, audience: Audience, action: Action) -> bool {
        self.access
            .get(entity)
            .map(|m| m.allows(audience, action))
            .unwrap_or(false)
    }

    /// Check the caller against the access matrix; admins pass unconditionally
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when the matrix does not grant `action`.
    pub fn assert_access(
        &self,
        entity: &str,
        identity: Option<&Identity>,
        action: Action,
    ) -> Result<()> {
        if identity.map(Identity::is_admin).unwrap_or(false) {
            return Ok(());
        }
        if self.has_access(entity, Audience::of(identity), action) {
            return Ok(());
        }
        Err(FlatstoreError::Forbidden {
            entity: entity.to_string(),
            action: action.to_string(),
        })
    }

    /// Combined schema document over every entity
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if an entity schema lacks its `$id`.
    pub fn external_schema(&self, hide_internal: bool) -> Result<Value> {
        build_external_schema(
            self.schemas.values().map(Arc::as_ref),
            hide_internal,
            EXTERNAL_SCHEMA_TITLE,
        )
    }

    /// See [`find_where`]
    pub fn find_where(
        &self,
        entity: &str,
        where_clause: &WhereClause,
        order_by: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Vec<&Record> {
        find_where(&self.models, entity, where_clause, order_by, limit, offset)
    }

    /// See [`pick_included_deep`]
    ///
    /// # Errors
    ///
    /// Propagates where-clause and limit errors of selection records.
    pub fn include(
        &self,
        root: &Record,
        selections: Option<&mut SelectionResults>,
        options: &IncludeOptions,
    ) -> Result<BTreeMap<String, IncludedRecord<'_>>> {
        pick_included_deep(root, &self.models, selections, options)
    }

    /// Per-entity record counts, for reporting
    pub fn summary(&self) -> Map<String, Value> {
        self.models
            .iter()
            .map(|(name, c)| (name.clone(), Value::from(c.len())))
            .collect()
    }
}
