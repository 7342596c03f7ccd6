//! Generic keyed repository over one entity's collection
//!
//! A [`Repository`] borrows the collection mutably for its lifetime and
//! routes every operation through [`RepositoryHooks`]. The mutation
//! pipeline and durable persistence attach there; the repository itself
//! knows nothing about schemas or storage media.

pub mod hooks;
pub mod matching;
pub mod paging;

use std::cmp::Ordering;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::errors::{FlatstoreError, Result};
use crate::query::values::to_js_string;
use crate::uid::model_uid;
use crate::{log_op_end, log_op_error, log_op_start};

pub use crate::model::Collection;
use crate::model::{Record, FIELD_ID};
pub use hooks::{DurableWriter, HookContext, NoHooks, NullWriter, RepositoryHooks, WriteAction};
pub use matching::{by_created_at, is_match, stable_sort_by};
pub use paging::{Page, PageMeta, Paging};

pub type Comparator = fn(&Record, &Record) -> Ordering;

/// How `find_one` / `count` pick records
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Id(String),
    /// Partial deep match on fields
    Match(Map<String, Value>),
}

impl Lookup {
    /// Strings and numbers are ids; an object with only `id` is an id
    /// lookup; any other object is a field match (its `id`, if present, is
    /// compared as a string).
    ///
    /// # Errors
    ///
    /// Returns `InvalidWhere` for null, booleans and lists.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Lookup::Id(s)),
            Value::Number(n) => Ok(Lookup::Id(to_js_string(&Value::Number(n)))),
            Value::Object(mut obj) => {
                if let Some(id) = obj.get(FIELD_ID) {
                    let id = to_js_string(id);
                    if obj.len() == 1 {
                        return Ok(Lookup::Id(id));
                    }
                    obj.insert(FIELD_ID.to_string(), Value::String(id));
                }
                Ok(Lookup::Match(obj))
            }
            other => Err(FlatstoreError::InvalidWhere {
                reason: format!("cannot look up a record by {}", other),
            }),
        }
    }
}

impl From<&str> for Lookup {
    fn from(id: &str) -> Self {
        Lookup::Id(id.to_string())
    }
}

impl From<String> for Lookup {
    fn from(id: String) -> Self {
        Lookup::Id(id)
    }
}

/// Listing filter for `find_all` and `count`
pub enum Filter<'f> {
    All,
    Match(&'f Map<String, Value>),
    Predicate(&'f dyn Fn(&Record) -> bool),
}

impl Filter<'_> {
    fn accepts(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Match(pattern) => is_match(record, pattern),
            Filter::Predicate(f) => f(record),
        }
    }
}

/// Keyed in-memory collection bound to one entity
pub struct Repository<'s, H: RepositoryHooks = NoHooks> {
    entity: String,
    storage: &'s mut Collection,
    hooks: H,
    comparator: Comparator,
}

impl<'s> Repository<'s, NoHooks> {
    /// Repository without hooks
    pub fn plain(entity: impl Into<String>, storage: &'s mut Collection) -> Self {
        Self::new(entity, storage, NoHooks)
    }
}

impl<'s, H: RepositoryHooks> Repository<'s, H> {
    pub fn new(entity: impl Into<String>, storage: &'s mut Collection, hooks: H) -> Self {
        Self {
            entity: entity.into(),
            storage,
            hooks,
            comparator: by_created_at,
        }
    }

    /// Replace the default `_created_at` listing order
    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    fn ctx(&self) -> HookContext<'_> {
        HookContext {
            entity: &self.entity,
            storage: &*self.storage,
        }
    }

    fn not_found(&self, id: &str) -> FlatstoreError {
        FlatstoreError::RecordNotFound {
            entity: self.entity.clone(),
            id: id.to_string(),
        }
    }

    fn require_id(&self, record: &Record) -> Result<String> {
        record
            .id()
            .filter(|id| !id.is_empty())
            .map(String::from)
            .ok_or_else(|| FlatstoreError::MissingId {
                entity: self.entity.clone(),
            })
    }

    pub fn exists(&self, id: &str) -> bool {
        self.storage.contains_key(id)
    }

    pub fn count(&self, filter: &Filter<'_>) -> usize {
        match filter {
            Filter::All => self.storage.len(),
            _ => self.storage.values().filter(|r| filter.accepts(r)).count(),
        }
    }

    /// Find one record by id or field match, passed through `pre_read`
    ///
    /// # Errors
    ///
    /// With `assert`, returns `RecordNotFound` when nothing matches.
    /// Propagates `pre_read` errors.
    pub fn find_one(&self, lookup: impl Into<Lookup>, assert: bool) -> Result<Option<Record>> {
        let lookup = lookup.into();
        let found = match &lookup {
            Lookup::Id(id) => self.storage.get(id),
            Lookup::Match(pattern) => self.sorted_values().into_iter().find(|r| is_match(r, pattern)),
        };
        match found {
            Some(record) => Ok(Some(self.hooks.pre_read(record.clone(), &self.ctx())?)),
            None if assert => Err(self.not_found(&match lookup {
                Lookup::Id(id) => id,
                Lookup::Match(pattern) => Value::Object(pattern).to_string(),
            })),
            None => Ok(None),
        }
    }

    fn sorted_values(&self) -> Vec<&Record> {
        let cmp = self.comparator;
        stable_sort_by(self.storage.values().collect(), &|a: &&Record, b: &&Record| cmp(a, b))
    }

    /// Matching records in listing order, paged, each passed through `pre_read`
    ///
    /// # Errors
    ///
    /// Propagates `pre_read` errors.
    pub fn find_all(&self, filter: &Filter<'_>, paging: Paging) -> Result<Page> {
        let matching: Vec<&Record> = self
            .sorted_values()
            .into_iter()
            .filter(|r| filter.accepts(r))
            .collect();
        let total = matching.len();
        let ctx = self.ctx();
        let rows = paging
            .apply(matching)
            .into_iter()
            .map(|r| self.hooks.pre_read(r.clone(), &ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            rows,
            meta: PageMeta {
                total,
                limit: paging.limit,
                offset: paging.offset,
            },
        })
    }

    /// Add a new record
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` when the id (as given, or as rewritten by
    /// `pre_create`) already exists, `MissingId` when no id is left after
    /// `pre_create`, and propagates hook errors.
    pub fn insert(&mut self, record: Record) -> Result<Record> {
        self.logged("insert", record.id().map(String::from), |repo| {
            repo.insert_inner(record)
        })
    }

    fn insert_inner(&mut self, record: Record) -> Result<Record> {
        self.assert_not_exists(&record)?;
        let record = self.hooks.pre_create(record, &self.ctx())?;
        let id = self.require_id(&record)?;
        self.assert_not_exists(&record)?;
        self.hooks.write(&record, WriteAction::Create, &self.ctx())?;
        self.storage.insert(id, record.clone());
        Ok(record)
    }

    /// Shallow-merge `patch` over the stored record with the same id
    ///
    /// # Errors
    ///
    /// Returns `MissingId` / `RecordNotFound` for an absent id and
    /// propagates hook errors.
    pub fn update(&mut self, patch: Record) -> Result<Record> {
        self.logged("update", patch.id().map(String::from), |repo| {
            repo.update_inner(patch)
        })
    }

    fn update_inner(&mut self, patch: Record) -> Result<Record> {
        let id = self.require_id(&patch)?;
        let mut record = self
            .storage
            .get(&id)
            .cloned()
            .ok_or_else(|| self.not_found(&id))?;
        record.merge(patch);
        let record = self.hooks.pre_update(record, &self.ctx())?;
        let new_id = self.require_id(&record)?;
        if new_id != id {
            return Err(FlatstoreError::Internal {
                message: format!("pre_update changed id {} to {}", id, new_id),
            });
        }
        self.hooks.write(&record, WriteAction::Update, &self.ctx())?;
        self.storage.insert(id, record.clone());
        Ok(record)
    }

    /// Update when the id exists, insert otherwise
    ///
    /// # Errors
    ///
    /// See [`Repository::insert`] and [`Repository::update`].
    pub fn save(&mut self, record: Record) -> Result<Record> {
        match record.id() {
            Some(id) if self.exists(id) => self.update(record),
            _ => self.insert(record),
        }
    }

    /// Remove a record, returning it as it was stored
    ///
    /// The in-memory copy is removed only after `pre_delete` and the writer
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` for an unknown id and propagates hook errors.
    pub fn delete(&mut self, id: &str) -> Result<Record> {
        self.logged("delete", Some(id.to_string()), |repo| repo.delete_inner(id))
    }

    fn delete_inner(&mut self, id: &str) -> Result<Record> {
        let record = self
            .find_one(id, true)?
            .ok_or_else(|| self.not_found(id))?;
        self.hooks.pre_delete(&record, &self.ctx())?;
        self.hooks.write(&record, WriteAction::Delete, &self.ctx())?;
        self.storage.remove(id);
        Ok(record)
    }

    fn assert_not_exists(&self, record: &Record) -> Result<()> {
        match record.id() {
            Some(id) if self.exists(id) => Err(FlatstoreError::DuplicateId {
                entity: self.entity.clone(),
                id: id.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn logged<T>(
        &mut self,
        op: &'static str,
        record_id: Option<String>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let record_id = record_id.unwrap_or_default();
        log_op_start!(op, entity = self.entity.as_str(), record_id = record_id.as_str());
        let result = f(self);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => log_op_end!(
                op,
                duration_ms = duration_ms,
                entity = self.entity.as_str(),
                record_id = record_id.as_str()
            ),
            Err(e) => log_op_error!(
                op,
                e,
                duration_ms = duration_ms,
                entity = self.entity.as_str(),
                record_id = record_id.as_str()
            ),
        }
        result
    }
}

/// Give `record` a fresh model uid; with `force == false` an existing
/// non-empty id is kept
pub fn with_id(mut record: Record, force: bool) -> Record {
    let has_id = record.id().map(|id| !id.is_empty()).unwrap_or(false);
    if force || !has_id {
        record.set_id(model_uid());
    }
    record
}
