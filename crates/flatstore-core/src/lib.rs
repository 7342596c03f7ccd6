//! Flatstore Core - in-memory kernel of the flat-file document store
//!
//! This crate provides everything that operates on an already-loaded store:
//! - Record and entity models (open attribute maps with reserved fields)
//! - Schema compilation, validation and the combined external schema
//! - The mutation pipeline (allow-list, defaults, transforms, uniqueness)
//! - A generic hook-driven repository over one entity collection
//! - Cross-entity where/order/limit queries and reference inclusion
//! - The store snapshot with access checks, projections and bulk export
//!
//! Filesystem loading and durable writes live in `flatstore-store`.

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod pipeline;
pub mod query;
pub mod repository;
pub mod schema;
pub mod uid;

pub use flatstore_core_types::schema as log_schema;
#[doc(hidden)]
pub use tracing as __tracing;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, FlatstoreError, PublicError, Result, ValidationIssue};
pub use model::{AccessMatrix, Action, Audience, EntityMeta, Identity, Record};
pub use ops::{dump, output_collection, output_record, strip_client_reserved, DumpFilter, Store};
pub use pipeline::{Pipeline, Step};
pub use query::{find_where, pick_included_deep, IncludeOptions, IncludedRecord, WhereClause};
pub use repository::{
    Collection, DurableWriter, NoHooks, Page, Paging, Repository, RepositoryHooks, WriteAction,
};
pub use schema::EntitySchema;
