//! Cross-entity queries over a store's models
//!
//! Everything here is read-only and synchronous over an already-built
//! snapshot.

pub mod find;
pub mod include;
pub mod order;
pub mod values;
pub mod where_clause;

pub use find::{count_where, find_where};
pub use include::{
    pick_included_deep, IncludeOptions, IncludedRecord, SelectionResults, SELECTION_ENTITY,
};
pub use order::{Direction, OrderBy};
pub use where_clause::{substitute_params, WhereClause};
