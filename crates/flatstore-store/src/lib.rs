//! Flatstore Store - filesystem side of the document store
//!
//! Provides:
//! - The store loader: data directory walk and store build
//! - Atomic per-record JSON files as the durable writer
//! - CRUD repositories wiring the mutation pipeline, identity and writer
//! - The project registry with whole-store refresh

pub mod crud;
pub mod disk;
pub mod errors;
pub mod loader;
pub mod registry;

// Re-export key types
pub use crud::{factory_repository, CrudHooks};
pub use disk::FsWriter;
pub use errors::Result;
pub use loader::{build, load, load_store, RawData};
pub use registry::{normalize_project_id, ProjectConfig, ProjectRegistry, StoreHandle};
