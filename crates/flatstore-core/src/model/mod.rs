pub mod access;
pub mod record;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use access::{AccessMatrix, AccessRights, Action, Audience, EntityMeta, Identity, ROLE_ADMIN};
pub use record::{
    is_hidden_field, is_reserved_field, Record, FIELD_CREATED_AT, FIELD_ID, FIELD_OWNER,
    FIELD_UPDATED_AT, HIDDEN_PREFIX,
};

use crate::schema::EntitySchema;

/// Records of one entity keyed by id
pub type Collection = BTreeMap<String, Record>;

/// Every entity's collection keyed by entity name
pub type Models = BTreeMap<String, Collection>;

/// Everything the store knows about one entity besides its records
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    pub name: String,
    pub schema: Arc<EntitySchema>,
    pub access: AccessMatrix,
    pub meta: EntityMeta,
}
