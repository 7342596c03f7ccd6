use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller role that bypasses the access matrix
pub const ROLE_ADMIN: &str = "admin";

/// Operation checked against an entity's access matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    ReadOne,
    ReadAll,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::ReadOne => "read_one",
            Action::ReadAll => "read_all",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is asking: anonymous callers or any signed-in identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Public,
    Authenticated,
}

impl Audience {
    /// Anonymous callers are public; any identity is authenticated
    pub fn of(identity: Option<&Identity>) -> Self {
        match identity {
            Some(_) => Audience::Authenticated,
            None => Audience::Public,
        }
    }
}

/// One row of the access matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessRights {
    pub create: bool,
    pub read_one: bool,
    pub read_all: bool,
    pub update: bool,
    pub delete: bool,
}

impl AccessRights {
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Create => self.create,
            Action::ReadOne => self.read_one,
            Action::ReadAll => self.read_all,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }

    pub fn read_only() -> Self {
        Self {
            read_one: true,
            read_all: true,
            ..Self::default()
        }
    }

    pub fn full() -> Self {
        Self {
            create: true,
            read_one: true,
            read_all: true,
            update: true,
            delete: true,
        }
    }
}

/// Per-entity access configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessMatrix {
    pub public: AccessRights,
    pub authenticated: AccessRights,
}

impl AccessMatrix {
    /// Public grants apply to every audience
    pub fn allows(&self, audience: Audience, action: Action) -> bool {
        if self.public.allows(action) {
            return true;
        }
        match audience {
            Audience::Public => false,
            Audience::Authenticated => self.authenticated.allows(action),
        }
    }
}

/// Identity supplied by the authentication collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub role: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Write-target and display metadata for an entity
///
/// `write_target` names where durable writes go (a directory name for the
/// file writer); everything else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_target: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
