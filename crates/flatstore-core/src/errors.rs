use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result type alias using FlatstoreError
pub type Result<T> = std::result::Result<T, FlatstoreError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code and to the status a transport layer
/// should surface. Kinds are deliberately coarse; the concrete failure lives
/// in [`FlatstoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExErrorKind {
    /// Bad entity name, invalid schema, unknown generator/transform
    Configuration,
    /// Record violates its entity schema, or a value cannot be transformed
    Validation,
    /// Duplicate id or uniqueness violation
    Conflict,
    /// Missing entity or record
    NotFound,
    /// Malformed caller input (paging, where clause, missing id)
    InvalidInput,
    Forbidden,

    Io,
    Serialization,
    Persistence,

    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Validation => "ERR_VALIDATION",
            ExErrorKind::Conflict => "ERR_CONFLICT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Forbidden => "ERR_FORBIDDEN",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// HTTP-like status surfaced at the caller boundary
    pub fn status(&self) -> u16 {
        match self {
            ExErrorKind::InvalidInput => 400,
            ExErrorKind::Forbidden => 403,
            ExErrorKind::NotFound => 404,
            ExErrorKind::Conflict => 409,
            ExErrorKind::Validation => 422,
            ExErrorKind::Configuration
            | ExErrorKind::Io
            | ExErrorKind::Serialization
            | ExErrorKind::Persistence
            | ExErrorKind::Internal => 500,
        }
    }
}

/// Canonical structured error type
///
/// Carries classification plus the internal context (entity, record id,
/// structured details such as validation issues) that never crosses the
/// trust boundary as-is. See [`PublicError`] for the external shape.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    record_id: Option<String>,
    message: String,
    details: Option<Value>,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            record_id: None,
            message: String::new(),
            details: None,
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity name context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add record id context
    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach structured details (e.g. the list of validation issues)
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(id) = &self.record_id {
            write!(f, " (id: {})", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Caller-facing error shape produced at the single translation boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicError {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

impl From<&ExError> for PublicError {
    fn from(err: &ExError) -> Self {
        let message = match err.kind() {
            // Internal failures never leak their message
            ExErrorKind::Configuration
            | ExErrorKind::Io
            | ExErrorKind::Serialization
            | ExErrorKind::Persistence
            | ExErrorKind::Internal => "Internal error".to_string(),
            ExErrorKind::NotFound => "Not found".to_string(),
            ExErrorKind::Forbidden => "Forbidden".to_string(),
            _ if err.message().is_empty() => err.code().to_string(),
            _ => err.message().to_string(),
        };
        Self {
            status: err.kind().status(),
            code: err.code(),
            message,
        }
    }
}

impl From<FlatstoreError> for PublicError {
    fn from(err: FlatstoreError) -> Self {
        PublicError::from(&ExError::from(err))
    }
}

// ========== End Error Facility ==========

/// One violated schema rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// JSON pointer into the validated record (`""` for the root)
    pub instance_path: String,
    /// JSON pointer into the schema, prefixed with `#`
    pub schema_path: String,
    pub keyword: String,
    pub message: String,
    pub params: Value,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.schema_path, self.message, self.params)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error taxonomy for flatstore operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlatstoreError {
    // ===== Configuration Errors =====
    /// Entity directory names must be lower-case
    #[error("Invalid entity name '{entity}' (name must be lowercased)")]
    InvalidEntityName { entity: String },

    /// Schema document could not be compiled
    #[error("Invalid schema for '{entity}': {reason}")]
    InvalidSchema { entity: String, reason: String },

    #[error("Unknown default generator '{name}' for property '{entity}.{field}'")]
    UnknownGenerator {
        entity: String,
        field: String,
        name: String,
    },

    #[error("Unknown transform '{name}' for property '{entity}.{field}'")]
    UnknownTransform {
        entity: String,
        field: String,
        name: String,
    },

    /// Configuration file or record file could not be read or parsed
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    // ===== Validation Errors =====
    #[error("Transform {transform}({value}) failed on field '{field}': {reason}")]
    TransformFailed {
        field: String,
        transform: String,
        value: String,
        reason: String,
    },

    #[error("Invalid record {entity}({id}): {}", join_issues(.issues))]
    ValidationFailed {
        entity: String,
        id: String,
        issues: Vec<ValidationIssue>,
    },

    // ===== Conflict Errors =====
    #[error("Record already exists: {entity}({id})")]
    DuplicateId { entity: String, id: String },

    #[error("Value \"{value}\" for unique property \"{field}\" already exists in {entity}")]
    UniqueViolation {
        entity: String,
        field: String,
        value: String,
    },

    // ===== Not Found Errors =====
    #[error("Record not found: {entity}({id})")]
    RecordNotFound { entity: String, id: String },

    #[error("Entity not found: {entity}")]
    EntityNotFound { entity: String },

    // ===== Input Errors =====
    #[error("Record in '{entity}' must have a string id")]
    MissingId { entity: String },

    #[error("Invalid paging: {reason}")]
    InvalidPaging { reason: String },

    #[error("Invalid where clause: {reason}")]
    InvalidWhere { reason: String },

    #[error("Forbidden: {action} on {entity}")]
    Forbidden { entity: String, action: String },

    // ===== Generic Errors =====
    /// Durable writer failed to persist or remove a record
    #[error("Persistence error in {op}: {message}")]
    Persistence { op: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for FlatstoreError {
    fn from(err: serde_json::Error) -> Self {
        FlatstoreError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from FlatstoreError to ExError
impl From<FlatstoreError> for ExError {
    fn from(err: FlatstoreError) -> Self {
        let message = err.to_string();
        match err {
            FlatstoreError::InvalidEntityName { entity } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("load")
                    .with_entity(entity)
                    .with_message(message)
            }
            FlatstoreError::InvalidSchema { entity, .. } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("compile_schema")
                    .with_entity(entity)
                    .with_message(message)
            }
            FlatstoreError::UnknownGenerator { entity, .. }
            | FlatstoreError::UnknownTransform { entity, .. } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("compile_schema")
                    .with_entity(entity)
                    .with_message(message)
            }
            FlatstoreError::InvalidConfiguration { .. } => {
                ExError::new(ExErrorKind::Configuration).with_message(message)
            }
            FlatstoreError::TransformFailed { field, .. } => {
                ExError::new(ExErrorKind::Validation)
                    .with_op("apply_transforms")
                    .with_message(message)
                    .with_details(serde_json::json!({ "field": field }))
            }
            FlatstoreError::ValidationFailed { entity, id, issues } => {
                let details = serde_json::to_value(&issues).unwrap_or(Value::Null);
                ExError::new(ExErrorKind::Validation)
                    .with_op("validate")
                    .with_entity(entity)
                    .with_record_id(id)
                    .with_message("Record does not match its schema")
                    .with_details(details)
            }
            FlatstoreError::DuplicateId { entity, id } => ExError::new(ExErrorKind::Conflict)
                .with_entity(entity)
                .with_record_id(id)
                .with_message("Record already exists"),
            FlatstoreError::UniqueViolation { entity, .. } => {
                ExError::new(ExErrorKind::Conflict)
                    .with_op("assert_unique")
                    .with_entity(entity)
                    .with_message(message)
            }
            FlatstoreError::RecordNotFound { entity, id } => ExError::new(ExErrorKind::NotFound)
                .with_entity(entity)
                .with_record_id(id)
                .with_message("Record not found"),
            FlatstoreError::EntityNotFound { entity } => ExError::new(ExErrorKind::NotFound)
                .with_entity(entity)
                .with_message("Entity not found"),
            FlatstoreError::MissingId { entity } => ExError::new(ExErrorKind::InvalidInput)
                .with_entity(entity)
                .with_message(message),
            FlatstoreError::InvalidPaging { .. } | FlatstoreError::InvalidWhere { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            FlatstoreError::Forbidden { entity, .. } => ExError::new(ExErrorKind::Forbidden)
                .with_entity(entity)
                .with_message(message),
            FlatstoreError::Persistence { op, .. } => ExError::new(ExErrorKind::Persistence)
                .with_op(op)
                .with_message(message),
            FlatstoreError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            FlatstoreError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_unique() {
        let kinds = [
            ExErrorKind::Configuration,
            ExErrorKind::Validation,
            ExErrorKind::Conflict,
            ExErrorKind::NotFound,
            ExErrorKind::InvalidInput,
            ExErrorKind::Forbidden,
            ExErrorKind::Io,
            ExErrorKind::Serialization,
            ExErrorKind::Persistence,
            ExErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_validation_issues_stay_internal() {
        let err = FlatstoreError::ValidationFailed {
            entity: "page".to_string(),
            id: "a".to_string(),
            issues: vec![ValidationIssue {
                instance_path: "/title".to_string(),
                schema_path: "#/properties/title/type".to_string(),
                keyword: "type".to_string(),
                message: "must be string".to_string(),
                params: serde_json::json!({ "type": "string" }),
            }],
        };
        assert!(err.to_string().contains("#/properties/title/type"));

        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::Validation);
        assert_eq!(ex.details().unwrap()[0]["instance_path"], "/title");

        let public = PublicError::from(&ex);
        assert_eq!(public.status, 422);
        assert!(!public.message.contains("/title"));
    }

    #[test]
    fn test_internal_messages_are_hidden() {
        let err = FlatstoreError::Persistence {
            op: "write_record".to_string(),
            message: "/srv/data/page/x.json: permission denied".to_string(),
        };
        let public = PublicError::from(err);
        assert_eq!(public.status, 500);
        assert_eq!(public.message, "Internal error");
    }

    #[test]
    fn test_display_includes_context() {
        let ex = ExError::new(ExErrorKind::NotFound)
            .with_op("find_one")
            .with_entity("page")
            .with_record_id("abcd")
            .with_message("Record not found");
        let s = ex.to_string();
        assert!(s.starts_with("[ERR_NOT_FOUND]"));
        assert!(s.contains("find_one"));
        assert!(s.contains("(entity: page)"));
        assert!(s.contains("(id: abcd)"));
    }
}
