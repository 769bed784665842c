// ABOUTME: Defines all error types for the registry using thiserror.
// ABOUTME: Each concern has its own error enum, unified under RegistryError.

use crate::state::{Address, KeyEntityId};

/// Top-level error type for the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// The class of precondition a failed call violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Referential,
    Authorization,
    Configuration,
}

impl RegistryError {
    /// Which class of precondition this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RegistryError::Validation(_) => ErrorCategory::Validation,
            RegistryError::Reference(_) => ErrorCategory::Referential,
            RegistryError::Access(_) => ErrorCategory::Authorization,
            RegistryError::Config(_) => ErrorCategory::Configuration,
        }
    }
}

/// Malformed input, caught before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Batch is empty")]
    EmptyBatch,

    #[error("Batch of {size} exceeds the configured limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("Empty tool id at index {index}")]
    EmptyId { index: usize },

    #[error("Empty policy id at index {index}")]
    EmptyPolicyId { index: usize },

    #[error("Array length mismatch: expected {expected}, found {found}")]
    ArrayLengthMismatch { expected: usize, found: usize },

    #[error("Zero delegatee address at index {index}")]
    InvalidDelegatee { index: usize },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid key entity id: {0}")]
    InvalidKeyEntity(String),
}

/// A referenced entity does not exist in the expected state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("Tool '{tool_id}' is not registered for key entity {key_entity}")]
    ToolNotFound {
        key_entity: KeyEntityId,
        tool_id: String,
    },

    #[error("No policy set for tool '{tool_id}' of key entity {key_entity}{}", delegatee_suffix(.delegatee))]
    NoPolicySet {
        key_entity: KeyEntityId,
        tool_id: String,
        delegatee: Option<Address>,
    },

    #[error("Delegatee {delegatee} is not registered for key entity {key_entity}")]
    DelegateeNotFound {
        key_entity: KeyEntityId,
        delegatee: Address,
    },

    #[error("Tool '{tool_id}' of key entity {key_entity} is disabled")]
    ToolDisabled {
        key_entity: KeyEntityId,
        tool_id: String,
    },
}

fn delegatee_suffix(delegatee: &Option<Address>) -> String {
    match delegatee {
        Some(d) => format!(" and delegatee {}", d),
        None => String::new(),
    }
}

/// The caller lacks rights over the key entity.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("{caller} is not the owner of key entity {key_entity}")]
    NotOwner {
        key_entity: KeyEntityId,
        caller: Address,
        owner: Option<Address>,
    },

    #[error("Ownership oracle error: {0}")]
    Oracle(#[source] anyhow::Error),
}

/// Errors from loading registry configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
