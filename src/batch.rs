// ABOUTME: Input checks shared by every batched write.
// ABOUTME: Batch size, parallel-array parity, and tool slot lookups.

use crate::config::RegistryConfig;
use crate::error::{ReferenceError, RegistryError, ValidationError};
use crate::state::{KeyEntityId, ToolInfo, UnitOfWork};

/// Reject empty batches and batches over the configured limit.
pub(crate) fn check_size(config: &RegistryConfig, size: usize) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::EmptyBatch);
    }
    match config.max_batch_size {
        Some(limit) if size > limit => Err(ValidationError::BatchTooLarge { size, limit }),
        _ => Ok(()),
    }
}

/// Every parallel array must be as long as the first.
pub(crate) fn check_parity(expected: usize, others: &[usize]) -> Result<(), ValidationError> {
    match others.iter().find(|&&found| found != expected) {
        Some(&found) => Err(ValidationError::ArrayLengthMismatch { expected, found }),
        None => Ok(()),
    }
}

pub(crate) fn to_strings<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter().map(|id| id.as_ref().to_string()).collect()
}

pub(crate) fn tool_not_found(key_entity: KeyEntityId, tool_id: &str) -> RegistryError {
    ReferenceError::ToolNotFound {
        key_entity,
        tool_id: tool_id.to_string(),
    }
    .into()
}

/// Staged tool by id, or `ToolNotFound`.
pub(crate) fn existing_tool_mut<'u>(
    uow: &'u mut UnitOfWork<'_>,
    tool_id: &str,
) -> Result<&'u mut ToolInfo, RegistryError> {
    let key_entity = uow.key_entity();
    uow.tool_mut(tool_id)
        .ok_or_else(|| tool_not_found(key_entity, tool_id))
}
