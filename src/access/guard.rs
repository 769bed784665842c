// ABOUTME: The access guard - every mutation must come from the owner.
// ABOUTME: Consults the ownership oracle on each call without caching.

use std::sync::Arc;

use super::OwnershipOracle;
use crate::error::AccessError;
use crate::state::{Address, KeyEntityId};

/// Authorization gate for mutating operations.
#[derive(Clone)]
pub struct AccessGuard {
    oracle: Arc<dyn OwnershipOracle>,
}

impl AccessGuard {
    pub fn new(oracle: Arc<dyn OwnershipOracle>) -> Self {
        Self { oracle }
    }

    /// Fail with [`AccessError::NotOwner`] unless `caller` owns `key_entity`.
    pub async fn require_owner(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
    ) -> Result<(), AccessError> {
        let owner = self
            .oracle
            .owner_of(key_entity)
            .await
            .map_err(AccessError::Oracle)?;

        match owner {
            Some(owner) if owner == caller => Ok(()),
            owner => Err(AccessError::NotOwner {
                key_entity,
                caller,
                owner,
            }),
        }
    }
}
