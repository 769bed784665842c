// ABOUTME: Defines the OwnershipOracle trait for resolving key entity owners.
// ABOUTME: Includes StaticOwners, an in-memory oracle for embedding and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::state::{Address, KeyEntityId};

/// External source of truth for who owns a key entity.
#[async_trait]
pub trait OwnershipOracle: Send + Sync {
    /// Resolve the current owner of `key_entity`.
    ///
    /// Returns `Ok(None)` if the key entity is unknown.
    async fn owner_of(&self, key_entity: KeyEntityId) -> Result<Option<Address>, anyhow::Error>;
}

/// An oracle backed by an in-memory owner table.
#[derive(Default)]
pub struct StaticOwners {
    owners: RwLock<HashMap<KeyEntityId, Address>>,
}

impl StaticOwners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an owner while building the table.
    pub fn with_owner(mut self, key_entity: KeyEntityId, owner: Address) -> Self {
        self.owners.get_mut().insert(key_entity, owner);
        self
    }

    /// Transfer ownership of a key entity.
    pub async fn set_owner(&self, key_entity: KeyEntityId, owner: Address) {
        self.owners.write().await.insert(key_entity, owner);
    }

    /// Forget a key entity entirely.
    pub async fn remove_owner(&self, key_entity: KeyEntityId) {
        self.owners.write().await.remove(&key_entity);
    }
}

impl FromIterator<(KeyEntityId, Address)> for StaticOwners {
    fn from_iter<I: IntoIterator<Item = (KeyEntityId, Address)>>(iter: I) -> Self {
        Self {
            owners: RwLock::new(iter.into_iter().collect()),
        }
    }
}

#[async_trait]
impl OwnershipOracle for StaticOwners {
    async fn owner_of(&self, key_entity: KeyEntityId) -> Result<Option<Address>, anyhow::Error> {
        Ok(self.owners.read().await.get(&key_entity).copied())
    }
}
