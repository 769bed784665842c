// ABOUTME: The delegatee facet - membership of agents acting for a key entity.
// ABOUTME: Removal can cascade the delegatee's custom policies.

use std::sync::Arc;

use crate::audit::AuditEvent;
use crate::batch::check_size;
use crate::error::{RegistryError, ValidationError};
use crate::registry::Shared;
use crate::state::{Address, KeyEntityId};

/// Delegatee membership operations over the shared registry state.
#[derive(Clone)]
pub struct DelegateeFacet {
    shared: Arc<Shared>,
}

impl DelegateeFacet {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Add delegatees. Already present addresses are left as they are.
    pub async fn add_delegatees(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        delegatees: &[Address],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("add_delegatees", caller, key_entity, |uow| {
                check_size(&self.shared.config, delegatees.len())?;
                check_non_zero(delegatees)?;

                uow.entity_mut().delegatees.extend(delegatees.iter().copied());

                Ok(AuditEvent::DelegateesAdded {
                    key_entity,
                    delegatees: delegatees.to_vec(),
                })
            })
            .await
    }

    /// Remove delegatees. Absent addresses are ignored.
    ///
    /// With `cascade_delegatee_removal` on, each removed delegatee's custom
    /// policies are dropped from every tool of the key entity.
    pub async fn remove_delegatees(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        delegatees: &[Address],
    ) -> Result<(), RegistryError> {
        let cascade = self.shared.config.cascade_delegatee_removal;

        self.shared
            .write("remove_delegatees", caller, key_entity, |uow| {
                check_size(&self.shared.config, delegatees.len())?;
                check_non_zero(delegatees)?;

                let record = uow.entity_mut();
                for delegatee in delegatees {
                    record.delegatees.remove(delegatee);
                    if cascade {
                        for tool in record.tools.values_mut() {
                            tool.custom.remove(delegatee);
                        }
                    }
                }

                Ok(AuditEvent::DelegateesRemoved {
                    key_entity,
                    delegatees: delegatees.to_vec(),
                    policies_cascaded: cascade,
                })
            })
            .await
    }

    /// All delegatees of a key entity, in address order.
    pub async fn delegatees(&self, key_entity: KeyEntityId) -> Vec<Address> {
        self.shared
            .state
            .read()
            .await
            .entity(key_entity)
            .map(|record| record.delegatees.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn is_delegatee(&self, key_entity: KeyEntityId, delegatee: Address) -> bool {
        self.shared
            .state
            .read()
            .await
            .entity(key_entity)
            .is_some_and(|record| record.delegatees.contains(&delegatee))
    }
}

fn check_non_zero(delegatees: &[Address]) -> Result<(), ValidationError> {
    match delegatees.iter().position(Address::is_zero) {
        Some(index) => Err(ValidationError::InvalidDelegatee { index }),
        None => Ok(()),
    }
}
