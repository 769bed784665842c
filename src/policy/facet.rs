// ABOUTME: The policy facet - batched blanket and custom policy writes plus reads.
// ABOUTME: Every batch is validated element by element and commits all or nothing.

use std::sync::Arc;

use super::{EffectivePolicy, PolicyView, resolve};
use crate::audit::AuditEvent;
use crate::batch::{check_parity, check_size, existing_tool_mut, to_strings, tool_not_found};
use crate::error::{ReferenceError, RegistryError, ValidationError};
use crate::registry::Shared;
use crate::state::{Address, ContentHash, KeyEntityId, Policy, UnitOfWork};

/// Whether a custom-policy write needs the delegatee to be registered.
#[derive(Clone, Copy)]
enum Membership {
    Required,
    NotRequired,
}

/// Policy writes and resolution over the shared registry state.
#[derive(Clone)]
pub struct PolicyFacet {
    shared: Arc<Shared>,
}

impl PolicyFacet {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Resolve the policy governing `delegatee`'s use of a tool.
    ///
    /// Fails with `ToolNotFound` if the tool is not registered, whether or
    /// not it is enabled.
    pub async fn effective_policy(
        &self,
        key_entity: KeyEntityId,
        tool_id: &str,
        delegatee: Address,
    ) -> Result<EffectivePolicy, RegistryError> {
        let state = self.shared.state.read().await;
        let tool = state
            .tool(key_entity, tool_id)
            .ok_or_else(|| tool_not_found(key_entity, tool_id))?;

        Ok(EffectivePolicy::from_resolution(
            resolve(tool, &delegatee),
            state.index(),
        ))
    }

    /// The execution-time gate: the tool must be enabled and the delegatee
    /// registered before the effective policy is returned.
    pub async fn authorize_execution(
        &self,
        key_entity: KeyEntityId,
        tool_id: &str,
        delegatee: Address,
    ) -> Result<EffectivePolicy, RegistryError> {
        let state = self.shared.state.read().await;
        let tool = state
            .tool(key_entity, tool_id)
            .ok_or_else(|| tool_not_found(key_entity, tool_id))?;

        if !tool.enabled {
            return Err(ReferenceError::ToolDisabled {
                key_entity,
                tool_id: tool_id.to_string(),
            }
            .into());
        }

        let registered = state
            .entity(key_entity)
            .is_some_and(|record| record.delegatees.contains(&delegatee));
        if !registered {
            return Err(ReferenceError::DelegateeNotFound {
                key_entity,
                delegatee,
            }
            .into());
        }

        Ok(EffectivePolicy::from_resolution(
            resolve(tool, &delegatee),
            state.index(),
        ))
    }

    /// The delegatee's own policy slot, without falling back to blanket.
    pub async fn custom_policy(
        &self,
        key_entity: KeyEntityId,
        tool_id: &str,
        delegatee: Address,
    ) -> Result<PolicyView, RegistryError> {
        let state = self.shared.state.read().await;
        let tool = state
            .tool(key_entity, tool_id)
            .ok_or_else(|| tool_not_found(key_entity, tool_id))?;

        Ok(PolicyView::from_slot(
            tool.custom.get(&delegatee),
            state.index(),
        ))
    }

    /// The tool's blanket policy slot.
    pub async fn blanket_policy(
        &self,
        key_entity: KeyEntityId,
        tool_id: &str,
    ) -> Result<PolicyView, RegistryError> {
        let state = self.shared.state.read().await;
        let tool = state
            .tool(key_entity, tool_id)
            .ok_or_else(|| tool_not_found(key_entity, tool_id))?;

        Ok(PolicyView::from_slot(tool.blanket.as_ref(), state.index()))
    }

    /// Recover the content identifier that produced `hash`.
    pub async fn resolve_content_id(&self, hash: &ContentHash) -> Option<String> {
        self.shared
            .state
            .read()
            .await
            .index()
            .get(hash)
            .map(str::to_string)
    }

    /// Set (or replace) the blanket policy of each tool.
    pub async fn set_blanket_policies<S: AsRef<str>, P: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
        policy_ids: &[P],
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.shared
            .write("set_blanket_policies", caller, key_entity, |uow| {
                check_parity(tool_ids.len(), &[policy_ids.len()])?;
                check_size(&self.shared.config, tool_ids.len())?;

                for (index, (tool_id, policy_id)) in tool_ids.iter().zip(policy_ids).enumerate() {
                    let tool_id = tool_id.as_ref();
                    let policy_id = policy_id.as_ref();
                    existing_tool_mut(uow, tool_id)?;
                    if policy_id.is_empty() {
                        return Err(ValidationError::EmptyPolicyId { index }.into());
                    }

                    let hash = uow.observe(policy_id);
                    existing_tool_mut(uow, tool_id)?.blanket = Some(Policy { hash, enabled });
                }

                Ok(AuditEvent::BlanketPoliciesSet {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                    policy_ids: to_strings(policy_ids),
                    enabled,
                })
            })
            .await
    }

    /// Clear each tool's blanket policy.
    pub async fn remove_blanket_policies<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("remove_blanket_policies", caller, key_entity, |uow| {
                check_size(&self.shared.config, tool_ids.len())?;

                for tool_id in tool_ids {
                    let tool_id = tool_id.as_ref();
                    if existing_tool_mut(uow, tool_id)?.blanket.take().is_none() {
                        return Err(no_policy_set(key_entity, tool_id, None));
                    }
                }

                Ok(AuditEvent::BlanketPoliciesRemoved {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                })
            })
            .await
    }

    /// Enable each tool's existing blanket policy.
    pub async fn enable_blanket_policies<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("enable_blanket_policies", caller, key_entity, |uow| {
                self.toggle_blanket(uow, tool_ids, true)?;
                Ok(AuditEvent::BlanketPoliciesEnabled {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                })
            })
            .await
    }

    /// Disable each tool's existing blanket policy.
    pub async fn disable_blanket_policies<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("disable_blanket_policies", caller, key_entity, |uow| {
                self.toggle_blanket(uow, tool_ids, false)?;
                Ok(AuditEvent::BlanketPoliciesDisabled {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                })
            })
            .await
    }

    fn toggle_blanket<S: AsRef<str>>(
        &self,
        uow: &mut UnitOfWork<'_>,
        tool_ids: &[S],
        enabled: bool,
    ) -> Result<(), RegistryError> {
        check_size(&self.shared.config, tool_ids.len())?;
        let key_entity = uow.key_entity();

        for tool_id in tool_ids {
            let tool_id = tool_id.as_ref();
            match existing_tool_mut(uow, tool_id)?.blanket.as_mut() {
                Some(policy) => policy.enabled = enabled,
                None => return Err(no_policy_set(key_entity, tool_id, None)),
            }
        }
        Ok(())
    }

    /// Set (or replace) the custom policy of each `(tool, delegatee)` pair.
    pub async fn set_custom_policies<S: AsRef<str>, P: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
        delegatees: &[Address],
        policy_ids: &[P],
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.shared
            .write("set_custom_policies", caller, key_entity, |uow| {
                check_parity(tool_ids.len(), &[delegatees.len(), policy_ids.len()])?;
                check_size(&self.shared.config, tool_ids.len())?;

                for (index, tool_id) in tool_ids.iter().enumerate() {
                    let tool_id = tool_id.as_ref();
                    let delegatee = delegatees[index];
                    let policy_id = policy_ids[index].as_ref();

                    check_slot(uow, index, tool_id, &delegatee, Membership::Required)?;
                    if policy_id.is_empty() {
                        return Err(ValidationError::EmptyPolicyId { index }.into());
                    }

                    let hash = uow.observe(policy_id);
                    existing_tool_mut(uow, tool_id)?
                        .custom
                        .insert(delegatee, Policy { hash, enabled });
                }

                Ok(AuditEvent::CustomPoliciesSet {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                    delegatees: delegatees.to_vec(),
                    policy_ids: to_strings(policy_ids),
                    enabled,
                })
            })
            .await
    }

    /// Clear each pair's custom policy so resolution falls back to blanket.
    pub async fn remove_custom_policies<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
        delegatees: &[Address],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("remove_custom_policies", caller, key_entity, |uow| {
                check_parity(tool_ids.len(), &[delegatees.len()])?;
                check_size(&self.shared.config, tool_ids.len())?;

                for (index, tool_id) in tool_ids.iter().enumerate() {
                    let tool_id = tool_id.as_ref();
                    let delegatee = delegatees[index];

                    check_slot(uow, index, tool_id, &delegatee, Membership::NotRequired)?;
                    let removed = existing_tool_mut(uow, tool_id)?.custom.remove(&delegatee);
                    if removed.is_none() {
                        return Err(no_policy_set(key_entity, tool_id, Some(delegatee)));
                    }
                }

                Ok(AuditEvent::CustomPoliciesRemoved {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                    delegatees: delegatees.to_vec(),
                })
            })
            .await
    }

    /// Enable each pair's existing custom policy.
    pub async fn enable_custom_policies<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
        delegatees: &[Address],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("enable_custom_policies", caller, key_entity, |uow| {
                self.toggle_custom(uow, tool_ids, delegatees, true)?;
                Ok(AuditEvent::CustomPoliciesEnabled {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                    delegatees: delegatees.to_vec(),
                })
            })
            .await
    }

    /// Disable each pair's existing custom policy.
    pub async fn disable_custom_policies<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
        delegatees: &[Address],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("disable_custom_policies", caller, key_entity, |uow| {
                self.toggle_custom(uow, tool_ids, delegatees, false)?;
                Ok(AuditEvent::CustomPoliciesDisabled {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                    delegatees: delegatees.to_vec(),
                })
            })
            .await
    }

    fn toggle_custom<S: AsRef<str>>(
        &self,
        uow: &mut UnitOfWork<'_>,
        tool_ids: &[S],
        delegatees: &[Address],
        enabled: bool,
    ) -> Result<(), RegistryError> {
        check_parity(tool_ids.len(), &[delegatees.len()])?;
        check_size(&self.shared.config, tool_ids.len())?;
        let key_entity = uow.key_entity();

        // Re-enabling needs a recognized delegatee; disabling is always allowed.
        let membership = if enabled {
            Membership::Required
        } else {
            Membership::NotRequired
        };

        for (index, tool_id) in tool_ids.iter().enumerate() {
            let tool_id = tool_id.as_ref();
            let delegatee = delegatees[index];

            check_slot(uow, index, tool_id, &delegatee, membership)?;
            match existing_tool_mut(uow, tool_id)?.custom.get_mut(&delegatee) {
                Some(policy) => policy.enabled = enabled,
                None => return Err(no_policy_set(key_entity, tool_id, Some(delegatee))),
            }
        }
        Ok(())
    }
}

/// Per-element preconditions for a custom policy slot, in reporting order.
fn check_slot(
    uow: &UnitOfWork<'_>,
    index: usize,
    tool_id: &str,
    delegatee: &Address,
    membership: Membership,
) -> Result<(), RegistryError> {
    if delegatee.is_zero() {
        return Err(ValidationError::InvalidDelegatee { index }.into());
    }

    let record = uow.entity();
    if !record.tools.contains_key(&ContentHash::of(tool_id)) {
        return Err(tool_not_found(uow.key_entity(), tool_id));
    }

    if matches!(membership, Membership::Required) && !record.delegatees.contains(delegatee) {
        return Err(ReferenceError::DelegateeNotFound {
            key_entity: uow.key_entity(),
            delegatee: *delegatee,
        }
        .into());
    }
    Ok(())
}

fn no_policy_set(
    key_entity: KeyEntityId,
    tool_id: &str,
    delegatee: Option<Address>,
) -> RegistryError {
    ReferenceError::NoPolicySet {
        key_entity,
        tool_id: tool_id.to_string(),
        delegatee,
    }
    .into()
}
