// ABOUTME: The tool facet - registers, toggles and removes a key entity's tools.
// ABOUTME: Removal cascades every policy attached to the removed tools.

use std::sync::Arc;

use crate::audit::AuditEvent;
use crate::batch::{check_size, existing_tool_mut, to_strings, tool_not_found};
use crate::error::{RegistryError, ValidationError};
use crate::registry::Shared;
use crate::state::{Address, ContentHash, KeyEntityId, ToolInfo, UnitOfWork};

/// A tool as listed for a key entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTool {
    pub tool_id: String,
    pub enabled: bool,
}

/// Tool lifecycle operations over the shared registry state.
#[derive(Clone)]
pub struct ToolFacet {
    shared: Arc<Shared>,
}

impl ToolFacet {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Register tools, or update the enabled flag of already registered ones.
    ///
    /// Re-registering keeps the tool's existing policies.
    pub async fn register_tools<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.shared
            .write("register_tools", caller, key_entity, |uow| {
                check_size(&self.shared.config, tool_ids.len())?;

                for (index, tool_id) in tool_ids.iter().enumerate() {
                    let tool_id = non_empty(tool_id.as_ref(), index)?;
                    let hash = uow.observe(tool_id);
                    uow.entity_mut()
                        .tools
                        .entry(hash)
                        .and_modify(|tool| tool.enabled = enabled)
                        .or_insert_with(|| ToolInfo::new(enabled));
                }

                Ok(AuditEvent::ToolsRegistered {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                    enabled,
                })
            })
            .await
    }

    /// Remove tools together with their blanket and custom policies.
    pub async fn remove_tools<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("remove_tools", caller, key_entity, |uow| {
                check_size(&self.shared.config, tool_ids.len())?;

                for (index, tool_id) in tool_ids.iter().enumerate() {
                    let tool_id = non_empty(tool_id.as_ref(), index)?;
                    let removed = uow.entity_mut().tools.remove(&ContentHash::of(tool_id));
                    if removed.is_none() {
                        return Err(tool_not_found(key_entity, tool_id));
                    }
                }

                Ok(AuditEvent::ToolsRemoved {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                })
            })
            .await
    }

    /// Enable registered tools.
    pub async fn enable_tools<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("enable_tools", caller, key_entity, |uow| {
                self.set_enabled(uow, tool_ids, true)?;
                Ok(AuditEvent::ToolsEnabled {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                })
            })
            .await
    }

    /// Disable registered tools. Their policies are kept.
    pub async fn disable_tools<S: AsRef<str>>(
        &self,
        caller: Address,
        key_entity: KeyEntityId,
        tool_ids: &[S],
    ) -> Result<(), RegistryError> {
        self.shared
            .write("disable_tools", caller, key_entity, |uow| {
                self.set_enabled(uow, tool_ids, false)?;
                Ok(AuditEvent::ToolsDisabled {
                    key_entity,
                    tool_ids: to_strings(tool_ids),
                })
            })
            .await
    }

    fn set_enabled<S: AsRef<str>>(
        &self,
        uow: &mut UnitOfWork<'_>,
        tool_ids: &[S],
        enabled: bool,
    ) -> Result<(), RegistryError> {
        check_size(&self.shared.config, tool_ids.len())?;

        for (index, tool_id) in tool_ids.iter().enumerate() {
            let tool_id = non_empty(tool_id.as_ref(), index)?;
            existing_tool_mut(uow, tool_id)?.enabled = enabled;
        }
        Ok(())
    }

    /// List a key entity's tools in a stable order.
    pub async fn registered_tools(&self, key_entity: KeyEntityId) -> Vec<RegisteredTool> {
        let state = self.shared.state.read().await;
        let Some(record) = state.entity(key_entity) else {
            return Vec::new();
        };

        record
            .tools
            .iter()
            .filter_map(|(hash, tool)| {
                state.index().get(hash).map(|tool_id| RegisteredTool {
                    tool_id: tool_id.to_string(),
                    enabled: tool.enabled,
                })
            })
            .collect()
    }

    /// Check whether a tool is registered, regardless of its enabled flag.
    pub async fn is_tool_registered(&self, key_entity: KeyEntityId, tool_id: &str) -> bool {
        self.shared
            .state
            .read()
            .await
            .tool(key_entity, tool_id)
            .is_some()
    }

    /// The enabled flag of a registered tool.
    pub async fn is_tool_enabled(
        &self,
        key_entity: KeyEntityId,
        tool_id: &str,
    ) -> Result<bool, RegistryError> {
        self.shared
            .state
            .read()
            .await
            .tool(key_entity, tool_id)
            .map(|tool| tool.enabled)
            .ok_or_else(|| tool_not_found(key_entity, tool_id))
    }
}

fn non_empty(tool_id: &str, index: usize) -> Result<&str, ValidationError> {
    if tool_id.is_empty() {
        Err(ValidationError::EmptyId { index })
    } else {
        Ok(tool_id)
    }
}
