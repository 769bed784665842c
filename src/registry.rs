// ABOUTME: The Registry - one shared state behind tool, policy and delegatee facets.
// ABOUTME: Serializes writers, runs the access guard, commits, then audits outside the state lock.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::access::{AccessGuard, OwnershipOracle};
use crate::audit::{AuditEmitter, AuditEvent, AuditSink};
use crate::config::RegistryConfig;
use crate::delegatee::DelegateeFacet;
use crate::error::RegistryError;
use crate::policy::PolicyFacet;
use crate::state::{Address, KeyEntityId, RegistryState, UnitOfWork};
use crate::tool::ToolFacet;

/// State and collaborators shared by every facet.
pub(crate) struct Shared {
    pub(crate) state: RwLock<RegistryState>,
    /// Held by a writer from its first step until its audit record is delivered.
    writer: Mutex<()>,
    pub(crate) guard: AccessGuard,
    pub(crate) audit: AuditEmitter,
    pub(crate) config: RegistryConfig,
}

impl Shared {
    /// Run one owner-gated mutation as an all-or-nothing unit.
    ///
    /// Writers are serialized by `writer`, which stays held until the
    /// audit record is delivered, so audit order matches commit order.
    /// The state write lock covers only the ownership check, `apply` and
    /// the commit, so sinks are free to read the registry. `apply` edits a
    /// staged copy of the key entity; any error drops the copy, leaving
    /// state untouched.
    pub(crate) async fn write<F>(
        &self,
        op: &'static str,
        caller: Address,
        key_entity: KeyEntityId,
        apply: F,
    ) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<AuditEvent, RegistryError>,
    {
        let _writer = self.writer.lock().await;

        let result = async {
            let mut state = self.state.write().await;
            self.guard.require_owner(caller, key_entity).await?;
            let mut uow = state.begin(key_entity);
            let event = apply(&mut uow)?;
            uow.commit();
            Ok::<_, RegistryError>(event)
        }
        .await;

        match result {
            Ok(event) => {
                let record = self.audit.emit(event).await;
                tracing::debug!(
                    op,
                    key_entity = %key_entity,
                    sequence = record.sequence,
                    "registry change committed"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    op,
                    key_entity = %key_entity,
                    caller = %caller,
                    error = %e,
                    "registry change rejected"
                );
                Err(e)
            }
        }
    }
}

/// Owner-gated registry of tools, delegatees and policies.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
    tools: ToolFacet,
    policies: PolicyFacet,
    delegatees: DelegateeFacet,
}

impl Registry {
    /// Create a registry with default configuration and no audit sinks.
    pub fn new(oracle: Arc<dyn OwnershipOracle>) -> Self {
        Self::builder(oracle).build()
    }

    /// Create a new registry builder.
    pub fn builder(oracle: Arc<dyn OwnershipOracle>) -> RegistryBuilder {
        RegistryBuilder::new(oracle)
    }

    /// Tool registration and lifecycle.
    pub fn tools(&self) -> &ToolFacet {
        &self.tools
    }

    /// Blanket and custom policy writes and resolution.
    pub fn policies(&self) -> &PolicyFacet {
        &self.policies
    }

    /// Delegatee membership.
    pub fn delegatees(&self) -> &DelegateeFacet {
        &self.delegatees
    }

    /// The emitter, for registering sinks after construction.
    pub fn audit(&self) -> &AuditEmitter {
        &self.shared.audit
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }
}

/// Builder for constructing registries.
pub struct RegistryBuilder {
    oracle: Arc<dyn OwnershipOracle>,
    config: RegistryConfig,
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl RegistryBuilder {
    pub fn new(oracle: Arc<dyn OwnershipOracle>) -> Self {
        Self {
            oracle,
            config: RegistryConfig::default(),
            sinks: Vec::new(),
        }
    }

    /// Replace the default configuration.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Add an audit sink.
    pub fn sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Add an audit sink wrapped in Arc.
    pub fn sink_arc(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Build the registry.
    pub fn build(self) -> Registry {
        let shared = Arc::new(Shared {
            state: RwLock::new(RegistryState::new()),
            writer: Mutex::new(()),
            guard: AccessGuard::new(self.oracle),
            audit: AuditEmitter::with_sinks(self.sinks),
            config: self.config,
        });

        Registry {
            tools: ToolFacet::new(shared.clone()),
            policies: PolicyFacet::new(shared.clone()),
            delegatees: DelegateeFacet::new(shared.clone()),
            shared,
        }
    }
}
