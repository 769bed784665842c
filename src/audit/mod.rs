// ABOUTME: Audit emitter - announces committed registry changes to observers.
// ABOUTME: Provides events, the sink trait, built-in sinks, and the emitter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::state::{Address, KeyEntityId};

/// A committed change to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    ToolsRegistered {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
        enabled: bool,
    },

    /// Removal also dropped every policy attached to these tools.
    ToolsRemoved {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
    },

    ToolsEnabled {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
    },

    ToolsDisabled {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
    },

    BlanketPoliciesSet {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
        policy_ids: Vec<String>,
        enabled: bool,
    },

    BlanketPoliciesRemoved {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
    },

    BlanketPoliciesEnabled {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
    },

    BlanketPoliciesDisabled {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
    },

    CustomPoliciesSet {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
        delegatees: Vec<Address>,
        policy_ids: Vec<String>,
        enabled: bool,
    },

    CustomPoliciesRemoved {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
        delegatees: Vec<Address>,
    },

    CustomPoliciesEnabled {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
        delegatees: Vec<Address>,
    },

    CustomPoliciesDisabled {
        key_entity: KeyEntityId,
        tool_ids: Vec<String>,
        delegatees: Vec<Address>,
    },

    DelegateesAdded {
        key_entity: KeyEntityId,
        delegatees: Vec<Address>,
    },

    /// `policies_cascaded` is true when custom policies were dropped too.
    DelegateesRemoved {
        key_entity: KeyEntityId,
        delegatees: Vec<Address>,
        policies_cascaded: bool,
    },
}

impl AuditEvent {
    /// Stable name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::ToolsRegistered { .. } => "tools_registered",
            AuditEvent::ToolsRemoved { .. } => "tools_removed",
            AuditEvent::ToolsEnabled { .. } => "tools_enabled",
            AuditEvent::ToolsDisabled { .. } => "tools_disabled",
            AuditEvent::BlanketPoliciesSet { .. } => "blanket_policies_set",
            AuditEvent::BlanketPoliciesRemoved { .. } => "blanket_policies_removed",
            AuditEvent::BlanketPoliciesEnabled { .. } => "blanket_policies_enabled",
            AuditEvent::BlanketPoliciesDisabled { .. } => "blanket_policies_disabled",
            AuditEvent::CustomPoliciesSet { .. } => "custom_policies_set",
            AuditEvent::CustomPoliciesRemoved { .. } => "custom_policies_removed",
            AuditEvent::CustomPoliciesEnabled { .. } => "custom_policies_enabled",
            AuditEvent::CustomPoliciesDisabled { .. } => "custom_policies_disabled",
            AuditEvent::DelegateesAdded { .. } => "delegatees_added",
            AuditEvent::DelegateesRemoved { .. } => "delegatees_removed",
        }
    }

    /// The key entity the change applies to.
    pub fn key_entity(&self) -> KeyEntityId {
        match self {
            AuditEvent::ToolsRegistered { key_entity, .. }
            | AuditEvent::ToolsRemoved { key_entity, .. }
            | AuditEvent::ToolsEnabled { key_entity, .. }
            | AuditEvent::ToolsDisabled { key_entity, .. }
            | AuditEvent::BlanketPoliciesSet { key_entity, .. }
            | AuditEvent::BlanketPoliciesRemoved { key_entity, .. }
            | AuditEvent::BlanketPoliciesEnabled { key_entity, .. }
            | AuditEvent::BlanketPoliciesDisabled { key_entity, .. }
            | AuditEvent::CustomPoliciesSet { key_entity, .. }
            | AuditEvent::CustomPoliciesRemoved { key_entity, .. }
            | AuditEvent::CustomPoliciesEnabled { key_entity, .. }
            | AuditEvent::CustomPoliciesDisabled { key_entity, .. }
            | AuditEvent::DelegateesAdded { key_entity, .. }
            | AuditEvent::DelegateesRemoved { key_entity, .. } => *key_entity,
        }
    }
}

/// An event as delivered to sinks, stamped by the emitter.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// Unique id for deduplication by consumers.
    pub id: Uuid,
    /// Position in the emitter's total order, starting at 1.
    pub sequence: u64,
    #[serde(flatten)]
    pub event: AuditEvent,
}

/// Trait for receiving audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Called once per committed operation.
    ///
    /// Errors are logged by the emitter. They never roll back the change.
    async fn on_event(&self, record: &AuditRecord) -> Result<(), anyhow::Error>;

    /// Optional: Filter which events this sink cares about.
    /// Default returns true for all events.
    fn accepts(&self, event: &AuditEvent) -> bool {
        let _ = event;
        true
    }
}

/// Stateless fan-out of audit records to registered sinks.
pub struct AuditEmitter {
    sinks: RwLock<Vec<Arc<dyn AuditSink>>>,
    sequence: AtomicU64,
}

impl AuditEmitter {
    /// Create an emitter with no sinks.
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self {
            sinks: RwLock::new(sinks),
            sequence: AtomicU64::new(0),
        }
    }

    /// Register a sink.
    pub async fn register(&self, sink: impl AuditSink + 'static) {
        self.sinks.write().await.push(Arc::new(sink));
    }

    /// Register a sink wrapped in Arc.
    pub async fn register_arc(&self, sink: Arc<dyn AuditSink>) {
        self.sinks.write().await.push(sink);
    }

    /// Register a closure that sees every accepted record.
    pub async fn on_event<F>(&self, f: F)
    where
        F: Fn(&AuditRecord) + Send + Sync + 'static,
    {
        self.register(FnSink { callback: f }).await;
    }

    /// Stamp an event and deliver it to every sink that accepts it.
    pub async fn emit(&self, event: AuditEvent) -> AuditRecord {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            event,
        };

        let sinks = self.sinks.read().await;
        let deliveries = sinks
            .iter()
            .filter(|sink| sink.accepts(&record.event))
            .map(|sink| sink.on_event(&record));

        for result in futures::future::join_all(deliveries).await {
            if let Err(e) = result {
                tracing::warn!(
                    kind = record.event.kind(),
                    sequence = record.sequence,
                    error = %e,
                    "audit sink failed"
                );
            }
        }

        record
    }

    /// Get the number of registered sinks.
    pub async fn len(&self) -> usize {
        self.sinks.read().await.len()
    }

    /// Check if no sinks are registered.
    pub async fn is_empty(&self) -> bool {
        self.sinks.read().await.is_empty()
    }
}

impl Default for AuditEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Sink wrapper for plain closures.
struct FnSink<F> {
    callback: F,
}

#[async_trait]
impl<F> AuditSink for FnSink<F>
where
    F: Fn(&AuditRecord) + Send + Sync,
{
    async fn on_event(&self, record: &AuditRecord) -> Result<(), anyhow::Error> {
        (self.callback)(record);
        Ok(())
    }
}

/// Sink that writes each record as JSON through `tracing`.
pub struct LogSink;

#[async_trait]
impl AuditSink for LogSink {
    async fn on_event(&self, record: &AuditRecord) -> Result<(), anyhow::Error> {
        let json = serde_json::to_string(record)?;
        tracing::info!(
            target: "toolgate::audit",
            key_entity = %record.event.key_entity(),
            kind = record.event.kind(),
            record = %json,
            "audit record"
        );
        Ok(())
    }
}

/// Sink that forwards records into a tokio channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AuditRecord>,
}

impl ChannelSink {
    /// Create a sink and the receiver its records arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AuditSink for ChannelSink {
    async fn on_event(&self, record: &AuditRecord) -> Result<(), anyhow::Error> {
        self.tx
            .send(record.clone())
            .map_err(|_| anyhow::anyhow!("audit receiver dropped"))
    }
}
