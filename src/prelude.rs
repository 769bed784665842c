// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use toolgate::prelude::*;` to get started quickly.

pub use crate::access::{AccessGuard, OwnershipOracle, StaticOwners};
pub use crate::audit::{AuditEmitter, AuditEvent, AuditRecord, AuditSink, ChannelSink, LogSink};
pub use crate::config::{RegistryConfig, RegistryConfigBuilder};
pub use crate::delegatee::DelegateeFacet;
pub use crate::error::{
    AccessError, ConfigError, ErrorCategory, ReferenceError, RegistryError, ValidationError,
};
pub use crate::policy::{EffectivePolicy, PolicyFacet, PolicyView, Resolution};
pub use crate::registry::{Registry, RegistryBuilder};
pub use crate::state::{Address, ContentHash, KeyEntityId};
pub use crate::tool::{RegisteredTool, ToolFacet};
