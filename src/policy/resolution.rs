// ABOUTME: Effective policy resolution - custom override, then blanket, then none.
// ABOUTME: Pure functions over a tool's stored policies.

use crate::state::{Address, ContentHash, Policy, ReverseIndex, ToolInfo};

/// Which stored policy governs a delegatee's use of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An enabled custom policy for this delegatee.
    Custom(ContentHash),
    /// The tool's enabled blanket policy.
    Blanket(ContentHash),
    /// Neither level has an enabled policy.
    Unrestricted,
}

impl Resolution {
    pub fn hash(&self) -> Option<ContentHash> {
        match self {
            Resolution::Custom(hash) | Resolution::Blanket(hash) => Some(*hash),
            Resolution::Unrestricted => None,
        }
    }

    pub fn is_delegatee_specific(&self) -> bool {
        matches!(self, Resolution::Custom(_))
    }
}

/// Resolve the policy that applies to `delegatee` on `tool`.
///
/// A disabled policy at either level is skipped, not treated as a block.
pub fn resolve(tool: &ToolInfo, delegatee: &Address) -> Resolution {
    if let Some(custom) = tool.custom.get(delegatee).filter(|p| p.enabled) {
        return Resolution::Custom(custom.hash);
    }
    match tool.blanket {
        Some(blanket) if blanket.enabled => Resolution::Blanket(blanket.hash),
        _ => Resolution::Unrestricted,
    }
}

/// Result of effective policy resolution, with the policy id recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePolicy {
    /// `None` means no policy applies.
    pub policy_id: Option<String>,
    pub delegatee_specific: bool,
}

impl EffectivePolicy {
    pub(crate) fn from_resolution(resolution: Resolution, index: &ReverseIndex) -> Self {
        Self {
            policy_id: resolution
                .hash()
                .and_then(|hash| index.get(&hash).map(str::to_string)),
            delegatee_specific: resolution.is_delegatee_specific(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.policy_id.is_none()
    }
}

/// A single stored policy slot, with no fallback applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyView {
    /// `None` means the slot is empty.
    pub policy_id: Option<String>,
    pub enabled: bool,
}

impl PolicyView {
    pub(crate) fn from_slot(slot: Option<&Policy>, index: &ReverseIndex) -> Self {
        match slot {
            Some(policy) => Self {
                policy_id: index.get(&policy.hash).map(str::to_string),
                enabled: policy.enabled,
            },
            None => Self::default(),
        }
    }
}
