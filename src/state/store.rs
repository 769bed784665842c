// ABOUTME: The single shared registry state and its transactional unit of work.
// ABOUTME: Facets stage edits on a copy of one key entity and commit atomically.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{Address, ContentHash, KeyEntityId};

/// A stored reference to externally held policy content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub hash: ContentHash,
    pub enabled: bool,
}

/// Per-tool state: the enabled flag and its policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolInfo {
    pub enabled: bool,
    pub blanket: Option<Policy>,
    pub custom: HashMap<Address, Policy>,
}

impl ToolInfo {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }
}

/// Everything the registry knows about one key entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEntityRecord {
    pub tools: BTreeMap<ContentHash, ToolInfo>,
    pub delegatees: BTreeSet<Address>,
}

/// Global content hash to content identifier mapping.
///
/// Entries are inserted the first time an identifier is observed and are
/// never removed or replaced.
#[derive(Debug, Clone, Default)]
pub struct ReverseIndex {
    entries: HashMap<ContentHash, String>,
}

impl ReverseIndex {
    /// Look up the identifier that hashes to `hash`.
    pub fn get(&self, hash: &ContentHash) -> Option<&str> {
        self.entries.get(hash).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, hash: ContentHash, content_id: String) {
        self.entries.entry(hash).or_insert(content_id);
    }
}

/// The registry's entire state. Exactly one instance exists per registry.
#[derive(Debug, Default)]
pub struct RegistryState {
    entities: HashMap<KeyEntityId, KeyEntityRecord>,
    index: ReverseIndex,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the record for a key entity, if it has ever been written.
    pub fn entity(&self, key_entity: KeyEntityId) -> Option<&KeyEntityRecord> {
        self.entities.get(&key_entity)
    }

    pub fn index(&self) -> &ReverseIndex {
        &self.index
    }

    /// Look up a tool by its content identifier.
    pub fn tool(&self, key_entity: KeyEntityId, tool_id: &str) -> Option<&ToolInfo> {
        self.entity(key_entity)?.tools.get(&ContentHash::of(tool_id))
    }

    /// Start a unit of work against one key entity.
    ///
    /// Nothing is visible in the state until [`UnitOfWork::commit`]; dropping
    /// the unit of work discards all staged edits.
    pub fn begin(&mut self, key_entity: KeyEntityId) -> UnitOfWork<'_> {
        let staged = self.entities.get(&key_entity).cloned().unwrap_or_default();
        UnitOfWork {
            state: self,
            key_entity,
            staged,
            observed: Vec::new(),
        }
    }
}

/// Staged edits to a single key entity plus newly observed content ids.
pub struct UnitOfWork<'a> {
    state: &'a mut RegistryState,
    key_entity: KeyEntityId,
    staged: KeyEntityRecord,
    observed: Vec<(ContentHash, String)>,
}

impl UnitOfWork<'_> {
    pub fn key_entity(&self) -> KeyEntityId {
        self.key_entity
    }

    /// The staged record, including edits made so far.
    pub fn entity(&self) -> &KeyEntityRecord {
        &self.staged
    }

    pub fn entity_mut(&mut self) -> &mut KeyEntityRecord {
        &mut self.staged
    }

    /// Hash a content identifier and stage it for the reverse index.
    pub fn observe(&mut self, content_id: &str) -> ContentHash {
        let hash = ContentHash::of(content_id);
        let known = self.state.index.get(&hash).is_some()
            || self.observed.iter().any(|(h, _)| *h == hash);
        if !known {
            self.observed.push((hash, content_id.to_string()));
        }
        hash
    }

    /// Mutable access to a staged tool, by content identifier.
    pub fn tool_mut(&mut self, tool_id: &str) -> Option<&mut ToolInfo> {
        self.staged.tools.get_mut(&ContentHash::of(tool_id))
    }

    /// Publish every staged edit in one step.
    pub fn commit(self) {
        let UnitOfWork {
            state,
            key_entity,
            staged,
            observed,
        } = self;

        for (hash, content_id) in observed {
            state.index.insert(hash, content_id);
        }
        state.entities.insert(key_entity, staged);
    }
}
