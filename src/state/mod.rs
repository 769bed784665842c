// ABOUTME: State module - the canonical shape of all registry data.
// ABOUTME: Holds identifier types, per-entity records, and the reverse index.

mod store;
mod types;

pub use store::*;
pub use types::*;
