// ABOUTME: Access module - owner-only authorization for mutations.
// ABOUTME: Pairs the external ownership oracle with the guard predicate.

mod guard;
mod oracle;

pub use guard::*;
pub use oracle::*;
