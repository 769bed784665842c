// ABOUTME: Delegatee module - the set of agents authorized per key entity.
// ABOUTME: Membership gates custom policy writes and execution checks.

mod facet;

pub use facet::*;
