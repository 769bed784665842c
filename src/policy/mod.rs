// ABOUTME: Policy module - blanket and delegatee-specific policy engine.
// ABOUTME: Resolution prefers an enabled custom policy over an enabled blanket one.

mod facet;
mod resolution;

pub use facet::*;
pub use resolution::*;

#[cfg(test)]
mod facet_test;
