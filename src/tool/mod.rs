// ABOUTME: Tool module - registration and lifecycle of a key entity's tools.
// ABOUTME: Tools are identified by content id and carry an enabled flag.

mod facet;

pub use facet::*;
