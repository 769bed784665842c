// ABOUTME: Root module for toolgate - an owner-gated tool and policy registry.
// ABOUTME: Re-exports the registry, its facets, and supporting types.

pub mod access;
pub mod audit;
mod batch;
pub mod config;
pub mod delegatee;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod registry;
pub mod state;
pub mod tool;

pub use error::RegistryError;
pub use registry::{Registry, RegistryBuilder};
