//! Storage for revocation records.
//!
//! The [`RevocationStore`] trait is implemented here in memory and in the
//! `tollgate-auth-postgres` crate for durable deployments.

pub mod memory;
pub mod revocation;

pub use memory::InMemoryRevocationStore;
pub use revocation::RevocationStore;
