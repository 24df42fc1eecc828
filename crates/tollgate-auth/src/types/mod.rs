//! Domain types.

pub mod revocation_record;

pub use revocation_record::{OriginMetadata, RevocationReason, RevocationRecord};
