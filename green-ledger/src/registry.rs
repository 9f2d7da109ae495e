//! Identity registry
//!
//! Resolves a human-supplied name to a stable identity record, creating one
//! on first use. Names are globally unique; an identity's role is fixed at
//! creation. Calls are serialized through the ledger actor, so two
//! simultaneous first logins for one name cannot both insert.

use crate::{
    storage::Storage,
    types::{Identity, LoginRequest},
    Result,
};
use std::sync::Arc;

/// Name-to-identity resolver backed by storage
pub struct IdentityRegistry {
    storage: Arc<Storage>,
}

impl IdentityRegistry {
    /// Create a registry over the shared store
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Look up an identity by name, creating it on first use
    ///
    /// The requested role only matters for a new identity; for an existing
    /// name the stored record is returned unchanged and the supplied role is
    /// ignored. Empty names and unrecognized roles are rejected up front.
    pub fn resolve_or_create(&self, request: &LoginRequest) -> Result<Identity> {
        let requested_role = request.validate()?;

        if let Some(existing) = self.storage.find_identity_by_name(&request.name)? {
            tracing::debug!(
                identity_id = %existing.id,
                name = %existing.name,
                role = %existing.role,
                "Resolved existing identity"
            );
            return Ok(existing);
        }

        let identity = Identity::new(request.name.clone(), requested_role);
        self.storage.create_identity(&identity)?;

        tracing::info!(
            identity_id = %identity.id,
            name = %identity.name,
            role = %identity.role,
            "Identity created"
        );

        Ok(identity)
    }
}
