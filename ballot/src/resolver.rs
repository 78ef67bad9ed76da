//! Resolution of loosely-typed entity references into canonical keys.
//!
//! A reference resolves only if the entity exists and currently reports the
//! capability asked for. Every miss, including lookup failures, is `None`; the
//! one hard error is a locator reference with no [`Locator`] configured.
use std::sync::Arc;

use async_trait::async_trait;
use ballot_shared::types::{EntityHandle, EntityId, EntityKey, LocatorParams};
use tracing::debug;

use crate::errors::BallotError;
use crate::registry::{Capabilities, EntityRegistry};

/// A reference to a voter or votable as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// An entity the caller already holds.
    Entity(EntityHandle),
    /// A type name and primary key, looked up in the directory.
    Typed { type_name: String, id: EntityId },
    /// An opaque token handed to the configured [`Locator`].
    Located { token: String, params: LocatorParams },
}

impl EntityRef {
    pub fn typed(type_name: impl Into<String>, id: EntityId) -> Self {
        Self::Typed {
            type_name: type_name.into(),
            id,
        }
    }

    pub fn located(token: impl Into<String>) -> Self {
        Self::Located {
            token: token.into(),
            params: LocatorParams::new(),
        }
    }
}

impl From<EntityHandle> for EntityRef {
    fn from(handle: EntityHandle) -> Self {
        Self::Entity(handle)
    }
}

impl From<&EntityHandle> for EntityRef {
    fn from(handle: &EntityHandle) -> Self {
        Self::Entity(handle.clone())
    }
}

/// Lookup of live entities by type and primary key.
///
/// Implementations return the entity under its concrete type name, which may
/// be a subtype of the `type_name` asked for.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    async fn find(
        &self,
        type_name: &str,
        id: EntityId,
    ) -> Result<Option<EntityHandle>, BallotError>;

    /// Fetches several entities of one type. Missing ids are left out.
    async fn find_many(
        &self,
        type_name: &str,
        ids: &[EntityId],
    ) -> Result<Vec<EntityHandle>, BallotError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(handle) = self.find(type_name, *id).await? {
                found.push(handle);
            }
        }
        Ok(found)
    }

    /// Instance-level capability check. Defaults to the class-level flags.
    fn capabilities(&self, _handle: &EntityHandle, class_level: Capabilities) -> Capabilities {
        class_level
    }
}

/// Resolves opaque global identifiers to entities.
#[async_trait]
pub trait Locator: Send + Sync {
    async fn locate(
        &self,
        token: &str,
        params: &LocatorParams,
    ) -> Result<Option<EntityHandle>, BallotError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Votable,
    Voter,
}

pub struct IdentityResolver {
    registry: Arc<EntityRegistry>,
    directory: Arc<dyn EntityDirectory>,
    locator: Option<Arc<dyn Locator>>,
}

impl IdentityResolver {
    pub fn new(
        registry: Arc<EntityRegistry>,
        directory: Arc<dyn EntityDirectory>,
        locator: Option<Arc<dyn Locator>>,
    ) -> Self {
        Self {
            registry,
            directory,
            locator,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &Arc<dyn EntityDirectory> {
        &self.directory
    }

    /// Resolves `reference` to the canonical key of a votable entity.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(key))` - The entity exists and is currently votable
    /// * `Ok(None)` - Unknown reference, failed lookup or missing capability
    /// * `Err(BallotError::LocatorNotConfigured)` - Locator reference without a locator
    pub async fn resolve_votable(
        &self,
        reference: &EntityRef,
    ) -> Result<Option<EntityKey>, BallotError> {
        self.resolve(reference, Role::Votable).await
    }

    /// Resolves `reference` to the canonical key of a voter entity.
    ///
    /// Same contract as [`resolve_votable`](Self::resolve_votable).
    pub async fn resolve_voter(
        &self,
        reference: &EntityRef,
    ) -> Result<Option<EntityKey>, BallotError> {
        self.resolve(reference, Role::Voter).await
    }

    async fn resolve(
        &self,
        reference: &EntityRef,
        role: Role,
    ) -> Result<Option<EntityKey>, BallotError> {
        let Some(handle) = self.fetch(reference).await? else {
            return Ok(None);
        };

        let class_level = self.registry.capabilities(&handle.type_name);
        let capabilities = self.directory.capabilities(&handle, class_level);
        let capable = match role {
            Role::Votable => capabilities.votable,
            Role::Voter => capabilities.voter,
        };
        if !capable {
            debug!(entity = ?handle, role = ?role, "Entity lacks capability");
            return Ok(None);
        }

        Ok(Some(self.registry.key(&handle)))
    }

    async fn fetch(&self, reference: &EntityRef) -> Result<Option<EntityHandle>, BallotError> {
        let found = match reference {
            EntityRef::Entity(handle) => return Ok(Some(handle.clone())),
            EntityRef::Typed { type_name, id } => self.directory.find(type_name, *id).await,
            EntityRef::Located { token, params } => {
                let locator = self
                    .locator
                    .as_ref()
                    .ok_or(BallotError::LocatorNotConfigured)?;
                locator.locate(token, params).await
            }
        };

        match found {
            Ok(Some(handle)) => Ok(Some(handle)),
            Ok(None) => {
                debug!(reference = ?reference, "Reference did not resolve");
                Ok(None)
            }
            Err(BallotError::LocatorNotConfigured) => Err(BallotError::LocatorNotConfigured),
            Err(e) => {
                debug!(reference = ?reference, error = %e, "Lookup failed, treating as unresolved");
                Ok(None)
            }
        }
    }
}
