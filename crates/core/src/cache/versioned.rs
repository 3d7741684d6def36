//! Versioned cache generations.
//!
//! Two generations are current at any time: `static-<version>` for assets
//! precached at install and `dynamic-<version>` for responses captured at
//! runtime. Any other name is stale. Because names are derived from the
//! version alone, staleness is a string comparison.

use std::fmt;
use std::sync::Arc;

use super::snapshots::Snapshot;
use super::storage::Storage;
use crate::Error;
use crate::request::Request;

/// Which of the two current generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Static,
    Dynamic,
}

impl Role {
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Static => "static",
            Role::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Generation names for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    static_name: String,
    dynamic_name: String,
}

impl CacheNames {
    pub fn for_version(version: &str) -> Self {
        Self {
            static_name: format!("{}-{version}", Role::Static.tag()),
            dynamic_name: format!("{}-{version}", Role::Dynamic.tag()),
        }
    }

    pub fn static_name(&self) -> &str {
        &self.static_name
    }

    pub fn dynamic_name(&self) -> &str {
        &self.dynamic_name
    }

    pub fn name(&self, role: Role) -> &str {
        match role {
            Role::Static => &self.static_name,
            Role::Dynamic => &self.dynamic_name,
        }
    }

    /// Whether `name` is one of this version's generations.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }
}

/// The storage substrate plus the current version's names.
#[derive(Clone)]
pub struct VersionedStore {
    storage: Arc<dyn Storage>,
    names: CacheNames,
}

impl VersionedStore {
    pub fn new(storage: Arc<dyn Storage>, names: CacheNames) -> Self {
        Self { storage, names }
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Open (creating if needed) the current generation for `role`.
    pub async fn open(&self, role: Role) -> Result<Generation, Error> {
        let name = self.names.name(role).to_string();
        self.storage.open_generation(&name).await?;
        Ok(Generation { name, storage: Arc::clone(&self.storage) })
    }

    pub async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.storage.list_names().await
    }

    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.storage.delete(name).await
    }
}

/// Handle to one open generation.
#[derive(Clone)]
pub struct Generation {
    name: String,
    storage: Arc<dyn Storage>,
}

impl Generation {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the stored response for `request`. Non-`GET` requests never
    /// match.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Snapshot>, Error> {
        if !request.is_cacheable() {
            return Ok(None);
        }
        self.storage.get(&self.name, &request.cache_key()).await
    }

    /// Store `snapshot` for `request`, replacing any earlier capture.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for non-`GET` requests and for responses
    /// a generation may not hold (see [`Snapshot::is_storable`]).
    pub async fn put(&self, request: &Request, snapshot: &Snapshot) -> Result<(), Error> {
        if !request.is_cacheable() {
            return Err(Error::InvalidInput(format!("{} requests are not cacheable", request.method())));
        }
        if !snapshot.is_storable() {
            return Err(Error::InvalidInput(format!("response with status {} is not storable", snapshot.status)));
        }
        self.storage.put(&self.name, &request.cache_key(), snapshot).await
    }

    /// Store all pairs, or none.
    pub async fn put_all(&self, pairs: &[(Request, Snapshot)]) -> Result<(), Error> {
        let entries: Vec<(String, Snapshot)> = pairs
            .iter()
            .map(|(request, snapshot)| (request.cache_key(), snapshot.clone()))
            .collect();
        self.storage.put_all(&self.name, &entries).await
    }

    pub async fn urls(&self) -> Result<Vec<String>, Error> {
        self.storage.urls(&self.name).await
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generation").field("name", &self.name).finish()
    }
}
