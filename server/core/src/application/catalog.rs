// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Definition Catalog Cache
//!
//! Process-wide TTL cache over the mission-template catalog. Whole-catalog
//! granularity only: `get()` serves the cached snapshot while it is younger
//! than the TTL, otherwise reloads the full active catalog and atomically
//! replaces the snapshot. Reads are idempotent and replacement is a snapshot
//! swap, so no async locking is needed; concurrent misses may each trigger an
//! independent reload, which is wasteful but not unsafe (catalog reads are
//! cheap and the content changes rarely).
//!
//! Reload failures propagate to the caller. A caller may keep serving a
//! previously obtained snapshot, but the cache itself never returns data
//! staler than the TTL plus one in-flight reload.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::mission::MissionDefinition;
use crate::domain::repository::{DefinitionRepository, RepositoryError};
use crate::domain::schedule::Clock;

pub const DEFAULT_CATALOG_TTL_MS: u64 = 30_000;

struct CatalogSnapshot {
    definitions: Arc<Vec<MissionDefinition>>,
    fetched_at: DateTime<Utc>,
}

pub struct DefinitionCatalog {
    repository: Arc<dyn DefinitionRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    snapshot: RwLock<Option<CatalogSnapshot>>,
}

impl DefinitionCatalog {
    pub fn new(repository: Arc<dyn DefinitionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl_ms(repository, clock, DEFAULT_CATALOG_TTL_MS)
    }

    pub fn with_ttl_ms(
        repository: Arc<dyn DefinitionRepository>,
        clock: Arc<dyn Clock>,
        ttl_ms: u64,
    ) -> Self {
        Self {
            repository,
            clock,
            ttl: Duration::milliseconds(ttl_ms as i64),
            snapshot: RwLock::new(None),
        }
    }

    /// Return the active-definition catalog, reloading when the snapshot has
    /// aged past the TTL.
    pub async fn get(&self) -> Result<Arc<Vec<MissionDefinition>>, RepositoryError> {
        let now = self.clock.now();
        if let Some(snapshot) = self.snapshot.read().as_ref() {
            if now - snapshot.fetched_at < self.ttl {
                return Ok(snapshot.definitions.clone());
            }
        }
        self.reload(now).await
    }

    /// Reload unconditionally, bypassing the TTL.
    pub async fn force_refresh(&self) -> Result<Arc<Vec<MissionDefinition>>, RepositoryError> {
        let now = self.clock.now();
        self.reload(now).await
    }

    async fn reload(&self, now: DateTime<Utc>) -> Result<Arc<Vec<MissionDefinition>>, RepositoryError> {
        let definitions = Arc::new(self.repository.list_active().await?);
        debug!(count = definitions.len(), "definition catalog reloaded");
        *self.snapshot.write() = Some(CatalogSnapshot {
            definitions: definitions.clone(),
            fetched_at: now,
        });
        Ok(definitions)
    }
}
