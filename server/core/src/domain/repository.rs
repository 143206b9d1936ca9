// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root, following the DDD
//! Repository pattern: one repository per aggregate, interface defined in the
//! domain layer, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `DefinitionRepository` | `MissionDefinition` | `InMemoryDefinitionRepository`, `PostgresDefinitionRepository` |
//! | `AgentRepository` | `Agent` | `InMemoryAgentRepository`, `PostgresAgentRepository` |
//! | `PlayerRepository` | `Player` | `InMemoryPlayerRepository`, `PostgresPlayerRepository` |
//! | `InstanceRepository` | `MissionInstance` | `InMemoryInstanceRepository`, `PostgresInstanceRepository` |
//!
//! Concrete implementations are selected at startup from configuration.
//! In-memory implementations serve development and testing; PostgreSQL
//! implementations serve production.
//!
//! `InstanceRepository::create_active` doubles as the storage-layer backstop
//! for the caravan-slot uniqueness invariant: it must reject an insert whose
//! `(owner_id, caravan_slot)` collides with another active row, regardless of
//! what the service layer validated beforehand.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::agent::{Agent, AgentId};
use crate::domain::mission::{InstanceId, MissionDefId, MissionDefinition, MissionInstance};
use crate::domain::player::{Player, PlayerId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found")]
    NotFound,
}

/// Repository interface for MissionDefinition aggregates
#[async_trait]
pub trait DefinitionRepository: Send + Sync {
    /// Save definition (create or update)
    async fn save(&self, definition: &MissionDefinition) -> Result<(), RepositoryError>;

    /// Find definition by ID
    async fn find_by_id(&self, id: &MissionDefId) -> Result<Option<MissionDefinition>, RepositoryError>;

    /// List the full active catalog
    async fn list_active(&self) -> Result<Vec<MissionDefinition>, RepositoryError>;
}

/// Repository interface for Agent aggregates
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Save agent (create or update)
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError>;

    /// Find agent by ID
    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError>;

    /// List all agents owned by a player
    async fn list_by_owner(&self, owner: PlayerId) -> Result<Vec<Agent>, RepositoryError>;
}

/// Repository interface for Player aggregates
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Save player (create or update)
    async fn save(&self, player: &Player) -> Result<(), RepositoryError>;

    /// Find player by ID
    async fn find_by_id(&self, id: PlayerId) -> Result<Option<Player>, RepositoryError>;
}

/// Repository interface for MissionInstance aggregates
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Persist a newly started instance. Must reject a duplicate
    /// `(owner_id, caravan_slot)` among active rows with
    /// [`RepositoryError::Conflict`].
    async fn create_active(&self, instance: &MissionInstance) -> Result<(), RepositoryError>;

    /// Find instance by ID
    async fn find_by_id(&self, id: InstanceId) -> Result<Option<MissionInstance>, RepositoryError>;

    /// List the owner's active instances, always read fresh
    async fn list_active_by_owner(&self, owner: PlayerId) -> Result<Vec<MissionInstance>, RepositoryError>;

    /// Update an existing instance (terminal transitions)
    async fn update(&self, instance: &MissionInstance) -> Result<(), RepositoryError>;
}
