// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::agent::{Agent, AgentId};
use crate::domain::mission::{InstanceId, MissionDefId, MissionDefinition, MissionInstance, MissionStatus};
use crate::domain::player::{Player, PlayerId};
use crate::domain::repository::{
    AgentRepository, DefinitionRepository, InstanceRepository, PlayerRepository, RepositoryError,
};

pub mod postgres;

fn poisoned() -> RepositoryError {
    RepositoryError::Database("mutex poisoned".to_string())
}

#[derive(Clone, Default)]
pub struct InMemoryDefinitionRepository {
    definitions: Arc<Mutex<HashMap<MissionDefId, MissionDefinition>>>,
}

impl InMemoryDefinitionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DefinitionRepository for InMemoryDefinitionRepository {
    async fn save(&self, definition: &MissionDefinition) -> Result<(), RepositoryError> {
        let mut definitions = self.definitions.lock().map_err(|_| poisoned())?;
        definitions.insert(definition.id.clone(), definition.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &MissionDefId,
    ) -> Result<Option<MissionDefinition>, RepositoryError> {
        let definitions = self.definitions.lock().map_err(|_| poisoned())?;
        Ok(definitions.get(id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<MissionDefinition>, RepositoryError> {
        let definitions = self.definitions.lock().map_err(|_| poisoned())?;
        let mut active: Vec<MissionDefinition> =
            definitions.values().filter(|d| d.active).cloned().collect();
        active.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(active)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAgentRepository {
    agents: Arc<Mutex<HashMap<AgentId, Agent>>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        let mut agents = self.agents.lock().map_err(|_| poisoned())?;
        agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let agents = self.agents.lock().map_err(|_| poisoned())?;
        Ok(agents.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: PlayerId) -> Result<Vec<Agent>, RepositoryError> {
        let agents = self.agents.lock().map_err(|_| poisoned())?;
        Ok(agents
            .values()
            .filter(|a| a.owner_id == owner)
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPlayerRepository {
    players: Arc<Mutex<HashMap<PlayerId, Player>>>,
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    async fn save(&self, player: &Player) -> Result<(), RepositoryError> {
        let mut players = self.players.lock().map_err(|_| poisoned())?;
        players.insert(player.id, player.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PlayerId) -> Result<Option<Player>, RepositoryError> {
        let players = self.players.lock().map_err(|_| poisoned())?;
        Ok(players.get(&id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryInstanceRepository {
    instances: Arc<Mutex<HashMap<InstanceId, MissionInstance>>>,
}

impl InMemoryInstanceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceRepository for InMemoryInstanceRepository {
    async fn create_active(&self, instance: &MissionInstance) -> Result<(), RepositoryError> {
        let mut instances = self.instances.lock().map_err(|_| poisoned())?;
        // Uniqueness backstop for (owner, caravan_slot) among active rows,
        // mirroring the partial unique index in the Postgres schema.
        let collision = instances.values().any(|existing| {
            existing.status == MissionStatus::Active
                && existing.owner_id == instance.owner_id
                && existing.caravan_slot == instance.caravan_slot
        });
        if collision {
            return Err(RepositoryError::Conflict(format!(
                "caravan slot {} already occupied for owner {}",
                instance.caravan_slot, instance.owner_id
            )));
        }
        instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: InstanceId) -> Result<Option<MissionInstance>, RepositoryError> {
        let instances = self.instances.lock().map_err(|_| poisoned())?;
        Ok(instances.get(&id).cloned())
    }

    async fn list_active_by_owner(
        &self,
        owner: PlayerId,
    ) -> Result<Vec<MissionInstance>, RepositoryError> {
        let instances = self.instances.lock().map_err(|_| poisoned())?;
        let mut active: Vec<MissionInstance> = instances
            .values()
            .filter(|i| i.owner_id == owner && i.status == MissionStatus::Active)
            .cloned()
            .collect();
        active.sort_by_key(|i| i.caravan_slot);
        Ok(active)
    }

    async fn update(&self, instance: &MissionInstance) -> Result<(), RepositoryError> {
        let mut instances = self.instances.lock().map_err(|_| poisoned())?;
        if !instances.contains_key(&instance.id) {
            return Err(RepositoryError::NotFound);
        }
        instances.insert(instance.id, instance.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_active_rejects_duplicate_owner_slot() {
        let repo = InMemoryInstanceRepository::new();
        let owner = PlayerId::new();
        let first = MissionInstance::new(
            owner,
            MissionDefId::new("silk-road"),
            AgentId::new(),
            1,
            Utc::now(),
            Utc::now(),
        );
        let second = MissionInstance::new(
            owner,
            MissionDefId::new("amber-run"),
            AgentId::new(),
            1,
            Utc::now(),
            Utc::now(),
        );

        repo.create_active(&first).await.expect("first insert");
        let err = repo.create_active(&second).await.expect_err("slot collision");
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_completed_instance_frees_the_slot() {
        let repo = InMemoryInstanceRepository::new();
        let owner = PlayerId::new();
        let mut first = MissionInstance::new(
            owner,
            MissionDefId::new("silk-road"),
            AgentId::new(),
            1,
            Utc::now(),
            Utc::now(),
        );
        repo.create_active(&first).await.expect("insert");

        first.complete(Some(10), None, Utc::now()).expect("complete");
        repo.update(&first).await.expect("update");

        let replacement = MissionInstance::new(
            owner,
            MissionDefId::new("amber-run"),
            AgentId::new(),
            1,
            Utc::now(),
            Utc::now(),
        );
        repo.create_active(&replacement)
            .await
            .expect("slot 1 is free again");

        let active = repo.list_active_by_owner(owner).await.expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].mission_def_id, MissionDefId::new("amber-run"));
    }

    #[tokio::test]
    async fn test_same_slot_different_owner_is_fine() {
        let repo = InMemoryInstanceRepository::new();
        let a = MissionInstance::new(
            PlayerId::new(),
            MissionDefId::new("silk-road"),
            AgentId::new(),
            1,
            Utc::now(),
            Utc::now(),
        );
        let b = MissionInstance::new(
            PlayerId::new(),
            MissionDefId::new("silk-road"),
            AgentId::new(),
            1,
            Utc::now(),
            Utc::now(),
        );
        repo.create_active(&a).await.expect("owner a");
        repo.create_active(&b).await.expect("owner b");
    }
}
