// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Mission Lifecycle Service
//!
//! Validates start preconditions, allocates the caravan slot, computes the
//! adjusted mission window, and persists the new instance.
//!
//! ## Start pipeline
//!
//! ```text
//! StartMissionCommand
//!   └─ per-owner lock acquired              ← serializes validate-then-write
//!         └─ tokio::join! reads             ← catalog, agent, player, actives
//!         └─ ordered validations            ← distinct error per failure
//!         └─ lowest_free_slot / mission_window
//!         └─ InstanceRepository::create_active  ← uniqueness backstop
//! ```
//!
//! Two concurrent starts from one owner would otherwise both observe the same
//! free-slot snapshot and claim the same slot. The per-owner lock closes that
//! race; `create_active` still enforces `(owner, caravan_slot)` uniqueness at
//! the storage layer as a backstop.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::application::catalog::DefinitionCatalog;
use crate::domain::agent::{AgentId, AgentSummary};
use crate::domain::errors::MissionError;
use crate::domain::mission::{
    DefinitionSummary, InstanceId, ItemReward, MissionDefinition, MissionInstance,
};
use crate::domain::player::PlayerId;
use crate::domain::repository::{
    AgentRepository, DefinitionRepository, InstanceRepository, PlayerRepository,
};
use crate::domain::schedule::{mission_window, Clock};
use crate::domain::slots::lowest_free_slot;

#[derive(Debug, Clone, Deserialize)]
pub struct StartMissionCommand {
    pub mission_id: String,
    pub agent_id: String,
}

/// Reward values from the external completion roll, recorded verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionOutcome {
    pub actual_reward: Option<i64>,
    pub items_received: Option<Vec<ItemReward>>,
}

/// A mission instance denormalized with its definition and agent summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMissionView {
    #[serde(flatten)]
    pub instance: MissionInstance,
    pub definition: DefinitionSummary,
    pub agent: AgentSummary,
}

/// Response payload for the listing operation: the catalog snapshot plus the
/// requester's active instances, read fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionBoard {
    pub mission_defs: Vec<MissionDefinition>,
    pub active_missions: Vec<ActiveMissionView>,
}

#[async_trait]
pub trait MissionService: Send + Sync {
    async fn start_mission(
        &self,
        owner: PlayerId,
        command: StartMissionCommand,
    ) -> Result<ActiveMissionView, MissionError>;

    async fn list_missions(&self, owner: PlayerId) -> Result<MissionBoard, MissionError>;

    async fn complete_mission(
        &self,
        owner: PlayerId,
        instance_id: InstanceId,
        outcome: MissionOutcome,
    ) -> Result<MissionInstance, MissionError>;
}

pub struct StandardMissionService {
    catalog: Arc<DefinitionCatalog>,
    definitions: Arc<dyn DefinitionRepository>,
    agents: Arc<dyn AgentRepository>,
    players: Arc<dyn PlayerRepository>,
    instances: Arc<dyn InstanceRepository>,
    clock: Arc<dyn Clock>,
    start_locks: DashMap<PlayerId, Arc<Mutex<()>>>,
}

impl StandardMissionService {
    pub fn new(
        catalog: Arc<DefinitionCatalog>,
        definitions: Arc<dyn DefinitionRepository>,
        agents: Arc<dyn AgentRepository>,
        players: Arc<dyn PlayerRepository>,
        instances: Arc<dyn InstanceRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            definitions,
            agents,
            players,
            instances,
            clock,
            start_locks: DashMap::new(),
        }
    }

    fn owner_lock(&self, owner: PlayerId) -> Arc<Mutex<()>> {
        self.start_locks
            .entry(owner)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn resolve_definition_summary(
        &self,
        snapshot: &[MissionDefinition],
        instance: &MissionInstance,
    ) -> Result<DefinitionSummary, MissionError> {
        if let Some(def) = snapshot.iter().find(|d| d.id == instance.mission_def_id) {
            return Ok(def.summary());
        }
        // Deactivated mid-flight: definitions are immutable once published,
        // so the direct read still resolves.
        let def = self
            .definitions
            .find_by_id(&instance.mission_def_id)
            .await?
            .ok_or(MissionError::DefinitionNotFound)?;
        Ok(def.summary())
    }
}

#[async_trait]
impl MissionService for StandardMissionService {
    #[instrument(skip(self, command), fields(owner = %owner, mission = %command.mission_id))]
    async fn start_mission(
        &self,
        owner: PlayerId,
        command: StartMissionCommand,
    ) -> Result<ActiveMissionView, MissionError> {
        if command.mission_id.trim().is_empty() {
            return Err(MissionError::MissionIdRequired);
        }
        if command.agent_id.trim().is_empty() {
            return Err(MissionError::AgentIdRequired);
        }
        let agent_id =
            AgentId::from_string(command.agent_id.trim()).map_err(|_| MissionError::AgentNotFound)?;

        let lock = self.owner_lock(owner);
        let _guard = lock.lock().await;

        // The validation reads are independent; fetch them concurrently
        // before the single write.
        let (catalog, agent, player, active) = tokio::join!(
            self.catalog.get(),
            self.agents.find_by_id(agent_id),
            self.players.find_by_id(owner),
            self.instances.list_active_by_owner(owner),
        );
        let catalog = catalog?;
        let agent = agent?;
        let player = player?;
        let active = active?;

        let definition = catalog
            .iter()
            .find(|d| d.active && d.id.as_str() == command.mission_id.trim())
            .cloned()
            .ok_or(MissionError::DefinitionNotFound)?;

        let agent = agent
            .filter(|a| a.owner_id == owner)
            .ok_or(MissionError::AgentNotFound)?;

        if active.iter().any(|m| m.agent_id == agent.id) {
            return Err(MissionError::AgentBusy {
                name: agent.name.clone(),
            });
        }

        if active.iter().any(|m| m.mission_def_id == definition.id) {
            return Err(MissionError::MissionInProgress);
        }

        let player = player.ok_or(MissionError::Storage(
            crate::domain::repository::RepositoryError::NotFound,
        ))?;
        let occupied: HashSet<u32> = active.iter().map(|m| m.caravan_slot).collect();
        let slot = lowest_free_slot(player.slot_capacity(), &occupied)?;

        let (start_time, end_time) = mission_window(
            self.clock.now(),
            definition.base_duration_seconds,
            agent.speed_bonus_percent,
        );

        let instance = MissionInstance::new(
            owner,
            definition.id.clone(),
            agent.id,
            slot,
            start_time,
            end_time,
        );
        self.instances.create_active(&instance).await?;

        info!(
            instance = %instance.id,
            slot = instance.caravan_slot,
            end_time = %instance.end_time,
            "mission started"
        );

        Ok(ActiveMissionView {
            instance,
            definition: definition.summary(),
            agent: agent.summary(),
        })
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn list_missions(&self, owner: PlayerId) -> Result<MissionBoard, MissionError> {
        let (catalog, active, agents) = tokio::join!(
            self.catalog.get(),
            self.instances.list_active_by_owner(owner),
            self.agents.list_by_owner(owner),
        );
        let catalog = catalog?;
        let active = active?;
        let agents = agents?;

        let mut active_missions = Vec::with_capacity(active.len());
        for instance in active {
            let definition = self.resolve_definition_summary(&catalog, &instance).await?;
            let agent = agents
                .iter()
                .find(|a| a.id == instance.agent_id)
                .map(|a| a.summary())
                .ok_or(MissionError::AgentNotFound)?;
            active_missions.push(ActiveMissionView {
                instance,
                definition,
                agent,
            });
        }

        Ok(MissionBoard {
            mission_defs: catalog.as_ref().clone(),
            active_missions,
        })
    }

    #[instrument(skip(self, outcome), fields(owner = %owner, instance = %instance_id))]
    async fn complete_mission(
        &self,
        owner: PlayerId,
        instance_id: InstanceId,
        outcome: MissionOutcome,
    ) -> Result<MissionInstance, MissionError> {
        let mut instance = self
            .instances
            .find_by_id(instance_id)
            .await?
            .filter(|i| i.owner_id == owner)
            .ok_or(MissionError::InstanceNotFound)?;

        instance.complete(outcome.actual_reward, outcome.items_received, self.clock.now())?;
        self.instances.update(&instance).await?;

        info!(slot = instance.caravan_slot, "mission completed, slot released");
        Ok(instance)
    }
}
