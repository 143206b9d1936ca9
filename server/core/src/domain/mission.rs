// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::agent::AgentId;
use crate::domain::player::PlayerId;

/// Mission-template identifier. Definitions are authored content, so the id
/// is a human-readable slug rather than a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissionDefId(pub String);

impl MissionDefId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MissionDefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReward {
    pub item_key: String,
    pub qty: u32,
}

/// Immutable mission template describing a caravan route. Published by the
/// content pipeline; read-only to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionDefinition {
    pub id: MissionDefId,
    pub name: String,
    pub from_hub: String,
    pub to_hub: String,
    pub distance: u32,
    pub base_duration_seconds: i64,
    pub base_reward: i64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub item_rewards: Vec<ItemReward>,
    pub active: bool,
}

impl MissionDefinition {
    pub fn summary(&self) -> DefinitionSummary {
        DefinitionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            from_hub: self.from_hub.clone(),
            to_hub: self.to_hub.clone(),
            risk_level: self.risk_level,
            base_duration_seconds: self.base_duration_seconds,
        }
    }
}

/// Denormalized definition fields embedded in mission responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSummary {
    pub id: MissionDefId,
    pub name: String,
    pub from_hub: String,
    pub to_hub: String,
    pub risk_level: RiskLevel,
    pub base_duration_seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Error)]
pub enum MissionTransitionError {
    #[error("Mission is not active")]
    NotActive,
}

/// A time-boxed attempt at a mission definition, bound to one agent and one
/// caravan slot. Created only by the start operation; terminal transitions
/// are driven by the completion subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionInstance {
    pub id: InstanceId,
    pub owner_id: PlayerId,
    pub mission_def_id: MissionDefId,
    pub agent_id: AgentId,
    pub status: MissionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub caravan_slot: u32,
    pub actual_reward: Option<i64>,
    pub items_received: Option<Vec<ItemReward>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl MissionInstance {
    pub fn new(
        owner_id: PlayerId,
        mission_def_id: MissionDefId,
        agent_id: AgentId,
        caravan_slot: u32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InstanceId::new(),
            owner_id,
            mission_def_id,
            agent_id,
            status: MissionStatus::Active,
            start_time,
            end_time,
            caravan_slot,
            actual_reward: None,
            items_received: None,
            completed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MissionStatus::Active
    }

    /// Terminal success transition. Reward values come from the external
    /// completion roll and are recorded verbatim, never computed here.
    pub fn complete(
        &mut self,
        actual_reward: Option<i64>,
        items_received: Option<Vec<ItemReward>>,
        at: DateTime<Utc>,
    ) -> Result<(), MissionTransitionError> {
        if !self.is_active() {
            return Err(MissionTransitionError::NotActive);
        }
        self.status = MissionStatus::Completed;
        self.actual_reward = actual_reward;
        self.items_received = items_received;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn fail(&mut self, at: DateTime<Utc>) -> Result<(), MissionTransitionError> {
        if !self.is_active() {
            return Err(MissionTransitionError::NotActive);
        }
        self.status = MissionStatus::Failed;
        self.completed_at = Some(at);
        Ok(())
    }
}
