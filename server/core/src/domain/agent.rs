// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Caravan agent owned by a player. Bonuses are mutated only by the external
/// leveling subsystem; the scheduler reads them when computing a mission
/// window and is otherwise hands-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub owner_id: PlayerId,
    pub name: String,
    pub level: u32,
    pub speed_bonus_percent: f64,
    pub success_bonus_percent: f64,
    pub reward_bonus_percent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(owner_id: PlayerId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            owner_id,
            name: name.into(),
            level: 1,
            speed_bonus_percent: 0.0,
            success_bonus_percent: 0.0,
            reward_bonus_percent: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id,
            name: self.name.clone(),
            level: self.level,
            speed_bonus_percent: self.speed_bonus_percent,
        }
    }
}

/// Denormalized agent fields embedded in mission responses so the client can
/// render without a second round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: AgentId,
    pub name: String,
    pub level: u32,
    pub speed_bonus_percent: f64,
}
