// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wire types shared with the server.
//!
//! The server serializes its domain aggregates directly, so the SDK re-uses
//! them rather than maintaining a parallel set of DTOs. Only the response
//! envelopes are SDK-local.

pub use waystation_core::application::lifecycle::{ActiveMissionView, MissionBoard, MissionOutcome};
pub use waystation_core::domain::agent::{AgentId, AgentSummary};
pub use waystation_core::domain::mission::{
    DefinitionSummary, InstanceId, ItemReward, MissionDefId, MissionDefinition, MissionInstance,
    MissionStatus, RiskLevel,
};
pub use waystation_core::domain::player::PlayerId;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMissionResponse {
    pub success: bool,
    pub mission_instance: ActiveMissionView,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMissionResponse {
    pub success: bool,
    pub mission_instance: MissionInstance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub balance: i64,
}
