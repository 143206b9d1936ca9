// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Repositories
//!
//! Production repository implementations backed by PostgreSQL via `sqlx`.
//! Translates between the domain aggregates and the relational schema below.
//!
//! The `mission_instances_owner_slot_active` partial unique index is the
//! storage-layer backstop for the caravan-slot invariant: even if two starts
//! race past the service-level lock, at most one insert for a given
//! `(owner_id, caravan_slot)` among active rows can succeed.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::agent::{Agent, AgentId};
use crate::domain::mission::{
    InstanceId, ItemReward, MissionDefId, MissionDefinition, MissionInstance, MissionStatus,
    RiskLevel,
};
use crate::domain::player::{Player, PlayerId};
use crate::domain::repository::{
    AgentRepository, DefinitionRepository, InstanceRepository, PlayerRepository, RepositoryError,
};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mission_definitions (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    from_hub TEXT NOT NULL,
    to_hub TEXT NOT NULL,
    distance INTEGER NOT NULL,
    base_duration_seconds BIGINT NOT NULL,
    base_reward BIGINT NOT NULL,
    risk_level TEXT NOT NULL,
    item_rewards JSONB NOT NULL DEFAULT '[]'::jsonb,
    active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS players (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    base_slots INTEGER NOT NULL,
    premium_slots INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS agents (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES players(id),
    name TEXT NOT NULL,
    level INTEGER NOT NULL,
    speed_bonus_percent DOUBLE PRECISION NOT NULL,
    success_bonus_percent DOUBLE PRECISION NOT NULL,
    reward_bonus_percent DOUBLE PRECISION NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS mission_instances (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES players(id),
    mission_def_id TEXT NOT NULL REFERENCES mission_definitions(id),
    agent_id UUID NOT NULL REFERENCES agents(id),
    status TEXT NOT NULL,
    start_time TIMESTAMPTZ NOT NULL,
    end_time TIMESTAMPTZ NOT NULL,
    caravan_slot INTEGER NOT NULL,
    actual_reward BIGINT,
    items_received JSONB,
    completed_at TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS mission_instances_owner_slot_active
    ON mission_instances (owner_id, caravan_slot)
    WHERE status = 'active';

CREATE INDEX IF NOT EXISTS mission_instances_owner_active
    ON mission_instances (owner_id)
    WHERE status = 'active';
"#;

/// Apply the schema. Idempotent; run at startup for the postgres backend.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), RepositoryError> {
    for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to apply schema: {}", e)))?;
    }
    Ok(())
}

fn risk_level_str(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "LOW",
        RiskLevel::Medium => "MEDIUM",
        RiskLevel::High => "HIGH",
    }
}

fn parse_risk_level(s: &str) -> RiskLevel {
    match s {
        "HIGH" => RiskLevel::High,
        "MEDIUM" => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

fn status_str(status: MissionStatus) -> &'static str {
    match status {
        MissionStatus::Active => "active",
        MissionStatus::Completed => "completed",
        MissionStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> MissionStatus {
    match s {
        "completed" => MissionStatus::Completed,
        "failed" => MissionStatus::Failed,
        _ => MissionStatus::Active,
    }
}

pub struct PostgresDefinitionRepository {
    pool: PgPool,
}

impl PostgresDefinitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_definition(row: &sqlx::postgres::PgRow) -> Result<MissionDefinition, RepositoryError> {
        let item_rewards: serde_json::Value = row.get("item_rewards");
        let item_rewards: Vec<ItemReward> = serde_json::from_value(item_rewards)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let risk_level: String = row.get("risk_level");
        Ok(MissionDefinition {
            id: MissionDefId::new(row.get::<String, _>("id")),
            name: row.get("name"),
            from_hub: row.get("from_hub"),
            to_hub: row.get("to_hub"),
            distance: row.get::<i32, _>("distance") as u32,
            base_duration_seconds: row.get("base_duration_seconds"),
            base_reward: row.get("base_reward"),
            risk_level: parse_risk_level(&risk_level),
            item_rewards,
            active: row.get("active"),
        })
    }
}

#[async_trait]
impl DefinitionRepository for PostgresDefinitionRepository {
    async fn save(&self, definition: &MissionDefinition) -> Result<(), RepositoryError> {
        let item_rewards = serde_json::to_value(&definition.item_rewards)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO mission_definitions (
                id, name, from_hub, to_hub, distance,
                base_duration_seconds, base_reward, risk_level, item_rewards, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                from_hub = EXCLUDED.from_hub,
                to_hub = EXCLUDED.to_hub,
                distance = EXCLUDED.distance,
                base_duration_seconds = EXCLUDED.base_duration_seconds,
                base_reward = EXCLUDED.base_reward,
                risk_level = EXCLUDED.risk_level,
                item_rewards = EXCLUDED.item_rewards,
                active = EXCLUDED.active
            "#,
        )
        .bind(definition.id.as_str())
        .bind(&definition.name)
        .bind(&definition.from_hub)
        .bind(&definition.to_hub)
        .bind(definition.distance as i32)
        .bind(definition.base_duration_seconds)
        .bind(definition.base_reward)
        .bind(risk_level_str(definition.risk_level))
        .bind(item_rewards)
        .bind(definition.active)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save definition: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &MissionDefId,
    ) -> Result<Option<MissionDefinition>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM mission_definitions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_definition).transpose()
    }

    async fn list_active(&self) -> Result<Vec<MissionDefinition>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM mission_definitions WHERE active = TRUE ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_definition).collect()
    }
}

pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_agent(row: &sqlx::postgres::PgRow) -> Agent {
        Agent {
            id: AgentId(row.get("id")),
            owner_id: PlayerId(row.get("owner_id")),
            name: row.get("name"),
            level: row.get::<i32, _>("level") as u32,
            speed_bonus_percent: row.get("speed_bonus_percent"),
            success_bonus_percent: row.get("success_bonus_percent"),
            reward_bonus_percent: row.get("reward_bonus_percent"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO agents (
                id, owner_id, name, level,
                speed_bonus_percent, success_bonus_percent, reward_bonus_percent,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                level = EXCLUDED.level,
                speed_bonus_percent = EXCLUDED.speed_bonus_percent,
                success_bonus_percent = EXCLUDED.success_bonus_percent,
                reward_bonus_percent = EXCLUDED.reward_bonus_percent,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(agent.id.0)
        .bind(agent.owner_id.0)
        .bind(&agent.name)
        .bind(agent.level as i32)
        .bind(agent.speed_bonus_percent)
        .bind(agent.success_bonus_percent)
        .bind(agent.reward_bonus_percent)
        .bind(agent.created_at)
        .bind(agent.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save agent: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_agent))
    }

    async fn list_by_owner(&self, owner: PlayerId) -> Result<Vec<Agent>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM agents WHERE owner_id = $1 ORDER BY created_at")
            .bind(owner.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_agent).collect())
    }
}

pub struct PostgresPlayerRepository {
    pool: PgPool,
}

impl PostgresPlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlayerRepository for PostgresPlayerRepository {
    async fn save(&self, player: &Player) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO players (id, name, base_slots, premium_slots, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                base_slots = EXCLUDED.base_slots,
                premium_slots = EXCLUDED.premium_slots,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(player.id.0)
        .bind(&player.name)
        .bind(player.base_slots as i32)
        .bind(player.premium_slots as i32)
        .bind(player.created_at)
        .bind(player.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save player: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: PlayerId) -> Result<Option<Player>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM players WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|row| Player {
            id: PlayerId(row.get("id")),
            name: row.get("name"),
            base_slots: row.get::<i32, _>("base_slots") as u32,
            premium_slots: row.get::<i32, _>("premium_slots") as u32,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }
}

pub struct PostgresInstanceRepository {
    pool: PgPool,
}

impl PostgresInstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_instance(row: &sqlx::postgres::PgRow) -> Result<MissionInstance, RepositoryError> {
        let items_received: Option<serde_json::Value> = row.get("items_received");
        let items_received = items_received
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let status: String = row.get("status");
        Ok(MissionInstance {
            id: InstanceId(row.get("id")),
            owner_id: PlayerId(row.get("owner_id")),
            mission_def_id: MissionDefId::new(row.get::<String, _>("mission_def_id")),
            agent_id: AgentId(row.get("agent_id")),
            status: parse_status(&status),
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            caravan_slot: row.get::<i32, _>("caravan_slot") as u32,
            actual_reward: row.get("actual_reward"),
            items_received,
            completed_at: row.get("completed_at"),
        })
    }

    fn items_value(instance: &MissionInstance) -> Result<Option<serde_json::Value>, RepositoryError> {
        instance
            .items_received
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl InstanceRepository for PostgresInstanceRepository {
    async fn create_active(&self, instance: &MissionInstance) -> Result<(), RepositoryError> {
        let items_received = Self::items_value(instance)?;

        let result = sqlx::query(
            r#"
            INSERT INTO mission_instances (
                id, owner_id, mission_def_id, agent_id, status,
                start_time, end_time, caravan_slot,
                actual_reward, items_received, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(instance.id.0)
        .bind(instance.owner_id.0)
        .bind(instance.mission_def_id.as_str())
        .bind(instance.agent_id.0)
        .bind(status_str(instance.status))
        .bind(instance.start_time)
        .bind(instance.end_time)
        .bind(instance.caravan_slot as i32)
        .bind(instance.actual_reward)
        .bind(items_received)
        .bind(instance.completed_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(RepositoryError::Conflict(format!(
                    "caravan slot {} already occupied for owner {}",
                    instance.caravan_slot, instance.owner_id
                )))
            }
            Err(e) => Err(RepositoryError::Database(format!(
                "Failed to create instance: {}",
                e
            ))),
        }
    }

    async fn find_by_id(&self, id: InstanceId) -> Result<Option<MissionInstance>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM mission_instances WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_instance).transpose()
    }

    async fn list_active_by_owner(
        &self,
        owner: PlayerId,
    ) -> Result<Vec<MissionInstance>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM mission_instances WHERE owner_id = $1 AND status = 'active' ORDER BY caravan_slot",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_instance).collect()
    }

    async fn update(&self, instance: &MissionInstance) -> Result<(), RepositoryError> {
        let items_received = Self::items_value(instance)?;

        let result = sqlx::query(
            r#"
            UPDATE mission_instances SET
                status = $2,
                actual_reward = $3,
                items_received = $4,
                completed_at = $5
            WHERE id = $1
            "#,
        )
        .bind(instance.id.0)
        .bind(status_str(instance.status))
        .bind(instance.actual_reward)
        .bind(items_received)
        .bind(instance.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update instance: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
