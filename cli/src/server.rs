// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Daemon implementation: configuration discovery, repository wiring per
//! storage backend, demo seeding for the in-memory backend, and the axum
//! server with graceful shutdown.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use waystation_core::application::catalog::DefinitionCatalog;
use waystation_core::application::lifecycle::StandardMissionService;
use waystation_core::domain::agent::Agent;
use waystation_core::domain::mission::{MissionDefId, MissionDefinition, RiskLevel};
use waystation_core::domain::player::{Player, PlayerId};
use waystation_core::domain::repository::{
    AgentRepository, DefinitionRepository, InstanceRepository, PlayerRepository, StorageBackend,
};
use waystation_core::domain::schedule::SystemClock;
use waystation_core::domain::server_config::{ServerConfigManifest, TokenGrant};
use waystation_core::infrastructure::auth::StaticTokenAuth;
use waystation_core::infrastructure::repositories::postgres::{
    ensure_schema, PostgresAgentRepository, PostgresDefinitionRepository,
    PostgresInstanceRepository, PostgresPlayerRepository,
};
use waystation_core::infrastructure::repositories::{
    InMemoryAgentRepository, InMemoryDefinitionRepository, InMemoryInstanceRepository,
    InMemoryPlayerRepository,
};
use waystation_core::presentation::api::{app, AppState};

struct Repositories {
    definitions: Arc<dyn DefinitionRepository>,
    agents: Arc<dyn AgentRepository>,
    players: Arc<dyn PlayerRepository>,
    instances: Arc<dyn InstanceRepository>,
}

pub async fn serve(config_path: Option<&Path>) -> Result<()> {
    let config = ServerConfigManifest::discover(config_path)
        .await
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    info!("Configuration loaded: node={}", config.metadata.name);

    let mut grants = config.spec.auth.clone();
    let repositories = match config.storage_backend() {
        StorageBackend::InMemory => {
            let repositories = Repositories {
                definitions: Arc::new(InMemoryDefinitionRepository::new()),
                agents: Arc::new(InMemoryAgentRepository::new()),
                players: Arc::new(InMemoryPlayerRepository::new()),
                instances: Arc::new(InMemoryInstanceRepository::new()),
            };
            seed_demo_data(&repositories, &mut grants).await?;
            repositories
        }
        StorageBackend::PostgreSQL(pg) => {
            let pool = sqlx::postgres::PgPool::connect(&pg.connection_string)
                .await
                .context("Failed to connect to PostgreSQL")?;
            ensure_schema(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to apply schema: {}", e))?;
            Repositories {
                definitions: Arc::new(PostgresDefinitionRepository::new(pool.clone())),
                agents: Arc::new(PostgresAgentRepository::new(pool.clone())),
                players: Arc::new(PostgresPlayerRepository::new(pool.clone())),
                instances: Arc::new(PostgresInstanceRepository::new(pool)),
            }
        }
    };

    let clock = Arc::new(SystemClock);
    let catalog = Arc::new(DefinitionCatalog::with_ttl_ms(
        repositories.definitions.clone(),
        clock.clone(),
        config.spec.catalog.ttl_ms,
    ));
    let missions = Arc::new(StandardMissionService::new(
        catalog,
        repositories.definitions.clone(),
        repositories.agents.clone(),
        repositories.players.clone(),
        repositories.instances.clone(),
        clock,
    ));
    let auth = Arc::new(StaticTokenAuth::from_grants(&grants));

    let router = app(AppState { missions, auth });

    let addr = format!("{}:{}", config.spec.server.host, config.spec.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Waystation daemon listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Daemon shutting down");
    Ok(())
}

/// Populate the in-memory backend with a playable world. Players referenced
/// by configured token grants are created with a default slot pool; absent
/// any grant, a demo player and token are generated and logged.
async fn seed_demo_data(repositories: &Repositories, grants: &mut Vec<TokenGrant>) -> Result<()> {
    let routes = [
        ("silk-road", "Silk Road", "Kareth", "Ostrava", 140, 300, RiskLevel::Low),
        ("amber-run", "Amber Run", "Ostrava", "Veliko", 260, 600, RiskLevel::Medium),
        ("salt-track", "Salt Track", "Veliko", "Kareth", 420, 900, RiskLevel::High),
    ];
    for (id, name, from, to, distance, duration, risk) in routes {
        repositories
            .definitions
            .save(&MissionDefinition {
                id: MissionDefId::new(id),
                name: name.to_string(),
                from_hub: from.to_string(),
                to_hub: to.to_string(),
                distance,
                base_duration_seconds: duration,
                base_reward: duration / 4,
                risk_level: risk,
                item_rewards: Vec::new(),
                active: true,
            })
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed definition: {}", e))?;
    }

    if grants.is_empty() {
        let token = format!("dev-{}", uuid::Uuid::new_v4().simple());
        grants.push(TokenGrant {
            token: token.clone(),
            player_id: PlayerId::new(),
        });
        info!("No auth grants configured; demo token: {}", token);
    }

    for grant in grants.iter() {
        let now = chrono::Utc::now();
        let player = Player {
            id: grant.player_id,
            name: format!("Merchant {}", grant.player_id),
            base_slots: 3,
            premium_slots: 0,
            created_at: now,
            updated_at: now,
        };
        repositories
            .players
            .save(&player)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed player: {}", e))?;

        for (name, speed) in [("Sable", 40.0), ("Wren", 0.0)] {
            let mut agent = Agent::new(player.id, name);
            agent.speed_bonus_percent = speed;
            repositories
                .agents
                .save(&agent)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to seed agent: {}", e))?;
            info!(player = %player.id, agent = %agent.id, name, "seeded agent");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
