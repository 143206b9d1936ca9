// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the mission lifecycle service
//!
//! These tests drive `StandardMissionService` end to end against the
//! in-memory repositories:
//! 1. Slot allocation and reuse across start/complete
//! 2. Validation ordering and distinct conflict errors
//! 3. Capacity exhaustion reporting
//! 4. The concurrent-start slot-uniqueness invariant

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use waystation_core::application::catalog::DefinitionCatalog;
use waystation_core::application::lifecycle::{
    MissionOutcome, MissionService, StandardMissionService, StartMissionCommand,
};
use waystation_core::domain::agent::Agent;
use waystation_core::domain::errors::MissionError;
use waystation_core::domain::mission::{MissionDefId, MissionDefinition, RiskLevel};
use waystation_core::domain::player::Player;
use waystation_core::domain::repository::{
    AgentRepository, DefinitionRepository, PlayerRepository,
};
use waystation_core::domain::schedule::Clock;
use waystation_core::infrastructure::repositories::{
    InMemoryAgentRepository, InMemoryDefinitionRepository, InMemoryInstanceRepository,
    InMemoryPlayerRepository,
};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn definition(id: &str, base_duration_seconds: i64) -> MissionDefinition {
    MissionDefinition {
        id: MissionDefId::new(id),
        name: format!("Route {}", id),
        from_hub: "Kareth".to_string(),
        to_hub: "Ostrava".to_string(),
        distance: 140,
        base_duration_seconds,
        base_reward: 75,
        risk_level: RiskLevel::Medium,
        item_rewards: Vec::new(),
        active: true,
    }
}

struct TestWorld {
    service: Arc<StandardMissionService>,
    player: Player,
    agents: Vec<Agent>,
}

async fn build_world(
    base_slots: u32,
    agent_count: usize,
    speed_bonus_percent: f64,
    defs: &[MissionDefinition],
) -> TestWorld {
    let definitions = Arc::new(InMemoryDefinitionRepository::new());
    let agents_repo = Arc::new(InMemoryAgentRepository::new());
    let players = Arc::new(InMemoryPlayerRepository::new());
    let instances = Arc::new(InMemoryInstanceRepository::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(Utc::now()));

    for def in defs {
        definitions.save(def).await.expect("seed definition");
    }

    let player = Player::new("Merchant", base_slots, 0);
    players.save(&player).await.expect("seed player");

    let mut agents = Vec::new();
    for i in 0..agent_count {
        let mut agent = Agent::new(player.id, format!("Agent {}", i + 1));
        agent.speed_bonus_percent = speed_bonus_percent;
        agents_repo.save(&agent).await.expect("seed agent");
        agents.push(agent);
    }

    let catalog = Arc::new(DefinitionCatalog::new(definitions.clone(), clock.clone()));
    let service = Arc::new(StandardMissionService::new(
        catalog,
        definitions,
        agents_repo,
        players,
        instances,
        clock,
    ));

    TestWorld {
        service,
        player,
        agents,
    }
}

fn start_cmd(mission: &str, agent: &Agent) -> StartMissionCommand {
    StartMissionCommand {
        mission_id: mission.to_string(),
        agent_id: agent.id.to_string(),
    }
}

#[tokio::test]
async fn test_first_start_takes_slot_one_with_adjusted_window() {
    let world = build_world(3, 1, 40.0, &[definition("silk-road", 300)]).await;

    let view = world
        .service
        .start_mission(world.player.id, start_cmd("silk-road", &world.agents[0]))
        .await
        .expect("start");

    assert_eq!(view.instance.caravan_slot, 1);
    let elapsed = (view.instance.end_time - view.instance.start_time).num_seconds();
    assert_eq!(elapsed, 180); // 300 × 0.6
    assert_eq!(view.definition.id, MissionDefId::new("silk-road"));
    assert_eq!(view.agent.id, world.agents[0].id);
}

#[tokio::test]
async fn test_speed_bonus_floor_applies() {
    let world = build_world(3, 1, 90.0, &[definition("silk-road", 300)]).await;

    let view = world
        .service
        .start_mission(world.player.id, start_cmd("silk-road", &world.agents[0]))
        .await
        .expect("start");

    let elapsed = (view.instance.end_time - view.instance.start_time).num_seconds();
    assert_eq!(elapsed, 150); // floor at 0.5 × base
}

#[tokio::test]
async fn test_completed_slot_is_reused_lowest_first() {
    let defs = [
        definition("silk-road", 300),
        definition("amber-run", 300),
        definition("salt-track", 300),
    ];
    let world = build_world(3, 3, 0.0, &defs).await;

    let first = world
        .service
        .start_mission(world.player.id, start_cmd("silk-road", &world.agents[0]))
        .await
        .expect("first start");
    let second = world
        .service
        .start_mission(world.player.id, start_cmd("amber-run", &world.agents[1]))
        .await
        .expect("second start");
    assert_eq!(first.instance.caravan_slot, 1);
    assert_eq!(second.instance.caravan_slot, 2);

    world
        .service
        .complete_mission(world.player.id, first.instance.id, MissionOutcome::default())
        .await
        .expect("complete first");

    let third = world
        .service
        .start_mission(world.player.id, start_cmd("salt-track", &world.agents[2]))
        .await
        .expect("third start");
    assert_eq!(third.instance.caravan_slot, 1);
}

#[tokio::test]
async fn test_immediate_duplicate_start_yields_single_instance() {
    let world = build_world(3, 2, 0.0, &[definition("silk-road", 300)]).await;

    world
        .service
        .start_mission(world.player.id, start_cmd("silk-road", &world.agents[0]))
        .await
        .expect("first start");

    // Different agent, same definition: the definition conflict fires.
    let err = world
        .service
        .start_mission(world.player.id, start_cmd("silk-road", &world.agents[1]))
        .await
        .expect_err("duplicate start");
    assert!(matches!(err, MissionError::MissionInProgress));

    let board = world
        .service
        .list_missions(world.player.id)
        .await
        .expect("list");
    assert_eq!(board.active_missions.len(), 1);
}

#[tokio::test]
async fn test_busy_agent_is_rejected_with_its_name() {
    let defs = [definition("silk-road", 300), definition("amber-run", 300)];
    let world = build_world(3, 1, 0.0, &defs).await;

    world
        .service
        .start_mission(world.player.id, start_cmd("silk-road", &world.agents[0]))
        .await
        .expect("first start");

    let err = world
        .service
        .start_mission(world.player.id, start_cmd("amber-run", &world.agents[0]))
        .await
        .expect_err("agent busy");
    match err {
        MissionError::AgentBusy { name } => assert_eq!(name, "Agent 1"),
        other => panic!("expected AgentBusy, got {:?}", other),
    }
}

#[tokio::test]
async fn test_full_pool_reports_capacity_details() {
    let defs = [
        definition("silk-road", 300),
        definition("amber-run", 300),
        definition("salt-track", 300),
    ];
    let world = build_world(2, 3, 0.0, &defs).await;

    for i in 0..2 {
        world
            .service
            .start_mission(
                world.player.id,
                start_cmd(defs[i].id.as_str(), &world.agents[i]),
            )
            .await
            .expect("fill slot");
    }

    let err = world
        .service
        .start_mission(world.player.id, start_cmd("salt-track", &world.agents[2]))
        .await
        .expect_err("pool is full");
    match err {
        MissionError::SlotsExhausted(exhausted) => {
            assert_eq!(exhausted.total_slots, 2);
            assert_eq!(exhausted.occupied_slots, vec![1, 2]);
        }
        other => panic!("expected SlotsExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_or_inactive_definition_is_not_found() {
    let mut inactive = definition("ghost-road", 300);
    inactive.active = false;
    let world = build_world(3, 1, 0.0, &[definition("silk-road", 300), inactive]).await;

    let err = world
        .service
        .start_mission(world.player.id, start_cmd("no-such-road", &world.agents[0]))
        .await
        .expect_err("unknown definition");
    assert!(matches!(err, MissionError::DefinitionNotFound));

    let err = world
        .service
        .start_mission(world.player.id, start_cmd("ghost-road", &world.agents[0]))
        .await
        .expect_err("inactive definition");
    assert!(matches!(err, MissionError::DefinitionNotFound));
}

#[tokio::test]
async fn test_foreign_agent_is_not_found() {
    let world = build_world(3, 1, 0.0, &[definition("silk-road", 300)]).await;
    let stranger = build_world(3, 1, 0.0, &[definition("silk-road", 300)]).await;

    let err = world
        .service
        .start_mission(
            world.player.id,
            start_cmd("silk-road", &stranger.agents[0]),
        )
        .await
        .expect_err("agent from another world");
    assert!(matches!(err, MissionError::AgentNotFound));
}

#[tokio::test]
async fn test_concurrent_starts_never_share_a_slot() {
    let defs = [
        definition("silk-road", 300),
        definition("amber-run", 300),
        definition("salt-track", 300),
        definition("tin-route", 300),
    ];
    let world = build_world(4, 4, 0.0, &defs).await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let service = world.service.clone();
        let owner = world.player.id;
        let cmd = start_cmd(defs[i].id.as_str(), &world.agents[i]);
        handles.push(tokio::spawn(async move {
            service.start_mission(owner, cmd).await
        }));
    }

    let mut slots = Vec::new();
    for handle in handles {
        let view = handle.await.expect("join").expect("start");
        slots.push(view.instance.caravan_slot);
    }

    let distinct: HashSet<u32> = slots.iter().copied().collect();
    assert_eq!(distinct.len(), 4, "slots must be pairwise distinct: {:?}", slots);
    for slot in distinct {
        assert!((1..=4).contains(&slot));
    }
}

#[tokio::test]
async fn test_concurrent_identical_starts_yield_one_active_instance() {
    let world = build_world(3, 1, 0.0, &[definition("silk-road", 300)]).await;

    let a = {
        let service = world.service.clone();
        let owner = world.player.id;
        let cmd = start_cmd("silk-road", &world.agents[0]);
        tokio::spawn(async move { service.start_mission(owner, cmd).await })
    };
    let b = {
        let service = world.service.clone();
        let owner = world.player.id;
        let cmd = start_cmd("silk-road", &world.agents[0]);
        tokio::spawn(async move { service.start_mission(owner, cmd).await })
    };

    let results = [a.await.expect("join"), b.await.expect("join")];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the identical starts may win");

    let board = world
        .service
        .list_missions(world.player.id)
        .await
        .expect("list");
    assert_eq!(board.active_missions.len(), 1);
}

#[tokio::test]
async fn test_complete_requires_ownership_and_active_status() {
    let world = build_world(3, 1, 0.0, &[definition("silk-road", 300)]).await;

    let view = world
        .service
        .start_mission(world.player.id, start_cmd("silk-road", &world.agents[0]))
        .await
        .expect("start");

    let stranger = Player::new("Stranger", 3, 0).id;
    let err = world
        .service
        .complete_mission(stranger, view.instance.id, MissionOutcome::default())
        .await
        .expect_err("foreign completion");
    assert!(matches!(err, MissionError::InstanceNotFound));

    let completed = world
        .service
        .complete_mission(
            world.player.id,
            view.instance.id,
            MissionOutcome {
                actual_reward: Some(80),
                items_received: None,
            },
        )
        .await
        .expect("complete");
    assert_eq!(completed.actual_reward, Some(80));
    assert!(completed.completed_at.is_some());

    let err = world
        .service
        .complete_mission(world.player.id, view.instance.id, MissionOutcome::default())
        .await
        .expect_err("double completion");
    assert!(matches!(err, MissionError::Transition(_)));
}

#[tokio::test]
async fn test_listing_denormalizes_definition_and_agent() {
    let world = build_world(3, 1, 25.0, &[definition("silk-road", 600)]).await;

    world
        .service
        .start_mission(world.player.id, start_cmd("silk-road", &world.agents[0]))
        .await
        .expect("start");

    let board = world
        .service
        .list_missions(world.player.id)
        .await
        .expect("list");

    assert_eq!(board.mission_defs.len(), 1);
    assert_eq!(board.active_missions.len(), 1);
    let view = &board.active_missions[0];
    assert_eq!(view.definition.name, "Route silk-road");
    assert_eq!(view.agent.name, "Agent 1");
    assert_eq!(view.agent.speed_bonus_percent, 25.0);
}
