// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Client commands built on the SDK.

use anyhow::{Context, Result};
use colored::Colorize;

use waystation_sdk::types::{InstanceId, MissionOutcome, RiskLevel};
use waystation_sdk::WaystationClient;

fn client(server: &str, token: &str) -> WaystationClient {
    WaystationClient::new(server).with_token(token)
}

fn risk_colored(risk: RiskLevel) -> colored::ColoredString {
    match risk {
        RiskLevel::Low => "LOW".green(),
        RiskLevel::Medium => "MEDIUM".yellow(),
        RiskLevel::High => "HIGH".red(),
    }
}

pub async fn list_missions(server: &str, token: &str) -> Result<()> {
    let board = client(server, token)
        .fetch_missions()
        .await
        .context("Failed to fetch mission board")?;

    println!("{}", "Mission catalog".bold());
    for def in &board.mission_defs {
        println!(
            "  {}  {} → {}  [{}]  {}s base",
            def.id.as_str().cyan(),
            def.from_hub,
            def.to_hub,
            risk_colored(def.risk_level),
            def.base_duration_seconds,
        );
    }

    println!();
    println!("{}", "Active missions".bold());
    if board.active_missions.is_empty() {
        println!("  (none)");
    }
    for mission in &board.active_missions {
        println!(
            "  slot {}  {}  {}  agent {}  ends {}",
            mission.instance.caravan_slot,
            mission.instance.id.to_string().cyan(),
            mission.definition.name,
            mission.agent.name,
            mission.instance.end_time,
        );
    }
    Ok(())
}

pub async fn start_mission(server: &str, token: &str, mission_id: &str, agent_id: &str) -> Result<()> {
    let view = client(server, token)
        .start_mission(mission_id, agent_id)
        .await
        .context("Failed to start mission")?;

    println!(
        "{} {} on slot {} with {}, ends {}",
        "Started".green().bold(),
        view.definition.name,
        view.instance.caravan_slot,
        view.agent.name,
        view.instance.end_time,
    );
    Ok(())
}

pub async fn complete_mission(server: &str, token: &str, instance_id: &str) -> Result<()> {
    let instance_id = InstanceId::from_string(instance_id).context("Invalid instance id")?;
    let instance = client(server, token)
        .complete_mission(instance_id, &MissionOutcome::default())
        .await
        .context("Failed to complete mission")?;

    println!(
        "{} mission {} (slot {} released)",
        "Completed".green().bold(),
        instance.mission_def_id,
        instance.caravan_slot,
    );
    Ok(())
}
