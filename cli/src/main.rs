// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Waystation CLI
//!
//! The `waystation` binary runs the mission-scheduler daemon and offers
//! client commands built on the SDK.
//!
//! ## Commands
//!
//! - `waystation serve` - Run the HTTP daemon
//! - `waystation missions list|start|complete` - Client operations

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod server;

/// Waystation - caravan mission scheduling backend
#[derive(Parser)]
#[command(name = "waystation")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "WAYSTATION_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "WAYSTATION_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the mission-scheduler HTTP daemon
    Serve,

    /// Mission operations against a running daemon
    Missions {
        #[command(subcommand)]
        command: MissionsCommand,
    },
}

#[derive(Args)]
struct ClientArgs {
    /// Base URL of the daemon
    #[arg(long, env = "WAYSTATION_URL", default_value = "http://127.0.0.1:8000")]
    server: String,

    /// Bearer token
    #[arg(long, env = "WAYSTATION_TOKEN")]
    token: String,
}

#[derive(Subcommand)]
enum MissionsCommand {
    /// Show the mission board: catalog plus your active missions
    List {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Start a mission with an agent
    Start {
        /// Mission definition id
        mission_id: String,
        /// Agent id (UUID)
        agent_id: String,
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Complete an active mission
    Complete {
        /// Mission instance id (UUID)
        instance_id: String,
        #[command(flatten)]
        client: ClientArgs,
    },
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Serve => server::serve(cli.config.as_deref()).await,
        Commands::Missions { command } => match command {
            MissionsCommand::List { client } => commands::list_missions(&client.server, &client.token).await,
            MissionsCommand::Start {
                mission_id,
                agent_id,
                client,
            } => commands::start_mission(&client.server, &client.token, &mission_id, &agent_id).await,
            MissionsCommand::Complete {
                instance_id,
                client,
            } => commands::complete_mission(&client.server, &client.token, &instance_id).await,
        },
    }
}
