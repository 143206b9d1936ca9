// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent;
pub mod errors;
pub mod mission;
pub mod player;
pub mod repository;
pub mod schedule;
pub mod server_config;
pub mod slots;
