// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mission scheduling error taxonomy.
//!
//! Variants carry the exact client-facing messages; the HTTP mapping lives in
//! `crate::presentation::api`. Retry policy by class: validation and
//! not-found are never retried, conflicts require the user to change
//! selection, capacity is user-driven retry only, and storage failures are
//! transient (reads may back off and retry, writes never auto-retry).

use thiserror::Error;

use crate::domain::mission::MissionTransitionError;
use crate::domain::repository::RepositoryError;
use crate::domain::slots::SlotsExhausted;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("Mission ID required")]
    MissionIdRequired,

    #[error("Agent ID required")]
    AgentIdRequired,

    #[error("Mission not found or inactive")]
    DefinitionNotFound,

    #[error("Agent not found or not owned by user")]
    AgentNotFound,

    #[error("Agent {name} is already on a mission")]
    AgentBusy { name: String },

    #[error("Mission already in progress")]
    MissionInProgress,

    #[error(transparent)]
    SlotsExhausted(#[from] SlotsExhausted),

    #[error("Mission instance not found")]
    InstanceNotFound,

    #[error(transparent)]
    Transition(#[from] MissionTransitionError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}
