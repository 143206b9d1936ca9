// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Waystation SDK
//!
//! Typed client for the Waystation mission API plus the
//! [`coordinator::MutationCoordinator`], which keeps a local view of the
//! mission board consistent under optimistic start/complete mutations.

pub mod client;
pub mod coordinator;
pub mod types;

pub use client::{ClientError, WaystationClient};
pub use coordinator::{MissionApi, MutationCoordinator, MutationError};
