// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Waystation Core
//!
//! Mission lifecycle and caravan-slot scheduling for the Waystation backend.
//!
//! Layering follows the usual DDD split: aggregates, pure scheduling math,
//! and repository contracts live in [`domain`]; the definition-catalog cache
//! and the lifecycle service live in [`application`]; storage backends and
//! the auth seam live in [`infrastructure`]; the axum HTTP surface lives in
//! [`presentation`].

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
