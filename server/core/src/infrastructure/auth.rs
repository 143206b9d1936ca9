// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bearer-token resolution seam.
//!
//! Token verification itself belongs to the external authentication service;
//! this crate only needs a way to turn a bearer token into a stable player
//! id. `StaticTokenAuth` is the config-driven stand-in used by the daemon
//! and by tests.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::player::PlayerId;
use crate::domain::server_config::TokenGrant;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    Missing,
    #[error("Invalid bearer token")]
    Invalid,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<PlayerId, AuthError>;
}

#[derive(Clone, Default)]
pub struct StaticTokenAuth {
    tokens: HashMap<String, PlayerId>,
}

impl StaticTokenAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grants(grants: &[TokenGrant]) -> Self {
        Self {
            tokens: grants
                .iter()
                .map(|g| (g.token.clone(), g.player_id))
                .collect(),
        }
    }

    pub fn grant(mut self, token: impl Into<String>, player: PlayerId) -> Self {
        self.tokens.insert(token.into(), player);
        self
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuth {
    async fn resolve(&self, token: &str) -> Result<PlayerId, AuthError> {
        self.tokens.get(token).copied().ok_or(AuthError::Invalid)
    }
}
