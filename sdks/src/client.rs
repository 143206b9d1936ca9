// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::types::{
    ActiveMissionView, BalanceResponse, CompleteMissionResponse, ErrorBody, InstanceId,
    MissionBoard, MissionInstance, MissionOutcome, StartMissionResponse,
};

/// Every call is bounded; a timed-out write is treated as failed and must
/// never be silently retried (a retry could double-start a mission).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read retry policy: bounded attempts with exponential backoff.
const READ_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body.
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        details: Option<serde_json::Value>,
    },
    /// Transport-level failure, including timeouts.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Transient errors may be retried for reads; everything else reflects a
    /// server decision and repeats identically.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => status.is_server_error(),
        }
    }
}

/// Client for the Waystation mission API.
pub struct WaystationClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl WaystationClient {
    /// Create a new client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
            token: None,
        }
    }

    /// Set the bearer token used for authentication.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, url).timeout(REQUEST_TIMEOUT);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        req
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body: ErrorBody = response.json().await.unwrap_or(ErrorBody {
            error: format!("HTTP {}", status),
            details: None,
        });
        Err(ClientError::Api {
            status,
            message: body.error,
            details: body.details,
        })
    }

    /// Fetch the mission board: the definition catalog plus the caller's
    /// active missions. Retries transient failures with backoff.
    pub async fn fetch_missions(&self) -> Result<MissionBoard, ClientError> {
        let mut attempt = 0;
        loop {
            let result = match self.request(Method::GET, "/missions").send().await {
                Ok(response) => Self::decode(response).await,
                Err(e) => Err(ClientError::Transport(e)),
            };
            match result {
                Err(e) if e.is_transient() && attempt + 1 < READ_ATTEMPTS => {
                    let backoff = BACKOFF_BASE * 2u32.pow(attempt);
                    warn!(attempt, error = %e, "mission fetch failed, backing off");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Start a mission. Single attempt: a write is never auto-retried.
    pub async fn start_mission(
        &self,
        mission_id: &str,
        agent_id: &str,
    ) -> Result<ActiveMissionView, ClientError> {
        let response = self
            .request(Method::POST, "/missions")
            .json(&serde_json::json!({
                "missionId": mission_id,
                "agentId": agent_id,
            }))
            .send()
            .await?;
        let body: StartMissionResponse = Self::decode(response).await?;
        Ok(body.mission_instance)
    }

    /// Complete a mission. Single attempt: a write is never auto-retried.
    pub async fn complete_mission(
        &self,
        instance_id: InstanceId,
        outcome: &MissionOutcome,
    ) -> Result<MissionInstance, ClientError> {
        let response = self
            .request(Method::POST, &format!("/missions/{}/complete", instance_id))
            .json(outcome)
            .send()
            .await?;
        let body: CompleteMissionResponse = Self::decode(response).await?;
        Ok(body.mission_instance)
    }

    /// Fetch the caller's wallet balance (served by the wallet subsystem).
    pub async fn fetch_balance(&self) -> Result<i64, ClientError> {
        let response = self.request(Method::GET, "/wallet").send().await?;
        let body: BalanceResponse = Self::decode(response).await?;
        Ok(body.balance)
    }
}
