// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Server Configuration Types
//
// Defines the configuration schema for Waystation server nodes, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Bind address and port
// - Storage backend selection (in-memory or PostgreSQL)
// - Definition-catalog TTL
// - Static bearer-token grants (stand-in for the external auth service)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::domain::player::PlayerId;
use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const CONFIG_ENV_VAR: &str = "WAYSTATION_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "waystation.yaml";

/// Top-level Kubernetes-style server configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ServerConfig")
    pub kind: String,

    /// Manifest metadata
    pub metadata: ManifestMetadata,

    /// Server configuration specification
    pub spec: ServerConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name (unique identifier)
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfigSpec {
    #[serde(default)]
    pub server: ServerIdentity,

    #[serde(default)]
    pub storage: StorageSpec,

    #[serde(default)]
    pub catalog: CatalogSpec,

    /// Static token grants resolving a bearer token to a player id.
    /// A placeholder for the external authentication collaborator.
    #[serde(default)]
    pub auth: Vec<TokenGrant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerIdentity {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSpec {
    /// "memory" or "postgres"
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

impl Default for StorageSpec {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            connection_string: None,
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSpec {
    #[serde(default = "default_catalog_ttl_ms")]
    pub ttl_ms: u64,
}

impl Default for CatalogSpec {
    fn default() -> Self {
        Self {
            ttl_ms: default_catalog_ttl_ms(),
        }
    }
}

fn default_catalog_ttl_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    pub player_id: PlayerId,
}

impl ServerConfigManifest {
    /// Load configuration from an explicit path, `$WAYSTATION_CONFIG_PATH`,
    /// or `./waystation.yaml`, in that order. Absent all three, fall back to
    /// defaults (in-memory storage, loopback bind).
    pub async fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path).await;
        }
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&env_path)).await;
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::load(&default_path).await;
        }
        Ok(Self::default_manifest())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let manifest: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(manifest)
    }

    pub fn default_manifest() -> Self {
        Self {
            api_version: "100monkeys.ai/v1".to_string(),
            kind: "ServerConfig".to_string(),
            metadata: ManifestMetadata {
                name: "waystation-local".to_string(),
                version: None,
                labels: None,
            },
            spec: ServerConfigSpec {
                server: ServerIdentity::default(),
                storage: StorageSpec::default(),
                catalog: CatalogSpec::default(),
                auth: Vec::new(),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.kind != "ServerConfig" {
            bail!("Unsupported config kind: {}", self.kind);
        }
        match self.spec.storage.backend.as_str() {
            "memory" => {}
            "postgres" => {
                if self.spec.storage.connection_string.is_none() {
                    bail!("storage.connection_string is required for the postgres backend");
                }
            }
            other => bail!("Unknown storage backend: {}", other),
        }
        if self.spec.catalog.ttl_ms == 0 {
            bail!("catalog.ttl_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match self.spec.storage.backend.as_str() {
            "postgres" => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: self
                    .spec
                    .storage
                    .connection_string
                    .clone()
                    .unwrap_or_default(),
            }),
            _ => StorageBackend::InMemory,
        }
    }
}
