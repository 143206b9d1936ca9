// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Player account record. Only the slot-capacity fields are read by the
/// scheduler; everything else is owned by the account subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub base_slots: u32,
    pub premium_slots: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn new(name: impl Into<String>, base_slots: u32, premium_slots: u32) -> Self {
        let now = Utc::now();
        Self {
            id: PlayerId::new(),
            name: name.into(),
            base_slots,
            premium_slots,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total caravan-slot capacity. The pool itself is derived, never stored:
    /// occupied slots are whatever the owner's active instances hold.
    pub fn slot_capacity(&self) -> u32 {
        self.base_slots + self.premium_slots
    }
}
