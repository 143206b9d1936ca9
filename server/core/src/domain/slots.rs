// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Caravan-slot allocation.
//!
//! Pure and deterministic: the caller supplies a fresh read of the owner's
//! occupied slots, and the allocator hands back the lowest free index in
//! `[1, capacity]`. The lowest-index tie-break keeps slot numbering stable
//! across start/complete churn.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

/// No free slot in `[1, capacity]`. Carries the full picture for the
/// client-facing capacity error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("All caravan slots are busy")]
pub struct SlotsExhausted {
    pub total_slots: u32,
    pub occupied_slots: Vec<u32>,
}

/// Return the smallest slot number in `[1, capacity]` not present in
/// `occupied`. Later capacity shrink never retroactively invalidates an
/// assignment; range is checked at assignment time only.
pub fn lowest_free_slot(capacity: u32, occupied: &HashSet<u32>) -> Result<u32, SlotsExhausted> {
    for slot in 1..=capacity {
        if !occupied.contains(&slot) {
            return Ok(slot);
        }
    }
    let mut occupied_slots: Vec<u32> = occupied.iter().copied().collect();
    occupied_slots.sort_unstable();
    Err(SlotsExhausted {
        total_slots: capacity,
        occupied_slots,
    })
}
