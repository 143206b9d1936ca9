// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Mutation Coordinator
//!
//! Client-side coordinator for optimistic mission mutations against an
//! eventually-consistent server. Each mutation walks an explicit state
//! machine:
//!
//! ```text
//! Pending ──network──▶ Applied ──▶ Settled(Ok)
//!    │                              Settled(Err) ──▶ rollback to snapshot
//! ```
//!
//! A monotonically increasing generation counter detects stale in-flight
//! refetches: every mutation bumps the generation before its network call,
//! and any refetch started under an older generation discards its result
//! instead of clobbering fresher optimistic state. Delayed full refreshes
//! (≈2 s after a start, ≈3 s after a completion) reconcile with the server
//! once its replicas have converged.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::client::{ClientError, WaystationClient};
use crate::types::{ActiveMissionView, InstanceId, MissionBoard, MissionDefinition, MissionInstance, MissionOutcome};

/// Transport seam between the coordinator and the network. Implemented by
/// [`WaystationClient`]; mocked in tests.
#[async_trait]
pub trait MissionApi: Send + Sync {
    async fn fetch_missions(&self) -> Result<MissionBoard, ClientError>;
    async fn start_mission(
        &self,
        mission_id: &str,
        agent_id: &str,
    ) -> Result<ActiveMissionView, ClientError>;
    async fn complete_mission(
        &self,
        instance_id: InstanceId,
        outcome: &MissionOutcome,
    ) -> Result<MissionInstance, ClientError>;
    async fn fetch_balance(&self) -> Result<i64, ClientError>;
}

#[async_trait]
impl MissionApi for WaystationClient {
    async fn fetch_missions(&self) -> Result<MissionBoard, ClientError> {
        WaystationClient::fetch_missions(self).await
    }

    async fn start_mission(
        &self,
        mission_id: &str,
        agent_id: &str,
    ) -> Result<ActiveMissionView, ClientError> {
        WaystationClient::start_mission(self, mission_id, agent_id).await
    }

    async fn complete_mission(
        &self,
        instance_id: InstanceId,
        outcome: &MissionOutcome,
    ) -> Result<MissionInstance, ClientError> {
        WaystationClient::complete_mission(self, instance_id, outcome).await
    }

    async fn fetch_balance(&self) -> Result<i64, ClientError> {
        WaystationClient::fetch_balance(self).await
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    /// A start for this definition is already in flight; the affordance is
    /// disabled until it settles.
    #[error("mission start already pending")]
    StartPending,
    /// The definition already has an active instance in local state.
    #[error("mission already in progress")]
    AlreadyActive,
    /// No such instance in local state.
    #[error("unknown mission instance")]
    UnknownInstance,
    #[error(transparent)]
    Api(#[from] ClientError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationPhase {
    Pending,
    Applied,
    Settled,
}

/// Delay before the post-start full refresh, long enough that the merge is
/// not clobbered by a stale in-flight refetch.
pub const START_REFRESH_DELAY: Duration = Duration::from_secs(2);
/// Delay before the post-completion full refresh.
pub const COMPLETE_REFRESH_DELAY: Duration = Duration::from_secs(3);

#[derive(Default)]
struct LocalState {
    definitions: Vec<MissionDefinition>,
    active: Vec<ActiveMissionView>,
    /// Definition ids with an in-flight start; their affordance is disabled.
    pending_starts: HashSet<String>,
    /// Cached wallet balance; `None` means stale.
    balance: Option<i64>,
}

struct CoordinatorInner {
    api: Arc<dyn MissionApi>,
    state: Mutex<LocalState>,
    generation: AtomicU64,
    start_refresh_delay: Duration,
    complete_refresh_delay: Duration,
}

#[derive(Clone)]
pub struct MutationCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn MissionApi>) -> Self {
        Self::with_delays(api, START_REFRESH_DELAY, COMPLETE_REFRESH_DELAY)
    }

    pub fn with_delays(
        api: Arc<dyn MissionApi>,
        start_refresh_delay: Duration,
        complete_refresh_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                api,
                state: Mutex::new(LocalState::default()),
                generation: AtomicU64::new(0),
                start_refresh_delay,
                complete_refresh_delay,
            }),
        }
    }

    pub fn definitions(&self) -> Vec<MissionDefinition> {
        self.inner.state.lock().definitions.clone()
    }

    pub fn active_missions(&self) -> Vec<ActiveMissionView> {
        self.inner.state.lock().active.clone()
    }

    /// Whether the start affordance for this definition is disabled.
    pub fn is_start_pending(&self, mission_id: &str) -> bool {
        self.inner.state.lock().pending_starts.contains(mission_id)
    }

    fn bump_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Replace local state with a fetched board, unless a mutation started
    /// after the fetch began (the board would then be stale).
    fn apply_board(&self, fetched_under: u64, board: MissionBoard) -> bool {
        if self.current_generation() != fetched_under {
            debug!(
                generation = fetched_under,
                current = self.current_generation(),
                "discarding stale refetch"
            );
            return false;
        }
        let mut state = self.inner.state.lock();
        state.definitions = board.mission_defs;
        state.active = board.active_missions;
        true
    }

    /// Foreground refetch of the full mission board.
    pub async fn refresh(&self) -> Result<bool, ClientError> {
        let generation = self.current_generation();
        let board = self.inner.api.fetch_missions().await?;
        Ok(self.apply_board(generation, board))
    }

    fn schedule_refresh(&self, delay: Duration) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let generation = coordinator.current_generation();
            match coordinator.inner.api.fetch_missions().await {
                Ok(board) => {
                    coordinator.apply_board(generation, board);
                }
                Err(e) => warn!(error = %e, "delayed mission refresh failed"),
            }
        });
    }

    /// Start a mission.
    ///
    /// No optimistic instance is fabricated — the server assigns the slot —
    /// but the definition's affordance is disabled for the duration of the
    /// call so a double-tap cannot submit twice.
    pub async fn start_mission(
        &self,
        mission_id: &str,
        agent_id: &str,
    ) -> Result<ActiveMissionView, MutationError> {
        {
            let mut state = self.inner.state.lock();
            if state.pending_starts.contains(mission_id) {
                return Err(MutationError::StartPending);
            }
            if state
                .active
                .iter()
                .any(|m| m.instance.mission_def_id.as_str() == mission_id)
            {
                return Err(MutationError::AlreadyActive);
            }
            state.pending_starts.insert(mission_id.to_string());
        }
        let mut phase = MutationPhase::Pending;
        self.bump_generation();

        let result = self.inner.api.start_mission(mission_id, agent_id).await;

        let mut state = self.inner.state.lock();
        state.pending_starts.remove(mission_id);
        match result {
            Ok(view) => {
                state.active.push(view.clone());
                phase = MutationPhase::Applied;
                drop(state);
                self.schedule_refresh(self.inner.start_refresh_delay);
                debug!(mission = mission_id, ?phase, "start settled");
                Ok(view)
            }
            Err(e) => {
                drop(state);
                debug!(mission = mission_id, ?phase, error = %e, "start settled with error");
                Err(MutationError::Api(e))
            }
        }
    }

    /// Complete a mission.
    ///
    /// The instance is removed from the active list before the network call
    /// resolves; on failure the exact pre-mutation snapshot is restored.
    pub async fn complete_mission(
        &self,
        instance_id: InstanceId,
        outcome: MissionOutcome,
    ) -> Result<MissionInstance, MutationError> {
        let snapshot = {
            let mut state = self.inner.state.lock();
            if !state.active.iter().any(|m| m.instance.id == instance_id) {
                return Err(MutationError::UnknownInstance);
            }
            let snapshot = state.active.clone();
            state.active.retain(|m| m.instance.id != instance_id);
            snapshot
        };
        let mut phase = MutationPhase::Applied;
        self.bump_generation();

        match self.inner.api.complete_mission(instance_id, &outcome).await {
            Ok(instance) => {
                phase = MutationPhase::Settled;
                // The wallet changed server-side; drop the narrow cache now,
                // full reconciliation follows after the delay.
                self.inner.state.lock().balance = None;
                self.schedule_refresh(self.inner.complete_refresh_delay);
                debug!(instance = %instance_id, ?phase, "completion settled");
                Ok(instance)
            }
            Err(e) => {
                self.inner.state.lock().active = snapshot;
                debug!(instance = %instance_id, ?phase, error = %e, "completion rolled back");
                Err(MutationError::Api(e))
            }
        }
    }

    /// Wallet balance, refetched when the cached value has been invalidated.
    pub async fn balance(&self) -> Result<i64, ClientError> {
        if let Some(balance) = self.inner.state.lock().balance {
            return Ok(balance);
        }
        let balance = self.inner.api.fetch_balance().await?;
        self.inner.state.lock().balance = Some(balance);
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AgentId, AgentSummary, DefinitionSummary, MissionDefId, MissionStatus, PlayerId, RiskLevel,
    };
    use chrono::Utc;
    use reqwest::StatusCode;
    use std::sync::atomic::AtomicUsize;

    fn definition(id: &str) -> MissionDefinition {
        MissionDefinition {
            id: MissionDefId::new(id),
            name: format!("Route {}", id),
            from_hub: "Kareth".to_string(),
            to_hub: "Ostrava".to_string(),
            distance: 120,
            base_duration_seconds: 300,
            base_reward: 50,
            risk_level: RiskLevel::Low,
            item_rewards: Vec::new(),
            active: true,
        }
    }

    fn view(mission_id: &str) -> ActiveMissionView {
        let def = definition(mission_id);
        let now = Utc::now();
        let instance = MissionInstance::new(
            PlayerId::new(),
            def.id.clone(),
            AgentId::new(),
            1,
            now,
            now + chrono::Duration::seconds(300),
        );
        ActiveMissionView {
            instance,
            definition: DefinitionSummary {
                id: def.id.clone(),
                name: def.name.clone(),
                from_hub: def.from_hub.clone(),
                to_hub: def.to_hub.clone(),
                risk_level: def.risk_level,
                base_duration_seconds: def.base_duration_seconds,
            },
            agent: AgentSummary {
                id: AgentId::new(),
                name: "Sable".to_string(),
                level: 1,
                speed_bonus_percent: 0.0,
            },
        }
    }

    fn api_error() -> ClientError {
        ClientError::Api {
            status: StatusCode::CONFLICT,
            message: "Mission already in progress".to_string(),
            details: None,
        }
    }

    /// Programmable transport double.
    struct MockApi {
        board: Mutex<MissionBoard>,
        fetch_count: AtomicUsize,
        fetch_delay: Duration,
        start_delay: Duration,
        fail_start: bool,
        fail_complete: bool,
    }

    impl MockApi {
        fn new(board: MissionBoard) -> Self {
            Self {
                board: Mutex::new(board),
                fetch_count: AtomicUsize::new(0),
                fetch_delay: Duration::ZERO,
                start_delay: Duration::ZERO,
                fail_start: false,
                fail_complete: false,
            }
        }

        fn empty_board() -> MissionBoard {
            MissionBoard {
                mission_defs: vec![definition("silk-road")],
                active_missions: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl MissionApi for MockApi {
        async fn fetch_missions(&self) -> Result<MissionBoard, ClientError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            if !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
            let board = self.board.lock();
            Ok(MissionBoard {
                mission_defs: board.mission_defs.clone(),
                active_missions: board.active_missions.clone(),
            })
        }

        async fn start_mission(
            &self,
            mission_id: &str,
            _agent_id: &str,
        ) -> Result<ActiveMissionView, ClientError> {
            if !self.start_delay.is_zero() {
                tokio::time::sleep(self.start_delay).await;
            }
            if self.fail_start {
                return Err(api_error());
            }
            Ok(view(mission_id))
        }

        async fn complete_mission(
            &self,
            _instance_id: InstanceId,
            _outcome: &MissionOutcome,
        ) -> Result<MissionInstance, ClientError> {
            if self.fail_complete {
                return Err(api_error());
            }
            let mut instance = view("silk-road").instance;
            instance.status = MissionStatus::Completed;
            Ok(instance)
        }

        async fn fetch_balance(&self) -> Result<i64, ClientError> {
            Ok(420)
        }
    }

    #[tokio::test]
    async fn test_start_merges_confirmed_instance() {
        let api = Arc::new(MockApi::new(MockApi::empty_board()));
        let coordinator = MutationCoordinator::new(api);
        coordinator.refresh().await.expect("initial refresh");

        let view = coordinator
            .start_mission("silk-road", "agent")
            .await
            .expect("start");

        assert_eq!(view.instance.mission_def_id, MissionDefId::new("silk-road"));
        assert_eq!(coordinator.active_missions().len(), 1);
        assert!(!coordinator.is_start_pending("silk-road"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_disables_affordance_while_in_flight() {
        let mut api = MockApi::new(MockApi::empty_board());
        api.start_delay = Duration::from_millis(500);
        let api = Arc::new(api);
        let coordinator = MutationCoordinator::new(api);

        let background = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.start_mission("silk-road", "agent").await })
        };
        tokio::task::yield_now().await;
        assert!(coordinator.is_start_pending("silk-road"));

        let err = coordinator
            .start_mission("silk-road", "agent")
            .await
            .expect_err("duplicate submission");
        assert!(matches!(err, MutationError::StartPending));

        background.await.expect("join").expect("first start succeeds");
        assert!(!coordinator.is_start_pending("silk-road"));
    }

    #[tokio::test]
    async fn test_failed_start_clears_pending_mark() {
        let mut api = MockApi::new(MockApi::empty_board());
        api.fail_start = true;
        let coordinator = MutationCoordinator::new(Arc::new(api));

        let err = coordinator
            .start_mission("silk-road", "agent")
            .await
            .expect_err("server rejects");
        assert!(matches!(err, MutationError::Api(_)));
        assert!(!coordinator.is_start_pending("silk-road"));
        assert!(coordinator.active_missions().is_empty());
    }

    #[tokio::test]
    async fn test_complete_rolls_back_to_exact_snapshot_on_error() {
        let active = view("silk-road");
        let board = MissionBoard {
            mission_defs: vec![definition("silk-road")],
            active_missions: vec![active.clone()],
        };
        let mut api = MockApi::new(board);
        api.fail_complete = true;
        let coordinator = MutationCoordinator::new(Arc::new(api));
        coordinator.refresh().await.expect("initial refresh");

        let before = coordinator.active_missions();
        let err = coordinator
            .complete_mission(active.instance.id, MissionOutcome::default())
            .await
            .expect_err("server rejects completion");
        assert!(matches!(err, MutationError::Api(_)));

        let after = coordinator.active_missions();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].instance.id, before[0].instance.id);
        assert_eq!(after[0].instance.caravan_slot, before[0].instance.caravan_slot);
        assert_eq!(after[0].definition, before[0].definition);
        assert_eq!(after[0].agent, before[0].agent);
    }

    #[tokio::test]
    async fn test_complete_removes_instance_and_invalidates_balance() {
        let active = view("silk-road");
        let board = MissionBoard {
            mission_defs: vec![definition("silk-road")],
            active_missions: vec![active.clone()],
        };
        let api = Arc::new(MockApi::new(board));
        let coordinator = MutationCoordinator::new(api.clone());
        coordinator.refresh().await.expect("initial refresh");
        coordinator.balance().await.expect("warm balance");

        let instance = coordinator
            .complete_mission(active.instance.id, MissionOutcome::default())
            .await
            .expect("complete");
        assert_eq!(instance.status, MissionStatus::Completed);
        assert!(coordinator.active_missions().is_empty());

        // The balance cell was invalidated; the next read refetches.
        assert_eq!(coordinator.balance().await.expect("balance"), 420);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_refetch_is_discarded_after_mutation() {
        let active = view("silk-road");
        let board = MissionBoard {
            mission_defs: vec![definition("silk-road")],
            active_missions: vec![active.clone()],
        };
        let mut api = MockApi::new(board);
        api.fetch_delay = Duration::from_millis(200);
        let coordinator = MutationCoordinator::new(Arc::new(api));

        // A slow refetch is in flight when the completion lands. Its
        // response still contains the instance and must be discarded.
        let refetch = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh().await })
        };
        tokio::task::yield_now().await;

        // Seed local state directly so the mutation has something to remove.
        coordinator.inner.state.lock().active = vec![active.clone()];
        coordinator
            .complete_mission(active.instance.id, MissionOutcome::default())
            .await
            .expect("complete");

        let applied = refetch.await.expect("join").expect("refetch finishes");
        assert!(!applied, "stale refetch must be discarded");
        assert!(
            coordinator.active_missions().is_empty(),
            "optimistic removal survives the stale refetch"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_schedules_delayed_reconciliation() {
        let api = Arc::new(MockApi::new(MockApi::empty_board()));
        let coordinator = MutationCoordinator::new(api.clone());

        coordinator
            .start_mission("silk-road", "agent")
            .await
            .expect("start");
        let fetches_before = api.fetch_count.load(Ordering::SeqCst);

        tokio::time::sleep(START_REFRESH_DELAY + Duration::from_millis(50)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            api.fetch_count.load(Ordering::SeqCst),
            fetches_before + 1,
            "the delayed full refresh must have run"
        );
    }
}
