use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assets::{AssetRecord, CacheKey};

/// Lifecycle phase of the active session key.
///
/// Transitions are driven by discrete events, not effects:
/// `Idle -> LoadingInitial -> Ready -> BackgroundRefreshing -> Ready`.
/// A warm cache hit skips `LoadingInitial` entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    LoadingInitial,
    Ready,
    BackgroundRefreshing,
}

/// Reactive state published to all UI consumers.
///
/// A failed or partial aggregation never surfaces as an error here: consumers
/// always receive a (possibly stale or empty) list plus flags, and interpret
/// an empty list through `fetched_at`/`last_attempt_at`/`stale`.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub key: Option<CacheKey>,
    pub assets: Arc<Vec<AssetRecord>>,
    pub phase: SessionPhase,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub stale: bool,
}

impl SessionState {
    pub fn idle() -> Self {
        Self {
            key: None,
            assets: Arc::new(Vec::new()),
            phase: SessionPhase::Idle,
            fetched_at: None,
            last_attempt_at: None,
            stale: false,
        }
    }

    pub fn is_loading_initial(&self) -> bool {
        self.phase == SessionPhase::LoadingInitial
    }

    pub fn is_refreshing_background(&self) -> bool {
        self.phase == SessionPhase::BackgroundRefreshing
    }
}
