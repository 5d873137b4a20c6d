//! Background timer persistence.
//!
//! The OS may suspend the process while a loop is running, so per-second
//! callbacks cannot be trusted across backgrounding. A wall-clock start
//! stamp is written before suspension and reconciled against the clock
//! after resumption.
//!
//! One fixed key, last-writer-wins: at most one background timer is
//! representable at a time. Storage failures are logged and treated as
//! "no background timer was active" — the feature is advisory, so losing
//! background-elapsed accounting beats crashing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kv::KvStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const BACKGROUND_TIMER_KEY: &str = "@mindknot_background_timer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundTimerSnapshot {
    pub is_running: bool,
    pub start_time: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub activity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_start_time: Option<DateTime<Utc>>,
}

/// Returned to the caller after foregrounding so the in-memory session
/// can catch up.
#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundReconciliation {
    pub activity_id: String,
    pub additional_elapsed: u64,
    pub total_elapsed: u64,
}

#[derive(Clone)]
pub struct BackgroundTimerStore {
    kv: Arc<KvStore>,
}

impl BackgroundTimerStore {
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }

    pub fn snapshot(&self) -> Option<BackgroundTimerSnapshot> {
        match self.kv.get::<BackgroundTimerSnapshot>(BACKGROUND_TIMER_KEY) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log_warn!("background timer read failed, assuming none active: {err:#}");
                None
            }
        }
    }

    /// Starts tracking `activity_id`, overwriting any prior snapshot.
    pub fn track(&self, activity_id: &str, now: DateTime<Utc>) {
        self.write(BackgroundTimerSnapshot {
            is_running: true,
            start_time: now,
            elapsed_seconds: 0,
            activity_id: activity_id.to_string(),
            background_start_time: None,
        });
    }

    /// Freezes elapsed time at the last tick; used on pause.
    pub fn freeze(&self, elapsed_seconds: u64) {
        if let Some(mut snapshot) = self.snapshot() {
            snapshot.is_running = false;
            snapshot.elapsed_seconds = elapsed_seconds;
            self.write(snapshot);
        }
    }

    /// Moves the reference clock to `now` without losing elapsed-so-far;
    /// used on resume.
    pub fn reanchor(&self, now: DateTime<Utc>) {
        if let Some(mut snapshot) = self.snapshot() {
            snapshot.is_running = true;
            snapshot.start_time = now;
            self.write(snapshot);
        }
    }

    /// Mirrors the session's per-activity clock; used on each tick and
    /// when the session advances to another activity.
    pub fn sync(&self, activity_id: &str, elapsed_seconds: u64) {
        if let Some(mut snapshot) = self.snapshot() {
            if snapshot.activity_id != activity_id {
                snapshot.activity_id = activity_id.to_string();
            }
            snapshot.elapsed_seconds = elapsed_seconds;
            self.write(snapshot);
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.kv.remove(BACKGROUND_TIMER_KEY) {
            log_warn!("failed to clear background timer snapshot: {err:#}");
        }
    }

    /// App moved to the background: stamp the wall clock iff a timer is
    /// actually running. Paused snapshots stay frozen.
    pub fn mark_background(&self, now: DateTime<Utc>) {
        if let Some(mut snapshot) = self.snapshot() {
            if snapshot.is_running {
                snapshot.background_start_time = Some(now);
                self.write(snapshot);
            }
        }
    }

    /// App returned to the foreground: fold the wall-clock delta into the
    /// snapshot and report it so the session can reconcile. Returns `None`
    /// when no running stamped snapshot exists.
    pub fn reconcile_foreground(&self, now: DateTime<Utc>) -> Option<ForegroundReconciliation> {
        let mut snapshot = self.snapshot()?;
        if !snapshot.is_running {
            return None;
        }
        let background_start = snapshot.background_start_time.take()?;

        let additional = (now - background_start).num_seconds().max(0) as u64;
        snapshot.elapsed_seconds += additional;
        let result = ForegroundReconciliation {
            activity_id: snapshot.activity_id.clone(),
            additional_elapsed: additional,
            total_elapsed: snapshot.elapsed_seconds,
        };
        self.write(snapshot);
        Some(result)
    }

    fn write(&self, snapshot: BackgroundTimerSnapshot) {
        if let Err(err) = self.kv.set(BACKGROUND_TIMER_KEY, &snapshot) {
            log_warn!("background timer write failed, dropping update: {err:#}");
        }
    }
}
