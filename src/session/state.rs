use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use anyhow::{anyhow, Result};

use crate::models::{ActivityStatus, Loop};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "Running",
            SessionStatus::Paused => "Paused",
            SessionStatus::Completed => "Completed",
            SessionStatus::Stopped => "Stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Stopped)
    }
}

/// What a `tick` did, so the controller knows which side effects to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Session was paused or terminal; nothing changed.
    Ignored,
    Ticked,
    /// The current activity reached its duration target and auto-completed.
    ActivityCompleted { index: usize },
    /// Auto-completing the last activity finished the whole session.
    SessionCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Ignored,
    Advanced { next_index: usize },
    /// A repeatable loop wrapped around into its next iteration.
    IterationStarted { iteration: u32 },
    SessionCompleted,
}

/// Runtime state of a loop being executed. Created by `start`, destroyed
/// when the session stops or completes all iterations; never persisted as
/// a first-class record (the background snapshot mirrors a subset of it).
///
/// All user-driven transitions are idempotent no-ops when called in an
/// invalid state: they can legitimately race with UI debouncing, so silent
/// ignore beats raising.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSession {
    pub id: String,
    pub loop_id: String,
    pub current_activity_index: usize,
    pub activity_progress: Vec<ActivityStatus>,
    pub status: SessionStatus,
    /// Whole seconds across the whole session, breaks included.
    pub total_elapsed: u64,
    /// Whole seconds within the current activity; reset on every advance.
    pub activity_elapsed: u64,
    pub current_iteration: u32,
    pub started_at: DateTime<Utc>,
    activity_ids: Vec<String>,
    /// Duration targets in seconds, converted from minutes at start time.
    duration_targets: Vec<Option<u64>>,
    max_iterations: u32,
    break_between_iterations: u64,
    /// Seconds left in the inter-iteration break; 0 outside a break.
    break_remaining: u64,
}

impl ExecutionSession {
    /// Begins executing `record`. The activity list must be non-empty;
    /// this is the single erroring transition in the machine.
    pub fn start(id: String, record: &Loop, started_at: DateTime<Utc>) -> Result<Self> {
        if record.activities.is_empty() {
            return Err(anyhow!("cannot start a loop with no activities"));
        }

        let count = record.activities.len();
        Ok(Self {
            id,
            loop_id: record.id.clone(),
            current_activity_index: 0,
            activity_progress: vec![ActivityStatus::Pending; count],
            status: SessionStatus::Running,
            total_elapsed: 0,
            activity_elapsed: 0,
            current_iteration: 0,
            started_at,
            activity_ids: record.activities.iter().map(|a| a.id.clone()).collect(),
            duration_targets: record
                .activities
                .iter()
                .map(|a| a.duration_seconds())
                .collect(),
            max_iterations: if record.is_repeatable {
                record.max_iterations.max(1)
            } else {
                1
            },
            break_between_iterations: record.break_between_iterations,
            break_remaining: 0,
        })
    }

    pub fn activity_count(&self) -> usize {
        self.activity_ids.len()
    }

    /// Whether the session is between iterations. The break counts down
    /// through ordinary ticks only; with no activity to attribute time
    /// to there is no background snapshot, so suspending the app
    /// mid-break pauses the countdown instead of crediting wall-clock
    /// time on foreground.
    pub fn in_break(&self) -> bool {
        self.break_remaining > 0
    }

    /// Id of the activity currently being performed, if any.
    pub fn current_activity_id(&self) -> Option<&str> {
        if self.status.is_terminal() || self.in_break() {
            return None;
        }
        self.activity_ids
            .get(self.current_activity_index)
            .map(String::as_str)
    }

    pub fn activity_id_at(&self, index: usize) -> Option<&str> {
        self.activity_ids.get(index).map(String::as_str)
    }

    /// Credits wall-clock seconds accumulated while the process was
    /// suspended. Auto-completion of an over-run activity is left to the
    /// next tick.
    pub fn credit_elapsed(&mut self, seconds: u64) {
        if self.status != SessionStatus::Running
            || self.in_break()
            || self.current_activity_index >= self.activity_count()
        {
            return;
        }
        self.total_elapsed += seconds;
        self.activity_elapsed += seconds;
    }

    /// Display status for activity `index`: settled entries keep their
    /// mark, the current one reads as active while the session lives.
    pub fn status_of(&self, index: usize) -> ActivityStatus {
        let recorded = self
            .activity_progress
            .get(index)
            .copied()
            .unwrap_or_default();
        if recorded.is_settled() {
            return recorded;
        }
        if !self.status.is_terminal() && !self.in_break() && index == self.current_activity_index {
            ActivityStatus::Active
        } else {
            recorded
        }
    }

    /// Fraction of the loop behind the current activity. Matches the
    /// shipped display semantics: `index / total`, not `(index+1) / total`.
    pub fn progress_percent(&self) -> f64 {
        self.current_activity_index as f64 / self.activity_count() as f64
    }

    pub fn pause(&mut self) {
        if self.status == SessionStatus::Running {
            self.status = SessionStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == SessionStatus::Paused {
            self.status = SessionStatus::Running;
        }
    }

    /// Advances the clock by one second. Auto-completes the current
    /// activity when its duration target is reached.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != SessionStatus::Running {
            return TickOutcome::Ignored;
        }
        if self.current_activity_index >= self.activity_count() {
            return TickOutcome::Ignored;
        }

        self.total_elapsed += 1;

        if self.break_remaining > 0 {
            self.break_remaining -= 1;
            return TickOutcome::Ticked;
        }

        self.activity_elapsed += 1;

        if let Some(target) = self.duration_targets[self.current_activity_index] {
            if target > 0 && self.activity_elapsed >= target {
                let index = self.current_activity_index;
                return match self.advance(ActivityStatus::Completed) {
                    AdvanceOutcome::SessionCompleted => TickOutcome::SessionCompleted,
                    _ => TickOutcome::ActivityCompleted { index },
                };
            }
        }

        TickOutcome::Ticked
    }

    pub fn skip(&mut self) -> AdvanceOutcome {
        self.advance(ActivityStatus::Skipped)
    }

    pub fn complete(&mut self) -> AdvanceOutcome {
        self.advance(ActivityStatus::Completed)
    }

    /// Unconditional termination. Already-terminal sessions are left alone.
    pub fn stop(&mut self) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Stopped;
        }
    }

    fn advance(&mut self, mark: ActivityStatus) -> AdvanceOutcome {
        if self.status.is_terminal() || self.in_break() {
            return AdvanceOutcome::Ignored;
        }
        let index = self.current_activity_index;
        if index >= self.activity_count() {
            return AdvanceOutcome::Ignored;
        }

        self.activity_progress[index] = mark;
        self.activity_elapsed = 0;

        if index + 1 < self.activity_count() {
            self.current_activity_index = index + 1;
            return AdvanceOutcome::Advanced {
                next_index: self.current_activity_index,
            };
        }

        if self.current_iteration + 1 < self.max_iterations {
            self.current_iteration += 1;
            self.current_activity_index = 0;
            self.activity_progress = vec![ActivityStatus::Pending; self.activity_count()];
            self.break_remaining = self.break_between_iterations;
            return AdvanceOutcome::IterationStarted {
                iteration: self.current_iteration,
            };
        }

        self.current_activity_index = self.activity_count();
        self.status = SessionStatus::Completed;
        AdvanceOutcome::SessionCompleted
    }
}
