use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{models::Loop, storage::BackgroundTimerStore};

use super::{AdvanceOutcome, ExecutionSession, TickOutcome};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Events the presentation layer subscribes to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged { session: ExecutionSession },
    Heartbeat { session: ExecutionSession },
    ActivityCompleted { activity_id: String, index: usize },
    SessionCompleted { session: ExecutionSession },
}

/// Async driver around [`ExecutionSession`]: owns the once-per-second
/// ticker task, the event channel, and the background-snapshot side
/// effects of every transition.
///
/// One session at a time. Commands and ticks serialize on a single mutex,
/// so a tick landing next to a pause skews by at most one second.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<Option<ExecutionSession>>>,
    background: BackgroundTimerStore,
    events: broadcast::Sender<SessionEvent>,
    ticker: Arc<Mutex<Option<CancellationToken>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl SessionController {
    pub fn new(background: BackgroundTimerStore) -> Self {
        let debug_mode = std::env::var("MINDKNOT_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let (events, _) = broadcast::channel(64);

        Self {
            state: Arc::new(Mutex::new(None)),
            background,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Option<ExecutionSession> {
        self.state.lock().await.clone()
    }

    /// Starts executing `record`. Fails when the loop has no activities
    /// or another session is still live.
    pub async fn start(&self, record: &Loop) -> Result<ExecutionSession> {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = ExecutionSession::start(session_id, record, now)?;

        {
            let mut guard = self.state.lock().await;
            if guard.as_ref().is_some_and(|s| !s.status.is_terminal()) {
                return Err(anyhow!("a session is already active"));
            }
            *guard = Some(session.clone());
        }

        if let Some(activity_id) = session.current_activity_id() {
            self.background.track(activity_id, now);
        }

        self.spawn_ticker().await;
        self.emit(SessionEvent::StateChanged {
            session: session.clone(),
        });

        log_info!("session {} started for loop {}", session.id, session.loop_id);
        Ok(session)
    }

    pub async fn pause(&self) {
        let snapshot = {
            let mut guard = self.state.lock().await;
            let Some(session) = guard.as_mut() else {
                return;
            };
            let was_running = session.status == super::SessionStatus::Running;
            session.pause();
            if !was_running {
                return;
            }
            self.background.freeze(session.activity_elapsed);
            session.clone()
        };
        self.emit(SessionEvent::StateChanged { session: snapshot });
    }

    pub async fn resume(&self) {
        let snapshot = {
            let mut guard = self.state.lock().await;
            let Some(session) = guard.as_mut() else {
                return;
            };
            let was_paused = session.status == super::SessionStatus::Paused;
            session.resume();
            if !was_paused {
                return;
            }
            self.background.reanchor(Utc::now());
            session.clone()
        };
        self.emit(SessionEvent::StateChanged { session: snapshot });
    }

    pub async fn skip(&self) {
        self.advance(|session| session.skip()).await;
    }

    pub async fn complete(&self) {
        self.advance(|session| session.complete()).await;
    }

    /// Terminates whatever session exists, live or not, and discards the
    /// background snapshot.
    pub async fn stop(&self) -> Option<ExecutionSession> {
        let snapshot = {
            let mut guard = self.state.lock().await;
            let Some(mut session) = guard.take() else {
                return None;
            };
            session.stop();
            session
        };

        self.cancel_ticker().await;
        self.background.clear();
        self.emit(SessionEvent::StateChanged {
            session: snapshot.clone(),
        });
        log_info!("session {} stopped", snapshot.id);
        Some(snapshot)
    }

    /// Host signaled a transition to the background: flush the current
    /// per-activity clock into the snapshot and stamp the wall clock.
    pub async fn handle_app_background(&self) {
        let now = Utc::now();
        let guard = self.state.lock().await;
        if let Some(session) = guard.as_ref() {
            if let Some(activity_id) = session.current_activity_id() {
                self.background.sync(activity_id, session.activity_elapsed);
            }
        }
        drop(guard);
        self.background.mark_background(now);
    }

    /// Host returned to the foreground: credit the wall-clock delta to
    /// the in-memory session. Auto-completion of an over-run activity is
    /// left to the next tick.
    pub async fn handle_app_foreground(&self) {
        let Some(reconciliation) = self.background.reconcile_foreground(Utc::now()) else {
            return;
        };

        let snapshot = {
            let mut guard = self.state.lock().await;
            let Some(session) = guard.as_mut() else {
                return;
            };
            if session.current_activity_id() != Some(reconciliation.activity_id.as_str()) {
                return;
            }
            session.credit_elapsed(reconciliation.additional_elapsed);
            session.clone()
        };

        log_info!(
            "credited {}s of background time to activity {}",
            reconciliation.additional_elapsed,
            reconciliation.activity_id
        );
        self.emit(SessionEvent::StateChanged { session: snapshot });
    }

    async fn advance(
        &self,
        op: impl FnOnce(&mut ExecutionSession) -> AdvanceOutcome,
    ) -> Option<ExecutionSession> {
        let now = Utc::now();
        let (outcome, snapshot) = {
            let mut guard = self.state.lock().await;
            let session = guard.as_mut()?;
            let outcome = op(session);
            (outcome, session.clone())
        };

        match outcome {
            AdvanceOutcome::Ignored => return None,
            AdvanceOutcome::Advanced { .. } => {
                if let Some(activity_id) = snapshot.current_activity_id() {
                    self.background.track(activity_id, now);
                    // Skipping while paused must not re-arm wall-clock
                    // accrual; the clock stays frozen until resume.
                    if snapshot.status == super::SessionStatus::Paused {
                        self.background.freeze(0);
                    }
                }
            }
            AdvanceOutcome::IterationStarted { iteration } => {
                // No current activity during the break, so no snapshot:
                // suspending the app mid-break stalls the countdown.
                // Tracking restarts when the next activity goes active.
                self.background.clear();
                log_info!("session {} entered iteration {iteration}", snapshot.id);
            }
            AdvanceOutcome::SessionCompleted => {
                self.cancel_ticker().await;
                self.background.clear();
                self.state.lock().await.take();
                self.emit(SessionEvent::SessionCompleted {
                    session: snapshot.clone(),
                });
                return Some(snapshot);
            }
        }

        self.emit(SessionEvent::StateChanged {
            session: snapshot.clone(),
        });
        Some(snapshot)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(token) = ticker_guard.take() {
            token.cancel();
        }

        let token = CancellationToken::new();
        let state = self.state.clone();
        let background = self.background.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;
        let tick_token = token.clone();

        tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = tick_token.cancelled() => break,
                }

                let (outcome, snapshot) = {
                    let mut guard = state.lock().await;
                    let Some(session) = guard.as_mut() else {
                        break;
                    };
                    let outcome = session.tick();
                    let snapshot = session.clone();

                    if outcome == TickOutcome::SessionCompleted {
                        guard.take();
                    }
                    (outcome, snapshot)
                };

                match outcome {
                    TickOutcome::Ignored => {
                        if snapshot.status.is_terminal() {
                            break;
                        }
                    }
                    TickOutcome::Ticked => {
                        // An ended break has no snapshot yet; restart
                        // tracking for the activity that just went active.
                        if let Some(activity_id) = snapshot.current_activity_id() {
                            if background.snapshot().is_none() {
                                background.track(activity_id, Utc::now());
                            }
                        }
                    }
                    TickOutcome::ActivityCompleted { index } => {
                        match snapshot.current_activity_id() {
                            Some(next_id) => background.track(next_id, Utc::now()),
                            // Wrapped into an iteration break.
                            None => background.clear(),
                        }
                        let completed_id = snapshot
                            .activity_id_at(index)
                            .unwrap_or_default()
                            .to_string();
                        let _ = events.send(SessionEvent::ActivityCompleted {
                            activity_id: completed_id,
                            index,
                        });
                        let _ = events.send(SessionEvent::StateChanged {
                            session: snapshot.clone(),
                        });
                    }
                    TickOutcome::SessionCompleted => {
                        background.clear();
                        let _ = events.send(SessionEvent::SessionCompleted {
                            session: snapshot,
                        });
                        break;
                    }
                }

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    let _ = events.send(SessionEvent::Heartbeat { session: snapshot });
                }
            }
        });

        *ticker_guard = Some(token);
    }

    async fn cancel_ticker(&self) {
        if let Some(token) = self.ticker.lock().await.take() {
            token.cancel();
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine; events are advisory.
        let _ = self.events.send(event);
    }
}
