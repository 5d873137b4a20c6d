//! End-to-end session coverage: controller transitions, background
//! snapshot side effects, lifecycle reconciliation, and the builder →
//! execute path.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use mindknot_core::{
    models::{ActivityInstance, Loop},
    ActivityStatus, BackgroundTimerSnapshot, BackgroundTimerStore, Database, KvStore, LoopBuilder,
    SessionController, SessionEvent, SessionStatus, BACKGROUND_TIMER_KEY,
};
use tempfile::TempDir;
use uuid::Uuid;

struct Harness {
    #[allow(dead_code)]
    temp_dir: TempDir,
    kv: Arc<KvStore>,
    controller: SessionController,
}

impl Harness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let kv = Arc::new(KvStore::open(temp_dir.path().join("storage.json")).unwrap());
        let controller = SessionController::new(BackgroundTimerStore::new(Arc::clone(&kv)));
        Self {
            temp_dir,
            kv,
            controller,
        }
    }

    fn background_snapshot(&self) -> Option<BackgroundTimerSnapshot> {
        self.kv.get(BACKGROUND_TIMER_KEY).unwrap()
    }
}

fn loop_with_activities(durations_minutes: &[Option<u32>]) -> Loop {
    let mut record = Loop::new(Uuid::new_v4().to_string(), "Flow".into(), Utc::now());
    for (index, duration) in durations_minutes.iter().enumerate() {
        let mut activity =
            ActivityInstance::from_template(Uuid::new_v4().to_string(), "journal".into(), index);
        activity.duration_minutes = *duration;
        record.activities.push(activity);
    }
    record
}

#[tokio::test]
async fn start_rejects_empty_and_double_sessions() {
    let harness = Harness::new();

    let empty = loop_with_activities(&[]);
    assert!(harness.controller.start(&empty).await.is_err());
    assert!(harness.controller.snapshot().await.is_none());

    let record = loop_with_activities(&[None]);
    harness.controller.start(&record).await.unwrap();
    assert!(harness.controller.start(&record).await.is_err());
}

#[tokio::test]
async fn start_tracks_the_first_activity() {
    let harness = Harness::new();
    let record = loop_with_activities(&[None, None]);

    let session = harness.controller.start(&record).await.unwrap();
    assert_eq!(session.status, SessionStatus::Running);
    assert_eq!(session.activity_progress.len(), 2);

    let snapshot = harness.background_snapshot().unwrap();
    assert!(snapshot.is_running);
    assert_eq!(snapshot.activity_id, record.activities[0].id);
    assert_eq!(snapshot.elapsed_seconds, 0);
}

#[tokio::test]
async fn pause_freezes_and_resume_reanchors_the_snapshot() {
    let harness = Harness::new();
    let record = loop_with_activities(&[None]);
    harness.controller.start(&record).await.unwrap();

    harness.controller.pause().await;
    let session = harness.controller.snapshot().await.unwrap();
    assert_eq!(session.status, SessionStatus::Paused);
    assert!(!harness.background_snapshot().unwrap().is_running);

    // Second pause is a no-op.
    harness.controller.pause().await;
    assert_eq!(
        harness.controller.snapshot().await.unwrap().status,
        SessionStatus::Paused
    );

    harness.controller.resume().await;
    let session = harness.controller.snapshot().await.unwrap();
    assert_eq!(session.status, SessionStatus::Running);
    assert!(harness.background_snapshot().unwrap().is_running);
}

#[tokio::test]
async fn skip_retargets_the_snapshot_and_completion_clears_it() {
    let harness = Harness::new();
    let record = loop_with_activities(&[None, None]);
    harness.controller.start(&record).await.unwrap();
    let mut events = harness.controller.subscribe();

    harness.controller.skip().await;
    let session = harness.controller.snapshot().await.unwrap();
    assert_eq!(session.current_activity_index, 1);
    assert_eq!(session.activity_progress[0], ActivityStatus::Skipped);
    assert_eq!(
        harness.background_snapshot().unwrap().activity_id,
        record.activities[1].id
    );

    harness.controller.complete().await;
    assert!(harness.controller.snapshot().await.is_none());
    assert!(harness.background_snapshot().is_none());

    let mut saw_completion = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::SessionCompleted { .. }) {
            saw_completion = true;
        }
    }
    assert!(saw_completion);
}

#[tokio::test(start_paused = true)]
async fn skipping_while_paused_keeps_the_snapshot_frozen() {
    let harness = Harness::new();
    let record = loop_with_activities(&[None, None]);
    harness.controller.start(&record).await.unwrap();
    harness.controller.pause().await;

    harness.controller.skip().await;

    // The retargeted snapshot must stay frozen: the session is paused.
    let snapshot = harness.background_snapshot().unwrap();
    assert_eq!(snapshot.activity_id, record.activities[1].id);
    assert!(!snapshot.is_running);

    // Backgrounding across a suspension therefore accrues nothing.
    harness.controller.handle_app_background().await;
    tokio::time::sleep(std::time::Duration::from_secs(50)).await;
    harness.controller.handle_app_foreground().await;

    let session = harness.controller.snapshot().await.unwrap();
    assert_eq!(session.status, SessionStatus::Paused);
    assert_eq!(session.activity_elapsed, 0);
    assert_eq!(harness.background_snapshot().unwrap().elapsed_seconds, 0);

    // Resume re-arms the clock from here on.
    harness.controller.resume().await;
    assert!(harness.background_snapshot().unwrap().is_running);
}

#[tokio::test]
async fn stop_discards_session_and_snapshot() {
    let harness = Harness::new();
    let record = loop_with_activities(&[None, None]);
    harness.controller.start(&record).await.unwrap();
    harness.controller.pause().await;

    let stopped = harness.controller.stop().await.unwrap();
    assert_eq!(stopped.status, SessionStatus::Stopped);
    assert!(harness.controller.snapshot().await.is_none());
    assert!(harness.background_snapshot().is_none());

    // Stopping with nothing live stays quiet.
    assert!(harness.controller.stop().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn foregrounding_credits_background_elapsed_to_the_session() {
    let harness = Harness::new();
    let record = loop_with_activities(&[None]);
    harness.controller.start(&record).await.unwrap();

    let before = harness.controller.snapshot().await.unwrap().activity_elapsed;

    // Simulate what backgrounding 50 seconds ago would have left behind.
    let now = Utc::now();
    harness
        .kv
        .set(
            BACKGROUND_TIMER_KEY,
            &BackgroundTimerSnapshot {
                is_running: true,
                start_time: now - ChronoDuration::seconds(60),
                elapsed_seconds: 10,
                activity_id: record.activities[0].id.clone(),
                background_start_time: Some(now - ChronoDuration::seconds(50)),
            },
        )
        .unwrap();

    harness.controller.handle_app_foreground().await;

    let session = harness.controller.snapshot().await.unwrap();
    assert_eq!(session.activity_elapsed, before + 50);

    let snapshot = harness.background_snapshot().unwrap();
    assert_eq!(snapshot.elapsed_seconds, 60);
    assert!(snapshot.background_start_time.is_none());
}

#[tokio::test(start_paused = true)]
async fn paused_sessions_gain_nothing_across_backgrounding() {
    let harness = Harness::new();
    let record = loop_with_activities(&[None]);
    harness.controller.start(&record).await.unwrap();
    harness.controller.pause().await;

    let before = harness.controller.snapshot().await.unwrap().activity_elapsed;
    let frozen = harness.background_snapshot().unwrap().elapsed_seconds;

    harness.controller.handle_app_background().await;
    tokio::time::sleep(std::time::Duration::from_secs(50)).await;
    harness.controller.handle_app_foreground().await;

    let session = harness.controller.snapshot().await.unwrap();
    assert_eq!(session.activity_elapsed, before);
    assert_eq!(session.status, SessionStatus::Paused);
    assert_eq!(
        harness.background_snapshot().unwrap().elapsed_seconds,
        frozen
    );
}

#[tokio::test(start_paused = true)]
async fn ticker_auto_completes_a_timed_activity() {
    let harness = Harness::new();
    let mut events = harness.controller.subscribe();

    // First activity runs for one minute, second has no target.
    let record = loop_with_activities(&[Some(1), None]);
    harness.controller.start(&record).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(65)).await;

    let session = harness.controller.snapshot().await.unwrap();
    assert_eq!(session.activity_progress[0], ActivityStatus::Completed);
    assert_eq!(session.current_activity_index, 1);
    assert_eq!(session.activity_progress[1], ActivityStatus::Pending);
    assert!(session.total_elapsed >= 60);

    let mut saw_auto_complete = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::ActivityCompleted { activity_id, index } = event {
            assert_eq!(activity_id, record.activities[0].id);
            assert_eq!(index, 0);
            saw_auto_complete = true;
        }
    }
    assert!(saw_auto_complete);

    let snapshot = harness.background_snapshot().unwrap();
    assert_eq!(snapshot.activity_id, record.activities[1].id);
}

#[tokio::test]
async fn built_loops_execute_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(temp_dir.path().join("mindknot.db")).unwrap();

    let mut builder = LoopBuilder::create(db.clone());
    builder.set_title("Wind down");
    builder.add_activity("read");
    builder.add_activity("meditate");
    let saved = builder.save().await.unwrap();

    let kv = Arc::new(KvStore::open(temp_dir.path().join("storage.json")).unwrap());
    let controller = SessionController::new(BackgroundTimerStore::new(kv));

    let loaded = db.get_loop(&saved.id).await.unwrap().unwrap();
    controller.start(&loaded).await.unwrap();
    controller.complete().await;
    controller.complete().await;

    assert!(controller.snapshot().await.is_none());
}
