//! Three-step loop builder: basic info, activity selection, settings.
//!
//! Forward navigation is gated by per-step validation; backward
//! navigation is unconditional. In edit mode every field mutation marks
//! the draft dirty and `autosave` merges it into the stored record, so
//! step submission and autosave never write conflicting snapshots: the
//! stored record is re-read immediately before each merge.

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::Database,
    models::{
        ActivityInstance, Loop, NotificationSettings, ScheduleSettings,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BuilderStep {
    BasicInfo,
    Activities,
    Settings,
}

impl BuilderStep {
    fn next(self) -> Option<BuilderStep> {
        match self {
            BuilderStep::BasicInfo => Some(BuilderStep::Activities),
            BuilderStep::Activities => Some(BuilderStep::Settings),
            BuilderStep::Settings => None,
        }
    }

    fn back(self) -> Option<BuilderStep> {
        match self {
            BuilderStep::BasicInfo => None,
            BuilderStep::Activities => Some(BuilderStep::BasicInfo),
            BuilderStep::Settings => Some(BuilderStep::Activities),
        }
    }
}

/// Field-level validation failure, surfaced inline next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderMode {
    Create,
    Edit,
}

pub struct LoopBuilder {
    db: Database,
    draft: Loop,
    step: BuilderStep,
    mode: BuilderMode,
    dirty: bool,
}

impl LoopBuilder {
    pub fn create(db: Database) -> Self {
        let draft = Loop::new(Uuid::new_v4().to_string(), String::new(), Utc::now());
        Self {
            db,
            draft,
            step: BuilderStep::BasicInfo,
            mode: BuilderMode::Create,
            dirty: false,
        }
    }

    /// `Ok(None)` when the loop no longer exists; the screen shows its
    /// not-found state and navigates back.
    pub async fn edit(db: Database, loop_id: &str) -> Result<Option<Self>> {
        let Some(draft) = db.get_loop(loop_id).await? else {
            return Ok(None);
        };
        Ok(Some(Self {
            db,
            draft,
            step: BuilderStep::BasicInfo,
            mode: BuilderMode::Edit,
            dirty: false,
        }))
    }

    pub fn draft(&self) -> &Loop {
        &self.draft
    }

    pub fn step(&self) -> BuilderStep {
        self.step
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_title(&mut self, title: &str) {
        self.draft.title = title.to_string();
        self.dirty = true;
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.draft.description = description;
        self.dirty = true;
    }

    pub fn set_category(&mut self, category_id: Option<String>) {
        self.draft.category_id = category_id;
        self.dirty = true;
    }

    pub fn add_tag(&mut self, tag: &str) {
        self.draft.add_tag(tag.to_string());
        self.dirty = true;
    }

    pub fn set_repeat(&mut self, is_repeatable: bool, max_iterations: u32, break_seconds: u64) {
        self.draft.is_repeatable = is_repeatable;
        self.draft.max_iterations = max_iterations.max(1);
        self.draft.break_between_iterations = break_seconds;
        self.dirty = true;
    }

    pub fn set_notifications(&mut self, settings: NotificationSettings) {
        self.draft.notification_settings = settings;
        self.dirty = true;
    }

    pub fn set_schedule(&mut self, settings: ScheduleSettings) {
        self.draft.schedule_settings = settings;
        self.dirty = true;
    }

    /// Appends an instance of `template_id` at the end of the sequence.
    pub fn add_activity(&mut self, template_id: &str) -> &ActivityInstance {
        let order = self.draft.activities.len();
        let instance = ActivityInstance::from_template(
            Uuid::new_v4().to_string(),
            template_id.to_string(),
            order,
        );
        self.draft.activities.push(instance);
        self.dirty = true;
        self.draft.activities.last().unwrap()
    }

    pub fn remove_activity(&mut self, activity_id: &str) -> Result<()> {
        let index = self
            .draft
            .activities
            .iter()
            .position(|a| a.id == activity_id)
            .ok_or_else(|| anyhow!("activity {activity_id} not in draft"))?;
        self.draft.activities.remove(index);
        self.draft.normalize_order();
        self.dirty = true;
        Ok(())
    }

    /// Applies the instance editor's changes to one activity.
    pub fn update_activity(
        &mut self,
        activity_id: &str,
        apply: impl FnOnce(&mut ActivityInstance),
    ) -> Result<()> {
        let activity = self
            .draft
            .activities
            .iter_mut()
            .find(|a| a.id == activity_id)
            .ok_or_else(|| anyhow!("activity {activity_id} not in draft"))?;
        apply(activity);
        self.dirty = true;
        Ok(())
    }

    pub fn move_activity(&mut self, from: usize, to: usize) -> Result<()> {
        self.draft.move_activity(from, to)?;
        self.dirty = true;
        Ok(())
    }

    pub fn validate_step(&self, step: BuilderStep) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        match step {
            BuilderStep::BasicInfo => {
                if self.draft.title.trim().is_empty() {
                    errors.push(ValidationError::new("title", "Title is required"));
                }
            }
            BuilderStep::Activities => {
                if self.draft.activities.is_empty() {
                    errors.push(ValidationError::new(
                        "activities",
                        "Add at least one activity",
                    ));
                }
            }
            BuilderStep::Settings => {}
        }
        errors
    }

    /// Advances to the following step when the current one validates.
    pub fn next(&mut self) -> Result<BuilderStep, Vec<ValidationError>> {
        let errors = self.validate_step(self.step);
        if !errors.is_empty() {
            return Err(errors);
        }
        if let Some(step) = self.step.next() {
            self.step = step;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> BuilderStep {
        if let Some(step) = self.step.back() {
            self.step = step;
        }
        self.step
    }

    /// Edit-mode side channel: merges the dirty draft into the stored
    /// record without touching step navigation. Reads the stored record
    /// first so the two mutation channels never interleave writes.
    pub async fn autosave(&mut self) -> Result<()> {
        if self.mode != BuilderMode::Edit || !self.dirty {
            return Ok(());
        }

        let stored = self
            .db
            .get_loop(&self.draft.id)
            .await?
            .ok_or_else(|| anyhow!("loop {} no longer exists", self.draft.id))?;

        let mut merged = self.draft.clone();
        merged.created_at = stored.created_at;
        merged.touch(Utc::now());

        self.db.update_loop(&merged).await?;
        self.draft = merged;
        self.dirty = false;
        Ok(())
    }

    /// Final submit from the review step. Validates every gated step and
    /// persists the whole draft.
    pub async fn save(&mut self) -> Result<Loop> {
        let mut errors = self.validate_step(BuilderStep::BasicInfo);
        errors.extend(self.validate_step(BuilderStep::Activities));
        if !errors.is_empty() {
            let summary: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            return Err(anyhow!("draft has invalid fields: {}", summary.join(", ")));
        }

        self.draft.touch(Utc::now());
        match self.mode {
            BuilderMode::Create => {
                self.db.insert_loop(&self.draft).await?;
                self.mode = BuilderMode::Edit;
            }
            BuilderMode::Edit => {
                self.db.update_loop(&self.draft).await?;
            }
        }
        self.dirty = false;
        Ok(self.draft.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("builder.db")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn forward_navigation_is_gated_per_step() {
        let (_dir, db) = db();
        let mut builder = LoopBuilder::create(db);

        let errors = builder.next().unwrap_err();
        assert_eq!(errors[0].field, "title");

        builder.set_title("Morning routine");
        assert_eq!(builder.next().unwrap(), BuilderStep::Activities);

        let errors = builder.next().unwrap_err();
        assert_eq!(errors[0].field, "activities");

        builder.add_activity("stretch");
        assert_eq!(builder.next().unwrap(), BuilderStep::Settings);

        // Step 3 always validates; next() stays put at the last step.
        assert_eq!(builder.next().unwrap(), BuilderStep::Settings);
    }

    #[tokio::test]
    async fn back_is_unconditional() {
        let (_dir, db) = db();
        let mut builder = LoopBuilder::create(db);
        builder.set_title("t");
        builder.next().unwrap();

        assert_eq!(builder.back(), BuilderStep::BasicInfo);
        assert_eq!(builder.back(), BuilderStep::BasicInfo);
    }

    #[tokio::test]
    async fn activity_operations_keep_order_consistent() {
        let (_dir, db) = db();
        let mut builder = LoopBuilder::create(db);
        let a = builder.add_activity("journal").id.clone();
        builder.add_activity("stretch");
        builder.add_activity("walk");

        builder.move_activity(2, 0).unwrap();
        builder.remove_activity(&a).unwrap();

        let orders: Vec<_> = builder.draft().activities.iter().map(|x| x.order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[tokio::test]
    async fn save_then_autosave_round_trips() {
        let (_dir, db) = db();
        let mut builder = LoopBuilder::create(db.clone());
        builder.set_title("Deep work");
        builder.add_activity("read");
        let saved = builder.save().await.unwrap();

        let mut editor = LoopBuilder::edit(db.clone(), &saved.id).await.unwrap().unwrap();
        editor.set_description(Some("Two focused blocks".into()));
        editor
            .update_activity(&saved.activities[0].id.clone(), |a| {
                a.duration_minutes = Some(25);
            })
            .unwrap();
        assert!(editor.is_dirty());
        editor.autosave().await.unwrap();
        assert!(!editor.is_dirty());

        let stored = db.get_loop(&saved.id).await.unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("Two focused blocks"));
        assert_eq!(stored.activities[0].duration_minutes, Some(25));
    }

    #[tokio::test]
    async fn editing_a_deleted_loop_reports_not_found() {
        let (_dir, db) = db();
        let missing = LoopBuilder::edit(db, "gone").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn save_rejects_invalid_draft() {
        let (_dir, db) = db();
        let mut builder = LoopBuilder::create(db);
        builder.set_title("   ");
        assert!(builder.save().await.is_err());
    }
}
