use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ActivityInstance;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    pub sound: bool,
    pub vibrate: bool,
    /// Keeps the session overlay visible while a loop is executing.
    pub persistent_overlay: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
            vibrate: false,
            persistent_overlay: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSettings {
    pub enabled: bool,
    /// "HH:MM", 24-hour.
    pub time: Option<String>,
    /// Weekdays the schedule fires on, 0 = Monday .. 6 = Sunday.
    pub days: Vec<u8>,
}

/// Aggregate root: an ordered, owned sequence of activity instances plus
/// execution settings.
///
/// `activities` ordering is significant. Every mutation that changes
/// positions must leave each instance's `order` field equal to its vec
/// index; `move_activity` and `normalize_order` maintain this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loop {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub activities: Vec<ActivityInstance>,
    pub tags: Vec<String>,
    pub category_id: Option<String>,
    pub is_repeatable: bool,
    pub max_iterations: u32,
    /// Seconds of break inserted between iterations of a repeatable loop.
    pub break_between_iterations: u64,
    pub notification_settings: NotificationSettings,
    pub schedule_settings: ScheduleSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loop {
    pub fn new(id: String, title: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            description: None,
            activities: Vec::new(),
            tags: Vec::new(),
            category_id: None,
            is_repeatable: false,
            max_iterations: 1,
            break_between_iterations: 0,
            notification_settings: NotificationSettings::default(),
            schedule_settings: ScheduleSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the activity at `from` to position `to`, shifting the rest,
    /// then rewrites every `order` field to match the new vec index.
    pub fn move_activity(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.activities.len();
        if from >= len || to >= len {
            return Err(anyhow!(
                "activity move out of bounds: {from} -> {to} (len {len})"
            ));
        }
        let activity = self.activities.remove(from);
        self.activities.insert(to, activity);
        self.normalize_order();
        Ok(())
    }

    /// Sorts by stored `order` and rewrites the field to the vec index.
    /// Applied after loading from storage so a stale record cannot leak
    /// inconsistent positions into a session.
    pub fn normalize_order(&mut self) {
        self.activities.sort_by_key(|a| a.order);
        for (index, activity) in self.activities.iter_mut().enumerate() {
            activity.order = index;
        }
    }

    pub fn add_tag(&mut self, tag: String) {
        if !self.tags.iter().any(|t| t == &tag) {
            self.tags.push(tag);
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
