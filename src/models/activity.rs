use serde::{Deserialize, Serialize};

use super::LinkedTarget;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActivityStatus {
    Pending,
    Active,
    Completed,
    Skipped,
}

impl Default for ActivityStatus {
    fn default() -> Self {
        ActivityStatus::Pending
    }
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "Pending",
            ActivityStatus::Active => "Active",
            ActivityStatus::Completed => "Completed",
            ActivityStatus::Skipped => "Skipped",
        }
    }

    /// Completed and skipped entries are settled; they never become
    /// active again within a running iteration.
    pub fn is_settled(&self) -> bool {
        matches!(self, ActivityStatus::Completed | ActivityStatus::Skipped)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    pub number: u32,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubItem {
    pub label: String,
    pub completed: bool,
}

/// One occurrence of a template inside a loop, with per-loop overrides.
///
/// `id` is unique per instance, not per template; the same template may
/// appear several times in one loop. `template_id` is a weak lookup
/// reference, never ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInstance {
    pub id: String,
    pub template_id: String,
    pub title: Option<String>,
    pub quantity: Option<Quantity>,
    pub duration_minutes: Option<u32>,
    pub sub_items: Option<Vec<SubItem>>,
    pub linked_target: Option<LinkedTarget>,
    pub order: usize,
    pub status: ActivityStatus,
}

impl ActivityInstance {
    pub fn from_template(id: String, template_id: String, order: usize) -> Self {
        Self {
            id,
            template_id,
            title: None,
            quantity: None,
            duration_minutes: None,
            sub_items: None,
            linked_target: None,
            order,
            status: ActivityStatus::Pending,
        }
    }

    /// Configured duration in whole seconds. Duration is entered in
    /// minutes; conversion to seconds happens here, once.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.duration_minutes
            .map(|minutes| u64::from(minutes) * 60)
    }
}
