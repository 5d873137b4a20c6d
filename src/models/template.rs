use serde::{Deserialize, Serialize};

/// Entity kind an activity can link to elsewhere in the app.
///
/// Closed set on purpose: an unknown target is a compile error, not a
/// silent fallback icon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkedTarget {
    Notes,
    Sparks,
    Actions,
    Paths,
}

impl LinkedTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkedTarget::Notes => "notes",
            LinkedTarget::Sparks => "sparks",
            LinkedTarget::Actions => "actions",
            LinkedTarget::Paths => "paths",
        }
    }
}

/// Reusable catalog entry describing an activity type. Seeded once at
/// startup and never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTemplate {
    pub id: String,
    pub title: String,
    pub emoji: String,
    pub category: String,
    pub default_linked_target: Option<LinkedTarget>,
}
