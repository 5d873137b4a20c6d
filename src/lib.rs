//! Core of the MindKnot productivity app: loops (repeatable activity
//! sequences), their execution sessions and timers, and the persistence
//! underneath. The presentation layer binds to [`SessionController`]
//! events and renders; nothing here draws UI.

pub mod builder;
pub mod catalog;
pub mod context;
pub mod db;
pub mod format;
pub mod models;
pub mod session;
pub mod storage;
pub mod utils;

pub use builder::{BuilderStep, LoopBuilder, ValidationError};
pub use catalog::TemplateCatalog;
pub use context::{AppContext, ThemePreference, THEME_PREFERENCE_KEY};
pub use db::Database;
pub use models::{ActivityInstance, ActivityStatus, ActivityTemplate, Category, LinkedTarget, Loop};
pub use session::{
    ExecutionSession, SessionController, SessionEvent, SessionStatus, TickOutcome,
};
pub use storage::{
    BackgroundTimerSnapshot, BackgroundTimerStore, ForegroundReconciliation, KvStore,
    BACKGROUND_TIMER_KEY,
};
