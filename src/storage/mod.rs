pub mod background;
pub mod kv;

pub use background::{
    BackgroundTimerSnapshot, BackgroundTimerStore, ForegroundReconciliation, BACKGROUND_TIMER_KEY,
};
pub use kv::KvStore;
