//! Explicit application context: constructed once at startup, torn down
//! at shutdown, and passed by reference to whatever needs it. No
//! implicit globals.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::TemplateCatalog,
    db::Database,
    session::SessionController,
    storage::{BackgroundTimerStore, KvStore},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const THEME_PREFERENCE_KEY: &str = "@MindKnot:themePreference";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    System,
}

impl Default for ThemePreference {
    fn default() -> Self {
        ThemePreference::System
    }
}

pub struct AppContext {
    db: Database,
    kv: Arc<KvStore>,
    background_timer: BackgroundTimerStore,
    catalog: TemplateCatalog,
    session: SessionController,
}

impl AppContext {
    pub fn init(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("mindknot.db"))?;
        let kv = Arc::new(KvStore::open(data_dir.join("storage.json"))?);
        let background_timer = BackgroundTimerStore::new(Arc::clone(&kv));
        let session = SessionController::new(background_timer.clone());

        Ok(Self {
            db,
            kv,
            background_timer,
            catalog: TemplateCatalog::seeded(),
            session,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn kv(&self) -> &Arc<KvStore> {
        &self.kv
    }

    pub fn background_timer(&self) -> &BackgroundTimerStore {
        &self.background_timer
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Unreadable preference degrades to the default rather than failing
    /// app startup.
    pub fn theme_preference(&self) -> ThemePreference {
        match self.kv.get::<ThemePreference>(THEME_PREFERENCE_KEY) {
            Ok(Some(preference)) => preference,
            Ok(None) => ThemePreference::default(),
            Err(err) => {
                log_warn!("theme preference unreadable, using default: {err:#}");
                ThemePreference::default()
            }
        }
    }

    pub fn set_theme_preference(&self, preference: ThemePreference) -> Result<()> {
        self.kv.set(THEME_PREFERENCE_KEY, &preference)
    }
}
