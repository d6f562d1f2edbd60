//! Persistent snapshot of both category indices.
//!
//! Uses LMDB (via heed). A single key in a single named database holds the
//! JSON-encoded [`CacheSnapshot`]; each save replaces it inside one write
//! transaction, so readers see either the old snapshot or the new one.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use heed::types::Str;
use heed::{Database, Env, EnvFlags, EnvOpenOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::index::{Category, Index};

pub const SNAPSHOT_DB: &str = "snapshot";
pub const SNAPSHOT_KEY: &str = "current";

/// Age after which `stats` flags a snapshot as stale. Informational only:
/// cached data stays usable for lookups no matter how old it is.
pub const MAX_CACHE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024;
const DEFAULT_MAX_DBS: u32 = 4;

type StrDb = Database<Str, Str>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub captured_at_epoch_ms: i64,
    pub captured_at_display: String,
    pub primary: Index,
    pub secondary: Index,
}

impl CacheSnapshot {
    pub fn capture(primary: Index, secondary: Index) -> Self {
        Self::capture_at(Local::now(), primary, secondary)
    }

    pub fn capture_at<Tz: TimeZone>(at: DateTime<Tz>, primary: Index, secondary: Index) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            captured_at_epoch_ms: at.timestamp_millis(),
            captured_at_display: at.format(DISPLAY_FORMAT).to_string(),
            primary,
            secondary,
        }
    }

    pub fn index(&self, category: Category) -> &Index {
        match category {
            Category::Primary => &self.primary,
            Category::Secondary => &self.secondary,
        }
    }

    pub fn age(&self, now_epoch_ms: i64) -> Duration {
        let millis = now_epoch_ms.saturating_sub(self.captured_at_epoch_ms).max(0);
        Duration::from_millis(u64::try_from(millis).unwrap_or(0))
    }

    fn is_well_formed(&self) -> bool {
        self.primary.is_well_formed() && self.secondary.is_well_formed()
    }
}

#[derive(Debug)]
pub struct PersistentCache {
    env: Env,
    db_path: PathBuf,
    snapshots: StrDb,
}

impl PersistentCache {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let env = open_env(&db_path)?;

        let mut wtxn = env.write_txn()?;
        let snapshots = env.create_database::<Str, Str>(&mut wtxn, Some(SNAPSHOT_DB))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            db_path,
            snapshots,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Captures both indices with the current time and replaces the stored snapshot.
    pub fn save(&self, primary: &Index, secondary: &Index) -> Result<CacheSnapshot> {
        let snapshot = CacheSnapshot::capture(primary.clone(), secondary.clone());
        self.put_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    pub fn put_snapshot(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        let mut wtxn = self.env.write_txn()?;
        self.snapshots.put(&mut wtxn, SNAPSHOT_KEY, payload.as_str())?;
        wtxn.commit()?;
        tracing::info!(
            db = %self.db_path.display(),
            captured_at = %snapshot.captured_at_display,
            primary_keys = snapshot.primary.key_count(),
            secondary_keys = snapshot.secondary.key_count(),
            "snapshot written"
        );
        Ok(())
    }

    /// Returns the stored snapshot, or `None` when there is none or it cannot be trusted.
    pub fn load(&self) -> Option<CacheSnapshot> {
        let raw = match self.read_raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(db = %self.db_path.display(), "failed to read snapshot: {err:#}");
                return None;
            }
        };

        match serde_json::from_str::<CacheSnapshot>(&raw) {
            Ok(snapshot) if snapshot.is_well_formed() => Some(snapshot),
            Ok(_) => {
                tracing::warn!(db = %self.db_path.display(), "ignoring snapshot with invalid keys or values");
                None
            }
            Err(err) => {
                tracing::warn!(db = %self.db_path.display(), "ignoring corrupt snapshot: {err}");
                None
            }
        }
    }

    fn read_raw(&self) -> Result<Option<String>> {
        let rtxn = self.env.read_txn()?;
        Ok(self
            .snapshots
            .get(&rtxn, SNAPSHOT_KEY)?
            .map(|v| v.to_string()))
    }

    pub fn stats(&self) -> CacheStats {
        let snapshot = self.load();
        let now_ms = Local::now().timestamp_millis();

        let (captured_at, age_secs, stale) = match snapshot.as_ref() {
            Some(s) => {
                let age = s.age(now_ms);
                (
                    Some(s.captured_at_display.clone()),
                    Some(age.as_secs()),
                    age > MAX_CACHE_AGE,
                )
            }
            None => (None, None, false),
        };

        let count = |category: Category| {
            snapshot
                .as_ref()
                .map(|s| CategoryStats {
                    keys: s.index(category).key_count(),
                    entries: s.index(category).entry_count(),
                })
                .unwrap_or_default()
        };

        CacheStats {
            db_path: self.db_path.to_string_lossy().to_string(),
            has_snapshot: snapshot.is_some(),
            captured_at,
            age_secs,
            stale,
            primary: count(Category::Primary),
            secondary: count(Category::Secondary),
        }
    }
}

fn open_env(db_path: &Path) -> Result<Env> {
    let mut options = EnvOpenOptions::new();
    options.map_size(DEFAULT_MAP_SIZE);
    options.max_dbs(DEFAULT_MAX_DBS);
    // SAFETY: We do not use NO_LOCK and keep default LMDB locking guarantees.
    // NO_SUB_DIR keeps --db pointing at a single file.
    unsafe {
        options.flags(EnvFlags::NO_SUB_DIR);
        options
            .open(db_path)
            .with_context(|| format!("Failed to create/open db env: {}", db_path.display()))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CategoryStats {
    pub keys: usize,
    pub entries: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub db_path: String,
    pub has_snapshot: bool,
    pub captured_at: Option<String>,
    pub age_secs: Option<u64>,
    pub stale: bool,
    pub primary: CategoryStats,
    pub secondary: CategoryStats,
}
