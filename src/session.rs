//! Acquisition controller and the per-process lookup state it owns.
//!
//! A [`Session`] holds both category indices, the active category and the
//! refresh trigger. It loads from the snapshot cache at startup, refreshes
//! from the remote source on request, and falls back to the cache whenever a
//! refresh fails. None of its operations return errors: every failure path
//! ends in a [`Status`].

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cache::{CacheSnapshot, PersistentCache};
use crate::fetch::{TextSource, fetch_both};
use crate::index::{Category, Entry, Index};
use crate::lookup::lookup;
use crate::parse::{ParseStats, hash_content, parse_table};
use crate::status::Status;

/// Number of most recent status transitions kept in [`Session::history`].
pub const HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PairStats {
    pub primary: ParseStats,
    pub secondary: ParseStats,
}

/// Shared on/off switch for refresh requests. Disabled while a refresh runs.
#[derive(Debug, Clone, Default)]
pub struct RefreshTrigger {
    busy: Arc<AtomicBool>,
}

impl RefreshTrigger {
    pub fn is_enabled(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }

    fn disable(&self) -> Option<TriggerGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TriggerGuard {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Re-enables the trigger when dropped, whichever way the refresh ended.
struct TriggerGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct Session<S> {
    cache: PersistentCache,
    source: S,
    primary: Index,
    secondary: Index,
    active: Category,
    captured_at: Option<String>,
    trigger: RefreshTrigger,
    status: Status,
    history: Vec<Status>,
    parse_stats: Option<PairStats>,
}

impl<S: TextSource> Session<S> {
    pub fn new(cache: PersistentCache, source: S) -> Self {
        Self {
            cache,
            source,
            primary: Index::new(),
            secondary: Index::new(),
            active: Category::default(),
            captured_at: None,
            trigger: RefreshTrigger::default(),
            status: Status::Idle,
            history: Vec::new(),
            parse_stats: None,
        }
    }

    /// Startup protocol: serve the cached snapshot if there is one, otherwise refresh.
    pub async fn start(&mut self) -> &Status {
        if let Some(snapshot) = self.cache.load() {
            let captured_at = snapshot.captured_at_display.clone();
            self.adopt_snapshot(snapshot);
            self.set_status(Status::LoadedFromCache { captured_at });
            return &self.status;
        }

        self.set_status(Status::NoCacheFetching);
        self.refresh().await
    }

    /// Fetches both sheets. On success they replace the current indices and
    /// the snapshot; on any failure the cached snapshot is used instead.
    pub async fn refresh(&mut self) -> &Status {
        let Some(_guard) = self.trigger.disable() else {
            tracing::warn!("refresh already in progress, request ignored");
            return &self.status;
        };

        self.set_status(Status::Updating);
        let fetched = fetch_both(&self.source).await;
        let next = match fetched {
            Ok(pair) => self.adopt_text(&pair.primary, &pair.secondary),
            Err(errors) => {
                for err in &errors {
                    tracing::warn!("{err}");
                }
                self.fall_back_to_cache()
            }
        };
        self.set_status(next);
        &self.status
    }

    /// Looks the key up in the active category's index.
    pub fn find(&mut self, key: &str) -> Option<Entry> {
        let hit = lookup(key, self.index(self.active)).cloned();
        self.set_status(if hit.is_some() {
            Status::Found
        } else {
            Status::NoResults
        });
        hit
    }

    pub fn select(&mut self, category: Category) {
        self.active = category;
    }
}

impl<S> Session<S> {
    pub fn active(&self) -> Category {
        self.active
    }

    pub fn index(&self, category: Category) -> &Index {
        match category {
            Category::Primary => &self.primary,
            Category::Secondary => &self.secondary,
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// The most recent status transitions, oldest first, at most [`HISTORY_LIMIT`].
    pub fn history(&self) -> &[Status] {
        &self.history
    }

    /// Display timestamp of the data currently held, if it came from a snapshot.
    pub fn captured_at(&self) -> Option<&str> {
        self.captured_at.as_deref()
    }

    pub fn parse_stats(&self) -> Option<PairStats> {
        self.parse_stats
    }

    pub fn refresh_trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    pub fn cache(&self) -> &PersistentCache {
        &self.cache
    }

    fn adopt_text(&mut self, primary_text: &str, secondary_text: &str) -> Status {
        let primary = parse_table(primary_text);
        let secondary = parse_table(secondary_text);
        tracing::debug!(
            primary_digest = %hash_content(primary_text),
            secondary_digest = %hash_content(secondary_text),
            primary_accepted = primary.stats.accepted,
            primary_discarded = primary.stats.discarded(),
            secondary_accepted = secondary.stats.accepted,
            secondary_discarded = secondary.stats.discarded(),
            "parsed sheets"
        );

        self.parse_stats = Some(PairStats {
            primary: primary.stats,
            secondary: secondary.stats,
        });
        self.primary = primary.index;
        self.secondary = secondary.index;

        let saved = match self.cache.save(&self.primary, &self.secondary) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!("failed to persist snapshot: {err:#}");
                self.captured_at = None;
                return Status::Updated { captured_at: None };
            }
        };

        // Read back so the reported time is exactly what is on disk.
        let captured_at = self
            .cache
            .load()
            .map(|s| s.captured_at_display)
            .unwrap_or(saved.captured_at_display);
        self.captured_at = Some(captured_at.clone());
        Status::Updated {
            captured_at: Some(captured_at),
        }
    }

    fn fall_back_to_cache(&mut self) -> Status {
        match self.cache.load() {
            Some(snapshot) => {
                let captured_at = snapshot.captured_at_display.clone();
                self.adopt_snapshot(snapshot);
                Status::OfflineUsingCache { captured_at }
            }
            None => Status::NoData,
        }
    }

    fn adopt_snapshot(&mut self, snapshot: CacheSnapshot) {
        self.captured_at = Some(snapshot.captured_at_display);
        self.primary = snapshot.primary;
        self.secondary = snapshot.secondary;
    }

    fn set_status(&mut self, status: Status) {
        tracing::info!(status = %status, "status changed");
        if self.history.len() >= HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(status.clone());
        self.status = status;
    }
}
