//! Demo message throttling.
//!
//! Each visitor gets [`DEMO_RATE_LIMIT`] chat messages per window. A window
//! opens on the first counted message and ends once [`RESET_INTERVAL`] has
//! fully elapsed; the next lookup after that starts from zero.
//!
//! State lives behind a [`RateLimitStore`]: [`MemoryStore`] for the gateway,
//! [`JsonFileStore`] for the terminal client.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use komz_core::rate_limit::{RateLimiter, DEMO_RATE_LIMIT};
//!
//! let limiter = Arc::new(RateLimiter::demo_in_memory());
//! let slot = limiter.try_reserve("visitor-1").unwrap();
//! // ... call the model ...
//! slot.commit();
//! assert_eq!(limiter.remaining("visitor-1").unwrap(), DEMO_RATE_LIMIT - 1);
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Messages allowed per window in the public demo.
pub const DEMO_RATE_LIMIT: u32 = 5;

/// Length of a rate-limit window.
pub const RESET_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Key the single-visitor stores use.
pub const DEFAULT_STORAGE_KEY: &str = "chat_demo_rate_limit";

// ============================================================================
// RateLimitState
// ============================================================================

/// Message count for one visitor and the start of its window.
///
/// Serialized as `{"count": n, "lastReset": epoch_millis}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    /// Messages counted in the current window.
    pub count: u32,
    /// Window start, milliseconds since the Unix epoch.
    pub last_reset: i64,
}

impl RateLimitState {
    /// A zeroed state whose window starts at `now`.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            last_reset: now.timestamp_millis(),
        }
    }

    /// Whether the window has fully elapsed at `now`.
    pub fn is_expired(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now.timestamp_millis().saturating_sub(self.last_reset) > window_millis(window)
    }

    /// First instant at which the window counts as elapsed.
    pub fn resets_at(&self, window: Duration) -> DateTime<Utc> {
        let millis = self
            .last_reset
            .saturating_add(window_millis(window))
            .saturating_add(1);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn window_millis(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}

// ============================================================================
// Stores
// ============================================================================

/// Persistence for per-key rate-limit state.
pub trait RateLimitStore: Send + Sync {
    /// Returns the stored state for `key`, if any.
    fn load(&self, key: &str) -> Result<Option<RateLimitState>>;

    /// Replaces the stored state for `key`.
    fn save(&self, key: &str, state: RateLimitState) -> Result<()>;

    /// Removes every entry whose window started before `cutoff_millis`.
    /// Returns how many entries were removed.
    fn purge(&self, cutoff_millis: i64) -> Result<usize>;
}

/// Process-local store, one entry per visitor key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, RateLimitState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RateLimitStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<RateLimitState>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).copied())
    }

    fn save(&self, key: &str, state: RateLimitState) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), state);
        Ok(())
    }

    fn purge(&self, cutoff_millis: i64) -> Result<usize> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, state| state.last_reset >= cutoff_millis);
        Ok(before - entries.len())
    }
}

/// JSON file holding a `{key: state}` object.
///
/// The terminal client's stand-in for browser local storage. A missing file
/// is an empty store. An unreadable one is an [`Error::CorruptState`], so a
/// damaged file never hands out a fresh quota.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers see either the old or the new contents.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("komz").join("rate_limit.json"))
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, RateLimitState>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(Error::io_with_path(e, &self.path)),
        };

        serde_json::from_str(&content).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Unreadable rate-limit file");
            Error::CorruptState {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })
    }

    fn write_all(&self, entries: &HashMap<String, RateLimitState>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| Error::io_with_path(e, dir))?;

        let json = serde_json::to_vec_pretty(entries)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io_with_path(e, dir))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::io_with_path(e, tmp.path()))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::io_with_path(e.error, &self.path))?;
        Ok(())
    }
}

impl RateLimitStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<RateLimitState>> {
        Ok(self.read_all()?.get(key).copied())
    }

    fn save(&self, key: &str, state: RateLimitState) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), state);
        self.write_all(&entries)
    }

    fn purge(&self, cutoff_millis: i64) -> Result<usize> {
        let mut entries = self.read_all()?;
        let before = entries.len();
        entries.retain(|_, state| state.last_reset >= cutoff_millis);
        let removed = before - entries.len();
        if removed > 0 {
            self.write_all(&entries)?;
        }
        Ok(removed)
    }
}

// ============================================================================
// RateLimiter
// ============================================================================

/// Fixed-window message limiter over a [`RateLimitStore`].
///
/// Every read-modify-write runs under one lock, so concurrent reservations
/// for the same key never overshoot the limit.
pub struct RateLimiter {
    store: Box<dyn RateLimitStore>,
    limit: u32,
    window: Duration,
    lock: Mutex<()>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Creates a limiter allowing `limit` messages per `window`.
    pub fn new(store: impl RateLimitStore + 'static, limit: u32, window: Duration) -> Self {
        Self {
            store: Box::new(store),
            limit,
            window,
            lock: Mutex::new(()),
        }
    }

    /// In-memory limiter with the public demo settings.
    pub fn demo_in_memory() -> Self {
        Self::new(MemoryStore::new(), DEMO_RATE_LIMIT, RESET_INTERVAL)
    }

    /// Messages allowed per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current state for `key`, with an elapsed window shown as reset.
    pub fn state(&self, key: &str) -> Result<RateLimitState> {
        self.state_at(key, Utc::now())
    }

    /// [`state`](Self::state) at a fixed instant.
    pub fn state_at(&self, key: &str, now: DateTime<Utc>) -> Result<RateLimitState> {
        Ok(match self.store.load(key)? {
            Some(state) if !state.is_expired(self.window, now) => state,
            _ => RateLimitState::fresh(now),
        })
    }

    /// Whether `key` has used up its messages.
    pub fn is_limited(&self, key: &str) -> Result<bool> {
        self.is_limited_at(key, Utc::now())
    }

    /// [`is_limited`](Self::is_limited) at a fixed instant.
    pub fn is_limited_at(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.state_at(key, now)?.count >= self.limit)
    }

    /// Messages `key` may still send in this window.
    pub fn remaining(&self, key: &str) -> Result<u32> {
        self.remaining_at(key, Utc::now())
    }

    /// [`remaining`](Self::remaining) at a fixed instant.
    pub fn remaining_at(&self, key: &str, now: DateTime<Utc>) -> Result<u32> {
        Ok(self.limit.saturating_sub(self.state_at(key, now)?.count))
    }

    /// Counts one message for `key` unconditionally and returns the new state.
    pub fn increment(&self, key: &str) -> Result<RateLimitState> {
        self.increment_at(key, Utc::now())
    }

    /// [`increment`](Self::increment) at a fixed instant.
    pub fn increment_at(&self, key: &str, now: DateTime<Utc>) -> Result<RateLimitState> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.state_at(key, now)?;
        state.count = state.count.saturating_add(1);
        self.store.save(key, state)?;
        Ok(state)
    }

    /// Takes one message slot for `key` if any is left.
    ///
    /// The slot is given back when the returned [`Reservation`] is dropped
    /// without [`Reservation::commit`].
    pub fn try_reserve(self: &Arc<Self>, key: &str) -> Result<Reservation> {
        self.try_reserve_at(key, Utc::now())
    }

    /// [`try_reserve`](Self::try_reserve) at a fixed instant.
    pub fn try_reserve_at(self: &Arc<Self>, key: &str, now: DateTime<Utc>) -> Result<Reservation> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.state_at(key, now)?;

        if state.count >= self.limit {
            let retry_after = (state.resets_at(self.window) - now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            tracing::debug!(key, count = state.count, "Rate limit reached");
            return Err(Error::RateLimited {
                limit: self.limit,
                retry_after,
            });
        }

        state.count += 1;
        self.store.save(key, state)?;

        Ok(Reservation {
            limiter: Arc::clone(self),
            key: key.to_string(),
            window_start: state.last_reset,
            remaining: self.limit - state.count,
            resets_at: state.resets_at(self.window),
            committed: false,
        })
    }

    /// Drops every entry whose window has elapsed.
    pub fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(Utc::now())
    }

    /// [`purge_expired`](Self::purge_expired) at a fixed instant.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let cutoff = now
            .timestamp_millis()
            .saturating_sub(window_millis(self.window));
        self.store.purge(cutoff)
    }

    fn refund(&self, key: &str, window_start: i64) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut state) = self.store.load(key)? {
            // A rolled-over window already forgot the slot.
            if state.last_reset == window_start && state.count > 0 {
                state.count -= 1;
                self.store.save(key, state)?;
            }
        }
        Ok(())
    }
}

/// One reserved message slot.
#[must_use = "dropping a reservation gives the slot back"]
#[derive(Debug)]
pub struct Reservation {
    limiter: Arc<RateLimiter>,
    key: String,
    window_start: i64,
    remaining: u32,
    resets_at: DateTime<Utc>,
    committed: bool,
}

impl Reservation {
    /// Key the slot was taken for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Messages left after this one.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// When the window this slot belongs to resets.
    pub fn resets_at(&self) -> DateTime<Utc> {
        self.resets_at
    }

    /// Keeps the slot counted.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = self.limiter.refund(&self.key, self.window_start) {
            tracing::warn!(key = %self.key, error = %e, "Failed to return rate-limit slot");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
