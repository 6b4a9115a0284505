//! Ephemeral share records.
//!
//! A share is a submitted photo plus its hot dog verdict, kept in memory for a
//! fixed time-to-live so it can be viewed through a link. Nothing is persisted:
//! restarting the process drops every share.
//!
//! Expired records are swept whenever a new share is published. Between sweeps
//! an expired record may still sit in the map, but lookups treat it as absent.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ShareError, ShareResult};
pub use id::ShareId;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Default time-to-live for a share (one hour).
pub const DEFAULT_TTL_SECS: u64 = 60 * 60;

/// Longest accepted time-to-live (one year).
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Default time-to-live for a share as a `chrono::Duration`.
pub fn default_ttl() -> Duration {
    Duration::seconds(DEFAULT_TTL_SECS as i64)
}

/// Convert a time-to-live in seconds into a `chrono::Duration`.
///
/// Accepts `1..=MAX_TTL_SECS`.
pub fn ttl_from_secs(secs: u64) -> ShareResult<Duration> {
    if secs == 0 || secs > MAX_TTL_SECS {
        return Err(ShareError::invalid_input(format!(
            "ttl must be between 1 and {} seconds, got {}",
            MAX_TTL_SECS, secs
        )));
    }
    let secs = i64::try_from(secs)
        .map_err(|_| ShareError::invalid_input(format!("ttl out of range: {}", secs)))?;
    Duration::try_seconds(secs)
        .ok_or_else(|| ShareError::invalid_input(format!("ttl out of range: {}", secs)))
}

/// A published share.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    #[serde(skip)]
    pub id: ShareId,
    /// The submitted image, typically a `data:` URL. Opaque to the store.
    pub image_data: String,
    pub is_hot_dog: bool,
    /// Creation time, serialized as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl ShareRecord {
    /// Age of the record at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Whether the record is still visible at `now`.
    pub fn is_live(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) <= ttl
    }
}

/// In-memory store of live shares.
///
/// Safe to share between request handlers behind an `Arc`.
pub struct ShareStore {
    records: RwLock<HashMap<ShareId, ShareRecord>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ShareStore {
    /// Create a store using the given clock and time-to-live.
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    /// Create a store backed by the wall clock.
    pub fn with_system_clock(ttl: Duration) -> Self {
        Self::new(Arc::new(SystemClock), ttl)
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a new share and return its identifier.
    ///
    /// The identifier is usable for `lookup` as soon as this returns. Every
    /// publish also sweeps records older than the TTL.
    pub fn publish(&self, image_data: impl Into<String>, is_hot_dog: bool) -> ShareResult<ShareId> {
        let image_data = image_data.into();
        if image_data.is_empty() {
            return Err(ShareError::invalid_input("image data is required"));
        }

        let now = self.clock.now();
        let mut records = self
            .records
            .write()
            .map_err(|_| ShareError::internal("share map lock poisoned"))?;

        let mut id = ShareId::generate();
        while records.contains_key(&id) {
            id = ShareId::generate();
        }

        records.insert(
            id.clone(),
            ShareRecord {
                id: id.clone(),
                image_data,
                is_hot_dog,
                created_at: now,
            },
        );

        let swept = sweep_expired(&mut records, now, self.ttl);
        if swept > 0 {
            debug!(swept, retained = records.len(), "Swept expired shares");
        }

        Ok(id)
    }

    /// Find a live share by identifier.
    ///
    /// Returns `ShareError::NotFound` when no record exists or it has expired.
    pub fn lookup(&self, id: &str) -> ShareResult<ShareRecord> {
        let now = self.clock.now();
        let records = self
            .records
            .read()
            .map_err(|_| ShareError::internal("share map lock poisoned"))?;

        match records.get(id) {
            Some(record) if record.is_live(now, self.ttl) => Ok(record.clone()),
            _ => Err(ShareError::not_found(id)),
        }
    }

    /// Remove every expired record, returning how many were dropped.
    pub fn sweep(&self) -> ShareResult<usize> {
        let now = self.clock.now();
        let mut records = self
            .records
            .write()
            .map_err(|_| ShareError::internal("share map lock poisoned"))?;
        Ok(sweep_expired(&mut records, now, self.ttl))
    }

    /// Number of records physically held, live or not yet swept.
    ///
    /// Still counts after a poisoned lock; the map itself is never left
    /// half-updated by a panicking writer.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the store holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ShareStore {
    fn default() -> Self {
        Self::with_system_clock(default_ttl())
    }
}

fn sweep_expired(
    records: &mut HashMap<ShareId, ShareRecord>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> usize {
    let before = records.len();
    records.retain(|_, record| record.is_live(now, ttl));
    before - records.len()
}
