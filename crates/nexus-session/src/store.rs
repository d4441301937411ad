//! The cookie-backed session store.
//!
//! Pure data access, no policy: the coordinator decides *when* to create,
//! touch, or clear the record; this store only knows *how*. All writes
//! are best-effort — a failed cookie or storage write logs a warning and
//! flips the store into degraded mode, where the current tab keeps
//! working from an in-memory copy (cross-tab sync and reload survival are
//! lost, the in-tab timer is not).

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nexus_context::{
    Clock, CookieAttributes, CookieJar, Origin, SameSite, StorageHandle,
};

use crate::record::generate_session_id;
use crate::{
    SESSION_COOKIE_MAX_AGE_SECS, SESSION_COOKIE_NAME, SESSION_META_KEY,
    ACTIVITY_KEY, AUTH_STORAGE_KEY, LOGOUT_EVENT_KEY,
    SessionRecord, codec,
};

/// Durable representation of the current session for one browsing
/// context.
///
/// The cookie jar is shared with sibling tabs; the storage handle must be
/// the same one (same context id) the rest of the tab uses, so mirror
/// writes are suppressed from the tab's own storage listener.
pub struct SessionStore {
    cookies: CookieJar,
    storage: StorageHandle,
    clock: Arc<dyn Clock>,
    origin: Origin,
    /// In-memory copy backing degraded mode.
    current: Mutex<Option<SessionRecord>>,
    degraded: AtomicBool,
}

impl SessionStore {
    pub fn new(
        cookies: CookieJar,
        storage: StorageHandle,
        clock: Arc<dyn Clock>,
        origin: Origin,
    ) -> Self {
        Self {
            cookies,
            storage,
            clock,
            origin,
            current: Mutex::new(None),
            degraded: AtomicBool::new(false),
        }
    }

    /// Creates a fresh session record and persists it.
    pub fn create(&self, user_id: Option<&str>) -> SessionRecord {
        let now_ms = self.clock.now_ms();
        let now = timestamp(now_ms);
        let record = SessionRecord {
            session_id: generate_session_id(now_ms),
            user_id: user_id.map(String::from),
            created_at: now,
            last_activity: now,
        };
        tracing::info!(
            session_id = %record.session_id,
            user_id = ?record.user_id,
            "session created"
        );
        self.persist(&record);
        *self.current.lock().expect("session cache poisoned") =
            Some(record.clone());
        record
    }

    /// Returns the existing record if present and (when a user id is
    /// given) owned by that user; otherwise creates a new one.
    pub fn ensure(&self, user_id: Option<&str>) -> SessionRecord {
        match self.read() {
            Some(existing)
                if user_id.is_none()
                    || existing.user_id.as_deref() == user_id =>
            {
                *self.current.lock().expect("session cache poisoned") =
                    Some(existing.clone());
                existing
            }
            _ => self.create(user_id),
        }
    }

    /// Reads the current record from the cookie.
    ///
    /// A missing or corrupt cookie yields `None`. In degraded mode the
    /// in-memory copy stands in for the unreadable cookie.
    pub fn read(&self) -> Option<SessionRecord> {
        if let Some(value) = self.cookies.get(SESSION_COOKIE_NAME) {
            match codec::decode_cookie_value(&value) {
                Some(record) => return Some(record),
                None => {
                    tracing::warn!(
                        "corrupt session cookie, treating as absent"
                    );
                }
            }
        }
        if self.degraded.load(Ordering::SeqCst) {
            return self
                .current
                .lock()
                .expect("session cache poisoned")
                .clone();
        }
        None
    }

    /// Bumps `last_activity` and re-persists with a fresh max-age, so the
    /// cookie window keeps sliding forward while the user is active.
    ///
    /// No-op returning `None` when no session exists.
    pub fn update_activity(
        &self,
        timestamp_ms: Option<i64>,
    ) -> Option<SessionRecord> {
        let mut record = self.read()?;
        let ts = timestamp_ms.unwrap_or_else(|| self.clock.now_ms());
        record.last_activity = timestamp(ts);
        self.persist(&record);
        *self.current.lock().expect("session cache poisoned") =
            Some(record.clone());
        Some(record)
    }

    /// Expires the cookie and wipes every mirrored local key, including
    /// the auth provider's own persisted session. Full local wipe, not
    /// just this subsystem's state.
    pub fn clear(&self) {
        self.cookies.expire(SESSION_COOKIE_NAME);
        for key in [
            SESSION_META_KEY,
            ACTIVITY_KEY,
            LOGOUT_EVENT_KEY,
            AUTH_STORAGE_KEY,
        ] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key, %err, "failed to remove local key");
            }
        }
        *self.current.lock().expect("session cache poisoned") = None;
        self.degraded.store(false, Ordering::SeqCst);
        tracing::info!("session cleared");
    }

    /// True iff a readable record with a non-empty id exists.
    pub fn has_valid(&self) -> bool {
        self.read().is_some_and(|r| !r.session_id.is_empty())
    }

    /// The mirrored metadata from shared storage, if readable.
    pub fn meta(&self) -> Option<SessionRecord> {
        let stored = self.storage.get(SESSION_META_KEY)?;
        serde_json::from_str(&stored).ok()
    }

    fn persist(&self, record: &SessionRecord) {
        match codec::encode_cookie_value(record) {
            Ok(value) => {
                let attributes = CookieAttributes {
                    max_age_secs: Some(SESSION_COOKIE_MAX_AGE_SECS),
                    path: "/".to_string(),
                    same_site: SameSite::Strict,
                    secure: self.origin.is_secure_context(),
                };
                if let Err(err) =
                    self.cookies.set(SESSION_COOKIE_NAME, &value, attributes)
                {
                    tracing::warn!(
                        %err,
                        "failed to write session cookie, continuing in memory"
                    );
                    self.degraded.store(true, Ordering::SeqCst);
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to encode session cookie");
            }
        }
        match serde_json::to_string(record) {
            Ok(json) => {
                if let Err(err) = self.storage.set(SESSION_META_KEY, &json)
                {
                    tracing::warn!(
                        %err,
                        "failed to mirror session metadata"
                    );
                    self.degraded.store(true, Ordering::SeqCst);
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to encode session metadata");
            }
        }
    }
}

fn timestamp(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
