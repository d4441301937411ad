//! Sending side of the cross-tab sync.

use nexus_context::StorageHandle;
use nexus_session::{ACTIVITY_KEY, LOGOUT_EVENT_KEY};

use crate::{ActivityMessage, LogoutMessage, LogoutReason};

/// Announces activity and logout events to sibling tabs through the
/// shared storage area.
///
/// Must be built from the same [`StorageHandle`] (or a clone) as the
/// tab's own storage subscription: the context id on the handle is what
/// keeps a tab from hearing its own announcements back.
///
/// All sends are best-effort. A failed write is logged and swallowed;
/// losing cross-tab sync must never take down the local timer.
#[derive(Clone)]
pub struct ActivityBroadcaster {
    storage: StorageHandle,
}

impl ActivityBroadcaster {
    pub fn new(storage: StorageHandle) -> Self {
        Self { storage }
    }

    /// Tells sibling tabs the user was active at `ts` (epoch millis).
    pub fn announce_activity(&self, ts: i64) {
        let msg = ActivityMessage { ts };
        let encoded = match msg.encode() {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(%err, "failed to encode activity message");
                return;
            }
        };
        if let Err(err) = self.storage.set(ACTIVITY_KEY, &encoded) {
            tracing::warn!(%err, "activity broadcast failed");
        }
    }

    /// Tells sibling tabs a logout has been forced.
    pub fn announce_logout(&self, reason: LogoutReason, ts: i64) {
        let msg = LogoutMessage { reason, ts };
        let encoded = match msg.encode() {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(%err, "failed to encode logout message");
                return;
            }
        };
        if let Err(err) = self.storage.set(LOGOUT_EVENT_KEY, &encoded) {
            tracing::warn!(%err, "logout broadcast failed");
        } else {
            tracing::info!(%reason, ts, "logout announced to sibling tabs");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_context::SharedStorage;

    #[tokio::test]
    async fn test_announce_activity_reaches_other_tab() {
        let storage = SharedStorage::new();
        let sender = ActivityBroadcaster::new(storage.context());
        let other_tab = storage.context();
        let mut events = other_tab.subscribe();

        sender.announce_activity(123_456);

        let event = events.recv().await.expect("event should arrive");
        assert_eq!(event.key, ACTIVITY_KEY);
        let msg = ActivityMessage::decode(&event.new_value.unwrap()).unwrap();
        assert_eq!(msg.ts, 123_456);
    }

    #[tokio::test]
    async fn test_announce_logout_reaches_other_tab() {
        let storage = SharedStorage::new();
        let sender = ActivityBroadcaster::new(storage.context());
        let other_tab = storage.context();
        let mut events = other_tab.subscribe();

        sender.announce_logout(LogoutReason::IdleTimeout, 999);

        let event = events.recv().await.expect("event should arrive");
        assert_eq!(event.key, LOGOUT_EVENT_KEY);
        let msg = LogoutMessage::decode(&event.new_value.unwrap()).unwrap();
        assert_eq!(msg.reason, LogoutReason::IdleTimeout);
        assert_eq!(msg.ts, 999);
    }

    #[tokio::test]
    async fn test_own_tab_does_not_hear_its_announcement() {
        let storage = SharedStorage::new();
        let tab = storage.context();
        let sender = ActivityBroadcaster::new(tab.clone());
        let mut own_events = tab.subscribe();
        let sibling = storage.context();

        sender.announce_activity(1);
        // A sibling write is the only thing the sender's listener sees.
        sibling.set("marker", "x").unwrap();

        let event = own_events.recv().await.expect("event should arrive");
        assert_eq!(event.key, "marker");
    }

    #[test]
    fn test_failed_broadcast_is_swallowed() {
        let storage = SharedStorage::new();
        let sender = ActivityBroadcaster::new(storage.context());
        storage.set_write_errors(true);

        // Must not panic or propagate.
        sender.announce_activity(1);
        sender.announce_logout(LogoutReason::Manual, 2);
    }
}
