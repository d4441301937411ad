//! End-to-end coordinator behavior over simulated tabs.
//!
//! Each test builds an origin (shared storage + cookie jar + manual
//! clock) and opens one or more coordinators on it, then drives the
//! manual clock. The paused runtime's virtual time is advanced alongside
//! with generous sleeps; the timer re-checks the manual clock after
//! every wakeup, so overshooting virtual time never produces spurious
//! events.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use http::{Request, Response, StatusCode};
use nexus_connect::{
    ActivityMessage, IdleConfig, IdleCoordinatorBuilder,
    IdleCoordinatorHandle, InMemoryAuth, LogoutMessage, LogoutReason,
};
use nexus_context::{
    ActivityEvent, CookieJar, ManualClock, Origin, RouteLog, Scheme,
    SharedStorage, StorageEvents,
};
use nexus_http::{HttpClient, HttpError, HttpTransport};
use nexus_session::{
    ACTIVITY_KEY, LOGOUT_EVENT_KEY, SESSION_META_KEY, SessionStore,
};
use tokio::time::timeout;

struct World {
    storage: SharedStorage,
    cookies: CookieJar,
    clock: ManualClock,
    origin: Origin,
}

impl World {
    fn new() -> Self {
        let clock = ManualClock::new(0);
        Self {
            storage: SharedStorage::new(),
            cookies: CookieJar::new(Arc::new(clock.clone())),
            clock,
            origin: Origin::new(Scheme::Https, "localhost"),
        }
    }

    /// Opens a coordinator with a one-minute idle window and a five
    /// second warning.
    fn open_tab(
        &self,
        auth: Arc<InMemoryAuth>,
    ) -> (IdleCoordinatorHandle, RouteLog) {
        self.open_tab_with(auth, |builder| builder)
    }

    fn open_tab_with(
        &self,
        auth: Arc<InMemoryAuth>,
        customize: impl FnOnce(
            IdleCoordinatorBuilder<InMemoryAuth>,
        ) -> IdleCoordinatorBuilder<InMemoryAuth>,
    ) -> (IdleCoordinatorHandle, RouteLog) {
        let routes = RouteLog::new();
        let builder = IdleCoordinatorBuilder::new(
            auth,
            self.storage.context(),
            self.cookies.clone(),
            self.origin.clone(),
            Arc::new(routes.clone()),
        )
        .clock(Arc::new(self.clock.clone()))
        .config(IdleConfig::new(1, 5));
        (customize(builder).build(), routes)
    }

    /// A session store bound to its own context, for seeding and
    /// inspecting persisted state from outside any coordinator.
    fn inspector(&self) -> SessionStore {
        SessionStore::new(
            self.cookies.clone(),
            self.storage.context(),
            Arc::new(self.clock.clone()),
            self.origin.clone(),
        )
    }

    /// Moves the manual clock and gives the coordinators enough virtual
    /// time to observe it.
    async fn advance(&self, ms: u64) {
        self.clock.advance(ms as i64);
        tokio::time::sleep(Duration::from_millis(ms.max(5_000) + 5)).await;
    }
}

/// Lets spawned coordinators drain their channels without moving the
/// manual clock.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Counts pending write events for one key, stopping at the first quiet
/// moment.
async fn count_writes(events: &mut StorageEvents, key: &str) -> usize {
    let mut count = 0;
    while let Ok(Some(event)) =
        timeout(Duration::from_millis(50), events.recv()).await
    {
        if event.key == key && event.new_value.is_some() {
            count += 1;
        }
    }
    count
}

struct Loopback;

impl HttpTransport for Loopback {
    fn send(
        &self,
        request: Request<Vec<u8>>,
    ) -> BoxFuture<'static, Result<Response<Vec<u8>>, HttpError>> {
        Box::pin(async move {
            Response::builder()
                .status(StatusCode::OK)
                .body(request.into_body())
                .map_err(HttpError::from)
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_idle_session_warns_then_logs_out() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (handle, routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;

    world.advance(55_000).await;
    let warning = *handle.warning().borrow();
    assert!(warning.visible);
    assert_eq!(warning.seconds_remaining, 5);

    world.advance(5_000).await;
    assert_eq!(
        routes.last().as_deref(),
        Some("/connexion?reason=idle_timeout")
    );
    assert!(!handle.warning().borrow().visible);
    assert!(!auth.current().is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_while_warning_is_up() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (handle, _routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;

    world.advance(55_000).await;
    assert_eq!(handle.warning().borrow().seconds_remaining, 5);

    world.advance(1_000).await;
    assert_eq!(handle.warning().borrow().seconds_remaining, 4);

    world.advance(1_000).await;
    assert_eq!(handle.warning().borrow().seconds_remaining, 3);
}

#[tokio::test(start_paused = true)]
async fn test_activity_postpones_the_deadline() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (handle, routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;

    world.advance(30_000).await;
    handle.report_activity(ActivityEvent::PointerMove).unwrap();
    settle().await;

    // 55s after the interaction: warning, not logout.
    world.advance(55_000).await;
    assert!(handle.warning().borrow().visible);
    assert!(routes.is_empty());
    assert!(auth.current().is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_tab_going_hidden_is_not_activity() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (handle, routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;

    world.advance(30_000).await;
    handle
        .report_activity(ActivityEvent::VisibilityChanged {
            visible: false,
        })
        .unwrap();
    settle().await;

    // Deadline unchanged: expiry still lands a minute after login.
    world.advance(30_000).await;
    assert_eq!(
        routes.last().as_deref(),
        Some("/connexion?reason=idle_timeout")
    );
}

#[tokio::test(start_paused = true)]
async fn test_tab_becoming_visible_counts_as_activity() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (handle, routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;

    world.advance(30_000).await;
    handle
        .report_activity(ActivityEvent::VisibilityChanged {
            visible: true,
        })
        .unwrap();
    settle().await;

    // Returning to the tab moved the deadline: 55s later comes the
    // warning, not the logout the original anchor would have produced.
    world.advance(55_000).await;
    assert!(handle.warning().borrow().visible);
    assert!(routes.is_empty());
    assert!(auth.current().is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_stay_connected_restarts_the_full_window() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (handle, routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;

    world.advance(55_000).await;
    assert!(handle.warning().borrow().visible);

    handle.stay_connected().unwrap();
    settle().await;
    assert!(!handle.warning().borrow().visible);

    // A fresh minute: warning reappears 55s later, no logout before.
    world.advance(55_000).await;
    assert!(handle.warning().borrow().visible);
    assert!(routes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sibling_activity_resets_without_reecho() {
    let world = World::new();
    let auth_a = Arc::new(InMemoryAuth::new());
    let auth_b = Arc::new(InMemoryAuth::new());
    let (tab_a, _routes_a) = world.open_tab(auth_a.clone());
    let (tab_b, routes_b) = world.open_tab(auth_b.clone());
    auth_a.login("user-1");
    auth_b.login("user-1");
    settle().await;

    // Observe broadcasts from a context that belongs to no coordinator.
    let observer = world.storage.context();
    let mut events = observer.subscribe();

    world.advance(30_000).await;
    tab_a.report_activity(ActivityEvent::KeyDown).unwrap();
    settle().await;

    // Exactly one announcement: tab B re-anchored silently.
    assert_eq!(count_writes(&mut events, ACTIVITY_KEY).await, 1);

    // Tab B's deadline moved with tab A's interaction.
    world.advance(55_000).await;
    assert!(tab_b.warning().borrow().visible);
    assert!(routes_b.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logout_in_one_tab_signs_out_every_tab() {
    let world = World::new();
    let auth_a = Arc::new(InMemoryAuth::new());
    let auth_b = Arc::new(InMemoryAuth::new());
    let (tab_a, routes_a) = world.open_tab(auth_a.clone());
    let (_tab_b, routes_b) = world.open_tab(auth_b.clone());
    auth_a.login("user-1");
    auth_b.login("user-1");
    settle().await;

    let observer = world.storage.context();
    let mut events = observer.subscribe();

    tab_a.logout().unwrap();
    settle().await;

    assert_eq!(
        routes_a.last().as_deref(),
        Some("/connexion?reason=manual")
    );
    assert_eq!(
        routes_b.last().as_deref(),
        Some("/connexion?reason=manual")
    );
    assert!(!auth_b.current().is_authenticated());
    // The receiving tab must not have re-announced the logout.
    assert_eq!(count_writes(&mut events, LOGOUT_EVENT_KEY).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_logout_broadcast_is_handled_once() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (_handle, routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;

    let rogue = world.storage.context();
    let message = LogoutMessage {
        reason: LogoutReason::IdleTimeout,
        ts: 123,
    };
    let encoded = message.encode().unwrap();
    rogue.set(LOGOUT_EVENT_KEY, &encoded).unwrap();
    settle().await;
    rogue.set(LOGOUT_EVENT_KEY, &encoded).unwrap();
    settle().await;

    assert_eq!(routes.len(), 1, "one navigation per distinct logout");
    assert_eq!(
        routes.last().as_deref(),
        Some("/connexion?reason=idle_timeout")
    );
}

#[tokio::test(start_paused = true)]
async fn test_reload_past_deadline_logs_out_immediately() {
    let world = World::new();
    // A previous visit left a session anchored at t=0...
    world.inspector().create(Some("user-1"));
    // ...and the tab comes back two minutes later, past the one-minute
    // idle window.
    world.clock.advance(120_000);

    let auth = Arc::new(InMemoryAuth::signed_in("user-1"));
    let (handle, routes) = world.open_tab(auth.clone());
    settle().await;

    assert_eq!(
        routes.last().as_deref(),
        Some("/connexion?reason=idle_timeout")
    );
    assert!(!auth.current().is_authenticated());
    assert!(!handle.warning().borrow().visible);
}

#[tokio::test(start_paused = true)]
async fn test_reload_without_record_expires_the_session() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::signed_in("user-1"));
    let (_handle, routes) = world.open_tab(auth.clone());
    settle().await;

    assert_eq!(
        routes.last().as_deref(),
        Some("/connexion?reason=session_expired")
    );
    assert!(!auth.current().is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_reload_within_window_resumes_remaining_time() {
    let world = World::new();
    world.inspector().create(Some("user-1"));
    world.clock.advance(30_000);

    let auth = Arc::new(InMemoryAuth::signed_in("user-1"));
    let (handle, routes) = world.open_tab(auth.clone());
    settle().await;
    assert!(auth.current().is_authenticated());

    // Only 30 of the 60 seconds remain: warning comes 25s in.
    world.advance(25_000).await;
    assert!(handle.warning().borrow().visible);
    assert!(routes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_network_request_counts_as_presence() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let client = HttpClient::new(Arc::new(Loopback));
    let (handle, routes) = world.open_tab_with(auth.clone(), |builder| {
        builder.http_client(client.clone())
    });
    auth.login("user-1");
    settle().await;

    world.advance(30_000).await;
    client
        .send(Request::builder().uri("/api/data").body(Vec::new()).unwrap())
        .await
        .unwrap();
    settle().await;

    // The request moved the deadline: warning 55s later, no logout.
    world.advance(55_000).await;
    assert!(handle.warning().borrow().visible);
    assert!(routes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unload_persists_the_current_anchor() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (handle, _routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;

    world.clock.advance(30_000);
    handle.notify_unload().unwrap();
    settle().await;

    let announced = world
        .storage
        .context()
        .get(ACTIVITY_KEY)
        .and_then(|raw| ActivityMessage::decode(&raw));
    assert_eq!(announced.map(|m| m.ts), Some(30_000));
    let record = world.inspector().read().expect("record persisted");
    assert_eq!(record.last_activity_ms(), 30_000);
}

#[tokio::test(start_paused = true)]
async fn test_manual_logout_wipes_local_state() {
    let world = World::new();
    let auth = Arc::new(InMemoryAuth::new());
    let (handle, routes) = world.open_tab(auth.clone());
    auth.login("user-1");
    settle().await;
    assert!(world.inspector().has_valid());

    handle.logout().unwrap();
    settle().await;

    assert_eq!(
        routes.last().as_deref(),
        Some("/connexion?reason=manual")
    );
    assert!(!world.inspector().has_valid());
    assert_eq!(world.storage.context().get(SESSION_META_KEY), None);
    assert!(!auth.current().is_authenticated());
}
