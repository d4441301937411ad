//! The idle coordinator actor.
//!
//! One coordinator per browsing context, running as its own Tokio task
//! and owning all idle state for that context: the timer, the warning
//! surface, the session store, and the tab's half of the cross-tab
//! broadcasts. The outside world talks to it through a cheap cloneable
//! handle; inbound stimuli (commands, auth transitions, timer wakeups,
//! storage events, network signals) are serialized by one select loop,
//! so there is no locking around the lifecycle itself.

use std::sync::Arc;

use nexus_broadcast::{
    ActivityBroadcaster, ActivityMessage, LogoutMessage, LogoutReason,
};
use nexus_context::{
    ActivityEvent, Clock, CookieJar, Navigator, Origin, StorageEvent,
    StorageEvents, StorageHandle, SystemClock,
};
use nexus_http::{HttpClient, NetworkActivityTap};
use nexus_idle::{IdleConfig, IdleEvent, IdlePhase, IdleTimer};
use nexus_session::{ACTIVITY_KEY, LOGOUT_EVENT_KEY, SessionStore};
use tokio::sync::{mpsc, watch};

use crate::{AuthProvider, AuthState, NexusError, RedirectRoutes};

/// What the host should render about the idle warning right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdleWarning {
    pub visible: bool,
    pub seconds_remaining: u64,
}

enum Command {
    Activity(ActivityEvent),
    StayConnected,
    Logout,
    Unload,
    Shutdown,
}

/// Handle to a running coordinator.
#[derive(Clone)]
pub struct IdleCoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
    warning: watch::Receiver<IdleWarning>,
}

impl IdleCoordinatorHandle {
    /// Reports a user interaction observed by the host embedding.
    pub fn report_activity(
        &self,
        event: ActivityEvent,
    ) -> Result<(), NexusError> {
        self.send(Command::Activity(event))
    }

    /// The "stay connected" button on the warning dialog.
    pub fn stay_connected(&self) -> Result<(), NexusError> {
        self.send(Command::StayConnected)
    }

    /// Host-requested logout (the user clicked "sign out").
    pub fn logout(&self) -> Result<(), NexusError> {
        self.send(Command::Logout)
    }

    /// The context is about to unload; persist activity so a reloaded
    /// tab resumes with an accurate anchor.
    pub fn notify_unload(&self) -> Result<(), NexusError> {
        self.send(Command::Unload)
    }

    /// Stops the coordinator task.
    pub fn shutdown(&self) -> Result<(), NexusError> {
        self.send(Command::Shutdown)
    }

    /// A watch on the warning dialog state.
    pub fn warning(&self) -> watch::Receiver<IdleWarning> {
        self.warning.clone()
    }

    fn send(&self, command: Command) -> Result<(), NexusError> {
        self.commands
            .send(command)
            .map_err(|_| NexusError::CoordinatorClosed)
    }
}

/// Builds and spawns an [`IdleCoordinatorHandle`] for one context.
pub struct IdleCoordinatorBuilder<A> {
    auth: Arc<A>,
    storage: StorageHandle,
    cookies: CookieJar,
    origin: Origin,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    config: IdleConfig,
    routes: RedirectRoutes,
    http: Option<HttpClient>,
}

impl<A: AuthProvider> IdleCoordinatorBuilder<A> {
    pub fn new(
        auth: Arc<A>,
        storage: StorageHandle,
        cookies: CookieJar,
        origin: Origin,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            auth,
            storage,
            cookies,
            origin,
            navigator,
            clock: Arc::new(SystemClock),
            config: IdleConfig::default(),
            routes: RedirectRoutes::default(),
            http: None,
        }
    }

    /// Clock override; tests inject a manual clock here.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: IdleConfig) -> Self {
        self.config = config.validated();
        self
    }

    pub fn routes(mut self, routes: RedirectRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Attaches a network tap to this client while signed in, so API
    /// traffic counts as user presence.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http = Some(client);
        self
    }

    /// Spawns the coordinator task and returns its handle.
    pub fn build(self) -> IdleCoordinatorHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (warning_tx, warning_rx) =
            watch::channel(IdleWarning::default());
        let (network_tx, network_rx) = mpsc::unbounded_channel();

        let storage_events = self.storage.subscribe();
        let store = SessionStore::new(
            self.cookies,
            self.storage.clone(),
            Arc::clone(&self.clock),
            self.origin,
        );
        let broadcaster = ActivityBroadcaster::new(self.storage);
        let timer = IdleTimer::new(&self.config, Arc::clone(&self.clock));
        let tap = self
            .http
            .map(|client| NetworkActivityTap::new(client, network_tx));

        let coordinator = Coordinator {
            auth_rx: self.auth.subscribe(),
            auth: self.auth,
            store,
            broadcaster,
            timer,
            storage_events,
            command_rx,
            network_rx,
            tap,
            navigator: self.navigator,
            routes: self.routes,
            clock: self.clock,
            warning_tx,
            attached: false,
            last_logout_seen: None,
        };
        tokio::spawn(coordinator.run());

        IdleCoordinatorHandle {
            commands: command_tx,
            warning: warning_rx,
        }
    }
}

/// One select-loop iteration's worth of input, captured as a value so
/// the handling below can take `&mut self` freely.
enum Step {
    Command(Option<Command>),
    AuthChanged(bool),
    Timer(IdleEvent),
    Storage(Option<StorageEvent>),
    Network(Option<()>),
}

struct Coordinator<A: AuthProvider> {
    auth: Arc<A>,
    auth_rx: watch::Receiver<AuthState>,
    store: SessionStore,
    broadcaster: ActivityBroadcaster,
    timer: IdleTimer,
    storage_events: StorageEvents,
    command_rx: mpsc::UnboundedReceiver<Command>,
    network_rx: mpsc::UnboundedReceiver<()>,
    tap: Option<NetworkActivityTap>,
    navigator: Arc<dyn Navigator>,
    routes: RedirectRoutes,
    clock: Arc<dyn Clock>,
    warning_tx: watch::Sender<IdleWarning>,
    /// True while a signed-in session is being tracked.
    attached: bool,
    /// Identity of the last logout broadcast handled, for de-duplication
    /// across at-least-once delivery.
    last_logout_seen: Option<(LogoutReason, i64)>,
}

impl<A: AuthProvider> Coordinator<A> {
    async fn run(mut self) {
        let initial = self.auth_rx.borrow_and_update().clone();
        if let AuthState::Authenticated { user_id } = initial {
            self.restore_session(&user_id).await;
        }

        loop {
            let step = tokio::select! {
                command = self.command_rx.recv() => Step::Command(command),
                changed = self.auth_rx.changed() => {
                    Step::AuthChanged(changed.is_ok())
                }
                event = self.timer.wait_for_event() => Step::Timer(event),
                event = self.storage_events.recv() => Step::Storage(event),
                signal = self.network_rx.recv(), if self.tap.is_some() => {
                    Step::Network(signal)
                }
            };

            match step {
                Step::Command(None) | Step::AuthChanged(false) => {
                    self.detach();
                    break;
                }
                Step::Command(Some(command)) => {
                    if self.handle_command(command).await {
                        break;
                    }
                }
                Step::AuthChanged(true) => {
                    let state = self.auth_rx.borrow_and_update().clone();
                    self.handle_auth_state(state).await;
                }
                Step::Timer(event) => self.handle_timer_event(event).await,
                Step::Storage(Some(event)) => {
                    self.handle_storage_event(event).await;
                }
                Step::Storage(None) => {
                    tracing::warn!("shared storage gone, cross-tab sync lost");
                }
                Step::Network(Some(())) => {
                    self.reset_idle(self.clock.now_ms(), true).await;
                }
                Step::Network(None) => {}
            }
        }
        tracing::debug!("idle coordinator stopped");
    }

    /// Returns `true` when the loop should exit.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Activity(event) => {
                // A tab going hidden is not presence; everything else is.
                if event != (ActivityEvent::VisibilityChanged { visible: false })
                {
                    self.reset_idle(self.clock.now_ms(), true).await;
                }
            }
            Command::StayConnected => {
                tracing::info!("user chose to stay connected");
                self.reset_idle(self.clock.now_ms(), true).await;
            }
            Command::Logout => {
                self.forced_logout(LogoutReason::Manual).await;
            }
            Command::Unload => self.persist_on_unload(),
            Command::Shutdown => {
                self.detach();
                return true;
            }
        }
        false
    }

    async fn handle_auth_state(&mut self, state: AuthState) {
        match state {
            AuthState::Authenticated { user_id } => {
                tracing::info!(%user_id, "signed in, starting idle tracking");
                self.store.ensure(Some(&user_id));
                self.attach();
                self.reset_idle(self.clock.now_ms(), true).await;
            }
            AuthState::Anonymous => self.detach(),
        }
    }

    async fn handle_timer_event(&mut self, event: IdleEvent) {
        match event {
            IdleEvent::WarningShown { seconds_remaining } => {
                tracing::info!(seconds_remaining, "idle warning shown");
                self.set_warning(true, seconds_remaining);
            }
            IdleEvent::CountdownTick { seconds_remaining } => {
                self.set_warning(true, seconds_remaining);
            }
            IdleEvent::Expired => {
                tracing::info!("idle deadline passed");
                self.forced_logout(LogoutReason::IdleTimeout).await;
            }
        }
    }

    async fn handle_storage_event(&mut self, event: StorageEvent) {
        match (event.key.as_str(), event.new_value) {
            (ACTIVITY_KEY, Some(raw)) => {
                if !self.attached {
                    return;
                }
                if let Some(message) = ActivityMessage::decode(&raw) {
                    tracing::debug!(
                        ts = message.ts,
                        writer = %event.writer,
                        "activity synced from sibling tab"
                    );
                    self.sync_reset(message.ts).await;
                }
            }
            (LOGOUT_EVENT_KEY, Some(raw)) => {
                if let Some(message) = LogoutMessage::decode(&raw) {
                    self.remote_logout(message).await;
                }
            }
            _ => {}
        }
    }

    /// Validates a persisted session on startup in an already-signed-in
    /// context (a reloaded tab).
    async fn restore_session(&mut self, user_id: &str) {
        let Some(record) = self.store.read() else {
            tracing::info!("signed in but no session record, forcing logout");
            self.forced_logout(LogoutReason::SessionExpired).await;
            return;
        };
        if record.session_id.is_empty() {
            self.forced_logout(LogoutReason::SessionExpired).await;
            return;
        }
        self.attach();
        let anchor = record.last_activity_ms();
        if self.timer.reset_at(anchor) == IdlePhase::Expired {
            tracing::info!(
                anchor,
                "session already past its idle deadline on restore"
            );
            self.forced_logout(LogoutReason::IdleTimeout).await;
            return;
        }
        // Rotate the record if it belongs to someone else.
        if record.user_id.as_deref() != Some(user_id) {
            self.store.ensure(Some(user_id));
        }
        tracing::info!(
            user_id,
            anchor,
            seconds_remaining = self.timer.seconds_remaining(),
            "session restored"
        );
    }

    /// Re-arms the timer on fresh activity at `anchor_ms`, persisting it
    /// and, when `announce` is set, telling sibling tabs.
    async fn reset_idle(&mut self, anchor_ms: i64, announce: bool) {
        if !self.attached {
            return;
        }
        if self.timer.reset_at(anchor_ms) == IdlePhase::Expired {
            self.forced_logout(LogoutReason::IdleTimeout).await;
            return;
        }
        self.set_warning(false, 0);
        self.store.update_activity(Some(anchor_ms));
        if announce {
            self.broadcaster.announce_activity(anchor_ms);
        }
    }

    /// Re-anchors on a sibling tab's activity. No persistence and no
    /// re-announcement: the sibling already did both, and echoing back
    /// would ping-pong between tabs forever.
    async fn sync_reset(&mut self, anchor_ms: i64) {
        if self.timer.reset_at(anchor_ms) == IdlePhase::Expired {
            self.forced_logout(LogoutReason::IdleTimeout).await;
            return;
        }
        self.set_warning(false, 0);
    }

    /// Tears down after a logout decided by this tab: revoke with the
    /// provider, wipe local state, tell the siblings, redirect.
    async fn forced_logout(&mut self, reason: LogoutReason) {
        self.detach();
        let ts = self.clock.now_ms();
        if let Err(err) = self.auth.logout(reason).await {
            tracing::error!(
                %err,
                %reason,
                "auth provider logout failed, clearing local state anyway"
            );
        }
        self.store.clear();
        self.broadcaster.announce_logout(reason, ts);
        self.last_logout_seen = Some((reason, ts));
        self.navigator
            .navigate(&self.routes.login_with_reason(reason));
        tracing::info!(%reason, "logged out");
    }

    /// Applies a logout decided by a sibling tab. Same teardown, but no
    /// re-announcement — the initiating tab already told everyone.
    async fn remote_logout(&mut self, message: LogoutMessage) {
        if self.last_logout_seen == Some((message.reason, message.ts)) {
            tracing::debug!(
                reason = %message.reason,
                ts = message.ts,
                "duplicate logout broadcast ignored"
            );
            return;
        }
        self.last_logout_seen = Some((message.reason, message.ts));
        tracing::info!(reason = %message.reason, "logout synced from sibling tab");
        self.detach();
        if let Err(err) = self.auth.logout(message.reason).await {
            tracing::error!(
                %err,
                reason = %message.reason,
                "auth provider logout failed, clearing local state anyway"
            );
        }
        self.store.clear();
        self.navigator
            .navigate(&self.routes.login_with_reason(message.reason));
    }

    /// The context is unloading; persist and announce the current moment
    /// so a reload (or a surviving sibling) resumes from it.
    fn persist_on_unload(&mut self) {
        if !self.attached {
            return;
        }
        let now = self.clock.now_ms();
        self.store.update_activity(Some(now));
        self.broadcaster.announce_activity(now);
        tracing::debug!(now, "activity persisted before unload");
    }

    fn attach(&mut self) {
        if let Some(tap) = &self.tap {
            tap.attach();
        }
        self.attached = true;
    }

    fn detach(&mut self) {
        self.timer.stop();
        self.set_warning(false, 0);
        if let Some(tap) = &self.tap {
            tap.detach();
        }
        self.attached = false;
    }

    fn set_warning(&self, visible: bool, seconds_remaining: u64) {
        self.warning_tx.send_replace(IdleWarning {
            visible,
            seconds_remaining,
        });
    }
}
