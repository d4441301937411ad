//! Two simulated tabs on one origin, sharing an idle session.
//!
//! Runs in real time with a one-minute idle window: tab A gets one
//! interaction a few seconds in (watch tab B re-anchor silently), then
//! both tabs sit idle until the countdown runs out and the first expiry
//! logs out both. Takes a bit over a minute; set
//! `NEXUS_IDLE_TIMEOUT_MINUTES` / `NEXUS_IDLE_WARNING_SECONDS` to try
//! other windows.

use std::sync::Arc;
use std::time::Duration;

use nexus_connect::{
    IdleConfig, IdleCoordinatorBuilder, IdleCoordinatorHandle,
    IdleWarning, InMemoryAuth, logout_message, parse_reason,
};
use nexus_context::{
    ActivityEvent, Clock, CookieJar, Origin, RouteLog, Scheme,
    SharedStorage, SystemClock,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = if std::env::var_os("NEXUS_IDLE_TIMEOUT_MINUTES").is_some()
    {
        IdleConfig::from_env()
    } else {
        // One minute idle, warning for the last 55 seconds.
        IdleConfig::new(1, 55)
    };
    tracing::info!(
        idle_minutes = config.idle_minutes,
        warning_seconds = config.warning_seconds,
        "starting two-tab demo"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let storage = SharedStorage::new();
    let cookies = CookieJar::new(Arc::clone(&clock));
    let origin = Origin::new(Scheme::Https, "localhost");

    let (tab_a, auth_a, _routes_a) =
        open_tab("tab-a", &storage, &cookies, &origin, &clock, config);
    let (_tab_b, auth_b, routes_b) =
        open_tab("tab-b", &storage, &cookies, &origin, &clock, config);

    auth_a.login("marie");
    auth_b.login("marie");
    tracing::info!("both tabs signed in as marie");

    tokio::time::sleep(Duration::from_secs(3)).await;
    tracing::info!("interaction in tab A; tab B re-anchors silently");
    if let Err(err) = tab_a.report_activity(ActivityEvent::PointerMove) {
        tracing::error!(%err, "tab A is gone");
        return;
    }

    // Sit idle until one tab expires and drags the other along.
    let deadline = tokio::time::Instant::now()
        + Duration::from_secs(config.idle_minutes * 60 + 30);
    while routes_b.is_empty() {
        if tokio::time::Instant::now() >= deadline {
            tracing::error!("no logout observed, giving up");
            return;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    let route = routes_b.last().unwrap_or_default();
    tracing::info!(%route, "tab B redirected");
    if let Some(reason) = route
        .split_once("reason=")
        .and_then(|(_, value)| parse_reason(value))
    {
        tracing::info!(message = logout_message(reason), "login page shows");
    }
}

fn open_tab(
    name: &'static str,
    storage: &SharedStorage,
    cookies: &CookieJar,
    origin: &Origin,
    clock: &Arc<dyn Clock>,
    config: IdleConfig,
) -> (IdleCoordinatorHandle, Arc<InMemoryAuth>, RouteLog) {
    let auth = Arc::new(InMemoryAuth::new());
    let routes = RouteLog::new();
    let handle = IdleCoordinatorBuilder::new(
        Arc::clone(&auth),
        storage.context(),
        cookies.clone(),
        origin.clone(),
        Arc::new(routes.clone()),
    )
    .clock(Arc::clone(clock))
    .config(config)
    .build();

    tokio::spawn(announce_warnings(name, handle.warning()));
    (handle, auth, routes)
}

async fn announce_warnings(
    name: &'static str,
    mut warnings: watch::Receiver<IdleWarning>,
) {
    let mut was_visible = false;
    while warnings.changed().await.is_ok() {
        let warning = *warnings.borrow();
        if warning.visible {
            tracing::info!(
                tab = name,
                seconds_remaining = warning.seconds_remaining,
                "session expires soon"
            );
        } else if was_visible {
            tracing::info!(tab = name, "warning dismissed");
        }
        was_visible = warning.visible;
    }
}
