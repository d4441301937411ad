//! Navigation seam.
//!
//! The coordinator redirects after a forced logout. A real embedding
//! forwards this to its router/location; tests and demos use [`RouteLog`]
//! to observe where the app would have gone.

use std::sync::{Arc, Mutex};

/// Performs a replace-style navigation to an app route.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &str);
}

/// A [`Navigator`] that records every requested route.
#[derive(Clone, Default)]
pub struct RouteLog {
    routes: Arc<Mutex<Vec<String>>>,
}

impl RouteLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent navigation, if any.
    pub fn last(&self) -> Option<String> {
        self.routes
            .lock()
            .expect("route log poisoned")
            .last()
            .cloned()
    }

    /// All navigations in order.
    pub fn all(&self) -> Vec<String> {
        self.routes.lock().expect("route log poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.routes.lock().expect("route log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Navigator for RouteLog {
    fn navigate(&self, route: &str) {
        tracing::info!(route, "navigation requested");
        self.routes
            .lock()
            .expect("route log poisoned")
            .push(route.to_string());
    }
}
