//! Network traffic as an activity signal.

use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use http::{Request, Response};
use tokio::sync::mpsc;

use crate::{
    HttpClient, HttpError, HttpTransport, InterceptorId, RequestInterceptor,
};

/// Interceptor half of the tap: signals and passes the request through
/// untouched.
struct SignalingInterceptor {
    signals: mpsc::UnboundedSender<()>,
}

impl RequestInterceptor for SignalingInterceptor {
    fn on_request(&self, request: Request<Vec<u8>>) -> Request<Vec<u8>> {
        let _ = self.signals.send(());
        request
    }
}

/// Transport half of the tap: signals, then delegates to the wrapped
/// transport. Catches traffic injected below the interceptor chain.
struct SignalingTransport {
    signals: mpsc::UnboundedSender<()>,
    wrapped: Arc<dyn HttpTransport>,
}

impl HttpTransport for SignalingTransport {
    fn send(
        &self,
        request: Request<Vec<u8>>,
    ) -> BoxFuture<'static, Result<Response<Vec<u8>>, HttpError>> {
        let _ = self.signals.send(());
        self.wrapped.send(request)
    }
}

struct Attachment {
    interceptor: InterceptorId,
    /// Transport to restore on detach.
    original: Arc<dyn HttpTransport>,
}

/// Hooks a client so every outgoing request reports user presence.
///
/// `attach` and `detach` are idempotent; the coordinator calls them on
/// login and logout without tracking whether it already did.
pub struct NetworkActivityTap {
    client: HttpClient,
    signals: mpsc::UnboundedSender<()>,
    attachment: Mutex<Option<Attachment>>,
}

impl NetworkActivityTap {
    /// Creates a tap feeding the given signal channel.
    ///
    /// The receiving half belongs to whoever treats network traffic as
    /// activity; each `()` means "a request just left this client".
    pub fn new(
        client: HttpClient,
        signals: mpsc::UnboundedSender<()>,
    ) -> Self {
        Self {
            client,
            signals,
            attachment: Mutex::new(None),
        }
    }

    /// Starts signaling. No-op when already attached.
    pub fn attach(&self) {
        let mut attachment =
            self.attachment.lock().expect("tap state poisoned");
        if attachment.is_some() {
            return;
        }
        let interceptor =
            self.client.use_interceptor(Arc::new(SignalingInterceptor {
                signals: self.signals.clone(),
            }));
        // Wrap whatever transport is current and remember it for detach.
        let original = self.client.transport();
        self.client.swap_transport(Arc::new(SignalingTransport {
            signals: self.signals.clone(),
            wrapped: Arc::clone(&original),
        }));
        *attachment = Some(Attachment {
            interceptor,
            original,
        });
        tracing::debug!("network activity tap attached");
    }

    /// Stops signaling and restores the client. No-op when detached.
    pub fn detach(&self) {
        let mut attachment =
            self.attachment.lock().expect("tap state poisoned");
        let Some(state) = attachment.take() else {
            return;
        };
        self.client.eject_interceptor(state.interceptor);
        self.client.swap_transport(state.original);
        tracing::debug!("network activity tap detached");
    }

    pub fn is_attached(&self) -> bool {
        self.attachment
            .lock()
            .expect("tap state poisoned")
            .is_some()
    }
}
