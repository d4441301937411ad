//! The interceptable client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use http::{Request, Response};

use crate::HttpError;

/// The actual wire. Implementations own connection handling; the client
/// only sequences interceptors around them.
pub trait HttpTransport: Send + Sync + 'static {
    fn send(
        &self,
        request: Request<Vec<u8>>,
    ) -> BoxFuture<'static, Result<Response<Vec<u8>>, HttpError>>;
}

/// Hook run on every outgoing request, in registration order.
///
/// Interceptors may rewrite the request (auth headers, tracing ids) or
/// just observe it and pass it through.
pub trait RequestInterceptor: Send + Sync + 'static {
    fn on_request(&self, request: Request<Vec<u8>>) -> Request<Vec<u8>>;
}

/// Handle for removing a registered interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

struct ClientInner {
    transport: Mutex<Arc<dyn HttpTransport>>,
    interceptors: Mutex<Vec<(InterceptorId, Arc<dyn RequestInterceptor>)>>,
    next_id: AtomicU64,
}

/// Shared HTTP client. Cheap to clone; clones share the transport and
/// interceptor chain.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl HttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport: Mutex::new(transport),
                interceptors: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Appends an interceptor to the chain.
    pub fn use_interceptor(
        &self,
        interceptor: Arc<dyn RequestInterceptor>,
    ) -> InterceptorId {
        let id = InterceptorId(
            self.inner.next_id.fetch_add(1, Ordering::Relaxed),
        );
        self.inner
            .interceptors
            .lock()
            .expect("interceptor chain poisoned")
            .push((id, interceptor));
        id
    }

    /// Removes a previously registered interceptor. Returns whether the
    /// id was still present.
    pub fn eject_interceptor(&self, id: InterceptorId) -> bool {
        let mut chain = self
            .inner
            .interceptors
            .lock()
            .expect("interceptor chain poisoned");
        let before = chain.len();
        chain.retain(|(existing, _)| *existing != id);
        chain.len() != before
    }

    /// The transport currently in place.
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(
            &*self.inner.transport.lock().expect("transport slot poisoned"),
        )
    }

    /// Replaces the transport, returning the previous one so callers can
    /// wrap and later restore it.
    pub fn swap_transport(
        &self,
        transport: Arc<dyn HttpTransport>,
    ) -> Arc<dyn HttpTransport> {
        let mut slot =
            self.inner.transport.lock().expect("transport slot poisoned");
        std::mem::replace(&mut *slot, transport)
    }

    /// Runs the request through the interceptor chain and the transport.
    pub async fn send(
        &self,
        mut request: Request<Vec<u8>>,
    ) -> Result<Response<Vec<u8>>, HttpError> {
        let chain: Vec<Arc<dyn RequestInterceptor>> = self
            .inner
            .interceptors
            .lock()
            .expect("interceptor chain poisoned")
            .iter()
            .map(|(_, interceptor)| Arc::clone(interceptor))
            .collect();
        for interceptor in chain {
            request = interceptor.on_request(request);
        }
        let transport = Arc::clone(
            &*self.inner.transport.lock().expect("transport slot poisoned"),
        );
        transport.send(request).await
    }
}
