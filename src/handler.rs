//! Handler trait, type erasure and the handler registry.
//!
//! # How async handlers are stored
//!
//! Routes name their handler by identifier, so the registry has to hold
//! handlers of *different* types in one map. Each handler is wrapped and
//! hidden behind `dyn ErasedHandler`:
//!
//! ```text
//! async fn show(req: Request) -> Response { … }     ← user writes this
//!        ↓ registry.handler("news.show", show)
//! show.into_boxed_handler()                         ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(show))                         ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time                ← one vtable dispatch
//! ```
//!
//! The registry is also where non-handler services live. Resolving such a
//! service as a handler is a configuration error, not a panic.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// `Pin<Box<…>>` lets the runtime poll it in place; `Send` lets tokio move it
/// across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static, Response>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid request handler.
///
/// You never implement this yourself. It is satisfied for any function with
/// the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed via the private `Sealed` supertrait.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

enum Service {
    Handler(BoxedHandler),
    Other(Arc<dyn Any + Send + Sync>),
}

/// Maps handler identifiers (as written in route definitions) to services.
///
/// Build it once at startup. Each registration returns `self` so calls chain.
#[derive(Default)]
pub struct HandlerRegistry {
    services: HashMap<String, Service>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request handler under `id`. A later registration under
    /// the same id replaces the earlier one.
    pub fn handler(mut self, id: &str, handler: impl Handler) -> Self {
        self.services.insert(id.to_owned(), Service::Handler(handler.into_boxed_handler()));
        self
    }

    /// Registers a service that is not a request handler. Routes pointing at
    /// it fail with [`Error::NotAHandler`].
    pub fn service<T: Any + Send + Sync>(mut self, id: &str, value: T) -> Self {
        self.services.insert(id.to_owned(), Service::Other(Arc::new(value)));
        self
    }

    /// The non-handler service registered under `id`, if it has type `T`.
    pub fn service_ref<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        match self.services.get(id) {
            Some(Service::Other(value)) => Arc::clone(value).downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    /// Resolves `id` to a callable handler.
    pub(crate) fn resolve(&self, id: &str) -> Result<BoxedHandler, Error> {
        match self.services.get(id) {
            Some(Service::Handler(h)) => Ok(Arc::clone(h)),
            Some(Service::Other(_))   => Err(Error::NotAHandler(id.to_owned())),
            None                      => Err(Error::UnknownHandler(id.to_owned())),
        }
    }
}
