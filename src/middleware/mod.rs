//! Middleware layer.
//!
//! Middleware sees every request before the fallback handler does. Each one
//! either answers the request itself or hands it, possibly enriched, to the
//! rest of the chain through [`Next`].
//!
//! ```text
//! Trace → SiteResolver → AppRoutes ──matched──→ route handler
//!                            └──no match──→ next … → fallback handler
//! ```
//!
//! Built-in middleware:
//! - [`Trace`] — per-request span with method, path, status, latency
//! - [`SiteResolver`] — attaches the `site` attribute
//! - [`AppRoutes`] — application route dispatch

mod app_routes;
mod site_resolver;
mod trace;

use std::sync::Arc;

pub use app_routes::{AppRoutes, resolve_language};
pub use site_resolver::SiteResolver;
pub use trace::Trace;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// A stage of the request pipeline.
///
/// ```rust
/// use approutes::middleware::{Middleware, Next};
/// use approutes::{BoxFuture, Error, Request, Response};
///
/// struct Anonymous;
///
/// impl Middleware for Anonymous {
///     fn process<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
///         Box::pin(async move { next.run(req).await })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn process<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>>;
}

/// The rest of the chain after the current middleware.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    fallback: &'a BoxedHandler,
}

impl<'a> Next<'a> {
    /// Runs the next middleware, or the fallback handler at the end.
    pub async fn run(self, req: Request) -> Result<Response, Error> {
        match self.rest.split_first() {
            Some((first, rest)) => first.process(req, Next { rest, fallback: self.fallback }).await,
            None => Ok(self.fallback.call(req).await),
        }
    }
}

/// Ordered middleware in front of a fallback handler.
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
    fallback: BoxedHandler,
}

impl Pipeline {
    /// `fallback` answers every request no middleware answered.
    pub fn new(fallback: impl Handler) -> Self {
        Self { middleware: Vec::new(), fallback: fallback.into_boxed_handler() }
    }

    /// Appends `middleware`; it runs after everything added before it.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub async fn handle(&self, req: Request) -> Result<Response, Error> {
        Next { rest: &self.middleware, fallback: &self.fallback }.run(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::attr;
    use crate::Method;

    async fn echo_flag(req: Request) -> String {
        format!("noCache={:?}", req.attribute::<bool>(attr::NO_CACHE))
    }

    struct MarkNoCache;

    impl Middleware for MarkNoCache {
        fn process<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
            Box::pin(async move { next.run(req.with_attribute(attr::NO_CACHE, true)).await })
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn process<'a>(&'a self, _req: Request, _next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
            Box::pin(async { Ok(Response::text("stopped")) })
        }
    }

    fn get() -> Request {
        Request::new(Method::Get, "/".parse().unwrap())
    }

    #[tokio::test]
    async fn empty_pipeline_runs_fallback() {
        let res = Pipeline::new(echo_flag).handle(get()).await.unwrap();
        assert_eq!(res.body(), b"noCache=None");
    }

    #[tokio::test]
    async fn middleware_enriches_request_for_later_stages() {
        let res = Pipeline::new(echo_flag).layer(MarkNoCache).handle(get()).await.unwrap();
        assert_eq!(res.body(), b"noCache=Some(true)");
    }

    #[tokio::test]
    async fn middleware_can_answer_without_calling_next() {
        let res = Pipeline::new(echo_flag)
            .layer(ShortCircuit)
            .layer(MarkNoCache)
            .handle(get())
            .await
            .unwrap();
        assert_eq!(res.body(), b"stopped");
    }
}
