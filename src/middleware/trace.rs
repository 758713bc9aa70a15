//! Per-request tracing span.

use std::time::Instant;

use tracing::{Instrument, error, info, info_span};

use super::{Middleware, Next};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// Wraps the rest of the chain in a `request` span and logs the outcome.
/// Put it first so the span covers every other middleware.
pub struct Trace;

impl Middleware for Trace {
    fn process<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        Box::pin(
            async move {
                let started = Instant::now();
                let result = next.run(req).await;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match &result {
                    Ok(res) => info!(status = res.status_code().as_u16(), elapsed_ms, "request finished"),
                    Err(e) => error!(error = %e, elapsed_ms, "request failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}
