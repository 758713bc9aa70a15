//! Minimal CMS front: app routes in front of a stand-in page renderer.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example cms -- demos/cms.yaml
//!
//! Try:
//!   curl http://localhost:3000/api/ping
//!   curl 'http://localhost:3000/api/news/7?L=1'
//!   curl 'http://localhost:3000/api/news/7?no_cache=1'
//!   curl http://localhost:3000/about            # regular page stack

use std::sync::Arc;

use approutes::config::AppConfig;
use approutes::middleware::{AppRoutes, Middleware, Next, Pipeline, SiteResolver, Trace};
use approutes::{
    BoxFuture, Context, Error, FrontendController, FrontendUser, Globals, HandlerRegistry, PageArguments,
    Request, Response, Server, attr,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "demos/cms.yaml".to_owned());
    let config = AppConfig::load(&path)?;

    let globals = Arc::new(Globals::new());
    let legacy = Arc::clone(&globals);
    let handlers = HandlerRegistry::new()
        .handler("ping", ping)
        .handler("news.show", move |req: Request| {
            let globals = Arc::clone(&legacy);
            async move { show_news(req, &globals) }
        });

    let app = Pipeline::new(render_page)
        .layer(Trace)
        .layer(SiteResolver::new(config.sites()?))
        .layer(PageResolver)
        .layer(AnonymousUser)
        .layer(AppRoutes::new(config.route_table()?, handlers, Arc::new(Context::new()), globals));

    Server::bind(config.server.addr)
        .max_body_size(config.server.max_body_size)
        .serve(app)
        .await
}

// GET /api/ping
async fn ping(_req: Request) -> Response {
    Response::json(br#"{"pong":true}"#.to_vec())
}

// GET /api/news/{id}
//
// Reads the controller from the request attribute, falling back to the
// globals shim the way older handlers do.
fn show_news(req: Request, globals: &Globals) -> Response {
    let tsfe = req
        .shared_attribute::<FrontendController>(attr::FRONTEND_CONTROLLER)
        .or_else(|| globals.frontend_controller());
    let body = serde_json::json!({
        "news": req.query_param("id"),
        "format": req.query_param("format"),
        "page": tsfe.as_ref().map(|c| c.id()),
        "language": tsfe.as_ref().map(|c| c.language().locale().to_owned()),
        "cached": tsfe.as_ref().is_some_and(|c| !c.is_cache_disabled()),
    });
    Response::json(body.to_string().into_bytes())
}

// Everything app routes did not claim.
async fn render_page(req: Request) -> Response {
    Response::builder()
        .header("x-rendered-by", "page-stack")
        .text(format!("page for {}", req.path()))
}

/// Stand-in for page routing: every request resolves to the page named by
/// `?page=`, or the site root.
struct PageResolver;

impl Middleware for PageResolver {
    fn process<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move {
            let page = req.query_param("page").and_then(|p| p.parse().ok()).unwrap_or(0);
            let arguments = req
                .query_params()
                .iter()
                .fold(PageArguments::new(page), |args, (k, v)| args.with_argument(k, v));
            next.run(req.with_attribute(attr::ROUTING, arguments)).await
        })
    }
}

/// Stand-in for frontend authentication: every visitor is anonymous.
struct AnonymousUser;

impl Middleware for AnonymousUser {
    fn process<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move { next.run(req.with_attribute(attr::FRONTEND_USER, FrontendUser::anonymous())).await })
    }
}
