//! # approutes
//!
//! Application routes for a CMS request pipeline.
//!
//! Most requests to a CMS are pages: the regular stack resolves them. Some
//! paths belong to the application instead (JSON endpoints, webhooks, form
//! targets). approutes sits in the middleware chain, matches those paths
//! against an application route table and hands them to a registered
//! handler. Everything else passes through untouched.
//!
//! A route may ask for the frontend controller (`requires_tsfe`). Its handler
//! then runs with language, caching flags and frontend user already settled,
//! exactly as a page would.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use approutes::middleware::{AppRoutes, Pipeline, SiteResolver, Trace};
//! use approutes::{
//!     Context, Globals, HandlerRegistry, Method, Request, Response, Route, RouteTable, Server,
//!     Site, SiteLanguage,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), approutes::Error> {
//!     let site = Site::new("main", "/", 1, vec![SiteLanguage::new(0, "English", "en_US.UTF-8")])?;
//!     let routes = RouteTable::new()
//!         .route(Route::new("ping", "/api/ping").methods([Method::Get]).handler("ping"))?;
//!     let handlers = HandlerRegistry::new().handler("ping", ping);
//!
//!     let app = Pipeline::new(pages)
//!         .layer(Trace)
//!         .layer(SiteResolver::new([Arc::new(site)]))
//!         .layer(AppRoutes::new(routes, handlers, Arc::new(Context::new()), Arc::new(Globals::new())));
//!
//!     Server::bind("0.0.0.0:3000".parse().unwrap()).serve(app).await
//! }
//!
//! async fn ping(_req: Request) -> Response {
//!     Response::json(br#"{"pong":true}"#.to_vec())
//! }
//!
//! async fn pages(_req: Request) -> Response {
//!     Response::text("regular page")
//! }
//! ```

mod context;
mod error;
mod frontend;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod site;

pub mod config;
pub mod middleware;

pub use context::{Context, Globals, LANGUAGE_ASPECT, LanguageAspect, OverlayType};
pub use error::Error;
pub use frontend::{FrontendController, FrontendUser, PageArguments};
pub use handler::{BoxFuture, Handler, HandlerRegistry};
pub use method::Method;
pub use request::{Request, attr};
pub use response::{ContentType, INVALID_PAGE_ARGUMENTS, IntoResponse, Response, ResponseBuilder, page_not_found};
pub use router::{MatchError, Route, RouteMatch, RouteTable, is_truthy};
pub use server::{DEFAULT_MAX_BODY_SIZE, Server};
pub use site::{FallbackType, Site, SiteLanguage};
