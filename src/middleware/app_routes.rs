//! Application route dispatch.
//!
//! Requests whose path is in the application route table are answered by the
//! route's handler; everything else continues down the regular stack
//! untouched. Routes flagged `requiresTsfe` get a booted
//! [`FrontendController`] before their handler runs.

use std::sync::Arc;

use tracing::debug;

use super::{Middleware, Next};
use crate::context::{Context, Globals, LANGUAGE_ASPECT, LanguageAspect};
use crate::error::Error;
use crate::frontend::{FrontendController, FrontendUser, PageArguments};
use crate::handler::{BoxFuture, HandlerRegistry};
use crate::request::{Request, attr};
use crate::response::{INVALID_PAGE_ARGUMENTS, Response, page_not_found};
use crate::router::{RouteMatch, RouteTable, is_truthy};
use crate::site::{Site, SiteLanguage};

/// Query parameter selecting the language by id.
const LANGUAGE_PARAM: &str = "L";

/// Dispatches application routes to registered handlers.
pub struct AppRoutes {
    routes: RouteTable,
    handlers: HandlerRegistry,
    context: Arc<Context>,
    globals: Arc<Globals>,
}

enum Bootstrap {
    Ready(Request),
    PageNotFound(Response),
}

impl AppRoutes {
    pub fn new(
        routes: RouteTable,
        handlers: HandlerRegistry,
        context: Arc<Context>,
        globals: Arc<Globals>,
    ) -> Self {
        Self { routes, handlers, context, globals }
    }

    async fn handle(&self, parameters: RouteMatch, request: Request) -> Result<Response, Error> {
        let site = request.shared_attribute::<Site>(attr::SITE).ok_or(Error::MissingSite)?;
        let language = resolve_language(&site, &request).clone();
        self.context.set_aspect(LANGUAGE_ASPECT, LanguageAspect::from_site_language(&language));
        let request = request.with_attribute(attr::LANGUAGE, language);
        self.globals.set_request(request.clone());

        let Some(id) = parameters.handler() else {
            return Err(Error::MissingHandler { route: parameters.route().to_owned() });
        };
        let handler = self.handlers.resolve(id)?;

        let request = if parameters.requires_tsfe() {
            match self.bootstrap(&site, request)? {
                Bootstrap::Ready(request) => request,
                Bootstrap::PageNotFound(response) => return Ok(response),
            }
        } else {
            request
        };

        debug!(route = parameters.route(), handler = id, "dispatching app route");
        Ok(handler.call(request).await)
    }

    fn bootstrap(&self, site: &Arc<Site>, request: Request) -> Result<Bootstrap, Error> {
        self.globals.set_request(request.clone());

        let Some(page_arguments) = request.shared_attribute::<PageArguments>(attr::ROUTING) else {
            return Ok(Bootstrap::PageNotFound(page_not_found(
                &request,
                "Page Arguments could not be resolved",
                INVALID_PAGE_ARGUMENTS,
            )));
        };
        let user = request
            .shared_attribute::<FrontendUser>(attr::FRONTEND_USER)
            .ok_or(Error::MissingFrontendUser)?;
        let language = request
            .attribute::<SiteLanguage>(attr::LANGUAGE)
            .cloned()
            .unwrap_or_else(|| site.default_language().clone());

        let mut controller = FrontendController::new(
            Arc::clone(&self.context),
            Arc::clone(site),
            language,
            Arc::clone(&page_arguments),
            user,
        );

        let no_cache = page_arguments
            .argument("no_cache")
            .or_else(|| request.parsed_body_param("no_cache"))
            .is_some_and(is_truthy);
        if no_cache {
            controller.set_no_cache(format!(
                "&no_cache=1 has been supplied, so caching is disabled! URL: \"{}\"",
                request.url(),
            ));
        }
        // Set upstream when the page arguments failed cache-hash validation.
        if request.attribute::<bool>(attr::NO_CACHE).copied().unwrap_or(false) {
            controller.disable_cache();
        }

        controller.determine_id(&request);

        let controller = Arc::new(controller);
        self.globals.set_frontend_controller(Arc::clone(&controller));
        Ok(Bootstrap::Ready(request.with_shared_attribute(attr::FRONTEND_CONTROLLER, controller)))
    }
}

impl Middleware for AppRoutes {
    fn process<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move {
            let matched = match self.routes.match_route(req.method(), req.path()) {
                Ok(matched) => matched,
                Err(reason) => {
                    debug!(path = req.path(), %reason, "no app route, passing on");
                    return next.run(req).await;
                }
            };

            let mut query = req.query_params().clone();
            query.extend(matched.params().iter().map(|(k, v)| (k.clone(), v.clone())));
            let req = req.with_query_params(query);

            self.handle(matched, req).await
        })
    }
}

/// The site language selected by the `L` query parameter, or the site's
/// default language when `L` is absent or names no configured language.
pub fn resolve_language<'s>(site: &'s Site, request: &Request) -> &'s SiteLanguage {
    let wanted = request.query_param(LANGUAGE_PARAM).map_or(0, leading_int);
    site.languages()
        .iter()
        .find(|l| l.id() == wanted)
        .unwrap_or_else(|| site.default_language())
}

/// Integer prefix of `s` (`"2abc"` is 2, `"1e1"` is 1); 0 when there is none.
fn leading_int(s: &str) -> i64 {
    let s = s.trim();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    fn site() -> Site {
        Site::new("main", "/", 1, vec![
            SiteLanguage::new(0, "English", "en_US.UTF-8"),
            SiteLanguage::new(1, "Deutsch", "de_DE.UTF-8"),
            SiteLanguage::new(2, "Français", "fr_FR.UTF-8"),
        ]).unwrap()
    }

    fn with_query(q: &str) -> Request {
        Request::new(Method::Get, format!("/api?{q}").parse().unwrap())
    }

    #[test]
    fn language_by_id() {
        let site = site();
        assert_eq!(resolve_language(&site, &with_query("L=2")).id(), 2);
        assert_eq!(resolve_language(&site, &with_query("L=1")).title(), "Deutsch");
    }

    #[test]
    fn missing_or_unknown_language_falls_back_to_default() {
        let site = site();
        assert_eq!(resolve_language(&site, &with_query("x=1")).id(), 0);
        assert_eq!(resolve_language(&site, &with_query("L=9")).id(), 0);
        assert_eq!(resolve_language(&site, &with_query("L=abc")).id(), 0);
    }

    #[test]
    fn lenient_integer_parsing() {
        assert_eq!(leading_int("2"), 2);
        assert_eq!(leading_int(" 2 "), 2);
        assert_eq!(leading_int("2abc"), 2);
        assert_eq!(leading_int("-1"), -1);
        assert_eq!(leading_int("+3"), 3);
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_int("x2"), 0);
        assert_eq!(leading_int("1e1"), 1);
        assert_eq!(leading_int("99999999999999999999"), 0);
    }
}
