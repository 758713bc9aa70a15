//! Application route table.
//!
//! Route matching is delegated to a [`matchit`] radix tree. One tree node per
//! distinct path; each node holds every route registered on that path so
//! methods can be told apart and `405` reported instead of `404`.

use std::collections::{BTreeMap, HashMap};

use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::method::Method;

/// Match parameter holding the route name.
pub const ROUTE_PARAM: &str = "_route";
/// Match parameter holding the handler identifier.
pub const HANDLER_PARAM: &str = "handler";
/// Match parameter flagging that the frontend controller must be booted.
pub const REQUIRES_TSFE_PARAM: &str = "requiresTsfe";

/// One application route.
///
/// ```rust
/// use approutes::{Method, Route};
///
/// Route::new("news_show", "/api/news/{id}")
///     .methods([Method::Get])
///     .handler("news.show")
///     .requires_tsfe(true)
///     .default("format", "json");
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    path: String,
    methods: Vec<Method>,
    handler: Option<String>,
    requires_tsfe: bool,
    defaults: BTreeMap<String, String>,
}

impl Route {
    /// A route on `path` accepting any method, without a handler yet.
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_owned(),
            path: path.to_owned(),
            methods: Vec::new(),
            handler: None,
            requires_tsfe: false,
            defaults: BTreeMap::new(),
        }
    }

    /// Restricts the route to `methods`. An empty set accepts any method.
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn handler(mut self, id: &str) -> Self {
        self.handler = Some(id.to_owned());
        self
    }

    pub fn requires_tsfe(mut self, yes: bool) -> Self {
        self.requires_tsfe = yes;
        self
    }

    /// A parameter value used when the path does not supply one.
    pub fn default(mut self, key: &str, value: &str) -> Self {
        self.defaults.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn path(&self) -> &str { &self.path }

    fn allows(&self, method: Method) -> bool {
        self.methods.is_empty()
            || self.methods.contains(&method)
            || (method == Method::Head && self.methods.contains(&Method::Get))
    }
}

/// Why a request did not match any route. Both are ordinary outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("no route matches the path")]
    NotFound,
    #[error("path matches but method is not one of {allowed:?}")]
    MethodNotAllowed { allowed: Vec<Method> },
}

/// Parameters produced by a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    params: BTreeMap<String, String>,
}

impl RouteMatch {
    pub fn params(&self) -> &BTreeMap<String, String> { &self.params }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn route(&self) -> &str {
        self.get(ROUTE_PARAM).unwrap_or_default()
    }

    /// The handler identifier, if present and non-empty.
    pub fn handler(&self) -> Option<&str> {
        self.get(HANDLER_PARAM).filter(|h| !h.is_empty())
    }

    pub fn requires_tsfe(&self) -> bool {
        self.get(REQUIRES_TSFE_PARAM).is_some_and(is_truthy)
    }
}

impl From<BTreeMap<String, String>> for RouteMatch {
    fn from(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }
}

/// Loose truthiness of a string parameter: empty, `"0"` and `"false"` are
/// false, everything else is true.
pub fn is_truthy(value: &str) -> bool {
    !matches!(value, "" | "0") && !value.eq_ignore_ascii_case("false")
}

/// The application route table. Build it once at startup.
#[derive(Default)]
pub struct RouteTable {
    tree: MatchitRouter<usize>,
    slots: Vec<Vec<Route>>,
    by_path: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route. Returns `self` for chaining with `?`.
    pub fn route(mut self, route: Route) -> Result<Self, Error> {
        if let Some(&slot) = self.by_path.get(&route.path) {
            self.slots[slot].push(route);
            return Ok(self);
        }
        let slot = self.slots.len();
        self.tree
            .insert(route.path.clone(), slot)
            .map_err(|source| Error::InvalidRoute { path: route.path.clone(), source })?;
        self.by_path.insert(route.path.clone(), slot);
        self.slots.push(vec![route]);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Matches `method` + `path`. The first route registered on the path
    /// that allows the method wins.
    pub fn match_route(&self, method: Method, path: &str) -> Result<RouteMatch, MatchError> {
        let matched = self.tree.at(path).map_err(|_| MatchError::NotFound)?;
        let routes = &self.slots[*matched.value];

        let Some(route) = routes.iter().find(|r| r.allows(method)) else {
            let mut allowed: Vec<Method> = Vec::new();
            for method in routes.iter().flat_map(|r| r.methods.iter().copied()) {
                if !allowed.contains(&method) {
                    allowed.push(method);
                }
            }
            return Err(MatchError::MethodNotAllowed { allowed });
        };

        let mut params = route.defaults.clone();
        params.extend(matched.params.iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
        params.insert(ROUTE_PARAM.to_owned(), route.name.clone());
        if let Some(handler) = &route.handler {
            params.insert(HANDLER_PARAM.to_owned(), handler.clone());
        }
        if route.requires_tsfe {
            params.insert(REQUIRES_TSFE_PARAM.to_owned(), "1".to_owned());
        }
        Ok(RouteMatch { params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new()
            .route(Route::new("news_list", "/api/news").methods([Method::Get]).handler("news.list")).unwrap()
            .route(Route::new("news_create", "/api/news").methods([Method::Post]).handler("news.create")).unwrap()
            .route(
                Route::new("news_show", "/api/news/{id}")
                    .handler("news.show")
                    .requires_tsfe(true)
                    .default("id", "0")
                    .default("format", "json"),
            ).unwrap()
    }

    #[test]
    fn path_params_override_defaults() {
        let m = table().match_route(Method::Get, "/api/news/42").unwrap();
        assert_eq!(m.get("id"), Some("42"));
        assert_eq!(m.get("format"), Some("json"));
        assert_eq!(m.route(), "news_show");
        assert_eq!(m.handler(), Some("news.show"));
        assert!(m.requires_tsfe());
    }

    #[test]
    fn routes_sharing_a_path_are_told_apart_by_method() {
        let t = table();
        assert_eq!(t.len(), 3);
        assert_eq!(t.match_route(Method::Post, "/api/news").unwrap().handler(), Some("news.create"));
        assert_eq!(t.match_route(Method::Head, "/api/news").unwrap().handler(), Some("news.list"));
        assert_eq!(
            t.match_route(Method::Delete, "/api/news"),
            Err(MatchError::MethodNotAllowed { allowed: vec![Method::Get, Method::Post] }),
        );
    }

    #[test]
    fn allowed_methods_are_reported_once_in_registration_order() {
        let t = RouteTable::new()
            .route(Route::new("a", "/feed").methods([Method::Get])).unwrap()
            .route(Route::new("b", "/feed").methods([Method::Post])).unwrap()
            .route(Route::new("c", "/feed").methods([Method::Get, Method::Put])).unwrap();
        assert_eq!(
            t.match_route(Method::Delete, "/feed"),
            Err(MatchError::MethodNotAllowed { allowed: vec![Method::Get, Method::Post, Method::Put] }),
        );
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert_eq!(table().match_route(Method::Get, "/about"), Err(MatchError::NotFound));
    }

    #[test]
    fn route_without_handler_matches_without_handler_param() {
        let t = RouteTable::new().route(Route::new("broken", "/broken")).unwrap();
        let m = t.match_route(Method::Get, "/broken").unwrap();
        assert_eq!(m.handler(), None);
        assert!(!m.requires_tsfe());
    }

    #[test]
    fn conflicting_pattern_is_rejected() {
        let err = RouteTable::new()
            .route(Route::new("a", "/x/{id}")).unwrap()
            .route(Route::new("b", "/x/{slug}"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidRoute { path, .. } if path == "/x/{slug}"));
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("FALSE"));
        assert!(!is_truthy("false"));
    }
}
