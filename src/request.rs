//! Incoming HTTP request type.
//!
//! A [`Request`] is a value. Every enrichment (`with_*`) consumes the request
//! and hands back a new one, so a middleware can never observe a half-updated
//! request, and an earlier stage's copy stays exactly as it was.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::method::Method;

/// Well-known attribute names shared between middleware.
pub mod attr {
    /// `Site` resolved for the request (set by the site resolver).
    pub const SITE: &str = "site";
    /// `PageArguments` resolved for the request (set upstream by page routing).
    pub const ROUTING: &str = "routing";
    /// Authenticated `FrontendUser` (set upstream by the user authenticator).
    pub const FRONTEND_USER: &str = "frontend.user";
    /// `bool`, set upstream when the page arguments failed cache validation.
    pub const NO_CACHE: &str = "noCache";
    /// `SiteLanguage` resolved by app routes.
    pub const LANGUAGE: &str = "language";
    /// `FrontendController` booted by app routes.
    pub const FRONTEND_CONTROLLER: &str = "frontend.controller";
}

type Attribute = Arc<dyn Any + Send + Sync>;

/// An incoming HTTP request.
#[derive(Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    query: BTreeMap<String, String>,
    parsed_body: Option<BTreeMap<String, String>>,
    attributes: HashMap<String, Attribute>,
}

impl Request {
    /// A request without headers or body. Query parameters are parsed from `uri`.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self::from_parts(method, uri, HeaderMap::new(), Bytes::new())
    }

    pub(crate) fn from_parts(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let query = uri.query().map(parse_form).unwrap_or_default();
        let parsed_body = parse_body(&headers, &body);
        Self { method, uri, headers, body, query, parsed_body, attributes: HashMap::new() }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Values that are not visible ASCII read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The full request URL as the client sent it.
    ///
    /// Behind a reverse proxy the URI only carries the path, so scheme and
    /// host are rebuilt from `x-forwarded-proto` and `host`.
    pub fn url(&self) -> String {
        if self.uri.scheme().is_some() {
            return self.uri.to_string();
        }
        let path = self.uri.path_and_query().map_or("/", |pq| pq.as_str());
        match self.header(HOST.as_str()) {
            Some(host) => {
                let scheme = self.header("x-forwarded-proto").unwrap_or("http");
                format!("{scheme}://{host}{path}")
            }
            None => path.to_owned(),
        }
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> { &self.query }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Form fields of a `application/x-www-form-urlencoded` body, or the
    /// scalar members of a JSON object body. `None` for any other body.
    pub fn parsed_body(&self) -> Option<&BTreeMap<String, String>> {
        self.parsed_body.as_ref()
    }

    pub fn parsed_body_param(&self, key: &str) -> Option<&str> {
        self.parsed_body.as_ref()?.get(key).map(String::as_str)
    }

    /// Typed attribute lookup. An attribute stored under `name` with a
    /// different type reads as absent.
    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.attributes.get(name)?.downcast_ref::<T>()
    }

    /// Like [`attribute`](Self::attribute), but hands out the shared value.
    pub fn shared_attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        Arc::clone(self.attributes.get(name)?).downcast::<T>().ok()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body and re-derives the parsed body from the current
    /// `content-type`, so set the header first.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.parsed_body = parse_body(&self.headers, &self.body);
        self
    }

    pub fn with_query_params(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_attribute<T: Any + Send + Sync>(self, name: &str, value: T) -> Self {
        self.with_shared_attribute(name, Arc::new(value))
    }

    pub fn with_shared_attribute<T: Any + Send + Sync>(mut self, name: &str, value: Arc<T>) -> Self {
        let value: Attribute = value;
        self.attributes.insert(name.to_owned(), value);
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        attributes.sort_unstable();
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("query", &self.query)
            .field("attributes", &attributes)
            .finish_non_exhaustive()
    }
}

fn parse_form(input: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(input.as_bytes()).into_owned().collect()
}

fn parse_body(headers: &HeaderMap, body: &[u8]) -> Option<BTreeMap<String, String>> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next().unwrap_or("").trim();

    if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        return Some(url::form_urlencoded::parse(body).into_owned().collect());
    }
    if mime.eq_ignore_ascii_case("application/json") {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body).ok()?;
        let fields = object.into_iter()
            .filter_map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b)   => String::from(if b { "1" } else { "0" }),
                    _ => return None,
                };
                Some((k, v))
            })
            .collect();
        return Some(fields);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> Request {
        Request::new(Method::Get, uri.parse().unwrap())
    }

    #[test]
    fn query_is_decoded() {
        let req = get("/api/news?L=2&q=hello%20world");
        assert_eq!(req.query_param("L"), Some("2"));
        assert_eq!(req.query_param("q"), Some("hello world"));
        assert_eq!(req.path(), "/api/news");
    }

    #[test]
    fn attribute_of_wrong_type_reads_as_absent() {
        let req = get("/").with_attribute(attr::NO_CACHE, "yes");
        assert!(req.has_attribute(attr::NO_CACHE));
        assert_eq!(req.attribute::<bool>(attr::NO_CACHE), None);
        assert_eq!(req.attribute::<&str>(attr::NO_CACHE), Some(&"yes"));
    }

    #[test]
    fn enrichment_leaves_the_original_untouched() {
        let original = get("/?a=1");
        let enriched = original.clone()
            .with_attribute(attr::NO_CACHE, true)
            .with_query_params(BTreeMap::from([("b".to_owned(), "2".to_owned())]));

        assert!(!original.has_attribute(attr::NO_CACHE));
        assert_eq!(original.query_param("a"), Some("1"));
        assert_eq!(enriched.query_param("a"), None);
        assert_eq!(enriched.query_param("b"), Some("2"));
    }

    #[test]
    fn form_and_json_bodies_are_parsed() {
        let form = Request::new(Method::Post, "/".parse().unwrap())
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
            .with_body("no_cache=1&title=a+b");
        assert_eq!(form.parsed_body_param("no_cache"), Some("1"));
        assert_eq!(form.parsed_body_param("title"), Some("a b"));

        let json = Request::new(Method::Post, "/".parse().unwrap())
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"))
            .with_body(r#"{"no_cache":true,"page":3,"tags":["x"]}"#);
        assert_eq!(json.parsed_body_param("no_cache"), Some("1"));
        assert_eq!(json.parsed_body_param("page"), Some("3"));
        assert_eq!(json.parsed_body_param("tags"), None);

        assert!(get("/").with_body("raw").parsed_body().is_none());
    }

    #[test]
    fn url_is_rebuilt_from_host() {
        let req = get("/api/news?L=1")
            .with_header(HOST, HeaderValue::from_static("example.org"))
            .with_header(HeaderName::from_static("x-forwarded-proto"), HeaderValue::from_static("https"));
        assert_eq!(req.url(), "https://example.org/api/news?L=1");
        assert_eq!(get("/plain").url(), "/plain");
    }
}
