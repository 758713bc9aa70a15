//! Frontend rendering controller and the values it is built from.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::context::Context;
use crate::request::Request;
use crate::site::{Site, SiteLanguage};

/// Validated parameters identifying which page a request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArguments {
    page_id: u64,
    page_type: String,
    arguments: BTreeMap<String, String>,
}

impl PageArguments {
    pub fn new(page_id: u64) -> Self {
        Self { page_id, page_type: "0".to_owned(), arguments: BTreeMap::new() }
    }

    pub fn with_page_type(mut self, page_type: &str) -> Self {
        self.page_type = page_type.to_owned();
        self
    }

    pub fn with_argument(mut self, key: &str, value: &str) -> Self {
        self.arguments.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn page_id(&self) -> u64 { self.page_id }
    pub fn page_type(&self) -> &str { &self.page_type }
    pub fn arguments(&self) -> &BTreeMap<String, String> { &self.arguments }

    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

/// The frontend user as established by the authenticating middleware.
/// Anonymous visitors are represented too, with no uid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontendUser {
    uid: Option<u64>,
    username: Option<String>,
    groups: Vec<u64>,
}

impl FrontendUser {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn logged_in(uid: u64, username: &str, groups: Vec<u64>) -> Self {
        Self { uid: Some(uid), username: Some(username.to_owned()), groups }
    }

    pub fn uid(&self) -> Option<u64> { self.uid }
    pub fn username(&self) -> Option<&str> { self.username.as_deref() }
    pub fn groups(&self) -> &[u64] { &self.groups }

    pub fn is_logged_in(&self) -> bool {
        self.uid.is_some()
    }
}

/// Per-request frontend controller ("TSFE").
///
/// Configured while it is still exclusively owned, then shared read-only
/// through the request and [`Globals`](crate::Globals).
pub struct FrontendController {
    context: Arc<Context>,
    site: Arc<Site>,
    language: SiteLanguage,
    page_arguments: Arc<PageArguments>,
    user: Arc<FrontendUser>,
    id: u64,
    page_type: String,
    no_cache: bool,
    no_cache_reason: Option<String>,
}

impl FrontendController {
    pub fn new(
        context: Arc<Context>,
        site: Arc<Site>,
        language: SiteLanguage,
        page_arguments: Arc<PageArguments>,
        user: Arc<FrontendUser>,
    ) -> Self {
        let id = page_arguments.page_id();
        let page_type = page_arguments.page_type().to_owned();
        Self {
            context,
            site,
            language,
            page_arguments,
            user,
            id,
            page_type,
            no_cache: false,
            no_cache_reason: None,
        }
    }

    /// Disables caching for this request and records why.
    pub fn set_no_cache(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "page caching disabled");
        self.no_cache = true;
        self.no_cache_reason = Some(reason);
    }

    /// Disables caching without a recorded reason.
    pub fn disable_cache(&mut self) {
        self.no_cache = true;
    }

    /// Settles the page to render. Page id 0 stands for the site root.
    pub fn determine_id(&mut self, request: &Request) {
        self.id = match self.page_arguments.page_id() {
            0 => self.site.root_page_id(),
            id => id,
        };
        self.page_type = self.page_arguments.page_type().to_owned();
        tracing::debug!(page = self.id, page_type = %self.page_type, path = request.path(), "page id determined");
    }

    pub fn is_cache_disabled(&self) -> bool { self.no_cache }
    pub fn no_cache_reason(&self) -> Option<&str> { self.no_cache_reason.as_deref() }
    pub fn id(&self) -> u64 { self.id }
    pub fn page_type(&self) -> &str { &self.page_type }
    pub fn site(&self) -> &Site { &self.site }
    pub fn language(&self) -> &SiteLanguage { &self.language }
    pub fn page_arguments(&self) -> &PageArguments { &self.page_arguments }
    pub fn user(&self) -> &FrontendUser { &self.user }
    pub fn context(&self) -> &Context { &self.context }
}

impl fmt::Debug for FrontendController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontendController")
            .field("site", &self.site.identifier())
            .field("language", &self.language.id())
            .field("id", &self.id)
            .field("page_type", &self.page_type)
            .field("no_cache", &self.no_cache)
            .finish_non_exhaustive()
    }
}
