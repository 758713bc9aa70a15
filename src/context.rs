//! Shared request context: the aspect store and the legacy globals shim.
//!
//! Both are created once and shared through `Arc`. Writes overwrite whatever
//! the previous request left behind; concurrent requests see each other's
//! writes, which is the contract of the code these stand in for.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::frontend::FrontendController;
use crate::request::Request;
use crate::site::{FallbackType, SiteLanguage};

/// Aspect name under which the resolved language is stored.
pub const LANGUAGE_ASPECT: &str = "language";

/// How translated records are overlaid on default-language records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayType {
    Off,
    Mixed,
    OnWithFloating,
}

/// The language in effect for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageAspect {
    id: i64,
    content_id: i64,
    overlay: OverlayType,
    fallback_chain: Vec<i64>,
}

impl LanguageAspect {
    pub fn from_site_language(language: &SiteLanguage) -> Self {
        let (overlay, fallback_chain) = match language.fallback_type() {
            FallbackType::Free     => (OverlayType::Off, Vec::new()),
            FallbackType::Fallback => (OverlayType::OnWithFloating, language.fallbacks().to_vec()),
            FallbackType::Strict   => (OverlayType::Mixed, Vec::new()),
        };
        Self { id: language.id(), content_id: language.id(), overlay, fallback_chain }
    }

    pub fn id(&self) -> i64 { self.id }
    pub fn content_id(&self) -> i64 { self.content_id }
    pub fn overlay(&self) -> OverlayType { self.overlay }
    pub fn fallback_chain(&self) -> &[i64] { &self.fallback_chain }
}

/// Named, typed aspects shared by everything handling a request.
#[derive(Default)]
pub struct Context {
    aspects: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_aspect<T: Any + Send + Sync>(&self, name: &str, aspect: T) {
        self.aspects.write().insert(name.to_owned(), Arc::new(aspect));
    }

    /// Reads an aspect. A stored aspect of another type reads as absent.
    pub fn aspect<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let stored = Arc::clone(self.aspects.read().get(name)?);
        stored.downcast::<T>().ok()
    }

    pub fn has_aspect(&self, name: &str) -> bool {
        self.aspects.read().contains_key(name)
    }
}

/// Stand-in for the process-wide "current request" and "current frontend
/// controller" globals that legacy handlers read. Last write wins.
#[derive(Default)]
pub struct Globals {
    request: RwLock<Option<Request>>,
    controller: RwLock<Option<Arc<FrontendController>>>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) -> Option<Request> {
        self.request.read().clone()
    }

    pub fn set_request(&self, request: Request) {
        *self.request.write() = Some(request);
    }

    pub fn frontend_controller(&self) -> Option<Arc<FrontendController>> {
        self.controller.read().clone()
    }

    pub fn set_frontend_controller(&self, controller: Arc<FrontendController>) {
        *self.controller.write() = Some(controller);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    #[test]
    fn language_aspect_follows_fallback_type() {
        let fallback = SiteLanguage::new(2, "Swiss German", "de_CH.UTF-8")
            .with_fallback(FallbackType::Fallback, vec![1, 0]);
        let aspect = LanguageAspect::from_site_language(&fallback);
        assert_eq!(aspect.id(), 2);
        assert_eq!(aspect.overlay(), OverlayType::OnWithFloating);
        assert_eq!(aspect.fallback_chain(), &[1, 0]);

        let free = SiteLanguage::new(3, "Français", "fr_FR.UTF-8")
            .with_fallback(FallbackType::Free, vec![0]);
        let aspect = LanguageAspect::from_site_language(&free);
        assert_eq!(aspect.overlay(), OverlayType::Off);
        assert!(aspect.fallback_chain().is_empty());
    }

    #[test]
    fn aspects_are_typed_and_overwritten() {
        let ctx = Context::new();
        ctx.set_aspect(LANGUAGE_ASPECT, 1_u8);
        assert!(ctx.aspect::<LanguageAspect>(LANGUAGE_ASPECT).is_none());

        let language = SiteLanguage::new(1, "Deutsch", "de_DE.UTF-8");
        ctx.set_aspect(LANGUAGE_ASPECT, LanguageAspect::from_site_language(&language));
        assert_eq!(ctx.aspect::<LanguageAspect>(LANGUAGE_ASPECT).unwrap().id(), 1);
    }

    #[test]
    fn globals_keep_the_last_request() {
        let globals = Globals::new();
        assert!(globals.request().is_none());
        globals.set_request(Request::new(Method::Get, "/first".parse().unwrap()));
        globals.set_request(Request::new(Method::Get, "/second".parse().unwrap()));
        assert_eq!(globals.request().unwrap().path(), "/second");
    }
}
