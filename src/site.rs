//! Sites and their languages.

use serde::Deserialize;

use crate::error::Error;

/// How content of a language falls back when a translation is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackType {
    /// Only records translated into this language are shown.
    #[default]
    Strict,
    /// Untranslated records fall back through the configured chain.
    Fallback,
    /// The language is maintained independently of the default language.
    Free,
}

/// A language configured on a site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteLanguage {
    id: i64,
    title: String,
    locale: String,
    #[serde(default)]
    fallback_type: FallbackType,
    #[serde(default)]
    fallbacks: Vec<i64>,
}

impl SiteLanguage {
    pub fn new(id: i64, title: &str, locale: &str) -> Self {
        Self {
            id,
            title: title.to_owned(),
            locale: locale.to_owned(),
            fallback_type: FallbackType::default(),
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback_type: FallbackType, fallbacks: Vec<i64>) -> Self {
        self.fallback_type = fallback_type;
        self.fallbacks = fallbacks;
        self
    }

    pub fn id(&self) -> i64 { self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn locale(&self) -> &str { &self.locale }
    pub fn fallback_type(&self) -> FallbackType { self.fallback_type }
    pub fn fallbacks(&self) -> &[i64] { &self.fallbacks }
}

/// A site: a base path, a root page and an ordered, non-empty list of
/// languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    identifier: String,
    base: String,
    root_page_id: u64,
    languages: Vec<SiteLanguage>,
}

impl Site {
    pub fn new(
        identifier: &str,
        base: &str,
        root_page_id: u64,
        languages: Vec<SiteLanguage>,
    ) -> Result<Self, Error> {
        if languages.is_empty() {
            return Err(Error::Config(format!("site `{identifier}` has no languages")));
        }
        Ok(Self {
            identifier: identifier.to_owned(),
            base: base.to_owned(),
            root_page_id,
            languages,
        })
    }

    pub fn identifier(&self) -> &str { &self.identifier }
    pub fn base(&self) -> &str { &self.base }
    pub fn root_page_id(&self) -> u64 { self.root_page_id }
    pub fn languages(&self) -> &[SiteLanguage] { &self.languages }

    /// The language with id 0, or the first configured one.
    pub fn default_language(&self) -> &SiteLanguage {
        self.languages.iter()
            .find(|l| l.id == 0)
            .unwrap_or(&self.languages[0])
    }
}
