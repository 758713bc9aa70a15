//! YAML configuration: listen address, sites and the application route table.
//!
//! ```yaml
//! server:
//!   addr: "0.0.0.0:3000"
//!   max_body_size: 1048576     # bytes, optional
//! sites:
//!   - identifier: main
//!     base: /
//!     root_page_id: 1
//!     languages:
//!       - { id: 0, title: English, locale: en_US.UTF-8 }
//!       - { id: 1, title: Deutsch, locale: de_DE.UTF-8, fallback_type: fallback, fallbacks: [0] }
//! routes:
//!   - name: news_show
//!     path: /api/news/{id}
//!     methods: [GET]
//!     handler: news.show
//!     requires_tsfe: true
//!     defaults: { format: json }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::Error;
use crate::method::Method;
use crate::router::{Route, RouteTable};
use crate::server::DEFAULT_MAX_BODY_SIZE;
use crate::site::{Site, SiteLanguage};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    pub identifier: String,
    #[serde(default = "default_base")]
    pub base: String,
    pub root_page_id: u64,
    pub languages: Vec<SiteLanguage>,
}

fn default_base() -> String {
    "/".to_owned()
}

#[derive(Debug, Deserialize)]
pub struct RouteConfig {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub methods: Vec<String>,
    pub handler: Option<String>,
    #[serde(default)]
    pub requires_tsfe: bool,
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn sites(&self) -> Result<Vec<Arc<Site>>, Error> {
        self.sites
            .iter()
            .map(|s| Site::new(&s.identifier, &s.base, s.root_page_id, s.languages.clone()).map(Arc::new))
            .collect()
    }

    pub fn route_table(&self) -> Result<RouteTable, Error> {
        self.routes.iter().try_fold(RouteTable::new(), |table, r| table.route(r.to_route()?))
    }
}

impl RouteConfig {
    fn to_route(&self) -> Result<Route, Error> {
        let methods = self.methods
            .iter()
            .map(|m| m.parse::<Method>())
            .collect::<Result<Vec<_>, _>>()?;
        let mut route = Route::new(&self.name, &self.path)
            .methods(methods)
            .requires_tsfe(self.requires_tsfe);
        if let Some(handler) = &self.handler {
            route = route.handler(handler);
        }
        for (key, value) in &self.defaults {
            route = route.default(key, value);
        }
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
server:
  addr: "127.0.0.1:3000"
sites:
  - identifier: main
    root_page_id: 1
    languages:
      - { id: 0, title: English, locale: en_US.UTF-8 }
      - { id: 1, title: Deutsch, locale: de_DE.UTF-8, fallback_type: fallback, fallbacks: [0] }
routes:
  - name: news_show
    path: /api/news/{id}
    methods: [get]
    handler: news.show
    requires_tsfe: true
    defaults: { format: json }
  - name: ping
    path: /api/ping
    handler: ping
"#;

    #[test]
    fn builds_sites_and_routes() {
        let config = AppConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.server.addr.port(), 3000);
        assert_eq!(config.server.max_body_size, DEFAULT_MAX_BODY_SIZE);

        let sites = config.sites().unwrap();
        assert_eq!(sites[0].base(), "/");
        assert_eq!(sites[0].languages()[1].fallbacks(), &[0]);

        let table = config.route_table().unwrap();
        assert_eq!(table.len(), 2);
        let m = table.match_route(Method::Get, "/api/news/3").unwrap();
        assert_eq!(m.handler(), Some("news.show"));
        assert_eq!(m.get("format"), Some("json"));
        assert!(m.requires_tsfe());
        assert!(table.match_route(Method::Delete, "/api/ping").is_ok());
    }

    #[test]
    fn unknown_method_is_rejected() {
        let config = AppConfig::from_yaml(
            "server: { addr: \"127.0.0.1:1\" }\nroutes: [{ name: a, path: /a, methods: [FETCH] }]",
        ).unwrap();
        assert!(matches!(config.route_table(), Err(Error::UnknownMethod(m)) if m == "FETCH"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.routes.len(), 2);

        assert!(matches!(AppConfig::load("/nonexistent/approutes.yaml"), Err(Error::Io(_))));
        assert!(matches!(AppConfig::from_yaml("server: ["), Err(Error::Yaml(_))));
    }
}
