//! Attaches the site a request belongs to.

use std::sync::Arc;

use super::{Middleware, Next};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::{Request, attr};
use crate::response::Response;
use crate::site::Site;

/// Picks the site whose base path is the longest prefix of the request path
/// and stores it as the `site` attribute. Requests outside every site pass
/// through without one.
pub struct SiteResolver {
    sites: Vec<Arc<Site>>,
}

impl SiteResolver {
    pub fn new(sites: impl IntoIterator<Item = Arc<Site>>) -> Self {
        Self { sites: sites.into_iter().collect() }
    }

    fn find(&self, path: &str) -> Option<Arc<Site>> {
        self.sites
            .iter()
            .filter(|s| path.starts_with(s.base()))
            .max_by_key(|s| s.base().len())
            .cloned()
    }
}

impl Middleware for SiteResolver {
    fn process<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move {
            match self.find(req.path()) {
                Some(site) => next.run(req.with_shared_attribute(attr::SITE, site)).await,
                None => next.run(req).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Pipeline;
    use crate::site::SiteLanguage;
    use crate::Method;

    fn site(id: &str, base: &str) -> Arc<Site> {
        Arc::new(Site::new(id, base, 1, vec![SiteLanguage::new(0, "English", "en_US.UTF-8")]).unwrap())
    }

    async fn which_site(req: Request) -> String {
        req.attribute::<Site>(attr::SITE)
            .map_or("none".to_owned(), |s| s.identifier().to_owned())
    }

    #[tokio::test]
    async fn longest_base_wins() {
        let pipeline = Pipeline::new(which_site)
            .layer(SiteResolver::new([site("main", "/"), site("shop", "/shop/")]));

        let res = pipeline.handle(Request::new(Method::Get, "/shop/cart".parse().unwrap())).await.unwrap();
        assert_eq!(res.body(), b"shop");
        let res = pipeline.handle(Request::new(Method::Get, "/about".parse().unwrap())).await.unwrap();
        assert_eq!(res.body(), b"main");
    }

    #[tokio::test]
    async fn no_site_passes_through() {
        let pipeline = Pipeline::new(which_site).layer(SiteResolver::new([site("shop", "/shop/")]));
        let res = pipeline.handle(Request::new(Method::Get, "/about".parse().unwrap())).await.unwrap();
        assert_eq!(res.body(), b"none");
    }
}
