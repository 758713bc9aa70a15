//! Unified error type.

/// The error type returned by approutes' fallible operations.
///
/// Application-level outcomes (a 404 page for unresolvable page arguments,
/// a request that matches no route) are expressed as [`Response`](crate::Response)
/// values or as pass-through, not as `Error`s. This type surfaces
/// misconfiguration and infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("route `{route}` must return a handler parameter")]
    MissingHandler { route: String },

    #[error("no service registered under handler id `{0}`")]
    UnknownHandler(String),

    #[error("service `{0}` must implement the request handler capability")]
    NotAHandler(String),

    #[error("the `site` request attribute is missing; the site resolver must run before app routes")]
    MissingSite,

    #[error(
        "the `frontend.user` request attribute must carry a FrontendUser \
         (as set by the frontend user authenticator middleware)"
    )]
    MissingFrontendUser,

    #[error("invalid route `{path}`: {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("unknown http method `{0}`")]
    UnknownMethod(String),

    #[error("config: {0}")]
    Config(String),

    #[error("config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// `true` for errors caused by the route table, handler registry or site
    /// setup rather than by I/O.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}
