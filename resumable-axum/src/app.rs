use axum::Router;
use resumable_core::ResumableEngine;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::trace::TraceLayer;

use crate::upload::{upload_router_with_limit, DEFAULT_BODY_LIMIT};

/// An upload engine plus the router serving it
#[derive(Clone)]
pub struct AxumApp {
    pub engine: ResumableEngine,
    pub router: Router<()>,
    /// Body limit applied to upload routes mounted after it is set
    pub body_limit: Option<usize>,
}

impl AxumApp {
    pub fn new(engine: ResumableEngine) -> Self {
        Self {
            engine,
            router: Router::new(),
            body_limit: Some(DEFAULT_BODY_LIMIT),
        }
    }

    /// Cap request bodies of subsequently mounted upload routes; `None`
    /// removes the cap
    pub fn with_body_limit(mut self, body_limit: Option<usize>) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Mount the resumable.js endpoint at `path`
    pub fn use_uploads(mut self, path: &str) -> Self {
        let router = upload_router_with_limit(path, self.engine.clone(), self.body_limit);
        self.router = self.router.merge(router);
        self
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        let router = self.router.layer(TraceLayer::new_for_http());
        axum::serve(listener, router).await?;
        Ok(())
    }
}

pub fn axum(engine: ResumableEngine) -> AxumApp {
    AxumApp::new(engine)
}
