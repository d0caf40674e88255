// Request handlers

use crate::{HttpResponse, RequestScope, Result};
use async_trait::async_trait;
use std::future::Future;

/// Produces a response for one request scope
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, scope: &RequestScope) -> Result<HttpResponse>;
}

/// Adapter turning an async closure into a [`RequestHandler`]
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async closure that receives its own handle to the request scope
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(RequestScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for HandlerFn<F>
where
    F: Fn(RequestScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
{
    async fn handle(&self, scope: &RequestScope) -> Result<HttpResponse> {
        (self.f)(scope.clone()).await
    }
}
