use std::fmt::{self, Debug};

use anyhow::Result as AnyResult;
use bytes::Bytes;
use futures::future::BoxFuture;

use super::Interceptor;
use crate::{request::Request, response::Response};

type PrepareFn = Box<dyn for<'a> Fn(&'a mut Request) -> BoxFuture<'a, AnyResult<()>> + Send + Sync>;
type ShouldRetryFn = Box<
    dyn for<'a> Fn(&'a Request, &'a mut Response, &'a mut Bytes) -> BoxFuture<'a, AnyResult<bool>>
        + Send
        + Sync,
>;

/// Interceptor assembled from closures, for one-off chain members that do
/// not warrant a named type.
#[derive(Default)]
pub struct CustomInterceptor {
    prepare: Option<PrepareFn>,
    should_retry: Option<ShouldRetryFn>,
}

impl CustomInterceptor {
    /// Creates an interceptor with no hooks installed.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a prepare hook.
    #[inline]
    pub fn on_prepare(
        mut self,
        prepare: impl for<'a> Fn(&'a mut Request) -> BoxFuture<'a, AnyResult<()>> + Send + Sync + 'static,
    ) -> Self {
        self.prepare = Some(Box::new(prepare));
        self
    }

    /// Installs a should-retry hook.
    #[inline]
    pub fn on_should_retry(
        mut self,
        should_retry: impl for<'a> Fn(&'a Request, &'a mut Response, &'a mut Bytes) -> BoxFuture<'a, AnyResult<bool>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.should_retry = Some(Box::new(should_retry));
        self
    }
}

impl Interceptor for CustomInterceptor {
    fn prepare<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, AnyResult<()>> {
        match &self.prepare {
            Some(prepare) => prepare(request),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn should_retry<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
        body: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        match &self.should_retry {
            Some(should_retry) => should_retry(request, response, body),
            None => Box::pin(async { Ok(false) }),
        }
    }
}

impl Debug for CustomInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomInterceptor")
            .field("prepare", &self.prepare.is_some())
            .field("should_retry", &self.should_retry.is_some())
            .finish()
    }
}
