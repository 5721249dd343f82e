use std::fmt::{self, Debug};

use anyhow::Result as AnyResult;
use futures::future::BoxFuture;
use http::HeaderMap;

use super::Interceptor;
use crate::request::{Request, ResumeToken, UploadSource};

type ModifyFn = Box<dyn Fn(&mut HeaderMap, &Request) + Send + Sync>;

/// Injects or rewrites headers on every outgoing request (fetch, download
/// and upload alike; resume tokens carry no headers and are left untouched).
pub struct HeadersInterceptor {
    modify: ModifyFn,
}

impl HeadersInterceptor {
    /// Creates an interceptor applying an arbitrary header rewrite.
    #[inline]
    pub fn with(modify: impl Fn(&mut HeaderMap, &Request) + Send + Sync + 'static) -> Self {
        Self {
            modify: Box::new(modify),
        }
    }

    /// Adds the given headers, keeping values the request already carries.
    pub fn add(headers: HeaderMap) -> Self {
        Self::with(move |existing, _| {
            for (name, value) in &headers {
                if !existing.contains_key(name) {
                    existing.insert(name.to_owned(), value.to_owned());
                }
            }
        })
    }

    /// Adds the given headers, overriding values the request already carries.
    pub fn add_overriding(headers: HeaderMap) -> Self {
        Self::with(move |existing, _| {
            for (name, value) in &headers {
                existing.insert(name.to_owned(), value.to_owned());
            }
        })
    }

    fn apply(&self, request: &mut Request) {
        let mut headers = request.headers().to_owned();
        (self.modify)(&mut headers, request);
        *request.headers_mut() = headers;
    }
}

impl Interceptor for HeadersInterceptor {
    fn prepare<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, AnyResult<()>> {
        self.apply(request);
        Box::pin(async { Ok(()) })
    }

    fn prepare_download<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, AnyResult<()>> {
        self.apply(request);
        Box::pin(async { Ok(()) })
    }

    fn prepare_resume<'a>(&'a self, _resume_token: &'a mut ResumeToken) -> BoxFuture<'a, AnyResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn prepare_upload<'a>(
        &'a self,
        request: &'a mut Request,
        _source: &'a UploadSource,
    ) -> BoxFuture<'a, AnyResult<()>> {
        self.apply(request);
        Box::pin(async { Ok(()) })
    }
}

impl Debug for HeadersInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadersInterceptor").finish_non_exhaustive()
    }
}
