use std::{fmt::Debug, path::PathBuf};

use anyhow::Result as AnyResult;
use auto_impl::auto_impl;
use bytes::Bytes;
use futures::future::BoxFuture;

use crate::{
    request::{Request, ResumeToken, UploadSource},
    response::Response,
};

mod authorization;
mod custom;
mod headers;
mod logger;
mod validation;

pub use authorization::AuthorizationInterceptor;
pub use custom::CustomInterceptor;
pub use headers::HeadersInterceptor;
pub use logger::LoggerInterceptor;
pub use validation::{ValidationError, ValidationInterceptor};

/// A pluggable unit wrapping every request the session sends.
///
/// Two independent hook families: *prepare* hooks mutate the outgoing
/// request (or resume token) before dispatch, *should-retry* hooks inspect a
/// completed attempt and vote on retrying it. Every hook defaults to a no-op
/// or "do not retry", so implementors override only what they need.
///
/// Hook ordering is part of the contract: prepare hooks run in the order
/// interceptors were registered on the session, retry hooks in reverse, so
/// the interceptor closest to the wire gets first refusal on a failure.
///
/// Any error returned by any hook aborts the whole call immediately: it is
/// never swallowed, consumes no retry budget and triggers no retry.
#[auto_impl(&, Box, Arc)]
pub trait Interceptor: Debug + Send + Sync {
    /// Rewrites an outgoing fetch request.
    fn prepare<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, AnyResult<()>> {
        let _ = request;
        Box::pin(async { Ok(()) })
    }

    /// Rewrites an outgoing download request.
    fn prepare_download<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, AnyResult<()>> {
        let _ = request;
        Box::pin(async { Ok(()) })
    }

    /// Rewrites the resume token of a download about to be continued.
    fn prepare_resume<'a>(&'a self, resume_token: &'a mut ResumeToken) -> BoxFuture<'a, AnyResult<()>> {
        let _ = resume_token;
        Box::pin(async { Ok(()) })
    }

    /// Rewrites an outgoing upload request. The payload source is observed,
    /// never mutated.
    fn prepare_upload<'a>(
        &'a self,
        request: &'a mut Request,
        source: &'a UploadSource,
    ) -> BoxFuture<'a, AnyResult<()>> {
        let _ = (request, source);
        Box::pin(async { Ok(()) })
    }

    /// Judges a completed fetch attempt. Returning `Ok(true)` asks the
    /// session's retry loop to re-attempt (subject to remaining budget).
    /// Response and body may be transformed; the transform is visible to the
    /// next hook in the reverse-order pass and to the final return value.
    fn should_retry<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
        body: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        let _ = (request, response, body);
        Box::pin(async { Ok(false) })
    }

    /// Judges a completed fresh-download attempt. `destination` is where the
    /// finished bytes were atomically placed.
    fn should_retry_download<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
        destination: &'a mut PathBuf,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        let _ = (request, response, destination);
        Box::pin(async { Ok(false) })
    }

    /// Judges a completed resumed-download attempt.
    fn should_retry_resumed_download<'a>(
        &'a self,
        resume_token: &'a ResumeToken,
        response: &'a mut Response,
        destination: &'a mut PathBuf,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        let _ = (resume_token, response, destination);
        Box::pin(async { Ok(false) })
    }

    /// Judges a completed upload attempt.
    fn should_retry_upload<'a>(
        &'a self,
        request: &'a Request,
        source: &'a UploadSource,
        response: &'a mut Response,
        body: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        let _ = (request, source, response, body);
        Box::pin(async { Ok(false) })
    }
}
